// crates/bloomlog_core/src/consts.rs

/// Width of one bitmap word in bits.
pub const WORD_BITS: u64 = 32;
/// Width of one bitmap word on disk.
pub const WORD_BYTES: usize = 4;

/// Words per dump/load chunk (1 KiB of output).
pub const CHUNK_WORDS: usize = 256;
pub const CHUNK_BYTES: usize = CHUNK_WORDS * WORD_BYTES;

pub const EXT_BITMAP: &str = ".bitmap";
pub const EXT_META: &str = ".meta";
pub const EXT_TEMP: &str = ".temp";

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_LOG_FILE: &str = "bloomlog.aof";

const _: () = { assert!(WORD_BITS as usize == WORD_BYTES * 8); };
