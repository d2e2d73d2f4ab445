//! Lock-free bitmap over 32-bit atomic words.
//!
//! On-disk form (no header):
//!   repeat word_count * { u32 word (BE) }
//!
//! Bit `i` lives in word `i / 32` at position `i % 32` (LSB first).
//! `dump` takes no snapshot lock; callers quiesce writers if they need one.

use crate::consts::{CHUNK_BYTES, CHUNK_WORDS, WORD_BITS, WORD_BYTES};
use byteorder::{BigEndian as BE, ByteOrder};
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

struct Masks {
    set: [u32; WORD_BITS as usize],
    clear: [u32; WORD_BITS as usize],
}

/// Per-position set/clear masks, built once per process and shared by every bitmap.
fn masks() -> &'static Masks {
    static MASKS: OnceLock<Masks> = OnceLock::new();
    MASKS.get_or_init(|| {
        let mut set = [0u32; WORD_BITS as usize];
        let mut clear = [0u32; WORD_BITS as usize];
        for i in 0..WORD_BITS as usize {
            set[i] = 1u32 << i;
            clear[i] = !set[i];
        }
        Masks { set, clear }
    })
}

pub struct Bitmap {
    words: Box<[AtomicU32]>,
    max_size: u64,
}

impl Bitmap {
    /// Bitmap with at least `size` addressable bits, rounded up to whole words.
    pub fn new(size: u64) -> Self {
        let count = size.div_ceil(WORD_BITS);
        let words = (0..count)
            .map(|_| AtomicU32::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { words, max_size: count * WORD_BITS }
    }

    fn from_words(words: Vec<u32>) -> Self {
        let max_size = words.len() as u64 * WORD_BITS;
        let words = words
            .into_iter()
            .map(AtomicU32::new)
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { words, max_size }
    }

    #[inline]
    pub fn max_size(&self) -> u64 { self.max_size }

    #[inline]
    pub fn word_count(&self) -> usize { self.words.len() }

    /// Byte length of the dumped form.
    #[inline]
    pub fn byte_len(&self) -> u64 { (self.words.len() * WORD_BYTES) as u64 }

    /// Byte length of the dumped form of `Bitmap::new(size)`.
    #[inline]
    pub fn byte_len_for(size: u64) -> u64 { size.div_ceil(WORD_BITS) * WORD_BYTES as u64 }

    #[inline]
    fn locate(&self, index: u64) -> (&AtomicU32, usize) {
        // Indices come from `% bit_size`; anything past the end is a sizing bug.
        assert!(
            index < self.max_size,
            "bit index {index} out of range (max {})",
            self.max_size
        );
        (&self.words[(index / WORD_BITS) as usize], (index % WORD_BITS) as usize)
    }

    /// Sets bit `index`, returning its value before the call.
    pub fn set(&self, index: u64) -> bool {
        let (word, bit) = self.locate(index);
        let mask = masks().set[bit];
        let mut cur = word.load(Ordering::Acquire);
        loop {
            if cur & mask != 0 {
                return true;
            }
            match word.compare_exchange_weak(cur, cur | mask, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return false,
                Err(actual) => cur = actual,
            }
        }
    }

    /// Tests bit `index` without mutating it.
    pub fn get(&self, index: u64) -> bool {
        let (word, bit) = self.locate(index);
        word.load(Ordering::Acquire) & masks().set[bit] != 0
    }

    /// Clears bit `index`, returning its value before the call.
    pub fn remove(&self, index: u64) -> bool {
        let (word, bit) = self.locate(index);
        let m = masks();
        let mut cur = word.load(Ordering::Acquire);
        loop {
            if cur & m.set[bit] == 0 {
                return false;
            }
            match word.compare_exchange_weak(
                cur,
                cur & m.clear[bit],
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => cur = actual,
            }
        }
    }

    /// Streams the words as big-endian u32s, one 1 KiB chunk at a time.
    pub fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut buf = [0u8; CHUNK_BYTES];
        for chunk in self.words.chunks(CHUNK_WORDS) {
            for (slot, word) in buf.chunks_exact_mut(WORD_BYTES).zip(chunk) {
                BE::write_u32(slot, word.load(Ordering::Acquire));
            }
            w.write_all(&buf[..chunk.len() * WORD_BYTES])?;
        }
        Ok(())
    }

    /// Rebuilds a bitmap from a dumped stream. `size_hint` is the expected
    /// byte length (used for preallocation only); a trailing partial word is dropped.
    pub fn load<R: Read>(r: &mut R, size_hint: u64) -> io::Result<Self> {
        let mut words = Vec::with_capacity(usize::try_from(size_hint).unwrap_or(0) / WORD_BYTES);
        let mut buf = [0u8; CHUNK_BYTES];
        let mut filled = 0usize;
        loop {
            let n = match r.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            filled += n;
            let whole = filled - filled % WORD_BYTES;
            words.extend(buf[..whole].chunks_exact(WORD_BYTES).map(BE::read_u32));
            buf.copy_within(whole..filled, 0);
            filled -= whole;
        }
        Ok(Self::from_words(words))
    }

    /// Debug rendering: one line per word, `hi ~ lo: bits` (MSB on the left).
    pub fn render<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for (i, word) in self.words.iter().enumerate() {
            let lo = i as u64 * WORD_BITS;
            let bits = word.load(Ordering::Acquire);
            writeln!(w, "{:>8} ~{:>8}:{:032b}", lo + WORD_BITS - 1, lo, bits)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("words", &self.words.len())
            .field("max_size", &self.max_size)
            .finish()
    }
}
