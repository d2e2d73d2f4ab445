//! Concurrent Bloom filter with an optional append log of new keys.
//!
//! Sizing: `bit_size = ceil(-n ln p / ln²2)`, `hash_size = round(m/n · ln 2)`.
//! Probes: `(h1 + i·h2) mod bit_size`, `h1 = xxh3(k)`, `h2 = xxh3(k ++ k)`.
//!
//! `total` counts `put` calls classified as new. Two threads inserting the
//! same absent key can both see an unset bit, so it may over-count and the
//! key may be logged twice; membership answers are unaffected.

use crate::applog::AppendLog;
use crate::bitmap::Bitmap;
use crate::config::FilterConfig;
use crate::consts::{DEFAULT_LOG_FILE, DEFAULT_QUEUE_CAPACITY};
use crate::errors::{BloomError, Result};
use crate::hash::{self, Probes};
use crate::meta::Meta;
use crate::persist::{self, FilePaths};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct BloomFilter {
    bm: Bitmap,
    max_elements: u64,
    bit_size: u64,
    hash_size: u32,
    total: AtomicU64,
    log: AppendLog,
}

impl BloomFilter {
    /// In-memory filter for `max_elements` keys at false-positive rate `fpp`.
    pub fn new(max_elements: u64, fpp: f64) -> Result<Self> {
        Self::with_config(FilterConfig::new(max_elements, fpp))
    }

    /// Filter that records new keys under `log_dir` when `durable` is set.
    /// Call [`BloomFilter::initialize`] before the first `put`.
    pub fn with_log(
        max_elements: u64,
        fpp: f64,
        log_dir: impl Into<PathBuf>,
        durable: bool,
    ) -> Result<Self> {
        let mut cfg = FilterConfig::new(max_elements, fpp);
        cfg.log_dir = Some(log_dir.into());
        cfg.durable = durable;
        Self::with_config(cfg)
    }

    pub fn with_config(cfg: FilterConfig) -> Result<Self> {
        cfg.validate()?;
        let bit_size = hash::bit_size(cfg.max_elements, cfg.false_positive_rate);
        let hash_size = hash::hash_size(bit_size, cfg.max_elements);
        tracing::debug!(
            max_elements = cfg.max_elements,
            fpp = cfg.false_positive_rate,
            bit_size,
            hash_size,
            "bloom filter sized"
        );
        let meta = Meta { max_elements: cfg.max_elements, hash_size, bit_size, total: 0 };
        Ok(Self::from_parts(Bitmap::new(bit_size), meta, log_for(&cfg)))
    }

    fn from_parts(bm: Bitmap, meta: Meta, log: AppendLog) -> Self {
        Self {
            bm,
            max_elements: meta.max_elements,
            bit_size: meta.bit_size,
            hash_size: meta.hash_size,
            total: AtomicU64::new(meta.total),
            log,
        }
    }

    /// Starts the append log. Required before `put` when durability is on;
    /// a no-op otherwise. On error the filter keeps working without a log.
    pub fn initialize(&self) -> Result<()> {
        self.log.initialize()
    }

    #[inline]
    fn probes(&self, key: &str) -> Probes {
        Probes::new(key.as_bytes(), self.hash_size, self.bit_size)
    }

    /// Inserts `key`. Returns `true` if every probed bit was already set
    /// (key possibly present), `false` if the key is new.
    pub fn put(&self, key: &str) -> bool {
        let mut present = true;
        for p in self.probes(key) {
            present &= self.bm.set(p);
        }
        if !present {
            self.total.fetch_add(1, Ordering::Relaxed);
            self.log.enqueue(key);
        }
        present
    }

    /// `false` means `key` was never put; `true` means it probably was.
    pub fn contains(&self, key: &str) -> bool {
        self.probes(key).all(|p| self.bm.get(p))
    }

    /// Writes `{dir}/{name}.bitmap` and `{dir}/{name}.meta`.
    /// Concurrent `put`s may or may not make it into the snapshot.
    pub fn dump(&self, dir: impl AsRef<Path>, name: &str) -> Result<()> {
        let paths = FilePaths::new(dir.as_ref(), name);
        let meta = self.meta();
        persist::save(&paths, &self.bm, &meta)?;
        tracing::debug!(path = %paths.meta.display(), %meta, "bloom filter dumped");
        Ok(())
    }

    /// Restores a dumped filter. The result has no append log.
    pub fn load(dir: impl AsRef<Path>, name: &str) -> Result<Self> {
        Self::load_inner(dir.as_ref(), name, AppendLog::disabled())
    }

    /// Restores a dumped filter and attaches an append log under `log_dir`
    /// (default file name and queue size); call `initialize` afterwards.
    pub fn load_with_log(
        dir: impl AsRef<Path>,
        name: &str,
        log_dir: impl AsRef<Path>,
    ) -> Result<Self> {
        let log = AppendLog::new(log_dir.as_ref().join(DEFAULT_LOG_FILE), DEFAULT_QUEUE_CAPACITY);
        Self::load_inner(dir.as_ref(), name, log)
    }

    fn load_inner(dir: &Path, name: &str, log: AppendLog) -> Result<Self> {
        let paths = FilePaths::new(dir, name);
        let meta = persist::read_meta(&paths.meta)?;
        if meta.max_elements == 0 || meta.bit_size == 0 || meta.hash_size == 0 {
            return Err(BloomError::InvalidMeta(format!("zero size in {meta}")));
        }
        let bm = persist::read_bitmap(&paths.bitmap, &meta)?;
        tracing::debug!(path = %paths.meta.display(), %meta, "bloom filter loaded");
        Ok(Self::from_parts(bm, meta, log))
    }

    /// Drains and closes the append log. Further `put`s still set bits but
    /// are no longer recorded.
    pub fn close(&self) {
        self.log.close();
    }

    pub fn meta(&self) -> Meta {
        Meta {
            max_elements: self.max_elements,
            hash_size: self.hash_size,
            bit_size: self.bit_size,
            total: self.total(),
        }
    }

    pub fn max_elements(&self) -> u64 { self.max_elements }
    pub fn bit_size(&self) -> u64 { self.bit_size }
    pub fn hash_size(&self) -> u32 { self.hash_size }
    pub fn total(&self) -> u64 { self.total.load(Ordering::Relaxed) }
    pub fn append_log(&self) -> &AppendLog { &self.log }

    /// `(1 - e^(-k·n/m))^k` for the current `total`.
    pub fn estimated_fpp(&self) -> f64 {
        let k = self.hash_size as f64;
        let fill = 1.0 - (-k * self.total() as f64 / self.bit_size as f64).exp();
        fill.powf(k)
    }

    /// Writes the raw bitmap words, one per line.
    pub fn render<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.bm.render(w)
    }
}

fn log_for(cfg: &FilterConfig) -> AppendLog {
    match (cfg.durable, cfg.log_path()) {
        (true, Some(path)) => AppendLog::new(path, cfg.queue_capacity),
        _ => AppendLog::disabled(),
    }
}
