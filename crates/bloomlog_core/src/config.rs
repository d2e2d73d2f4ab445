use crate::consts::{DEFAULT_LOG_FILE, DEFAULT_QUEUE_CAPACITY};
use crate::errors::{BloomError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_queue_capacity() -> usize { DEFAULT_QUEUE_CAPACITY }
fn default_log_file() -> String { DEFAULT_LOG_FILE.to_string() }

/// Construction parameters for a [`crate::BloomFilter`].
///
/// JSON form (only the first two keys are required):
/// ```json
/// { "max_elements": 100000, "false_positive_rate": 0.001,
///   "log_dir": "data", "durable": true, "queue_capacity": 1024, "log_file": "bloomlog.aof" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub max_elements: u64,
    pub false_positive_rate: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    #[serde(default)]
    pub durable: bool,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_log_file")]
    pub log_file: String,
}

impl FilterConfig {
    /// In-memory filter, no append log.
    pub fn new(max_elements: u64, false_positive_rate: f64) -> Self {
        Self {
            max_elements,
            false_positive_rate,
            log_dir: None,
            durable: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            log_file: DEFAULT_LOG_FILE.to_string(),
        }
    }

    /// Records new keys under `dir` once the filter is initialized.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self.durable = true;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn load(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let cfg: FilterConfig = serde_json::from_str(&s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_elements == 0 {
            return Err(BloomError::InvalidConfig("max_elements must be > 0".into()));
        }
        let p = self.false_positive_rate;
        if !(p > 0.0 && p < 1.0) {
            return Err(BloomError::InvalidConfig(format!("false_positive_rate {p} not in (0, 1)")));
        }
        if self.queue_capacity == 0 {
            return Err(BloomError::InvalidConfig("queue_capacity must be > 0".into()));
        }
        if self.durable && self.log_dir.is_none() {
            return Err(BloomError::InvalidConfig("durable filter needs log_dir".into()));
        }
        if self.log_file.trim().is_empty() {
            return Err(BloomError::InvalidConfig("log_file cannot be empty".into()));
        }
        Ok(())
    }

    /// Full path of the append log, if one is configured.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_dir.as_ref().map(|d| d.join(&self.log_file))
    }
}
