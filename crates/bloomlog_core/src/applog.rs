//! Append-only record of newly inserted keys.
//!
//! Producers push keys into a bounded channel and block when it is full.
//! A single drain thread owns the file and writes one line per key:
//!
//!   `YYYY/MM/DD HH:MM:SS <key>\n`   (UTC; `\\`, `\r` and `\n` inside a key are escaped)
//!
//! `close` is two-phase: set `stopping` (later keys are dropped), take the
//! sender under the write lock (waits for in-flight sends), then join the
//! drain thread, which empties the queue, flushes and syncs before exiting.

use crate::errors::{BloomError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use time::macros::format_description;
use time::OffsetDateTime;

#[derive(Debug, Default)]
struct Stats {
    written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

pub struct AppendLog {
    path: Option<PathBuf>,
    capacity: usize,
    stopping: AtomicBool,
    // set when the file could not be opened; enqueue is then a silent no-op
    disabled: AtomicBool,
    tx: RwLock<Option<Sender<String>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<Stats>,
}

impl AppendLog {
    /// A log that ignores every key.
    pub fn disabled() -> Self {
        Self::build(None, 1)
    }

    /// A log writing to `path` once [`AppendLog::initialize`] runs.
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self::build(Some(path.into()), capacity.max(1))
    }

    fn build(path: Option<PathBuf>, capacity: usize) -> Self {
        Self {
            path,
            capacity,
            stopping: AtomicBool::new(false),
            disabled: AtomicBool::new(false),
            tx: RwLock::new(None),
            worker: Mutex::new(None),
            stats: Arc::new(Stats::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> { self.path.as_deref() }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some() && !self.disabled.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool { self.tx.read().is_some() }

    /// Opens (creating if absent) the log file and starts the drain thread.
    /// On failure the log stays disabled for this instance. Calling it again
    /// while running is a no-op.
    pub fn initialize(&self) -> Result<()> {
        let Some(path) = self.path.clone() else { return Ok(()) };
        let mut worker = self.worker.lock();
        if worker.is_some() || self.stopping.load(Ordering::Acquire) {
            return Ok(());
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| self.fail(&path, source))?;

        let (tx, rx) = bounded::<String>(self.capacity);
        let stats = Arc::clone(&self.stats);
        let worker_path = path.clone();
        let handle = thread::Builder::new()
            .name("bloomlog-drain".into())
            .spawn(move || drain(rx, file, &worker_path, &stats))
            .map_err(|source| self.fail(&path, source))?;

        *self.tx.write() = Some(tx);
        *worker = Some(handle);
        tracing::info!(path = %path.display(), capacity = self.capacity, "append log started");
        Ok(())
    }

    fn fail(&self, path: &Path, source: std::io::Error) -> BloomError {
        self.disabled.store(true, Ordering::Release);
        self.stopping.store(true, Ordering::Release);
        tracing::warn!(path = %path.display(), error = %source, "append log disabled");
        BloomError::LogUnavailable { path: path.to_path_buf(), source }
    }

    /// Queues `key`, blocking while the queue is full. No-op when the log is
    /// disabled, failed to open, or not started; dropped once `close` has begun.
    pub fn enqueue(&self, key: &str) {
        if !self.is_enabled() {
            return;
        }
        if self.stopping.load(Ordering::Acquire) {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(key, "append log stopping, key dropped");
            return;
        }
        let guard = self.tx.read();
        match guard.as_ref() {
            Some(tx) => {
                if tx.send(key.to_owned()).is_err() {
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(key, "append log worker gone, key dropped");
                }
            }
            // lost the race with `close` taking the sender
            None if self.stopping.load(Ordering::Acquire) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key, "append log stopping, key dropped");
            }
            None => {}
        }
    }

    /// Stops intake, then blocks until every queued key is written and the
    /// file is synced. Safe to call more than once.
    pub fn close(&self) {
        if self.stopping.swap(true, Ordering::AcqRel) && self.worker.lock().is_none() {
            return;
        }
        // under the worker lock so a concurrent `initialize` either sees
        // `stopping` or has already published its sender
        let handle = {
            let mut worker = self.worker.lock();
            drop(self.tx.write().take());
            worker.take()
        };
        if let Some(h) = handle {
            if h.join().is_err() {
                tracing::error!("append log worker panicked");
            }
        }
    }

    /// Keys written to the file (buffered writes included).
    pub fn written(&self) -> u64 { self.stats.written.load(Ordering::Relaxed) }

    /// Keys whose write failed.
    pub fn failed(&self) -> u64 { self.stats.failed.load(Ordering::Relaxed) }

    /// Keys rejected because `close` had begun.
    pub fn dropped(&self) -> u64 { self.stats.dropped.load(Ordering::Relaxed) }
}

impl Drop for AppendLog {
    fn drop(&mut self) {
        self.close();
    }
}

fn format_line(at: OffsetDateTime, key: &str) -> String {
    let ts = at
        .format(format_description!("[year]/[month]/[day] [hour]:[minute]:[second]"))
        .unwrap_or_else(|_| at.unix_timestamp().to_string());
    let mut line = String::with_capacity(ts.len() + key.len() + 2);
    line.push_str(&ts);
    line.push(' ');
    for c in key.chars() {
        match c {
            '\\' => line.push_str("\\\\"),
            '\n' => line.push_str("\\n"),
            '\r' => line.push_str("\\r"),
            c => line.push(c),
        }
    }
    line.push('\n');
    line
}

fn drain(rx: Receiver<String>, file: File, path: &Path, stats: &Stats) {
    let mut w = BufWriter::new(file);
    // ends once every sender is gone and the queue is empty
    for key in rx.iter() {
        match w.write_all(format_line(OffsetDateTime::now_utc(), &key).as_bytes()) {
            Ok(()) => { stats.written.fetch_add(1, Ordering::Relaxed); }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(path = %path.display(), error = %e, "append log write failed");
            }
        }
        if rx.is_empty() {
            if let Err(e) = w.flush() {
                tracing::warn!(path = %path.display(), error = %e, "append log flush failed");
            }
        }
    }

    let synced = w.flush().and_then(|_| w.get_ref().sync_all());
    if let Err(e) = synced {
        tracing::warn!(path = %path.display(), error = %e, "append log final sync failed");
    }
    tracing::info!(
        path = %path.display(),
        written = stats.written.load(Ordering::Relaxed),
        failed = stats.failed.load(Ordering::Relaxed),
        "append log drained"
    );
}
