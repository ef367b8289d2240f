// crates/pvtx-runfolder/src/append.rs
// ============================================================================
// Module: Append-With-Retry
// Description: Advisory-locked, retry-with-backoff line appends for the
//              JSONL logs (`children.jsonl`, `events.jsonl`, `index.jsonl`).
// Purpose: Give every writer of an append-only log the same single-writer
//          guarantee: an in-process mutex against concurrent writers in
//          this program, an advisory file lock against any other process
//          touching the same path, and a caller-supplied retry schedule
//          when the lock is briefly held elsewhere.
// Dependencies: fs2, std::fs, std::sync
// ============================================================================

//! ## Overview
//! [`AppendLog`] owns one path and serializes every append to it: first
//! through a `Mutex` held for the duration of the write (cheap, in-process),
//! then through an `fs2` exclusive advisory lock on the opened file (across
//! processes). If the advisory lock cannot be taken immediately, the append
//! retries after each delay in the caller's backoff schedule before giving
//! up.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use fs2::FileExt as _;

// ============================================================================
// SECTION: Append Error
// ============================================================================

/// Failure appending a line to an [`AppendLog`].
#[derive(Debug, thiserror::Error)]
pub enum AppendError {
    /// The log's in-process mutex was poisoned by a panicking writer.
    #[error("append log mutex poisoned for {path}")]
    Poisoned {
        /// Path of the log whose mutex was poisoned.
        path: String,
    },
    /// The underlying file could not be opened, locked or written after
    /// exhausting the retry schedule.
    #[error("append to {path} failed after retries: {source}")]
    Io {
        /// Path of the log that could not be written.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// SECTION: Append Log
// ============================================================================

/// A single append-only JSONL log, serialized against concurrent writers.
pub struct AppendLog {
    /// Path of the log file.
    path: PathBuf,
    /// In-process mutual exclusion; held for the duration of each append.
    guard: Mutex<()>,
}

impl AppendLog {
    /// Creates an append log at `path`. The file is created on first
    /// append; it is not touched by construction.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), guard: Mutex::new(()) }
    }

    /// Path of this log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `line` plus a trailing newline, retrying after each delay
    /// in `backoff_ms` if the advisory lock is held elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`AppendError::Poisoned`] if a prior writer panicked while
    /// holding the in-process mutex, or [`AppendError::Io`] if every retry
    /// attempt fails.
    pub fn append_line(&self, line: &str, backoff_ms: &[u64]) -> Result<(), AppendError> {
        let _held = self.guard.lock().map_err(|_unused| AppendError::Poisoned { path: self.path.display().to_string() })?;
        let mut attempt = 0usize;
        loop {
            match self.try_append(line) {
                Ok(()) => return Ok(()),
                Err(source) => {
                    if attempt == backoff_ms.len() {
                        return Err(AppendError::Io { path: self.path.display().to_string(), source });
                    }
                    thread::sleep(Duration::from_millis(backoff_ms[attempt]));
                    attempt += 1;
                }
            }
        }
    }

    /// Opens the file in append mode, takes an exclusive advisory lock,
    /// writes the line, and releases the lock.
    fn try_append(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.lock_exclusive()?;
        let result = writeln!(file, "{line}");
        let _unlocked = file.unlock();
        result
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;
    use std::thread;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn appends_one_line_per_call() {
        let dir = tempdir().expect("tempdir");
        let log = AppendLog::new(dir.path().join("events.jsonl"));
        log.append_line("{\"a\":1}", &[]).expect("append");
        log.append_line("{\"a\":2}", &[]).expect("append");
        let content = fs::read_to_string(log.path()).expect("read");
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn concurrent_appends_do_not_interleave() {
        let dir = tempdir().expect("tempdir");
        let log = Arc::new(AppendLog::new(dir.path().join("index.jsonl")));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    log.append_line(&format!("{{\"n\":{i}}}"), &[5, 10]).expect("append");
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread joins");
        }
        let content = fs::read_to_string(log.path()).expect("read");
        assert_eq!(content.lines().count(), 8);
        for line in content.lines() {
            assert!(serde_json::from_str::<serde_json::Value>(line).is_ok());
        }
    }
}
