//! Opt-in file logger for plugin fault visibility.
//!
//! The pipeline swallows every failure by design, so operators need a
//! side-channel to see what was dropped and why. This logger appends
//! timestamped lines to a fixed file, but only while a sentinel flag file
//! exists on disk; the flag is checked on every call, which is acceptable
//! because logging here is diagnostic-only and low-frequency.
//!
//! The logger itself never raises: best-effort instrumentation must not
//! become a new failure source.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

/// Flag file whose presence enables logging.
pub const DEFAULT_SENTINEL: &str = "/tmp/ENABLE_ANSIBLE_PLUGIN_DEBUG";

/// Directory holding the log file, created on demand.
pub const DEFAULT_LOG_DIR: &str = "/tmp/ansible_debug";

/// Log file name inside the log directory; rotated to `plugin.log.1`.
pub const LOG_FILE_NAME: &str = "plugin.log";

/// Size threshold in bytes above which the log is rotated.
pub const DEFAULT_ROTATE_BYTES: u64 = 10_000_000;

// ============================================================================
// Debug Log
// ============================================================================

/// Append-only diagnostic logger with size-based rotation.
#[derive(Debug, Clone)]
pub struct DebugLog {
    sentinel: PathBuf,
    directory: PathBuf,
    rotate_bytes: u64,
}

impl Default for DebugLog {
    fn default() -> Self {
        Self {
            sentinel: PathBuf::from(DEFAULT_SENTINEL),
            directory: PathBuf::from(DEFAULT_LOG_DIR),
            rotate_bytes: DEFAULT_ROTATE_BYTES,
        }
    }
}

impl DebugLog {
    /// Creates a logger with the default sentinel, directory, and
    /// rotation threshold.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a logger with custom sentinel and directory paths.
    pub fn with_paths(sentinel: impl Into<PathBuf>, directory: impl Into<PathBuf>) -> Self {
        Self {
            sentinel: sentinel.into(),
            directory: directory.into(),
            rotate_bytes: DEFAULT_ROTATE_BYTES,
        }
    }

    /// Sets the rotation threshold in bytes.
    #[must_use]
    pub fn rotate_bytes(mut self, bytes: u64) -> Self {
        self.rotate_bytes = bytes;
        self
    }

    /// Whether logging is currently enabled.
    pub fn enabled(&self) -> bool {
        self.sentinel.exists()
    }

    /// Appends one timestamped line to the log.
    ///
    /// No-op when the sentinel flag file is absent. Any internal I/O
    /// failure is unobservable to the caller.
    pub fn log(&self, message: &str) {
        if !self.enabled() {
            return;
        }
        let _ = self.try_log(message);
    }

    fn try_log(&self, message: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(LOG_FILE_NAME);
        self.rotate_if_needed(&path)?;

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let timestamp = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        writeln!(file, "[{timestamp}] {message}")
    }

    /// Moves the log aside once it exceeds the threshold; the next append
    /// starts a fresh file. A previous `.1` file is replaced.
    fn rotate_if_needed(&self, path: &Path) -> std::io::Result<()> {
        match fs::metadata(path) {
            Ok(meta) if meta.len() > self.rotate_bytes => {
                let rotated = self.directory.join(format!("{LOG_FILE_NAME}.1"));
                fs::rename(path, rotated)
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
