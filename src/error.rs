//! Error types for kolla-pipe.
//!
//! Every failure in the pipeline surfaces as a variant here. Nothing in
//! this crate propagates an error into the orchestration engine's
//! notification loop: the hook entry points in [`crate::callback`] catch
//! these values and route them to the diagnostic log.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for kolla-pipe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for kolla-pipe.
#[derive(Error, Debug)]
pub enum Error {
    /// Opening the deploy pipe failed (no reader attached, path missing,
    /// permissions). The send is abandoned without retry.
    #[error("Failed to open deploy pipe '{path}': {source}")]
    PipeOpen {
        /// Path to the pipe
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A chunk could not be written within the send timeout; the event is
    /// dropped, not queued.
    #[error("Timed out writing to deploy pipe '{path}' after {timeout:?}")]
    PipeTimeout {
        /// Path to the pipe
        path: PathBuf,
        /// Configured per-chunk timeout
        timeout: Duration,
    },

    /// A pipe write failed with an unrecoverable I/O error (reader went
    /// away mid-message, broken pipe).
    #[error("Failed to write to deploy pipe '{path}': {source}")]
    PipeWrite {
        /// Path to the pipe
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A deploy event could not be serialized to its wire form.
    #[error("Failed to serialize deploy event: {0}")]
    EventSerialize(#[from] serde_json::Error),
}
