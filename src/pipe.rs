//! Best-effort transport over the deploy pipe.
//!
//! The pipe has a bounded kernel buffer and a reader this process does not
//! control. A slow or absent reader must never block or crash the run, so
//! every failure mode degrades to drop-and-report:
//!
//! - the pipe is opened write-only and non-blocking; with no reader
//!   attached the open fails immediately and the send is abandoned
//! - the payload is fragmented into chunks strictly smaller than the
//!   pipe's atomic-write limit, so a multi-chunk message never interleaves
//!   with another writer's message at the consumer
//! - a full buffer (`EAGAIN`) is retried with short sleeps, bounded by a
//!   wall-clock timeout per chunk; on timeout the rest of the message is
//!   dropped
//! - the handle is closed on every exit path
//!
//! Sends are synchronous and opened/closed per message, so two consecutive
//! events from one process are enqueued in program order even though the
//! reader may see them in separate reads.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identity::ChannelEndpoint;

/// Upper bound for a single pipe write, strictly below the platform's
/// atomic-write guarantee (`PIPE_BUF`).
pub const MAX_CHUNK: usize = libc::PIPE_BUF - 1;

/// Default wall-clock budget for writing one chunk.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Default sleep between retries while the pipe buffer is full.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// Pipe Sender
// ============================================================================

/// Fire-and-forget writer for the deploy pipe.
#[derive(Debug, Clone)]
pub struct PipeSender {
    send_timeout: Duration,
    retry_interval: Duration,
}

impl Default for PipeSender {
    fn default() -> Self {
        Self {
            send_timeout: DEFAULT_SEND_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl PipeSender {
    /// Creates a sender with default timing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sender with custom timing. Mainly a test seam; production
    /// callers keep the defaults.
    pub fn with_timing(send_timeout: Duration, retry_interval: Duration) -> Self {
        Self {
            send_timeout,
            retry_interval,
        }
    }

    /// Writes one newline-delimited message to the pipe.
    ///
    /// Returns an error instead of raising; callers at the hook boundary
    /// route it to diagnostics and drop the event. The pipe handle is
    /// released on every path.
    pub fn send(&self, endpoint: &ChannelEndpoint, message: &str) -> Result<()> {
        let path = endpoint.path();

        // No retry at open: an absent reader fails the whole send.
        let mut pipe = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| Error::PipeOpen {
                path: path.to_path_buf(),
                source,
            })?;

        let mut payload = Vec::with_capacity(message.len() + 1);
        payload.extend_from_slice(message.as_bytes());
        payload.push(b'\n');

        for chunk in payload.chunks(MAX_CHUNK) {
            self.write_chunk(&mut pipe, chunk, path)?;
        }

        debug!(pipe = %path.display(), bytes = payload.len(), "deploy event written");
        Ok(())
    }

    /// Writes one chunk, retrying `EAGAIN` and `EINTR` until the
    /// per-chunk deadline.
    fn write_chunk(&self, pipe: &mut impl Write, chunk: &[u8], path: &Path) -> Result<()> {
        let deadline = Instant::now() + self.send_timeout;
        let mut written = 0;

        while written < chunk.len() {
            match pipe.write(&chunk[written..]) {
                Ok(0) => {
                    return Err(Error::PipeWrite {
                        path: path.to_path_buf(),
                        source: std::io::Error::new(
                            ErrorKind::WriteZero,
                            "pipe accepted zero bytes",
                        ),
                    });
                }
                Ok(n) => written += n,
                // Both retryable kinds share the deadline, so a sustained
                // signal stream cannot stall past the timeout either.
                Err(e) if e.kind() == ErrorKind::WouldBlock
                    || e.kind() == ErrorKind::Interrupted =>
                {
                    if Instant::now() >= deadline {
                        warn!(
                            pipe = %path.display(),
                            timeout = ?self.send_timeout,
                            "pipe write kept retrying past timeout, dropping event"
                        );
                        return Err(Error::PipeTimeout {
                            path: path.to_path_buf(),
                            timeout: self.send_timeout,
                        });
                    }
                    if e.kind() == ErrorKind::WouldBlock {
                        thread::sleep(self.retry_interval);
                    }
                }
                Err(source) => {
                    return Err(Error::PipeWrite {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
