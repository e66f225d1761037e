//! Shared helpers for integration tests against a real named pipe.

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nix::sys::stat::Mode;
use nix::unistd::mkfifo;

/// Creates a FIFO the way the external deploy tooling would.
pub fn make_fifo(path: &Path) {
    mkfifo(path, Mode::from_bits_truncate(0o644)).unwrap();
}

/// Background reader draining a FIFO into memory.
///
/// The read end is opened non-blocking so tests never deadlock waiting
/// for a writer, and stays open across the per-message open/close cycles
/// of the sender.
pub struct PipeReader {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Vec<u8>>,
}

impl PipeReader {
    pub fn start(path: &Path) -> Self {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let handle = thread::spawn({
            let stop = Arc::clone(&stop);
            move || drain(file, &stop)
        });
        Self { stop, handle }
    }

    /// Stops the reader once the pipe is drained and returns the collected
    /// lines.
    pub fn finish(self) -> Vec<String> {
        self.stop.store(true, Ordering::SeqCst);
        let bytes = self.handle.join().unwrap();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn drain(mut file: File, stop: &AtomicBool) -> Vec<u8> {
    let mut collected = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        match file.read(&mut buf) {
            Ok(0) => {
                // EOF just means no writer is attached right now.
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                thread::sleep(Duration::from_millis(2));
            }
            Ok(n) => collected.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                thread::sleep(Duration::from_millis(2));
            }
            Err(_) => break,
        }
    }
    collected
}
