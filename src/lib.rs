//! # Kolla Pipe - Deploy Progress Event Streaming
//!
//! kolla-pipe observes a multi-host provisioning run in progress and
//! streams structured progress events to an out-of-process consumer over a
//! named pipe. It is the reporting side of a deploy UI: the external
//! tooling creates `<tmp>/kolla_<deploy_id>/.kolla_pipe` before launching
//! the run, and this crate's callback writes one JSON line per lifecycle
//! event into it, best-effort.
//!
//! ## Core Concepts
//!
//! - **Deploy id**: token correlating all events from one run, discovered
//!   lazily from the inventory base directory at the first play start
//! - **Events**: five kinds (`play_start`, `task_start`, `task_end`,
//!   `includefile`, `stats`), each a tagged JSON line with fixed wire
//!   keys (`playbook_path`, `task_id`, `task_name`, `task_path`,
//!   `role_name`, `result_payload`, ...)
//! - **Transport**: non-blocking pipe writes, fragmented below the atomic
//!   write limit, retried under a bounded timeout, dropped on failure
//! - **Failure boundary**: every hook swallows its own failures; a bad or
//!   undeliverable event never aborts or stalls the run
//!
//! ## Architecture Overview
//!
//! ```text
//! orchestration engine
//!         │  lifecycle hooks (ExecutionCallback)
//!         ▼
//! ┌──────────────────┐     ┌───────────────┐
//! │  PipeCallback    │────▶│  DeployEvent  │  build + serialize
//! │  (dispatcher +   │     └───────┬───────┘
//! │   run identity)  │             ▼
//! └──────────────────┘     ┌───────────────┐     ┌──────────────────┐
//!         │                │  PipeSender   │────▶│ named pipe (FIFO)│
//!         ▼                └───────────────┘     └──────────────────┘
//! ┌──────────────────┐
//! │    DebugLog      │  opt-in fault visibility
//! └──────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kolla_pipe::{ExecutionCallback, PipeCallback, PlayInfo};
//!
//! # async fn run() {
//! let callback = Arc::new(PipeCallback::new());
//!
//! // The engine drives the hooks; shown inline for illustration.
//! callback.on_playbook_start("site.yml").await;
//! callback
//!     .on_play_start(&PlayInfo {
//!         id: "play-1".into(),
//!         inventory_basedir: Some("/tmp/kolla_run42".into()),
//!     })
//!     .await;
//! # }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod callback;
pub mod debug_log;
pub mod error;
pub mod event;
pub mod identity;
pub mod pipe;
pub mod traits;

pub use callback::{PipeCallback, PipeCallbackConfig, PipeCallbackConfigBuilder};
pub use debug_log::DebugLog;
pub use error::{Error, Result};
pub use event::{DeployEvent, TaskIdentity, TaskStatus};
pub use identity::{ChannelEndpoint, DeployId, DEPLOY_ID_MARKER, PIPE_FILE_NAME};
pub use pipe::{PipeSender, DEFAULT_RETRY_INTERVAL, DEFAULT_SEND_TIMEOUT, MAX_CHUNK};
pub use traits::{ExecutionCallback, PlayInfo, RunStats, TaskInfo, TaskResultInfo};
