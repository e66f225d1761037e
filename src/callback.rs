//! Deploy pipe callback: the lifecycle dispatcher.
//!
//! `PipeCallback` receives the engine's lifecycle hooks, correlates them
//! against a deploy identity discovered lazily at the first play start,
//! and streams the matching events over the deploy pipe.
//!
//! # State machine
//!
//! A run is either `Unidentified` or `Active`. The single transition
//! happens at the first play start, if and only if this is a full
//! orchestration run (a playbook-start hook fired) and the play's
//! inventory base directory resolves to a deploy id. There is no
//! transition back; while unidentified, every hook except play start is a
//! no-op, so ad-hoc invocations emit nothing for their whole lifetime.
//!
//! # Failure boundary
//!
//! Every hook routes serialization and transport failures to the
//! diagnostic log and `tracing`, then returns normally. One bad event
//! never stops the run or crosses into the engine's notification loop.
//!
//! # Usage
//!
//! ```rust,ignore
//! use kolla_pipe::{PipeCallback, PipeCallbackConfig};
//!
//! // Production defaults: system temp dir, 5s send timeout.
//! let callback = PipeCallback::new();
//!
//! // Or with custom settings
//! let config = PipeCallbackConfig::builder()
//!     .runtime_dir("/run/kolla")
//!     .send_timeout(Duration::from_secs(2))
//!     .build();
//! let callback = PipeCallback::with_config(config);
//!
//! engine.register_callback(Arc::new(callback));
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::debug_log::DebugLog;
use crate::error::Error;
use crate::event::DeployEvent;
use crate::identity::{ChannelEndpoint, DeployId};
use crate::pipe::{PipeSender, DEFAULT_RETRY_INTERVAL, DEFAULT_SEND_TIMEOUT};
use crate::traits::{ExecutionCallback, PlayInfo, RunStats, TaskInfo, TaskResultInfo};

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the deploy pipe callback.
#[derive(Debug, Clone)]
pub struct PipeCallbackConfig {
    /// Directory under which per-run pipe directories live.
    /// Defaults to the system temp dir.
    pub runtime_dir: PathBuf,
    /// Wall-clock budget for writing one chunk to the pipe.
    pub send_timeout: Duration,
    /// Sleep between retries while the pipe buffer is full.
    pub retry_interval: Duration,
    /// Diagnostic logger shared by all hooks.
    pub debug_log: DebugLog,
}

impl Default for PipeCallbackConfig {
    fn default() -> Self {
        Self {
            runtime_dir: env::temp_dir(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            debug_log: DebugLog::new(),
        }
    }
}

impl PipeCallbackConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> PipeCallbackConfigBuilder {
        PipeCallbackConfigBuilder::default()
    }
}

/// Builder for `PipeCallbackConfig`.
#[derive(Debug, Default)]
pub struct PipeCallbackConfigBuilder {
    config: PipeCallbackConfig,
}

impl PipeCallbackConfigBuilder {
    /// Sets the runtime directory holding per-run pipe directories.
    #[must_use]
    pub fn runtime_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.runtime_dir = dir.into();
        self
    }

    /// Sets the per-chunk send timeout.
    #[must_use]
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.config.send_timeout = timeout;
        self
    }

    /// Sets the retry interval used while the pipe buffer is full.
    #[must_use]
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.config.retry_interval = interval;
        self
    }

    /// Sets the diagnostic logger.
    #[must_use]
    pub fn debug_log(mut self, log: DebugLog) -> Self {
        self.config.debug_log = log;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> PipeCallbackConfig {
        self.config
    }
}

// ============================================================================
// Run State
// ============================================================================

/// Phase of the run with respect to identity resolution.
#[derive(Debug, Clone)]
enum RunPhase {
    /// No deploy id yet; only play start may advance the state.
    Unidentified,
    /// Identity resolved and endpoint fixed for the rest of the run.
    Active {
        deploy_id: DeployId,
        endpoint: ChannelEndpoint,
    },
}

/// Per-run context, written only under the engine's single-threaded hook
/// calling convention.
#[derive(Debug)]
struct RunState {
    phase: RunPhase,
    /// Set by the playbook-start hook; ad-hoc invocations never set it.
    full_run: bool,
    /// Entry-point path of the run, included in every `play_start` event.
    playbook: Option<String>,
}

impl RunState {
    fn new() -> Self {
        Self {
            phase: RunPhase::Unidentified,
            full_run: false,
            playbook: None,
        }
    }
}

// ============================================================================
// Pipe Callback
// ============================================================================

/// Callback streaming deploy progress events over the per-run named pipe.
#[derive(Debug)]
pub struct PipeCallback {
    config: PipeCallbackConfig,
    sender: PipeSender,
    state: Arc<RwLock<RunState>>,
}

impl Default for PipeCallback {
    fn default() -> Self {
        Self::new()
    }
}

impl PipeCallback {
    /// Creates a callback with production defaults.
    pub fn new() -> Self {
        Self::with_config(PipeCallbackConfig::default())
    }

    /// Creates a callback with the given configuration.
    pub fn with_config(config: PipeCallbackConfig) -> Self {
        let sender = PipeSender::with_timing(config.send_timeout, config.retry_interval);
        Self {
            config,
            sender,
            state: Arc::new(RwLock::new(RunState::new())),
        }
    }

    /// Returns the resolved deploy id, if the run has one.
    pub fn deploy_id(&self) -> Option<DeployId> {
        match &self.state.read().phase {
            RunPhase::Active { deploy_id, .. } => Some(deploy_id.clone()),
            RunPhase::Unidentified => None,
        }
    }

    /// Whether the run has transitioned to the active phase.
    pub fn is_active(&self) -> bool {
        matches!(self.state.read().phase, RunPhase::Active { .. })
    }

    /// Returns the fixed endpoint while active.
    fn endpoint(&self) -> Option<ChannelEndpoint> {
        match &self.state.read().phase {
            RunPhase::Active { endpoint, .. } => Some(endpoint.clone()),
            RunPhase::Unidentified => None,
        }
    }

    /// Attempts the one-time transition to the active phase. Only the
    /// first play start of a full run with a resolvable identity advances
    /// the state; everything else leaves it untouched.
    fn identify(&self, play: &PlayInfo) {
        let mut state = self.state.write();
        if !matches!(state.phase, RunPhase::Unidentified) {
            return;
        }
        if !state.full_run {
            debug!("ad-hoc invocation, deploy events suppressed");
            return;
        }
        match DeployId::resolve(play.inventory_basedir.as_deref()) {
            Some(deploy_id) => {
                let endpoint = ChannelEndpoint::new(&self.config.runtime_dir, &deploy_id);
                debug!(
                    deploy_id = %deploy_id,
                    pipe = %endpoint.path().display(),
                    "deploy identity resolved"
                );
                state.phase = RunPhase::Active {
                    deploy_id,
                    endpoint,
                };
            }
            None => {
                debug!(
                    basedir = play.inventory_basedir.as_deref().unwrap_or(""),
                    "inventory basedir carries no deploy identity"
                );
            }
        }
    }

    /// Serializes and sends one event, routing any failure to diagnostics.
    fn deliver(&self, event: &DeployEvent, endpoint: &ChannelEndpoint) {
        let line = match event.to_wire() {
            Ok(line) => line,
            Err(err) => {
                self.fault(event.action(), &err);
                return;
            }
        };
        if let Err(err) = self.sender.send(endpoint, &line) {
            self.fault(event.action(), &err);
        }
    }

    fn fault(&self, hook: &str, err: &Error) {
        warn!(hook, error = %err, "deploy event dropped");
        self.config.debug_log.log(&format!("{hook}: {err}"));
    }
}

#[async_trait]
impl ExecutionCallback for PipeCallback {
    async fn on_playbook_start(&self, playbook: &str) {
        let mut state = self.state.write();
        state.full_run = true;
        state.playbook = Some(playbook.to_string());
        debug!(playbook, "full orchestration run started");
    }

    async fn on_play_start(&self, play: &PlayInfo) {
        self.identify(play);
        let Some(endpoint) = self.endpoint() else {
            return;
        };
        let playbook = self.state.read().playbook.clone().unwrap_or_default();
        self.deliver(&DeployEvent::play_start(playbook, play.id.clone()), &endpoint);
    }

    async fn on_task_start(&self, task: &TaskInfo) {
        let Some(endpoint) = self.endpoint() else {
            return;
        };
        self.deliver(&DeployEvent::task_start(task), &endpoint);
    }

    async fn on_include_file(&self, filename: &str, task: &TaskInfo) {
        let Some(endpoint) = self.endpoint() else {
            return;
        };
        self.deliver(&DeployEvent::include_file(filename, task), &endpoint);
    }

    async fn on_task_result(&self, result: &TaskResultInfo) {
        let Some(endpoint) = self.endpoint() else {
            return;
        };
        self.deliver(&DeployEvent::task_end(result), &endpoint);
    }

    async fn on_stats(&self, stats: &RunStats) {
        let Some(endpoint) = self.endpoint() else {
            return;
        };
        self.deliver(&DeployEvent::stats(stats), &endpoint);
    }
}

// ============================================================================
// Tests
// ============================================================================
