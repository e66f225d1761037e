//! The hook trait and the narrow boundary types extracted from the
//! orchestration engine's objects.
//!
//! The engine's play/task/result/stats objects are an external,
//! uncontrolled object model. Rather than mirroring them, each hook takes
//! a plain struct carrying exactly the fields the pipeline reads; the
//! engine-side glue extracts them at hook time. Everything here is
//! transient, built and dropped within a single hook invocation.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::event::TaskStatus;

// ============================================================================
// Boundary Types
// ============================================================================

/// Play fields read at play start.
#[derive(Debug, Clone, Default)]
pub struct PlayInfo {
    /// Unique id of the play within the run.
    pub id: String,
    /// Base directory of the inventory bound to the play, when one exists.
    /// Carries the deploy id marker for runs launched by the deploy
    /// tooling; absent for ad-hoc invocations with no inventory manager.
    pub inventory_basedir: Option<String>,
}

/// Task fields read at task start and embedded in later task events.
#[derive(Debug, Clone, Default)]
pub struct TaskInfo {
    /// Unique id of the task.
    pub id: String,
    /// Task name.
    pub name: String,
    /// Source path of the task definition.
    pub path: String,
    /// Owning role, when the task belongs to one.
    pub role: Option<String>,
}

/// Per-host completion fields read when a task finishes on one host.
#[derive(Debug, Clone)]
pub struct TaskResultInfo {
    /// Host the task ran on.
    pub host: String,
    /// Final status classification.
    pub status: TaskStatus,
    /// Opaque module result payload, passed through untouched.
    pub result: serde_json::Value,
    /// The originating task.
    pub task: TaskInfo,
}

/// End-of-run aggregate counters, each a hostname-to-count mapping.
///
/// The source data is known to omit zero-valued hosts inconsistently;
/// [`crate::event::DeployEvent::stats`] backfills them before emission.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Hosts the run touched at all.
    pub processed: HashMap<String, u64>,
    /// Failed task count per host.
    pub failures: HashMap<String, u64>,
    /// Unreachable count per host.
    pub unreachable: HashMap<String, u64>,
    /// Changed task count per host.
    pub changed: HashMap<String, u64>,
    /// Skipped task count per host.
    pub skipped: HashMap<String, u64>,
    /// Successful task count per host.
    pub ok: HashMap<String, u64>,
}

// ============================================================================
// Hook Trait
// ============================================================================

/// Callback for receiving execution events from the orchestration engine.
///
/// The engine invokes these hooks synchronously on its own execution
/// thread at well-defined lifecycle points, in source order; hooks are
/// never invoked concurrently. All methods default to no-ops so an
/// implementation only overrides the moments it cares about.
#[async_trait]
pub trait ExecutionCallback: Send + Sync {
    /// Called once when a full orchestration run starts, before any play.
    /// Ad-hoc single-command invocations never fire this hook.
    async fn on_playbook_start(&self, playbook: &str) {
        let _ = playbook;
    }

    /// Called when a play starts.
    async fn on_play_start(&self, play: &PlayInfo) {
        let _ = play;
    }

    /// Called when a task starts.
    async fn on_task_start(&self, task: &TaskInfo) {
        let _ = task;
    }

    /// Called when a task file is dynamically included.
    async fn on_include_file(&self, filename: &str, task: &TaskInfo) {
        let _ = (filename, task);
    }

    /// Called when a task completes on one host, whatever the outcome.
    async fn on_task_result(&self, result: &TaskResultInfo) {
        let _ = result;
    }

    /// Called once at end of run with the final aggregate counters.
    async fn on_stats(&self, stats: &RunStats) {
        let _ = stats;
    }
}
