//! Deploy event model and wire serialization.
//!
//! Five event kinds cover the observable lifecycle of a run. Each
//! serializes to a single self-describing JSON line tagged with an
//! `action` discriminator:
//!
//! ```json
//! {"action":"play_start","playbook_path":"site.yml","play_id":"0a1b..."}
//! {"action":"task_start","task_id":"9f2c...","task_name":"Pull images","task_path":"roles/common/tasks/pull.yml","role_name":"common"}
//! {"action":"task_end","host":"control01","status":"ok","result_payload":{...},"task":{...}}
//! {"action":"includefile","filename":"roles/common/tasks/deploy.yml","task":{...}}
//! {"action":"stats","processed":{"control01":1},"failures":{"control01":0},...}
//! ```
//!
//! Events are immutable once constructed. The consumer reads line-delimited
//! records and tolerates partial or absent delivery; there are no sequence
//! numbers and no acknowledgments.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::traits::{RunStats, TaskInfo, TaskResultInfo};

// ============================================================================
// Task Status
// ============================================================================

/// Final status classification of a task on one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Completed successfully.
    Ok,
    /// Failed.
    Failed,
    /// Skipped due to a condition.
    Skipped,
    /// Host could not be reached.
    Unreachable,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Ok => write!(f, "ok"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Skipped => write!(f, "skipped"),
            TaskStatus::Unreachable => write!(f, "unreachable"),
        }
    }
}

// ============================================================================
// Task Identity
// ============================================================================

/// Task fields shared by task-scoped events, flattened into `task_start`
/// and embedded under `task` in `task_end` and `includefile`.
///
/// Wire keys carry the `task_`/`_name` prefixes the consumer contract
/// fixes (`task_id`, `task_name`, `task_path`, `role_name`).
#[derive(Debug, Clone, Serialize)]
pub struct TaskIdentity {
    /// Unique id of the task.
    #[serde(rename = "task_id")]
    pub id: String,
    /// Task name.
    #[serde(rename = "task_name")]
    pub name: String,
    /// Source path of the task definition.
    #[serde(rename = "task_path")]
    pub path: String,
    /// Owning role; empty string when the task has no role.
    #[serde(rename = "role_name")]
    pub role: String,
}

impl From<&TaskInfo> for TaskIdentity {
    fn from(task: &TaskInfo) -> Self {
        Self {
            id: task.id.clone(),
            name: task.name.clone(),
            path: task.path.clone(),
            role: task.role.clone().unwrap_or_default(),
        }
    }
}

// ============================================================================
// Deploy Event
// ============================================================================

/// A tagged variant over the five observable lifecycle events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DeployEvent {
    /// A play started.
    PlayStart {
        /// Entry-point path of the run, captured at playbook start.
        #[serde(rename = "playbook_path")]
        playbook: String,
        /// Unique id of the play.
        play_id: String,
    },
    /// A task started.
    TaskStart {
        #[serde(flatten)]
        task: TaskIdentity,
    },
    /// A task finished on one host.
    TaskEnd {
        host: String,
        status: TaskStatus,
        /// Opaque module result payload.
        #[serde(rename = "result_payload")]
        result: serde_json::Value,
        task: TaskIdentity,
    },
    /// A task file was dynamically included.
    #[serde(rename = "includefile")]
    IncludeFile {
        filename: String,
        task: TaskIdentity,
    },
    /// End-of-run aggregate counters, one mapping per outcome.
    Stats {
        processed: HashMap<String, u64>,
        failures: HashMap<String, u64>,
        unreachable: HashMap<String, u64>,
        changed: HashMap<String, u64>,
        skipped: HashMap<String, u64>,
        ok: HashMap<String, u64>,
    },
}

impl DeployEvent {
    /// Builds a `play_start` event.
    pub fn play_start(playbook: impl Into<String>, play_id: impl Into<String>) -> Self {
        Self::PlayStart {
            playbook: playbook.into(),
            play_id: play_id.into(),
        }
    }

    /// Builds a `task_start` event.
    pub fn task_start(task: &TaskInfo) -> Self {
        Self::TaskStart { task: task.into() }
    }

    /// Builds a `task_end` event from a per-host completion.
    pub fn task_end(result: &TaskResultInfo) -> Self {
        Self::TaskEnd {
            host: result.host.clone(),
            status: result.status,
            result: result.result.clone(),
            task: (&result.task).into(),
        }
    }

    /// Builds an `includefile` event.
    pub fn include_file(filename: impl Into<String>, task: &TaskInfo) -> Self {
        Self::IncludeFile {
            filename: filename.into(),
            task: task.into(),
        }
    }

    /// Builds a `stats` event, backfilling every host present in
    /// `processed` with a zero count in each outcome mapping it is missing
    /// from. The source counters omit zero-valued hosts inconsistently;
    /// `processed` itself is taken as-is.
    pub fn stats(stats: &RunStats) -> Self {
        let processed = stats.processed.clone();
        let mut failures = stats.failures.clone();
        let mut unreachable = stats.unreachable.clone();
        let mut changed = stats.changed.clone();
        let mut skipped = stats.skipped.clone();
        let mut ok = stats.ok.clone();

        for host in processed.keys() {
            for counts in [
                &mut failures,
                &mut unreachable,
                &mut changed,
                &mut skipped,
                &mut ok,
            ] {
                counts.entry(host.clone()).or_insert(0);
            }
        }

        Self::Stats {
            processed,
            failures,
            unreachable,
            changed,
            skipped,
            ok,
        }
    }

    /// Returns the `action` discriminator for this event.
    pub fn action(&self) -> &'static str {
        match self {
            DeployEvent::PlayStart { .. } => "play_start",
            DeployEvent::TaskStart { .. } => "task_start",
            DeployEvent::TaskEnd { .. } => "task_end",
            DeployEvent::IncludeFile { .. } => "includefile",
            DeployEvent::Stats { .. } => "stats",
        }
    }

    /// Serializes the event to its single-line wire form.
    pub fn to_wire(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn task() -> TaskInfo {
        TaskInfo {
            id: "uuid-1".to_string(),
            name: "Pull images".to_string(),
            path: "roles/common/tasks/pull.yml".to_string(),
            role: Some("common".to_string()),
        }
    }

    fn wire(event: &DeployEvent) -> Value {
        serde_json::from_str(&event.to_wire().unwrap()).unwrap()
    }

    #[test]
    fn test_play_start_wire_form() {
        let v = wire(&DeployEvent::play_start("site.yml", "play-1"));
        assert_eq!(v["action"], "play_start");
        assert_eq!(v["playbook_path"], "site.yml");
        assert_eq!(v["play_id"], "play-1");
    }

    #[test]
    fn test_task_start_flattens_identity() {
        let v = wire(&DeployEvent::task_start(&task()));
        assert_eq!(v["action"], "task_start");
        assert_eq!(v["task_id"], "uuid-1");
        assert_eq!(v["task_name"], "Pull images");
        assert_eq!(v["task_path"], "roles/common/tasks/pull.yml");
        assert_eq!(v["role_name"], "common");
    }

    #[test]
    fn test_roleless_task_normalizes_to_empty_string() {
        let v = wire(&DeployEvent::task_start(&TaskInfo {
            role: None,
            ..task()
        }));
        assert_eq!(v["role_name"], "");
    }

    #[test]
    fn test_task_end_embeds_task_and_payload() {
        let result = TaskResultInfo {
            host: "control01".to_string(),
            status: TaskStatus::Failed,
            result: json!({"msg": "image not found", "rc": 1}),
            task: task(),
        };
        let v = wire(&DeployEvent::task_end(&result));
        assert_eq!(v["action"], "task_end");
        assert_eq!(v["host"], "control01");
        assert_eq!(v["status"], "failed");
        assert_eq!(v["result_payload"]["rc"], 1);
        assert_eq!(v["task"]["task_id"], "uuid-1");
        assert_eq!(v["task"]["role_name"], "common");
    }

    #[test]
    fn test_includefile_uses_legacy_tag() {
        let v = wire(&DeployEvent::include_file("tasks/deploy.yml", &task()));
        assert_eq!(v["action"], "includefile");
        assert_eq!(v["filename"], "tasks/deploy.yml");
        assert_eq!(v["task"]["task_name"], "Pull images");
    }

    #[test]
    fn test_wire_keys_follow_consumer_contract() {
        // Exact key sets the out-of-process consumer parses; the Rust
        // field names stay short, the wire names do not.
        let keys = |event: &DeployEvent| -> Vec<String> {
            let mut k: Vec<String> = wire(event)
                .as_object()
                .unwrap()
                .keys()
                .cloned()
                .collect();
            k.sort();
            k
        };

        assert_eq!(
            keys(&DeployEvent::play_start("site.yml", "p1")),
            vec!["action", "play_id", "playbook_path"]
        );
        assert_eq!(
            keys(&DeployEvent::task_start(&task())),
            vec!["action", "role_name", "task_id", "task_name", "task_path"]
        );
        let end = DeployEvent::task_end(&TaskResultInfo {
            host: "h".to_string(),
            status: TaskStatus::Ok,
            result: json!({}),
            task: task(),
        });
        assert_eq!(
            keys(&end),
            vec!["action", "host", "result_payload", "status", "task"]
        );
        let embedded = wire(&end);
        let mut task_keys: Vec<&str> = embedded["task"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        task_keys.sort_unstable();
        assert_eq!(
            task_keys,
            vec!["role_name", "task_id", "task_name", "task_path"]
        );
        assert_eq!(
            keys(&DeployEvent::include_file("f.yml", &task())),
            vec!["action", "filename", "task"]
        );
        assert_eq!(
            keys(&DeployEvent::stats(&RunStats::default())),
            vec![
                "action",
                "changed",
                "failures",
                "ok",
                "processed",
                "skipped",
                "unreachable"
            ]
        );
    }

    #[test]
    fn test_stats_backfills_missing_hosts() {
        let mut stats = RunStats::default();
        stats.processed.insert("control01".to_string(), 1);
        stats.processed.insert("compute01".to_string(), 1);
        stats.ok.insert("control01".to_string(), 12);
        stats.failures.insert("compute01".to_string(), 2);

        let v = wire(&DeployEvent::stats(&stats));
        assert_eq!(v["action"], "stats");

        // Every host in processed appears in all five outcome mappings.
        for key in ["failures", "unreachable", "changed", "skipped", "ok"] {
            let map = v[key].as_object().unwrap();
            assert!(map.contains_key("control01"), "{key} missing control01");
            assert!(map.contains_key("compute01"), "{key} missing compute01");
        }
        assert_eq!(v["ok"]["control01"], 12);
        assert_eq!(v["ok"]["compute01"], 0);
        assert_eq!(v["failures"]["compute01"], 2);
        assert_eq!(v["failures"]["control01"], 0);
    }

    #[test]
    fn test_stats_hostname_sets_identical_after_backfill() {
        let mut stats = RunStats::default();
        for host in ["a", "b", "c"] {
            stats.processed.insert(host.to_string(), 1);
        }
        stats.skipped.insert("b".to_string(), 3);

        let v = wire(&DeployEvent::stats(&stats));
        let keys = |name: &str| -> Vec<String> {
            let mut k: Vec<String> = v[name].as_object().unwrap().keys().cloned().collect();
            k.sort();
            k
        };
        let reference = keys("processed");
        for name in ["failures", "unreachable", "changed", "skipped", "ok"] {
            assert_eq!(keys(name), reference);
        }
    }

    #[test]
    fn test_stats_does_not_touch_processed() {
        // A host appearing only in an outcome mapping stays there; processed
        // is not corrected (inherited behavior).
        let mut stats = RunStats::default();
        stats.processed.insert("a".to_string(), 1);
        stats.ok.insert("ghost".to_string(), 1);

        let v = wire(&DeployEvent::stats(&stats));
        assert!(!v["processed"].as_object().unwrap().contains_key("ghost"));
        assert!(v["ok"].as_object().unwrap().contains_key("ghost"));
    }

    #[test]
    fn test_action_matches_wire_tag() {
        let events = vec![
            DeployEvent::play_start("site.yml", "p"),
            DeployEvent::task_start(&task()),
            DeployEvent::include_file("f.yml", &task()),
            DeployEvent::stats(&RunStats::default()),
        ];
        for event in events {
            assert_eq!(wire(&event)["action"], event.action());
        }
    }

    #[test]
    fn test_status_serialization() {
        for (status, expected) in [
            (TaskStatus::Ok, "ok"),
            (TaskStatus::Failed, "failed"),
            (TaskStatus::Skipped, "skipped"),
            (TaskStatus::Unreachable, "unreachable"),
        ] {
            assert_eq!(serde_json::to_value(status).unwrap(), expected);
            assert_eq!(status.to_string(), expected);
        }
    }

    #[test]
    fn test_wire_form_is_single_line() {
        let result = TaskResultInfo {
            host: "h".to_string(),
            status: TaskStatus::Ok,
            result: json!({"stdout": "line1\nline2"}),
            task: task(),
        };
        let line = DeployEvent::task_end(&result).to_wire().unwrap();
        assert!(!line.contains('\n'));
    }
}
