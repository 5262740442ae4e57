//! DAG runs and the task instances executed within them.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use skein_client::RunArgs;

/// One concrete execution of a DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DagRun {
    pub run_id: String,
    pub execution_date: DateTime<Utc>,
    #[serde(default)]
    pub external_trigger: bool,
    /// Trigger-time configuration supplied by whoever started the run.
    #[serde(default)]
    pub conf: BTreeMap<String, Value>,
}

impl DagRun {
    pub fn new(run_id: impl Into<String>, execution_date: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            execution_date,
            external_trigger: false,
            conf: BTreeMap::new(),
        }
    }

    pub fn with_external_trigger(mut self, external_trigger: bool) -> Self {
        self.external_trigger = external_trigger;
        self
    }

    pub fn with_conf(mut self, key: impl Into<String>, value: Value) -> Self {
        self.conf.insert(key.into(), value);
        self
    }

    /// Arguments reported with each job run: `external_trigger` plus the
    /// trigger conf. A conf key named `external_trigger` does not override
    /// the real flag.
    pub fn run_args(&self) -> RunArgs {
        let mut args: RunArgs = self.conf.clone();
        args.insert(
            "external_trigger".to_string(),
            Value::Bool(self.external_trigger),
        );
        args
    }
}

/// Execution state of a task instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    None,
    Scheduled,
    Queued,
    Running,
    Success,
    Failed,
    UpForRetry,
    UpstreamFailed,
    Skipped,
}

impl TaskState {
    /// Whether the task body ever began executing.
    pub fn is_started(&self) -> bool {
        matches!(
            self,
            TaskState::Running | TaskState::Success | TaskState::Failed | TaskState::UpForRetry
        )
    }
}

/// The result of executing one task within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInstance {
    pub task_id: String,
    pub state: TaskState,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub try_number: u32,
    /// Value the task body returned, if any.
    #[serde(default)]
    pub output: Option<Value>,
}

impl TaskInstance {
    pub fn new(task_id: impl Into<String>, state: TaskState) -> Self {
        Self {
            task_id: task_id.into(),
            state,
            start_date: None,
            end_date: None,
            try_number: 0,
            output: None,
        }
    }

    /// Stamp start and end dates, counting one attempt.
    pub fn ran(mut self, start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Self {
        self.start_date = Some(start_date);
        self.end_date = Some(end_date);
        self.try_number += 1;
        self
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }
}

/// Lookup of task results, supplied by the host when a run finishes.
pub trait TaskInstances: Send + Sync {
    fn task_instance(&self, dag_run_id: &str, task_id: &str) -> Option<TaskInstance>;
}

/// In-memory [`TaskInstances`] keyed by run and task id.
#[derive(Debug, Clone, Default)]
pub struct TaskInstanceMap {
    instances: HashMap<(String, String), TaskInstance>,
}

impl TaskInstanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) the instance of `instance.task_id` in `dag_run_id`.
    pub fn insert(&mut self, dag_run_id: impl Into<String>, instance: TaskInstance) {
        self.instances
            .insert((dag_run_id.into(), instance.task_id.clone()), instance);
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl TaskInstances for TaskInstanceMap {
    fn task_instance(&self, dag_run_id: &str, task_id: &str) -> Option<TaskInstance> {
        self.instances
            .get(&(dag_run_id.to_string(), task_id.to_string()))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn default_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_run_args_default() {
        let run = DagRun::new("run-1", default_date());
        assert_eq!(
            run.run_args(),
            RunArgs::from([("external_trigger".to_string(), json!(false))])
        );
    }

    #[test]
    fn test_run_args_include_conf() {
        let run = DagRun::new("run-1", default_date())
            .with_external_trigger(true)
            .with_conf("region", json!("eu"))
            .with_conf("external_trigger", json!("spoofed"));
        let args = run.run_args();
        assert_eq!(args["region"], "eu");
        assert_eq!(args["external_trigger"], true);
    }

    #[test]
    fn test_task_state_started() {
        assert!(TaskState::Success.is_started());
        assert!(TaskState::Failed.is_started());
        assert!(TaskState::Running.is_started());
        assert!(!TaskState::None.is_started());
        assert!(!TaskState::Queued.is_started());
        assert!(!TaskState::Skipped.is_started());
        assert!(!TaskState::UpstreamFailed.is_started());
    }

    #[test]
    fn test_instance_map_is_keyed_by_run() {
        let mut map = TaskInstanceMap::new();
        map.insert(
            "run-1",
            TaskInstance::new("load", TaskState::Success).ran(default_date(), default_date()),
        );
        map.insert("run-2", TaskInstance::new("load", TaskState::Failed));

        assert_eq!(map.len(), 2);
        let first = map.task_instance("run-1", "load").unwrap();
        assert_eq!(first.state, TaskState::Success);
        assert_eq!(first.try_number, 1);
        assert_eq!(
            map.task_instance("run-2", "load").unwrap().state,
            TaskState::Failed
        );
        assert!(map.task_instance("run-3", "load").is_none());
    }
}
