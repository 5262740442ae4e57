//! DAG definitions, in code or loaded from TOML.
//!
//! # Example TOML
//!
//! ```toml
//! [dag]
//! id = "orders_daily"
//! description = "Load and aggregate the day's orders"
//! schedule = "@daily"
//! namespace = "analytics"
//!
//! [dag.default_args]
//! owner = "data-eng"
//! retries = 1
//!
//! [[dag.tasks]]
//! id = "load_orders"
//! kind = "declared"
//! line = 12
//!
//! [dag.tasks.params.lineage]
//! source = { type = "POSTGRESQL", name = "warehouse", connection_url = "postgres://db/wh" }
//! inputs = ["raw.orders"]
//! outputs = ["staging.orders"]
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use skein_config::DEFAULT_OWNER;
use skein_types::JobType;
use tracing::debug;

use crate::error::{LineageError, Result};
use crate::schedule::Schedule;
use crate::task::{SourceLocation, Task, TaskKind};

/// Arguments applied to every task of a DAG.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultArgs {
    pub owner: Option<String>,
    pub depends_on_past: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub email: Vec<String>,
    pub email_on_failure: bool,
    pub email_on_retry: bool,
    pub retries: u32,
}

impl DefaultArgs {
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

/// A workflow: an id, scheduling settings, and tasks in registration order.
#[derive(Debug, Clone, PartialEq)]
pub struct DagDefinition {
    dag_id: String,
    description: Option<String>,
    schedule: Option<Schedule>,
    default_args: DefaultArgs,
    namespace: Option<String>,
    fileloc: Option<PathBuf>,
    tasks: Vec<Task>,
}

impl DagDefinition {
    pub fn new(dag_id: impl Into<String>) -> Self {
        Self {
            dag_id: dag_id.into(),
            description: None,
            schedule: None,
            default_args: DefaultArgs::default(),
            namespace: None,
            fileloc: None,
            tasks: Vec::new(),
        }
    }

    /// Parse and validate a DAG from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        DagFile::from_toml(toml_str)?.into_definition(None)
    }

    /// Load and validate a DAG from a TOML file. The path becomes the DAG's
    /// `fileloc`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| LineageError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let dag = DagFile::from_toml(&content)?.into_definition(Some(path.to_path_buf()))?;
        debug!(dag_id = %dag.dag_id, path = %path.display(), tasks = dag.tasks.len(), "Loaded DAG");
        Ok(dag)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn with_default_args(mut self, default_args: DefaultArgs) -> Self {
        self.default_args = default_args;
        self
    }

    /// Register this DAG's jobs under `namespace` instead of the configured one.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// File the DAG is defined in.
    pub fn with_fileloc(mut self, fileloc: impl Into<PathBuf>) -> Self {
        self.fileloc = Some(fileloc.into());
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn add_task(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn dag_id(&self) -> &str {
        &self.dag_id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }

    pub fn default_args(&self) -> &DefaultArgs {
        &self.default_args
    }

    /// Explicit namespace, if the DAG names one.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.trim().is_empty())
    }

    /// Owner from the default args, falling back to [`DEFAULT_OWNER`].
    pub fn owner(&self) -> &str {
        self.default_args
            .owner
            .as_deref()
            .filter(|owner| !owner.trim().is_empty())
            .unwrap_or(DEFAULT_OWNER)
    }

    pub fn fileloc(&self) -> Option<&Path> {
        self.fileloc.as_deref()
    }

    /// Tasks in registration order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.task_id() == task_id)
    }

    /// Where `task` is defined: its own location, else the DAG file.
    pub fn location_of(&self, task: &Task) -> Option<SourceLocation> {
        task.location()
            .cloned()
            .or_else(|| self.fileloc.as_ref().map(SourceLocation::new))
    }

    /// Check structural validity.
    pub fn validate(&self) -> Result<()> {
        if self.dag_id.trim().is_empty() {
            return Err(LineageError::InvalidDag("DAG id cannot be empty".into()));
        }

        if self.tasks.is_empty() {
            return Err(LineageError::InvalidDag(format!(
                "DAG '{}' must have at least one task",
                self.dag_id
            )));
        }

        let mut seen_ids = HashSet::new();
        for task in &self.tasks {
            if task.task_id().trim().is_empty() {
                return Err(LineageError::InvalidDag(format!(
                    "Task id cannot be empty in DAG '{}'",
                    self.dag_id
                )));
            }
            if task.kind().as_str().trim().is_empty() {
                return Err(LineageError::InvalidDag(format!(
                    "Task '{}' must have a kind",
                    task.task_id()
                )));
            }
            if !seen_ids.insert(task.task_id()) {
                return Err(LineageError::InvalidDag(format!(
                    "Duplicate task id: {}",
                    task.task_id()
                )));
            }
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TOML form
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level wrapper matching the TOML structure `[dag]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DagFile {
    pub dag: DagSpec,
}

/// The `[dag]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DagSpec {
    pub id: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub schedule: Option<Schedule>,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub default_args: DefaultArgs,

    pub tasks: Vec<TaskSpec>,
}

/// One `[[dag.tasks]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskSpec {
    pub id: String,

    pub kind: TaskKind,

    #[serde(default)]
    pub params: Option<Value>,

    #[serde(default)]
    pub job_type: Option<JobType>,

    #[serde(default)]
    pub description: Option<String>,

    /// Defining file; defaults to the DAG file itself.
    #[serde(default)]
    pub file: Option<PathBuf>,

    #[serde(default)]
    pub line: Option<u32>,
}

impl DagFile {
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Build and validate the definition. `fileloc` is the file the TOML was
    /// read from, if any.
    pub fn into_definition(self, fileloc: Option<PathBuf>) -> Result<DagDefinition> {
        let spec = self.dag;
        let mut dag = DagDefinition::new(spec.id).with_default_args(spec.default_args);
        dag.description = spec.description;
        dag.schedule = spec.schedule;
        dag.namespace = spec.namespace;
        dag.fileloc = fileloc;

        for task_spec in spec.tasks {
            let mut task = Task::new(task_spec.id, task_spec.kind);
            if let Some(params) = task_spec.params {
                task = task.with_params(params);
            }
            if let Some(job_type) = task_spec.job_type {
                task = task.with_job_type(job_type);
            }
            if let Some(description) = task_spec.description {
                task = task.with_description(description);
            }
            let file = task_spec.file.or_else(|| dag.fileloc.clone());
            if let Some(file) = file {
                let mut location = SourceLocation::new(file);
                location.line = task_spec.line;
                task = task.with_location(location);
            }
            dag.add_task(task);
        }

        dag.validate()?;
        Ok(dag)
    }
}
