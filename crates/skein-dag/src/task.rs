//! Tasks: the nodes of a DAG.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use skein_types::JobType;

/// Identifies a task implementation, e.g. `"postgres"` or `"bash"`.
///
/// Extractors are registered against this key and looked up by exact match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskKind(String);

impl TaskKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskKind {
    fn from(kind: &str) -> Self {
        Self::new(kind)
    }
}

impl From<String> for TaskKind {
    fn from(kind: String) -> Self {
        Self(kind)
    }
}

/// Where a task is defined in source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    #[serde(default)]
    pub line: Option<u32>,
}

impl SourceLocation {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            line: None,
        }
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

/// A single task within a DAG.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    task_id: String,
    kind: TaskKind,
    params: Value,
    location: Option<SourceLocation>,
    job_type: JobType,
    description: Option<String>,
}

impl Task {
    /// Create a task with no params, no location, and a batch job type.
    pub fn new(task_id: impl Into<String>, kind: impl Into<TaskKind>) -> Self {
        Self {
            task_id: task_id.into(),
            kind: kind.into(),
            params: Value::Null,
            location: None,
            job_type: JobType::default(),
            description: None,
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_job_type(mut self, job_type: JobType) -> Self {
        self.job_type = job_type;
        self
    }

    /// Override the DAG description reported for this task's job.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub fn params(&self) -> &Value {
        &self.params
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    pub fn job_type(&self) -> JobType {
        self.job_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}
