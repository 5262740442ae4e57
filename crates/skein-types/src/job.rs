//! Job identity.

use serde::{Deserialize, Serialize};

/// Kind of job registered with the lineage service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    #[default]
    Batch,
    Stream,
    Service,
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobType::Batch => write!(f, "BATCH"),
            JobType::Stream => write!(f, "STREAM"),
            JobType::Service => write!(f, "SERVICE"),
        }
    }
}

/// Stable job name for a task: `<dag_id>.<task_id>`.
pub fn job_name(dag_id: &str, task_id: &str) -> String {
    format!("{dag_id}.{task_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_name() {
        assert_eq!(
            job_name("test_dag", "test_task_completed"),
            "test_dag.test_task_completed"
        );
    }

    #[test]
    fn test_job_type_default_is_batch() {
        assert_eq!(JobType::default(), JobType::Batch);
        assert_eq!(JobType::Batch.to_string(), "BATCH");
        assert_eq!(serde_json::to_string(&JobType::Service).unwrap(), "\"SERVICE\"");
    }
}
