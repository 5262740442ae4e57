//! The lineage client facade consumed by the DAG synchronization engine.

use async_trait::async_trait;
use tracing::debug;

use crate::client::SkeinClient;
use crate::error::Result;
use crate::types::{CreateDatasetRequest, CreateJobRequest, CreateJobRunRequest, CreateSourceRequest};

/// Remote lineage service operations.
///
/// Every call has create-or-update semantics on the server side; callers do
/// not deduplicate. Implementations must be object-safe so they can be shared
/// as [`SharedLineageClient`].
#[async_trait]
pub trait LineageClient: Send + Sync {
    /// Create a namespace, or no-op if it exists.
    async fn create_namespace(&self, name: &str, owner: &str) -> Result<()>;

    /// Create or update a data source.
    async fn create_datasource(&self, request: &CreateSourceRequest) -> Result<()>;

    /// Create or update a dataset, versioning it against `request.run_id` when set.
    async fn create_dataset(&self, request: &CreateDatasetRequest) -> Result<()>;

    /// Create or update a job.
    async fn create_job(&self, request: &CreateJobRequest) -> Result<()>;

    /// Create a run of a job.
    async fn create_job_run(&self, request: &CreateJobRunRequest) -> Result<()>;

    async fn mark_job_run_as_started(&self, run_id: &str) -> Result<()>;

    async fn mark_job_run_as_completed(&self, run_id: &str) -> Result<()>;

    async fn mark_job_run_as_failed(&self, run_id: &str) -> Result<()>;
}

/// Shared lineage client type.
pub type SharedLineageClient = std::sync::Arc<dyn LineageClient>;

#[async_trait]
impl LineageClient for SkeinClient {
    async fn create_namespace(&self, name: &str, owner: &str) -> Result<()> {
        let ns = self.namespaces().put(name, owner).await?;
        debug!(namespace = %ns.name, "Namespace registered");
        Ok(())
    }

    async fn create_datasource(&self, request: &CreateSourceRequest) -> Result<()> {
        let source = self.sources().put(request).await?;
        debug!(source = %source.name, "Source registered");
        Ok(())
    }

    async fn create_dataset(&self, request: &CreateDatasetRequest) -> Result<()> {
        let dataset = self.datasets().put(request).await?;
        debug!(dataset = %dataset.name, run_id = ?request.run_id, "Dataset registered");
        Ok(())
    }

    async fn create_job(&self, request: &CreateJobRequest) -> Result<()> {
        let job = self.jobs().put(request).await?;
        debug!(job = %job.name, run_id = ?request.run_id, "Job registered");
        Ok(())
    }

    async fn create_job_run(&self, request: &CreateJobRunRequest) -> Result<()> {
        let run = self.jobs().create_run(request).await?;
        debug!(job = %request.job_name, run_id = %run.id, "Job run created");
        Ok(())
    }

    async fn mark_job_run_as_started(&self, run_id: &str) -> Result<()> {
        self.runs().start(run_id).await.map(|_| ())
    }

    async fn mark_job_run_as_completed(&self, run_id: &str) -> Result<()> {
        self.runs().complete(run_id).await.map(|_| ())
    }

    async fn mark_job_run_as_failed(&self, run_id: &str) -> Result<()> {
        self.runs().fail(run_id).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        // Port 9 (discard) on localhost is not an HTTP server.
        let client = SkeinClient::builder()
            .base_url("http://127.0.0.1:9")
            .timeout(std::time::Duration::from_millis(200))
            .build()
            .unwrap();
        let shared: SharedLineageClient = Arc::new(client);

        let result = shared.mark_job_run_as_started("run-1").await;
        assert!(result.is_err());
    }
}
