//! Jobs API.

use crate::client::SkeinClient;
use crate::error::Result;
use crate::types::{CreateJobRequest, CreateJobRunRequest, JobRecord, RunRecord};

/// Jobs API client.
pub struct JobsApi {
    client: SkeinClient,
}

impl JobsApi {
    pub(crate) fn new(client: SkeinClient) -> Self {
        Self { client }
    }

    /// Create or update a job.
    pub async fn put(&self, request: &CreateJobRequest) -> Result<JobRecord> {
        self.client
            .put(
                &["namespaces", &request.namespace_name, "jobs", &request.job_name],
                request,
            )
            .await
    }

    /// Create a run of a job.
    pub async fn create_run(&self, request: &CreateJobRunRequest) -> Result<RunRecord> {
        self.client
            .post(
                &[
                    "namespaces",
                    &request.namespace_name,
                    "jobs",
                    &request.job_name,
                    "runs",
                ],
                request,
            )
            .await
    }
}
