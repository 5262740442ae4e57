//! Job run state transitions.

use crate::client::SkeinClient;
use crate::error::Result;
use crate::types::RunRecord;

/// Job runs API client.
pub struct RunsApi {
    client: SkeinClient,
}

impl RunsApi {
    pub(crate) fn new(client: SkeinClient) -> Self {
        Self { client }
    }

    /// Mark a run as started.
    pub async fn start(&self, run_id: &str) -> Result<RunRecord> {
        self.transition(run_id, "start").await
    }

    /// Mark a run as completed.
    pub async fn complete(&self, run_id: &str) -> Result<RunRecord> {
        self.transition(run_id, "complete").await
    }

    /// Mark a run as failed.
    pub async fn fail(&self, run_id: &str) -> Result<RunRecord> {
        self.transition(run_id, "fail").await
    }

    /// Mark a run as aborted.
    pub async fn abort(&self, run_id: &str) -> Result<RunRecord> {
        self.transition(run_id, "abort").await
    }

    async fn transition(&self, run_id: &str, action: &str) -> Result<RunRecord> {
        self.client
            .post_empty(&["jobs", "runs", run_id, action])
            .await
    }
}
