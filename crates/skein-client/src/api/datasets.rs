//! Datasets API.

use crate::client::SkeinClient;
use crate::error::Result;
use crate::types::{CreateDatasetRequest, DatasetRecord};

/// Datasets API client.
pub struct DatasetsApi {
    client: SkeinClient,
}

impl DatasetsApi {
    pub(crate) fn new(client: SkeinClient) -> Self {
        Self { client }
    }

    /// Create or update a dataset in its namespace.
    ///
    /// When `request.run_id` is set the server records a new dataset version
    /// linked to that run.
    pub async fn put(&self, request: &CreateDatasetRequest) -> Result<DatasetRecord> {
        self.client
            .put(
                &[
                    "namespaces",
                    &request.namespace_name,
                    "datasets",
                    &request.dataset_name,
                ],
                request,
            )
            .await
    }
}
