//! Sources API.

use crate::client::SkeinClient;
use crate::error::Result;
use crate::types::{CreateSourceRequest, SourceRecord};

/// Sources API client.
pub struct SourcesApi {
    client: SkeinClient,
}

impl SourcesApi {
    pub(crate) fn new(client: SkeinClient) -> Self {
        Self { client }
    }

    /// Create or update a data source.
    pub async fn put(&self, request: &CreateSourceRequest) -> Result<SourceRecord> {
        self.client
            .put(&["sources", &request.source_name], request)
            .await
    }
}
