//! Namespaces API.

use crate::client::SkeinClient;
use crate::error::Result;
use crate::types::{CreateNamespaceBody, Namespace};

/// Namespaces API client.
pub struct NamespacesApi {
    client: SkeinClient,
}

impl NamespacesApi {
    pub(crate) fn new(client: SkeinClient) -> Self {
        Self { client }
    }

    /// Create a namespace, or update its owner if it already exists.
    pub async fn put(&self, name: &str, owner: &str) -> Result<Namespace> {
        let body = CreateNamespaceBody { owner_name: owner };
        self.client.put(&["namespaces", name], &body).await
    }
}
