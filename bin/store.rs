//! HTTP metadata storage.

use herald::{MetadataStore, PublicationMetadata, TransportError};
use serde::Deserialize;
use tracing::debug;

/// Stores metadata by POSTing it as JSON to an upload endpoint.
///
/// The endpoint answers with `{"id": "<locator>"}`.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

impl HttpStore {
    /// Creates a store uploading to `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.into() }
    }
}

impl MetadataStore for HttpStore {
    async fn upload(&self, metadata: &PublicationMetadata) -> Result<String, TransportError> {
        debug!(endpoint = %self.endpoint, metadata_id = %metadata.metadata_id, "uploading metadata");
        let response = self
            .client
            .post(&self.endpoint)
            .json(metadata)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| TransportError::Upload(e.to_string()))?;
        let body: UploadResponse =
            response.json().await.map_err(|e| TransportError::Upload(e.to_string()))?;
        Ok(body.id)
    }
}
