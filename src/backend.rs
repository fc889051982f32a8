//! Aggregation service client - the external interface seam
//!
//! The aggregation service is an opaque collaborator reachable through three
//! JSON operations: start a sync, list the full repository snapshot, and
//! remove a tracked repository. The trait keeps the seam dyn-compatible so
//! tests can substitute a mock backend for the HTTP client.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::error::BackendError;
use crate::record::{decode_snapshot, RepositoryRecord};

/// Remote operations consumed from the aggregation service.
#[async_trait]
pub trait AggregationBackend: Send + Sync {
    /// Ask the backend to start (or restart) a sync for `owner/name`.
    ///
    /// On success the acknowledged record is in `queued` or `syncing`,
    /// never `synced`.
    async fn start_sync(&self, owner: &str, name: &str)
        -> Result<RepositoryRecord, BackendError>;

    /// Fetch the full current snapshot of every tracked repository,
    /// including in-flight counters for ones mid-sync.
    async fn list_repositories(&self) -> Result<Vec<RepositoryRecord>, BackendError>;

    /// Stop tracking a repository and delete its data server-side.
    async fn remove_repository(&self, id: i64) -> Result<(), BackendError>;
}

/// HTTP client for the aggregation service API.
#[derive(Debug, Clone)]
pub struct AggregationClient {
    http: reqwest::Client,
    base_url: String,
}

impl AggregationClient {
    /// Create a client against the given API base URL
    /// (e.g. `http://localhost:8000/api`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Read the response body, mapping non-success statuses to
    /// [`BackendError::Status`] with the service's error detail when present.
    async fn read_body(response: reqwest::Response) -> Result<String, BackendError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
                .unwrap_or(body);

            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl AggregationBackend for AggregationClient {
    async fn start_sync(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<RepositoryRecord, BackendError> {
        debug!("Requesting sync for {}/{}", owner, name);

        let response = self
            .http
            .post(self.url("/repositories/sync"))
            .json(&json!({ "owner": owner, "name": name }))
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        let record: RepositoryRecord = serde_json::from_str(&body)?;

        debug!(
            "Sync acknowledged for {} in state {}",
            record.full_name,
            record.sync_status.as_str()
        );
        Ok(record)
    }

    async fn list_repositories(&self) -> Result<Vec<RepositoryRecord>, BackendError> {
        let response = self.http.get(self.url("/repositories")).send().await?;

        let body = Self::read_body(response).await?;
        let values: Vec<serde_json::Value> = serde_json::from_str(&body)?;

        // Decoded per record so one malformed entry cannot poison the snapshot
        let records = decode_snapshot(values);
        debug!("Fetched {} repositories", records.len());
        Ok(records)
    }

    async fn remove_repository(&self, id: i64) -> Result<(), BackendError> {
        debug!("Removing repository {}", id);

        let response = self
            .http
            .delete(self.url(&format!("/repositories/{}", id)))
            .send()
            .await?;

        Self::read_body(response).await?;
        Ok(())
    }
}
