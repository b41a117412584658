//! The remote write boundary: one batched save per flush.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::prediction::{FixtureId, PredictionEntry};

/// Request body of a batched save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub predictions: Vec<PredictionEntry>,
}

impl SaveRequest {
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Per-fixture partition of a save. A rejection is a business rule refusal
/// (typically the match kicked off), not a transport failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutcome {
    #[serde(default)]
    pub saved: Vec<FixtureId>,
    #[serde(default)]
    pub rejected: Vec<FixtureId>,
}

impl SaveOutcome {
    pub fn all_saved(entries: &[PredictionEntry]) -> Self {
        Self {
            saved: entries.iter().map(|e| e.fixture_id).collect(),
            rejected: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Writes a batch of predictions. Transport-level failures are returned as
/// `Error::Transport` and leave the whole batch unsynced.
#[async_trait]
pub trait BatchSyncClient: Send + Sync {
    async fn save(&self, entries: &[PredictionEntry]) -> Result<SaveOutcome>;
}

#[cfg(feature = "http")]
pub use http::HttpBatchClient;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;
    use tracing::debug;

    use super::{BatchSyncClient, SaveOutcome, SaveRequest};
    use crate::error::{Error, Result};
    use crate::prediction::PredictionEntry;

    const REQUEST_TIMEOUT_SECS: u64 = 10;

    /// POSTs `SaveRequest` as JSON and reads a `SaveOutcome` back.
    pub struct HttpBatchClient {
        http: reqwest::Client,
        endpoint: String,
    }

    impl HttpBatchClient {
        pub fn new(endpoint: impl Into<String>) -> Result<Self> {
            let http = reqwest::Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?;
            Ok(Self::with_client(http, endpoint))
        }

        pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
            Self { http, endpoint: endpoint.into() }
        }
    }

    #[async_trait]
    impl BatchSyncClient for HttpBatchClient {
        async fn save(&self, entries: &[PredictionEntry]) -> Result<SaveOutcome> {
            let request = SaveRequest { predictions: entries.to_vec() };
            debug!(endpoint = %self.endpoint, entries = entries.len(), "posting prediction batch");

            let response = self
                .http
                .post(&self.endpoint)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(request.to_json()?)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::Transport(format!("server returned {status}")));
            }

            let body = response.bytes().await?;
            SaveOutcome::from_json(&body)
        }
    }
}
