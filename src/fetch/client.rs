//! HTTP client for the dataset-status endpoint.
//!
//! One GET per call. The response envelope is `{"data": [ {...}, ... ]}`;
//! anything else is reported as a typed [`FetchError`].

use crate::error::FetchError;
use crate::models::RawRecord;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default endpoint of the HuBMAP ingest API.
pub const DEFAULT_STATUS_URL: &str = "https://ingest.api.hubmapconsortium.org/datasets/data-status";

/// Configuration for [`StatusClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    pub timeout_seconds: u64,
    /// Top-level key holding the records array.
    pub records_key: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STATUS_URL.to_string(),
            timeout_seconds: 30,
            records_key: "data".to_string(),
        }
    }
}

/// Result of a best-effort fetch.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The fetch succeeded; the list may be empty.
    Loaded(Arc<[RawRecord]>),
    /// The fetch failed and the caller continues with no records.
    Degraded { error: FetchError },
}

impl FetchOutcome {
    /// Records to report on; empty when degraded.
    pub fn records(&self) -> &[RawRecord] {
        match self {
            FetchOutcome::Loaded(records) => records,
            FetchOutcome::Degraded { .. } => &[],
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchOutcome::Loaded(_) => None,
            FetchOutcome::Degraded { error } => Some(error),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, FetchOutcome::Degraded { .. })
    }

    /// Strict view: a degraded outcome becomes the error.
    pub fn into_result(self) -> Result<Arc<[RawRecord]>, FetchError> {
        match self {
            FetchOutcome::Loaded(records) => Ok(records),
            FetchOutcome::Degraded { error } => Err(error),
        }
    }

    pub(crate) fn from_result(result: Result<Arc<[RawRecord]>, FetchError>) -> Self {
        match result {
            Ok(records) => FetchOutcome::Loaded(records),
            Err(error) => {
                warn!(
                    "Fetching dataset status failed ({}), continuing with no datasets: {}",
                    error.kind(),
                    error
                );
                FetchOutcome::Degraded { error }
            }
        }
    }
}

/// Client for the dataset-status endpoint.
#[derive(Debug, Clone)]
pub struct StatusClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl StatusClient {
    /// Create a client with an explicit request timeout.
    ///
    /// A zero timeout is rejected, since every request would fail at once.
    pub fn new(config: ClientConfig) -> Result<Self, FetchError> {
        if config.timeout_seconds == 0 {
            return Err(FetchError::InvalidConfig(
                "timeout_seconds must be at least 1".to_string(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| FetchError::Transport {
                url: config.url.clone(),
                reason: format!("cannot build HTTP client: {}", e),
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Fetch and unwrap the records array.
    pub async fn fetch_records(&self) -> Result<Vec<RawRecord>, FetchError> {
        let url = &self.config.url;
        debug!("GET {}", url);

        let response = self.http_client.get(url).send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                format!("timed out after {}s", self.config.timeout_seconds)
            } else if e.is_connect() {
                format!("cannot connect: {}", e)
            } else {
                e.to_string()
            };
            FetchError::Transport {
                url: url.clone(),
                reason,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transport {
                url: url.clone(),
                reason: format!("HTTP {}", status),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Transport {
            url: url.clone(),
            reason: format!("failed to read body: {}", e),
        })?;

        let records = parse_envelope(&body, &self.config.records_key)?;
        info!("Fetched {} dataset records from {}", records.len(), url);
        Ok(records)
    }

    /// Fetch, degrading any failure to an empty dataset.
    pub async fn fetch_or_empty(&self) -> FetchOutcome {
        FetchOutcome::from_result(self.fetch_records().await.map(Arc::from))
    }
}

/// Parse a response body and extract the records array under `key`.
pub fn parse_envelope(body: &str, key: &str) -> Result<Vec<RawRecord>, FetchError> {
    let json: Value = serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    let Value::Object(mut envelope) = json else {
        return Err(FetchError::Schema(
            "top-level JSON value is not an object".to_string(),
        ));
    };

    let data = envelope
        .remove(key)
        .ok_or_else(|| FetchError::Schema(format!("'{}' key not found in the response", key)))?;

    let Value::Array(items) = data else {
        return Err(FetchError::Schema(format!("'{}' is not an array", key)));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(record) => Ok(record),
            _ => Err(FetchError::Schema(format!(
                "'{}' entry #{} is not an object",
                key, index
            ))),
        })
        .collect()
}
