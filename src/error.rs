//! Error types for fetching and processing dataset records.
//!
//! Fetch failures are normally degraded to an empty dataset by the caller,
//! so every variant keeps enough context to be logged on its own.

use thiserror::Error;

/// Failure while fetching the dataset-status envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network failure, timeout, or a non-success HTTP status.
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// The JSON body does not have the expected envelope shape.
    #[error("unexpected response shape: {0}")]
    Schema(String),

    /// The response body is not valid JSON.
    #[error("response is not valid JSON: {0}")]
    Parse(String),

    /// The client settings cannot produce a usable request.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl FetchError {
    /// Short name of the failure kind, used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport { .. } => "transport",
            FetchError::Schema(_) => "schema",
            FetchError::Parse(_) => "parse",
            FetchError::InvalidConfig(_) => "config",
        }
    }
}

/// A record lacks a field the classifier or aggregator needs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record #{index} has no '{field}' field")]
    FieldMissing { field: String, index: usize },
}
