//! Fetching dataset-status records.

pub mod cache;
pub mod client;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::RecordCache;
pub use client::{parse_envelope, ClientConfig, FetchOutcome, StatusClient, DEFAULT_STATUS_URL};
