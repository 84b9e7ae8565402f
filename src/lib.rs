//! hubstatus - dataset status reports for the HuBMAP ingest API
//!
//! Fetches dataset-status records, classifies each one as primary or
//! derived, and aggregates the primary datasets into dense count tables
//! that can be rendered as Markdown, JSON or chart rows.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use hubstatus::config::Config;
//! use hubstatus::fetch::{RecordCache, StatusClient};
//! use hubstatus::report::{build_report, generate_markdown_report};
//!
//! let config = Config::default();
//! let cache = RecordCache::new(StatusClient::new(config.client_config())?, config.cache.ttl());
//! let outcome = cache.get_or_empty().await;
//! let report = build_report(&outcome, &config.source.url, &config.report)?;
//! println!("{}", generate_markdown_report(&report));
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod report;

pub use error::{FetchError, RecordError};
