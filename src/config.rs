//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.hubstatus.toml` files.

use crate::cli::OutputFormat;
use crate::fetch::{ClientConfig, DEFAULT_STATUS_URL};
use crate::models::{MalformedPolicy, ViewSpec};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".hubstatus.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Data source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Fetch cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    default_output_for(OutputFormat::Markdown)
}

/// Default report file name for an output format.
pub fn default_output_for(format: OutputFormat) -> String {
    format!("hubstatus_report.{}", format.extension())
}

/// Where and how records are fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Dataset-status endpoint.
    #[serde(default = "default_url")]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Top-level key holding the records array.
    #[serde(default = "default_records_key")]
    pub records_key: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_seconds: default_timeout(),
            records_key: default_records_key(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_STATUS_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_records_key() -> String {
    "data".to_string()
}

/// Fetch cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds a fetched dataset stays fresh; 0 keeps it until restart.
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_ttl() -> u64 {
    300
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        match self.ttl_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report heading.
    #[serde(default = "default_title")]
    pub title: String,

    /// Handling of records missing a required field.
    #[serde(default)]
    pub on_malformed: MalformedPolicy,

    /// Treat a failed fetch as an error instead of an empty report.
    #[serde(default)]
    pub strict: bool,

    /// Aggregations to render, in order.
    #[serde(default = "ViewSpec::defaults")]
    pub views: Vec<ViewSpec>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            on_malformed: MalformedPolicy::default(),
            strict: false,
            views: ViewSpec::defaults(),
        }
    }
}

fn default_title() -> String {
    "Primary Datasets Report".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Check values that parse but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.source.timeout_seconds == 0 {
            bail!("source.timeout_seconds must be at least 1");
        }
        if self.general.output.trim().is_empty() {
            bail!("general.output must not be empty");
        }
        Ok(())
    }

    /// Try to load configuration from a directory.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Try to load configuration from the working directory.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.url {
            self.source.url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        } else if self.general.output == default_output() {
            self.general.output = default_output_for(args.format);
        }
        if let Some(policy) = args.on_malformed {
            self.report.on_malformed = policy;
        }

        // Flags always override
        if args.strict {
            self.report.strict = true;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Client settings for the configured source.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            url: self.source.url.clone(),
            timeout_seconds: self.source.timeout_seconds,
            records_key: self.source.records_key.clone(),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, OutputFormat};
    use clap::Parser;
    use crate::models::Dimension;
    use std::path::PathBuf;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source.url, DEFAULT_STATUS_URL);
        assert_eq!(config.source.records_key, "data");
        assert_eq!(config.cache.ttl(), Some(Duration::from_secs(300)));
        assert_eq!(config.report.views.len(), 2);
        assert_eq!(config.report.on_malformed, MalformedPolicy::Skip);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "status.md"

[source]
url = "http://localhost:9000/datasets/data-status"
timeout_seconds = 5

[cache]
ttl_seconds = 0

[report]
on_malformed = "fail"

[[report.views]]
title = "Providers by status"
rows = "group_name"
columns = "status"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "status.md");
        assert_eq!(config.source.timeout_seconds, 5);
        assert_eq!(config.source.records_key, "data");
        assert_eq!(config.cache.ttl(), None);
        assert_eq!(config.report.on_malformed, MalformedPolicy::Fail);
        assert_eq!(config.report.views.len(), 1);
        assert_eq!(config.report.views[0].rows, Dimension::group_name());
        assert_eq!(config.report.title, "Primary Datasets Report");
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        let args = Args {
            url: Some("http://localhost:1/status".to_string()),
            output: Some(PathBuf::from("out.json")),
            format: OutputFormat::Json,
            config: None,
            timeout: Some(7),
            on_malformed: Some(MalformedPolicy::Fail),
            strict: true,
            watch: None,
            verbose: false,
            quiet: false,
            init_config: false,
        };

        config.merge_with_args(&args);

        assert_eq!(config.source.url, "http://localhost:1/status");
        assert_eq!(config.source.timeout_seconds, 7);
        assert_eq!(config.general.output, "out.json");
        assert_eq!(config.report.on_malformed, MalformedPolicy::Fail);
        assert!(config.report.strict);
        assert_eq!(config.client_config().timeout_seconds, 7);
    }

    #[test]
    fn test_default_output_follows_format() {
        let mut args = Args::try_parse_from(["hubstatus", "--format", "json"]).unwrap();
        let mut config = Config::default();
        config.merge_with_args(&args);
        assert_eq!(config.general.output, "hubstatus_report.json");

        // A configured name is kept whatever the format
        let mut config = Config::default();
        config.general.output = "status.md".to_string();
        config.merge_with_args(&args);
        assert_eq!(config.general.output, "status.md");

        args.format = OutputFormat::Markdown;
        let mut config = Config::default();
        config.merge_with_args(&args);
        assert_eq!(config.general.output, "hubstatus_report.md");
    }

    #[test]
    fn test_load_rejects_zero_timeout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[source]\ntimeout_seconds = 0\n",
        )
        .unwrap();

        let err = Config::load_from_dir(dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("timeout_seconds must be at least 1"));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[source]\ntimeout_seconds = 12\n",
        )
        .unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.source.timeout_seconds, 12);

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[source\n").unwrap();
        assert!(Config::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_default_toml_roundtrips() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[source]"));
        assert!(toml_str.contains("[[report.views]]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.report.views, ViewSpec::defaults());
    }
}
