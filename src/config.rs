//! Configuration management for the drift catalog
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (catalog.toml)
//! - Environment variables (CATALOG__*)
//!
//! ## Example config file (catalog.toml):
//! ```toml
//! [crawl]
//! base_path = "/lake/raw"
//! output_path = "/lake/catalog"
//! sample_rows = 100
//! read_timeout_secs = 60
//!
//! [history]
//! max_schema_history = 5
//! baseline = "rolling"
//!
//! [drift]
//! max_drift_reports = 5
//!
//! [output]
//! format = "pretty"
//! metadata_table = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::drift::MAX_DRIFT_REPORTS;
use crate::format::DEFAULT_SAMPLE_ROWS;
use crate::history::{BaselinePolicy, RetentionLimits, MAX_SCHEMA_HISTORY};

/// Default metadata table file name
pub const DEFAULT_METADATA_TABLE_NAME: &str = "metadata_table.parquet";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Crawl settings
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// History retention
    #[serde(default)]
    pub history: HistoryConfig,

    /// Drift report retention
    #[serde(default)]
    pub drift: DriftConfig,

    /// Output documents
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Root holding one directory per table
    #[serde(default)]
    pub base_path: Option<PathBuf>,

    /// Root receiving one directory per unique table name
    #[serde(default)]
    pub output_path: Option<PathBuf>,

    /// Rows sampled from CSV and Excel files
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,

    /// Per-file read deadline in seconds, 0 to wait forever
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

/// History configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Entries kept per `{table}/{file}` key
    #[serde(default = "default_max_schema_history")]
    pub max_schema_history: usize,

    /// Whether the baseline can be evicted
    #[serde(default)]
    pub baseline: BaselinePolicy,
}

/// Drift report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Records kept per output directory
    #[serde(default = "default_max_drift_reports")]
    pub max_drift_reports: usize,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON layout of written documents
    #[serde(default)]
    pub format: OutputFormat,

    /// Write the per-column metadata table
    #[serde(default = "default_true")]
    pub metadata_table: bool,

    /// File name of the metadata table
    #[serde(default = "default_metadata_table_name")]
    pub metadata_table_name: String,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

// Default value functions
fn default_sample_rows() -> usize {
    DEFAULT_SAMPLE_ROWS
}

fn default_read_timeout_secs() -> u64 {
    60
}

fn default_max_schema_history() -> usize {
    MAX_SCHEMA_HISTORY
}

fn default_max_drift_reports() -> usize {
    MAX_DRIFT_REPORTS
}

fn default_true() -> bool {
    true
}

fn default_metadata_table_name() -> String {
    DEFAULT_METADATA_TABLE_NAME.to_string()
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_path: None,
            output_path: None,
            sample_rows: default_sample_rows(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_schema_history: default_max_schema_history(),
            baseline: BaselinePolicy::default(),
        }
    }
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            max_drift_reports: default_max_drift_reports(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            metadata_table: true,
            metadata_table_name: default_metadata_table_name(),
        }
    }
}

impl CatalogConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["catalog.toml", ".catalog.toml", "config/catalog.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "drift-catalog", "catalog") {
            let xdg_config = config_dir.config_dir().join("catalog.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // CATALOG__HISTORY__MAX_SCHEMA_HISTORY=10
        builder = builder.add_source(
            Environment::with_prefix("CATALOG")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Retention limits for history and drift reports
    pub fn retention(&self) -> RetentionLimits {
        RetentionLimits {
            max_schema_history: self.history.max_schema_history,
            max_drift_reports: self.drift.max_drift_reports,
            baseline: self.history.baseline,
        }
    }

    /// Per-file read deadline, `None` when disabled
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.crawl.read_timeout_secs > 0).then(|| Duration::from_secs(self.crawl.read_timeout_secs))
    }

    /// Problems that make this configuration unusable
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.history.max_schema_history == 0 {
            problems.push("history.max_schema_history must be at least 1".to_string());
        }
        if self.drift.max_drift_reports == 0 {
            problems.push("drift.max_drift_reports must be at least 1".to_string());
        }
        if self.crawl.sample_rows == 0 {
            problems.push("crawl.sample_rows must be at least 1".to_string());
        }
        if self.output.metadata_table_name.trim().is_empty() {
            problems.push("output.metadata_table_name must not be empty".to_string());
        }
        problems
    }
}
