//! Drift Catalog
//!
//! Schema drift detection and a versioned catalog for files landing in a
//! date-partitioned data lake.
//!
//! ## Features
//!
//! - **Schema Inference**: CSV, Parquet, NDJSON, Avro, ORC and Excel readers
//! - **Baseline Drift**: every observation is diffed against the first
//!   schema seen for its file
//! - **Compatibility Classification**: `OK`, `WARNING` or `ERROR` with one
//!   message per cause
//! - **Bounded History**: per-file history and a global drift report,
//!   both capped
//! - **Promotion**: accepted changes are merged into `catalog.json`
//!
//! ## Architecture
//!
//! ```text
//! base/
//! └── orders/2024/01/05/daily.csv
//!
//! output/
//! └── orders-daily/
//!     ├── schema_version.json
//!     ├── catalog.json
//!     ├── schema_history.json
//!     ├── schema_drift_report.json
//!     └── metadata_table.parquet
//! ```

pub mod catalog;
pub mod compatibility;
pub mod config;
pub mod crawler;
pub mod diff;
pub mod drift;
pub mod error;
pub mod format;
pub mod history;
pub mod partitions;
pub mod promotion;
pub mod schema;
pub mod store;
pub mod token_type;

pub use catalog::{CatalogEntry, TableDocuments};
pub use compatibility::{classify_diff, ClassificationResult, Status};
pub use config::{CatalogConfig, OutputFormat};
pub use crawler::{CrawlSummary, Crawler, FileOutcome};
pub use diff::{diff, SchemaDiff, TypeChange, TypeChanges};
pub use drift::{DriftRecord, DriftReports};
pub use error::{CatalogError, ReadError, Result};
pub use format::{infer_schema, infer_schema_checked, FileFormat, FormatReader};
pub use history::{record_observation, BaselinePolicy, RetentionLimits, SchemaHistory};
pub use partitions::{extract_partitions, Partition, Partitions};
pub use promotion::{ChangeKey, ChangeKind, PendingChanges};
pub use schema::{Column, ColumnSchema};
pub use store::TableStore;
pub use token_type::{classify, TokenType};
