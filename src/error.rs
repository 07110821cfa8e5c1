//! Error types for the drift catalog

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Catalog, persistence and promotion errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Table not found in catalog: {table}")]
    TableNotFound { table: String },

    #[error("Version document has no table entry: {path}")]
    EmptyVersionDocument { path: PathBuf },

    #[error("Invalid change key: {0} (expected add:<column>, drop:<column> or type:<column>)")]
    InvalidChangeKey(String),

    #[error("Change not pending for this table: {0}")]
    UnknownChange(String),

    #[error("Failed to write metadata table {path}: {source}")]
    MetadataTable {
        path: PathBuf,
        #[source]
        source: polars::error::PolarsError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error in {path}: {source}")]
    Document {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

/// Result type for format readers
pub type ReadResult<T> = std::result::Result<T, ReadError>;

/// Failure to read a schema out of a data file.
///
/// Never fatal to a crawl: the reader logs it and the file is treated as
/// having an empty schema.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Avro error: {0}")]
    Avro(#[from] apache_avro::Error),

    #[error("ORC error: {0}")]
    Orc(String),

    #[error("Excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[error("Avro container holds no records")]
    EmptyAvro,

    #[error("Avro record expected, found {0}")]
    NotARecord(&'static str),

    #[error("Workbook has no worksheet")]
    NoWorksheet,

    #[error("Read did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Reader thread panicked")]
    Panicked,
}
