//! Per-table output directory
//!
//! ```text
//! output/
//! └── orders-daily/
//!     ├── schema_version.json       latest observed schema
//!     ├── catalog.json              accepted schema
//!     ├── schema_history.json       bounded history per file key
//!     ├── schema_drift_report.json  bounded drift records
//!     └── metadata_table.parquet    one row per inferred column
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::TableDocuments;
use crate::config::OutputFormat;
use crate::drift::DriftReports;
use crate::error::{CatalogError, Result};
use crate::history::SchemaHistory;
use crate::partitions::Partitions;
use crate::schema::ColumnSchema;

pub const SCHEMA_VERSION_FILE: &str = "schema_version.json";
pub const CATALOG_FILE: &str = "catalog.json";
pub const SCHEMA_HISTORY_FILE: &str = "schema_history.json";
pub const DRIFT_REPORT_FILE: &str = "schema_drift_report.json";

/// Load a JSON document; a missing file loads as the empty document
pub fn load_document<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        debug!(path = %path.display(), "Document absent, starting empty");
        return Ok(T::default());
    }

    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|source| CatalogError::Document {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a JSON document, replacing any previous content
pub fn save_document<T: Serialize>(value: &T, path: &Path, format: OutputFormat) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        OutputFormat::Pretty => serde_json::to_writer_pretty(&mut writer, value)?,
        OutputFormat::Compact => serde_json::to_writer(&mut writer, value)?,
    }
    writer.write_all(b"\n")?;
    writer.flush()?;
    info!(path = %path.display(), "Wrote document");
    Ok(())
}

/// The four JSON documents of one unique table name
#[derive(Debug)]
pub struct TableStore {
    root: PathBuf,
    format: OutputFormat,
    pub version: TableDocuments,
    pub catalog: TableDocuments,
    pub history: SchemaHistory,
    pub drift_reports: DriftReports,
}

impl TableStore {
    /// Open the directory, creating it if needed, and load its documents
    pub fn open(path: impl AsRef<Path>, format: OutputFormat) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        Ok(Self {
            version: load_document(&root.join(SCHEMA_VERSION_FILE))?,
            catalog: load_document(&root.join(CATALOG_FILE))?,
            history: load_document(&root.join(SCHEMA_HISTORY_FILE))?,
            drift_reports: load_document(&root.join(DRIFT_REPORT_FILE))?,
            root,
            format,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn save_version(&self) -> Result<()> {
        save_document(&self.version, &self.root.join(SCHEMA_VERSION_FILE), self.format)
    }

    pub fn save_catalog(&self) -> Result<()> {
        save_document(&self.catalog, &self.root.join(CATALOG_FILE), self.format)
    }

    pub fn save_history(&self) -> Result<()> {
        save_document(&self.history, &self.root.join(SCHEMA_HISTORY_FILE), self.format)
    }

    pub fn save_drift_reports(&self) -> Result<()> {
        save_document(&self.drift_reports, &self.root.join(DRIFT_REPORT_FILE), self.format)
    }

    /// Persist history and drift reports
    pub fn save(&self) -> Result<()> {
        self.save_history()?;
        self.save_drift_reports()
    }

    /// Write the metadata table of one file into this directory
    pub fn write_metadata_table(&self, file_name: &str, row: &MetadataRow<'_>) -> Result<PathBuf> {
        let path = self.root.join(file_name);
        write_metadata_table(&path, row)?;
        Ok(path)
    }
}

/// Everything known about one inferred file
#[derive(Debug, Clone, Copy)]
pub struct MetadataRow<'a> {
    pub table: &'a str,
    pub file: &'a Path,
    pub schema: &'a ColumnSchema,
    pub partitions: &'a Partitions,
}

/// One row per column with the file's partition values alongside
pub fn metadata_frame(row: &MetadataRow<'_>) -> PolarsResult<DataFrame> {
    let n = row.schema.len();
    let file_name = row
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let path = row.file.display().to_string();

    let mut columns: Vec<Column> = vec![
        Series::new("table".into(), vec![row.table.to_string(); n]).into(),
        Series::new("file".into(), vec![file_name; n]).into(),
        Series::new("path".into(), vec![path; n]).into(),
        Series::new("column".into(), row.schema.names().map(str::to_string).collect::<Vec<_>>()).into(),
        Series::new(
            "type".into(),
            row.schema.iter().map(|c| c.data_type.clone()).collect::<Vec<_>>(),
        )
        .into(),
    ];

    for partition in row.partitions.iter() {
        columns.push(Series::new(partition.name.as_str().into(), vec![partition.value.clone(); n]).into());
        columns.push(
            Series::new(
                format!("{}_type", partition.name).into(),
                vec![partition.data_type.as_str().to_string(); n],
            )
            .into(),
        );
    }

    DataFrame::new(columns)
}

/// Write the metadata table of one file to `path` as Parquet
pub fn write_metadata_table(path: &Path, row: &MetadataRow<'_>) -> Result<()> {
    let to_error = |source| CatalogError::MetadataTable {
        path: path.to_path_buf(),
        source,
    };

    let mut frame = metadata_frame(row).map_err(to_error)?;
    let file = File::create(path)?;
    ParquetWriter::new(file).finish(&mut frame).map_err(to_error)?;
    info!(path = %path.display(), rows = frame.height(), "Wrote metadata table");
    Ok(())
}
