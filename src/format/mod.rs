//! Per-format schema readers
//!
//! Each supported file format is a [`FileFormat`] variant backed by one
//! [`FormatReader`]. Adding a format means adding a variant and a reader.
//!
//! | Format | Extension | Source of types |
//! |--------|-----------|-----------------|
//! | CSV | `.csv` | first `sample_rows` rows |
//! | Parquet | `.parquet` | file schema |
//! | NDJSON | `.json` | whole file |
//! | Avro | `.avro` | values of the first record |
//! | ORC | `.orc` | embedded type description |
//! | Excel | `.xlsx` | first `sample_rows` rows of the first sheet |

mod avro;
mod excel;
mod orc;
mod tabular;

use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{ReadError, ReadResult};
use crate::schema::ColumnSchema;

pub use avro::AvroFormat;
pub use excel::ExcelFormat;
pub use orc::OrcFormat;
pub use tabular::{CsvFormat, NdJsonFormat, ParquetFormat};

/// Default number of rows sampled from row-oriented formats
pub const DEFAULT_SAMPLE_ROWS: usize = 100;

/// Capability shared by every format reader
pub trait FormatReader: Send + Sync {
    /// Read the column schema of `path`. Row-oriented readers look at no
    /// more than `sample_rows` rows.
    fn infer(&self, path: &Path, sample_rows: usize) -> ReadResult<ColumnSchema>;
}

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Csv,
    Parquet,
    NdJson,
    Avro,
    Orc,
    Excel,
}

impl FileFormat {
    pub const ALL: [FileFormat; 6] = [
        FileFormat::Csv,
        FileFormat::Parquet,
        FileFormat::NdJson,
        FileFormat::Avro,
        FileFormat::Orc,
        FileFormat::Excel,
    ];

    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Parquet => "parquet",
            FileFormat::NdJson => "json",
            FileFormat::Avro => "avro",
            FileFormat::Orc => "orc",
            FileFormat::Excel => "xlsx",
        }
    }

    /// Format for an extension, ignoring case
    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(extension))
    }

    /// Format of a file, by extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Whether the format's types come from sampled rows
    pub fn is_sampled(&self) -> bool {
        matches!(self, FileFormat::Csv | FileFormat::Excel)
    }

    pub fn reader(&self) -> &'static dyn FormatReader {
        match self {
            FileFormat::Csv => &CsvFormat,
            FileFormat::Parquet => &ParquetFormat,
            FileFormat::NdJson => &NdJsonFormat,
            FileFormat::Avro => &AvroFormat,
            FileFormat::Orc => &OrcFormat,
            FileFormat::Excel => &ExcelFormat,
        }
    }
}

/// Whether `path` has a supported extension
pub fn is_supported(path: &Path) -> bool {
    FileFormat::from_path(path).is_some()
}

/// Read the schema of `path`, surfacing read failures.
///
/// Unsupported extensions yield an empty schema.
pub fn infer_schema_checked(path: &Path, sample_rows: usize) -> ReadResult<ColumnSchema> {
    match FileFormat::from_path(path) {
        Some(format) => format.reader().infer(path, sample_rows),
        None => {
            debug!(path = %path.display(), "Unsupported extension, no schema read");
            Ok(ColumnSchema::new())
        }
    }
}

/// Read the schema of `path`. A failed read is logged and yields an empty
/// schema.
pub fn infer_schema(path: &Path, sample_rows: usize) -> ColumnSchema {
    infer_schema_checked(path, sample_rows).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Failed to read schema");
        ColumnSchema::new()
    })
}

/// Like [`infer_schema_checked`] but gives up after `timeout`.
///
/// The read runs on its own thread; a reader stuck past the deadline is
/// left behind and the file reported as [`ReadError::Timeout`].
pub fn infer_schema_guarded(
    path: &Path,
    sample_rows: usize,
    timeout: Option<Duration>,
) -> ReadResult<ColumnSchema> {
    let Some(timeout) = timeout else {
        return infer_schema_checked(path, sample_rows);
    };

    match FileFormat::from_path(path) {
        Some(format) => read_with_deadline(format.reader(), path, sample_rows, timeout),
        None => infer_schema_checked(path, sample_rows),
    }
}

fn read_with_deadline(
    reader: &'static dyn FormatReader,
    path: &Path,
    sample_rows: usize,
    timeout: Duration,
) -> ReadResult<ColumnSchema> {
    let (tx, rx) = mpsc::channel();
    let owned = path.to_path_buf();
    thread::Builder::new()
        .name("schema-reader".to_string())
        .spawn(move || {
            // Receiver is gone once the deadline passed
            let _ = tx.send(reader.infer(&owned, sample_rows));
        })?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(ReadError::Timeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => Err(ReadError::Panicked),
    }
}
