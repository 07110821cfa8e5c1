//! ORC files, typed from the embedded type description

use std::fs::File;
use std::path::Path;

use orc_rust::ArrowReaderBuilder;

use super::FormatReader;
use crate::error::{ReadError, ReadResult};
use crate::schema::ColumnSchema;

pub struct OrcFormat;

impl FormatReader for OrcFormat {
    fn infer(&self, path: &Path, _sample_rows: usize) -> ReadResult<ColumnSchema> {
        let builder = ArrowReaderBuilder::try_new(File::open(path)?)
            .map_err(|e| ReadError::Orc(e.to_string()))?;

        Ok(builder
            .file_metadata()
            .root_data_type()
            .children()
            .iter()
            .map(|column| (column.name().to_string(), type_label(&column.data_type().to_string())))
            .collect())
    }
}

/// Lower-cased head of an ORC type description; nested types list their
/// children on following lines, which are dropped.
fn type_label(description: &str) -> String {
    description
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use orc_rust::ArrowWriterBuilder;
    use tempfile::tempdir;

    fn write_orders_orc(path: &Path) {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("note", DataType::Utf8, true),
            Field::new("amount", DataType::Float64, false),
        ]));
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(vec![1, 2])),
            Arc::new(StringArray::from(vec![Some("rush"), None])),
            Arc::new(Float64Array::from(vec![2.5, 3.0])),
        ];
        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

        let mut writer = ArrowWriterBuilder::new(File::create(path).unwrap(), schema)
            .try_build()
            .unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_reads_embedded_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("orders.orc");
        write_orders_orc(&path);

        let schema = OrcFormat.infer(&path, 1).unwrap();
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["id", "note", "amount"]);
        assert_eq!(schema.get("id"), Some("long"));
        assert_eq!(schema.get("note"), Some("string"));
        assert_eq!(schema.get("amount"), Some("double"));
    }

    #[test]
    fn test_garbage_is_an_orc_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.orc");
        std::fs::write(&path, b"definitely not orc").unwrap();

        assert!(matches!(OrcFormat.infer(&path, 1), Err(ReadError::Orc(_))));
    }

    #[test]
    fn test_type_label() {
        assert_eq!(type_label("INT"), "int");
        assert_eq!(type_label("STRUCT\n  a INT\n  b STRING"), "struct");
        assert_eq!(type_label(""), "");
    }
}
