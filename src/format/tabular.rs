//! CSV, Parquet and NDJSON readers backed by polars

use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use super::FormatReader;
use crate::error::ReadResult;
use crate::schema::ColumnSchema;

/// Comma separated values with a header row
pub struct CsvFormat;

/// Apache Parquet
pub struct ParquetFormat;

/// Newline-delimited JSON, one object per line
pub struct NdJsonFormat;

impl FormatReader for CsvFormat {
    fn infer(&self, path: &Path, sample_rows: usize) -> ReadResult<ColumnSchema> {
        let sample_rows = sample_rows.max(1);
        let schema = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_n_rows(Some(sample_rows))
            .with_infer_schema_length(Some(sample_rows))
            .finish()?
            .collect_schema()?;
        Ok(from_polars_schema(&schema))
    }
}

impl FormatReader for ParquetFormat {
    fn infer(&self, path: &Path, _sample_rows: usize) -> ReadResult<ColumnSchema> {
        let schema = LazyFrame::scan_parquet(path, Default::default())?.collect_schema()?;
        Ok(from_polars_schema(&schema))
    }
}

impl FormatReader for NdJsonFormat {
    fn infer(&self, path: &Path, _sample_rows: usize) -> ReadResult<ColumnSchema> {
        let df = JsonReader::new(File::open(path)?)
            .with_json_format(JsonFormat::JsonLines)
            .finish()?;
        Ok(df
            .get_columns()
            .iter()
            .map(|column| (column.name().to_string(), dtype_label(column.dtype())))
            .collect())
    }
}

fn from_polars_schema(schema: &Schema) -> ColumnSchema {
    schema
        .iter()
        .map(|(name, dtype)| (name.to_string(), dtype_label(dtype)))
        .collect()
}

/// Polars Debug name, e.g. `Int64`, `Float64` or `String`
pub(crate) fn dtype_label(dtype: &DataType) -> String {
    format!("{dtype:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_csv_types() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(&path, "id,amount,note\n1,2.5,first\n2,3.0,second\n").unwrap();

        let schema = CsvFormat.infer(&path, 100).unwrap();
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["id", "amount", "note"]);
        assert_eq!(schema.get("id"), Some("Int64"));
        assert_eq!(schema.get("amount"), Some("Float64"));
        assert_eq!(schema.get("note"), Some("String"));
    }

    #[test]
    fn test_csv_only_samples_leading_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("late.csv");
        let mut content = String::from("value\n");
        for i in 0..20 {
            content.push_str(&format!("{i}\n"));
        }
        content.push_str("not a number\n");
        fs::write(&path, content).unwrap();

        let sampled = CsvFormat.infer(&path, 5).unwrap();
        assert_eq!(sampled.get("value"), Some("Int64"));
    }

    #[test]
    fn test_ndjson_types() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.json");
        fs::write(&path, "{\"id\": 1, \"kind\": \"click\"}\n{\"id\": 2, \"kind\": \"view\"}\n").unwrap();

        let schema = NdJsonFormat.infer(&path, 100).unwrap();
        assert_eq!(schema.get("id"), Some("Int64"));
        assert_eq!(schema.get("kind"), Some("String"));
    }

    #[test]
    fn test_parquet_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.parquet");
        let mut df = df!(
            "id" => [1i64, 2, 3],
            "score" => [0.5f64, 0.25, 1.0],
        )
        .unwrap();
        ParquetWriter::new(fs::File::create(&path).unwrap())
            .finish(&mut df)
            .unwrap();

        let schema = ParquetFormat.infer(&path, 1).unwrap();
        assert_eq!(schema.get("id"), Some("Int64"));
        assert_eq!(schema.get("score"), Some("Float64"));
    }

    #[test]
    fn test_dtype_labels_are_debug_names() {
        assert_eq!(dtype_label(&DataType::Int64), "Int64");
        assert_eq!(dtype_label(&DataType::Float64), "Float64");
        assert_eq!(dtype_label(&DataType::String), "String");
        assert_eq!(dtype_label(&DataType::Boolean), "Boolean");
    }

    #[test]
    fn test_csv_int_to_string_is_compatible() {
        let dir = tempdir().unwrap();
        let before = dir.path().join("a.csv");
        let after = dir.path().join("b.csv");
        fs::write(&before, "id,amount\n1,2.5\n").unwrap();
        fs::write(&after, "id,amount\nA-1,2.5\n").unwrap();

        let old = CsvFormat.infer(&before, 100).unwrap();
        let new = CsvFormat.infer(&after, 100).unwrap();
        let result = crate::compatibility::classify_diff(&crate::diff::diff(&old, &new));

        assert_eq!(result.status, crate::compatibility::Status::Warning);
        assert_eq!(
            result.messages,
            vec!["Compatible type change in 'id': Int64 -> String".to_string()]
        );
    }
}
