//! Avro object container files
//!
//! Types come from the values of the first record rather than the writer
//! schema, so a nullable field reads as `null` when the first record has no
//! value for it.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use apache_avro::types::Value;
use apache_avro::Reader;

use super::FormatReader;
use crate::error::{ReadError, ReadResult};
use crate::schema::ColumnSchema;

pub struct AvroFormat;

impl FormatReader for AvroFormat {
    fn infer(&self, path: &Path, _sample_rows: usize) -> ReadResult<ColumnSchema> {
        let mut reader = Reader::new(BufReader::new(File::open(path)?))?;
        let first = reader.next().ok_or(ReadError::EmptyAvro)??;

        match first {
            Value::Record(fields) => Ok(fields
                .iter()
                .map(|(name, value)| (name.as_str(), value_type(value)))
                .collect()),
            other => Err(ReadError::NotARecord(value_type(&other))),
        }
    }
}

/// Type label of a decoded value
fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Boolean(_) => "boolean",
        Value::Int(_) | Value::Long(_) => "int",
        Value::Float(_) | Value::Double(_) => "float",
        Value::String(_) | Value::Enum(_, _) => "string",
        Value::Bytes(_) | Value::Fixed(_, _) => "bytes",
        Value::Union(_, inner) => value_type(inner),
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Record(_) => "record",
        Value::Date(_) => "date",
        Value::TimeMillis(_) | Value::TimeMicros(_) => "time",
        Value::TimestampMillis(_) | Value::TimestampMicros(_) => "timestamp",
        Value::Decimal(_) => "decimal",
        Value::Uuid(_) => "uuid",
        Value::Duration(_) => "duration",
        #[allow(unreachable_patterns)]
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apache_avro::types::Record;
    use apache_avro::{Schema, Writer};
    use tempfile::tempdir;

    const USER_SCHEMA: &str = r#"
    {
        "type": "record",
        "name": "user",
        "fields": [
            {"name": "id", "type": "long"},
            {"name": "name", "type": "string"},
            {"name": "score", "type": "double"},
            {"name": "nickname", "type": ["null", "string"]}
        ]
    }
    "#;

    fn write_users(path: &Path, count: usize) {
        let schema = Schema::parse_str(USER_SCHEMA).unwrap();
        let mut writer = Writer::new(&schema, File::create(path).unwrap());
        for i in 0..count {
            let mut record = Record::new(writer.schema()).unwrap();
            record.put("id", i as i64);
            record.put("name", format!("user-{i}"));
            record.put("score", 0.5f64);
            record.put("nickname", Value::Union(0, Box::new(Value::Null)));
            writer.append(record).unwrap();
        }
        writer.into_inner().unwrap();
    }

    #[test]
    fn test_types_from_first_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.avro");
        write_users(&path, 3);

        let schema = AvroFormat.infer(&path, 100).unwrap();
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["id", "name", "score", "nickname"]);
        assert_eq!(schema.get("id"), Some("int"));
        assert_eq!(schema.get("name"), Some("string"));
        assert_eq!(schema.get("score"), Some("float"));
        assert_eq!(schema.get("nickname"), Some("null"));
    }

    #[test]
    fn test_empty_container_is_read_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.avro");
        write_users(&path, 0);

        assert!(AvroFormat.infer(&path, 100).is_err());
    }
}
