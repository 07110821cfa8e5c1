//! Column schema types

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single inferred column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    /// Column name, unique within a schema
    pub name: String,
    /// Format-dependent type label (e.g. "Int64", "String", "int")
    pub data_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Mapping from column name to type label.
///
/// Keeps the order the columns were read in so catalogs list them the way
/// the source file does; equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct ColumnSchema {
    columns: Vec<Column>,
}

impl ColumnSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a column. A replaced column keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, data_type: impl Into<String>) {
        let name = name.into();
        let data_type = data_type.into();
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.data_type = data_type,
            None => self.columns.push(Column { name, data_type }),
        }
    }

    /// Remove a column, returning its type label
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(index).data_type)
    }

    /// Type label of a column
    pub fn get(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.data_type.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

impl PartialEq for ColumnSchema {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .columns
                .iter()
                .all(|c| other.get(&c.name) == Some(c.data_type.as_str()))
    }
}

impl Eq for ColumnSchema {}

impl<N: Into<String>, T: Into<String>> FromIterator<(N, T)> for ColumnSchema {
    fn from_iter<I: IntoIterator<Item = (N, T)>>(iter: I) -> Self {
        let mut schema = ColumnSchema::new();
        for (name, data_type) in iter {
            schema.insert(name, data_type);
        }
        schema
    }
}

impl<'a> IntoIterator for &'a ColumnSchema {
    type Item = &'a Column;
    type IntoIter = std::slice::Iter<'a, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

impl Serialize for ColumnSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for column in &self.columns {
            map.serialize_entry(&column.name, &column.data_type)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ColumnSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = ColumnSchema;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column name to type label")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut schema = ColumnSchema::new();
                while let Some((name, data_type)) = access.next_entry::<String, String>()? {
                    schema.insert(name, data_type);
                }
                Ok(schema)
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}
