//! Catalog entries and their on-disk table documents
//!
//! `catalog.json` and `schema_version.json` share one layout, keyed by the
//! unique table name:
//!
//! ```text
//! {
//!   "orders-daily": {
//!     "TableInput": {
//!       "Name": "orders-daily",
//!       "StorageDescriptor": {
//!         "Columns": [{"Name": "id", "Type": "Int64"}],
//!         "Location": "/lake/orders/2024/01/05"
//!       },
//!       "PartitionKeys": [{"Name": "year", "Type": "int"}],
//!       "TableType": "EXTERNAL_TABLE"
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::partitions::Partitions;
use crate::schema::{Column, ColumnSchema};

/// Table type written for every catalog entry
pub const EXTERNAL_TABLE: &str = "EXTERNAL_TABLE";

/// Name/type pair used for partition keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionKey {
    pub name: String,
    pub data_type: String,
}

/// Accepted schema of a logical table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TableDocument", into = "TableDocument")]
pub struct CatalogEntry {
    pub table_name: String,
    pub columns: ColumnSchema,
    /// Directory holding the files the schema was read from
    pub location: String,
    pub partition_keys: Vec<PartitionKey>,
}

impl CatalogEntry {
    pub fn new(
        table_name: impl Into<String>,
        columns: ColumnSchema,
        location: impl Into<String>,
        partitions: &Partitions,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            columns,
            location: location.into(),
            partition_keys: partitions
                .iter()
                .map(|p| PartitionKey {
                    name: p.name.clone(),
                    data_type: p.data_type.as_str().to_string(),
                })
                .collect(),
        }
    }
}

/// Catalog or version document: unique table name to entry
pub type TableDocuments = BTreeMap<String, CatalogEntry>;

/// Serialized form of a [`CatalogEntry`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDocument {
    #[serde(rename = "TableInput")]
    pub table_input: TableInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableInput {
    pub name: String,
    pub storage_descriptor: StorageDescriptor,
    #[serde(default)]
    pub partition_keys: Vec<ColumnDefinition>,
    #[serde(default = "default_table_type")]
    pub table_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageDescriptor {
    pub columns: Vec<ColumnDefinition>,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "Type")]
    pub data_type: String,
}

fn default_table_type() -> String {
    EXTERNAL_TABLE.to_string()
}

impl From<CatalogEntry> for TableDocument {
    fn from(entry: CatalogEntry) -> Self {
        let columns = entry
            .columns
            .iter()
            .map(|Column { name, data_type }| ColumnDefinition {
                name: name.clone(),
                data_type: data_type.clone(),
            })
            .collect();

        Self {
            table_input: TableInput {
                name: entry.table_name,
                storage_descriptor: StorageDescriptor {
                    columns,
                    location: entry.location,
                },
                partition_keys: entry
                    .partition_keys
                    .into_iter()
                    .map(|key| ColumnDefinition {
                        name: key.name,
                        data_type: key.data_type,
                    })
                    .collect(),
                table_type: default_table_type(),
            },
        }
    }
}

impl From<TableDocument> for CatalogEntry {
    fn from(document: TableDocument) -> Self {
        let input = document.table_input;
        Self {
            table_name: input.name,
            columns: input
                .storage_descriptor
                .columns
                .into_iter()
                .map(|c| (c.name, c.data_type))
                .collect(),
            location: input.storage_descriptor.location,
            partition_keys: input
                .partition_keys
                .into_iter()
                .map(|c| PartitionKey {
                    name: c.name,
                    data_type: c.data_type,
                })
                .collect(),
        }
    }
}
