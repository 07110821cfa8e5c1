//! Promotion of observed schema changes into the catalog
//!
//! The latest `schema_version.json` is compared with `catalog.json`; each
//! difference becomes a [`PendingChange`] addressed by a [`ChangeKey`]
//! (`add:<column>`, `drop:<column>`, `type:<column>`). Added columns start
//! out accepted; drops and type changes must be accepted explicitly.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use tracing::info;

use crate::catalog::{CatalogEntry, TableDocuments};
use crate::diff::diff;
use crate::error::{CatalogError, Result};

/// Kind of pending change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Add,
    Drop,
    Type,
}

impl ChangeKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            ChangeKind::Add => "add",
            ChangeKind::Drop => "drop",
            ChangeKind::Type => "type",
        }
    }
}

/// Address of one change, `{kind}:{column}`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ChangeKey {
    pub kind: ChangeKind,
    pub column: String,
}

impl ChangeKey {
    pub fn new(kind: ChangeKind, column: impl Into<String>) -> Self {
        Self {
            kind,
            column: column.into(),
        }
    }
}

impl fmt::Display for ChangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.prefix(), self.column)
    }
}

impl FromStr for ChangeKey {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CatalogError::InvalidChangeKey(s.to_string());
        let (prefix, column) = s.split_once(':').ok_or_else(invalid)?;
        if column.is_empty() {
            return Err(invalid());
        }
        let kind = match prefix {
            "add" => ChangeKind::Add,
            "drop" => ChangeKind::Drop,
            "type" => ChangeKind::Type,
            _ => return Err(invalid()),
        };
        Ok(Self::new(kind, column))
    }
}

/// One difference between catalog and version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingChange {
    pub key: ChangeKey,
    /// Type in the catalog, absent for additions
    pub old_type: Option<String>,
    /// Type in the version, absent for drops
    pub new_type: Option<String>,
    pub accepted: bool,
}

impl PendingChange {
    pub fn describe(&self) -> String {
        let old = self.old_type.as_deref().unwrap_or_default();
        let new = self.new_type.as_deref().unwrap_or_default();
        match self.key.kind {
            ChangeKind::Add => format!("{} ({})", self.key.column, new),
            ChangeKind::Drop => format!("{} ({})", self.key.column, old),
            ChangeKind::Type => format!("{}: {} -> {}", self.key.column, old, new),
        }
    }
}

/// Changes awaiting a decision for one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingChanges {
    pub table: String,
    /// Additions, then drops, then type changes; by column name within each
    pub changes: Vec<PendingChange>,
}

impl PendingChanges {
    /// Bucket the differences from `catalog` to `version`
    pub fn between(catalog: &CatalogEntry, version: &CatalogEntry) -> Self {
        let delta = diff(&catalog.columns, &version.columns);
        let mut changes = Vec::with_capacity(delta.added.len() + delta.dropped.len() + delta.type_changed.len());

        for column in &delta.added {
            changes.push(PendingChange {
                key: ChangeKey::new(ChangeKind::Add, column.as_str()),
                old_type: None,
                new_type: version.columns.get(column).map(str::to_string),
                accepted: true,
            });
        }
        for column in &delta.dropped {
            changes.push(PendingChange {
                key: ChangeKey::new(ChangeKind::Drop, column.as_str()),
                old_type: catalog.columns.get(column).map(str::to_string),
                new_type: None,
                accepted: false,
            });
        }
        for (column, change) in &delta.type_changed {
            changes.push(PendingChange {
                key: ChangeKey::new(ChangeKind::Type, column.as_str()),
                old_type: Some(change.old.clone()),
                new_type: Some(change.new.clone()),
                accepted: false,
            });
        }

        Self {
            table: catalog.table_name.clone(),
            changes,
        }
    }

    /// Pending changes for the table named by a version document.
    ///
    /// Version documents hold a single table; the first one is used.
    pub fn from_documents(
        catalog: &TableDocuments,
        version: &TableDocuments,
        version_path: &Path,
    ) -> Result<Self> {
        let (table, version_entry) = version
            .iter()
            .next()
            .ok_or_else(|| CatalogError::EmptyVersionDocument {
                path: version_path.to_path_buf(),
            })?;
        let catalog_entry = catalog
            .get(table)
            .ok_or_else(|| CatalogError::TableNotFound { table: table.clone() })?;

        let mut pending = Self::between(catalog_entry, version_entry);
        pending.table = table.clone();
        Ok(pending)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn get(&self, key: &ChangeKey) -> Option<&PendingChange> {
        self.changes.iter().find(|c| &c.key == key)
    }

    /// Accept or reject one change
    pub fn select(&mut self, key: &ChangeKey, accepted: bool) -> Result<()> {
        let change = self
            .changes
            .iter_mut()
            .find(|c| &c.key == key)
            .ok_or_else(|| CatalogError::UnknownChange(key.to_string()))?;
        change.accepted = accepted;
        Ok(())
    }

    pub fn accept_all(&mut self) {
        self.changes.iter_mut().for_each(|c| c.accepted = true);
    }

    pub fn reject_all(&mut self) {
        self.changes.iter_mut().for_each(|c| c.accepted = false);
    }

    pub fn accepted(&self) -> impl Iterator<Item = &PendingChange> {
        self.changes.iter().filter(|c| c.accepted)
    }

    /// Apply accepted changes to `entry`'s columns; returns how many were applied
    pub fn apply(&self, entry: &mut CatalogEntry) -> usize {
        let mut applied = 0;
        for change in self.accepted() {
            let column = change.key.column.as_str();
            match (change.key.kind, change.new_type.as_deref()) {
                (ChangeKind::Add, Some(new_type)) | (ChangeKind::Type, Some(new_type)) => {
                    entry.columns.insert(column, new_type);
                }
                (ChangeKind::Drop, _) => {
                    entry.columns.remove(column);
                }
                _ => continue,
            }
            info!(table = %self.table, change = %change.key, "Applied change");
            applied += 1;
        }
        applied
    }

    /// Apply accepted changes to this table's entry in a catalog document
    pub fn apply_to(&self, catalog: &mut TableDocuments) -> Result<usize> {
        let entry = catalog
            .get_mut(&self.table)
            .ok_or_else(|| CatalogError::TableNotFound {
                table: self.table.clone(),
            })?;
        Ok(self.apply(entry))
    }
}
