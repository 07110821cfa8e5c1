//! Column-level diff between two schemas

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Index;

use crate::schema::ColumnSchema;

/// Old and new type label of a column present on both sides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeChange {
    pub old: String,
    pub new: String,
}

/// Type changes keyed by column, in the order the old schema lists them
#[derive(Debug, Clone, Default)]
pub struct TypeChanges {
    changes: Vec<(String, TypeChange)>,
}

impl TypeChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the change of `column`; a replaced entry keeps its position
    pub fn insert(&mut self, column: impl Into<String>, change: TypeChange) {
        let column = column.into();
        match self.changes.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = change,
            None => self.changes.push((column, change)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&TypeChange> {
        self.changes
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, change)| change)
    }

    pub fn contains_key(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TypeChange)> {
        self.changes.iter().map(entry_refs)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|(name, _)| name.as_str())
    }
}

impl PartialEq for TypeChanges {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(name, change)| other.get(name) == Some(change))
    }
}

impl Eq for TypeChanges {}

impl Index<&str> for TypeChanges {
    type Output = TypeChange;

    fn index(&self, column: &str) -> &TypeChange {
        match self.get(column) {
            Some(change) => change,
            None => panic!("no type change for column '{column}'"),
        }
    }
}

impl<N: Into<String>> FromIterator<(N, TypeChange)> for TypeChanges {
    fn from_iter<I: IntoIterator<Item = (N, TypeChange)>>(iter: I) -> Self {
        let mut changes = TypeChanges::new();
        for (column, change) in iter {
            changes.insert(column, change);
        }
        changes
    }
}

impl<'a> IntoIterator for &'a TypeChanges {
    type Item = (&'a String, &'a TypeChange);
    type IntoIter = std::iter::Map<std::slice::Iter<'a, (String, TypeChange)>, EntryRefs<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter().map(entry_refs as EntryRefs<'a>)
    }
}

type EntryRefs<'a> = fn(&'a (String, TypeChange)) -> (&'a String, &'a TypeChange);

fn entry_refs(entry: &(String, TypeChange)) -> (&String, &TypeChange) {
    (&entry.0, &entry.1)
}

impl Serialize for TypeChanges {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.changes.len()))?;
        for (column, change) in &self.changes {
            map.serialize_entry(column, change)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TypeChanges {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ChangesVisitor;

        impl<'de> Visitor<'de> for ChangesVisitor {
            type Value = TypeChanges;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column name to {old, new}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut changes = TypeChanges::new();
                while let Some((column, change)) = access.next_entry::<String, TypeChange>()? {
                    changes.insert(column, change);
                }
                Ok(changes)
            }
        }

        deserializer.deserialize_map(ChangesVisitor)
    }
}

/// Delta from an old schema to a new one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDiff {
    /// Columns only in the new schema
    pub added: BTreeSet<String>,
    /// Columns only in the old schema
    pub dropped: BTreeSet<String>,
    /// Columns in both whose type label differs (case-sensitive)
    pub type_changed: TypeChanges,
}

impl SchemaDiff {
    /// Whether no column was added, dropped or retyped
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.dropped.is_empty() && self.type_changed.is_empty()
    }

    /// The same delta seen from the other side
    pub fn reversed(&self) -> Self {
        Self {
            added: self.dropped.clone(),
            dropped: self.added.clone(),
            type_changed: self
                .type_changed
                .iter()
                .map(|(column, change)| {
                    (
                        column.as_str(),
                        TypeChange {
                            old: change.new.clone(),
                            new: change.old.clone(),
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Compute the delta from `old` to `new`
pub fn diff(old: &ColumnSchema, new: &ColumnSchema) -> SchemaDiff {
    let added = new
        .names()
        .filter(|name| !old.contains(name))
        .map(String::from)
        .collect();

    let dropped = old
        .names()
        .filter(|name| !new.contains(name))
        .map(String::from)
        .collect();

    let type_changed = old
        .iter()
        .filter_map(|column| {
            let new_type = new.get(&column.name)?;
            (new_type != column.data_type).then(|| {
                (
                    column.name.clone(),
                    TypeChange {
                        old: column.data_type.clone(),
                        new: new_type.to_string(),
                    },
                )
            })
        })
        .collect();

    SchemaDiff {
        added,
        dropped,
        type_changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(columns: &[(&str, &str)]) -> ColumnSchema {
        columns.iter().copied().collect()
    }

    #[test]
    fn test_identical_schemas_have_empty_diff() {
        let a = schema(&[("id", "int"), ("amount", "float")]);
        assert!(diff(&a, &a).is_empty());
    }

    #[test]
    fn test_added_dropped_and_retyped() {
        let old = schema(&[("id", "int"), ("amount", "float"), ("legacy", "string")]);
        let new = schema(&[("id", "string"), ("amount", "float"), ("note", "string")]);

        let d = diff(&old, &new);
        assert_eq!(d.added, BTreeSet::from(["note".to_string()]));
        assert_eq!(d.dropped, BTreeSet::from(["legacy".to_string()]));
        assert_eq!(d.type_changed.len(), 1);
        assert_eq!(
            d.type_changed["id"],
            TypeChange { old: "int".into(), new: "string".into() }
        );
    }

    #[test]
    fn test_type_comparison_is_case_sensitive() {
        let old = schema(&[("id", "Int")]);
        let new = schema(&[("id", "int")]);
        assert!(diff(&old, &new).type_changed.contains_key("id"));
    }

    #[test]
    fn test_type_changes_follow_old_schema_order() {
        let old = schema(&[("zeta", "int"), ("mid", "date"), ("alpha", "float")]);
        let new = schema(&[("alpha", "int"), ("mid", "string"), ("zeta", "string")]);

        let d = diff(&old, &new);
        assert_eq!(d.type_changed.columns().collect::<Vec<_>>(), vec!["zeta", "mid", "alpha"]);

        let json = serde_json::to_string(&d.type_changed).unwrap();
        assert!(json.starts_with(r#"{"zeta":{"old":"int","new":"string"}"#));
        let back: TypeChanges = serde_json::from_str(&json).unwrap();
        assert_eq!(back.columns().collect::<Vec<_>>(), vec!["zeta", "mid", "alpha"]);
    }

    #[test]
    fn test_swapping_sides_reverses_diff() {
        let a = schema(&[("id", "int"), ("gone", "string")]);
        let b = schema(&[("id", "float"), ("fresh", "date")]);

        assert_eq!(diff(&b, &a), diff(&a, &b).reversed());
    }
}
