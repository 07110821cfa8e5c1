//! Schema compatibility classification
//!
//! Turns a [`SchemaDiff`] into a status and one message per cause. Status
//! is the maximum severity over all causes, so adding a cause can never
//! lower it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::diff::SchemaDiff;

/// Severity of a schema change, ordered `Ok < Warning < Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    #[default]
    Ok,
    Warning,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Error => "ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying a diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub status: Status,
    pub messages: Vec<String>,
}

/// One reason a diff is not clean
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cause<'a> {
    Dropped(Vec<&'a str>),
    TypeChanged {
        column: &'a str,
        old: &'a str,
        new: &'a str,
        compatible: bool,
    },
    Added(Vec<&'a str>),
}

impl Cause<'_> {
    pub fn severity(&self) -> Status {
        match self {
            Cause::TypeChanged { compatible: false, .. } => Status::Error,
            Cause::Dropped(_) | Cause::TypeChanged { .. } | Cause::Added(_) => Status::Warning,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Cause::Dropped(columns) => format!("Dropped columns: {}", columns.join(", ")),
            Cause::TypeChanged { column, old, new, compatible: true } => {
                format!("Compatible type change in '{}': {} -> {}", column, old, new)
            }
            Cause::TypeChanged { column, old, new, compatible: false } => {
                format!("Incompatible type change in '{}': {} -> {}", column, old, new)
            }
            Cause::Added(columns) => format!("Added columns: {}", columns.join(", ")),
        }
    }
}

/// Whether changing a column from `old_type` to `new_type` is safe for readers.
///
/// Safe means equal ignoring case, `int` widened to `float`, or anything
/// degraded to `string`.
pub fn is_change_compatible(old_type: &str, new_type: &str) -> bool {
    let old_type = old_type.to_lowercase();
    let new_type = new_type.to_lowercase();
    old_type == new_type || (old_type == "int" && new_type == "float") || new_type == "string"
}

/// Causes of a diff in report order: dropped, type changes, added
pub fn causes(diff: &SchemaDiff) -> Vec<Cause<'_>> {
    let mut causes = Vec::new();

    if !diff.dropped.is_empty() {
        causes.push(Cause::Dropped(diff.dropped.iter().map(String::as_str).collect()));
    }

    causes.extend(diff.type_changed.iter().map(|(column, change)| Cause::TypeChanged {
        column: column.as_str(),
        old: change.old.as_str(),
        new: change.new.as_str(),
        compatible: is_change_compatible(&change.old, &change.new),
    }));

    if !diff.added.is_empty() {
        causes.push(Cause::Added(diff.added.iter().map(String::as_str).collect()));
    }

    causes
}

/// Classify a diff: `OK` when empty, `ERROR` on any incompatible type
/// change, `WARNING` otherwise.
pub fn classify_diff(diff: &SchemaDiff) -> ClassificationResult {
    let causes = causes(diff);
    ClassificationResult {
        status: causes.iter().map(Cause::severity).max().unwrap_or_default(),
        messages: causes.iter().map(Cause::message).collect(),
    }
}
