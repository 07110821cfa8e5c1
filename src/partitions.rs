//! Partition keys encoded in directory names
//!
//! ```text
//! base/orders/region=eu/2024/01/05/orders.csv
//!      part_1  region   year month day
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

use crate::token_type::{classify, TokenType};

/// One partition value taken from a path component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub data_type: TokenType,
}

impl Partition {
    pub fn new(name: impl Into<String>, value: impl Into<String>, data_type: TokenType) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            data_type,
        }
    }
}

/// Ordered partitions of one file; re-inserting a name keeps its position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Partitions {
    partitions: Vec<Partition>,
}

impl Partitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, partition: Partition) {
        match self.partitions.iter_mut().find(|p| p.name == partition.name) {
            Some(existing) => *existing = partition,
            None => self.partitions.push(partition),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.iter()
    }
}

/// Extract partitions from the directories between `base` and `file`.
///
/// `key=value` components become `key`; a 4-digit component is the year, the
/// first 2-digit one the month and the next the day; anything else becomes
/// `part_{n}`. A file outside `base` is read from its full path.
pub fn extract_partitions(file: &Path, base: &Path) -> Partitions {
    let relative = file.strip_prefix(base).unwrap_or(file);
    let mut components: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    // The file name itself carries no partition
    components.pop();

    let mut partitions = Partitions::new();
    for part in components {
        if let Some((key, value)) = part.split_once('=') {
            partitions.insert(Partition::new(key, value, classify(value)));
        } else if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
            match part.len() {
                4 => partitions.insert(Partition::new("year", part, TokenType::Int)),
                2 if !partitions.contains("month") => {
                    partitions.insert(Partition::new("month", part, TokenType::Int))
                }
                2 if !partitions.contains("day") => {
                    partitions.insert(Partition::new("day", part, TokenType::Int))
                }
                _ => {}
            }
        } else {
            let name = format!("part_{}", partitions.len() + 1);
            let data_type = classify(&part);
            partitions.insert(Partition::new(name, part, data_type));
        }
    }

    partitions
}
