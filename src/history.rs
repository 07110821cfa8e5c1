//! Versioned schema history
//!
//! Every observation of a `{table}/{file}` key is appended to that key's
//! history. New schemas are always diffed against entry 0, the baseline,
//! so drift accumulates relative to the first shape seen instead of the
//! previous run. Bounding the history is a separate step
//! ([`BoundedHistory::evict_beyond`]) governed by a [`BaselinePolicy`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::compatibility::{classify_diff, Status};
use crate::diff::diff;
use crate::drift::{DriftRecord, DriftReports};
use crate::schema::ColumnSchema;

/// Default number of history entries kept per key
pub const MAX_SCHEMA_HISTORY: usize = 5;

/// Message of the drift record written for a key's first observation
pub const INITIAL_SCHEMA_MESSAGE: &str = "initial schema recorded";

/// Key under which history and drift reports are stored for a file
pub fn history_key(table: &str, file: &Path) -> String {
    format!("{}/{}", table, file.display())
}

/// One observed schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub schema: ColumnSchema,
}

/// What happens to the baseline once a history outgrows its capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselinePolicy {
    /// Keep the most recent entries; the baseline may be evicted and the
    /// oldest survivor becomes the new anchor.
    #[default]
    Rolling,
    /// Entry 0 is never evicted; only the entries after it are trimmed.
    Pinned,
}

/// Result of trimming a history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Eviction {
    /// Number of entries dropped
    pub evicted: usize,
    /// Set when the baseline was dropped: timestamp of the new entry 0
    pub baseline_moved_to: Option<DateTime<Utc>>,
}

/// Ordered history for one key, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundedHistory {
    entries: Vec<HistoryEntry>,
}

impl BoundedHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The comparison anchor
    pub fn baseline(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Drop entries until at most `capacity` remain (a capacity of 0 is
    /// treated as 1).
    pub fn evict_beyond(&mut self, capacity: usize, policy: BaselinePolicy) -> Eviction {
        let capacity = capacity.max(1);
        if self.entries.len() <= capacity {
            return Eviction::default();
        }

        let excess = self.entries.len() - capacity;
        match policy {
            BaselinePolicy::Rolling => {
                self.entries.drain(..excess);
                Eviction {
                    evicted: excess,
                    baseline_moved_to: self.baseline().map(|entry| entry.timestamp),
                }
            }
            BaselinePolicy::Pinned => {
                self.entries.drain(1..=excess);
                Eviction {
                    evicted: excess,
                    baseline_moved_to: None,
                }
            }
        }
    }
}

/// Limits applied after every recorded observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionLimits {
    pub max_schema_history: usize,
    pub max_drift_reports: usize,
    pub baseline: BaselinePolicy,
}

impl Default for RetentionLimits {
    fn default() -> Self {
        Self {
            max_schema_history: MAX_SCHEMA_HISTORY,
            max_drift_reports: crate::drift::MAX_DRIFT_REPORTS,
            baseline: BaselinePolicy::default(),
        }
    }
}

/// Histories of every key in one output directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaHistory {
    histories: BTreeMap<String, BoundedHistory>,
}

impl SchemaHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&BoundedHistory> {
        self.histories.get(key)
    }

    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BoundedHistory)> {
        self.histories.iter()
    }

    /// Append `schema` to the history of `key` and build the drift record
    /// for this observation.
    ///
    /// The first observation yields an `OK` record without a diff. Later ones
    /// are diffed against the baseline. The history is trimmed afterwards.
    pub fn record(
        &mut self,
        key: &str,
        schema: ColumnSchema,
        now: DateTime<Utc>,
        limits: &RetentionLimits,
    ) -> DriftRecord {
        let history = self.histories.entry(key.to_string()).or_default();

        let mut record = match history.baseline() {
            None => {
                info!(key, "First schema observed");
                DriftRecord::initial(now)
            }
            Some(baseline) => {
                let delta = diff(&baseline.schema, &schema);
                let result = classify_diff(&delta);
                match result.status {
                    Status::Ok => debug!(key, "Schema matches baseline"),
                    Status::Warning => info!(key, status = %result.status, "Schema drift from baseline"),
                    Status::Error => warn!(key, status = %result.status, "Incompatible schema drift from baseline"),
                }
                for message in &result.messages {
                    debug!(key, "{}", message);
                }
                DriftRecord::observed(now, delta, result)
            }
        };

        history.push(HistoryEntry { timestamp: now, schema });

        let eviction = history.evict_beyond(limits.max_schema_history, limits.baseline);
        if let Some(moved_to) = eviction.baseline_moved_to {
            warn!(key, %moved_to, "Baseline evicted; later schemas compare against a newer entry");
            record.baseline_moved_to = Some(moved_to);
        }

        record
    }
}

/// Record one observation: append to the history and write the key's drift
/// record, then bound both collections.
///
/// This is the only place drift records are written.
pub fn record_observation(
    history: &mut SchemaHistory,
    reports: &mut DriftReports,
    key: &str,
    schema: ColumnSchema,
    now: DateTime<Utc>,
    limits: &RetentionLimits,
) -> DriftRecord {
    let record = history.record(key, schema, now, limits);
    reports.insert(key, record.clone());
    reports.retain_most_recent(limits.max_drift_reports);
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn schema(columns: &[(&str, &str)]) -> ColumnSchema {
        columns.iter().copied().collect()
    }

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn limits(max_schema_history: usize, baseline: BaselinePolicy) -> RetentionLimits {
        RetentionLimits {
            max_schema_history,
            max_drift_reports: 5,
            baseline,
        }
    }

    #[test]
    fn test_first_observation_has_no_diff() {
        let mut history = SchemaHistory::new();
        let record = history.record("t/a.csv", schema(&[("id", "int")]), at(0), &RetentionLimits::default());

        assert!(record.diff.is_none());
        assert_eq!(record.status, Status::Ok);
        assert_eq!(record.messages, vec![INITIAL_SCHEMA_MESSAGE.to_string()]);
        assert_eq!(history.get("t/a.csv").unwrap().len(), 1);
    }

    #[test]
    fn test_same_schema_twice_is_ok_with_empty_diff() {
        let mut history = SchemaHistory::new();
        let s = schema(&[("id", "int"), ("amount", "float")]);
        history.record("k", s.clone(), at(0), &RetentionLimits::default());
        let second = history.record("k", s, at(1), &RetentionLimits::default());

        assert_eq!(second.status, Status::Ok);
        assert!(second.diff.unwrap().is_empty());
        assert!(second.messages.is_empty());
    }

    #[test]
    fn test_compares_against_baseline_not_latest() {
        let mut history = SchemaHistory::new();
        let l = RetentionLimits::default();
        history.record("k", schema(&[("id", "int")]), at(0), &l);
        history.record("k", schema(&[("id", "string")]), at(1), &l);
        let third = history.record("k", schema(&[("id", "float")]), at(2), &l);

        let delta = third.diff.unwrap();
        assert_eq!(delta.type_changed["id"].old, "int");
        assert_eq!(delta.type_changed["id"].new, "float");
        assert_eq!(third.status, Status::Warning);
    }

    #[test]
    fn test_rolling_keeps_most_recent_entries() {
        let mut history = SchemaHistory::new();
        let l = limits(MAX_SCHEMA_HISTORY, BaselinePolicy::Rolling);
        let total = MAX_SCHEMA_HISTORY + 3;
        for i in 0..total {
            history.record("k", schema(&[("id", "int")]), at(i as i64), &l);
        }

        let entries = history.get("k").unwrap().entries();
        assert_eq!(entries.len(), MAX_SCHEMA_HISTORY);
        let kept: Vec<_> = entries.iter().map(|e| e.timestamp).collect();
        let expected: Vec<_> = (3..total).map(|i| at(i as i64)).collect();
        assert_eq!(kept, expected);
    }

    #[test]
    fn test_rolling_eviction_reports_moved_baseline() {
        let mut history = SchemaHistory::new();
        let l = limits(2, BaselinePolicy::Rolling);
        history.record("k", schema(&[("id", "int")]), at(0), &l);
        let second = history.record("k", schema(&[("id", "string")]), at(1), &l);
        assert!(second.baseline_moved_to.is_none());

        let third = history.record("k", schema(&[("id", "string")]), at(2), &l);
        // Still diffed against the original baseline before trimming
        assert_eq!(third.diff.as_ref().unwrap().type_changed.len(), 1);
        assert_eq!(third.baseline_moved_to, Some(at(1)));

        let fourth = history.record("k", schema(&[("id", "string")]), at(3), &l);
        assert!(fourth.diff.unwrap().is_empty());
    }

    #[test]
    fn test_pinned_keeps_baseline() {
        let mut history = SchemaHistory::new();
        let l = limits(3, BaselinePolicy::Pinned);
        history.record("k", schema(&[("id", "int")]), at(0), &l);
        for i in 1..6 {
            let record = history.record("k", schema(&[("id", "float")]), at(i), &l);
            assert!(record.baseline_moved_to.is_none());
        }

        let h = history.get("k").unwrap();
        assert_eq!(h.len(), 3);
        assert_eq!(h.baseline().unwrap().timestamp, at(0));
        assert_eq!(h.entries()[1].timestamp, at(4));
        assert_eq!(h.latest().unwrap().timestamp, at(5));

        let next = history.record("k", schema(&[("id", "float")]), at(6), &l);
        assert_eq!(next.diff.unwrap().type_changed["id"].old, "int");
    }

    #[test]
    fn test_zero_capacity_keeps_one_entry() {
        let mut h = BoundedHistory::new();
        for i in 0..3 {
            h.push(HistoryEntry { timestamp: at(i), schema: ColumnSchema::new() });
        }
        let eviction = h.evict_beyond(0, BaselinePolicy::Pinned);
        assert_eq!(eviction.evicted, 2);
        assert_eq!(h.len(), 1);
        assert_eq!(h.baseline().unwrap().timestamp, at(0));
    }

    #[test]
    fn test_record_observation_writes_single_drift_record() {
        let mut history = SchemaHistory::new();
        let mut reports = DriftReports::new();
        let l = RetentionLimits::default();

        record_observation(&mut history, &mut reports, "k", schema(&[("id", "int")]), at(0), &l);
        record_observation(&mut history, &mut reports, "k", schema(&[("id", "float")]), at(1), &l);

        assert_eq!(reports.len(), 1);
        let record = reports.get("k").unwrap();
        assert_eq!(record.timestamp, at(1));
        assert_eq!(record.status, Status::Warning);
    }

    #[test]
    fn test_history_json_shape() {
        let mut history = SchemaHistory::new();
        history.record("t/f.csv", schema(&[("id", "int")]), at(0), &RetentionLimits::default());

        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(json["t/f.csv"][0]["schema"]["id"], "int");
        assert_eq!(json["t/f.csv"][0]["timestamp"], "2024-01-05T08:00:00Z");
    }
}
