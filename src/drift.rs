//! Drift report audit trail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::compatibility::{ClassificationResult, Status};
use crate::diff::SchemaDiff;
use crate::history::INITIAL_SCHEMA_MESSAGE;

/// Default number of drift records kept per output directory
pub const MAX_DRIFT_REPORTS: usize = 5;

/// Classification of one observation against its baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftRecord {
    pub timestamp: DateTime<Utc>,
    /// `None` exactly for the first observation of a key
    pub diff: Option<SchemaDiff>,
    #[serde(rename = "validation_status", alias = "status")]
    pub status: Status,
    pub messages: Vec<String>,
    /// New baseline timestamp when this observation pushed the old one out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_moved_to: Option<DateTime<Utc>>,
}

impl DriftRecord {
    /// Record for a key seen for the first time
    pub fn initial(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            diff: None,
            status: Status::Ok,
            messages: vec![INITIAL_SCHEMA_MESSAGE.to_string()],
            baseline_moved_to: None,
        }
    }

    /// Record for a classified diff
    pub fn observed(timestamp: DateTime<Utc>, diff: SchemaDiff, result: ClassificationResult) -> Self {
        Self {
            timestamp,
            diff: Some(diff),
            status: result.status,
            messages: result.messages,
            baseline_moved_to: None,
        }
    }
}

/// Latest drift record per key, bounded across all keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriftReports {
    records: BTreeMap<String, DriftRecord>,
}

impl DriftReports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record of `key`
    pub fn insert(&mut self, key: impl Into<String>, record: DriftRecord) {
        self.records.insert(key.into(), record);
    }

    pub fn get(&self, key: &str) -> Option<&DriftRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DriftRecord)> {
        self.records.iter()
    }

    /// Keep only the `max` most recent records by timestamp, whatever their
    /// key. Equal timestamps are broken by key.
    pub fn retain_most_recent(&mut self, max: usize) {
        if self.records.len() <= max {
            return;
        }

        let mut ranked: Vec<_> = std::mem::take(&mut self.records).into_iter().collect();
        ranked.sort_by(|a, b| newest_first(a.0.as_str(), &a.1, b.0.as_str(), &b.1));
        ranked.truncate(max);
        self.records = ranked.into_iter().collect();
    }

    /// Records newest first
    pub fn most_recent_first(&self) -> Vec<(&String, &DriftRecord)> {
        let mut ranked: Vec<_> = self.records.iter().collect();
        ranked.sort_by(|a, b| newest_first(a.0, a.1, b.0, b.1));
        ranked
    }

    /// Highest status among all records
    pub fn worst_status(&self) -> Status {
        self.records.values().map(|r| r.status).max().unwrap_or_default()
    }
}

fn newest_first(key_a: &str, a: &DriftRecord, key_b: &str, b: &DriftRecord) -> Ordering {
    b.timestamp.cmp(&a.timestamp).then_with(|| key_a.cmp(key_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::minutes(minute)
    }

    #[test]
    fn test_global_bound_keeps_most_recent_across_keys() {
        let mut reports = DriftReports::new();
        for i in 0..7 {
            reports.insert(format!("table/file_{i}.csv"), DriftRecord::initial(at(i)));
            reports.retain_most_recent(MAX_DRIFT_REPORTS);
        }

        assert_eq!(reports.len(), MAX_DRIFT_REPORTS);
        let kept: Vec<_> = reports.most_recent_first().into_iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(
            kept,
            vec![
                "table/file_6.csv",
                "table/file_5.csv",
                "table/file_4.csv",
                "table/file_3.csv",
                "table/file_2.csv",
            ]
        );
    }

    #[test]
    fn test_bound_applied_once_after_bulk_insert() {
        let mut reports = DriftReports::new();
        for i in [3, 0, 6, 1, 5, 2, 4] {
            reports.insert(format!("k{i}"), DriftRecord::initial(at(i)));
        }
        reports.retain_most_recent(5);

        assert!(reports.get("k0").is_none());
        assert!(reports.get("k1").is_none());
        assert!(reports.get("k6").is_some());
        assert_eq!(reports.len(), 5);
    }

    #[test]
    fn test_record_json_uses_validation_status() {
        let record = DriftRecord::initial(at(0));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["validation_status"], "OK");
        assert!(json["diff"].is_null());
        assert!(json.get("baseline_moved_to").is_none());

        let legacy = r#"{"timestamp":"2024-03-01T00:00:00Z","diff":null,"status":"WARNING","messages":[]}"#;
        let parsed: DriftRecord = serde_json::from_str(legacy).unwrap();
        assert_eq!(parsed.status, Status::Warning);
    }

    #[test]
    fn test_worst_status() {
        let mut reports = DriftReports::new();
        assert_eq!(reports.worst_status(), Status::Ok);

        let result = ClassificationResult { status: Status::Error, messages: vec![] };
        reports.insert("a", DriftRecord::observed(at(1), SchemaDiff::default(), result));
        reports.insert("b", DriftRecord::initial(at(2)));
        assert_eq!(reports.worst_status(), Status::Error);
    }
}
