//! Daily crawl over a partitioned data lake
//!
//! ```text
//! base/{table}/{YYYY}/{MM}/{DD}/{file}.{ext}  ->  output/{table}-{stem}/
//! ```
//!
//! Files of one run that map to the same unique table name share an output
//! directory. It is loaded once per run and its documents are saved after
//! every file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::catalog::CatalogEntry;
use crate::compatibility::{classify_diff, ClassificationResult, Status};
use crate::config::CatalogConfig;
use crate::diff::diff;
use crate::error::Result;
use crate::format::{infer_schema_guarded, is_supported};
use crate::history::{history_key, record_observation};
use crate::partitions::extract_partitions;
use crate::schema::ColumnSchema;
use crate::store::{MetadataRow, TableStore};

/// What happened to one file
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub unique_table: String,
    pub file: PathBuf,
    pub columns: usize,
    /// Status of the drift record written for this observation
    pub drift_status: Status,
    pub drift_messages: Vec<String>,
    /// `None` when this file created the catalog entry
    pub catalog_status: Option<ClassificationResult>,
    pub read_failure: Option<String>,
    /// The metadata table could not be written; the JSON documents still were
    pub metadata_failure: Option<String>,
}

/// A unique table whose output directory could not be processed
#[derive(Debug, Clone, Serialize)]
pub struct GroupFailure {
    pub unique_table: String,
    pub error: String,
}

/// Result of one crawl
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlSummary {
    pub files: Vec<FileOutcome>,
    pub failures: Vec<GroupFailure>,
}

impl CrawlSummary {
    /// Highest drift or catalog status over all files
    pub fn worst_status(&self) -> Status {
        self.files
            .iter()
            .flat_map(|f| {
                let catalog = f.catalog_status.as_ref().map(|c| c.status);
                std::iter::once(f.drift_status).chain(catalog)
            })
            .max()
            .unwrap_or_default()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Unique table name of a file: `{table}-{stem}`, stem lowercased with
/// spaces replaced by underscores
pub fn unique_table_name(table: &str, file: &Path) -> String {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase().replace(' ', "_"))
        .unwrap_or_default();
    format!("{}-{}", table, stem)
}

/// Crawl driver
pub struct Crawler {
    config: CatalogConfig,
}

impl Crawler {
    pub fn new(config: CatalogConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Process every supported file under `base/{table}/YYYY/MM/DD` for `date`
    pub fn crawl(&self, base: &Path, date: NaiveDate, output: &Path) -> Result<CrawlSummary> {
        let groups = self.discover(base, date)?;
        info!(base = %base.display(), %date, tables = groups.len(), "Crawling");

        let mut summary = CrawlSummary::default();
        for (unique_table, files) in groups {
            match self.process_group(base, output, &unique_table, &files) {
                Ok(outcomes) => summary.files.extend(outcomes),
                Err(e) => {
                    warn!(table = %unique_table, error = %e, "Skipping table");
                    summary.failures.push(GroupFailure {
                        unique_table,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            files = summary.files.len(),
            failures = summary.failures.len(),
            "Crawl finished"
        );
        Ok(summary)
    }

    /// Supported files of `date`, grouped by unique table name
    fn discover(&self, base: &Path, date: NaiveDate) -> Result<BTreeMap<String, Vec<(String, PathBuf)>>> {
        let mut groups: BTreeMap<String, Vec<(String, PathBuf)>> = BTreeMap::new();
        let day_dir = PathBuf::from(format!("{:04}", date.year()))
            .join(format!("{:02}", date.month()))
            .join(format!("{:02}", date.day()));

        for table_dir in immediate_children(base)? {
            if !table_dir.is_dir() {
                continue;
            }
            let Some(table) = table_dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };

            let partition_dir = table_dir.join(&day_dir);
            if !partition_dir.is_dir() {
                debug!(table = %table, "No partition for date");
                continue;
            }

            for file in immediate_children(&partition_dir)? {
                if !file.is_file() || !is_supported(&file) {
                    debug!(path = %file.display(), "Skipping unsupported file");
                    continue;
                }
                groups
                    .entry(unique_table_name(&table, &file))
                    .or_default()
                    .push((table.clone(), file));
            }
        }

        Ok(groups)
    }

    fn process_group(
        &self,
        base: &Path,
        output: &Path,
        unique_table: &str,
        files: &[(String, PathBuf)],
    ) -> Result<Vec<FileOutcome>> {
        let mut store = TableStore::open(output.join(unique_table), self.config.output.format)?;
        let limits = self.config.retention();
        let mut outcomes = Vec::with_capacity(files.len());

        for (table, file) in files {
            let (schema, read_failure) =
                match infer_schema_guarded(file, self.config.crawl.sample_rows, self.config.read_timeout()) {
                    Ok(schema) => (schema, None),
                    Err(e) => {
                        warn!(path = %file.display(), error = %e, "Failed to read schema");
                        (ColumnSchema::new(), Some(e.to_string()))
                    }
                };
            let partitions = extract_partitions(file, base);
            let location = file
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default();

            let entry = CatalogEntry::new(unique_table, schema.clone(), location, &partitions);
            store.version.clear();
            store.version.insert(unique_table.to_string(), entry.clone());
            store.save_version()?;
            info!(table = %unique_table, "Schema version overwritten");

            let catalog_status = match store.catalog.get(unique_table) {
                Some(accepted) if !accepted.columns.is_empty() => {
                    let result = classify_diff(&diff(&accepted.columns, &schema));
                    info!(table = %unique_table, status = %result.status, "Schema validation against catalog");
                    for message in &result.messages {
                        info!(table = %unique_table, "  - {}", message);
                    }
                    Some(result)
                }
                _ => {
                    store.catalog.insert(unique_table.to_string(), entry);
                    store.save_catalog()?;
                    info!(table = %unique_table, "Base catalog created");
                    None
                }
            };

            let record = record_observation(
                &mut store.history,
                &mut store.drift_reports,
                &history_key(unique_table, file),
                schema.clone(),
                Utc::now(),
                &limits,
            );
            store.save()?;

            let metadata_failure = if self.config.output.metadata_table {
                store
                    .write_metadata_table(
                        &self.config.output.metadata_table_name,
                        &MetadataRow {
                            table: unique_table,
                            file,
                            schema: &schema,
                            partitions: &partitions,
                        },
                    )
                    .err()
                    .map(|e| {
                        warn!(table = %unique_table, error = %e, "Failed to write metadata table");
                        e.to_string()
                    })
            } else {
                None
            };

            debug!(source_table = %table, path = %file.display(), "File processed");
            outcomes.push(FileOutcome {
                unique_table: unique_table.to_string(),
                file: file.clone(),
                columns: schema.len(),
                drift_status: record.status,
                drift_messages: record.messages,
                catalog_status,
                read_failure,
                metadata_failure,
            });
        }

        Ok(outcomes)
    }
}

/// Direct children of `dir`, sorted by name
fn immediate_children(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut children = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        children.push(entry.into_path());
    }
    Ok(children)
}
