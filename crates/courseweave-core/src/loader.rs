//! JSON record loading.
//!
//! Each table is a JSON array of objects. A table's column set is the union of
//! keys across its objects, so a column absent from every row is reported by
//! validation as missing rather than silently read as null.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::model::{
    CompletionRecord, RawCourse, RawDataset, RawPrerequisite, RecordSet, COURSE_COLUMNS,
    PREREQUISITE_COLUMNS,
};

pub const COURSES_FILE: &str = "courses.json";
pub const PREREQUISITES_FILE: &str = "prerequisites.json";
pub const COMPLETIONS_FILE: &str = "completions.json";

/// Parse a JSON array of objects into a record set. `source` names the input
/// in error messages.
pub fn parse_records_str<R: DeserializeOwned>(content: &str, source: &str) -> Result<RecordSet<R>> {
    let value: Value = serde_json::from_str(content)
        .with_context(|| format!("failed to parse JSON: {source}"))?;
    let Value::Array(items) = value else {
        anyhow::bail!("{source}: expected a JSON array of records");
    };

    let mut columns = BTreeSet::new();
    let mut rows = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(object) = item else {
            anyhow::bail!("{source}: record {index} is not an object");
        };
        columns.extend(object.keys().cloned());
        let row = serde_json::from_value(Value::Object(object))
            .with_context(|| format!("{source}: record {index} has an invalid field"))?;
        rows.push(row);
    }
    Ok(RecordSet::new(columns, rows))
}

/// Load one table from a JSON file.
pub fn load_records<R: DeserializeOwned>(path: &Path) -> Result<RecordSet<R>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read records file: {}", path.display()))?;
    let records = parse_records_str(&content, &path.display().to_string())?;
    tracing::debug!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// An empty table carries no column evidence; it is given the full schema so
/// that it validates as empty rather than as missing every column.
fn schema_if_empty<R>(mut records: RecordSet<R>, schema: &[&str]) -> RecordSet<R> {
    if records.is_empty() {
        records.columns = schema.iter().map(|c| c.to_string()).collect();
    }
    records
}

pub fn load_course_records(path: &Path) -> Result<RecordSet<RawCourse>> {
    Ok(schema_if_empty(load_records(path)?, &COURSE_COLUMNS))
}

pub fn load_prerequisite_records(path: &Path) -> Result<RecordSet<RawPrerequisite>> {
    Ok(schema_if_empty(load_records(path)?, &PREREQUISITE_COLUMNS))
}

/// Completion logs have no optional columns; every row needs both fields.
pub fn parse_completions_str(content: &str, source: &str) -> Result<Vec<CompletionRecord>> {
    serde_json::from_str(content).with_context(|| format!("failed to parse completions: {source}"))
}

/// Paths of the three tables inside a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub courses: PathBuf,
    pub prerequisites: PathBuf,
    /// Set only when the file exists.
    pub completions: Option<PathBuf>,
}

impl DataPaths {
    pub fn in_dir(dir: &Path) -> Self {
        let completions = dir.join(COMPLETIONS_FILE);
        Self {
            courses: dir.join(COURSES_FILE),
            prerequisites: dir.join(PREREQUISITES_FILE),
            completions: completions.is_file().then_some(completions),
        }
    }
}

/// Load the course and prerequisite tables from the given paths.
pub fn load_dataset(paths: &DataPaths) -> Result<RawDataset> {
    Ok(RawDataset {
        courses: load_course_records(&paths.courses)?,
        prerequisites: load_prerequisite_records(&paths.prerequisites)?,
    })
}

/// Load `courses.json` and `prerequisites.json` from a directory.
pub fn load_dataset_dir(dir: &Path) -> Result<RawDataset> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }
    load_dataset(&DataPaths::in_dir(dir))
}
