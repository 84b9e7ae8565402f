//! Data models for the dataset status reports.
//!
//! This module contains the record, dimension, matrix and report
//! structures shared by the fetcher, the analysis code and the report
//! generator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// One dataset as returned by the API: field name to JSON value.
pub type RawRecord = serde_json::Map<String, Value>;

/// Read a field as text for grouping.
///
/// Strings are used verbatim, numbers and booleans through their JSON text.
/// `null`, arrays, objects and absent fields count as missing.
pub fn field_value<'a>(record: &'a RawRecord, name: &str) -> Option<Cow<'a, str>> {
    match record.get(name)? {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Primary or derived, decided from the dataset type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetStatus {
    Primary,
    Derived,
}

impl fmt::Display for DatasetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetStatus::Primary => write!(f, "Primary"),
            DatasetStatus::Derived => write!(f, "Derived"),
        }
    }
}

/// One entry of a dataset's status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
}

/// A fetched record together with its classification.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRecord {
    fields: RawRecord,
    /// Derived from `dataset_type` by the classifier.
    pub dataset_status: DatasetStatus,
}

impl DatasetRecord {
    pub fn new(fields: RawRecord, dataset_status: DatasetStatus) -> Self {
        Self {
            fields,
            dataset_status,
        }
    }

    /// Text value of a field, see [`field_value`].
    pub fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        field_value(&self.fields, name)
    }

    pub fn hubmap_id(&self) -> Option<&str> {
        self.fields.get("hubmap_id").and_then(Value::as_str)
    }

    pub fn uuid(&self) -> Option<&str> {
        self.fields.get("uuid").and_then(Value::as_str)
    }

    pub fn is_primary(&self) -> bool {
        self.dataset_status == DatasetStatus::Primary
    }

    /// Entries of `status_history` in upstream order.
    ///
    /// Entries without a string `status` are ignored.
    pub fn status_history(&self) -> Vec<StatusEntry> {
        let Some(Value::Array(entries)) = self.fields.get("status_history") else {
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| serde_json::from_value::<StatusEntry>(entry.clone()).ok())
            .collect()
    }

    /// The untouched API fields.
    pub fn raw(&self) -> &RawRecord {
        &self.fields
    }
}

/// A categorical field used as a row or column of an aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Dimension {
    /// API field name, e.g. `dataset_type`.
    pub field: String,
    /// Human readable label, e.g. `Dataset Type`.
    pub label: String,
}

impl Dimension {
    /// Build a dimension for a field, using the known label when there is one.
    pub fn from_field(field: &str) -> Self {
        let label = match field {
            "dataset_type" => "Dataset Type",
            "group_name" => "Group Name",
            "status" => "Status",
            "hubmap_id" => "HuBMAP ID",
            "uuid" => "UUID",
            other => other,
        };
        Self {
            field: field.to_string(),
            label: label.to_string(),
        }
    }

    pub fn dataset_type() -> Self {
        Self::from_field("dataset_type")
    }

    pub fn group_name() -> Self {
        Self::from_field("group_name")
    }

    pub fn status() -> Self {
        Self::from_field("status")
    }
}

impl From<String> for Dimension {
    fn from(field: String) -> Self {
        Self::from_field(&field)
    }
}

impl From<Dimension> for String {
    fn from(dimension: Dimension) -> Self {
        dimension.field
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// A named aggregation to include in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSpec {
    pub title: String,
    pub rows: Dimension,
    pub columns: Dimension,
}

impl ViewSpec {
    pub fn new(title: &str, rows: Dimension, columns: Dimension) -> Self {
        Self {
            title: title.to_string(),
            rows,
            columns,
        }
    }

    /// The two charts of the dashboard: type vs provider, type vs status.
    pub fn defaults() -> Vec<ViewSpec> {
        vec![
            ViewSpec::new(
                "Published and unpublished primary datasets by dataset type vs data provider",
                Dimension::dataset_type(),
                Dimension::group_name(),
            ),
            ViewSpec::new(
                "Published and unpublished primary dataset status",
                Dimension::dataset_type(),
                Dimension::status(),
            ),
        ]
    }
}

/// What to do with a record that lacks a required field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Leave the record out and log a warning.
    #[default]
    Skip,
    /// Abort the whole step with the first missing field.
    Fail,
}

/// Dense count matrix over two dimensions.
///
/// Deserialization checks that `cells` has one row per row label and one
/// count per column label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCountMatrix")]
pub struct CountMatrix {
    pub row_dimension: Dimension,
    pub column_dimension: Dimension,
    rows: Vec<String>,
    columns: Vec<String>,
    /// `cells[r][c]` is the count for `rows[r]` x `columns[c]`.
    cells: Vec<Vec<u64>>,
}

/// Unchecked wire form of a `CountMatrix`.
#[derive(Deserialize)]
struct RawCountMatrix {
    row_dimension: Dimension,
    column_dimension: Dimension,
    rows: Vec<String>,
    columns: Vec<String>,
    cells: Vec<Vec<u64>>,
}

impl TryFrom<RawCountMatrix> for CountMatrix {
    type Error = String;

    fn try_from(raw: RawCountMatrix) -> Result<Self, Self::Error> {
        if raw.cells.len() != raw.rows.len() {
            return Err(format!(
                "count matrix has {} row labels but {} rows of cells",
                raw.rows.len(),
                raw.cells.len()
            ));
        }
        if let Some((r, row)) = raw
            .cells
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != raw.columns.len())
        {
            return Err(format!(
                "count matrix row {} has {} cells, expected {}",
                r,
                row.len(),
                raw.columns.len()
            ));
        }

        Ok(Self {
            row_dimension: raw.row_dimension,
            column_dimension: raw.column_dimension,
            rows: raw.rows,
            columns: raw.columns,
            cells: raw.cells,
        })
    }
}

impl CountMatrix {
    pub(crate) fn from_parts(
        row_dimension: Dimension,
        column_dimension: Dimension,
        rows: Vec<String>,
        columns: Vec<String>,
        cells: Vec<Vec<u64>>,
    ) -> Self {
        debug_assert_eq!(rows.len(), cells.len());
        debug_assert!(cells.iter().all(|row| row.len() == columns.len()));
        Self {
            row_dimension,
            column_dimension,
            rows,
            columns,
            cells,
        }
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn cells(&self) -> &[Vec<u64>] {
        &self.cells
    }

    /// Count for a (row, column) label pair; 0 for unknown labels.
    pub fn get(&self, row: &str, column: &str) -> u64 {
        let r = self.rows.iter().position(|label| label == row);
        let c = self.columns.iter().position(|label| label == column);
        match (r, c) {
            (Some(r), Some(c)) => self
                .cells
                .get(r)
                .and_then(|row| row.get(c))
                .copied()
                .unwrap_or(0),
            _ => 0,
        }
    }

    pub fn row_total(&self, index: usize) -> u64 {
        self.cells.get(index).map(|row| row.iter().sum()).unwrap_or(0)
    }

    pub fn column_totals(&self) -> Vec<u64> {
        (0..self.columns.len())
            .map(|c| self.cells.iter().filter_map(|row| row.get(c)).sum())
            .collect()
    }

    pub fn grand_total(&self) -> u64 {
        self.cells.iter().flatten().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.columns.is_empty()
    }
}

/// One cell of a matrix in row-oriented form, ready for a charting call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRow {
    pub row_label: String,
    pub column_label: String,
    pub count: u64,
}

/// Metadata about the generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Endpoint the records were fetched from.
    pub source_url: String,
    pub generated_at: DateTime<Utc>,
    /// Records in the API response.
    pub records_fetched: usize,
    pub primary_datasets: usize,
    pub derived_datasets: usize,
    /// Records left out because a required field was missing.
    pub skipped_records: usize,
    /// Set when the fetch failed and the report was built from no data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
    pub duration_seconds: f64,
}

/// One aggregation view in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewReport {
    pub title: String,
    pub matrix: CountMatrix,
    pub chart_rows: Vec<ChartRow>,
}

/// The complete status report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub metadata: ReportMetadata,
    pub introduction: String,
    pub views: Vec<ViewReport>,
    /// Every status seen in any dataset's history, sorted.
    pub history_statuses: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_field_value_kinds() {
        let record = raw(json!({
            "dataset_type": "RNAseq",
            "count": 3,
            "flag": true,
            "nothing": null,
            "history": []
        }));

        assert_eq!(field_value(&record, "dataset_type").as_deref(), Some("RNAseq"));
        assert_eq!(field_value(&record, "count").as_deref(), Some("3"));
        assert_eq!(field_value(&record, "flag").as_deref(), Some("true"));
        assert_eq!(field_value(&record, "nothing"), None);
        assert_eq!(field_value(&record, "history"), None);
        assert_eq!(field_value(&record, "absent"), None);
    }

    #[test]
    fn test_status_history_skips_bad_entries() {
        let record = DatasetRecord::new(
            raw(json!({
                "hubmap_id": "HBM123.ABCD.456",
                "uuid": "0a1b2c",
                "status_history": [
                    {"status": "New", "timestamp": 1700000000000u64},
                    {"timestamp": 1},
                    {"status": "QA"}
                ]
            })),
            DatasetStatus::Primary,
        );

        assert_eq!(record.hubmap_id(), Some("HBM123.ABCD.456"));
        assert_eq!(record.uuid(), Some("0a1b2c"));

        let history = record.status_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, "New");
        assert_eq!(history[1].status, "QA");
        assert_eq!(history[1].timestamp, None);
    }

    #[test]
    fn test_dimension_labels() {
        assert_eq!(Dimension::dataset_type().label, "Dataset Type");
        assert_eq!(Dimension::group_name().label, "Group Name");
        assert_eq!(Dimension::from_field("hubmap_id").label, "HuBMAP ID");
        assert_eq!(Dimension::from_field("organ").label, "organ");
    }

    #[test]
    fn test_view_spec_from_toml() {
        let view: ViewSpec = toml::from_str(
            r#"
title = "By organ"
rows = "organ"
columns = "status"
"#,
        )
        .unwrap();
        assert_eq!(view.rows, Dimension::from_field("organ"));
        assert_eq!(view.columns.label, "Status");
    }

    #[test]
    fn test_count_matrix_totals() {
        let matrix = CountMatrix::from_parts(
            Dimension::dataset_type(),
            Dimension::status(),
            vec!["RNAseq".into(), "ATACseq".into()],
            vec!["New".into(), "Published".into()],
            vec![vec![1, 2], vec![0, 1]],
        );

        assert_eq!(matrix.get("RNAseq", "Published"), 2);
        assert_eq!(matrix.get("ATACseq", "New"), 0);
        assert_eq!(matrix.get("missing", "New"), 0);
        assert_eq!(matrix.row_total(0), 3);
        assert_eq!(matrix.row_total(9), 0);
        assert_eq!(matrix.column_totals(), vec![1u64, 3]);
        assert_eq!(matrix.grand_total(), 4);
        assert!(!matrix.is_empty());
    }

    #[test]
    fn test_count_matrix_deserialize_checks_shape() {
        let ragged = r#"{"row_dimension": "dataset_type", "column_dimension": "status",
            "rows": ["A", "B"], "columns": ["x", "y"], "cells": [[1, 2], [3]]}"#;
        let err = serde_json::from_str::<CountMatrix>(ragged).unwrap_err();
        assert!(err.to_string().contains("row 1 has 1 cells, expected 2"));

        let short = r#"{"row_dimension": "dataset_type", "column_dimension": "status",
            "rows": ["A", "B"], "columns": ["x"], "cells": [[1]]}"#;
        assert!(serde_json::from_str::<CountMatrix>(short).is_err());

        let dense = r#"{"row_dimension": "dataset_type", "column_dimension": "status",
            "rows": ["A", "B"], "columns": ["x", "y"], "cells": [[1, 2], [3, 0]]}"#;
        let matrix: CountMatrix = serde_json::from_str(dense).unwrap();
        assert_eq!(matrix.get("B", "x"), 3);
        assert_eq!(matrix.column_totals(), vec![4u64, 2]);
        assert_eq!(matrix.row_dimension, Dimension::dataset_type());
        assert_eq!(
            serde_json::from_str::<CountMatrix>(&serde_json::to_string(&matrix).unwrap()).unwrap(),
            matrix
        );
    }
}
