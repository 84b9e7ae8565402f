//! Count aggregation over two categorical dimensions.
//!
//! This module builds the dense pivot tables behind each report view and
//! converts them to the row-oriented form used for charting.

use crate::error::RecordError;
use crate::models::{ChartRow, CountMatrix, DatasetRecord, Dimension, MalformedPolicy};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Count records by (row value, column value).
///
/// Columns are sorted ascending. Rows are sorted by descending total, with
/// ties kept in the order the row value was first seen. Combinations that
/// never occur are 0. Empty input gives an empty matrix.
pub fn aggregate(
    records: &[DatasetRecord],
    row: &Dimension,
    column: &Dimension,
    policy: MalformedPolicy,
) -> Result<CountMatrix, RecordError> {
    let mut rows = Labels::default();
    let mut columns = Labels::default();
    let mut counts: HashMap<(usize, usize), u64> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        let (row_value, column_value) = match (record.field(&row.field), record.field(&column.field))
        {
            (Some(r), Some(c)) => (r, c),
            (r, _) => {
                let missing = if r.is_none() { &row.field } else { &column.field };
                let err = RecordError::FieldMissing {
                    field: missing.clone(),
                    index,
                };
                match policy {
                    MalformedPolicy::Fail => return Err(err),
                    MalformedPolicy::Skip => {
                        warn!("Leaving record out of {} x {}: {}", row, column, err);
                        continue;
                    }
                }
            }
        };

        let r = rows.index_of(&row_value);
        let c = columns.index_of(&column_value);
        *counts.entry((r, c)).or_default() += 1;
    }

    // Columns ascending by label; `column_order[i]` is the first-seen index
    let mut column_order: Vec<usize> = (0..columns.labels.len()).collect();
    column_order.sort_by(|&a, &b| columns.labels[a].cmp(&columns.labels[b]));

    let mut dense: Vec<(String, Vec<u64>)> = rows
        .labels
        .into_iter()
        .enumerate()
        .map(|(r, label)| {
            let cells = column_order
                .iter()
                .map(|&c| counts.get(&(r, c)).copied().unwrap_or(0))
                .collect();
            (label, cells)
        })
        .collect();

    // Vec::sort_by_key is stable, which keeps first-seen order among equal totals
    dense.sort_by_key(|(_, cells)| std::cmp::Reverse(cells.iter().sum::<u64>()));

    let (rows, cells): (Vec<String>, Vec<Vec<u64>>) = dense.into_iter().unzip();
    let column_labels: Vec<String> = column_order
        .into_iter()
        .map(|c| std::mem::take(&mut columns.labels[c]))
        .collect();

    debug!(
        "Aggregated {} x {}: {} rows, {} columns",
        row,
        column,
        rows.len(),
        column_labels.len()
    );

    Ok(CountMatrix::from_parts(
        row.clone(),
        column.clone(),
        rows,
        column_labels,
        cells,
    ))
}

/// Distinct labels in first-seen order.
#[derive(Default)]
struct Labels {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl Labels {
    fn index_of(&mut self, value: &str) -> usize {
        if let Some(&i) = self.index.get(value) {
            return i;
        }
        let i = self.labels.len();
        self.labels.push(value.to_string());
        self.index.insert(value.to_string(), i);
        i
    }
}

/// Flatten a matrix into (row label, column label, count) triples.
///
/// Every cell is emitted in row-major order, zeros included, so a stacked
/// chart gets a value for every series.
pub fn to_rows(matrix: &CountMatrix) -> Vec<ChartRow> {
    matrix
        .rows()
        .iter()
        .zip(matrix.cells())
        .flat_map(|(row_label, cells)| {
            matrix
                .columns()
                .iter()
                .zip(cells)
                .map(move |(column_label, &count)| ChartRow {
                    row_label: row_label.clone(),
                    column_label: column_label.clone(),
                    count,
                })
        })
        .collect()
}

/// Every status that appears in any record's status history, sorted.
pub fn unique_history_statuses(records: &[DatasetRecord]) -> Vec<String> {
    records
        .iter()
        .flat_map(|record| record.status_history())
        .map(|entry| entry.status)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
