//! Turning fetched records into a [`Report`].

use crate::analysis::{aggregate, classify_all, to_rows, unique_history_statuses};
use crate::config::ReportConfig;
use crate::error::RecordError;
use crate::fetch::FetchOutcome;
use crate::models::{Report, ReportMetadata, ViewReport};
use chrono::Utc;
use tracing::info;

const INTRODUCTION: &str = "The goal of the Human BioMolecular Atlas Program (HuBMAP) is to \
develop an open and global platform to map healthy cells in the human body.";

/// Classify, keep primary datasets and aggregate every configured view.
///
/// A degraded fetch produces a report with zero datasets and the fetch
/// error recorded in the metadata.
pub fn build_report(
    outcome: &FetchOutcome,
    source_url: &str,
    settings: &ReportConfig,
) -> Result<Report, RecordError> {
    let classified = classify_all(outcome.records(), settings.on_malformed)?;
    let primary = classified.primary();

    let views = settings
        .views
        .iter()
        .map(|view| {
            let matrix = aggregate(&primary, &view.rows, &view.columns, settings.on_malformed)?;
            let chart_rows = to_rows(&matrix);
            Ok(ViewReport {
                title: view.title.clone(),
                matrix,
                chart_rows,
            })
        })
        .collect::<Result<Vec<_>, RecordError>>()?;

    info!(
        "Built report: {} primary of {} datasets, {} views",
        primary.len(),
        outcome.records().len(),
        views.len()
    );

    Ok(Report {
        title: settings.title.clone(),
        metadata: ReportMetadata {
            source_url: source_url.to_string(),
            generated_at: Utc::now(),
            records_fetched: outcome.records().len(),
            primary_datasets: primary.len(),
            derived_datasets: classified.derived_count(),
            skipped_records: classified.skipped,
            fetch_error: outcome.error().map(|e| e.to_string()),
            duration_seconds: 0.0,
        },
        introduction: INTRODUCTION.to_string(),
        views,
        history_statuses: unique_history_statuses(&primary),
    })
}
