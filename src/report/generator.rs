//! Markdown and JSON report generation.
//!
//! The Markdown report mirrors the dashboard page: a dated header, an
//! introduction, then one count table per view with a text bar of each
//! row's total.

use crate::models::{CountMatrix, Report, ReportMetadata, ViewReport};
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// Widest text bar, in characters.
const BAR_WIDTH: u64 = 30;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", single_line(&report.title)));
    output.push_str(&format!(
        "{}\n\n",
        report.metadata.generated_at.format("%m-%d-%Y")
    ));

    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_introduction_section(&report.introduction));
    output.push_str(&generate_summary_section(
        &report.metadata,
        &report.history_statuses,
    ));

    output.push_str("## Report\n\n");
    for view in &report.views {
        output.push_str(&generate_view_section(view));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Introduction](#introduction)\n");
    toc.push_str("- [Summary](#summary)\n");
    toc.push_str("- [Report](#report)\n");

    for view in &report.views {
        toc.push_str(&format!(
            "  - [{}](#{})\n",
            escape_link_text(&view.title),
            anchor(&view.title)
        ));
    }

    toc.push('\n');
    toc
}

fn generate_introduction_section(introduction: &str) -> String {
    if introduction.is_empty() {
        return String::new();
    }

    format!("## Introduction\n\n{}\n\n", introduction)
}

/// Generate the summary section.
fn generate_summary_section(metadata: &ReportMetadata, history_statuses: &[String]) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");

    if let Some(ref error) = metadata.fetch_error {
        section.push_str(&format!(
            "> ⚠️ Dataset status could not be loaded, showing no datasets: {}\n\n",
            error
        ));
    }

    section.push_str(&format!("- **Source:** {}\n", metadata.source_url));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Datasets Fetched:** {}\n",
        metadata.records_fetched
    ));
    section.push_str(&format!(
        "- **Primary Datasets:** {}\n",
        metadata.primary_datasets
    ));
    section.push_str(&format!(
        "- **Derived Datasets:** {}\n",
        metadata.derived_datasets
    ));
    if metadata.skipped_records > 0 {
        section.push_str(&format!(
            "- **Skipped Records:** {}\n",
            metadata.skipped_records
        ));
    }
    if !history_statuses.is_empty() {
        section.push_str(&format!(
            "- **Statuses in History:** {}\n",
            history_statuses.join(", ")
        ));
    }
    section.push('\n');

    section
}

/// Generate the section for one view.
fn generate_view_section(view: &ViewReport) -> String {
    let mut section = String::new();

    section.push_str(&format!("### {}\n\n", single_line(&view.title)));

    if view.matrix.is_empty() {
        section.push_str("No primary datasets to show.\n\n");
        return section;
    }

    section.push_str(&generate_matrix_table(&view.matrix));
    section
}

/// Render a matrix as a Markdown table with totals.
fn generate_matrix_table(matrix: &CountMatrix) -> String {
    let mut table = String::new();

    let max_total = (0..matrix.rows().len())
        .map(|i| matrix.row_total(i))
        .max()
        .unwrap_or(0);

    table.push_str(&format!("| {} |", escape_cell(&matrix.row_dimension.label)));
    for column in matrix.columns() {
        table.push_str(&format!(" {} |", escape_cell(column)));
    }
    table.push_str(" **Total** | |\n");

    table.push_str("|:---|");
    for _ in matrix.columns() {
        table.push_str(":---:|");
    }
    table.push_str(":---:|:---|\n");

    for (i, (label, cells)) in matrix.rows().iter().zip(matrix.cells()).enumerate() {
        let total = matrix.row_total(i);
        table.push_str(&format!("| {} |", escape_cell(label)));
        for count in cells {
            table.push_str(&format!(" {} |", count));
        }
        table.push_str(&format!(" **{}** | {} |\n", total, bar(total, max_total)));
    }

    table.push_str("| **Total** |");
    for total in matrix.column_totals() {
        table.push_str(&format!(" **{}** |", total));
    }
    table.push_str(&format!(" **{}** | |\n\n", matrix.grand_total()));

    table.push_str(&format!(
        "*Series: {}*\n\n",
        single_line(&matrix.column_dimension.label)
    ));

    table
}

/// Proportional text bar, at least one block for non-zero values.
fn bar(value: u64, max: u64) -> String {
    if value == 0 || max == 0 {
        return String::new();
    }
    let width = (value * BAR_WIDTH / max).max(1);
    "█".repeat(width as usize)
}

/// Labels come from API data, so line breaks would end a table row or heading.
fn single_line(text: &str) -> String {
    text.replace(|c: char| c == '\n' || c == '\r', " ")
}

fn escape_cell(text: &str) -> String {
    single_line(text).replace('|', "\\|")
}

fn escape_link_text(text: &str) -> String {
    single_line(text).replace('[', "\\[").replace(']', "\\]")
}

fn anchor(title: &str) -> String {
    single_line(title)
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
        .map(|c| if c == ' ' { '-' } else { c })
        .collect()
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by hubstatus v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
