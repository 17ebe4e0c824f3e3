//! Presentation of ranked tables and baseline ratios: aligned text for the
//! terminal, TSV files for downstream tools, and JSON.

use crate::types::{FilterConditions, RankedEntry, RankedTables, RatioMap};
use itertools::Itertools;
use serde::Serialize;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const LABEL_HEADER: &str = "Intervention";
pub const SCORE_HEADER: &str = "Score";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report: {0}")]
    IoError(#[from] io::Error),
    #[error("Failed to serialize report to JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// The ranked tables of one cutoff, with the query that produced them.
#[derive(Debug, Clone, Serialize)]
pub struct CutoffReport {
    pub selector: String,
    pub conditions: String,
    pub cutoff: f64,
    pub tables: RankedTables,
}

impl CutoffReport {
    pub fn new(
        selector: &str,
        conditions: &FilterConditions,
        cutoff: f64,
        tables: RankedTables,
    ) -> Self {
        Self {
            selector: selector.to_string(),
            conditions: conditions.to_string(),
            cutoff,
            tables,
        }
    }
}

/// Renders one ranked table as left-aligned labels and right-aligned scores.
pub fn format_table(title: &str, entries: &[RankedEntry]) -> String {
    let labels: Vec<String> = entries.iter().map(|entry| entry.label.to_string()).collect();
    let scores: Vec<String> = entries
        .iter()
        .map(|entry| format!("{:.4}", entry.score))
        .collect();

    let label_width = labels
        .iter()
        .map(String::len)
        .chain([LABEL_HEADER.len()])
        .max()
        .unwrap_or(0);
    let score_width = scores
        .iter()
        .map(String::len)
        .chain([SCORE_HEADER.len()])
        .max()
        .unwrap_or(0);

    let mut out = format!("{title} ({} rows)\n", entries.len());
    out.push_str(&format!(
        "{LABEL_HEADER:<label_width$}  {SCORE_HEADER:>score_width$}\n"
    ));
    out.push_str(&format!(
        "{}  {}\n",
        "-".repeat(label_width),
        "-".repeat(score_width)
    ));
    for (label, score) in labels.iter().zip(&scores) {
        out.push_str(&format!("{label:<label_width$}  {score:>score_width$}\n"));
    }
    out
}

/// Renders both tables of a report, positives first.
pub fn format_report(report: &CutoffReport) -> String {
    let mut out = format!(
        "Source '{}', conditions: {}, cutoff {}\n\n",
        report.selector, report.conditions, report.cutoff
    );
    out.push_str(&format_table("Positives", &report.tables.positives));
    out.push('\n');
    out.push_str(&format_table("Negatives", &report.tables.negatives));
    out
}

/// Renders baseline ratios grouped by column.
pub fn format_baseline(baseline: &RatioMap) -> String {
    let mut out = String::new();
    for (group, entries) in &baseline.iter().chunk_by(|(label, _)| label.group.clone()) {
        out.push_str(&format!("{group}\n"));
        for (label, ratio) in entries {
            out.push_str(&format!("  {:<24} {:.4}\n", label.value, ratio));
        }
    }
    out
}

/// Writes a ranked table as a two-column TSV with a header row.
pub fn write_table_tsv(entries: &[RankedEntry], path: &Path) -> Result<(), ReportError> {
    let mut writer = BufWriter::new(fs::File::create(path)?);
    writeln!(writer, "{LABEL_HEADER}\t{SCORE_HEADER}")?;
    let mut buffer = ryu::Buffer::new();
    for entry in entries {
        writeln!(writer, "{}\t{}", entry.label, buffer.format(entry.score))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `positives_<cutoff>.tsv` and `negatives_<cutoff>.tsv` into `dir`.
pub fn write_report_tsv(
    report: &CutoffReport,
    dir: &Path,
) -> Result<(PathBuf, PathBuf), ReportError> {
    fs::create_dir_all(dir)?;
    let mut buffer = ryu::Buffer::new();
    let tag = buffer.format(report.cutoff);

    let positives = dir.join(format!("positives_{tag}.tsv"));
    let negatives = dir.join(format!("negatives_{tag}.tsv"));
    write_table_tsv(&report.tables.positives, &positives)?;
    write_table_tsv(&report.tables.negatives, &negatives)?;
    Ok((positives, negatives))
}

/// Serializes reports as pretty-printed JSON. Infinite cutoffs become `null`.
pub fn reports_to_json(reports: &[CutoffReport]) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(reports)?)
}
