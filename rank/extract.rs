//! # Value Extraction
//!
//! Turns the rows of a [`RunTable`] into the flat list of
//! `(outcome_fraction, labeled_value)` pairs the ratio engine consumes.
//!
//! A row contributes only if it satisfies every filter condition (string
//! equality). Each contributing row then yields one pair per categorical column.
//! Which columns count as categorical is decided by [`CategoricalColumns`]:
//!
//! - `PrecedingOutcome` keeps the historical positional rule: every column
//!   declared before the outcome column. Columns declared after it are skipped,
//!   and the skip is logged as a warning.
//! - `Explicit` names the columns outright, in the order pairs are emitted,
//!   independent of declaration order.

use crate::table::RunTable;
use crate::types::{ExtractedPair, FilterConditions, LabeledValue};
use thiserror::Error;

/// Default outcome column of the campus simulation exports.
pub const DEFAULT_OUTCOME_COLUMN: &str = "cumulativeInfections";

/// Default divisor turning an outcome count into a fraction (the simulated population).
pub const DEFAULT_NORMALIZATION: f64 = 3000.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("The required column '{0}' was not found in the run table. Please check spelling and case.")]
    ColumnNotFound(String),
    #[error("The outcome column '{0}' cannot also be used as a categorical column.")]
    OutcomeListedAsCategorical(String),
    #[error("Row {row} has no value in the outcome column.")]
    MissingOutcome { row: usize },
    #[error("Row {row} has a non-numeric outcome value '{value}'.")]
    OutcomeNotNumeric { row: usize, value: String },
    #[error("Row {row} has a non-finite outcome value (NaN or Infinity).")]
    NonFiniteOutcome { row: usize },
    #[error("The normalization constant must be finite and greater than zero (found {0}).")]
    InvalidNormalization(f64),
}

/// How the categorical columns of a table are chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoricalColumns {
    /// Every column declared before the outcome column.
    #[default]
    PrecedingOutcome,
    /// Exactly these columns, in this order.
    Explicit(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSettings {
    pub outcome_column: String,
    pub normalization: f64,
    pub categorical: CategoricalColumns,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            outcome_column: DEFAULT_OUTCOME_COLUMN.to_string(),
            normalization: DEFAULT_NORMALIZATION,
            categorical: CategoricalColumns::PrecedingOutcome,
        }
    }
}

/// Indices of the rows whose cells equal every condition's value.
pub fn matching_rows(
    table: &RunTable,
    conditions: &FilterConditions,
) -> Result<Vec<usize>, ExtractError> {
    let mut predicates = Vec::with_capacity(conditions.len());
    for (column, value) in conditions.iter() {
        let index = table
            .column_index(column)
            .ok_or_else(|| ExtractError::ColumnNotFound(column.to_string()))?;
        predicates.push((table.column(index), value));
    }

    Ok((0..table.height())
        .filter(|&row| {
            predicates
                .iter()
                .all(|(cells, value)| cells[row].as_str() == *value)
        })
        .collect())
}

/// Resolves the categorical columns of `table` to column indices, in emission order.
pub fn categorical_indices(
    table: &RunTable,
    settings: &ExtractionSettings,
) -> Result<Vec<usize>, ExtractError> {
    let outcome = table
        .column_index(&settings.outcome_column)
        .ok_or_else(|| ExtractError::ColumnNotFound(settings.outcome_column.clone()))?;

    match &settings.categorical {
        CategoricalColumns::PrecedingOutcome => {
            let skipped = &table.column_names()[outcome + 1..];
            if !skipped.is_empty() {
                log::warn!(
                    "Columns declared after the outcome column '{}' are not treated as categorical: {}",
                    settings.outcome_column,
                    skipped.join(", ")
                );
            }
            Ok((0..outcome).collect())
        }
        CategoricalColumns::Explicit(columns) => columns
            .iter()
            .map(|column| {
                if column == &settings.outcome_column {
                    return Err(ExtractError::OutcomeListedAsCategorical(column.clone()));
                }
                table
                    .column_index(column)
                    .ok_or_else(|| ExtractError::ColumnNotFound(column.clone()))
            })
            .collect(),
    }
}

fn parse_outcome(row: usize, text: &str) -> Result<f64, ExtractError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::MissingOutcome { row });
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| ExtractError::OutcomeNotNumeric {
            row,
            value: text.to_string(),
        })?;
    if !value.is_finite() {
        return Err(ExtractError::NonFiniteOutcome { row });
    }
    Ok(value)
}

/// Produces the ordered pair sequence for all rows satisfying `conditions`.
///
/// Pairs are emitted row by row, and within a row in categorical column order.
/// Row numbers in errors are zero-based positions in `table`.
pub fn extract_pairs(
    table: &RunTable,
    conditions: &FilterConditions,
    settings: &ExtractionSettings,
) -> Result<Vec<ExtractedPair>, ExtractError> {
    let rows = matching_rows(table, conditions)?;
    extract_rows(table, &rows, settings)
}

/// Produces the pairs of the given rows, already filtered, in the order given.
pub fn extract_rows(
    table: &RunTable,
    rows: &[usize],
    settings: &ExtractionSettings,
) -> Result<Vec<ExtractedPair>, ExtractError> {
    if !(settings.normalization.is_finite() && settings.normalization > 0.0) {
        return Err(ExtractError::InvalidNormalization(settings.normalization));
    }

    let outcome_index = table
        .column_index(&settings.outcome_column)
        .ok_or_else(|| ExtractError::ColumnNotFound(settings.outcome_column.clone()))?;
    let categorical = categorical_indices(table, settings)?;

    let outcome_cells = table.column(outcome_index);
    let names = table.column_names();
    let mut pairs = Vec::with_capacity(rows.len() * categorical.len());

    for &row in rows {
        let outcome_fraction = parse_outcome(row, &outcome_cells[row])? / settings.normalization;
        for &column in &categorical {
            pairs.push(ExtractedPair::new(
                outcome_fraction,
                LabeledValue::new(names[column].as_str(), table.cell(row, column)),
            ));
        }
    }

    log::debug!(
        "Extracted {} pairs from {} categorical columns",
        pairs.len(),
        categorical.len()
    );
    Ok(pairs)
}
