// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

// This file is ONLY for types that are SHARED BETWEEN FILES, not types that only are used in one file.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A token identifying "this categorical column had this value".
///
/// The owning column (the *group*) is stored as its own field rather than being
/// recovered from a joined string, so a cell value may contain any character.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LabeledValue {
    pub group: String,
    pub value: String,
}

impl LabeledValue {
    pub fn new(group: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for LabeledValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.group, self.value)
    }
}

/// One `(outcome_fraction, labeled_value)` observation. A table row yields one
/// pair per categorical column.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPair {
    /// The row's outcome count divided by the normalization constant.
    pub outcome_fraction: f64,
    pub label: LabeledValue,
}

impl ExtractedPair {
    pub fn new(outcome_fraction: f64, label: LabeledValue) -> Self {
        Self {
            outcome_fraction,
            label,
        }
    }
}

/// Labeled value -> share of its group, in `[0, 1]`.
pub type RatioMap = BTreeMap<LabeledValue, f64>;

/// Labeled value -> signed relative deviation from its baseline ratio.
pub type ScoreMap = BTreeMap<LabeledValue, f64>;

/// Equality predicates on named columns. Values are compared as strings.
///
/// Backed by an ordered map, so iteration is always sorted by column name. The
/// cache key relies on that ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterConditions {
    conditions: BTreeMap<String, String>,
}

impl FilterConditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the required value for `column`.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.conditions.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.conditions.get(column).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.conditions
            .iter()
            .map(|(column, value)| (column.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FilterConditions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut conditions = Self::new();
        for (column, value) in iter {
            conditions.insert(column, value);
        }
        conditions
    }
}

impl fmt::Display for FilterConditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conditions.is_empty() {
            return write!(f, "(none)");
        }
        let mut first = true;
        for (column, value) in &self.conditions {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{column}={value}")?;
            first = false;
        }
        Ok(())
    }
}

/// Parses a `COLUMN=VALUE` assignment. Only the first `=` separates the two
/// halves, so values may themselves contain `=`.
pub fn parse_condition(text: &str) -> Result<(String, String), String> {
    let Some((column, value)) = text.split_once('=') else {
        return Err(format!(
            "Invalid condition '{text}'. Expected the form COLUMN=VALUE."
        ));
    };
    let column = column.trim();
    if column.is_empty() {
        return Err(format!(
            "Invalid condition '{text}'. The column name must not be empty."
        ));
    }
    Ok((column.to_string(), value.to_string()))
}

/// One row of a ranked table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub label: LabeledValue,
    pub score: f64,
}

/// The two presentation tables produced for a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedTables {
    /// Scores > 0, largest first.
    pub positives: Vec<RankedEntry>,
    /// Scores <= 0, most negative first.
    pub negatives: Vec<RankedEntry>,
}

impl RankedTables {
    pub fn len(&self) -> usize {
        self.positives.len() + self.negatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positives.is_empty() && self.negatives.is_empty()
    }
}

/// Orders two labels by the natural ordering of their display form.
pub fn natural_label_order(a: &LabeledValue, b: &LabeledValue) -> Ordering {
    natord::compare(&a.to_string(), &b.to_string())
}
