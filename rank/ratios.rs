//! # Ratio and Score Engine
//!
//! A labeled value's *ratio* is its share of the pairs in its group:
//! `count(label) / count(group)`, taken over the pairs whose outcome fraction is
//! at most the cutoff. The *baseline* is the same ratio with no cutoff.
//!
//! A *score* compares the two: `(filtered - baseline) / baseline`. Positive
//! scores mark values over-represented among runs at or below the cutoff.

use crate::types::{ExtractedPair, LabeledValue, RatioMap, ScoreMap};
use ahash::AHashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error(
        "Internal error: no baseline ratio exists for '{0}'. The baseline must be computed from a superset of the scored pairs."
    )]
    MissingBaseline(LabeledValue),
    #[error("Internal error: the baseline ratio for '{0}' is zero and cannot be used as a divisor.")]
    ZeroBaseline(LabeledValue),
    #[error("The outcome cutoff must be a number or infinity (found {0}).")]
    InvalidCutoff(f64),
}

/// Computes the ratio of every labeled value among the pairs with
/// `outcome_fraction <= cutoff`.
///
/// The result covers exactly the labels present in the included pairs, so it is
/// empty when the cutoff excludes everything. A NaN cutoff includes nothing.
pub fn compute_ratios(pairs: &[ExtractedPair], cutoff: f64) -> RatioMap {
    let mut label_counts: AHashMap<&LabeledValue, usize> = AHashMap::new();
    let mut group_counts: AHashMap<&str, usize> = AHashMap::new();

    for pair in pairs.iter().filter(|pair| pair.outcome_fraction <= cutoff) {
        *label_counts.entry(&pair.label).or_insert(0) += 1;
        *group_counts.entry(pair.label.group.as_str()).or_insert(0) += 1;
    }

    label_counts
        .into_iter()
        .map(|(label, count)| {
            // Every counted label also incremented its group.
            let group_total = group_counts[label.group.as_str()];
            (label.clone(), count as f64 / group_total as f64)
        })
        .collect()
}

/// Ratios over every pair; the reference each filtered ratio is compared against.
pub fn compute_baseline(pairs: &[ExtractedPair]) -> RatioMap {
    compute_ratios(pairs, f64::INFINITY)
}

/// Scores every labeled value present under `cutoff` against `baseline`.
///
/// Fails if a filtered label has no baseline entry or a zero baseline. Neither
/// can happen when `baseline` was computed from the same pairs.
pub fn compute_scores(
    pairs: &[ExtractedPair],
    cutoff: f64,
    baseline: &RatioMap,
) -> Result<ScoreMap, ScoreError> {
    if cutoff.is_nan() {
        return Err(ScoreError::InvalidCutoff(cutoff));
    }

    compute_ratios(pairs, cutoff)
        .into_iter()
        .map(|(label, ratio)| {
            let Some(&reference) = baseline.get(&label) else {
                return Err(ScoreError::MissingBaseline(label));
            };
            if reference == 0.0 {
                return Err(ScoreError::ZeroBaseline(label));
            }
            Ok((label, (ratio - reference) / reference))
        })
        .collect()
}
