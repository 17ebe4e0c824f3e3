//! Splits a score map into the two presentation tables.

use crate::types::{RankedEntry, RankedTables, ScoreMap, natural_label_order};

/// Partitions `scores` into positives (`> 0`, descending) and negatives
/// (`<= 0`, ascending, so the most negative comes first).
///
/// Equal scores are ordered by the natural ordering of their labels, which
/// makes the tables reproducible regardless of map iteration order.
pub fn partition_and_rank(scores: &ScoreMap) -> RankedTables {
    let (mut positives, mut negatives): (Vec<RankedEntry>, Vec<RankedEntry>) = scores
        .iter()
        .map(|(label, &score)| RankedEntry {
            label: label.clone(),
            score,
        })
        .partition(|entry| entry.score > 0.0);

    positives.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| natural_label_order(&a.label, &b.label))
    });
    negatives.sort_by(|a, b| {
        a.score
            .total_cmp(&b.score)
            .then_with(|| natural_label_order(&a.label, &b.label))
    });

    RankedTables {
        positives,
        negatives,
    }
}
