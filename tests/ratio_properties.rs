use approx::assert_abs_diff_eq;
use intervention_scores::{
    ExtractedPair, LabeledValue, compute_baseline, compute_ratios, compute_scores,
    partition_and_rank,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};

const GROUPS: [&str; 4] = ["masks", "testing", "vaccination", "capacity"];
const CUTOFFS: [f64; 6] = [1.0, 0.8, 0.5, 0.3, 0.1, 0.0];

/// Builds `runs` simulated rows, each contributing one pair per group.
fn random_pairs(seed: u64, runs: usize) -> Vec<ExtractedPair> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pairs = Vec::with_capacity(runs * GROUPS.len());
    for _ in 0..runs {
        let fraction: f64 = rng.gen_range(0.0..1.0);
        for (index, group) in GROUPS.iter().enumerate() {
            let levels = index + 2;
            let value = rng.gen_range(0..levels).to_string();
            pairs.push(ExtractedPair::new(fraction, LabeledValue::new(*group, value)));
        }
    }
    pairs
}

fn group_sums(ratios: &BTreeMap<LabeledValue, f64>) -> BTreeMap<String, f64> {
    let mut sums = BTreeMap::new();
    for (label, ratio) in ratios {
        *sums.entry(label.group.clone()).or_insert(0.0) += ratio;
    }
    sums
}

#[test]
fn ratios_within_each_group_sum_to_one() {
    for seed in 0..8 {
        let pairs = random_pairs(seed, 200);
        let ratios = compute_baseline(&pairs);
        let sums = group_sums(&ratios);
        assert_eq!(sums.len(), GROUPS.len());
        for sum in sums.values() {
            assert_abs_diff_eq!(*sum, 1.0, epsilon = 1e-9);
        }
        assert!(ratios.values().all(|&ratio| ratio > 0.0 && ratio <= 1.0));
    }
}

#[test]
fn filtered_ratios_also_sum_to_one_per_present_group() {
    let pairs = random_pairs(42, 300);
    for cutoff in CUTOFFS {
        for sum in group_sums(&compute_ratios(&pairs, cutoff)).values() {
            assert_abs_diff_eq!(*sum, 1.0, epsilon = 1e-9);
        }
    }
}

#[test]
fn baseline_is_idempotent() {
    let pairs = random_pairs(7, 150);
    assert_eq!(compute_baseline(&pairs), compute_baseline(&pairs));
    assert_eq!(
        compute_ratios(&pairs, f64::INFINITY),
        compute_baseline(&pairs)
    );
}

#[test]
fn score_keys_are_a_subset_of_baseline_keys() {
    for seed in 0..8 {
        let pairs = random_pairs(seed, 120);
        let baseline = compute_baseline(&pairs);
        for cutoff in CUTOFFS {
            let scores = compute_scores(&pairs, cutoff, &baseline).unwrap();
            assert!(scores.keys().all(|key| baseline.contains_key(key)));
        }
    }
}

#[test]
fn lowering_the_cutoff_never_adds_labels() {
    let pairs = random_pairs(11, 250);
    let mut previous: Option<BTreeSet<LabeledValue>> = None;
    let mut previous_included = usize::MAX;

    for cutoff in CUTOFFS {
        let included = pairs
            .iter()
            .filter(|pair| pair.outcome_fraction <= cutoff)
            .count();
        assert!(included <= previous_included);
        previous_included = included;

        let keys: BTreeSet<LabeledValue> = compute_ratios(&pairs, cutoff).into_keys().collect();
        if let Some(wider) = &previous {
            assert!(keys.is_subset(wider));
        }
        previous = Some(keys);
    }
}

#[test]
fn ranking_partitions_every_score() {
    for seed in 0..8 {
        let pairs = random_pairs(seed, 80);
        let baseline = compute_baseline(&pairs);
        let scores = compute_scores(&pairs, 0.4, &baseline).unwrap();
        let ranked = partition_and_rank(&scores);

        assert_eq!(ranked.len(), scores.len());
        assert!(ranked.positives.iter().all(|entry| entry.score > 0.0));
        assert!(ranked.negatives.iter().all(|entry| entry.score <= 0.0));
        assert!(
            ranked
                .positives
                .windows(2)
                .all(|pair| pair[0].score >= pair[1].score)
        );
        assert!(
            ranked
                .negatives
                .windows(2)
                .all(|pair| pair[0].score <= pair[1].score)
        );

        let ranked_keys: BTreeSet<&LabeledValue> = ranked
            .positives
            .iter()
            .chain(&ranked.negatives)
            .map(|entry| &entry.label)
            .collect();
        assert_eq!(ranked_keys.len(), scores.len());
        assert!(ranked_keys.iter().all(|key| scores.contains_key(*key)));
    }
}

#[test]
fn reference_scenarios() {
    let pairs = vec![
        ExtractedPair::new(0.1, LabeledValue::new("A", "x")),
        ExtractedPair::new(0.1, LabeledValue::new("A", "y")),
        ExtractedPair::new(0.5, LabeledValue::new("A", "x")),
    ];
    let x = LabeledValue::new("A", "x");
    let y = LabeledValue::new("A", "y");

    let baseline = compute_baseline(&pairs);
    assert_abs_diff_eq!(baseline[&x], 2.0 / 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(baseline[&y], 1.0 / 3.0, epsilon = 1e-12);

    let filtered = compute_ratios(&pairs, 0.2);
    assert_abs_diff_eq!(filtered[&x], 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(filtered[&y], 0.5, epsilon = 1e-12);

    let scores = compute_scores(&pairs, 0.2, &baseline).unwrap();
    assert_abs_diff_eq!(scores[&x], -0.25, epsilon = 1e-12);
}
