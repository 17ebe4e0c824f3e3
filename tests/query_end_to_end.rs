use approx::assert_abs_diff_eq;
use intervention_scores::config::AnalysisConfig;
use intervention_scores::report::{CutoffReport, reports_to_json, write_report_tsv};
use intervention_scores::table::load_run_table;
use intervention_scores::{
    FilterConditions, LabeledValue, QueryError, ScoreEngine, ScoreQuery, SourceCatalog,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const VACCINE_RUNS: &str = "\
masks,testing,cumulativeInfections,seed
on,weekly,150,1
on,weekly,300,2
on,none,600,3
off,weekly,900,4
off,none,1800,5
off,none,2700,6
";

const NO_VACCINE_RUNS: &str = "\
masks,testing,cumulativeInfections,seed
on,weekly,1200,1
off,none,2900,2
";

fn write_sources(dir: &Path) -> std::path::PathBuf {
    fs::write(dir.join("allVaccineRuns.csv"), VACCINE_RUNS).unwrap();
    fs::write(dir.join("allNoVaccine.csv"), NO_VACCINE_RUNS).unwrap();
    let config_path = dir.join("scores.toml");
    fs::write(&config_path, "").unwrap();
    config_path
}

fn engine_for(dir: &TempDir) -> ScoreEngine<SourceCatalog> {
    let config = AnalysisConfig::load(&write_sources(dir.path())).unwrap();
    ScoreEngine::new(config.sources.clone(), config.extraction_settings())
}

fn query(cutoff: f64, conditions: FilterConditions, selector: &str) -> ScoreQuery {
    ScoreQuery {
        cutoff,
        conditions,
        selector: selector.to_string(),
    }
}

fn label(group: &str, value: &str) -> LabeledValue {
    LabeledValue::new(group, value)
}

#[test]
fn low_outcome_runs_favour_masks_and_testing() {
    let dir = TempDir::new().unwrap();
    let engine = engine_for(&dir);

    // Fractions: 0.05, 0.1, 0.2, 0.3, 0.6, 0.9. The cutoff keeps the first three.
    let outcome = engine
        .query(&query(0.2, FilterConditions::new(), "vaccines"))
        .unwrap();
    let tables = &outcome.tables;

    // masks=on: filtered 3/3 vs baseline 3/6 -> +1.0
    // testing=weekly: filtered 2/3 vs baseline 3/6 -> +1/3
    assert_eq!(tables.positives.len(), 2);
    assert_eq!(tables.positives[0].label, label("masks", "on"));
    assert_abs_diff_eq!(tables.positives[0].score, 1.0, epsilon = 1e-12);
    assert_eq!(tables.positives[1].label, label("testing", "weekly"));
    assert_abs_diff_eq!(tables.positives[1].score, 1.0 / 3.0, epsilon = 1e-12);

    // testing=none: filtered 1/3 vs baseline 3/6 -> -1/3. masks=off never appears.
    assert_eq!(tables.negatives.len(), 1);
    assert_eq!(tables.negatives[0].label, label("testing", "none"));
    assert_abs_diff_eq!(tables.negatives[0].score, -1.0 / 3.0, epsilon = 1e-12);

    // The column after the outcome column is not categorical.
    assert!(
        outcome
            .selection
            .baseline()
            .keys()
            .all(|key| key.group != "seed")
    );
    assert_eq!(outcome.rows().height(), 6);
}

#[test]
fn selector_chooses_the_data_file() {
    let dir = TempDir::new().unwrap();
    let engine = engine_for(&dir);

    let outcome = engine
        .query(&query(0.5, FilterConditions::new(), "noVaccines"))
        .unwrap();
    assert_eq!(outcome.rows().height(), 2);
    assert_eq!(outcome.tables.positives.len(), 2);
    assert!(
        outcome
            .tables
            .positives
            .iter()
            .all(|entry| (entry.score - 1.0).abs() < 1e-12)
    );
}

#[test]
fn conditions_restrict_rows_and_baseline() {
    let dir = TempDir::new().unwrap();
    let engine = engine_for(&dir);
    let mut conditions = FilterConditions::new();
    conditions.insert("masks", "off");

    let outcome = engine.query(&query(0.3, conditions, "vaccines")).unwrap();
    assert_eq!(outcome.rows().height(), 3);
    let baseline = outcome.selection.baseline();
    assert_abs_diff_eq!(baseline[&label("masks", "off")], 1.0, epsilon = 1e-12);
    assert!(!baseline.contains_key(&label("masks", "on")));

    // Only the 0.3 run survives: testing=weekly 1/1 vs 1/3 -> +2.
    assert_eq!(outcome.tables.positives[0].label, label("testing", "weekly"));
    assert_abs_diff_eq!(outcome.tables.positives[0].score, 2.0, epsilon = 1e-12);
}

#[test]
fn unmatched_conditions_give_empty_tables() {
    let dir = TempDir::new().unwrap();
    let engine = engine_for(&dir);
    let mut conditions = FilterConditions::new();
    conditions.insert("masks", "sometimes");

    let outcome = engine.query(&query(0.5, conditions, "vaccines")).unwrap();
    assert!(outcome.tables.is_empty());
    assert!(outcome.selection.pairs().is_empty());
    assert!(outcome.selection.baseline().is_empty());
    assert_eq!(outcome.rows().height(), 0);
}

#[test]
fn cutoff_below_every_run_gives_empty_tables() {
    let dir = TempDir::new().unwrap();
    let engine = engine_for(&dir);
    let outcome = engine
        .query(&query(0.01, FilterConditions::new(), "vaccines"))
        .unwrap();
    assert!(outcome.tables.is_empty());
}

#[test]
fn cutoffs_share_one_cached_selection() {
    let dir = TempDir::new().unwrap();
    let engine = engine_for(&dir);

    let first = engine
        .query(&query(0.2, FilterConditions::new(), "vaccines"))
        .unwrap();
    let second = engine
        .query(&query(0.6, FilterConditions::new(), "vaccines"))
        .unwrap();
    assert!(std::sync::Arc::ptr_eq(&first.selection, &second.selection));
    assert_eq!(engine.cache().len(), 1);

    // A later change to the file is not seen: cache entries are never invalidated.
    fs::write(dir.path().join("allVaccineRuns.csv"), NO_VACCINE_RUNS).unwrap();
    let third = engine
        .query(&query(0.2, FilterConditions::new(), "vaccines"))
        .unwrap();
    assert_eq!(third.rows().height(), 6);
}

#[test]
fn missing_condition_column_is_reported() {
    let dir = TempDir::new().unwrap();
    let engine = engine_for(&dir);
    let mut conditions = FilterConditions::new();
    conditions.insert("ventilation", "high");

    let err = engine
        .query(&query(0.2, conditions, "vaccines"))
        .unwrap_err();
    assert!(err.to_string().contains("ventilation"), "{err}");
    assert!(matches!(err, QueryError::Extract(_)));
}

#[test]
fn missing_data_file_is_a_table_error() {
    let dir = TempDir::new().unwrap();
    let engine = engine_for(&dir);
    fs::remove_file(dir.path().join("allNoVaccine.csv")).unwrap();

    let err = engine
        .query(&query(0.2, FilterConditions::new(), "noVaccines"))
        .unwrap_err();
    assert!(matches!(err, QueryError::Table(_)));
}

#[test]
fn explicit_categorical_columns_include_late_columns() {
    let dir = TempDir::new().unwrap();
    let config_path = write_sources(dir.path());
    fs::write(&config_path, "categorical_columns = [\"seed\", \"masks\"]\n").unwrap();
    let config = AnalysisConfig::load(&config_path).unwrap();
    let engine = ScoreEngine::new(config.sources.clone(), config.extraction_settings());

    let selection = engine
        .selection("vaccines", &FilterConditions::new())
        .unwrap();
    let groups: Vec<&str> = selection
        .pairs()
        .iter()
        .take(2)
        .map(|pair| pair.label.group.as_str())
        .collect();
    assert_eq!(groups, vec!["seed", "masks"]);
    assert!(!selection.baseline().keys().any(|key| key.group == "testing"));
}

#[test]
fn rows_and_reports_are_written_to_disk() {
    let dir = TempDir::new().unwrap();
    let engine = engine_for(&dir);
    let mut conditions = FilterConditions::new();
    conditions.insert("testing", "weekly");

    let outcome = engine
        .query(&query(0.1, conditions.clone(), "vaccines"))
        .unwrap();

    let rows_path = dir.path().join("filtered.csv");
    outcome.rows().write_csv(&rows_path).unwrap();
    let reloaded = load_run_table(&rows_path).unwrap();
    assert_eq!(reloaded.height(), 3);
    assert!(reloaded.column(1).iter().all(|cell| cell == "weekly"));

    let report = CutoffReport::new("vaccines", &conditions, 0.1, outcome.tables.clone());
    let out_dir = dir.path().join("out");
    let (positives, negatives) = write_report_tsv(&report, &out_dir).unwrap();
    assert!(positives.exists());
    assert!(negatives.exists());

    let json = reports_to_json(&[report]).unwrap();
    assert!(json.contains("\"conditions\": \"testing=weekly\""));
}

#[test]
fn zero_padded_codes_filter_by_their_file_text() {
    let dir = TempDir::new().unwrap();
    let config_path = write_sources(dir.path());
    fs::write(
        dir.path().join("codes.csv"),
        "code,rate,cumulativeInfections\n007,0.50,300\n010,1.0,1500\n007,1.0,2700\n",
    )
    .unwrap();
    fs::write(&config_path, "[sources.named]\ncodes = \"codes.csv\"\n").unwrap();
    let config = AnalysisConfig::load(&config_path).unwrap();
    let engine = ScoreEngine::new(config.sources.clone(), config.extraction_settings());

    let mut conditions = FilterConditions::new();
    conditions.insert("code", "007");
    let outcome = engine.query(&query(0.5, conditions, "codes")).unwrap();

    assert_eq!(outcome.rows().height(), 2);
    assert_eq!(outcome.selection.pairs().len(), 4);
    assert!(outcome.selection.baseline().contains_key(&label("rate", "0.50")));
    assert_eq!(outcome.tables.positives[0].label, label("rate", "0.50"));
    assert_abs_diff_eq!(outcome.tables.positives[0].score, 1.0, epsilon = 1e-12);
}
