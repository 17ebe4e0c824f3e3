#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

pub mod config;
pub mod extract;
pub mod query;
pub mod ranking;
pub mod ratios;
pub mod report;
pub mod selection;
pub mod table;
pub mod types;

pub use config::{AnalysisConfig, SourceCatalog};
pub use extract::{CategoricalColumns, ExtractionSettings, extract_pairs};
pub use query::{QueryError, QueryOutcome, ScoreEngine, ScoreQuery};
pub use ranking::partition_and_rank;
pub use ratios::{compute_baseline, compute_ratios, compute_scores};
pub use selection::{Selection, SelectionCache, SelectionKey, TableSource};
pub use table::RunTable;
pub use types::{
    ExtractedPair, FilterConditions, LabeledValue, RankedEntry, RankedTables, RatioMap, ScoreMap,
};
