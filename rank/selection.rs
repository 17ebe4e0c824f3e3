//! # Selections and the Selection Cache
//!
//! A [`Selection`] is one filtered view of a run table together with everything
//! derived from it that does not depend on the cutoff: the extracted pairs and
//! the baseline ratios. Queries with different cutoffs against the same
//! selector and conditions share one selection.
//!
//! The [`SelectionCache`] keeps selections for the lifetime of the process. It
//! is safe to share between threads: the check-then-populate step runs under
//! the map's shard lock, so a key is built at most once.

use crate::config::SourceCatalog;
use crate::extract::{ExtractError, ExtractionSettings, extract_rows, matching_rows};
use crate::ranking::partition_and_rank;
use crate::ratios::{ScoreError, compute_baseline, compute_scores};
use crate::table::{RunTable, TableError, load_run_table};
use crate::types::{ExtractedPair, FilterConditions, RankedTables, RatioMap, ScoreMap};
use dashmap::DashMap;
use std::sync::Arc;

/// Provides run tables by selector.
pub trait TableSource {
    fn load(&self, selector: &str) -> Result<RunTable, TableError>;
}

impl TableSource for SourceCatalog {
    fn load(&self, selector: &str) -> Result<RunTable, TableError> {
        load_run_table(self.resolve(selector))
    }
}

#[derive(Debug)]
pub struct Selection {
    rows: RunTable,
    pairs: Vec<ExtractedPair>,
    baseline: RatioMap,
}

impl Selection {
    /// Filters `table` by `conditions`, extracts its pairs, and computes the baseline.
    pub fn build(
        table: &RunTable,
        conditions: &FilterConditions,
        settings: &ExtractionSettings,
    ) -> Result<Self, ExtractError> {
        let matched = matching_rows(table, conditions)?;
        let pairs = extract_rows(table, &matched, settings)?;
        let rows = table.select_rows(&matched);
        let baseline = compute_baseline(&pairs);

        log::info!(
            "Built selection for conditions [{}]: {} of {} runs, {} labeled values",
            conditions,
            rows.height(),
            table.height(),
            baseline.len()
        );

        Ok(Self {
            rows,
            pairs,
            baseline,
        })
    }

    /// The runs that satisfied the filter conditions.
    pub fn rows(&self) -> &RunTable {
        &self.rows
    }

    pub fn pairs(&self) -> &[ExtractedPair] {
        &self.pairs
    }

    pub fn baseline(&self) -> &RatioMap {
        &self.baseline
    }

    pub fn scores(&self, cutoff: f64) -> Result<ScoreMap, ScoreError> {
        compute_scores(&self.pairs, cutoff, &self.baseline)
    }

    /// Scores the selection at `cutoff` and splits the result into ranked tables.
    pub fn rank(&self, cutoff: f64) -> Result<RankedTables, ScoreError> {
        let scores = self.scores(cutoff)?;
        Ok(partition_and_rank(&scores))
    }
}

/// Identity of a cached selection: the data-source selector plus the filter
/// conditions, which are kept sorted by column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectionKey {
    pub selector: String,
    pub conditions: FilterConditions,
}

impl SelectionKey {
    pub fn new(selector: impl Into<String>, conditions: FilterConditions) -> Self {
        Self {
            selector: selector.into(),
            conditions,
        }
    }
}

/// Process-lifetime cache of selections. Entries are never evicted.
#[derive(Debug, Default)]
pub struct SelectionCache {
    entries: DashMap<SelectionKey, Arc<Selection>>,
}

impl SelectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SelectionKey) -> Option<Arc<Selection>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns the cached selection for `key`, running `build` only if absent.
    ///
    /// A failed build leaves the cache unchanged.
    pub fn get_or_build<E, F>(&self, key: SelectionKey, build: F) -> Result<Arc<Selection>, E>
    where
        F: FnOnce() -> Result<Selection, E>,
    {
        if let Some(hit) = self.get(&key) {
            log::debug!(
                "Selection cache hit for '{}' [{}]",
                key.selector,
                key.conditions
            );
            return Ok(hit);
        }

        let entry = self
            .entries
            .entry(key)
            .or_try_insert_with(|| build().map(Arc::new))?;
        Ok(Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
