//! The query entry point: cutoff + conditions + selector in, ranked tables out.

use crate::extract::{ExtractError, ExtractionSettings};
use crate::ratios::ScoreError;
use crate::selection::{Selection, SelectionCache, SelectionKey, TableSource};
use crate::table::{RunTable, TableError};
use crate::types::{FilterConditions, RankedTables};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Failed to load run table: {0}")]
    Table(#[from] TableError),
    #[error("Failed to extract labeled values: {0}")]
    Extract(#[from] ExtractError),
    #[error("Failed to compute scores: {0}")]
    Score(#[from] ScoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreQuery {
    /// Runs with an outcome fraction at or below this value form the filtered set.
    pub cutoff: f64,
    pub conditions: FilterConditions,
    pub selector: String,
}

/// The result of one query. The selection is shared with the cache.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub tables: RankedTables,
    pub selection: Arc<Selection>,
}

impl QueryOutcome {
    /// The runs that satisfied the query's filter conditions.
    pub fn rows(&self) -> &RunTable {
        self.selection.rows()
    }
}

/// Owns a table source, the extraction settings, and the selection cache.
#[derive(Debug)]
pub struct ScoreEngine<S> {
    source: S,
    settings: ExtractionSettings,
    cache: SelectionCache,
}

impl<S: TableSource> ScoreEngine<S> {
    pub fn new(source: S, settings: ExtractionSettings) -> Self {
        Self {
            source,
            settings,
            cache: SelectionCache::new(),
        }
    }

    pub fn settings(&self) -> &ExtractionSettings {
        &self.settings
    }

    pub fn cache(&self) -> &SelectionCache {
        &self.cache
    }

    /// The cached selection for `selector` and `conditions`, loading and
    /// building it on first use.
    pub fn selection(
        &self,
        selector: &str,
        conditions: &FilterConditions,
    ) -> Result<Arc<Selection>, QueryError> {
        let key = SelectionKey::new(selector, conditions.clone());
        self.cache.get_or_build(key, || -> Result<Selection, QueryError> {
            let table = self.source.load(selector)?;
            Ok(Selection::build(&table, conditions, &self.settings)?)
        })
    }

    pub fn query(&self, query: &ScoreQuery) -> Result<QueryOutcome, QueryError> {
        if query.cutoff.is_nan() {
            return Err(ScoreError::InvalidCutoff(query.cutoff).into());
        }

        let selection = self.selection(&query.selector, &query.conditions)?;
        let tables = selection.rank(query.cutoff)?;
        log::debug!(
            "Cutoff {}: {} positive and {} non-positive scores",
            query.cutoff,
            tables.positives.len(),
            tables.negatives.len()
        );

        Ok(QueryOutcome { tables, selection })
    }
}
