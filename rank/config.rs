//! # Analysis Configuration
//!
//! Settings are stored as human-readable TOML. Every field has a default that
//! matches the campus simulation exports, so an empty file (or no file at all)
//! is a valid configuration.

use crate::extract::{
    CategoricalColumns, DEFAULT_NORMALIZATION, DEFAULT_OUTCOME_COLUMN, ExtractionSettings,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Data file used when a selector has no entry of its own.
pub const DEFAULT_SOURCE: &str = "allVaccineRuns.csv";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML configuration file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize configuration to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("The normalization constant must be finite and greater than zero (found {0}).")]
    InvalidNormalization(f64),
    #[error("The outcome column name must not be empty.")]
    EmptyOutcomeColumn,
}

/// Maps data-source selectors to data files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCatalog {
    #[serde(default = "default_source")]
    pub default: PathBuf,
    #[serde(default = "default_named_sources")]
    pub named: BTreeMap<String, PathBuf>,
}

fn default_source() -> PathBuf {
    PathBuf::from(DEFAULT_SOURCE)
}

fn default_named_sources() -> BTreeMap<String, PathBuf> {
    BTreeMap::from([("noVaccines".to_string(), PathBuf::from("allNoVaccine.csv"))])
}

impl Default for SourceCatalog {
    fn default() -> Self {
        Self {
            default: default_source(),
            named: default_named_sources(),
        }
    }
}

impl SourceCatalog {
    /// The file for `selector`, falling back to the default source.
    pub fn resolve(&self, selector: &str) -> &Path {
        match self.named.get(selector) {
            Some(path) => path,
            None => {
                if !selector.is_empty() {
                    log::warn!(
                        "Unknown data source '{}'; using default '{}'",
                        selector,
                        self.default.display()
                    );
                }
                &self.default
            }
        }
    }

    fn rebase(&mut self, base: &Path) {
        let join = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        join(&mut self.default);
        self.named.values_mut().for_each(join);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_outcome_column")]
    pub outcome_column: String,
    #[serde(default = "default_normalization")]
    pub normalization: f64,
    /// When set, exactly these columns are categorical, in this order.
    /// When absent, the columns declared before the outcome column are used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categorical_columns: Option<Vec<String>>,
    #[serde(default)]
    pub sources: SourceCatalog,
}

fn default_outcome_column() -> String {
    DEFAULT_OUTCOME_COLUMN.to_string()
}

fn default_normalization() -> f64 {
    DEFAULT_NORMALIZATION
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            outcome_column: default_outcome_column(),
            normalization: default_normalization(),
            categorical_columns: None,
            sources: SourceCatalog::default(),
        }
    }
}

impl AnalysisConfig {
    /// Loads a configuration from a TOML file.
    ///
    /// Relative source paths are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&toml_string)?;
        if let Some(base) = path.parent() {
            config.sources.rebase(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration in TOML format.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let toml_string = self.to_toml()?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.normalization.is_finite() && self.normalization > 0.0) {
            return Err(ConfigError::InvalidNormalization(self.normalization));
        }
        if self.outcome_column.trim().is_empty() {
            return Err(ConfigError::EmptyOutcomeColumn);
        }
        Ok(())
    }

    pub fn extraction_settings(&self) -> ExtractionSettings {
        ExtractionSettings {
            outcome_column: self.outcome_column.clone(),
            normalization: self.normalization,
            categorical: match &self.categorical_columns {
                Some(columns) => CategoricalColumns::Explicit(columns.clone()),
                None => CategoricalColumns::PrecedingOutcome,
            },
        }
    }
}
