//! Analysis configuration.
//!
//! Configuration can be loaded from:
//! - TOML files (an `[analysis]` table with a nested `[analysis.recommender]`)
//! - Environment variables (`TAXON_*` prefixed)
//!
//! # Example
//!
//! ```rust,no_run
//! use taxon_core::config::AnalysisConfig;
//!
//! // Explicit file, or environment variables when no path is given
//! let config = AnalysisConfig::load(Some(std::path::Path::new("taxon.toml")))
//!     .expect("Failed to load config");
//!
//! let config = AnalysisConfig::from_env();
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

use crate::defaults;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Weights and thresholds of the mapping recommender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Candidates below this confidence are dropped.
    pub min_confidence: f64,
    /// Runner-up kept when within this distance of the top candidate.
    pub tie_margin: f64,
    /// Bonus when a same-group sibling already lives in the division.
    pub sibling_bonus: f64,
    /// Maximum deduction for overloaded divisions.
    pub imbalance_penalty: f64,
    /// Overload threshold as a multiple of the mean division load.
    pub imbalance_ratio: f64,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            min_confidence: defaults::MIN_CONFIDENCE,
            tie_margin: defaults::TIE_MARGIN,
            sibling_bonus: defaults::SIBLING_BONUS,
            imbalance_penalty: defaults::IMBALANCE_PENALTY,
            imbalance_ratio: defaults::IMBALANCE_RATIO,
        }
    }
}

impl RecommenderConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let unit = [
            ("min_confidence", self.min_confidence),
            ("tie_margin", self.tie_margin),
            ("sibling_bonus", self.sibling_bonus),
            ("imbalance_penalty", self.imbalance_penalty),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "recommender.{} must be within [0, 1], got: {}",
                    name, value
                )));
            }
        }

        if !self.imbalance_ratio.is_finite() || self.imbalance_ratio < 1.0 {
            return Err(ConfigError::Validation(format!(
                "recommender.imbalance_ratio must be at least 1.0, got: {}",
                self.imbalance_ratio
            )));
        }

        Ok(())
    }
}

/// Top-level analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Cap on ids listed per issue.
    pub max_affected_items: usize,
    /// Split issues per category scope.
    pub group_by_category: bool,
    /// Division count the target structure must have, when enforced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_divisions: Option<usize>,
    pub recommender: RecommenderConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_affected_items: defaults::MAX_AFFECTED_ITEMS,
            group_by_category: defaults::GROUP_BY_CATEGORY,
            expected_divisions: None,
            recommender: RecommenderConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load from `path` when given, otherwise from environment variables.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => {
                info!("Loading analysis config from: {}", path.display());
                Self::from_file(path)
            }
            None => {
                debug!("No config file given, using environment variables");
                let config = Self::from_env();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        #[derive(Deserialize)]
        struct TomlRoot {
            #[serde(default)]
            analysis: AnalysisConfig,
        }

        let root: TomlRoot = toml::from_str(content)?;
        root.analysis.validate()?;
        Ok(root.analysis)
    }

    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            max_affected_items: parse_env(defaults::ENV_MAX_AFFECTED_ITEMS)
                .unwrap_or(base.max_affected_items),
            group_by_category: parse_bool_env(
                defaults::ENV_GROUP_BY_CATEGORY,
                base.group_by_category,
            ),
            expected_divisions: parse_env(defaults::ENV_EXPECTED_DIVISIONS),
            recommender: RecommenderConfig {
                min_confidence: parse_env(defaults::ENV_MIN_CONFIDENCE)
                    .unwrap_or(base.recommender.min_confidence),
                tie_margin: parse_env(defaults::ENV_TIE_MARGIN)
                    .unwrap_or(base.recommender.tie_margin),
                sibling_bonus: parse_env(defaults::ENV_SIBLING_BONUS)
                    .unwrap_or(base.recommender.sibling_bonus),
                imbalance_penalty: parse_env(defaults::ENV_IMBALANCE_PENALTY)
                    .unwrap_or(base.recommender.imbalance_penalty),
                imbalance_ratio: parse_env(defaults::ENV_IMBALANCE_RATIO)
                    .unwrap_or(base.recommender.imbalance_ratio),
            },
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_affected_items == 0 {
            return Err(ConfigError::Validation(
                "max_affected_items must be at least 1".to_string(),
            ));
        }

        if self.expected_divisions == Some(0) {
            return Err(ConfigError::Validation(
                "expected_divisions must be at least 1 when set".to_string(),
            ));
        }

        self.recommender.validate()
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.trim().parse().ok())
}

/// Recognizes "true", "1", "yes", "on" (case-insensitive) as true.
fn parse_bool_env(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|val| match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}
