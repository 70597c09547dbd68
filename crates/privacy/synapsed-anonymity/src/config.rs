//! Configuration for the anonymizer

use crate::dataset::DEFAULT_MISSING_SENTINELS;
use crate::error::{AnonymityError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Which generalization strategy drives the optimizer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Cheapest next step, one attribute exhausted before the next
    #[default]
    Greedy,
    /// Benefit over cost with a penalty for outrunning the other attributes
    Balanced,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Greedy => write!(f, "greedy"),
            StrategyKind::Balanced => write!(f, "balanced"),
        }
    }
}

/// Anonymizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnonymizerConfig {
    pub strategy: StrategyKind,
    /// Generalization steps before the loop is forced to stop
    pub max_iterations: usize,
    /// Weight of the level-imbalance penalty (balanced strategy only)
    pub balance_weight: f64,
    /// Extra cost of a move onto the suppression level (balanced strategy only)
    pub suppression_penalty: f64,
    /// Raw values treated as missing data
    pub missing_sentinels: Vec<String>,
    /// Datasets at least this large compute class keys in parallel
    pub parallel_threshold: usize,
}

impl Default for AnonymizerConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Greedy,
            max_iterations: 10,
            balance_weight: 1.0,
            suppression_penalty: 1.0,
            missing_sentinels: DEFAULT_MISSING_SENTINELS.iter().map(|s| s.to_string()).collect(),
            parallel_threshold: 4096,
        }
    }
}

impl AnonymizerConfig {
    pub fn new(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    pub fn greedy() -> Self {
        Self::new(StrategyKind::Greedy)
    }

    pub fn balanced() -> Self {
        Self::new(StrategyKind::Balanced)
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_balance_weight(mut self, weight: f64) -> Self {
        self.balance_weight = weight;
        self
    }

    pub fn with_suppression_penalty(mut self, penalty: f64) -> Self {
        self.suppression_penalty = penalty;
        self
    }

    pub fn with_missing_sentinels<I, S>(mut self, sentinels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing_sentinels = sentinels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(AnonymityError::config("max_iterations must be at least 1"));
        }
        for (name, value) in [
            ("balance_weight", self.balance_weight),
            ("suppression_penalty", self.suppression_penalty),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AnonymityError::config(format!(
                    "{name} must be a non-negative finite number, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.toml` or `.json` file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AnonymityError::config(format!("Failed to read config file: {e}")))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(AnonymityError::config("Cannot detect config format from file extension")),
        }
    }
}
