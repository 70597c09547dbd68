//! Main anonymizer
//!
//! Ties the hierarchy manager, the optimizer and the metrics calculator
//! together behind a single `anonymize` call.

use crate::config::AnonymizerConfig;
use crate::dataset::{Dataset, DatasetBuilder, GeneralizedRecord};
use crate::error::Result;
use crate::hierarchy::{HierarchyInfo, HierarchyManager};
use crate::metrics::{AnonymizationMetrics, MetricsCalculator};
use crate::optimizer::{Optimizer, OptimizerOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Everything the reporting side needs from one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymizationReport {
    pub outcome: OptimizerOutcome,
    pub metrics: AnonymizationMetrics,
    /// Per-record generalized view, suppression flags included
    pub records: Vec<GeneralizedRecord>,
    pub hierarchy_info: Vec<HierarchyInfo>,
}

/// Variable k-anonymity engine
#[derive(Debug, Clone)]
pub struct Anonymizer {
    manager: Arc<HierarchyManager>,
    config: AnonymizerConfig,
}

impl Anonymizer {
    pub fn new(manager: impl Into<Arc<HierarchyManager>>, config: AnonymizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            manager: manager.into(),
            config,
        })
    }

    /// Anonymizer over the built-in Adult census hierarchies
    pub fn adult(config: AnonymizerConfig) -> Result<Self> {
        Self::new(HierarchyManager::adult()?, config)
    }

    pub fn manager(&self) -> &HierarchyManager {
        &self.manager
    }

    pub fn config(&self) -> &AnonymizerConfig {
        &self.config
    }

    /// Dataset builder that treats the configured sentinels as missing data
    pub fn dataset_builder(&self) -> DatasetBuilder<'_> {
        Dataset::builder(&self.manager).with_sentinels(self.config.missing_sentinels.iter().cloned())
    }

    /// Generalize `dataset` until every unsuppressed record meets its k.
    ///
    /// Records that cannot be protected are marked suppressed in place.
    pub fn anonymize(&self, dataset: &mut Dataset) -> Result<AnonymizationReport> {
        info!(
            "Anonymizing {} records with the {} strategy",
            dataset.len(),
            self.config.strategy
        );

        let optimizer = Optimizer::from_config(&self.manager, &self.config);
        let outcome = optimizer.run(dataset)?;
        let metrics = MetricsCalculator::new(&self.manager).calculate(dataset, &outcome)?;
        let records = dataset.generalized_view(&self.manager, &outcome.state)?;

        info!(
            "Anonymization finished: distortion {:.4}, precision {:.4}, {} suppressed",
            metrics.overall_distortion, metrics.overall_precision, metrics.suppressed_records
        );

        Ok(AnonymizationReport {
            outcome,
            metrics,
            records,
            hierarchy_info: self.manager.describe(),
        })
    }
}
