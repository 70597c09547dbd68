//! Distortion and precision of a terminal generalization state
//!
//! Per attribute at level `n` with `L` non-suppression levels:
//!
//! - distortion = `loss(n)`
//! - precision = `1 - n / (L + 1)`
//!
//! Overall figures are unweighted means over the attributes.

use crate::dataset::Dataset;
use crate::error::Result;
use crate::hierarchy::HierarchyManager;
use crate::optimizer::OptimizerOutcome;
use crate::types::{GeneralizationState, Level};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeMetrics {
    pub attribute: String,
    pub level: Level,
    pub max_level: Level,
    pub level_name: String,
    pub distortion: f64,
    pub precision: f64,
    pub suppressed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymizationMetrics {
    pub strategy: String,
    pub attributes: Vec<AttributeMetrics>,
    pub overall_distortion: f64,
    pub overall_precision: f64,
    pub total_records: usize,
    pub suppressed_records: usize,
    pub suppression_rate: f64,
    pub iterations: usize,
    pub converged: bool,
    pub equivalence_classes: usize,
    pub average_class_size: f64,
    /// Smallest class, 0 when every record was suppressed
    pub min_class_size: usize,
}

impl AnonymizationMetrics {
    pub fn attribute(&self, name: &str) -> Option<&AttributeMetrics> {
        self.attributes.iter().find(|a| a.attribute == name)
    }

    /// Attributes that ended on their suppression level
    pub fn suppressed_attributes(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| a.suppressed)
            .map(|a| a.attribute.as_str())
            .collect()
    }
}

impl fmt::Display for AnonymizationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Strategy: {}", self.strategy)?;
        writeln!(
            f,
            "Iterations: {} ({})",
            self.iterations,
            if self.converged { "converged" } else { "exhausted" }
        )?;
        writeln!(
            f,
            "Records: {} total, {} suppressed ({:.2}%)",
            self.total_records,
            self.suppressed_records,
            self.suppression_rate * 100.0
        )?;
        writeln!(
            f,
            "Equivalence classes: {} (average size {:.2}, minimum {})",
            self.equivalence_classes, self.average_class_size, self.min_class_size
        )?;
        for a in &self.attributes {
            writeln!(
                f,
                "  {:<16} level {}/{} {:<20} distortion {:.4}  precision {:.4}",
                a.attribute,
                a.level,
                a.max_level + 1,
                a.level_name,
                a.distortion,
                a.precision
            )?;
        }
        write!(
            f,
            "Overall distortion {:.4}, overall precision {:.4}",
            self.overall_distortion, self.overall_precision
        )
    }
}

/// Reads the terminal state, never modifies anything
#[derive(Debug, Clone, Copy)]
pub struct MetricsCalculator<'a> {
    manager: &'a HierarchyManager,
}

impl<'a> MetricsCalculator<'a> {
    pub fn new(manager: &'a HierarchyManager) -> Self {
        Self { manager }
    }

    pub fn attribute_metrics(&self, state: &GeneralizationState) -> Result<Vec<AttributeMetrics>> {
        state
            .attributes()
            .iter()
            .zip(state.levels())
            .map(|(attribute, &level)| {
                let hierarchy = self.manager.get(attribute)?;
                let max_level = hierarchy.max_level();
                Ok(AttributeMetrics {
                    attribute: attribute.clone(),
                    level,
                    max_level,
                    level_name: hierarchy.level_name(level).unwrap_or_default().to_string(),
                    distortion: hierarchy.loss(level)?,
                    precision: 1.0 - level as f64 / (max_level + 1) as f64,
                    suppressed: hierarchy.is_suppression(level),
                })
            })
            .collect()
    }

    pub fn calculate(&self, dataset: &Dataset, outcome: &OptimizerOutcome) -> Result<AnonymizationMetrics> {
        let attributes = self.attribute_metrics(&outcome.state)?;
        let (overall_distortion, overall_precision) = if attributes.is_empty() {
            (0.0, 1.0)
        } else {
            let n = attributes.len() as f64;
            (
                attributes.iter().map(|a| a.distortion).sum::<f64>() / n,
                attributes.iter().map(|a| a.precision).sum::<f64>() / n,
            )
        };

        let total_records = dataset.len();
        let suppressed_records = dataset.suppressed_count();
        let partition = &outcome.final_partition;

        Ok(AnonymizationMetrics {
            strategy: outcome.strategy.clone(),
            attributes,
            overall_distortion,
            overall_precision,
            total_records,
            suppressed_records,
            suppression_rate: if total_records == 0 {
                0.0
            } else {
                suppressed_records as f64 / total_records as f64
            },
            iterations: outcome.iterations,
            converged: outcome.is_converged(),
            equivalence_classes: partition.class_count(),
            average_class_size: partition.average_class_size(),
            min_class_size: partition.min_class_size().unwrap_or(0),
        })
    }
}
