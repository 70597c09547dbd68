//! Core traits for the Synapsed Anonymity engine
//!
//! A generalization strategy decides which attribute moves up its hierarchy
//! next. The optimizer owns the loop and the state; strategies only look.

use crate::dataset::Dataset;
use crate::error::Result;
use crate::hierarchy::{Hierarchy, HierarchyManager};
use crate::index::EquivalenceClassIndex;
use crate::types::{GeneralizationState, Level, PartitionResult};
use serde::{Deserialize, Serialize};

/// A proposed one-level move of a single attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Position of the attribute in attribute order
    pub attribute_index: usize,
    pub attribute: String,
    pub from: Level,
    pub to: Level,
    /// Violating records the move is predicted to resolve
    pub benefit: f64,
    /// Incremental information loss
    pub cost: f64,
    pub penalty: f64,
    pub score: f64,
}

impl Candidate {
    /// A move that only carries its cost
    pub fn by_cost(attribute_index: usize, hierarchy: &Hierarchy, from: Level) -> Result<Self> {
        Ok(Self {
            attribute_index,
            attribute: hierarchy.attribute().to_string(),
            from,
            to: from + 1,
            benefit: 0.0,
            cost: hierarchy.incremental_loss(from)?,
            penalty: 0.0,
            score: 0.0,
        })
    }
}

/// Read-only view of one optimizer iteration
pub struct SelectionContext<'a> {
    pub index: &'a EquivalenceClassIndex<'a>,
    pub dataset: &'a Dataset,
    pub state: &'a GeneralizationState,
    pub partition: &'a PartitionResult,
}

impl<'a> SelectionContext<'a> {
    pub fn manager(&self) -> &'a HierarchyManager {
        self.index.manager()
    }

    /// Attributes below their suppression level, in attribute order
    pub fn open_attributes(&self) -> Result<Vec<(usize, &'a Hierarchy, Level)>> {
        let manager = self.manager();
        let mut open = Vec::new();
        for (i, attribute) in self.state.attributes().iter().enumerate() {
            let hierarchy = manager.get(attribute)?;
            let level = self.state.level_at(i);
            if level < hierarchy.suppression_level() {
                open.push((i, hierarchy, level));
            }
        }
        Ok(open)
    }

    /// Partition under a hypothetical state, without committing it
    pub fn simulate(&self, state: &GeneralizationState) -> Result<PartitionResult> {
        self.index.rebuild(self.dataset, state)
    }
}

/// Chooses the next generalization step
pub trait GeneralizationStrategy: Send + Sync {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Next move, or `None` when no attribute can advance
    fn select(&self, context: &SelectionContext<'_>) -> Result<Option<Candidate>>;
}
