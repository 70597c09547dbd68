//! Core types for the Synapsed Anonymity engine
//!
//! This module defines the engine-wide generalization state and the
//! equivalence-class partition derived from it.

use crate::error::{AnonymityError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Generalization level on a hierarchy ladder (0 = original values)
pub type Level = usize;

/// Stable identifier of a record inside a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub usize);

impl RecordId {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record({})", self.0)
    }
}

/// One level per quasi-identifier, applied uniformly to the whole column.
///
/// Levels only ever move upwards; `advance` rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralizationState {
    attributes: Vec<String>,
    levels: Vec<Level>,
}

impl GeneralizationState {
    /// All-zero state (no generalization) over the given attributes
    pub fn new(attributes: Vec<String>) -> Self {
        let levels = vec![0; attributes.len()];
        Self { attributes, levels }
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Level of the attribute at `index` in attribute order
    pub fn level_at(&self, index: usize) -> Level {
        self.levels[index]
    }

    /// Level of an attribute by name
    pub fn level(&self, attribute: &str) -> Result<Level> {
        self.index_of(attribute)
            .map(|index| self.levels[index])
            .ok_or_else(|| AnonymityError::unknown_attribute(attribute))
    }

    pub fn index_of(&self, attribute: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a == attribute)
    }

    /// Move an attribute to `target`; `ceiling` is its suppression level.
    pub fn advance(&mut self, index: usize, target: Level, ceiling: Level) -> Result<()> {
        let attribute = self
            .attributes
            .get(index)
            .ok_or_else(|| AnonymityError::unknown_attribute(format!("#{index}")))?;
        let current = self.levels[index];
        if target <= current {
            return Err(AnonymityError::invalid_level(attribute.clone(), current, target));
        }
        if target > ceiling {
            return Err(AnonymityError::level_out_of_range(attribute.clone(), target, ceiling));
        }
        self.levels[index] = target;
        Ok(())
    }

    /// Copy of this state with one attribute moved, for what-if evaluation
    pub fn with_advanced(&self, index: usize, target: Level, ceiling: Level) -> Result<Self> {
        let mut next = self.clone();
        next.advance(index, target, ceiling)?;
        Ok(next)
    }

    /// Sum of all levels, handy for tracking progress
    pub fn total_height(&self) -> Level {
        self.levels.iter().sum()
    }
}

impl fmt::Display for GeneralizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (attribute, level)) in self.attributes.iter().zip(&self.levels).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{attribute}: {level}")?;
        }
        write!(f, "}}")
    }
}

/// Non-suppressed records sharing one generalized QI tuple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalenceClass {
    /// Generalized values in attribute order
    pub key: Vec<String>,
    /// Members in dataset order
    pub members: Vec<RecordId>,
    /// Largest `required_k` among the members
    pub required_k: usize,
}

impl EquivalenceClass {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// A class protects only as well as its most demanding member.
    pub fn is_compliant(&self) -> bool {
        self.size() >= self.required_k
    }

    /// Members still missing before the class becomes compliant
    pub fn deficit(&self) -> usize {
        self.required_k.saturating_sub(self.size())
    }
}

/// Non-compliant classes and the records inside them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violations {
    /// Indices into `PartitionResult::classes`
    pub classes: Vec<usize>,
    /// Records inside violating classes, sorted
    pub records: Vec<RecordId>,
}

impl Violations {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

/// Output of an index rebuild
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionResult {
    /// Classes ordered by their first member
    pub classes: Vec<EquivalenceClass>,
    pub violations: Violations,
    /// Suppressed records, excluded from every class
    pub suppressed: Vec<RecordId>,
}

impl PartitionResult {
    pub fn is_compliant(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn violating_classes(&self) -> impl Iterator<Item = &EquivalenceClass> {
        self.violations.classes.iter().map(move |&i| &self.classes[i])
    }

    /// Number of records placed in some class
    pub fn covered_records(&self) -> usize {
        self.classes.iter().map(EquivalenceClass::size).sum()
    }

    /// Size of the smallest class, i.e. the k actually achieved
    pub fn min_class_size(&self) -> Option<usize> {
        self.classes.iter().map(EquivalenceClass::size).min()
    }

    pub fn average_class_size(&self) -> f64 {
        if self.classes.is_empty() {
            0.0
        } else {
            self.covered_records() as f64 / self.classes.len() as f64
        }
    }
}
