//! One hierarchy per quasi-identifier behind a name-keyed interface

use super::{Hierarchy, HierarchyInfo, HierarchySpec};
use crate::error::{AnonymityError, Result};
use crate::types::Level;
use std::collections::HashMap;
use tracing::debug;

/// Registry of hierarchies in a fixed attribute order.
///
/// The registration order is the attribute order used for class keys and for
/// deterministic tie-breaking in the optimizer. Hierarchies are immutable once
/// registered, so a manager can be shared freely between threads.
#[derive(Debug, Clone, Default)]
pub struct HierarchyManager {
    hierarchies: Vec<Hierarchy>,
    index: HashMap<String, usize>,
}

impl HierarchyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager holding the built-in Adult census hierarchies
    pub fn adult() -> Result<Self> {
        let mut manager = Self::new();
        for hierarchy in super::adult::all()? {
            manager.register(hierarchy)?;
        }
        Ok(manager)
    }

    pub fn from_specs(specs: Vec<HierarchySpec>) -> Result<Self> {
        let mut manager = Self::new();
        for spec in specs {
            manager.register(Hierarchy::from_spec(spec)?)?;
        }
        Ok(manager)
    }

    pub fn register(&mut self, hierarchy: Hierarchy) -> Result<()> {
        let attribute = hierarchy.attribute().to_string();
        if self.index.contains_key(&attribute) {
            return Err(AnonymityError::DuplicateAttribute { attribute });
        }
        debug!(
            "Registered hierarchy '{}' with {} levels",
            attribute,
            hierarchy.suppression_level() + 1
        );
        self.index.insert(attribute, self.hierarchies.len());
        self.hierarchies.push(hierarchy);
        Ok(())
    }

    pub fn with_hierarchy(mut self, hierarchy: Hierarchy) -> Result<Self> {
        self.register(hierarchy)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.hierarchies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hierarchies.is_empty()
    }

    /// Attribute names in registration order
    pub fn attributes(&self) -> Vec<String> {
        self.hierarchies.iter().map(|h| h.attribute().to_string()).collect()
    }

    pub fn position(&self, attribute: &str) -> Option<usize> {
        self.index.get(attribute).copied()
    }

    pub fn get(&self, attribute: &str) -> Result<&Hierarchy> {
        self.position(attribute)
            .map(|i| &self.hierarchies[i])
            .ok_or_else(|| AnonymityError::unknown_attribute(attribute))
    }

    pub fn hierarchies(&self) -> &[Hierarchy] {
        &self.hierarchies
    }

    pub fn generalize(&self, attribute: &str, value: &str, level: Level) -> Result<&str> {
        self.get(attribute)?.generalize(value, level)
    }

    pub fn loss(&self, attribute: &str, level: Level) -> Result<f64> {
        self.get(attribute)?.loss(level)
    }

    pub fn max_level(&self, attribute: &str) -> Result<Level> {
        Ok(self.get(attribute)?.max_level())
    }

    pub fn suppression_level(&self, attribute: &str) -> Result<Level> {
        Ok(self.get(attribute)?.suppression_level())
    }

    pub fn is_suppression(&self, attribute: &str, level: Level) -> Result<bool> {
        Ok(self.get(attribute)?.is_suppression(level))
    }

    /// Map a raw value onto the hierarchy before any lookup.
    ///
    /// Surrounding whitespace is trimmed. Sentinels for missing data become
    /// the suppression placeholder, i.e. they start out fully generalized.
    /// Anything else must be covered by the hierarchy.
    pub fn normalize<S: AsRef<str>>(&self, attribute: &str, raw: &str, sentinels: &[S]) -> Result<String> {
        let hierarchy = self.get(attribute)?;
        let value = raw.trim();
        if sentinels.iter().any(|s| s.as_ref() == value) {
            return Ok(hierarchy.suppressed_value().to_string());
        }
        if hierarchy.covers(value) {
            Ok(value.to_string())
        } else {
            Err(AnonymityError::unknown_value(attribute, value))
        }
    }

    pub fn describe(&self) -> Vec<HierarchyInfo> {
        self.hierarchies.iter().map(Hierarchy::describe).collect()
    }
}
