//! Generalization hierarchies
//!
//! A hierarchy is a ladder of increasingly coarse representations of one
//! quasi-identifier. Level 0 holds the original values, levels `1..=L` hold
//! coarser groupings and level `L+1` is the suppression level with a single
//! placeholder value. Every value of a level maps to exactly one value of the
//! next level, so coarsening never splits a group.

pub mod adult;
pub mod manager;

pub use manager::HierarchyManager;

use crate::error::{AnonymityError, Result};
use crate::types::Level;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::RangeInclusive;

/// Placeholder used at the suppression level unless a spec overrides it
pub const DEFAULT_SUPPRESSED_VALUE: &str = "*";

const ORIGINAL_LEVEL_NAME: &str = "original";
const SUPPRESSED_LEVEL_NAME: &str = "suppressed";

fn default_suppressed_value() -> String {
    DEFAULT_SUPPRESSED_VALUE.to_string()
}

/// Static, table-driven definition of a hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchySpec {
    /// Quasi-identifier name
    pub attribute: String,
    /// Original (level 0) values
    pub domain: Vec<String>,
    /// Non-suppression levels `1..=L`, finest first
    pub levels: Vec<LevelSpec>,
    #[serde(default = "default_suppressed_value")]
    pub suppressed_value: String,
}

/// One generalization step of a [`HierarchySpec`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSpec {
    pub name: String,
    /// Information loss at this level, strictly inside `(0, 1)`
    pub loss: f64,
    /// Previous-level value -> value at this level
    pub mapping: BTreeMap<String, String>,
}

impl HierarchySpec {
    pub fn new(attribute: impl Into<String>, domain: Vec<String>) -> Self {
        Self {
            attribute: attribute.into(),
            domain,
            levels: Vec::new(),
            suppressed_value: default_suppressed_value(),
        }
    }

    /// Append a level built from `(from, to)` pairs
    pub fn level<I, A, B>(mut self, name: impl Into<String>, loss: f64, mapping: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        self.levels.push(LevelSpec {
            name: name.into(),
            loss,
            mapping: mapping
                .into_iter()
                .map(|(from, to)| (from.into(), to.into()))
                .collect(),
        });
        self
    }

    pub fn with_suppressed_value(mut self, value: impl Into<String>) -> Self {
        self.suppressed_value = value.into();
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn build(self) -> Result<Hierarchy> {
        Hierarchy::from_spec(self)
    }
}

/// Numeric level made of labelled bands, used by [`Hierarchy::from_intervals`]
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalLevel {
    pub name: String,
    pub loss: f64,
    /// `(inclusive lower bound, label)`, ascending
    pub bands: Vec<(i64, String)>,
}

impl IntervalLevel {
    pub fn new(name: impl Into<String>, loss: f64) -> Self {
        Self {
            name: name.into(),
            loss,
            bands: Vec::new(),
        }
    }

    pub fn band(mut self, lower: i64, label: impl Into<String>) -> Self {
        self.bands.push((lower, label.into()));
        self
    }

    fn label_for(&self, value: i64) -> Option<&str> {
        self.bands
            .iter()
            .take_while(|(lower, _)| *lower <= value)
            .last()
            .map(|(_, label)| label.as_str())
    }
}

#[derive(Debug, Clone)]
struct LadderLevel {
    name: String,
    loss: f64,
    values: BTreeSet<String>,
    /// Value at this level -> value at the next level (empty at the top)
    parents: HashMap<String, String>,
}

/// Immutable generalization ladder for a single attribute
#[derive(Debug, Clone)]
pub struct Hierarchy {
    attribute: String,
    levels: Vec<LadderLevel>,
    /// Lowest level at which each value appears
    value_level: HashMap<String, Level>,
    suppressed_value: String,
}

/// Reporting view of one level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub level: Level,
    pub name: String,
    pub loss: f64,
    pub distinct_values: usize,
}

/// Reporting view of a whole hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyInfo {
    pub attribute: String,
    pub max_level: Level,
    pub levels: Vec<LevelInfo>,
}

impl Hierarchy {
    /// Validate a spec and build the ladder
    pub fn from_spec(spec: HierarchySpec) -> Result<Self> {
        let attribute = spec.attribute.clone();
        let fail = |message: String| AnonymityError::invalid_hierarchy(attribute.clone(), message);

        if spec.domain.is_empty() {
            return Err(fail("empty domain".to_string()));
        }
        if spec.suppressed_value.is_empty() {
            return Err(fail("empty suppressed value".to_string()));
        }

        let domain: BTreeSet<String> = spec.domain.iter().cloned().collect();
        if domain.len() != spec.domain.len() {
            return Err(fail("duplicate values in domain".to_string()));
        }

        let mut names = BTreeSet::from([ORIGINAL_LEVEL_NAME.to_string(), SUPPRESSED_LEVEL_NAME.to_string()]);
        let mut levels = vec![LadderLevel {
            name: ORIGINAL_LEVEL_NAME.to_string(),
            loss: 0.0,
            values: domain,
            parents: HashMap::new(),
        }];

        for spec_level in &spec.levels {
            let last = levels.len() - 1;
            let previous = &mut levels[last];
            if !names.insert(spec_level.name.clone()) {
                return Err(fail(format!("duplicate level name '{}'", spec_level.name)));
            }
            if !spec_level.loss.is_finite() || spec_level.loss <= previous.loss || spec_level.loss >= 1.0 {
                return Err(fail(format!(
                    "loss {} of level '{}' must lie in ({}, 1)",
                    spec_level.loss, spec_level.name, previous.loss
                )));
            }
            if let Some(stray) = spec_level.mapping.keys().find(|k| !previous.values.contains(*k)) {
                return Err(fail(format!(
                    "level '{}' maps '{}' which does not exist one level below",
                    spec_level.name, stray
                )));
            }
            if let Some(missing) = previous.values.iter().find(|v| !spec_level.mapping.contains_key(*v)) {
                return Err(fail(format!(
                    "value '{}' of level '{}' has no mapping in level '{}'",
                    missing, previous.name, spec_level.name
                )));
            }
            if spec_level.mapping.values().any(|v| *v == spec.suppressed_value) {
                return Err(fail(format!(
                    "level '{}' uses the suppressed value '{}'",
                    spec_level.name, spec.suppressed_value
                )));
            }

            previous.parents = spec_level
                .mapping
                .iter()
                .map(|(from, to)| (from.clone(), to.clone()))
                .collect();
            levels.push(LadderLevel {
                name: spec_level.name.clone(),
                loss: spec_level.loss,
                values: spec_level.mapping.values().cloned().collect(),
                parents: HashMap::new(),
            });
        }

        if levels[0].values.contains(&spec.suppressed_value) {
            return Err(fail(format!(
                "domain contains the suppressed value '{}'",
                spec.suppressed_value
            )));
        }

        let last = levels.len() - 1;
        let top = &mut levels[last];
        top.parents = top
            .values
            .iter()
            .map(|v| (v.clone(), spec.suppressed_value.clone()))
            .collect();
        levels.push(LadderLevel {
            name: SUPPRESSED_LEVEL_NAME.to_string(),
            loss: 1.0,
            values: BTreeSet::from([spec.suppressed_value.clone()]),
            parents: HashMap::new(),
        });

        let mut value_level = HashMap::new();
        for (level, ladder) in levels.iter().enumerate() {
            for value in &ladder.values {
                value_level.entry(value.clone()).or_insert(level);
            }
        }

        let hierarchy = Self {
            attribute: spec.attribute,
            levels,
            value_level,
            suppressed_value: spec.suppressed_value,
        };
        hierarchy.check_unambiguous()?;
        Ok(hierarchy)
    }

    /// Build a numeric hierarchy from band cut points.
    ///
    /// Band lower bounds must be strictly increasing within a level. Every band
    /// of a coarser level must be a union of bands of the level below it; a
    /// band that would be split fails with `InvalidHierarchy`.
    pub fn from_intervals(
        attribute: impl Into<String>,
        domain: RangeInclusive<i64>,
        levels: Vec<IntervalLevel>,
    ) -> Result<Self> {
        let attribute = attribute.into();
        let values: Vec<i64> = domain.collect();
        let mut spec = HierarchySpec::new(
            attribute.clone(),
            values.iter().map(i64::to_string).collect(),
        );

        let mut previous: Vec<String> = spec.domain.clone();
        for interval in levels {
            if interval.bands.windows(2).any(|pair| pair[0].0 >= pair[1].0) {
                return Err(AnonymityError::invalid_hierarchy(
                    attribute.clone(),
                    format!("bands of level '{}' must have strictly increasing lower bounds", interval.name),
                ));
            }
            let mut mapping: BTreeMap<String, String> = BTreeMap::new();
            let mut labels = Vec::with_capacity(values.len());
            for (value, below) in values.iter().zip(&previous) {
                let label = interval.label_for(*value).ok_or_else(|| {
                    AnonymityError::invalid_hierarchy(
                        attribute.clone(),
                        format!("value {} lies below every band of level '{}'", value, interval.name),
                    )
                })?;
                match mapping.get(below) {
                    Some(existing) if existing != label => {
                        return Err(AnonymityError::invalid_hierarchy(
                            attribute.clone(),
                            format!(
                                "band '{}' splits across '{}' and '{}' in level '{}'",
                                below, existing, label, interval.name
                            ),
                        ));
                    }
                    Some(_) => {}
                    None => {
                        mapping.insert(below.clone(), label.to_string());
                    }
                }
                labels.push(label.to_string());
            }
            spec.levels.push(LevelSpec {
                name: interval.name,
                loss: interval.loss,
                mapping,
            });
            previous = labels;
        }

        Hierarchy::from_spec(spec)
    }

    /// A value shared by two levels must generalize onto itself between them.
    fn check_unambiguous(&self) -> Result<()> {
        for (value, &lowest) in &self.value_level {
            for higher in lowest + 1..self.levels.len() {
                if self.levels[higher].values.contains(value) && self.walk(value, lowest, higher)? != value.as_str() {
                    return Err(AnonymityError::invalid_hierarchy(
                        self.attribute.clone(),
                        format!("value '{}' appears at levels {} and {} with different meanings", value, lowest, higher),
                    ));
                }
            }
        }
        Ok(())
    }

    fn walk<'a>(&'a self, value: &'a str, from: Level, to: Level) -> Result<&'a str> {
        let mut current = value;
        for step in from..to {
            current = self.levels[step]
                .parents
                .get(current)
                .map(String::as_str)
                .ok_or_else(|| {
                    AnonymityError::invalid_hierarchy(
                        self.attribute.clone(),
                        format!("'{}' has no parent above level {}", current, step),
                    )
                })?;
        }
        Ok(current)
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Highest non-suppression level `L`
    pub fn max_level(&self) -> Level {
        self.levels.len() - 2
    }

    /// Terminal level `L+1`
    pub fn suppression_level(&self) -> Level {
        self.levels.len() - 1
    }

    pub fn is_suppression(&self, level: Level) -> bool {
        level == self.suppression_level()
    }

    pub fn suppressed_value(&self) -> &str {
        &self.suppressed_value
    }

    /// Whether a value belongs to any level of this hierarchy
    pub fn covers(&self, value: &str) -> bool {
        self.value_level.contains_key(value)
    }

    /// Original (level 0) values
    pub fn domain(&self) -> impl Iterator<Item = &str> {
        self.levels[0].values.iter().map(String::as_str)
    }

    /// Representation of `value` at `level`.
    ///
    /// `value` may come from any level. A value already at or above `level`
    /// is returned as is, so the suppression placeholder stays put and
    /// generalizing twice to the same level changes nothing.
    pub fn generalize(&self, value: &str, level: Level) -> Result<&str> {
        if level > self.suppression_level() {
            return Err(AnonymityError::level_out_of_range(
                self.attribute.clone(),
                level,
                self.suppression_level(),
            ));
        }
        let (stored, &start) = self
            .value_level
            .get_key_value(value)
            .ok_or_else(|| AnonymityError::unknown_value(self.attribute.clone(), value))?;
        if start >= level {
            return Ok(stored);
        }
        self.walk(stored, start, level)
    }

    pub fn loss(&self, level: Level) -> Result<f64> {
        self.levels
            .get(level)
            .map(|l| l.loss)
            .ok_or_else(|| AnonymityError::level_out_of_range(self.attribute.clone(), level, self.suppression_level()))
    }

    /// Loss added by moving from `level` to `level + 1`
    pub fn incremental_loss(&self, level: Level) -> Result<f64> {
        Ok(self.loss(level + 1)? - self.loss(level)?)
    }

    pub fn level_name(&self, level: Level) -> Option<&str> {
        self.levels.get(level).map(|l| l.name.as_str())
    }

    /// Number of original values represented by `value` at `level`
    pub fn coverage(&self, value: &str, level: Level) -> Result<usize> {
        let mut count = 0;
        for original in &self.levels[0].values {
            if self.generalize(original, level)? == value {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn describe(&self) -> HierarchyInfo {
        HierarchyInfo {
            attribute: self.attribute.clone(),
            max_level: self.max_level(),
            levels: self
                .levels
                .iter()
                .enumerate()
                .map(|(level, l)| LevelInfo {
                    level,
                    name: l.name.clone(),
                    loss: l.loss,
                    distinct_values: l.values.len(),
                })
                .collect(),
        }
    }
}
