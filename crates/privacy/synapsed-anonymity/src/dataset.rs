//! Records and datasets
//!
//! Records keep their normalized original values for lineage. The current
//! generalized value is never stored; it is derived from the engine-wide
//! [`GeneralizationState`] whenever it is needed.

use crate::error::{AnonymityError, Result};
use crate::hierarchy::HierarchyManager;
use crate::types::{GeneralizationState, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Sentinels treated as missing data unless configured otherwise
pub const DEFAULT_MISSING_SENTINELS: &[&str] = &["?", ""];

/// A single record with its privacy requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    original: Vec<String>,
    required_k: usize,
    suppressed: bool,
}

impl Record {
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Normalized original values in attribute order
    pub fn original_values(&self) -> &[String] {
        &self.original
    }

    pub fn original(&self, index: usize) -> &str {
        &self.original[index]
    }

    pub fn required_k(&self) -> usize {
        self.required_k
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Suppression is one-way.
    pub(crate) fn suppress(&mut self) {
        self.suppressed = true;
    }
}

/// Per-record output view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralizedRecord {
    pub id: RecordId,
    pub original: Vec<String>,
    /// Generalized values; the placeholder for every QI once suppressed
    pub values: Vec<String>,
    pub required_k: usize,
    pub suppressed: bool,
}

/// Distinct and missing value counts of one attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeProfile {
    pub attribute: String,
    pub distinct_values: usize,
    pub missing_values: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub records: usize,
    pub attributes: Vec<AttributeProfile>,
    pub k_distribution: BTreeMap<usize, usize>,
}

/// Records over a fixed list of quasi-identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    attributes: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(attributes: Vec<String>) -> Self {
        Self {
            attributes,
            records: Vec::new(),
        }
    }

    /// Empty dataset over every attribute of `manager`
    pub fn for_manager(manager: &HierarchyManager) -> Self {
        Self::new(manager.attributes())
    }

    pub fn builder(manager: &HierarchyManager) -> DatasetBuilder<'_> {
        DatasetBuilder::new(manager)
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record(&self, id: RecordId) -> Option<&Record> {
        self.records.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Add a record from `(attribute, raw value)` pairs, treating the default
    /// sentinels as missing data.
    pub fn push<I, K, V>(&mut self, manager: &HierarchyManager, values: I, required_k: usize) -> Result<RecordId>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.push_with_sentinels(manager, values, required_k, DEFAULT_MISSING_SENTINELS)
    }

    pub fn push_with_sentinels<I, K, V, S>(
        &mut self,
        manager: &HierarchyManager,
        values: I,
        required_k: usize,
        sentinels: &[S],
    ) -> Result<RecordId>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
        S: AsRef<str>,
    {
        let raw: HashMap<String, String> = values
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();

        let mut normalized = Vec::with_capacity(self.attributes.len());
        for attribute in &self.attributes {
            let value = raw.get(attribute).ok_or_else(|| {
                AnonymityError::invalid_record(format!("missing quasi-identifier '{attribute}'"))
            })?;
            normalized.push(manager.normalize(attribute, value, sentinels)?);
        }
        self.push_normalized(manager, normalized, required_k)
    }

    /// Admit a record whose values are already normalized.
    pub fn push_normalized(
        &mut self,
        manager: &HierarchyManager,
        values: Vec<String>,
        required_k: usize,
    ) -> Result<RecordId> {
        if values.len() != self.attributes.len() {
            return Err(AnonymityError::invalid_record(format!(
                "expected {} values, got {}",
                self.attributes.len(),
                values.len()
            )));
        }
        if required_k == 0 {
            return Err(AnonymityError::invalid_record("required_k must be at least 1"));
        }
        for (attribute, value) in self.attributes.iter().zip(&values) {
            if !manager.get(attribute)?.covers(value) {
                return Err(AnonymityError::unknown_value(attribute.clone(), value.clone()));
            }
        }
        let id = RecordId(self.records.len());
        self.records.push(Record {
            id,
            original: values,
            required_k,
            suppressed: false,
        });
        Ok(id)
    }

    pub(crate) fn suppress(&mut self, id: RecordId) {
        if let Some(record) = self.records.get_mut(id.0) {
            record.suppress();
        }
    }

    /// Assign k values sequentially: the first `count` records get `k`, and so on.
    ///
    /// Records past the end of the distribution keep their current k.
    pub fn assign_k_distribution(&mut self, distribution: &[(usize, usize)]) -> Result<()> {
        if distribution.iter().any(|(k, _)| *k == 0) {
            return Err(AnonymityError::invalid_record("required_k must be at least 1"));
        }
        let mut start = 0;
        for &(k, count) in distribution {
            let end = (start + count).min(self.records.len());
            for record in &mut self.records[start..end] {
                record.required_k = k;
            }
            start = end;
        }
        Ok(())
    }

    /// Assign k values by share of the dataset, e.g. `[(2, 0.7), (3, 0.2), (4, 0.05), (5, 0.05)]`.
    ///
    /// Share boundaries are rounded to whole records. The last share absorbs
    /// the remainder when the shares sum to one.
    pub fn assign_k_by_fraction(&mut self, shares: &[(usize, f64)]) -> Result<()> {
        let total: f64 = shares.iter().map(|(_, share)| share).sum();
        if shares.iter().any(|(_, share)| !share.is_finite() || *share < 0.0) || total > 1.0 + 1e-9 {
            return Err(AnonymityError::config(format!(
                "k shares must be non-negative and sum to at most 1 (got {total})"
            )));
        }
        let n = self.records.len();
        let mut cumulative = 0.0;
        let mut distribution = Vec::with_capacity(shares.len());
        let mut assigned = 0;
        for (i, &(k, share)) in shares.iter().enumerate() {
            cumulative += share;
            let end = if i + 1 == shares.len() && (total - 1.0).abs() < 1e-9 {
                n
            } else {
                ((cumulative * n as f64).round() as usize).min(n)
            };
            distribution.push((k, end.saturating_sub(assigned)));
            assigned = end.max(assigned);
        }
        self.assign_k_distribution(&distribution)
    }

    pub fn k_distribution(&self) -> BTreeMap<usize, usize> {
        let mut distribution = BTreeMap::new();
        for record in &self.records {
            *distribution.entry(record.required_k).or_insert(0) += 1;
        }
        distribution
    }

    pub fn suppressed_count(&self) -> usize {
        self.records.iter().filter(|r| r.suppressed).count()
    }

    pub fn suppressed_records(&self) -> Vec<RecordId> {
        self.records.iter().filter(|r| r.suppressed).map(|r| r.id).collect()
    }

    /// Current value of one attribute of one record under `state`
    pub fn current_value<'a>(
        &self,
        manager: &'a HierarchyManager,
        state: &GeneralizationState,
        id: RecordId,
        index: usize,
    ) -> Result<&'a str> {
        let record = self
            .record(id)
            .ok_or_else(|| AnonymityError::invalid_record(format!("no such record {id}")))?;
        let attribute = self
            .attributes
            .get(index)
            .ok_or_else(|| AnonymityError::unknown_attribute(format!("#{index}")))?;
        let level = state
            .levels()
            .get(index)
            .copied()
            .ok_or_else(|| AnonymityError::unknown_attribute(attribute.clone()))?;
        manager.generalize(attribute, record.original(index), level)
    }

    pub fn generalized_view(
        &self,
        manager: &HierarchyManager,
        state: &GeneralizationState,
    ) -> Result<Vec<GeneralizedRecord>> {
        let hierarchies = self
            .attributes
            .iter()
            .map(|a| manager.get(a))
            .collect::<Result<Vec<_>>>()?;

        self.records
            .iter()
            .map(|record| {
                let values = hierarchies
                    .iter()
                    .enumerate()
                    .map(|(i, h)| {
                        if record.suppressed {
                            Ok(h.suppressed_value().to_string())
                        } else {
                            h.generalize(record.original(i), state.level_at(i)).map(str::to_string)
                        }
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(GeneralizedRecord {
                    id: record.id,
                    original: record.original.clone(),
                    values,
                    required_k: record.required_k,
                    suppressed: record.suppressed,
                })
            })
            .collect()
    }

    pub fn profile(&self, manager: &HierarchyManager) -> Result<DatasetProfile> {
        let mut attributes = Vec::with_capacity(self.attributes.len());
        for (i, attribute) in self.attributes.iter().enumerate() {
            let placeholder = manager.get(attribute)?.suppressed_value();
            let distinct: BTreeSet<&str> = self.records.iter().map(|r| r.original(i)).collect();
            let missing = self.records.iter().filter(|r| r.original(i) == placeholder).count();
            attributes.push(AttributeProfile {
                attribute: attribute.clone(),
                distinct_values: distinct.len(),
                missing_values: missing,
            });
        }
        Ok(DatasetProfile {
            records: self.records.len(),
            attributes,
            k_distribution: self.k_distribution(),
        })
    }
}

/// Loads raw records through the hierarchy manager's normalization
#[derive(Debug)]
pub struct DatasetBuilder<'a> {
    manager: &'a HierarchyManager,
    dataset: Dataset,
    sentinels: Vec<String>,
}

impl<'a> DatasetBuilder<'a> {
    pub fn new(manager: &'a HierarchyManager) -> Self {
        Self {
            manager,
            dataset: Dataset::for_manager(manager),
            sentinels: DEFAULT_MISSING_SENTINELS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Restrict the quasi-identifiers to a subset of the manager's attributes
    ///
    /// Must be called before any record is pushed.
    pub fn with_attributes(mut self, attributes: Vec<String>) -> Result<Self> {
        if !self.dataset.is_empty() {
            return Err(AnonymityError::config(
                "quasi-identifiers cannot change once records are loaded",
            ));
        }
        let mut seen = BTreeSet::new();
        for attribute in &attributes {
            self.manager.get(attribute)?;
            if !seen.insert(attribute.as_str()) {
                return Err(AnonymityError::DuplicateAttribute {
                    attribute: attribute.clone(),
                });
            }
        }
        self.dataset = Dataset::new(attributes);
        Ok(self)
    }

    pub fn with_sentinels<I, S>(mut self, sentinels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sentinels = sentinels.into_iter().map(Into::into).collect();
        self
    }

    /// Add a record from `(attribute, raw value)` pairs.
    ///
    /// Columns that are not quasi-identifiers are ignored.
    pub fn push<I, K, V>(&mut self, values: I, required_k: usize) -> Result<RecordId>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.dataset
            .push_with_sentinels(self.manager, values, required_k, self.sentinels.as_slice())
    }

    pub fn record<I, K, V>(mut self, values: I, required_k: usize) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.push(values, required_k)?;
        Ok(self)
    }

    pub fn build(self) -> Dataset {
        debug!(
            "Loaded {} records over {} quasi-identifiers",
            self.dataset.len(),
            self.dataset.attributes.len()
        );
        self.dataset
    }
}
