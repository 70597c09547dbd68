//! Equivalence-class index
//!
//! Classes are always recomputed from scratch for a given state. Suppressed
//! records are left out of every class and reported separately.

use crate::dataset::{Dataset, Record};
use crate::error::{AnonymityError, Result};
use crate::hierarchy::{Hierarchy, HierarchyManager};
use crate::types::{EquivalenceClass, GeneralizationState, PartitionResult, RecordId, Violations};
use std::collections::HashMap;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Groups records by their generalized quasi-identifier tuple
#[derive(Debug, Clone, Copy)]
pub struct EquivalenceClassIndex<'a> {
    manager: &'a HierarchyManager,
    parallel_threshold: usize,
}

impl<'a> EquivalenceClassIndex<'a> {
    pub fn new(manager: &'a HierarchyManager) -> Self {
        Self {
            manager,
            parallel_threshold: usize::MAX,
        }
    }

    /// Compute keys in parallel once this many records are active
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn manager(&self) -> &'a HierarchyManager {
        self.manager
    }

    /// Partition the unsuppressed records of `dataset` under `state`.
    ///
    /// Classes come out ordered by their first member and members keep
    /// dataset order, whichever way the keys were computed.
    pub fn rebuild(&self, dataset: &Dataset, state: &GeneralizationState) -> Result<PartitionResult> {
        if state.attributes() != dataset.attributes() {
            return Err(AnonymityError::config(
                "generalization state and dataset disagree on the quasi-identifiers",
            ));
        }
        let hierarchies = dataset
            .attributes()
            .iter()
            .map(|a| self.manager.get(a))
            .collect::<Result<Vec<_>>>()?;

        let (active, suppressed): (Vec<&Record>, Vec<&Record>) =
            dataset.records().iter().partition(|r| !r.is_suppressed());

        let keys = self.compute_keys(&active, &hierarchies, state)?;

        let mut slots: HashMap<&[&str], usize> = HashMap::with_capacity(keys.len() / 2 + 1);
        let mut classes: Vec<EquivalenceClass> = Vec::new();
        for (record, key) in active.iter().zip(&keys) {
            let slot = *slots.entry(key.as_slice()).or_insert_with(|| {
                classes.push(EquivalenceClass {
                    key: key.iter().map(|v| v.to_string()).collect(),
                    members: Vec::new(),
                    required_k: 0,
                });
                classes.len() - 1
            });
            let class = &mut classes[slot];
            class.members.push(record.id());
            class.required_k = class.required_k.max(record.required_k());
        }

        let mut violations = Violations::default();
        for (i, class) in classes.iter().enumerate() {
            if !class.is_compliant() {
                violations.classes.push(i);
                violations.records.extend_from_slice(&class.members);
            }
        }
        violations.records.sort_unstable();

        debug!(
            "Rebuilt index at {}: {} classes, {} violating classes, {} violating records",
            state,
            classes.len(),
            violations.class_count(),
            violations.record_count()
        );

        Ok(PartitionResult {
            classes,
            violations,
            suppressed: suppressed.iter().map(|r| r.id()).collect::<Vec<RecordId>>(),
        })
    }

    fn compute_keys<'h>(
        &self,
        records: &[&Record],
        hierarchies: &[&'h Hierarchy],
        state: &GeneralizationState,
    ) -> Result<Vec<Vec<&'h str>>> {
        let key_for = |record: &&Record| -> Result<Vec<&'h str>> {
            hierarchies
                .iter()
                .enumerate()
                .map(|(i, h)| h.generalize(record.original(i), state.level_at(i)))
                .collect()
        };

        #[cfg(feature = "parallel")]
        if records.len() >= self.parallel_threshold {
            return records.par_iter().map(key_for).collect();
        }

        records.iter().map(key_for).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(manager: &HierarchyManager, rows: &[(&str, &str, &str, &str, usize)]) -> Dataset {
        let mut builder = Dataset::builder(manager);
        for (age, education, marital, race, k) in rows {
            builder
                .push(
                    [
                        ("age", *age),
                        ("education", *education),
                        ("marital-status", *marital),
                        ("race", *race),
                    ],
                    *k,
                )
                .unwrap();
        }
        builder.build()
    }

    #[test]
    fn test_groups_identical_tuples() {
        let manager = HierarchyManager::adult().unwrap();
        let data = dataset(
            &manager,
            &[
                ("25", "HS-grad", "Never-married", "White", 2),
                ("40", "Masters", "Divorced", "Black", 2),
                ("25", "HS-grad", "Never-married", "White", 2),
            ],
        );
        let state = GeneralizationState::new(data.attributes().to_vec());
        let partition = EquivalenceClassIndex::new(&manager).rebuild(&data, &state).unwrap();

        assert_eq!(partition.class_count(), 2);
        assert_eq!(partition.classes[0].members, vec![RecordId(0), RecordId(2)]);
        assert_eq!(partition.violations.classes, vec![1]);
        assert_eq!(partition.violations.records, vec![RecordId(1)]);
    }

    #[test]
    fn test_class_requirement_is_max_member_k() {
        let manager = HierarchyManager::adult().unwrap();
        let data = dataset(
            &manager,
            &[
                ("25", "HS-grad", "Never-married", "White", 2),
                ("25", "HS-grad", "Never-married", "White", 3),
            ],
        );
        let state = GeneralizationState::new(data.attributes().to_vec());
        let partition = EquivalenceClassIndex::new(&manager).rebuild(&data, &state).unwrap();
        assert_eq!(partition.classes[0].required_k, 3);
        assert!(!partition.is_compliant());
        assert_eq!(partition.violations.record_count(), 2);
    }

    #[test]
    fn test_generalization_merges_classes() {
        let manager = HierarchyManager::adult().unwrap();
        let data = dataset(
            &manager,
            &[
                ("25", "HS-grad", "Never-married", "White", 2),
                ("26", "HS-grad", "Never-married", "White", 2),
            ],
        );
        let mut state = GeneralizationState::new(data.attributes().to_vec());
        let index = EquivalenceClassIndex::new(&manager);
        assert_eq!(index.rebuild(&data, &state).unwrap().class_count(), 2);

        state.advance(0, 1, 4).unwrap();
        let partition = index.rebuild(&data, &state).unwrap();
        assert_eq!(partition.class_count(), 1);
        assert!(partition.is_compliant());
        assert_eq!(partition.classes[0].key[0], "[22-27)");
    }

    #[test]
    fn test_suppressed_records_are_excluded() {
        let manager = HierarchyManager::adult().unwrap();
        let mut data = dataset(
            &manager,
            &[
                ("25", "HS-grad", "Never-married", "White", 1),
                ("40", "Masters", "Divorced", "Black", 2),
            ],
        );
        data.suppress(RecordId(1));
        let state = GeneralizationState::new(data.attributes().to_vec());
        let partition = EquivalenceClassIndex::new(&manager).rebuild(&data, &state).unwrap();

        assert_eq!(partition.suppressed, vec![RecordId(1)]);
        assert_eq!(partition.covered_records(), 1);
        assert!(partition.is_compliant());
    }

    #[test]
    fn test_parallel_threshold_gives_same_partition() {
        let manager = HierarchyManager::adult().unwrap();
        let rows: Vec<(&str, &str, &str, &str, usize)> = (0..40)
            .map(|i| {
                let age = ["25", "33", "47", "61"][i % 4];
                let race = ["White", "Black"][i % 2];
                (age, "HS-grad", "Never-married", race, 2)
            })
            .collect();
        let data = dataset(&manager, &rows);
        let state = GeneralizationState::new(data.attributes().to_vec());

        let sequential = EquivalenceClassIndex::new(&manager).rebuild(&data, &state).unwrap();
        let parallel = EquivalenceClassIndex::new(&manager)
            .with_parallel_threshold(1)
            .rebuild(&data, &state)
            .unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_rejects_mismatched_state() {
        let manager = HierarchyManager::adult().unwrap();
        let data = dataset(&manager, &[("25", "HS-grad", "Never-married", "White", 1)]);
        let state = GeneralizationState::new(vec!["age".to_string()]);
        assert!(EquivalenceClassIndex::new(&manager).rebuild(&data, &state).is_err());
    }
}
