//! Property tests over the Adult hierarchies

mod common;

use common::*;
use proptest::prelude::*;
use std::collections::HashSet;
use synapsed_anonymity::prelude::*;
use synapsed_anonymity::EquivalenceClassIndex;

type IndexedRow = (i64, usize, usize, usize, usize);

fn rows(max_k: usize) -> impl Strategy<Value = Vec<IndexedRow>> {
    prop::collection::vec((17i64..=90, 0usize..16, 0usize..7, 0usize..5, 1usize..=max_k), 1..30)
}

fn strategy_kind() -> impl Strategy<Value = StrategyKind> {
    prop_oneof![Just(StrategyKind::Greedy), Just(StrategyKind::Balanced)]
}

mod property_tests {
    use super::*;

    proptest! {
        #[test]
        fn prop_loss_is_monotone(attribute in 0usize..4) {
            let manager = HierarchyManager::adult().unwrap();
            let hierarchy = &manager.hierarchies()[attribute];
            prop_assert_eq!(hierarchy.loss(0).unwrap(), 0.0);
            prop_assert_eq!(hierarchy.loss(hierarchy.suppression_level()).unwrap(), 1.0);
            for level in 0..hierarchy.suppression_level() {
                prop_assert!(hierarchy.loss(level + 1).unwrap() > hierarchy.loss(level).unwrap());
            }
        }

        #[test]
        fn prop_generalize_is_idempotent(age in 17i64..=90, education in 0usize..16, level in 0usize..=4) {
            let manager = HierarchyManager::adult().unwrap();
            let age = age.to_string();

            let once = manager.generalize("age", &age, level).unwrap();
            prop_assert_eq!(manager.generalize("age", once, level).unwrap(), once);

            let once = manager.generalize("education", EDUCATION[education], level).unwrap();
            prop_assert_eq!(manager.generalize("education", once, level).unwrap(), once);
        }

        #[test]
        fn prop_generalization_refines(age in 17i64..=90, level in 0usize..4) {
            let manager = HierarchyManager::adult().unwrap();
            let age = age.to_string();
            let lower = manager.generalize("age", &age, level).unwrap();
            let direct = manager.generalize("age", &age, level + 1).unwrap();
            prop_assert_eq!(manager.generalize("age", lower, level + 1).unwrap(), direct);
        }

        #[test]
        fn prop_partition_covers_every_active_record(
            data in rows(4),
            levels in (0usize..=4, 0usize..=4, 0usize..=3, 0usize..=2),
        ) {
            let manager = HierarchyManager::adult().unwrap();
            let dataset = indexed_dataset(&manager, &data);
            let mut state = GeneralizationState::new(dataset.attributes().to_vec());
            for (i, level) in [levels.0, levels.1, levels.2, levels.3].into_iter().enumerate() {
                if level > 0 {
                    state.advance(i, level, manager.hierarchies()[i].suppression_level()).unwrap();
                }
            }

            let partition = EquivalenceClassIndex::new(&manager).rebuild(&dataset, &state).unwrap();

            let mut seen = HashSet::new();
            for class in &partition.classes {
                prop_assert!(!class.members.is_empty());
                for id in &class.members {
                    prop_assert!(seen.insert(*id), "record in two classes");
                }
            }
            prop_assert_eq!(seen.len(), dataset.len());
            prop_assert!(partition.suppressed.is_empty());

            // a one-step run on a copy may suppress records
            let mut suppressed_copy = dataset.clone();
            let outcome = Optimizer::new(&manager, Box::new(synapsed_anonymity::GreedyStrategy), 1)
                .run(&mut suppressed_copy)
                .unwrap();
            let partition = EquivalenceClassIndex::new(&manager)
                .rebuild(&suppressed_copy, &outcome.state)
                .unwrap();
            let covered: HashSet<RecordId> = partition.classes.iter().flat_map(|c| c.members.iter().copied()).collect();
            let active: HashSet<RecordId> = suppressed_copy
                .records()
                .iter()
                .filter(|r| !r.is_suppressed())
                .map(|r| r.id())
                .collect();
            prop_assert_eq!(covered, active);
            prop_assert_eq!(partition.suppressed.len(), suppressed_copy.suppressed_count());
        }

        #[test]
        fn prop_runs_end_compliant(data in rows(5), kind in strategy_kind(), cap in 1usize..16) {
            let manager = HierarchyManager::adult().unwrap();
            let mut dataset = indexed_dataset(&manager, &data);
            let config = AnonymizerConfig::new(kind).with_max_iterations(cap);
            let outcome = Optimizer::from_config(&manager, &config).run(&mut dataset).unwrap();

            prop_assert!(outcome.iterations <= cap);
            prop_assert!(outcome.final_partition.is_compliant());
            for class in &outcome.final_partition.classes {
                for id in &class.members {
                    let record = dataset.record(*id).unwrap();
                    prop_assert!(!record.is_suppressed());
                    prop_assert!(class.size() >= record.required_k());
                }
            }

            let mut levels = vec![0usize; 4];
            for record in &outcome.history {
                let i = dataset.attributes().iter().position(|a| *a == record.step.attribute).unwrap();
                prop_assert_eq!(record.step.from, levels[i]);
                prop_assert_eq!(record.step.to, levels[i] + 1);
                levels[i] = record.step.to;
            }
            prop_assert_eq!(levels.as_slice(), outcome.state.levels());

            let flagged: Vec<RecordId> = dataset.suppressed_records();
            prop_assert_eq!(flagged, outcome.suppressed.clone());
        }

        #[test]
        fn prop_feasible_k_needs_no_suppression(data in rows(30), kind in strategy_kind()) {
            let manager = HierarchyManager::adult().unwrap();
            let mut dataset = indexed_dataset(&manager, &data);
            let n = dataset.len();
            let capped: Vec<(usize, usize)> = dataset
                .records()
                .iter()
                .map(|r| (r.required_k().min(n), 1))
                .collect();
            dataset.assign_k_distribution(&capped).unwrap();

            let config = AnonymizerConfig::new(kind).with_max_iterations(13);
            let outcome = Optimizer::from_config(&manager, &config).run(&mut dataset).unwrap();

            prop_assert!(outcome.is_converged());
            prop_assert!(outcome.suppressed.is_empty());
            prop_assert_eq!(dataset.suppressed_count(), 0);
        }
    }
}
