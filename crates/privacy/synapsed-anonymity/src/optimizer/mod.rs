//! The generalization loop
//!
//! ```text
//! RUNNING -> (CONVERGED | EXHAUSTED) -> SUPPRESSING -> DONE
//! ```
//!
//! Each round rebuilds the index, stops when nothing violates, and otherwise
//! asks the strategy for one step. Whatever still violates at the end is
//! suppressed record by record.

pub mod balanced;
pub mod greedy;

pub use balanced::BalancedStrategy;
pub use greedy::GreedyStrategy;

use crate::config::{AnonymizerConfig, StrategyKind};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::index::EquivalenceClassIndex;
use crate::traits::{Candidate, GeneralizationStrategy, SelectionContext};
use crate::types::{EquivalenceClass, GeneralizationState, PartitionResult, RecordId};
use crate::hierarchy::HierarchyManager;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Loss differences closer than this count as ties
pub(crate) const COST_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerPhase {
    Running,
    Converged,
    Exhausted,
    Suppressing,
    Done,
}

impl fmt::Display for OptimizerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizerPhase::Running => write!(f, "RUNNING"),
            OptimizerPhase::Converged => write!(f, "CONVERGED"),
            OptimizerPhase::Exhausted => write!(f, "EXHAUSTED"),
            OptimizerPhase::Suppressing => write!(f, "SUPPRESSING"),
            OptimizerPhase::Done => write!(f, "DONE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExhaustionReason {
    /// Every attribute sits at its suppression level
    NoCandidate,
    /// The iteration cap was reached first
    IterationCap,
}

/// How the generalization loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    Converged,
    Exhausted(ExhaustionReason),
}

impl Termination {
    pub fn is_converged(&self) -> bool {
        matches!(self, Termination::Converged)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Converged => write!(f, "converged"),
            Termination::Exhausted(ExhaustionReason::NoCandidate) => {
                write!(f, "exhausted (no attribute left to generalize)")
            }
            Termination::Exhausted(ExhaustionReason::IterationCap) => {
                write!(f, "exhausted (iteration cap reached)")
            }
        }
    }
}

/// One applied generalization step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralizationStep {
    pub attribute: String,
    pub from: usize,
    pub to: usize,
    pub benefit: f64,
    pub cost: f64,
    pub penalty: f64,
    pub score: f64,
}

impl From<Candidate> for GeneralizationStep {
    fn from(candidate: Candidate) -> Self {
        Self {
            attribute: candidate.attribute,
            from: candidate.from,
            to: candidate.to,
            benefit: candidate.benefit,
            cost: candidate.cost,
            penalty: candidate.penalty,
            score: candidate.score,
        }
    }
}

/// Partition figures seen before a step, and the step taken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based
    pub iteration: usize,
    pub classes: usize,
    pub violating_classes: usize,
    pub violating_records: usize,
    pub step: GeneralizationStep,
}

/// Result of a full optimizer run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerOutcome {
    pub strategy: String,
    pub state: GeneralizationState,
    pub termination: Termination,
    /// Generalization steps applied
    pub iterations: usize,
    pub history: Vec<IterationRecord>,
    pub phases: Vec<OptimizerPhase>,
    /// Records suppressed during this run
    pub suppressed: Vec<RecordId>,
    /// Partition after suppression
    pub final_partition: PartitionResult,
}

impl OptimizerOutcome {
    pub fn is_converged(&self) -> bool {
        self.termination.is_converged()
    }
}

/// Drives a strategy over a dataset until compliance or exhaustion
pub struct Optimizer<'a> {
    index: EquivalenceClassIndex<'a>,
    strategy: Box<dyn GeneralizationStrategy>,
    max_iterations: usize,
}

impl fmt::Debug for Optimizer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Optimizer")
            .field("strategy", &self.strategy.name())
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

/// Strategy instance for a configuration
pub fn strategy_for(config: &AnonymizerConfig) -> Box<dyn GeneralizationStrategy> {
    match config.strategy {
        StrategyKind::Greedy => Box::new(GreedyStrategy::new()),
        StrategyKind::Balanced => Box::new(BalancedStrategy::new(
            config.balance_weight,
            config.suppression_penalty,
        )),
    }
}

impl<'a> Optimizer<'a> {
    pub fn new(
        manager: &'a HierarchyManager,
        strategy: Box<dyn GeneralizationStrategy>,
        max_iterations: usize,
    ) -> Self {
        Self {
            index: EquivalenceClassIndex::new(manager),
            strategy,
            max_iterations,
        }
    }

    pub fn from_config(manager: &'a HierarchyManager, config: &AnonymizerConfig) -> Self {
        Self {
            index: EquivalenceClassIndex::new(manager).with_parallel_threshold(config.parallel_threshold),
            strategy: strategy_for(config),
            max_iterations: config.max_iterations,
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Run the loop and the suppression phase, marking suppressed records in `dataset`.
    pub fn run(&self, dataset: &mut Dataset) -> Result<OptimizerOutcome> {
        let manager = self.index.manager();
        let mut state = GeneralizationState::new(dataset.attributes().to_vec());
        let mut phases = vec![OptimizerPhase::Running];
        let mut history = Vec::new();
        let mut iterations = 0;

        info!(
            "Starting {} optimization over {} records (cap {} iterations)",
            self.strategy.name(),
            dataset.len(),
            self.max_iterations
        );

        let (termination, partition) = loop {
            let partition = self.index.rebuild(dataset, &state)?;
            if partition.is_compliant() {
                break (Termination::Converged, partition);
            }
            if iterations >= self.max_iterations {
                warn!(
                    "Iteration cap of {} reached with {} violating records",
                    self.max_iterations,
                    partition.violations.record_count()
                );
                break (Termination::Exhausted(ExhaustionReason::IterationCap), partition);
            }

            let context = SelectionContext {
                index: &self.index,
                dataset: &*dataset,
                state: &state,
                partition: &partition,
            };
            let Some(candidate) = self.strategy.select(&context)? else {
                warn!("No attribute left to generalize at {}", state);
                break (Termination::Exhausted(ExhaustionReason::NoCandidate), partition);
            };

            let ceiling = manager.suppression_level(&candidate.attribute)?;
            state.advance(candidate.attribute_index, candidate.to, ceiling)?;
            iterations += 1;

            debug!(
                "Iteration {}: {} {} -> {} with {} classes, {} violating records",
                iterations,
                candidate.attribute,
                candidate.from,
                candidate.to,
                partition.class_count(),
                partition.violations.record_count()
            );
            history.push(IterationRecord {
                iteration: iterations,
                classes: partition.class_count(),
                violating_classes: partition.violations.class_count(),
                violating_records: partition.violations.record_count(),
                step: candidate.into(),
            });
        };

        let terminal_phase = if termination.is_converged() {
            OptimizerPhase::Converged
        } else {
            OptimizerPhase::Exhausted
        };
        info!("Optimizer {} after {} iterations at {}", terminal_phase, iterations, state);
        phases.push(terminal_phase);

        phases.push(OptimizerPhase::Suppressing);
        let suppressed = suppress_violators(dataset, &partition);
        if !suppressed.is_empty() {
            warn!("Suppressed {} records that could not reach their k", suppressed.len());
        }
        let final_partition = if suppressed.is_empty() {
            partition
        } else {
            self.index.rebuild(dataset, &state)?
        };

        phases.push(OptimizerPhase::Done);
        info!(
            "Optimizer done: {} classes, {} suppressed records",
            final_partition.class_count(),
            suppressed.len()
        );

        Ok(OptimizerOutcome {
            strategy: self.strategy.name().to_string(),
            state,
            termination,
            iterations,
            history,
            phases,
            suppressed,
            final_partition,
        })
    }
}

/// Suppress, class by class, the members whose k exceeds what the class can offer.
///
/// Removing members shrinks the class, which may push further members over
/// their threshold, so this repeats until the remaining members are compliant
/// or none remain.
fn suppress_violators(dataset: &mut Dataset, partition: &PartitionResult) -> Vec<RecordId> {
    let mut suppressed = Vec::new();
    for class in partition.violating_classes() {
        suppressed.extend(cascade(dataset, class));
    }
    suppressed.sort_unstable();
    for &id in &suppressed {
        dataset.suppress(id);
    }
    suppressed
}

fn cascade(dataset: &Dataset, class: &EquivalenceClass) -> Vec<RecordId> {
    let mut remaining: Vec<(RecordId, usize)> = class
        .members
        .iter()
        .filter_map(|&id| dataset.record(id).map(|r| (id, r.required_k())))
        .collect();
    let mut removed = Vec::new();

    loop {
        let size = remaining.len();
        let (over, kept): (Vec<_>, Vec<_>) = remaining.into_iter().partition(|&(_, k)| k > size);
        if over.is_empty() {
            break;
        }
        removed.extend(over.into_iter().map(|(id, _)| id));
        remaining = kept;
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnonymityError;
    use crate::hierarchy::HierarchyManager;

    fn push(builder: &mut crate::dataset::DatasetBuilder<'_>, row: (&str, &str, &str, &str), k: usize) {
        builder
            .push(
                [
                    ("age", row.0),
                    ("education", row.1),
                    ("marital-status", row.2),
                    ("race", row.3),
                ],
                k,
            )
            .unwrap();
    }

    /// Four identical records plus two singletons sharing nothing
    fn scenario(manager: &HierarchyManager) -> Dataset {
        let mut builder = Dataset::builder(manager);
        for _ in 0..4 {
            push(&mut builder, ("25", "HS-grad", "Never-married", "White"), 2);
        }
        push(&mut builder, ("47", "Doctorate", "Married-civ-spouse", "Asian-Pac-Islander"), 2);
        push(&mut builder, ("70", "Preschool", "Divorced", "Black"), 2);
        builder.build()
    }

    #[test]
    fn test_already_compliant_dataset_needs_no_steps() {
        let manager = HierarchyManager::adult().unwrap();
        let mut builder = Dataset::builder(&manager);
        for _ in 0..3 {
            push(&mut builder, ("25", "HS-grad", "Never-married", "White"), 3);
        }
        let mut dataset = builder.build();
        let optimizer = Optimizer::new(&manager, Box::new(GreedyStrategy), 10);
        let outcome = optimizer.run(&mut dataset).unwrap();

        assert_eq!(outcome.termination, Termination::Converged);
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.state.total_height(), 0);
        assert!(outcome.suppressed.is_empty());
        assert_eq!(
            outcome.phases,
            vec![
                OptimizerPhase::Running,
                OptimizerPhase::Converged,
                OptimizerPhase::Suppressing,
                OptimizerPhase::Done
            ]
        );
    }

    #[test]
    fn test_iteration_cap_forces_suppression() {
        let manager = HierarchyManager::adult().unwrap();
        let mut dataset = scenario(&manager);
        let optimizer = Optimizer::new(&manager, Box::new(GreedyStrategy), 10);
        let outcome = optimizer.run(&mut dataset).unwrap();

        assert_eq!(outcome.termination, Termination::Exhausted(ExhaustionReason::IterationCap));
        assert_eq!(outcome.iterations, 10);
        assert_eq!(outcome.state.levels(), &[4, 4, 2, 0]);
        assert_eq!(outcome.suppressed, vec![RecordId(4), RecordId(5)]);
        assert!(dataset.records()[..4].iter().all(|r| !r.is_suppressed()));
        assert!(outcome.final_partition.is_compliant());
        assert_eq!(outcome.final_partition.covered_records(), 4);
        assert_eq!(outcome.phases[1], OptimizerPhase::Exhausted);
    }

    #[test]
    fn test_generous_cap_merges_singletons() {
        let manager = HierarchyManager::adult().unwrap();
        let mut dataset = scenario(&manager);
        let optimizer = Optimizer::new(&manager, Box::new(GreedyStrategy), 20);
        let outcome = optimizer.run(&mut dataset).unwrap();

        assert!(outcome.is_converged());
        assert_eq!(outcome.iterations, 12);
        assert_eq!(outcome.state.levels(), &[4, 4, 3, 1]);
        assert!(outcome.suppressed.is_empty());
        assert_eq!(outcome.history.len(), 12);
        assert_eq!(outcome.history[0].step.attribute, "education");
        assert_eq!(outcome.history[0].violating_records, 2);
    }

    #[test]
    fn test_no_candidate_when_ladders_run_out() {
        let manager = HierarchyManager::adult().unwrap();
        let mut builder = Dataset::builder(&manager);
        push(&mut builder, ("25", "HS-grad", "Never-married", "White"), 5);
        push(&mut builder, ("40", "Masters", "Divorced", "Black"), 5);
        let mut dataset = builder.build();
        let optimizer = Optimizer::new(&manager, Box::new(GreedyStrategy), 100);
        let outcome = optimizer.run(&mut dataset).unwrap();

        assert_eq!(outcome.termination, Termination::Exhausted(ExhaustionReason::NoCandidate));
        assert_eq!(outcome.iterations, 13);
        assert_eq!(outcome.suppressed.len(), 2);
        assert_eq!(dataset.suppressed_count(), 2);
        assert_eq!(outcome.final_partition.class_count(), 0);
    }

    #[test]
    fn test_cascade_spares_members_within_reach() {
        let manager = HierarchyManager::adult().unwrap();
        let mut builder = Dataset::builder(&manager);
        push(&mut builder, ("25", "HS-grad", "Never-married", "White"), 2);
        push(&mut builder, ("25", "HS-grad", "Never-married", "White"), 2);
        push(&mut builder, ("25", "HS-grad", "Never-married", "White"), 5);
        let dataset = builder.build();
        let class = EquivalenceClass {
            key: Vec::new(),
            members: vec![RecordId(0), RecordId(1), RecordId(2)],
            required_k: 5,
        };
        assert_eq!(cascade(&dataset, &class), vec![RecordId(2)]);
    }

    #[test]
    fn test_cascade_can_empty_a_class() {
        let manager = HierarchyManager::adult().unwrap();
        let mut builder = Dataset::builder(&manager);
        push(&mut builder, ("25", "HS-grad", "Never-married", "White"), 2);
        push(&mut builder, ("25", "HS-grad", "Never-married", "White"), 3);
        push(&mut builder, ("25", "HS-grad", "Never-married", "White"), 4);
        let dataset = builder.build();
        let class = EquivalenceClass {
            key: Vec::new(),
            members: vec![RecordId(0), RecordId(1), RecordId(2)],
            required_k: 4,
        };
        // 4 > 3 goes first, then 3 > 2, then 2 > 1
        assert_eq!(cascade(&dataset, &class), vec![RecordId(2), RecordId(1), RecordId(0)]);
    }

    #[test]
    fn test_levels_only_increase_across_history() {
        let manager = HierarchyManager::adult().unwrap();
        let mut dataset = scenario(&manager);
        let config = AnonymizerConfig::balanced().with_max_iterations(20);
        let outcome = Optimizer::from_config(&manager, &config).run(&mut dataset).unwrap();
        for record in &outcome.history {
            assert_eq!(record.step.to, record.step.from + 1);
        }
        assert!(outcome.is_converged());
    }

    /// Proposes the first open attribute at its current level
    struct StandStill;

    impl GeneralizationStrategy for StandStill {
        fn name(&self) -> &'static str {
            "stand-still"
        }

        fn select(&self, context: &SelectionContext<'_>) -> Result<Option<Candidate>> {
            let Some((i, hierarchy, level)) = context.open_attributes()?.into_iter().next() else {
                return Ok(None);
            };
            let mut candidate = Candidate::by_cost(i, hierarchy, level)?;
            candidate.to = level;
            Ok(Some(candidate))
        }
    }

    #[test]
    fn test_rejects_a_step_that_does_not_raise_the_level() {
        let manager = HierarchyManager::adult().unwrap();
        let mut dataset = scenario(&manager);
        let err = Optimizer::new(&manager, Box::new(StandStill), 10)
            .run(&mut dataset)
            .unwrap_err();

        assert!(matches!(
            err,
            AnonymityError::InvalidLevel { ref attribute, current: 0, proposed: 0 } if attribute == "age"
        ));
        assert!(err.is_internal_fault());
        assert_eq!(dataset.suppressed_count(), 0);
    }
}
