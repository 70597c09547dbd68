//! # Synapsed Anonymity
//!
//! Variable k-anonymity for tabular records through generalization hierarchies.
//!
//! Every record carries its own privacy threshold `k`. The engine coarsens
//! quasi-identifying attributes column by column until each record sits in an
//! equivalence class at least as large as the most demanding member of that
//! class, and suppresses the records it cannot protect.
//!
//! ## Features
//!
//! - **Generalization Hierarchies**: Table-driven ladders per attribute with
//!   information-loss weights, including interval ladders for numeric values
//! - **Equivalence-Class Index**: Full rebuild per state, optional parallel key
//!   computation with the `parallel` feature
//! - **Two Strategies**: Greedy (cheapest next step) and Balanced (benefit over
//!   cost with a penalty for attributes that outrun their peers)
//! - **Per-Record Suppression**: A cascade that only removes records that cannot
//!   reach their own k
//! - **Metrics**: Per-attribute and overall distortion and precision
//!
//! ## Example
//!
//! ```rust,no_run
//! use synapsed_anonymity::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let anonymizer = create_adult_anonymizer(AnonymizerConfig::balanced())?;
//!
//!     let mut builder = anonymizer.dataset_builder();
//!     builder.push(
//!         [("age", "39"), ("education", "Bachelors"), ("marital-status", "Never-married"), ("race", "White")],
//!         2,
//!     )?;
//!     builder.push(
//!         [("age", "41"), ("education", "Masters"), ("marital-status", "Divorced"), ("race", "White")],
//!         2,
//!     )?;
//!     let mut dataset = builder.build();
//!
//!     let report = anonymizer.anonymize(&mut dataset)?;
//!     println!("{}", report.metrics);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ### HierarchyManager
//!
//! One immutable [`Hierarchy`] per quasi-identifier. Level 0 holds the original
//! values and a suppression level mapping everything to `*` is always appended.
//!
//! ### EquivalenceClassIndex
//!
//! Groups unsuppressed records by their generalized tuple under a
//! [`GeneralizationState`] and reports the classes that fall short of their k.
//!
//! ### Optimizer
//!
//! Owns the single generalization state of a run. It repeatedly rebuilds the
//! index and asks a [`GeneralizationStrategy`] for the next one-level move,
//! until the partition is compliant, no attribute can move, or the iteration
//! cap is hit. Records still violating are then suppressed.
//!
//! ### MetricsCalculator
//!
//! Reads the terminal state: `distortion = loss(n)` and
//! `precision = 1 - n / (L + 1)` per attribute, unweighted means overall.
//!
//! ## Error Handling
//!
//! - **UnknownValue**: a raw value outside the attribute's hierarchy
//! - **InvalidLevel**: a step that does not move a level upwards
//! - **InvalidHierarchy / InvalidRecord / Configuration**: construction-time checks
//!
//! Running out of attributes or iterations is not an error; it ends the run
//! as exhausted and the suppression phase takes over.
//!
//! ## Testing
//!
//! ```bash
//! # Run all anonymity tests
//! cargo test --package synapsed-anonymity
//!
//! # Without rayon
//! cargo test --package synapsed-anonymity --no-default-features
//!
//! # Run benchmarks
//! cargo bench --package synapsed-anonymity
//! ```

pub mod error;
pub mod types;
pub mod traits;

pub mod config;
pub mod dataset;
pub mod hierarchy;
pub mod index;

// Optimization and reporting
pub mod engine;
pub mod metrics;
pub mod optimizer;

// Re-exports for convenience
pub use error::{AnonymityError, Result};
pub use types::{EquivalenceClass, GeneralizationState, Level, PartitionResult, RecordId, Violations};
pub use traits::{Candidate, GeneralizationStrategy, SelectionContext};
pub use engine::{AnonymizationReport, Anonymizer};

pub use config::{AnonymizerConfig, StrategyKind};
pub use dataset::{Dataset, DatasetBuilder, GeneralizedRecord, Record};
pub use hierarchy::{Hierarchy, HierarchyManager, HierarchySpec, IntervalLevel};
pub use index::EquivalenceClassIndex;
pub use metrics::{AnonymizationMetrics, AttributeMetrics, MetricsCalculator};
pub use optimizer::{BalancedStrategy, GreedyStrategy, Optimizer, OptimizerOutcome, Termination};

pub mod prelude {
    //! Common imports for anonymization runs

    pub use crate::{
        create_adult_anonymizer,
        create_anonymizer,
        AnonymityError,
        AnonymizationReport,
        Anonymizer,
        AnonymizerConfig,
        Dataset,
        HierarchyManager,
        Result,
        StrategyKind,
    };

    pub use crate::hierarchy::{Hierarchy, HierarchySpec, IntervalLevel};
    pub use crate::metrics::{AnonymizationMetrics, MetricsCalculator};
    pub use crate::optimizer::{ExhaustionReason, Optimizer, OptimizerOutcome, OptimizerPhase, Termination};
    pub use crate::traits::GeneralizationStrategy;
    pub use crate::types::{GeneralizationState, RecordId};
}

/// Convenience function to create an anonymizer over custom hierarchies
///
/// # Example
///
/// ```rust,no_run
/// use synapsed_anonymity::{create_anonymizer, AnonymizerConfig, HierarchyManager, HierarchySpec};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let colors = HierarchySpec::new("color", vec!["red".into(), "navy".into()])
///         .level("family", 0.5, [("red", "warm"), ("navy", "cool")]);
///     let manager = HierarchyManager::from_specs(vec![colors])?;
///     let anonymizer = create_anonymizer(manager, AnonymizerConfig::default())?;
///     assert_eq!(anonymizer.manager().len(), 1);
///     Ok(())
/// }
/// ```
pub fn create_anonymizer(manager: HierarchyManager, config: AnonymizerConfig) -> Result<Anonymizer> {
    Anonymizer::new(manager, config)
}

/// Convenience function to create an anonymizer over the Adult census hierarchies
pub fn create_adult_anonymizer(config: AnonymizerConfig) -> Result<Anonymizer> {
    Anonymizer::adult(config)
}
