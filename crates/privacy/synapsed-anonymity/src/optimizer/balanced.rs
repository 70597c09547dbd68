//! Benefit over cost strategy with a level-balance penalty

use super::greedy::{cheapest, cheapest_matching};
use super::COST_EPSILON;
use crate::error::Result;
use crate::traits::{Candidate, GeneralizationStrategy, SelectionContext};
use tracing::debug;

/// Scores every one-level move as `benefit / (cost + penalty)`.
///
/// - benefit: violating records that stop violating under the move, found by
///   rebuilding the index for the hypothetical state
/// - cost: incremental loss of the move
/// - penalty: `balance_weight` times how far the attribute's height ratio
///   (`level / suppression_level`) sits above the mean ratio, plus
///   `suppression_penalty` when the move lands on the suppression level
///
/// When no move resolves anything, the cheapest move that stays below the
/// suppression level is taken instead. A move onto the suppression level is
/// only taken this way once every open attribute sits one step below it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalancedStrategy {
    balance_weight: f64,
    suppression_penalty: f64,
}

impl Default for BalancedStrategy {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl BalancedStrategy {
    pub fn new(balance_weight: f64, suppression_penalty: f64) -> Self {
        Self {
            balance_weight,
            suppression_penalty,
        }
    }

    pub fn balance_weight(&self) -> f64 {
        self.balance_weight
    }

    pub fn suppression_penalty(&self) -> f64 {
        self.suppression_penalty
    }

    fn height_ratios(context: &SelectionContext<'_>) -> Result<Vec<f64>> {
        let manager = context.manager();
        context
            .state
            .attributes()
            .iter()
            .enumerate()
            .map(|(i, attribute)| {
                let ceiling = manager.suppression_level(attribute)?;
                Ok(context.state.level_at(i) as f64 / ceiling as f64)
            })
            .collect()
    }
}

impl GeneralizationStrategy for BalancedStrategy {
    fn name(&self) -> &'static str {
        "balanced"
    }

    fn select(&self, context: &SelectionContext<'_>) -> Result<Option<Candidate>> {
        let ratios = Self::height_ratios(context)?;
        let mean_ratio = if ratios.is_empty() {
            0.0
        } else {
            ratios.iter().sum::<f64>() / ratios.len() as f64
        };
        let violating_now = context.partition.violations.record_count();

        let mut best: Option<Candidate> = None;
        for (i, hierarchy, level) in context.open_attributes()? {
            let mut candidate = Candidate::by_cost(i, hierarchy, level)?;
            let hypothetical = context
                .state
                .with_advanced(i, candidate.to, hierarchy.suppression_level())?;
            let violating_after = context.simulate(&hypothetical)?.violations.record_count();

            candidate.benefit = violating_now.saturating_sub(violating_after) as f64;
            candidate.penalty = self.balance_weight * (ratios[i] - mean_ratio).max(0.0);
            if hierarchy.is_suppression(candidate.to) {
                candidate.penalty += self.suppression_penalty;
            }
            candidate.score = candidate.benefit / (candidate.cost + candidate.penalty);

            debug!(
                "Balanced candidate {} {} -> {}: benefit {}, cost {:.3}, penalty {:.3}, score {:.3}",
                candidate.attribute,
                candidate.from,
                candidate.to,
                candidate.benefit,
                candidate.cost,
                candidate.penalty,
                candidate.score
            );

            let better = match &best {
                None => true,
                Some(current) => candidate.score > current.score + COST_EPSILON,
            };
            if better {
                best = Some(candidate);
            }
        }

        match best {
            Some(candidate) if candidate.benefit > 0.0 => Ok(Some(candidate)),
            Some(_) => {
                debug!("No move resolves a violation, falling back to the cheapest step");
                match cheapest_matching(context, |hierarchy, c| !hierarchy.is_suppression(c.to))? {
                    Some(candidate) => Ok(Some(candidate)),
                    None => cheapest(context),
                }
            }
            None => Ok(None),
        }
    }
}
