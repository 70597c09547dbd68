//! Cheapest-next-step strategy

use super::COST_EPSILON;
use crate::error::Result;
use crate::hierarchy::Hierarchy;
use crate::traits::{Candidate, GeneralizationStrategy, SelectionContext};
use tracing::debug;

/// Always advances the attribute whose next level adds the least loss.
///
/// Ties go to the attribute registered first. Once an attribute's remaining
/// steps are the cheapest on offer it keeps being picked, so one attribute
/// tends to be driven all the way to suppression before the others move.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyStrategy;

impl GreedyStrategy {
    pub fn new() -> Self {
        Self
    }
}

/// Lowest incremental loss among open attributes, first in order on ties
pub(crate) fn cheapest(context: &SelectionContext<'_>) -> Result<Option<Candidate>> {
    cheapest_matching(context, |_, _| true)
}

/// [`cheapest`] restricted to the moves accepted by `keep`
pub(crate) fn cheapest_matching<F>(context: &SelectionContext<'_>, keep: F) -> Result<Option<Candidate>>
where
    F: Fn(&Hierarchy, &Candidate) -> bool,
{
    let mut best: Option<Candidate> = None;
    for (i, hierarchy, level) in context.open_attributes()? {
        let candidate = Candidate::by_cost(i, hierarchy, level)?;
        if !keep(hierarchy, &candidate) {
            continue;
        }
        let better = match &best {
            None => true,
            Some(current) => candidate.cost < current.cost - COST_EPSILON,
        };
        if better {
            best = Some(candidate);
        }
    }
    Ok(best)
}

impl GeneralizationStrategy for GreedyStrategy {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn select(&self, context: &SelectionContext<'_>) -> Result<Option<Candidate>> {
        let choice = cheapest(context)?;
        if let Some(candidate) = &choice {
            debug!(
                "Greedy picked {} {} -> {} (cost {:.3})",
                candidate.attribute, candidate.from, candidate.to, candidate.cost
            );
        }
        Ok(choice)
    }
}
