//! Turns raw solver output into an allocation result

use tracing::{debug, warn};
use triarb_core::{Allocation, AllocationResult, AllocationStatus, Opportunity};

use crate::solver::{SolverOutcome, SolverStatus};

/// Drops sub-threshold solver noise and prices what remains
#[derive(Debug, Clone, Copy)]
pub struct SolutionExtractor {
    materiality_threshold: f64,
}

impl SolutionExtractor {
    pub fn new(materiality_threshold: f64) -> Self {
        Self { materiality_threshold }
    }

    pub fn extract(
        &self,
        opportunities: &[Opportunity],
        outcome: &SolverOutcome,
    ) -> AllocationResult {
        if outcome.status != SolverStatus::Optimal {
            warn!("Optimization ended without a plan: {:?}", outcome.status);
            return AllocationResult::without_investments(AllocationStatus::from(outcome.status));
        }

        let allocations: Vec<Allocation> = opportunities
            .iter()
            .zip(&outcome.values)
            .enumerate()
            .filter_map(|(i, (opp, &amount))| {
                if amount > self.materiality_threshold {
                    Some(Allocation::new(i, amount, opp.clone()))
                } else {
                    if amount > 0.0 {
                        debug!(
                            "Dropping immaterial allocation {:.6} for opportunity #{}",
                            amount, i
                        );
                    }
                    None
                }
            })
            .collect();

        AllocationResult::optimal(allocations, outcome.objective_value)
    }
}

impl Default for SolutionExtractor {
    fn default() -> Self {
        Self::new(0.001)
    }
}
