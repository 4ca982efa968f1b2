//! Allocation results

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::Opportunity;

/// Terminal state of one optimization call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Optimal,
    Infeasible,
    Unbounded,
    NotSolved,
    /// Nothing was offered, no program was built
    NoOpportunities,
}

impl AllocationStatus {
    pub fn name(&self) -> &'static str {
        match self {
            AllocationStatus::Optimal => "optimal",
            AllocationStatus::Infeasible => "infeasible",
            AllocationStatus::Unbounded => "unbounded",
            AllocationStatus::NotSolved => "not_solved",
            AllocationStatus::NoOpportunities => "no_opportunities",
        }
    }
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Capital committed to one opportunity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub opportunity_index: usize,
    /// Invested amount in the opportunity's base currency
    pub amount: f64,
    pub opportunity: Opportunity,
    /// amount * expected_profit * confidence_score
    pub expected_profit: f64,
}

impl Allocation {
    pub fn new(opportunity_index: usize, amount: f64, opportunity: Opportunity) -> Self {
        let expected_profit = amount * opportunity.weighted_profit();
        Self {
            opportunity_index,
            amount,
            opportunity,
            expected_profit,
        }
    }
}

/// Outcome of one solve. Never mutated after construction; a new market
/// snapshot gets a new result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationResult {
    status: AllocationStatus,
    investments: BTreeMap<usize, Allocation>,
    total_invested: f64,
    total_expected_profit: f64,
    objective_value: f64,
}

impl AllocationResult {
    pub fn no_opportunities() -> Self {
        Self::without_investments(AllocationStatus::NoOpportunities)
    }

    /// Result for a solver outcome that produced no usable assignment
    pub fn without_investments(status: AllocationStatus) -> Self {
        Self {
            status,
            investments: BTreeMap::new(),
            total_invested: 0.0,
            total_expected_profit: 0.0,
            objective_value: 0.0,
        }
    }

    /// Optimal result; totals are summed in index order
    pub fn optimal(allocations: Vec<Allocation>, objective_value: f64) -> Self {
        let investments: BTreeMap<usize, Allocation> = allocations
            .into_iter()
            .map(|a| (a.opportunity_index, a))
            .collect();

        // fold from +0.0; an empty f64 `sum()` is -0.0
        let total_invested = investments.values().fold(0.0, |acc, a| acc + a.amount);
        let total_expected_profit = investments
            .values()
            .fold(0.0, |acc, a| acc + a.expected_profit);

        Self {
            status: AllocationStatus::Optimal,
            investments,
            total_invested,
            total_expected_profit,
            objective_value,
        }
    }

    pub fn status(&self) -> AllocationStatus {
        self.status
    }

    pub fn is_optimal(&self) -> bool {
        self.status == AllocationStatus::Optimal
    }

    pub fn investments(&self) -> &BTreeMap<usize, Allocation> {
        &self.investments
    }

    pub fn investment(&self, opportunity_index: usize) -> Option<&Allocation> {
        self.investments.get(&opportunity_index)
    }

    /// Invested amount for an opportunity, zero when it was not funded
    pub fn invested_in(&self, opportunity_index: usize) -> f64 {
        self.investment(opportunity_index).map_or(0.0, |a| a.amount)
    }

    pub fn total_invested(&self) -> f64 {
        self.total_invested
    }

    pub fn total_expected_profit(&self) -> f64 {
        self.total_expected_profit
    }

    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }

    /// Expected return on invested capital
    pub fn roi(&self) -> Option<f64> {
        (self.total_invested > 0.0).then(|| self.total_expected_profit / self.total_invested)
    }

    /// Same result keyed by `source[index]` instead of `index`.
    ///
    /// For callers that solved a filtered or reordered opportunity list and
    /// report against the list they started from. Indices with no entry in
    /// `source` are kept.
    pub fn reindexed(self, source: &[usize]) -> Self {
        let investments = self
            .investments
            .into_values()
            .map(|mut allocation| {
                if let Some(&original) = source.get(allocation.opportunity_index) {
                    allocation.opportunity_index = original;
                }
                (allocation.opportunity_index, allocation)
            })
            .collect();

        Self {
            status: self.status,
            investments,
            total_invested: self.total_invested,
            total_expected_profit: self.total_expected_profit,
            objective_value: self.objective_value,
        }
    }
}
