//! Execution plan types

use serde::Serialize;

use crate::TradingPair;

/// Direction of one leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

/// Nominal size of a leg
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LegAmount {
    /// Known before execution starts
    Fixed { amount: f64 },
    /// Set by what the previous leg actually fills. `estimate` is the
    /// analytic expectation from the quoted rate and fee; the executed size
    /// must be taken from the realized output of that leg.
    FromPreviousLeg { estimate: f64 },
}

impl LegAmount {
    /// Fixed amount, or the analytic estimate for derived legs
    pub fn nominal(&self) -> f64 {
        match self {
            LegAmount::Fixed { amount } => *amount,
            LegAmount::FromPreviousLeg { estimate } => *estimate,
        }
    }

    pub fn is_derived(&self) -> bool {
        matches!(self, LegAmount::FromPreviousLeg { .. })
    }
}

/// One trade in a triangular cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeLeg {
    /// 1-based position inside the cycle
    pub step: u8,
    pub action: TradeAction,
    pub pair: TradingPair,
    pub amount: LegAmount,
    pub expected_rate: f64,
    pub fee: f64,
}

/// The three legs for one funded opportunity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedCycle {
    pub opportunity_index: usize,
    pub cycle: String,
    pub investment_amount: f64,
    pub expected_profit: f64,
    pub legs: [TradeLeg; 3],
}

/// Ordered trades derived from an allocation result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionPlan {
    pub cycles: Vec<PlannedCycle>,
}

impl ExecutionPlan {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Number of funded cycles
    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    /// All legs in execution order
    pub fn legs(&self) -> impl Iterator<Item = &TradeLeg> {
        self.cycles.iter().flat_map(|c| c.legs.iter())
    }
}
