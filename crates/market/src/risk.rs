//! Execution costs and execution risk under current conditions

use serde::Serialize;
use tracing::debug;

use triarb_core::{ExecutionPlan, RiskAssessment, RiskAssessor, RiskLevel};

use crate::MarketConditions;

const BASE_FEE_RATE: f64 = 0.001;
const BASE_SPREAD_RATE: f64 = 0.0005;
const BASE_SLIPPAGE_RATE: f64 = 0.0002;

/// Cost breakdown for trading one amount
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ExecutionCosts {
    pub transaction_fee: f64,
    pub spread_cost: f64,
    pub slippage_cost: f64,
    pub total_cost: f64,
    /// `total_cost / amount`, zero for a zero amount
    pub effective_fee_rate: f64,
}

impl MarketConditions {
    pub fn execution_costs(&self, amount: f64) -> ExecutionCosts {
        let transaction_fee = amount * BASE_FEE_RATE * (1.0 + 2.0 * self.network_congestion);
        let spread_cost = amount * BASE_SPREAD_RATE * self.spread_factor;
        let slippage_cost = amount * BASE_SLIPPAGE_RATE * (1.0 + 0.5 * self.volatility_index);
        let total_cost = transaction_fee + spread_cost + slippage_cost;

        ExecutionCosts {
            transaction_fee,
            spread_cost,
            slippage_cost,
            total_cost,
            effective_fee_rate: if amount == 0.0 { 0.0 } else { total_cost / amount },
        }
    }

    /// Risk that one planned cycle does not execute as planned
    pub fn cycle_risk(&self) -> f64 {
        let market_risk = 0.3 * self.volatility_index;
        let liquidity_risk = 0.2 * (2.0 - self.liquidity_factor);
        let execution_risk = 0.1 * self.network_congestion;
        market_risk + liquidity_risk + execution_risk
    }
}

/// Scores a plan against fixed market conditions
#[derive(Debug, Clone)]
pub struct MarketRiskAssessor {
    conditions: MarketConditions,
}

impl MarketRiskAssessor {
    pub fn new(conditions: MarketConditions) -> Self {
        Self { conditions }
    }
}

impl RiskAssessor for MarketRiskAssessor {
    fn assess(&self, plan: &ExecutionPlan) -> RiskAssessment {
        let cycle_risk = self.conditions.cycle_risk();
        let cycles = plan.len();

        let total_risk_score = cycle_risk * cycles as f64;
        let execution_probability = (0..cycles).fold(1.0, |p, _| p * (1.0 - cycle_risk).max(0.0));
        let average_trade_risk = if cycles == 0 { 0.0 } else { total_risk_score / cycles as f64 };

        debug!(
            "Assessed {} cycles: risk {:.3}, success probability {:.3}",
            cycles, total_risk_score, execution_probability
        );

        RiskAssessment {
            total_risk_score,
            execution_probability,
            average_trade_risk,
            risk_level: RiskLevel::from_score(total_risk_score),
        }
    }
}
