//! Market-condition model
//!
//! Derives per-period portfolio constraints, execution costs and execution
//! risk from a handful of market multipliers.

pub mod conditions;
pub mod constraints;
pub mod risk;

pub use conditions::{ConditionsDelta, MarketConditions, Sentiment};
pub use risk::{ExecutionCosts, MarketRiskAssessor};
