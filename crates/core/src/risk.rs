//! Downstream execution risk assessment

use serde::Serialize;

use crate::ExecutionPlan;

/// Coarse risk bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(total_risk_score: f64) -> Self {
        if total_risk_score > 0.6 {
            RiskLevel::High
        } else if total_risk_score > 0.3 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Aggregate risk of executing a plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub total_risk_score: f64,
    /// Probability every planned cycle executes as planned
    pub execution_probability: f64,
    pub average_trade_risk: f64,
    pub risk_level: RiskLevel,
}

/// Estimates execution risk of a plan. The optimizer never depends on it.
pub trait RiskAssessor: Send + Sync {
    fn assess(&self, plan: &ExecutionPlan) -> RiskAssessment;
}
