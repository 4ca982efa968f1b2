//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{CoreError, CoreResult, DEFAULT_LEG_FEE};

/// Linear liquidity consumption proxy:
/// `base_factor + fee_multiplier * fee_of_pair`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityModelConfig {
    pub base_factor: f64,
    pub fee_multiplier: f64,
    /// Used when an opportunity carries no fee for the pair
    pub default_fee: f64,
}

impl Default for LiquidityModelConfig {
    fn default() -> Self {
        Self {
            base_factor: 0.1,
            fee_multiplier: 10.0,
            default_fee: DEFAULT_LEG_FEE,
        }
    }
}

/// Flow-through estimate for minimum holding constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldingModelConfig {
    /// Share of expected profit credited to non-base currencies of a cycle
    pub pass_through_share: f64,
}

impl Default for HoldingModelConfig {
    fn default() -> Self {
        Self { pass_through_share: 0.5 }
    }
}

/// Optimizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub liquidity: LiquidityModelConfig,
    pub holding: HoldingModelConfig,
    /// Investments at or below this amount are treated as solver noise
    pub materiality_threshold: f64,
    /// Deadline for the deadline-bounded solve; `None` waits indefinitely
    pub solve_timeout_ms: Option<u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            liquidity: LiquidityModelConfig::default(),
            holding: HoldingModelConfig::default(),
            materiality_threshold: 0.001,
            solve_timeout_ms: Some(5_000),
        }
    }
}

impl OptimizerConfig {
    pub fn solve_timeout(&self) -> Option<Duration> {
        self.solve_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> CoreResult<()> {
        let non_negative = |name: &str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(CoreError::InvalidConfig(format!("{name} must be non-negative, got {value}")))
            }
        };

        non_negative("liquidity.base_factor", self.liquidity.base_factor)?;
        non_negative("liquidity.fee_multiplier", self.liquidity.fee_multiplier)?;
        non_negative("liquidity.default_fee", self.liquidity.default_fee)?;
        non_negative("holding.pass_through_share", self.holding.pass_through_share)?;
        non_negative("materiality_threshold", self.materiality_threshold)?;

        let liquidity = &self.liquidity;
        if liquidity.base_factor + liquidity.fee_multiplier * liquidity.default_fee <= 0.0 {
            return Err(CoreError::InvalidConfig(
                "liquidity consumption factor must be positive".to_string(),
            ));
        }

        if self.solve_timeout_ms == Some(0) {
            return Err(CoreError::InvalidConfig("solve_timeout_ms must be positive".to_string()));
        }

        Ok(())
    }
}
