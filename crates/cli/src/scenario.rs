//! Scenario files

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use triarb_core::{
    deserialize_unique_keys, profitable_order, MarketSnapshot, Opportunity, PairMap,
    PortfolioConstraints,
};
use triarb_market::{ConditionsDelta, MarketConditions};

/// A base market period, optionally followed by later periods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(flatten)]
    pub snapshot: MarketSnapshot,
    /// When present, constraints are re-derived from these conditions and
    /// the plan is risk-assessed against them
    #[serde(default)]
    pub market: Option<MarketConditions>,
    /// Drop unprofitable opportunities and rank the rest before solving
    #[serde(default)]
    pub admit_profitable_only: bool,
    /// Market moves after the base period, one entry per later period
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub periods: Vec<Period>,
}

/// How the market moved going into one later period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Period {
    #[serde(flatten)]
    pub delta: ConditionsDelta,
    /// Fresh quotes; opportunities without one carry over unchanged
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requotes: Vec<Requote>,
}

/// New market data for one scenario opportunity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requote {
    /// Position in the scenario's `opportunities`
    pub opportunity_index: usize,
    #[serde(deserialize_with = "deserialize_unique_keys")]
    pub exchange_rates: PairMap,
    #[serde(deserialize_with = "deserialize_unique_keys")]
    pub liquidity: PairMap,
    pub confidence_score: f64,
}

/// Inputs for one solve
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPeriod {
    /// 1 for the base period
    pub period: usize,
    pub conditions: Option<MarketConditions>,
    pub snapshot: MarketSnapshot,
    /// Scenario index of each opportunity in `snapshot`
    pub source_indices: Vec<usize>,
}

impl Scenario {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let scenario: Scenario = serde_json::from_str(json).context("Malformed scenario JSON")?;
        match &scenario.market {
            Some(market) => market.validate().context("Invalid market conditions")?,
            None if !scenario.periods.is_empty() => {
                bail!(
                    "Scenario has {} later periods but no starting market",
                    scenario.periods.len()
                )
            }
            None => {}
        }
        Ok(scenario)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        let scenario =
            Self::from_json(&json).with_context(|| format!("In scenario {}", path.display()))?;

        info!(
            "Loaded scenario {} with {} opportunities and {} later periods",
            path.display(),
            scenario.snapshot.opportunities.len(),
            scenario.periods.len()
        );
        Ok(scenario)
    }

    /// Constraints the optimizer should see under `conditions`
    pub fn constraints_under(&self, conditions: Option<&MarketConditions>) -> PortfolioConstraints {
        let base = &self.snapshot.constraints;
        match conditions {
            Some(market) => {
                let adjusted = market.adjust_constraints(base);
                debug!(
                    "Market-adjusted risk tolerance {:.4} -> {:.4}",
                    base.risk_tolerance, adjusted.risk_tolerance
                );
                adjusted
            }
            None => base.clone(),
        }
    }

    /// The base period
    pub fn prepared(&self) -> PreparedPeriod {
        self.prepare(1, self.market.clone(), &self.snapshot.opportunities)
    }

    /// Every later period in order. Conditions drift period to period and
    /// requotes stay in force until quoted again.
    pub fn later_periods(&self) -> anyhow::Result<Vec<PreparedPeriod>> {
        let Some(mut conditions) = self.market.clone() else {
            return Ok(Vec::new());
        };
        let mut opportunities = self.snapshot.opportunities.clone();
        let mut prepared = Vec::with_capacity(self.periods.len());

        for (offset, period) in self.periods.iter().enumerate() {
            let number = offset + 2;
            conditions = conditions
                .apply(&period.delta)
                .with_context(|| format!("Period {number} market move rejected"))?;

            for requote in &period.requotes {
                let index = requote.opportunity_index;
                let Some(current) = opportunities.get(index) else {
                    bail!("Period {number} requotes opportunity #{index}, which does not exist");
                };
                let updated = current
                    .repriced(
                        requote.exchange_rates.clone(),
                        requote.liquidity.clone(),
                        requote.confidence_score,
                    )
                    .with_context(|| format!("Period {number} requote for opportunity #{index}"))?;
                opportunities[index] = updated;
            }

            prepared.push(self.prepare(number, Some(conditions.clone()), &opportunities));
        }

        Ok(prepared)
    }

    fn prepare(
        &self,
        period: usize,
        conditions: Option<MarketConditions>,
        opportunities: &[Opportunity],
    ) -> PreparedPeriod {
        let source_indices = if self.admit_profitable_only {
            let admitted = profitable_order(opportunities);
            debug!(
                "Period {}: admitted {} of {} opportunities",
                period,
                admitted.len(),
                opportunities.len()
            );
            admitted
        } else {
            (0..opportunities.len()).collect()
        };

        PreparedPeriod {
            period,
            snapshot: MarketSnapshot {
                opportunities: source_indices.iter().map(|&i| opportunities[i].clone()).collect(),
                constraints: self.constraints_under(conditions.as_ref()),
            },
            conditions,
            source_indices,
        }
    }
}
