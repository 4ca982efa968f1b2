//! Run a scenario and report the outcome

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use triarb_core::{
    AllocationResult, AllocationStatus, ExecutionPlan, MarketSnapshot, OptimizerConfig,
    PortfolioConstraints, RiskAssessment, RiskAssessor,
};
use triarb_market::{ExecutionCosts, MarketConditions, MarketRiskAssessor};
use triarb_optimizer::{plan_execution, ArbitrageOptimizer};

use crate::scenario::PreparedPeriod;
use crate::{Scenario, Settings};

/// Market execution costs for one funded cycle, on its base-currency amount
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleCosts {
    pub opportunity_index: usize,
    pub costs: ExecutionCosts,
}

/// One line of the multi-period breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodReport {
    pub period: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<MarketConditions>,
    pub risk_tolerance: f64,
    pub status: AllocationStatus,
    /// Scenario indices of the funded opportunities
    pub funded: Vec<usize>,
    pub total_invested: f64,
    pub total_expected_profit: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskAssessment>,
}

impl PeriodReport {
    fn new(prepared: &PreparedPeriod, allocation: &AllocationResult, plan: &ExecutionPlan) -> Self {
        Self {
            period: prepared.period,
            market: prepared.conditions.clone(),
            risk_tolerance: prepared.snapshot.constraints.risk_tolerance,
            status: allocation.status(),
            funded: allocation.investments().keys().copied().collect(),
            total_invested: allocation.total_invested(),
            total_expected_profit: allocation.total_expected_profit(),
            roi: allocation.roi(),
            risk: prepared
                .conditions
                .as_ref()
                .map(|market| MarketRiskAssessor::new(market.clone()).assess(plan)),
        }
    }

    /// Solved and funded at least one cycle
    pub fn is_successful(&self) -> bool {
        self.status == AllocationStatus::Optimal && !self.funded.is_empty()
    }
}

/// Totals over the successful periods
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiPeriodSummary {
    pub periods: usize,
    pub successful_periods: usize,
    pub total_invested: f64,
    pub total_expected_profit: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_roi: Option<f64>,
}

impl MultiPeriodSummary {
    pub fn from_periods(periods: &[PeriodReport]) -> Self {
        let successful: Vec<&PeriodReport> = periods.iter().filter(|p| p.is_successful()).collect();
        let total_invested = successful.iter().fold(0.0, |acc, p| acc + p.total_invested);
        let total_expected_profit = successful
            .iter()
            .fold(0.0, |acc, p| acc + p.total_expected_profit);

        Self {
            periods: periods.len(),
            successful_periods: successful.len(),
            total_invested,
            total_expected_profit,
            overall_roi: (total_invested > 0.0).then(|| total_expected_profit / total_invested),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub optimizer: OptimizerConfig,
    /// Constraints the optimizer actually used
    pub constraints: PortfolioConstraints,
    /// Keyed by position in the scenario's `opportunities`
    pub allocation: AllocationResult,
    pub plan: ExecutionPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<MarketConditions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskAssessment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub costs: Vec<CycleCosts>,
    /// Base period first, then every later period
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub periods: Vec<PeriodReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<MultiPeriodSummary>,
}

/// Solve the scenario under the configured deadline, then plan and assess.
/// Later periods, if any, are solved together afterwards.
pub async fn run(settings: &Settings, scenario: &Scenario) -> anyhow::Result<RunReport> {
    let optimizer = Arc::new(ArbitrageOptimizer::new(settings.optimizer.clone())?);
    let base = scenario.prepared();

    let allocation = optimizer
        .optimize_with_deadline(&base.snapshot.opportunities, &base.snapshot.constraints)
        .await?
        .reindexed(&base.source_indices);
    let plan = plan_execution(&allocation);

    info!(
        "Allocation {}: {} cycles, {} legs",
        allocation.status(),
        plan.len(),
        plan.legs().count()
    );

    let risk = base
        .conditions
        .as_ref()
        .map(|market| MarketRiskAssessor::new(market.clone()).assess(&plan));

    let costs = match &base.conditions {
        Some(market) => plan
            .cycles
            .iter()
            .map(|cycle| CycleCosts {
                opportunity_index: cycle.opportunity_index,
                costs: market.execution_costs(cycle.investment_amount),
            })
            .collect(),
        None => Vec::new(),
    };

    if let Some(risk) = &risk {
        info!(
            "Execution risk {:?}: score {:.3}, success probability {:.3}",
            risk.risk_level, risk.total_risk_score, risk.execution_probability
        );
    }

    let later = scenario.later_periods()?;
    let (periods, summary) = if later.is_empty() {
        (Vec::new(), None)
    } else {
        let mut periods = vec![PeriodReport::new(&base, &allocation, &plan)];
        for (prepared, result) in later.iter().zip(solve_periods(&optimizer, &later).await?) {
            periods.push(PeriodReport::new(prepared, &result, &plan_execution(&result)));
        }

        let summary = MultiPeriodSummary::from_periods(&periods);
        log_summary(&periods, &summary);
        (periods, Some(summary))
    };

    Ok(RunReport {
        generated_at: Utc::now(),
        optimizer: optimizer.config().clone(),
        constraints: base.snapshot.constraints,
        allocation,
        plan,
        market: base.conditions,
        risk,
        costs,
        periods,
        summary,
    })
}

/// Solve later periods in parallel on a blocking worker. The batch shares
/// one deadline; missing it leaves every later period not solved.
async fn solve_periods(
    optimizer: &Arc<ArbitrageOptimizer>,
    periods: &[PreparedPeriod],
) -> anyhow::Result<Vec<AllocationResult>> {
    let snapshots: Vec<MarketSnapshot> = periods.iter().map(|p| p.snapshot.clone()).collect();
    let deadline = optimizer.config().solve_timeout();

    let worker = Arc::clone(optimizer);
    let batch = tokio::task::spawn_blocking(move || worker.optimize_batch(&snapshots));

    let results = match deadline {
        Some(deadline) => match tokio::time::timeout(deadline, batch).await {
            Ok(joined) => joined.context("Period solver worker failed")?,
            Err(_) => {
                warn!("Later periods missed the {:?} deadline", deadline);
                return Ok(periods
                    .iter()
                    .map(|_| AllocationResult::without_investments(AllocationStatus::NotSolved))
                    .collect());
            }
        },
        None => batch.await.context("Period solver worker failed")?,
    };

    results
        .into_iter()
        .zip(periods)
        .map(|(result, prepared)| {
            result
                .map(|allocation| allocation.reindexed(&prepared.source_indices))
                .with_context(|| format!("Period {}", prepared.period))
        })
        .collect()
}

fn log_summary(periods: &[PeriodReport], summary: &MultiPeriodSummary) {
    info!(
        "Successful periods: {}/{}, invested {:.2}, expected profit {:.6}",
        summary.successful_periods,
        summary.periods,
        summary.total_invested,
        summary.total_expected_profit
    );
    if let Some(roi) = summary.overall_roi {
        info!("Overall ROI: {:.4}%", roi * 100.0);
    }

    for period in periods {
        info!(
            "Period {}: {} ({:.2} invested, {:.6} profit, {} opportunities)",
            period.period,
            period.status,
            period.total_invested,
            period.total_expected_profit,
            period.funded.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Period, Requote};
    use triarb_core::{Opportunity, OpportunityBuilder, PairMap, RiskLevel, TradingPair};
    use triarb_market::{ConditionsDelta, Sentiment};

    fn usdt_cycle() -> Opportunity {
        OpportunityBuilder::new("USDT", "BTC", "ETH")
            .uniform_legs([0.5, 4.0, 1.96], 1_000_000.0, 0.001)
            .expected_profit(0.02)
            .confidence(0.9)
            .build()
            .unwrap()
    }

    fn scenario(market: Option<MarketConditions>) -> Scenario {
        Scenario {
            snapshot: MarketSnapshot {
                opportunities: vec![usdt_cycle()],
                constraints: PortfolioConstraints::new(0.5).with_balance("USDT", 1_000.0),
            },
            market,
            admit_profitable_only: false,
            periods: Vec::new(),
        }
    }

    fn bullish() -> MarketConditions {
        MarketConditions::new(0.5, 1.5, 1.0, 0.2, Sentiment::Bullish).unwrap()
    }

    fn volatility_move(volatility: f64) -> Period {
        Period {
            delta: ConditionsDelta {
                volatility,
                ..Default::default()
            },
            requotes: Vec::new(),
        }
    }

    fn pair_map(values: [f64; 3]) -> PairMap {
        let pairs = [
            TradingPair::new("BTC", "USDT"),
            TradingPair::new("ETH", "BTC"),
            TradingPair::new("ETH", "USDT"),
        ];
        pairs.into_iter().zip(values).collect()
    }

    #[tokio::test]
    async fn test_run_without_market() {
        let settings = Settings::default();
        let report = run(&settings, &scenario(None)).await.unwrap();

        assert_eq!(report.allocation.status(), AllocationStatus::Optimal);
        assert!((report.allocation.total_invested() - 500.0).abs() < 1e-6);
        assert_eq!(report.plan.len(), 1);
        assert!(report.risk.is_none());
        assert!(report.costs.is_empty());
        assert!(report.periods.is_empty());
        assert!(report.summary.is_none());
        assert_eq!(report.optimizer, settings.optimizer);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("risk").is_none());
        assert!(json.get("summary").is_none());
        assert_eq!(json["allocation"]["status"], "optimal");
        assert_eq!(json["optimizer"]["solve_timeout_ms"], 5_000);
    }

    #[tokio::test]
    async fn test_run_with_market() {
        let report = run(&Settings::default(), &scenario(Some(bullish()))).await.unwrap();

        // 0.5 * (1 - 0.3 * 0.5) of 1000
        assert!((report.allocation.total_invested() - 425.0).abs() < 1e-6);
        let risk = report.risk.unwrap();
        assert!((risk.total_risk_score - 0.27).abs() < 1e-12);
        assert_eq!(risk.risk_level, RiskLevel::Low);
        assert_eq!(report.costs.len(), 1);
        assert!(report.costs[0].costs.total_cost > 0.0);
    }

    #[tokio::test]
    async fn test_run_over_periods() {
        let mut scenario = scenario(Some(bullish()));
        let losing_requote = Requote {
            opportunity_index: 0,
            exchange_rates: pair_map([0.5, 4.0, 2.1]),
            liquidity: pair_map([1_000_000.0; 3]),
            confidence_score: 0.9,
        };
        scenario.periods = vec![
            volatility_move(0.3),
            // 0.8 - 0.9 clamps at 0.1
            volatility_move(-0.9),
            Period {
                delta: ConditionsDelta::default(),
                requotes: vec![losing_requote],
            },
        ];

        let report = run(&Settings::default(), &scenario).await.unwrap();
        assert_eq!(report.periods.len(), 4);

        let tolerances: Vec<f64> = report.periods.iter().map(|p| p.risk_tolerance).collect();
        for (actual, expected) in tolerances.iter().zip([0.425, 0.38, 0.485, 0.485]) {
            assert!((actual - expected).abs() < 1e-12, "{tolerances:?}");
        }

        let invested: Vec<f64> = report.periods.iter().map(|p| p.total_invested).collect();
        for (actual, expected) in invested.iter().zip([425.0, 380.0, 485.0, 0.0]) {
            assert!((actual - expected).abs() < 1e-6, "{invested:?}");
        }

        let last = &report.periods[3];
        assert_eq!(last.status, AllocationStatus::Optimal);
        assert!(last.funded.is_empty());
        assert!(!last.is_successful());
        assert_eq!(last.roi, None);
        assert!((last.market.as_ref().unwrap().volatility_index - 0.1).abs() < 1e-12);
        assert_eq!(last.risk.as_ref().unwrap().total_risk_score, 0.0);

        let summary = report.summary.unwrap();
        assert_eq!(summary.periods, 4);
        assert_eq!(summary.successful_periods, 3);
        assert!((summary.total_invested - 1_290.0).abs() < 1e-6);
        assert!((summary.total_expected_profit - 1_290.0 * 0.018).abs() < 1e-6);
        assert!((summary.overall_roi.unwrap() - 0.018).abs() < 1e-9);

        // the headline allocation is still the base period
        assert!((report.allocation.total_invested() - 425.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_report_keeps_scenario_indices() {
        let mut losing = usdt_cycle();
        losing.expected_profit = -0.01;
        let usdc_cycle = OpportunityBuilder::new("USDC", "ADA", "DOT")
            .uniform_legs([1.2, 20.0, 25.0], 1_000_000.0, 0.001)
            .expected_profit(0.018)
            .confidence(0.9)
            .build()
            .unwrap();

        let mut scenario = scenario(Some(bullish()));
        scenario.snapshot.opportunities = vec![losing, usdc_cycle];
        scenario.snapshot.constraints = PortfolioConstraints::new(0.5)
            .with_balance("USDT", 1_000.0)
            .with_balance("USDC", 1_000.0);
        scenario.admit_profitable_only = true;

        let report = run(&Settings::default(), &scenario).await.unwrap();

        assert_eq!(report.allocation.investments().keys().copied().collect::<Vec<_>>(), vec![1]);
        let funded = report.allocation.investment(1).unwrap();
        assert_eq!(funded.opportunity_index, 1);
        assert_eq!(funded.opportunity.base_currency.as_str(), "USDC");
        assert_eq!(report.plan.cycles[0].opportunity_index, 1);
        assert_eq!(report.costs[0].opportunity_index, 1);
    }

    #[tokio::test]
    async fn test_invalid_opportunity_is_an_error() {
        let mut scenario = scenario(None);
        scenario.snapshot.opportunities[0].confidence_score = 0.0;
        let err = run(&Settings::default(), &scenario).await.unwrap_err();
        assert!(err.to_string().contains("Opportunity #0"));
    }
}
