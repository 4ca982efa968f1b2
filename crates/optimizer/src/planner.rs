//! Execution plan generation
//!
//! A pure projection of an allocation result: nothing is re-solved and
//! liquidity is not re-checked. Slippage at execution time is the risk
//! assessor's concern.

use triarb_core::{
    AllocationResult, ExecutionPlan, LegAmount, Opportunity, PlannedCycle, TradeAction, TradeLeg,
    TradingPair, DEFAULT_LEG_FEE,
};

/// Expand every funded opportunity into buy, buy, sell legs
pub fn plan_execution(result: &AllocationResult) -> ExecutionPlan {
    if !result.is_optimal() {
        return ExecutionPlan::empty();
    }

    let cycles = result
        .investments()
        .values()
        .map(|allocation| PlannedCycle {
            opportunity_index: allocation.opportunity_index,
            cycle: allocation.opportunity.cycle(),
            investment_amount: allocation.amount,
            expected_profit: allocation.expected_profit,
            legs: cycle_legs(&allocation.opportunity, allocation.amount),
        })
        .collect();

    ExecutionPlan { cycles }
}

fn cycle_legs(opp: &Opportunity, amount: f64) -> [TradeLeg; 3] {
    let [entry, cross, exit] = opp.leg_pairs();

    let entry_rate = rate(opp, &entry);
    let cross_rate = rate(opp, &cross);
    let cross_fee = fee(opp, &cross);

    // Leg 2 sells the intermediate proceeds of leg 1 at the quoted rate
    let cross_amount = amount * entry_rate;
    // Leg 3 can only sell what leg 2 fills; this is the quoted expectation
    let exit_estimate = cross_amount * cross_rate * (1.0 - cross_fee);

    [
        TradeLeg {
            step: 1,
            action: TradeAction::Buy,
            amount: LegAmount::Fixed { amount },
            expected_rate: entry_rate,
            fee: fee(opp, &entry),
            pair: entry,
        },
        TradeLeg {
            step: 2,
            action: TradeAction::Buy,
            amount: LegAmount::Fixed { amount: cross_amount },
            expected_rate: cross_rate,
            fee: cross_fee,
            pair: cross,
        },
        TradeLeg {
            step: 3,
            action: TradeAction::Sell,
            amount: LegAmount::FromPreviousLeg { estimate: exit_estimate },
            expected_rate: rate(opp, &exit),
            fee: fee(opp, &exit),
            pair: exit,
        },
    ]
}

fn rate(opp: &Opportunity, pair: &TradingPair) -> f64 {
    opp.rate(pair).unwrap_or(0.0)
}

fn fee(opp: &Opportunity, pair: &TradingPair) -> f64 {
    opp.fee(pair).unwrap_or(DEFAULT_LEG_FEE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use triarb_core::{Allocation, AllocationStatus, OpportunityBuilder};

    fn opportunity() -> Opportunity {
        OpportunityBuilder::new("USDT", "BTC", "ETH")
            .entry_leg(0.5, 1_000.0, 0.001)
            .cross_leg(4.0, 1_000.0, 0.002)
            .exit_leg(1.96, 1_000.0, 0.003)
            .expected_profit(0.02)
            .confidence(0.9)
            .build()
            .unwrap()
    }

    #[test]
    fn test_three_legs_buy_buy_sell() {
        let result = AllocationResult::optimal(
            vec![
                Allocation::new(0, 100.0, opportunity()),
                Allocation::new(4, 10.0, opportunity()),
            ],
            2.0,
        );
        let plan = plan_execution(&result);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.legs().count(), 6);
        for cycle in &plan.cycles {
            let actions: Vec<_> = cycle.legs.iter().map(|l| l.action).collect();
            assert_eq!(actions, vec![TradeAction::Buy, TradeAction::Buy, TradeAction::Sell]);
            let steps: Vec<_> = cycle.legs.iter().map(|l| l.step).collect();
            assert_eq!(steps, vec![1, 2, 3]);
        }
        assert_eq!(plan.cycles[1].opportunity_index, 4);
    }

    #[test]
    fn test_leg_details() {
        let result = AllocationResult::optimal(vec![Allocation::new(0, 100.0, opportunity())], 1.8);
        let plan = plan_execution(&result);
        let [first, second, third] = &plan.cycles[0].legs;

        assert_eq!(first.pair.to_string(), "BTC/USDT");
        assert_eq!(first.amount, LegAmount::Fixed { amount: 100.0 });
        assert_eq!(first.expected_rate, 0.5);
        assert_eq!(first.fee, 0.001);

        assert_eq!(second.pair.to_string(), "ETH/BTC");
        assert_eq!(second.amount, LegAmount::Fixed { amount: 50.0 });
        assert_eq!(second.expected_rate, 4.0);
        assert_eq!(second.fee, 0.002);

        assert_eq!(third.pair.to_string(), "ETH/USDT");
        assert_eq!(third.expected_rate, 1.96);
        assert_eq!(third.fee, 0.003);
    }

    #[test]
    fn test_closing_leg_amount_is_an_estimate() {
        let result = AllocationResult::optimal(vec![Allocation::new(0, 100.0, opportunity())], 1.8);
        let plan = plan_execution(&result);
        let closing = &plan.cycles[0].legs[2];

        // Not a firm size: the executor must use leg 2's realized output
        assert!(closing.amount.is_derived());
        assert!((closing.amount.nominal() - 50.0 * 4.0 * 0.998).abs() < 1e-9);
    }

    #[test]
    fn test_non_optimal_gives_empty_plan() {
        for status in [AllocationStatus::Infeasible, AllocationStatus::NotSolved] {
            let plan = plan_execution(&AllocationResult::without_investments(status));
            assert!(plan.is_empty());
        }
        assert!(plan_execution(&AllocationResult::no_opportunities()).is_empty());
    }
}
