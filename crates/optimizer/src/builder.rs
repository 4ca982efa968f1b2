//! Translates opportunities and portfolio limits into a linear program

use std::collections::BTreeMap;

use triarb_core::{Currency, Opportunity, PortfolioConstraints, TradingPair};

use crate::models::{HoldingFlowModel, LiquidityModel};
use crate::program::{Comparison, ConstraintFamily, LinearConstraint, LinearProgram};

/// Builds one fresh program per solve.
///
/// Variable `i` is the capital committed to `opportunities[i]`, in its base
/// currency. Rows are emitted family by family with keys in sorted order, so
/// identical inputs always give an identical program.
pub struct ConstraintBuilder<'a> {
    liquidity: &'a dyn LiquidityModel,
    holding: &'a dyn HoldingFlowModel,
}

impl<'a> ConstraintBuilder<'a> {
    pub fn new(liquidity: &'a dyn LiquidityModel, holding: &'a dyn HoldingFlowModel) -> Self {
        Self { liquidity, holding }
    }

    pub fn build(
        &self,
        opportunities: &[Opportunity],
        constraints: &PortfolioConstraints,
    ) -> LinearProgram {
        let objective = opportunities.iter().map(Opportunity::weighted_profit).collect();
        let mut program = LinearProgram::new(objective);

        self.add_liquidity_constraints(&mut program, opportunities);
        self.add_balance_constraints(&mut program, opportunities, constraints);
        self.add_min_holding_constraints(&mut program, opportunities, constraints);
        self.add_risk_constraints(&mut program, opportunities, constraints);

        program
    }

    /// Σ consumption * x over every opportunity touching a pair stays within
    /// the deepest liquidity any opportunity reports for that pair
    fn add_liquidity_constraints(
        &self,
        program: &mut LinearProgram,
        opportunities: &[Opportunity],
    ) {
        let mut usage: BTreeMap<TradingPair, (Vec<(usize, f64)>, f64)> = BTreeMap::new();

        for (i, opp) in opportunities.iter().enumerate() {
            for pair in opp.leg_pairs() {
                let factor = self.liquidity.consumption_factor(opp, &pair);
                let available = opp.available_liquidity(&pair).unwrap_or(0.0);

                let (terms, max_liquidity) = usage.entry(pair).or_insert_with(|| (Vec::new(), 0.0));
                terms.push((i, factor));
                *max_liquidity = max_liquidity.max(available);
            }
        }

        for (pair, (terms, max_liquidity)) in usage {
            program.add_constraint(LinearConstraint {
                family: ConstraintFamily::Liquidity,
                label: pair.to_string(),
                terms,
                comparison: Comparison::Le,
                rhs: max_liquidity,
            });
        }
    }

    /// Capital is drawn from the base leg only
    fn add_balance_constraints(
        &self,
        program: &mut LinearProgram,
        opportunities: &[Opportunity],
        constraints: &PortfolioConstraints,
    ) {
        let mut by_base: BTreeMap<&Currency, Vec<(usize, f64)>> = BTreeMap::new();
        for (i, opp) in opportunities.iter().enumerate() {
            by_base.entry(&opp.base_currency).or_default().push((i, 1.0));
        }

        for (currency, terms) in by_base {
            program.add_constraint(LinearConstraint {
                family: ConstraintFamily::Balance,
                label: currency.to_string(),
                terms,
                comparison: Comparison::Le,
                rhs: constraints.balance(currency),
            });
        }
    }

    /// balance + Σ net_effect * x >= minimum, for currencies some cycle touches
    fn add_min_holding_constraints(
        &self,
        program: &mut LinearProgram,
        opportunities: &[Opportunity],
        constraints: &PortfolioConstraints,
    ) {
        for (currency, minimum) in &constraints.min_holdings {
            let terms: Vec<(usize, f64)> = opportunities
                .iter()
                .enumerate()
                .filter_map(|(i, opp)| {
                    self.holding
                        .net_effect(opp, currency)
                        .map(|effect| (i, effect))
                })
                .collect();

            if terms.is_empty() {
                continue;
            }

            program.add_constraint(LinearConstraint {
                family: ConstraintFamily::MinHolding,
                label: currency.to_string(),
                terms,
                comparison: Comparison::Ge,
                rhs: minimum - constraints.balance(currency),
            });
        }
    }

    fn add_risk_constraints(
        &self,
        program: &mut LinearProgram,
        opportunities: &[Opportunity],
        constraints: &PortfolioConstraints,
    ) {
        for (i, opp) in opportunities.iter().enumerate() {
            if let Some(cap) = constraints.max_position(&opp.base_currency) {
                program.add_constraint(LinearConstraint {
                    family: ConstraintFamily::PositionCap,
                    label: opp.base_currency.to_string(),
                    terms: vec![(i, 1.0)],
                    comparison: Comparison::Le,
                    rhs: cap,
                });
            }
        }

        program.add_constraint(LinearConstraint {
            family: ConstraintFamily::Exposure,
            label: "portfolio".to_string(),
            terms: (0..opportunities.len()).map(|i| (i, 1.0)).collect(),
            comparison: Comparison::Le,
            rhs: constraints.max_exposure(),
        });
    }
}
