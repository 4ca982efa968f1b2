//! Triangular arbitrage opportunity types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    deserialize_unique_keys, triangular_profit, CoreError, CoreResult, Currency, TradingPair,
};

/// Per-pair market data keyed by trading pair
pub type PairMap = BTreeMap<TradingPair, f64>;

/// A base -> intermediate -> quote -> base cycle offered by the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub base_currency: Currency,
    pub intermediate_currency: Currency,
    pub quote_currency: Currency,

    // Market data for `intermediate/base`, `quote/intermediate`, `quote/base`
    #[serde(deserialize_with = "deserialize_unique_keys")]
    pub exchange_rates: PairMap,
    #[serde(deserialize_with = "deserialize_unique_keys")]
    pub liquidity: PairMap,
    #[serde(deserialize_with = "deserialize_unique_keys")]
    pub transaction_fees: PairMap,

    /// Fractional return per unit of base currency invested
    pub expected_profit: f64,
    /// Feed trust in (0, 1]
    pub confidence_score: f64,
}

impl Opportunity {
    /// Pair traded by the first leg (`intermediate/base`)
    pub fn entry_pair(&self) -> TradingPair {
        TradingPair::new(self.intermediate_currency.clone(), self.base_currency.clone())
    }

    /// Pair traded by the second leg (`quote/intermediate`)
    pub fn cross_pair(&self) -> TradingPair {
        TradingPair::new(self.quote_currency.clone(), self.intermediate_currency.clone())
    }

    /// Pair traded by the closing leg (`quote/base`)
    pub fn exit_pair(&self) -> TradingPair {
        TradingPair::new(self.quote_currency.clone(), self.base_currency.clone())
    }

    /// The three pairs in execution order
    pub fn leg_pairs(&self) -> [TradingPair; 3] {
        [self.entry_pair(), self.cross_pair(), self.exit_pair()]
    }

    pub fn rate(&self, pair: &TradingPair) -> Option<f64> {
        self.exchange_rates.get(pair).copied()
    }

    pub fn fee(&self, pair: &TradingPair) -> Option<f64> {
        self.transaction_fees.get(pair).copied()
    }

    pub fn available_liquidity(&self, pair: &TradingPair) -> Option<f64> {
        self.liquidity.get(pair).copied()
    }

    /// Objective coefficient: expected profit weighted by feed confidence
    pub fn weighted_profit(&self) -> f64 {
        self.expected_profit * self.confidence_score
    }

    pub fn involves(&self, currency: &Currency) -> bool {
        &self.base_currency == currency
            || &self.intermediate_currency == currency
            || &self.quote_currency == currency
    }

    /// Human readable cycle, e.g. `USDT -> BTC -> ETH`
    pub fn cycle(&self) -> String {
        format!(
            "{} -> {} -> {}",
            self.base_currency, self.intermediate_currency, self.quote_currency
        )
    }

    /// Recompute the cycle profit from the stored rates and fees
    pub fn cycle_profit(&self) -> Option<f64> {
        let [entry, cross, exit] = self.leg_pairs();
        let exit_rate = self.rate(&exit)?;
        Some(triangular_profit(
            self.rate(&entry)?,
            self.rate(&cross)?,
            1.0 / exit_rate,
            (self.fee(&entry)?, self.fee(&cross)?, self.fee(&exit)?),
        ))
    }

    /// Check the opportunity is internally consistent before it reaches the solver
    pub fn validate(&self) -> CoreResult<()> {
        if self.base_currency == self.intermediate_currency
            || self.base_currency == self.quote_currency
            || self.intermediate_currency == self.quote_currency
        {
            return Err(CoreError::DegenerateCycle(self.cycle()));
        }

        let pairs = self.leg_pairs();
        for (field, map) in [
            ("exchange rate", &self.exchange_rates),
            ("liquidity", &self.liquidity),
            ("transaction fee", &self.transaction_fees),
        ] {
            check_pair_keys(&self.cycle(), field, map, &pairs)?;
        }

        for pair in &pairs {
            let rate = self.exchange_rates[pair];
            if !rate.is_finite() || rate <= 0.0 {
                return Err(CoreError::InvalidRate { pair: pair.clone(), rate });
            }

            let fee = self.transaction_fees[pair];
            if !(0.0..1.0).contains(&fee) {
                return Err(CoreError::InvalidFee { pair: pair.clone(), fee });
            }

            let liquidity = self.liquidity[pair];
            if !liquidity.is_finite() || liquidity < 0.0 {
                return Err(CoreError::InvalidLiquidity { pair: pair.clone(), liquidity });
            }
        }

        if !self.expected_profit.is_finite() {
            return Err(CoreError::InvalidExpectedProfit(self.expected_profit));
        }

        if !(self.confidence_score > 0.0 && self.confidence_score <= 1.0) {
            return Err(CoreError::InvalidConfidence(self.confidence_score));
        }

        Ok(())
    }

    /// Fresh opportunity for the same cycle under new market data.
    ///
    /// Fees are kept; expected profit is recomputed from the new rates.
    pub fn repriced(
        &self,
        exchange_rates: PairMap,
        liquidity: PairMap,
        confidence_score: f64,
    ) -> CoreResult<Opportunity> {
        let mut updated = Opportunity {
            exchange_rates,
            liquidity,
            confidence_score,
            expected_profit: 0.0,
            ..self.clone()
        };
        updated.validate()?;
        updated.expected_profit = updated
            .cycle_profit()
            .ok_or_else(|| CoreError::MissingPair {
                cycle: updated.cycle(),
                field: "exchange rate",
                pair: updated.exit_pair(),
            })?;
        Ok(updated)
    }
}

fn check_pair_keys(
    cycle: &str,
    field: &'static str,
    map: &PairMap,
    expected: &[TradingPair; 3],
) -> CoreResult<()> {
    if let Some(pair) = expected.iter().find(|p| !map.contains_key(p)) {
        return Err(CoreError::MissingPair {
            cycle: cycle.to_string(),
            field,
            pair: pair.clone(),
        });
    }
    if let Some(pair) = map.keys().find(|p| !expected.contains(p)) {
        return Err(CoreError::UnexpectedPair {
            cycle: cycle.to_string(),
            field,
            pair: pair.clone(),
        });
    }
    Ok(())
}

/// Keep profitable opportunities, best confidence-weighted profit first
pub fn rank_profitable(opportunities: Vec<Opportunity>) -> Vec<Opportunity> {
    profitable_order(&opportunities)
        .into_iter()
        .map(|i| opportunities[i].clone())
        .collect()
}

/// Indices `rank_profitable` would keep, in ranked order. Ties keep their
/// input order.
pub fn profitable_order(opportunities: &[Opportunity]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..opportunities.len())
        .filter(|&i| opportunities[i].expected_profit > 0.0)
        .collect();
    order.sort_by(|&a, &b| {
        opportunities[b]
            .weighted_profit()
            .total_cmp(&opportunities[a].weighted_profit())
    });
    order
}

/// Market data for one leg of a cycle
#[derive(Debug, Clone, Copy, PartialEq)]
struct LegQuote {
    rate: f64,
    liquidity: f64,
    fee: f64,
}

/// Builder for Opportunity
#[derive(Debug)]
pub struct OpportunityBuilder {
    base: Currency,
    intermediate: Currency,
    quote: Currency,
    entry: Option<LegQuote>,
    cross: Option<LegQuote>,
    exit: Option<LegQuote>,
    expected_profit: Option<f64>,
    confidence_score: f64,
}

impl OpportunityBuilder {
    pub fn new(
        base: impl Into<Currency>,
        intermediate: impl Into<Currency>,
        quote: impl Into<Currency>,
    ) -> Self {
        Self {
            base: base.into(),
            intermediate: intermediate.into(),
            quote: quote.into(),
            entry: None,
            cross: None,
            exit: None,
            expected_profit: None,
            confidence_score: 1.0,
        }
    }

    /// `intermediate/base` leg
    pub fn entry_leg(mut self, rate: f64, liquidity: f64, fee: f64) -> Self {
        self.entry = Some(LegQuote { rate, liquidity, fee });
        self
    }

    /// `quote/intermediate` leg
    pub fn cross_leg(mut self, rate: f64, liquidity: f64, fee: f64) -> Self {
        self.cross = Some(LegQuote { rate, liquidity, fee });
        self
    }

    /// `quote/base` leg
    pub fn exit_leg(mut self, rate: f64, liquidity: f64, fee: f64) -> Self {
        self.exit = Some(LegQuote { rate, liquidity, fee });
        self
    }

    /// Same liquidity and fee on all three legs
    pub fn uniform_legs(self, rates: [f64; 3], liquidity: f64, fee: f64) -> Self {
        self.entry_leg(rates[0], liquidity, fee)
            .cross_leg(rates[1], liquidity, fee)
            .exit_leg(rates[2], liquidity, fee)
    }

    /// Override the expected profit instead of deriving it from the rates
    pub fn expected_profit(mut self, profit: f64) -> Self {
        self.expected_profit = Some(profit);
        self
    }

    pub fn confidence(mut self, score: f64) -> Self {
        self.confidence_score = score;
        self
    }

    pub fn build(self) -> CoreResult<Opportunity> {
        let mut opp = Opportunity {
            base_currency: self.base,
            intermediate_currency: self.intermediate,
            quote_currency: self.quote,
            exchange_rates: PairMap::new(),
            liquidity: PairMap::new(),
            transaction_fees: PairMap::new(),
            expected_profit: self.expected_profit.unwrap_or(0.0),
            confidence_score: self.confidence_score,
        };

        for (pair, leg) in opp.leg_pairs().into_iter().zip([self.entry, self.cross, self.exit]) {
            if let Some(leg) = leg {
                opp.exchange_rates.insert(pair.clone(), leg.rate);
                opp.liquidity.insert(pair.clone(), leg.liquidity);
                opp.transaction_fees.insert(pair, leg.fee);
            }
        }

        opp.validate()?;

        if self.expected_profit.is_none() {
            // validate() guarantees all three legs are present
            opp.expected_profit = opp.cycle_profit().unwrap_or(-1.0);
        }

        Ok(opp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Opportunity {
        OpportunityBuilder::new("USDT", "BTC", "ETH")
            .entry_leg(0.5, 1_000_000.0, 0.001)
            .cross_leg(4.0, 500_000.0, 0.002)
            .exit_leg(1.96, 250_000.0, 0.001)
            .confidence(0.9)
            .build()
            .unwrap()
    }

    #[test]
    fn test_leg_pairs_follow_cycle_naming() {
        let opp = sample();
        let [entry, cross, exit] = opp.leg_pairs();
        assert_eq!(entry.to_string(), "BTC/USDT");
        assert_eq!(cross.to_string(), "ETH/BTC");
        assert_eq!(exit.to_string(), "ETH/USDT");
        assert_eq!(opp.cycle(), "USDT -> BTC -> ETH");
    }

    #[test]
    fn test_builder_derives_expected_profit() {
        let opp = sample();
        let expected = triangular_profit(0.5, 4.0, 1.0 / 1.96, (0.001, 0.002, 0.001));
        assert_eq!(opp.expected_profit, expected);
        assert!(opp.expected_profit > 0.0);
        assert!((opp.weighted_profit() - expected * 0.9).abs() < 1e-15);
    }

    #[test]
    fn test_builder_respects_explicit_profit() {
        let opp = OpportunityBuilder::new("USDT", "BTC", "ETH")
            .uniform_legs([0.5, 4.0, 1.96], 1_000.0, 0.001)
            .expected_profit(0.02)
            .build()
            .unwrap();
        assert_eq!(opp.expected_profit, 0.02);
        assert_eq!(opp.confidence_score, 1.0);
    }

    #[test]
    fn test_missing_leg_is_rejected() {
        let err = OpportunityBuilder::new("USDT", "BTC", "ETH")
            .entry_leg(0.5, 1_000.0, 0.001)
            .cross_leg(4.0, 1_000.0, 0.001)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::MissingPair { ref pair, .. } if pair.to_string() == "ETH/USDT"
        ));
    }

    #[test]
    fn test_unexpected_pair_is_rejected() {
        let mut opp = sample();
        opp.liquidity.insert(TradingPair::new("BTC", "ETH"), 10.0);
        assert!(matches!(
            opp.validate(),
            Err(CoreError::UnexpectedPair { field: "liquidity", .. })
        ));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut opp = sample();
        opp.exchange_rates.insert(opp.cross_pair(), 0.0);
        assert!(matches!(opp.validate(), Err(CoreError::InvalidRate { .. })));

        let mut opp = sample();
        opp.transaction_fees.insert(opp.entry_pair(), 1.0);
        assert!(matches!(opp.validate(), Err(CoreError::InvalidFee { .. })));

        let mut opp = sample();
        opp.liquidity.insert(opp.exit_pair(), -5.0);
        assert!(matches!(opp.validate(), Err(CoreError::InvalidLiquidity { .. })));

        let mut opp = sample();
        opp.confidence_score = 0.0;
        assert!(matches!(opp.validate(), Err(CoreError::InvalidConfidence(_))));

        let mut opp = sample();
        opp.expected_profit = f64::NAN;
        assert!(matches!(opp.validate(), Err(CoreError::InvalidExpectedProfit(_))));
    }

    #[test]
    fn test_degenerate_cycle() {
        let err = OpportunityBuilder::new("USDT", "USDT", "ETH")
            .uniform_legs([1.0, 1.0, 1.0], 1_000.0, 0.001)
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::DegenerateCycle(_)));
    }

    #[test]
    fn test_repriced_recomputes_profit() {
        let opp = sample();
        let mut rates = opp.exchange_rates.clone();
        rates.insert(opp.exit_pair(), 2.0);

        let updated = opp.repriced(rates, opp.liquidity.clone(), 0.8).unwrap();
        assert!(updated.expected_profit < opp.expected_profit);
        assert_eq!(updated.confidence_score, 0.8);
        assert_eq!(updated.transaction_fees, opp.transaction_fees);
        // source opportunity is left as it was
        assert_eq!(opp.confidence_score, 0.9);
    }

    #[test]
    fn test_rank_profitable() {
        let good = sample();
        let mut better = sample();
        better.expected_profit = 0.05;
        let mut losing = sample();
        losing.expected_profit = -0.01;

        let opportunities = vec![good.clone(), losing, better.clone()];
        assert_eq!(profitable_order(&opportunities), vec![2, 0]);

        let ranked = rank_profitable(opportunities);
        assert_eq!(ranked, vec![better, good]);
    }

    #[test]
    fn test_json_roundtrip_keeps_pair_keys() {
        let opp = sample();
        let json = serde_json::to_value(&opp).unwrap();
        assert_eq!(json["exchange_rates"]["ETH/BTC"], 4.0);

        let back: Opportunity = serde_json::from_value(json).unwrap();
        assert_eq!(back.leg_pairs(), opp.leg_pairs());
        assert_eq!(back.exchange_rates, opp.exchange_rates);
        assert!(back.validate().is_ok());
    }
}
