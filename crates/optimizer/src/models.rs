//! Pluggable proxy models used by the constraint builder
//!
//! Both defaults are deliberate simplifications: a linear depth-impact proxy
//! instead of an order-book walk, and a flat pass-through gain instead of a
//! ledger simulation. Sharper models plug in behind the same traits.

use triarb_core::{Currency, HoldingModelConfig, LiquidityModelConfig, Opportunity, TradingPair};

/// Liquidity consumed on `pair` per unit of capital committed to `opportunity`
pub trait LiquidityModel: Send + Sync {
    fn name(&self) -> &'static str;
    fn consumption_factor(&self, opportunity: &Opportunity, pair: &TradingPair) -> f64;
}

/// Per-unit change in `currency` holdings from funding `opportunity`.
/// `None` when the cycle never touches the currency.
pub trait HoldingFlowModel: Send + Sync {
    fn name(&self) -> &'static str;
    fn net_effect(&self, opportunity: &Opportunity, currency: &Currency) -> Option<f64>;
}

/// `base_factor + fee_multiplier * fee` (higher fees read as thinner books)
#[derive(Debug, Clone, PartialEq)]
pub struct LinearLiquidityModel {
    base_factor: f64,
    fee_multiplier: f64,
    default_fee: f64,
}

impl LinearLiquidityModel {
    pub fn new(config: &LiquidityModelConfig) -> Self {
        Self {
            base_factor: config.base_factor,
            fee_multiplier: config.fee_multiplier,
            default_fee: config.default_fee,
        }
    }
}

impl Default for LinearLiquidityModel {
    fn default() -> Self {
        Self::new(&LiquidityModelConfig::default())
    }
}

impl LiquidityModel for LinearLiquidityModel {
    fn name(&self) -> &'static str {
        "linear_fee_proxy"
    }

    fn consumption_factor(&self, opportunity: &Opportunity, pair: &TradingPair) -> f64 {
        let fee = opportunity.fee(pair).unwrap_or(self.default_fee);
        self.base_factor + self.fee_multiplier * fee
    }
}

/// Base currency pays the full investment; the other two legs are credited a
/// share of the expected profit
#[derive(Debug, Clone, PartialEq)]
pub struct PassThroughHoldingModel {
    pass_through_share: f64,
}

impl PassThroughHoldingModel {
    pub fn new(config: &HoldingModelConfig) -> Self {
        Self {
            pass_through_share: config.pass_through_share,
        }
    }
}

impl Default for PassThroughHoldingModel {
    fn default() -> Self {
        Self::new(&HoldingModelConfig::default())
    }
}

impl HoldingFlowModel for PassThroughHoldingModel {
    fn name(&self) -> &'static str {
        "pass_through"
    }

    fn net_effect(&self, opportunity: &Opportunity, currency: &Currency) -> Option<f64> {
        if &opportunity.base_currency == currency {
            Some(-1.0)
        } else if opportunity.involves(currency) {
            Some(self.pass_through_share * opportunity.expected_profit)
        } else {
            None
        }
    }
}
