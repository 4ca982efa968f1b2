//! Market conditions and their per-period drift

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use triarb_core::{MarketError, MarketResult};

pub const VOLATILITY_RANGE: (f64, f64) = (0.1, 0.9);
pub const LIQUIDITY_RANGE: (f64, f64) = (0.5, 2.0);
pub const SPREAD_RANGE: (f64, f64) = (0.5, 2.0);
pub const CONGESTION_RANGE: (f64, f64) = (0.0, 1.0);

/// Broad market mood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Bullish => write!(f, "bullish"),
            Sentiment::Bearish => write!(f, "bearish"),
            Sentiment::Neutral => write!(f, "neutral"),
        }
    }
}

/// Current market conditions affecting trading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketConditions {
    /// Higher means more volatile
    pub volatility_index: f64,
    /// Scales available depth and position limits
    pub liquidity_factor: f64,
    /// Scales bid-ask spreads
    pub spread_factor: f64,
    /// Scales transaction fees
    pub network_congestion: f64,
    #[serde(default)]
    pub sentiment: Sentiment,
}

/// Externally sampled change in conditions for one period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionsDelta {
    pub volatility: f64,
    pub liquidity: f64,
    pub spread: f64,
    pub congestion: f64,
    /// Replaces the sentiment when present
    pub sentiment: Option<Sentiment>,
}

impl MarketConditions {
    pub fn new(
        volatility_index: f64,
        liquidity_factor: f64,
        spread_factor: f64,
        network_congestion: f64,
        sentiment: Sentiment,
    ) -> MarketResult<Self> {
        let conditions = Self {
            volatility_index,
            liquidity_factor,
            spread_factor,
            network_congestion,
            sentiment,
        };
        conditions.validate()?;
        Ok(conditions)
    }

    /// Every multiplier inside its clamp range
    pub fn validate(&self) -> MarketResult<()> {
        check_range("Volatility index", self.volatility_index, VOLATILITY_RANGE)?;
        check_range("Liquidity factor", self.liquidity_factor, LIQUIDITY_RANGE)?;
        check_range("Spread factor", self.spread_factor, SPREAD_RANGE)?;
        check_range("Network congestion", self.network_congestion, CONGESTION_RANGE)
    }

    /// Conditions for the next period. Each multiplier moves by its delta and
    /// is clamped back into range.
    pub fn apply(&self, delta: &ConditionsDelta) -> MarketResult<Self> {
        for (field, value) in [
            ("volatility", delta.volatility),
            ("liquidity", delta.liquidity),
            ("spread", delta.spread),
            ("congestion", delta.congestion),
        ] {
            if !value.is_finite() {
                return Err(MarketError::NonFiniteDelta { field, value });
            }
        }

        let next = Self {
            volatility_index: clamp(self.volatility_index + delta.volatility, VOLATILITY_RANGE),
            liquidity_factor: clamp(self.liquidity_factor + delta.liquidity, LIQUIDITY_RANGE),
            spread_factor: clamp(self.spread_factor + delta.spread, SPREAD_RANGE),
            network_congestion: clamp(self.network_congestion + delta.congestion, CONGESTION_RANGE),
            sentiment: delta.sentiment.unwrap_or(self.sentiment),
        };

        if next.sentiment != self.sentiment {
            debug!("Market sentiment changed: {} -> {}", self.sentiment, next.sentiment);
        }

        Ok(next)
    }
}

impl Default for MarketConditions {
    fn default() -> Self {
        Self {
            volatility_index: 0.4,
            liquidity_factor: 1.0,
            spread_factor: 1.0,
            network_congestion: 0.3,
            sentiment: Sentiment::Neutral,
        }
    }
}

fn clamp(value: f64, (min, max): (f64, f64)) -> f64 {
    value.clamp(min, max)
}

fn check_range(field: &'static str, value: f64, (min, max): (f64, f64)) -> MarketResult<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(MarketError::OutOfRange { field, value, min, max })
    }
}
