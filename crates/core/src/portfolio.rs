//! Portfolio constraints

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{deserialize_unique_keys, CoreError, CoreResult, Currency, Opportunity};

/// Balances and limits the allocation must respect
///
/// Maps are ordered so totals are summed in the same order on every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioConstraints {
    /// Current holdings per currency
    #[serde(deserialize_with = "deserialize_unique_keys")]
    pub balances: BTreeMap<Currency, f64>,
    /// Minimum holdings required after allocation
    #[serde(default, deserialize_with = "deserialize_unique_keys")]
    pub min_holdings: BTreeMap<Currency, f64>,
    /// Largest position per base currency; absent means unbounded
    #[serde(default, deserialize_with = "deserialize_unique_keys")]
    pub max_position_size: BTreeMap<Currency, f64>,
    /// Fraction of total portfolio value that may be committed (0-1)
    pub risk_tolerance: f64,
}

impl PortfolioConstraints {
    pub fn new(risk_tolerance: f64) -> Self {
        Self {
            risk_tolerance,
            ..Default::default()
        }
    }

    pub fn with_balance(mut self, currency: impl Into<Currency>, amount: f64) -> Self {
        self.balances.insert(currency.into(), amount);
        self
    }

    pub fn with_min_holding(mut self, currency: impl Into<Currency>, amount: f64) -> Self {
        self.min_holdings.insert(currency.into(), amount);
        self
    }

    pub fn with_max_position(mut self, currency: impl Into<Currency>, amount: f64) -> Self {
        self.max_position_size.insert(currency.into(), amount);
        self
    }

    /// Current balance, zero when the currency is not held
    pub fn balance(&self, currency: &Currency) -> f64 {
        self.balances.get(currency).copied().unwrap_or(0.0)
    }

    pub fn min_holding(&self, currency: &Currency) -> Option<f64> {
        self.min_holdings.get(currency).copied()
    }

    pub fn max_position(&self, currency: &Currency) -> Option<f64> {
        self.max_position_size.get(currency).copied()
    }

    /// Sum of all balances
    pub fn total_value(&self) -> f64 {
        self.balances.values().fold(0.0, |acc, amount| acc + amount)
    }

    /// Upper bound on the sum of all investments
    pub fn max_exposure(&self) -> f64 {
        self.total_value() * self.risk_tolerance
    }

    pub fn validate(&self) -> CoreResult<()> {
        for (kind, map) in [
            ("Balance", &self.balances),
            ("Minimum holding", &self.min_holdings),
            ("Maximum position size", &self.max_position_size),
        ] {
            if let Some((currency, amount)) = map
                .iter()
                .find(|(_, amount)| !amount.is_finite() || **amount < 0.0)
            {
                return Err(CoreError::InvalidAmount {
                    kind,
                    currency: currency.clone(),
                    amount: *amount,
                });
            }
        }

        if !(0.0..=1.0).contains(&self.risk_tolerance) {
            return Err(CoreError::InvalidRiskTolerance(self.risk_tolerance));
        }

        Ok(())
    }
}

/// Opportunities and constraints observed for one market period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub opportunities: Vec<Opportunity>,
    pub constraints: PortfolioConstraints,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exposure() {
        let constraints = PortfolioConstraints::new(0.25)
            .with_balance("USDT", 30_000.0)
            .with_balance("BTC", 1.0)
            .with_balance("ETH", 9_999.0);

        assert_eq!(constraints.total_value(), 40_000.0);
        assert_eq!(constraints.max_exposure(), 10_000.0);
        assert_eq!(constraints.balance(&Currency::new("DAI")), 0.0);
    }

    #[test]
    fn test_absent_limits() {
        let constraints = PortfolioConstraints::new(0.5).with_max_position("usdt", 100.0);
        assert_eq!(constraints.max_position(&Currency::new("USDT")), Some(100.0));
        assert_eq!(constraints.max_position(&Currency::new("BTC")), None);
        assert_eq!(constraints.min_holding(&Currency::new("USDT")), None);
    }

    #[test]
    fn test_validation() {
        assert!(PortfolioConstraints::new(0.3).with_balance("USDT", 10.0).validate().is_ok());

        let err = PortfolioConstraints::new(1.5).validate().unwrap_err();
        assert_eq!(err, CoreError::InvalidRiskTolerance(1.5));

        let err = PortfolioConstraints::new(0.3)
            .with_min_holding("DAI", -1.0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { kind: "Minimum holding", .. }));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{"balances": {"usdt": 1000.0}, "risk_tolerance": 0.2}"#;
        let constraints: PortfolioConstraints = serde_json::from_str(json).unwrap();
        assert_eq!(constraints.balance(&Currency::new("USDT")), 1000.0);
        assert!(constraints.min_holdings.is_empty());
    }

    #[test]
    fn test_case_colliding_balances_rejected() {
        let json = r#"{"balances": {"usdt": 1000.0, "USDT": 5.0}, "risk_tolerance": 0.2}"#;
        let err = serde_json::from_str::<PortfolioConstraints>(json).unwrap_err();
        assert!(err.to_string().contains("USDT appears more than once"), "{err}");

        let json = r#"{
            "balances": {"USDT": 1000.0},
            "max_position_size": {"dai": 1.0, " DAI": 2.0},
            "risk_tolerance": 0.2
        }"#;
        assert!(serde_json::from_str::<PortfolioConstraints>(json).is_err());
    }
}
