//! Per-period constraint adjustment

use std::collections::BTreeMap;

use triarb_core::{Currency, PortfolioConstraints};

use crate::MarketConditions;

/// Currencies held with the larger volatility buffer. Narrower than
/// `Currency::is_stablecoin`: newer stablecoins get the ordinary buffer.
pub const BUFFERED_STABLECOINS: [&str; 3] = ["USDT", "USDC", "DAI"];

fn takes_stablecoin_buffer(currency: &Currency) -> bool {
    BUFFERED_STABLECOINS.contains(&currency.as_str())
}

impl MarketConditions {
    /// Fresh constraints for the current period.
    ///
    /// Volatility lowers risk tolerance and raises minimum holdings
    /// (stablecoins more than other assets). The liquidity factor scales
    /// position limits. Balances pass through unchanged.
    pub fn adjust_constraints(&self, base: &PortfolioConstraints) -> PortfolioConstraints {
        let v = self.volatility_index;

        let max_position_size = scale(&base.max_position_size, |_| self.liquidity_factor);
        let min_holdings = scale(&base.min_holdings, |currency| {
            if takes_stablecoin_buffer(currency) {
                1.0 + 0.5 * v
            } else {
                1.0 + 0.2 * v
            }
        });

        PortfolioConstraints {
            balances: base.balances.clone(),
            min_holdings,
            max_position_size,
            risk_tolerance: base.risk_tolerance * (1.0 - 0.3 * v),
        }
    }
}

fn scale(
    map: &BTreeMap<Currency, f64>,
    factor: impl Fn(&Currency) -> f64,
) -> BTreeMap<Currency, f64> {
    map.iter()
        .map(|(currency, amount)| (currency.clone(), amount * factor(currency)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sentiment;

    fn base() -> PortfolioConstraints {
        PortfolioConstraints::new(0.5)
            .with_balance("USDT", 20_000.0)
            .with_balance("BTC", 0.5)
            .with_min_holding("USDT", 2_000.0)
            .with_min_holding("BTC", 0.1)
            .with_max_position("USDT", 10_000.0)
    }

    #[test]
    fn test_adjustment() {
        let conditions = MarketConditions::new(0.6, 1.5, 1.0, 0.2, Sentiment::Bullish).unwrap();
        let adjusted = conditions.adjust_constraints(&base());

        assert!((adjusted.risk_tolerance - 0.5 * 0.82).abs() < 1e-12);
        assert!((adjusted.max_position(&Currency::new("USDT")).unwrap() - 15_000.0).abs() < 1e-9);
        assert!((adjusted.min_holding(&Currency::new("USDT")).unwrap() - 2_600.0).abs() < 1e-9);
        assert!((adjusted.min_holding(&Currency::new("BTC")).unwrap() - 0.112).abs() < 1e-12);
        assert_eq!(adjusted.balances, base().balances);
    }

    #[test]
    fn test_newer_stablecoins_take_ordinary_buffer() {
        let base = PortfolioConstraints::new(0.5)
            .with_min_holding("DAI", 1_000.0)
            .with_min_holding("FRAX", 1_000.0)
            .with_min_holding("LUSD", 1_000.0);
        let conditions = MarketConditions::new(0.5, 1.0, 1.0, 0.2, Sentiment::Neutral).unwrap();
        let adjusted = conditions.adjust_constraints(&base);

        assert!(Currency::new("FRAX").is_stablecoin());
        assert!((adjusted.min_holding(&Currency::new("DAI")).unwrap() - 1_250.0).abs() < 1e-9);
        assert!((adjusted.min_holding(&Currency::new("FRAX")).unwrap() - 1_100.0).abs() < 1e-9);
        assert!((adjusted.min_holding(&Currency::new("LUSD")).unwrap() - 1_100.0).abs() < 1e-9);
    }

    #[test]
    fn test_base_untouched() {
        let base = base();
        let snapshot = base.clone();
        let adjusted = MarketConditions::default().adjust_constraints(&base);

        assert_eq!(base, snapshot);
        assert_ne!(adjusted, base);
        assert!(adjusted.validate().is_ok());
    }
}
