//! Core type definitions

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{BTreeMap, Entry};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use crate::CoreError;

/// Currency identifier, normalized to upper case
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(symbol: impl AsRef<str>) -> Self {
        Self(symbol.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this currency is a stablecoin
    pub fn is_stablecoin(&self) -> bool {
        is_stablecoin(&self.0)
    }
}

impl From<String> for Currency {
    fn from(symbol: String) -> Self {
        Self::new(symbol)
    }
}

impl From<&str> for Currency {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check if a symbol is a stablecoin
pub fn is_stablecoin(symbol: &str) -> bool {
    matches!(symbol.to_uppercase().as_str(), "USDC" | "USDT" | "DAI" | "FRAX" | "LUSD")
}

/// Ordered trading pair, written `ASSET/COUNTER`
///
/// `BTC/USDT` and `USDT/BTC` are different pairs. Serialized as the
/// slash-separated string so pairs can key JSON maps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TradingPair {
    asset: Currency,
    counter: Currency,
}

impl TradingPair {
    pub fn new(asset: impl Into<Currency>, counter: impl Into<Currency>) -> Self {
        Self {
            asset: asset.into(),
            counter: counter.into(),
        }
    }

    pub fn asset(&self) -> &Currency {
        &self.asset
    }

    pub fn counter(&self) -> &Currency {
        &self.counter
    }

    pub fn involves(&self, currency: &Currency) -> bool {
        &self.asset == currency || &self.counter == currency
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.asset, self.counter)
    }
}

impl FromStr for TradingPair {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(asset), Some(counter), None)
                if !asset.trim().is_empty() && !counter.trim().is_empty() =>
            {
                Ok(Self::new(asset, counter))
            }
            _ => Err(CoreError::InvalidPair(s.to_string())),
        }
    }
}

impl TryFrom<String> for TradingPair {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TradingPair> for String {
    fn from(pair: TradingPair) -> Self {
        pair.to_string()
    }
}

/// Deserialize a map whose keys normalize on the way in (`usdt` and
/// `USDT` are one currency). Two entries landing on the same key are an
/// error instead of the later one silently winning.
pub fn deserialize_unique_keys<'de, D, K, V>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
where
    D: Deserializer<'de>,
    K: Deserialize<'de> + Ord + fmt::Display,
    V: Deserialize<'de>,
{
    deserializer.deserialize_map(UniqueKeys(PhantomData))
}

struct UniqueKeys<K, V>(PhantomData<(K, V)>);

impl<'de, K, V> Visitor<'de> for UniqueKeys<K, V>
where
    K: Deserialize<'de> + Ord + fmt::Display,
    V: Deserialize<'de>,
{
    type Value = BTreeMap<K, V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map with distinct keys")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<K, V>()? {
            match map.entry(key) {
                Entry::Occupied(entry) => {
                    return Err(de::Error::custom(CoreError::DuplicateKey(entry.key().to_string())));
                }
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_normalization() {
        assert_eq!(Currency::new(" usdt "), Currency::new("USDT"));
        assert_eq!(Currency::from("eth").as_str(), "ETH");
    }

    #[test]
    fn test_stablecoin_detection() {
        assert!(Currency::new("usdc").is_stablecoin());
        assert!(is_stablecoin("DAI"));
        assert!(!Currency::new("BTC").is_stablecoin());
    }

    #[test]
    fn test_pair_is_ordered() {
        let forward = TradingPair::new("BTC", "USDT");
        let backward = TradingPair::new("USDT", "BTC");
        assert_ne!(forward, backward);
        assert_eq!(forward.to_string(), "BTC/USDT");
        assert!(forward.involves(&Currency::new("usdt")));
    }

    #[test]
    fn test_pair_parsing() {
        let pair: TradingPair = "eth/btc".parse().unwrap();
        assert_eq!(pair, TradingPair::new("ETH", "BTC"));

        assert!("ETHBTC".parse::<TradingPair>().is_err());
        assert!("ETH/".parse::<TradingPair>().is_err());
        assert!("A/B/C".parse::<TradingPair>().is_err());
    }

    #[test]
    fn test_pair_as_json_map_key() {
        let mut rates = BTreeMap::new();
        rates.insert(TradingPair::new("BTC", "USDT"), 45_000.0);

        let json = serde_json::to_string(&rates).unwrap();
        assert_eq!(json, r#"{"BTC/USDT":45000.0}"#);

        let back: BTreeMap<TradingPair, f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rates);
    }

    #[derive(Debug, Deserialize)]
    struct Holdings {
        #[serde(deserialize_with = "deserialize_unique_keys")]
        amounts: BTreeMap<Currency, f64>,
    }

    #[test]
    fn test_colliding_keys_rejected() {
        let err = serde_json::from_str::<Holdings>(r#"{"amounts": {"usdt": 1000.0, "USDT": 5.0}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("USDT appears more than once"), "{err}");

        let ok: Holdings =
            serde_json::from_str(r#"{"amounts": {"usdt": 1000.0, "dai": 5.0}}"#).unwrap();
        assert_eq!(ok.amounts[&Currency::new("USDT")], 1000.0);
    }
}
