//! Error types

use thiserror::Error;

use crate::{Currency, TradingPair};

/// Core error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("Invalid trading pair: {0:?} (expected ASSET/COUNTER)")]
    InvalidPair(String),

    #[error("Cycle {0} repeats a currency")]
    DegenerateCycle(String),

    #[error("Cycle {cycle} has no {field} for {pair}")]
    MissingPair {
        cycle: String,
        field: &'static str,
        pair: TradingPair,
    },

    #[error("Cycle {cycle} has a {field} for {pair}, which is not one of its legs")]
    UnexpectedPair {
        cycle: String,
        field: &'static str,
        pair: TradingPair,
    },

    #[error("Rate for {pair} must be positive and finite, got {rate}")]
    InvalidRate { pair: TradingPair, rate: f64 },

    #[error("Fee for {pair} must lie in [0, 1), got {fee}")]
    InvalidFee { pair: TradingPair, fee: f64 },

    #[error("Liquidity for {pair} must be non-negative, got {liquidity}")]
    InvalidLiquidity { pair: TradingPair, liquidity: f64 },

    #[error("Expected profit must be finite, got {0}")]
    InvalidExpectedProfit(f64),

    #[error("Confidence score must lie in (0, 1], got {0}")]
    InvalidConfidence(f64),

    #[error("{kind} for {currency} must be non-negative and finite, got {amount}")]
    InvalidAmount {
        kind: &'static str,
        currency: Currency,
        amount: f64,
    },

    #[error("{0} appears more than once after normalization")]
    DuplicateKey(String),

    #[error("Risk tolerance must lie in [0, 1], got {0}")]
    InvalidRiskTolerance(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Optimizer errors
///
/// Only malformed input is an error. Infeasible or unsolved programs are
/// reported through the allocation status instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizerError {
    #[error("Opportunity #{index} rejected: {source}")]
    InvalidOpportunity { index: usize, source: CoreError },

    #[error("Portfolio constraints rejected: {0}")]
    InvalidConstraints(#[source] CoreError),

    #[error("Optimizer configuration rejected: {0}")]
    InvalidConfig(#[source] CoreError),
}

/// Market condition errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketError {
    #[error("{field} must lie in [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Market delta for {field} must be finite, got {value}")]
    NonFiniteDelta { field: &'static str, value: f64 },
}

/// Result type alias
pub type CoreResult<T> = Result<T, CoreError>;
pub type OptimizerResult<T> = Result<T, OptimizerError>;
pub type MarketResult<T> = Result<T, MarketError>;
