//! Core types for the triangular arbitrage allocator
//!
//! This crate provides shared types used across all components:
//! - Currency and trading pair identifiers
//! - Triangular opportunities and the cycle profit model
//! - Portfolio constraints
//! - Allocation results, execution plans and risk assessments
//! - Optimizer configuration

pub mod types;
pub mod profit;
pub mod opportunities;
pub mod portfolio;
pub mod allocation;
pub mod plan;
pub mod risk;
pub mod config;
pub mod errors;

pub use types::*;
pub use profit::*;
pub use opportunities::*;
pub use portfolio::*;
pub use allocation::*;
pub use plan::*;
pub use risk::*;
pub use config::*;
pub use errors::*;
