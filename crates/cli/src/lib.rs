//! Command-line driver for the allocator
//!
//! Loads a scenario, solves it under the configured deadline and reports the
//! allocation, execution plan and market risk as JSON. Scenarios with later
//! market periods also get a per-period breakdown and totals.

pub mod report;
pub mod scenario;
pub mod settings;

pub use report::{run, CycleCosts, MultiPeriodSummary, PeriodReport, RunReport};
pub use scenario::{Period, PreparedPeriod, Requote, Scenario};
pub use settings::{LogFormat, Settings};
