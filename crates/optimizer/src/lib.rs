//! Portfolio allocation engine for triangular arbitrage
//!
//! Pipeline:
//! - Constraint builder: opportunities + portfolio limits -> linear program
//! - Solver adapter: linear program -> status and variable values
//! - Solution extractor: raw values -> allocation result
//! - Execution planner: allocation result -> ordered trade legs

pub mod program;
pub mod models;
pub mod builder;
pub mod solver;
pub mod extract;
pub mod planner;
pub mod engine;

pub use program::{Comparison, ConstraintFamily, LinearConstraint, LinearProgram};
pub use models::{HoldingFlowModel, LiquidityModel, LinearLiquidityModel, PassThroughHoldingModel};
pub use builder::ConstraintBuilder;
pub use solver::{solve_with_deadline, LpSolver, SimplexSolver, SolverOutcome, SolverStatus};
pub use extract::SolutionExtractor;
pub use planner::plan_execution;
pub use engine::{optimize, ArbitrageOptimizer};
