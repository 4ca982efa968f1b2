//! LP solver adapter
//!
//! The simplex method itself is delegated to `microlp`; this module only
//! marshals a [`LinearProgram`] in and the status and values back out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use microlp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};
use tracing::{debug, warn};
use triarb_core::AllocationStatus;

use crate::program::{Comparison, LinearProgram};

/// Status reported by a solver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    Optimal,
    Infeasible,
    Unbounded,
    NotSolved,
}

impl From<SolverStatus> for AllocationStatus {
    fn from(status: SolverStatus) -> Self {
        match status {
            SolverStatus::Optimal => AllocationStatus::Optimal,
            SolverStatus::Infeasible => AllocationStatus::Infeasible,
            SolverStatus::Unbounded => AllocationStatus::Unbounded,
            SolverStatus::NotSolved => AllocationStatus::NotSolved,
        }
    }
}

/// Raw solver answer
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome {
    pub status: SolverStatus,
    /// One value per variable when optimal, empty otherwise
    pub values: Vec<f64>,
    pub objective_value: f64,
}

impl SolverOutcome {
    pub fn optimal(values: Vec<f64>, objective_value: f64) -> Self {
        Self {
            status: SolverStatus::Optimal,
            values,
            objective_value,
        }
    }

    pub fn failed(status: SolverStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective_value: 0.0,
        }
    }
}

/// External LP solving capability
pub trait LpSolver: Send + Sync {
    fn name(&self) -> &'static str;
    fn solve(&self, program: &LinearProgram) -> SolverOutcome;
}

/// Sparse simplex solver backed by `microlp`
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplexSolver;

impl SimplexSolver {
    pub fn new() -> Self {
        Self
    }
}

impl LpSolver for SimplexSolver {
    fn name(&self) -> &'static str {
        "microlp-simplex"
    }

    fn solve(&self, program: &LinearProgram) -> SolverOutcome {
        let start = Instant::now();
        let mut problem = Problem::new(OptimizationDirection::Maximize);

        let vars: Vec<_> = program
            .objective()
            .iter()
            .map(|&coeff| problem.add_var(coeff, (0.0, f64::INFINITY)))
            .collect();

        for constraint in program.constraints() {
            let mut expr = LinearExpr::empty();
            for &(var, coeff) in &constraint.terms {
                expr.add(vars[var], coeff);
            }
            let op = match constraint.comparison {
                Comparison::Le => ComparisonOp::Le,
                Comparison::Ge => ComparisonOp::Ge,
                Comparison::Eq => ComparisonOp::Eq,
            };
            problem.add_constraint(expr, op, constraint.rhs);
        }

        let outcome = match problem.solve() {
            Ok(solution) => {
                let values = vars.iter().map(|&var| solution[var]).collect();
                SolverOutcome::optimal(values, solution.objective())
            }
            Err(microlp::Error::Infeasible) => SolverOutcome::failed(SolverStatus::Infeasible),
            Err(microlp::Error::Unbounded) => SolverOutcome::failed(SolverStatus::Unbounded),
            #[allow(unreachable_patterns)]
            Err(e) => {
                warn!("Simplex solver gave up: {}", e);
                SolverOutcome::failed(SolverStatus::NotSolved)
            }
        };

        debug!(
            "Solved {} vars x {} rows: {:?} in {:?}",
            program.num_variables(),
            program.constraints().len(),
            outcome.status,
            start.elapsed()
        );

        outcome
    }
}

/// Run a solve on a blocking worker and give up after `deadline`.
///
/// An expired deadline or a panicked worker is reported as not solved. The
/// worker itself cannot be interrupted and finishes in the background.
pub async fn solve_with_deadline(
    solver: Arc<dyn LpSolver>,
    program: LinearProgram,
    deadline: Duration,
) -> SolverOutcome {
    let task = tokio::task::spawn_blocking(move || solver.solve(&program));

    match tokio::time::timeout(deadline, task).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            warn!("Solver worker failed: {}", e);
            SolverOutcome::failed(SolverStatus::NotSolved)
        }
        Err(_) => {
            warn!("Solver missed its {:?} deadline", deadline);
            SolverOutcome::failed(SolverStatus::NotSolved)
        }
    }
}
