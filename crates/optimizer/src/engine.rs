//! Allocation engine: validate, build, solve, extract

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};
use triarb_core::{
    AllocationResult, MarketSnapshot, Opportunity, OptimizerConfig, OptimizerError, OptimizerResult,
    PortfolioConstraints,
};

use crate::builder::ConstraintBuilder;
use crate::extract::SolutionExtractor;
use crate::models::{
    HoldingFlowModel, LinearLiquidityModel, LiquidityModel, PassThroughHoldingModel,
};
use crate::program::LinearProgram;
use crate::solver::{solve_with_deadline, LpSolver, SimplexSolver, SolverOutcome};

/// Stateless portfolio optimizer.
///
/// Holds configuration and shared collaborators only. Every call builds its
/// own program and variables, so one instance can serve concurrent callers.
pub struct ArbitrageOptimizer {
    config: OptimizerConfig,
    solver: Arc<dyn LpSolver>,
    liquidity_model: Arc<dyn LiquidityModel>,
    holding_model: Arc<dyn HoldingFlowModel>,
}

impl ArbitrageOptimizer {
    pub fn new(config: OptimizerConfig) -> OptimizerResult<Self> {
        config.validate().map_err(OptimizerError::InvalidConfig)?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: OptimizerConfig) -> Self {
        Self {
            liquidity_model: Arc::new(LinearLiquidityModel::new(&config.liquidity)),
            holding_model: Arc::new(PassThroughHoldingModel::new(&config.holding)),
            solver: Arc::new(SimplexSolver::new()),
            config,
        }
    }

    pub fn with_solver(mut self, solver: Arc<dyn LpSolver>) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_liquidity_model(mut self, model: Arc<dyn LiquidityModel>) -> Self {
        self.liquidity_model = model;
        self
    }

    pub fn with_holding_model(mut self, model: Arc<dyn HoldingFlowModel>) -> Self {
        self.holding_model = model;
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Validate inputs and assemble the program. `None` when there is
    /// nothing to allocate.
    pub fn build_program(
        &self,
        opportunities: &[Opportunity],
        constraints: &PortfolioConstraints,
    ) -> OptimizerResult<Option<LinearProgram>> {
        if opportunities.is_empty() {
            warn!("No arbitrage opportunities provided");
            return Ok(None);
        }

        constraints.validate().map_err(OptimizerError::InvalidConstraints)?;
        for (index, opp) in opportunities.iter().enumerate() {
            opp.validate()
                .map_err(|source| OptimizerError::InvalidOpportunity { index, source })?;
        }

        let builder =
            ConstraintBuilder::new(self.liquidity_model.as_ref(), self.holding_model.as_ref());
        let program = builder.build(opportunities, constraints);

        debug!(
            "Built program: {} variables, {} constraints (liquidity model {}, holding model {})",
            program.num_variables(),
            program.constraints().len(),
            self.liquidity_model.name(),
            self.holding_model.name()
        );

        Ok(Some(program))
    }

    /// Solve one snapshot synchronously
    pub fn optimize(
        &self,
        opportunities: &[Opportunity],
        constraints: &PortfolioConstraints,
    ) -> OptimizerResult<AllocationResult> {
        let start = Instant::now();
        let Some(program) = self.build_program(opportunities, constraints)? else {
            return Ok(AllocationResult::no_opportunities());
        };

        info!(
            "Solving allocation over {} opportunities with {}",
            opportunities.len(),
            self.solver.name()
        );
        let outcome = self.solver.solve(&program);

        Ok(self.finish(opportunities, &outcome, start))
    }

    /// Solve one snapshot on a blocking worker, bounded by the configured
    /// timeout. A missed deadline yields a not-solved result.
    pub async fn optimize_with_deadline(
        &self,
        opportunities: &[Opportunity],
        constraints: &PortfolioConstraints,
    ) -> OptimizerResult<AllocationResult> {
        let Some(deadline) = self.config.solve_timeout() else {
            return self.optimize(opportunities, constraints);
        };

        let start = Instant::now();
        let Some(program) = self.build_program(opportunities, constraints)? else {
            return Ok(AllocationResult::no_opportunities());
        };

        info!(
            "Solving allocation over {} opportunities with {} (deadline {:?})",
            opportunities.len(),
            self.solver.name(),
            deadline
        );
        let outcome = solve_with_deadline(Arc::clone(&self.solver), program, deadline).await;

        Ok(self.finish(opportunities, &outcome, start))
    }

    /// Solve independent snapshots in parallel, one program each
    pub fn optimize_batch(
        &self,
        snapshots: &[MarketSnapshot],
    ) -> Vec<OptimizerResult<AllocationResult>> {
        snapshots
            .par_iter()
            .map(|snapshot| self.optimize(&snapshot.opportunities, &snapshot.constraints))
            .collect()
    }

    fn finish(
        &self,
        opportunities: &[Opportunity],
        outcome: &SolverOutcome,
        start: Instant,
    ) -> AllocationResult {
        let extractor = SolutionExtractor::new(self.config.materiality_threshold);
        let result = extractor.extract(opportunities, outcome);

        if result.is_optimal() {
            info!(
                "Optimization successful: {} funded, invested {:.4}, expected profit {:.4} in {:?}",
                result.investments().len(),
                result.total_invested(),
                result.total_expected_profit(),
                start.elapsed()
            );
        }

        result
    }
}

impl Default for ArbitrageOptimizer {
    fn default() -> Self {
        Self::from_valid_config(OptimizerConfig::default())
    }
}

/// Solve with default configuration and the simplex solver
pub fn optimize(
    opportunities: &[Opportunity],
    constraints: &PortfolioConstraints,
) -> OptimizerResult<AllocationResult> {
    ArbitrageOptimizer::default().optimize(opportunities, constraints)
}
