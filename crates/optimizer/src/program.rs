//! Solver-independent linear program representation

use std::fmt;

/// Constraint sense
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Le,
    Ge,
    Eq,
}

/// Which portfolio rule produced a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintFamily {
    Liquidity,
    Balance,
    MinHolding,
    PositionCap,
    Exposure,
}

impl fmt::Display for ConstraintFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintFamily::Liquidity => "liquidity",
            ConstraintFamily::Balance => "balance",
            ConstraintFamily::MinHolding => "min_holding",
            ConstraintFamily::PositionCap => "position_cap",
            ConstraintFamily::Exposure => "exposure",
        };
        f.write_str(name)
    }
}

/// `Σ coeff * x[var] (<=|>=|=) rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub family: ConstraintFamily,
    /// Pair or currency the row belongs to
    pub label: String,
    /// (variable index, coefficient)
    pub terms: Vec<(usize, f64)>,
    pub comparison: Comparison,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|&(var, coeff)| coeff * values[var]).sum()
    }

    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.lhs(values);
        match self.comparison {
            Comparison::Le => lhs <= self.rhs + tolerance,
            Comparison::Ge => lhs >= self.rhs - tolerance,
            Comparison::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

/// Maximization problem over non-negative continuous variables, one per
/// opportunity
#[derive(Debug, Clone, PartialEq)]
pub struct LinearProgram {
    objective: Vec<f64>,
    constraints: Vec<LinearConstraint>,
}

impl LinearProgram {
    pub fn new(objective: Vec<f64>) -> Self {
        Self {
            objective,
            constraints: Vec::new(),
        }
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        debug_assert!(constraint.terms.iter().all(|&(var, _)| var < self.objective.len()));
        self.constraints.push(constraint);
    }

    pub fn num_variables(&self) -> usize {
        self.objective.len()
    }

    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn constraints_of(
        &self,
        family: ConstraintFamily,
    ) -> impl Iterator<Item = &LinearConstraint> {
        self.constraints.iter().filter(move |c| c.family == family)
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.iter().zip(values).map(|(c, x)| c * x).sum()
    }

    /// Check bounds and every row against an assignment
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        values.len() == self.num_variables()
            && values.iter().all(|&x| x >= -tolerance)
            && self.constraints.iter().all(|c| c.is_satisfied(values, tolerance))
    }
}
