//! Narrow interface to an external MILP solver.
//!
//! The model builder produces a plain intermediate representation (binary
//! variables, linear constraints, a minimization objective) and hands it to
//! a [`MilpSolver`]. Any engine able to solve that IR is substitutable; the
//! crate ships an adapter for the `good_lp` default solver. The interface is
//! deliberately small: add variables, add constraints, set the objective,
//! solve with an optional time limit, read the status and values.

use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError,
    Solution as LpSolution, SolverModel, Variable,
};
use log::{debug, warn};
use thiserror::Error;

/// Comparison operator of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    Le,
    Ge,
    Eq,
}

/// A linear constraint `sum(coef * var) op rhs` over binary variables.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub terms: Vec<(usize, f64)>,
    pub op: ConstraintOp,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn le(terms: Vec<(usize, f64)>, rhs: f64) -> Self {
        LinearConstraint {
            terms,
            op: ConstraintOp::Le,
            rhs,
        }
    }

    pub fn ge(terms: Vec<(usize, f64)>, rhs: f64) -> Self {
        LinearConstraint {
            terms,
            op: ConstraintOp::Ge,
            rhs,
        }
    }

    pub fn eq(terms: Vec<(usize, f64)>, rhs: f64) -> Self {
        LinearConstraint {
            terms,
            op: ConstraintOp::Eq,
            rhs,
        }
    }
}

/// A minimization problem over binary decision variables.
#[derive(Debug, Clone, Default)]
pub struct MilpModel {
    n_vars: usize,
    objective: Vec<(usize, f64)>,
    constraints: Vec<LinearConstraint>,
}

impl MilpModel {
    pub fn new() -> Self {
        MilpModel::default()
    }

    /// Add one binary decision variable and return its id.
    pub fn add_binary(&mut self) -> usize {
        self.n_vars += 1;
        self.n_vars - 1
    }

    /// Set the objective to minimize.
    pub fn set_objective(&mut self, terms: Vec<(usize, f64)>) {
        self.objective = terms;
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        self.constraints.push(constraint);
    }

    pub fn n_vars(&self) -> usize {
        self.n_vars
    }

    pub fn n_constraints(&self) -> usize {
        self.constraints.len()
    }
}

/// Result of a successful solver call.
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    /// A proven-optimal assignment of values to variables.
    Optimal(Vec<f64>),
    /// The constraint system admits no solution.
    Infeasible,
    /// The time limit expired before optimality was proven. Whatever values
    /// the solver had at that point must not be treated as a result.
    TimedOut,
}

/// Solver-internal failure, carrying the raw status text.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SolverFailure(pub String);

pub trait MilpSolver {
    fn solve(
        &self,
        model: &MilpModel,
        time_limit: Option<f64>,
    ) -> Result<SolveOutcome, SolverFailure>;
}

/// Adapter for the `good_lp` default solver backend.
pub struct DefaultSolver;

impl MilpSolver for DefaultSolver {
    fn solve(
        &self,
        model: &MilpModel,
        time_limit: Option<f64>,
    ) -> Result<SolveOutcome, SolverFailure> {
        if time_limit.is_some() {
            // The bundled backend proves optimality or fails; it has no
            // notion of a wall-clock budget.
            warn!("the default solver backend does not support a time limit; ignoring it");
        }
        debug!(
            "handing model with {} variables and {} constraints to the solver",
            model.n_vars(),
            model.n_constraints()
        );

        let mut vars = ProblemVariables::new();
        let xs: Vec<Variable> = vars.add_vector(variable().binary(), model.n_vars());
        let objective: Expression = model
            .objective
            .iter()
            .map(|&(var, coef)| coef * xs[var])
            .sum();
        let mut lp = vars.minimise(objective).using(default_solver);
        for c in &model.constraints {
            let lhs: Expression = c.terms.iter().map(|&(var, coef)| coef * xs[var]).sum();
            lp.add_constraint(match c.op {
                ConstraintOp::Le => constraint!(lhs <= c.rhs),
                ConstraintOp::Ge => constraint!(lhs >= c.rhs),
                ConstraintOp::Eq => constraint!(lhs == c.rhs),
            });
        }

        match lp.solve() {
            Ok(solution) => Ok(SolveOutcome::Optimal(
                xs.iter().map(|&x| solution.value(x)).collect(),
            )),
            Err(ResolutionError::Infeasible) => Ok(SolveOutcome::Infeasible),
            Err(other) => Err(SolverFailure(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_float_eq::assert_float_absolute_eq;

    use super::*;

    #[test]
    fn minimizes_a_tiny_assignment() {
        // Two variables, pick exactly one, the cheaper wins.
        let mut model = MilpModel::new();
        let a = model.add_binary();
        let b = model.add_binary();
        model.set_objective(vec![(a, 2.0), (b, 1.0)]);
        model.add_constraint(LinearConstraint::eq(vec![(a, 1.0), (b, 1.0)], 1.0));

        let outcome = DefaultSolver.solve(&model, None).unwrap();
        match outcome {
            SolveOutcome::Optimal(values) => {
                assert_float_absolute_eq!(values[a], 0.0, 1e-4);
                assert_float_absolute_eq!(values[b], 1.0, 1e-4);
            }
            other => panic!("expected an optimal outcome, got {:?}", other),
        }
    }

    #[test]
    fn reports_infeasibility() {
        // x <= 0 and x >= 1 cannot hold at once.
        let mut model = MilpModel::new();
        let x = model.add_binary();
        model.set_objective(vec![(x, 1.0)]);
        model.add_constraint(LinearConstraint::le(vec![(x, 1.0)], 0.0));
        model.add_constraint(LinearConstraint::ge(vec![(x, 1.0)], 1.0));

        let outcome = DefaultSolver.solve(&model, None).unwrap();
        assert!(matches!(outcome, SolveOutcome::Infeasible));
    }
}
