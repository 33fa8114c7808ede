//! Implements a solver interface for microlp
//!
//! microlp is a pure rust simplex solver with branch and bound support for integer and
//! binary variables, it is the default backend for the mixed integer problems.
use ::microlp::{ComparisonOp, Error as MicrolpError, OptimizationDirection, Problem, Variable};
use tracing::trace;

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::{LinearProgram, Solver, SolverError};
use crate::optimize::variable::VariableType;
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// microlp backend, buffers the problem and builds the microlp problem when solving
#[derive(Debug, Clone, Default)]
pub struct MicrolpSolver {
    program: LinearProgram,
}

fn integer_bound(bound: f64) -> i32 {
    if bound.is_finite() {
        bound.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32
    } else if bound > 0. {
        i32::MAX
    } else {
        i32::MIN
    }
}

impl MicrolpSolver {
    /// Build the microlp problem, or return None if a constant row makes it trivially
    /// infeasible
    fn build(&self) -> Option<(Problem, Vec<Variable>)> {
        let direction = match self.program.sense {
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
        };
        let mut problem = Problem::new(direction);
        let vars: Vec<Variable> = self
            .program
            .variables
            .values()
            .zip(&self.program.objective)
            .map(|((var_type, lb, ub), obj)| match var_type {
                VariableType::Continuous => problem.add_var(*obj, (*lb, *ub)),
                VariableType::Integer => {
                    problem.add_integer_var(*obj, (integer_bound(*lb), integer_bound(*ub)))
                }
                VariableType::Binary => problem.add_binary_var(*obj),
            })
            .collect();

        for row in &self.program.rows {
            if row.terms.is_empty() {
                if row.lower_bound > 0. || row.upper_bound < 0. {
                    return None;
                }
                continue;
            }
            let expr: Vec<(Variable, f64)> = row
                .terms
                .iter()
                .map(|(idx, coef)| (vars[*idx], *coef))
                .collect();
            if row.lower_bound == row.upper_bound {
                problem.add_constraint(expr.as_slice(), ComparisonOp::Eq, row.upper_bound);
                continue;
            }
            if row.upper_bound.is_finite() {
                problem.add_constraint(expr.as_slice(), ComparisonOp::Le, row.upper_bound);
            }
            if row.lower_bound.is_finite() {
                problem.add_constraint(expr.as_slice(), ComparisonOp::Ge, row.lower_bound);
            }
        }
        Some((problem, vars))
    }
}

impl Solver for MicrolpSolver {
    fn integer_variable_capable(&self) -> bool {
        true
    }

    fn binary_variable_capable(&self) -> bool {
        true
    }

    fn add_continuous_variable(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        self.program
            .add_variable(id, VariableType::Continuous, lower_bound, upper_bound)
    }

    fn add_binary_variable(&mut self, id: &str) -> Result<(), SolverError> {
        self.program.add_variable(id, VariableType::Binary, 0., 1.)
    }

    fn add_integer_variable(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        self.program
            .add_variable(id, VariableType::Integer, lower_bound, upper_bound)
    }

    fn add_equality_constraint(
        &mut self,
        id: &str,
        variables: Vec<&str>,
        coefficients: Vec<f64>,
        equals: f64,
    ) -> Result<(), SolverError> {
        self.program
            .add_row(id, variables, coefficients, equals, equals)
    }

    fn add_inequality_constraint(
        &mut self,
        id: &str,
        variables: Vec<&str>,
        coefficients: Vec<f64>,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        self.program
            .add_row(id, variables, coefficients, lower_bound, upper_bound)
    }

    fn add_linear_objective_term(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), SolverError> {
        self.program.add_objective_term(variable_id, coefficient)
    }

    fn set_objective_sense(&mut self, objective_sense: ObjectiveSense) -> Result<(), SolverError> {
        self.program.sense = objective_sense;
        Ok(())
    }

    fn solve(&mut self) -> Result<ProblemSolution, SolverError> {
        let Some((problem, vars)) = self.build() else {
            return Ok(ProblemSolution::from_status(OptimizationStatus::Infeasible));
        };
        trace!(
            variables = vars.len(),
            rows = self.program.rows.len(),
            "Solving with microlp"
        );
        match problem.solve() {
            Ok(solution) => {
                let x: Vec<f64> = vars.iter().map(|v| *solution.var_value(*v)).collect();
                Ok(ProblemSolution {
                    status: OptimizationStatus::Optimal,
                    objective_value: Some(self.program.objective_value(&x)),
                    variable_values: Some(self.program.label_values(&x)),
                })
            }
            Err(MicrolpError::Infeasible) => {
                Ok(ProblemSolution::from_status(OptimizationStatus::Infeasible))
            }
            Err(MicrolpError::Unbounded) => {
                Ok(ProblemSolution::from_status(OptimizationStatus::Unbounded))
            }
            Err(err) => Err(SolverError::Internal(err.to_string())),
        }
    }
}
