//! Implements a solver interface for Clarabel
//!
//! Clarabel is an interior point solver, so it only handles continuous variables. It is
//! used for the pure linear programs (production scores, flux balance checks).
use ::clarabel::algebra::CscMatrix;
use ::clarabel::solver::{DefaultSettings, DefaultSolver, IPSolver, SolverStatus, SupportedConeT};
use nalgebra_sparse::{coo::CooMatrix, csc::CscMatrix as SparseCsc};
use tracing::trace;

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::{LinearProgram, Solver, SolverError};
use crate::optimize::variable::VariableType;
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// Clarabel backend, buffers the problem and builds the conic form when solving
#[derive(Debug, Clone, Default)]
pub struct ClarabelSolver {
    program: LinearProgram,
}

/// Rows of the conic form `A x + s = b`, split by cone
#[derive(Default)]
struct ConicRows {
    /// Rows in the zero cone, `a x = b`
    zero: Vec<(Vec<(usize, f64)>, f64)>,
    /// Rows in the non-negative cone, `a x <= b`
    nonneg: Vec<(Vec<(usize, f64)>, f64)>,
}

impl ConicRows {
    fn push_bounds(&mut self, terms: Vec<(usize, f64)>, lower_bound: f64, upper_bound: f64) {
        if lower_bound == upper_bound && lower_bound.is_finite() {
            self.zero.push((terms, upper_bound));
            return;
        }
        if upper_bound.is_finite() {
            self.nonneg.push((terms.clone(), upper_bound));
        }
        if lower_bound.is_finite() {
            let negated = terms.into_iter().map(|(i, c)| (i, -c)).collect();
            self.nonneg.push((negated, -lower_bound));
        }
    }
}

impl ClarabelSolver {
    fn conic_rows(&self) -> ConicRows {
        let mut rows = ConicRows::default();
        for row in &self.program.rows {
            rows.push_bounds(row.terms.clone(), row.lower_bound, row.upper_bound);
        }
        for (idx, (_, (_, lb, ub))) in self.program.variables.iter().enumerate() {
            rows.push_bounds(vec![(idx, 1.)], *lb, *ub);
        }
        rows
    }
}

fn map_status(status: SolverStatus) -> OptimizationStatus {
    match status {
        SolverStatus::Solved => OptimizationStatus::Optimal,
        SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
            OptimizationStatus::Infeasible
        }
        SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
            OptimizationStatus::Unbounded
        }
        SolverStatus::NumericalError => OptimizationStatus::NumericalError,
        SolverStatus::Unsolved => OptimizationStatus::Unoptimized,
        _ => OptimizationStatus::SolverHalted,
    }
}

impl Solver for ClarabelSolver {
    fn integer_variable_capable(&self) -> bool {
        false
    }

    fn binary_variable_capable(&self) -> bool {
        false
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

    fn add_binary_variable(&mut self, _id: &str) -> Result<(), SolverError> {
        Err(SolverError::UnsupportedVariableType(VariableType::Binary))
    }

    fn add_integer_variable(
        &mut self,
        _id: &str,
        _lower_bound: f64,
        _upper_bound: f64,
    ) -> Result<(), SolverError> {
        Err(SolverError::UnsupportedVariableType(VariableType::Integer))
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
        let n = self.program.variables.len();
        let rows = self.conic_rows();
        let num_zero = rows.zero.len();
        // Clarabel needs at least one row, a trivial 0 <= 0 keeps empty problems well formed
        let num_nonneg = rows.nonneg.len().max(if num_zero == 0 { 1 } else { 0 });
        let m = num_zero + num_nonneg;

        let mut coo = CooMatrix::new(m, n);
        let mut b = vec![0.; m];
        for (row_idx, (terms, rhs)) in rows.zero.iter().chain(rows.nonneg.iter()).enumerate() {
            for (col, coef) in terms {
                coo.push(row_idx, *col, *coef);
            }
            b[row_idx] = *rhs;
        }
        let csc = SparseCsc::from(&coo);
        let a = CscMatrix::new(
            m,
            n,
            csc.col_offsets().to_vec(),
            csc.row_indices().to_vec(),
            csc.values().to_vec(),
        );
        let p = CscMatrix::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());
        let q: Vec<f64> = match self.program.sense {
            ObjectiveSense::Minimize => self.program.objective.clone(),
            ObjectiveSense::Maximize => self.program.objective.iter().map(|c| -c).collect(),
        };
        let mut cones = Vec::new();
        if num_zero > 0 {
            cones.push(SupportedConeT::ZeroConeT(num_zero));
        }
        if num_nonneg > 0 {
            cones.push(SupportedConeT::NonnegativeConeT(num_nonneg));
        }

        let mut settings = DefaultSettings::<f64>::default();
        settings.verbose = false;
        trace!(variables = n, rows = m, "Solving with Clarabel");
        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = map_status(solver.solution.status);
        match status {
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal => {
                let x = solver.solution.x.clone();
                Ok(ProblemSolution {
                    status,
                    objective_value: Some(self.program.objective_value(&x)),
                    variable_values: Some(self.program.label_values(&x)),
                })
            }
            _ => Ok(ProblemSolution::from_status(status)),
        }
    }
}
