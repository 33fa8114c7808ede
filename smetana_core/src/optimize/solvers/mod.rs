//! Interfaces to the optimization backends
//!
//! Every backend implements [`Solver`]. A [`Problem`](crate::optimize::problem::Problem) is
//! loaded into a fresh solver instance each time it is optimized, so backends never need to
//! support removing variables or constraints.
pub mod clarabel;
#[cfg(feature = "microlp")]
pub mod microlp;

use indexmap::IndexMap;
use thiserror::Error;

use crate::configuration::SolverBackend;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::variable::VariableType;
use crate::optimize::ProblemSolution;

/// Trait implemented by the optimization backends
pub trait Solver {
    /// Whether the solver can handle integer variables
    fn integer_variable_capable(&self) -> bool;

    /// Whether the solver can handle binary variables
    fn binary_variable_capable(&self) -> bool;

    /// Add a continuous variable to the solver
    fn add_continuous_variable(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError>;

    /// Add a binary variable to the solver
    fn add_binary_variable(&mut self, id: &str) -> Result<(), SolverError>;

    /// Add an integer variable to the solver
    fn add_integer_variable(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError>;

    /// Add an equality constraint, sum(coefficients*variables) = equals
    fn add_equality_constraint(
        &mut self,
        id: &str,
        variables: Vec<&str>,
        coefficients: Vec<f64>,
        equals: f64,
    ) -> Result<(), SolverError>;

    /// Add an inequality constraint, lower_bound <= sum(coefficients*variables) <= upper_bound
    fn add_inequality_constraint(
        &mut self,
        id: &str,
        variables: Vec<&str>,
        coefficients: Vec<f64>,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError>;

    /// Add a linear term to the objective
    fn add_linear_objective_term(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), SolverError>;

    /// Set whether the objective should be maximized or minimized
    fn set_objective_sense(&mut self, objective_sense: ObjectiveSense) -> Result<(), SolverError>;

    /// Solve the loaded problem
    ///
    /// Infeasible or unbounded problems are not errors, they are reported through the
    /// status of the returned solution
    fn solve(&mut self) -> Result<ProblemSolution, SolverError>;
}

/// Create a new, empty, solver instance for a backend
pub fn new_solver(backend: SolverBackend) -> Result<Box<dyn Solver>, SolverError> {
    match backend {
        SolverBackend::Clarabel => Ok(Box::new(clarabel::ClarabelSolver::default())),
        #[cfg(feature = "microlp")]
        SolverBackend::Microlp => Ok(Box::new(microlp::MicrolpSolver::default())),
        #[cfg(not(feature = "microlp"))]
        SolverBackend::Microlp => Err(SolverError::BackendUnavailable("microlp")),
    }
}

/// Errors raised by the solver backends
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Requested backend was not compiled in
    #[error("Solver backend {0} is not available, enable the corresponding feature")]
    BackendUnavailable(&'static str),
    /// Backend can't handle a variable type
    #[error("Solver does not support {0} variables")]
    UnsupportedVariableType(VariableType),
    /// Variable added twice
    #[error("Variable {0} was already added to the solver")]
    DuplicateVariable(String),
    /// Constraint or objective refers to a variable the solver doesn't know about
    #[error("Variable {0} is not known to the solver")]
    UnknownVariable(String),
    /// Mismatched variables and coefficients
    #[error("Constraint {0} has a different number of variables and coefficients")]
    MalformedConstraint(String),
    /// The backend failed for a reason other than infeasibility or unboundedness
    #[error("Solver failed: {0}")]
    Internal(String),
}

/// Buffer of a linear (mixed integer) program shared by the backends, which all build their
/// native representation at solve time
#[derive(Debug, Clone)]
pub(crate) struct LinearProgram {
    /// Variables keyed by id, holding type and bounds
    pub(crate) variables: IndexMap<String, (VariableType, f64, f64)>,
    /// Constraint rows, terms hold variable indices
    pub(crate) rows: Vec<Row>,
    /// Objective coefficient of every variable
    pub(crate) objective: Vec<f64>,
    pub(crate) sense: ObjectiveSense,
}

#[derive(Debug, Clone)]
pub(crate) struct Row {
    pub(crate) terms: Vec<(usize, f64)>,
    pub(crate) lower_bound: f64,
    pub(crate) upper_bound: f64,
}

impl Default for LinearProgram {
    fn default() -> Self {
        LinearProgram {
            variables: IndexMap::new(),
            rows: Vec::new(),
            objective: Vec::new(),
            sense: ObjectiveSense::Maximize,
        }
    }
}

impl LinearProgram {
    pub(crate) fn add_variable(
        &mut self,
        id: &str,
        variable_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        if self.variables.contains_key(id) {
            return Err(SolverError::DuplicateVariable(id.to_string()));
        }
        self.variables
            .insert(id.to_string(), (variable_type, lower_bound, upper_bound));
        self.objective.push(0.);
        Ok(())
    }

    pub(crate) fn add_row(
        &mut self,
        id: &str,
        variables: Vec<&str>,
        coefficients: Vec<f64>,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), SolverError> {
        if variables.len() != coefficients.len() {
            return Err(SolverError::MalformedConstraint(id.to_string()));
        }
        let mut terms = Vec::with_capacity(variables.len());
        for (var, coef) in variables.into_iter().zip(coefficients) {
            match self.variables.get_index_of(var) {
                Some(idx) => terms.push((idx, coef)),
                None => return Err(SolverError::UnknownVariable(var.to_string())),
            }
        }
        self.rows.push(Row {
            terms,
            lower_bound,
            upper_bound,
        });
        Ok(())
    }

    pub(crate) fn add_objective_term(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), SolverError> {
        match self.variables.get_index_of(variable_id) {
            Some(idx) => {
                self.objective[idx] += coefficient;
                Ok(())
            }
            None => Err(SolverError::UnknownVariable(variable_id.to_string())),
        }
    }

    /// Objective value of a candidate point
    pub(crate) fn objective_value(&self, x: &[f64]) -> f64 {
        self.objective.iter().zip(x).map(|(c, v)| c * v).sum()
    }

    /// Key the values of a solution vector by variable id
    pub(crate) fn label_values(&self, x: &[f64]) -> IndexMap<String, f64> {
        self.variables
            .keys()
            .zip(x)
            .map(|(id, v)| (id.clone(), *v))
            .collect()
    }
}
