//! Provides struct representing an optimization problem
use indexmap::IndexMap;
use thiserror::Error;
use tracing::trace;

use crate::configuration;
use crate::optimize::constraint::Constraint;
use crate::optimize::objective::{Objective, ObjectiveSense};
use crate::optimize::solvers::{new_solver, SolverError};
use crate::optimize::variable::{Variable, VariableBuilder, VariableType};
use crate::optimize::{OptimizationStatus, ProblemSolution};

/// An optimization problem
///
/// The problem owns its variables, constraints and objective. It is loaded into a fresh
/// backend every time [`Problem::optimize`] is called, so constraints can be freely added
/// and removed between solves.
#[derive(Debug, Clone)]
pub struct Problem {
    /// Objective to optimize
    objective: Objective,
    /// Variables of the optimization problem
    variables: IndexMap<String, Variable>,
    /// Constraints of the optimization problem
    constraints: IndexMap<String, Constraint>,
    /// Status of the last optimization
    status: OptimizationStatus,
    /// Type of problem
    problem_type: ProblemType,
}

impl Problem {
    // region Creation Functions
    /// Create a new optimization problem
    pub fn new(objective_sense: ObjectiveSense) -> Self {
        Self {
            objective: Objective::new(objective_sense),
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
            status: OptimizationStatus::Unoptimized,
            problem_type: ProblemType::LinearContinuous,
        }
    }

    /// Create a new maximization problem
    pub fn new_maximization() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new minimization problem
    pub fn new_minimization() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }
    // endregion Creation Functions

    // region Update Objective
    /// Update the objective sense of the problem
    pub fn update_objective_sense(&mut self, sense: ObjectiveSense) {
        self.objective.set_sense(sense);
    }

    /// Replace the objective with new linear terms and sense
    pub fn set_objective<'a, I>(&mut self, terms: I, sense: ObjectiveSense) -> Result<(), ProblemError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        self.objective.remove_all_terms();
        self.objective.set_sense(sense);
        for (id, coef) in terms {
            self.add_new_linear_objective_term_by_id(id, coef)?;
        }
        Ok(())
    }

    /// Add a new linear term to the objective using the variable id
    pub fn add_new_linear_objective_term_by_id(
        &mut self,
        variable_id: &str,
        coefficient: f64,
    ) -> Result<(), ProblemError> {
        if !self.variables.contains_key(variable_id) {
            return Err(ProblemError::NonExistentVariablesInObjective(
                variable_id.to_string(),
            ));
        }
        self.objective.add_linear_term(variable_id, coefficient);
        Ok(())
    }

    /// Remove all terms from the objective
    pub fn remove_all_objective_terms(&mut self) {
        self.objective.remove_all_terms();
    }

    /// Get the objective of the problem
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Swap in a whole objective, returning the previous one
    pub(crate) fn replace_objective(&mut self, objective: Objective) -> Objective {
        std::mem::replace(&mut self.objective, objective)
    }
    // endregion Update Objective

    // region Adding Variables
    /// Add a variable to the optimization problem
    pub fn add_variable(&mut self, mut variable: Variable) -> Result<(), ProblemError> {
        self.validate_variable(&variable)?;
        variable.index = self.variables.len();
        if variable.variable_type != VariableType::Continuous {
            self.problem_type = ProblemType::LinearMixedInteger;
        }
        self.variables.insert(variable.id.clone(), variable);
        Ok(())
    }

    /// Create a new variable and add it to the optimization problem
    pub fn add_new_variable(
        &mut self,
        id: &str,
        name: Option<&str>,
        variable_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        let mut builder = VariableBuilder::default();
        builder
            .id(id)
            .variable_type(variable_type)
            .lower_bound(lower_bound)
            .upper_bound(upper_bound);
        if let Some(name) = name {
            builder.name(name);
        }
        let variable = builder
            .build()
            .map_err(|err| ProblemError::InvalidVariable(err.to_string()))?;
        self.add_variable(variable)
    }
    // endregion Adding Variables

    // region Adding Constraints
    /// Add a constraint to the problem
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), ProblemError> {
        self.validate_constraint(&constraint)?;
        self.constraints
            .insert(constraint.get_id().to_string(), constraint);
        Ok(())
    }

    /// Create a new equality constraint using variable ids, and add it to the problem
    pub fn add_new_equality_constraint_by_id(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), ProblemError> {
        self.add_constraint(Constraint::new_equality(id, variables, coefficients, equals))
    }

    /// Create a new inequality constraint using variable ids, and add it to the problem
    pub fn add_new_inequality_constraint_by_id(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        self.add_constraint(Constraint::new_inequality(
            id,
            variables,
            coefficients,
            lower_bound,
            upper_bound,
        ))
    }
    // endregion Adding Constraints

    // region Update variable bounds
    /// Update the bounds of a variable
    pub fn update_variable_bounds(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        if lower_bound > upper_bound {
            return Err(ProblemError::InvalidVariableBounds(id.to_string()));
        }
        match self.variables.get_mut(id) {
            Some(var) => {
                var.lower_bound = lower_bound;
                var.upper_bound = upper_bound;
                Ok(())
            }
            None => Err(ProblemError::NonExistentVariable(id.to_string())),
        }
    }

    /// Get the bounds of a variable
    pub fn get_variable_bounds(&self, id: &str) -> Option<(f64, f64)> {
        self.variables
            .get(id)
            .map(|var| (var.lower_bound, var.upper_bound))
    }
    // endregion Update variable bounds

    // region Removal
    /// Remove a variable from the problem, will also remove it as a term from all constraints
    /// and any terms in the objective that include this variable
    pub fn delete_variable(&mut self, variable_id: &str) -> Result<(), ProblemError> {
        if self.variables.shift_remove(variable_id).is_none() {
            return Err(ProblemError::NonExistentVariable(variable_id.to_string()));
        }
        self.objective.remove_terms_with_variable(variable_id);
        self.constraints
            .values_mut()
            .for_each(|cons| cons.remove_variable(variable_id));
        self.fix_variable_indices();
        self.fix_problem_type();
        Ok(())
    }

    /// Remove a constraint (by id) from the problem, returning it if it existed
    pub fn remove_constraint(&mut self, constraint_id: &str) -> Option<Constraint> {
        self.constraints.shift_remove(constraint_id)
    }
    // endregion Removal

    // region Accessors
    /// Whether a variable with this id exists in the problem
    pub fn has_variable(&self, id: &str) -> bool {
        self.variables.contains_key(id)
    }

    /// Whether a constraint with this id exists in the problem
    pub fn has_constraint(&self, id: &str) -> bool {
        self.constraints.contains_key(id)
    }

    /// Number of variables in the problem
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Number of constraints in the problem
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Iterate over the variables of the problem
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    /// Type of the problem
    pub fn problem_type(&self) -> ProblemType {
        self.problem_type
    }

    /// Status of the last optimization
    pub fn status(&self) -> OptimizationStatus {
        self.status
    }
    // endregion Accessors

    // region Optimize
    /// Optimize the problem using the backend configured for its problem type
    ///
    /// An infeasible or unbounded problem is not an error, check the status of the
    /// returned solution.
    pub fn optimize(&mut self) -> Result<ProblemSolution, ProblemError> {
        let config = configuration::current();
        let backend = match self.problem_type {
            ProblemType::LinearContinuous => config.lp_solver,
            ProblemType::LinearMixedInteger => config.milp_solver,
        };
        let mut solver = new_solver(backend)?;
        if self.problem_type == ProblemType::LinearMixedInteger
            && !(solver.binary_variable_capable() && solver.integer_variable_capable())
        {
            return Err(ProblemError::UnsupportedProblemType(self.problem_type));
        }
        for var in self.variables.values() {
            match var.variable_type {
                VariableType::Continuous => {
                    solver.add_continuous_variable(&var.id, var.lower_bound, var.upper_bound)?
                }
                VariableType::Integer => {
                    solver.add_integer_variable(&var.id, var.lower_bound, var.upper_bound)?
                }
                VariableType::Binary => solver.add_binary_variable(&var.id)?,
            }
        }
        for cons in self.constraints.values() {
            let variables: Vec<&str> = cons.get_variables().collect();
            let coefficients: Vec<f64> = cons.get_terms().iter().map(|t| t.coefficient).collect();
            match cons {
                Constraint::Equality { id, equals, .. } => {
                    solver.add_equality_constraint(id, variables, coefficients, *equals)?
                }
                Constraint::Inequality {
                    id,
                    lower_bound,
                    upper_bound,
                    ..
                } => solver.add_inequality_constraint(
                    id,
                    variables,
                    coefficients,
                    *lower_bound,
                    *upper_bound,
                )?,
            }
        }
        for (id, coef) in self.objective.terms() {
            solver.add_linear_objective_term(id, coef)?;
        }
        solver.set_objective_sense(self.objective.sense())?;
        trace!(
            variables = self.variables.len(),
            constraints = self.constraints.len(),
            backend = ?backend,
            "Optimizing problem"
        );
        let solution = solver.solve()?;
        self.status = solution.status;
        Ok(solution)
    }
    // endregion Optimize

    // region Validation Functions
    /// Check that a variable to be added is valid to add to this problem
    fn validate_variable(&self, variable: &Variable) -> Result<(), ProblemError> {
        if self.variables.contains_key(&variable.id) {
            return Err(ProblemError::VariableIdAlreadyExists(variable.id.clone()));
        };
        if variable.lower_bound > variable.upper_bound {
            return Err(ProblemError::InvalidVariableBounds(variable.id.clone()));
        }
        Ok(())
    }

    /// Check that a constraint to be added is valid to add to this Problem
    fn validate_constraint(&self, constraint: &Constraint) -> Result<(), ProblemError> {
        let id = constraint.get_id();
        if self.constraints.contains_key(id) {
            return Err(ProblemError::ConstraintAlreadyExists(id.to_string()));
        }
        let (lower_bound, upper_bound) = constraint.get_bounds();
        if lower_bound > upper_bound {
            return Err(ProblemError::InvalidConstraintBounds(id.to_string()));
        }
        if let Some(missing) = constraint
            .get_variables()
            .find(|var| !self.variables.contains_key(*var))
        {
            return Err(ProblemError::NonExistentVariablesInConstraint {
                constraint: id.to_string(),
                variable: missing.to_string(),
            });
        }
        Ok(())
    }
    // endregion Validation Functions

    // region Fix Problem Functions
    fn fix_variable_indices(&mut self) {
        self.variables
            .values_mut()
            .enumerate()
            .for_each(|(ind, var)| var.index = ind);
    }

    fn fix_problem_type(&mut self) {
        self.problem_type = if self.has_integer_variables() {
            ProblemType::LinearMixedInteger
        } else {
            ProblemType::LinearContinuous
        };
    }

    /// Whether the problem contains integer or binary variables
    pub fn has_integer_variables(&self) -> bool {
        self.variables
            .values()
            .any(|var| var.variable_type != VariableType::Continuous)
    }
    // endregion Fix Problem Functions
}

/// Types of optimization problems
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProblemType {
    /// Problem with linear objectives and constraints, and continuous variables
    LinearContinuous,
    /// Problem with linear objective and constraints, with integer and continuous variables
    LinearMixedInteger,
}

/// Errors associated with the Problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// Error when trying to add a variable with the same id as an existing variable
    #[error("Tried to add variable {0} with the same id as an existing variable")]
    VariableIdAlreadyExists(String),
    /// Error when trying to add variable with invalid bounds
    #[error("Tried to set lower_bound > upper_bound for variable {0}")]
    InvalidVariableBounds(String),
    /// Error when a variable couldn't be built
    #[error("Unable to build variable: {0}")]
    InvalidVariable(String),
    /// Error when trying to add a constraint with the same id as an existing constraint
    #[error("Tried to add constraint {0} with the same id as an existing constraint")]
    ConstraintAlreadyExists(String),
    /// Error when trying to add a constraint with invalid bounds
    #[error("Tried to add inequality constraint {0} with lower_bound > upper_bound")]
    InvalidConstraintBounds(String),
    /// Error when trying to add a constraint that contains variables not in the model
    #[error("Constraint {constraint} uses variable {variable} which is not in the problem")]
    NonExistentVariablesInConstraint {
        /// Id of the offending constraint
        constraint: String,
        /// Id of the missing variable
        variable: String,
    },
    /// Error when trying to add an objective term which includes variables not in the model
    #[error("Tried adding an objective term with variable {0} which is not in the problem")]
    NonExistentVariablesInObjective(String),
    /// Error when trying to perform an update or drop on a variable that doesn't exist
    #[error("Tried to access variable {0} which doesn't exist")]
    NonExistentVariable(String),
    /// The configured backend can't solve this type of problem
    #[error("The configured solver can't handle {0:?} problems")]
    UnsupportedProblemType(ProblemType),
    /// Error raised by the backend
    #[error(transparent)]
    Solver(#[from] SolverError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_problem() {
        let max_problem = Problem::new_maximization();
        assert_eq!(max_problem.objective.sense(), ObjectiveSense::Maximize);

        let min_problem = Problem::new_minimization();
        assert_eq!(min_problem.objective.sense(), ObjectiveSense::Minimize);
        assert_eq!(min_problem.status(), OptimizationStatus::Unoptimized);
    }

    #[test]
    fn update_objective_sense() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        problem.update_objective_sense(ObjectiveSense::Minimize);
        assert_eq!(problem.objective.sense(), ObjectiveSense::Minimize);
        problem.update_objective_sense(ObjectiveSense::Maximize);
        assert_eq!(problem.objective.sense(), ObjectiveSense::Maximize);
    }

    #[test]
    fn add_variables() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);

        problem
            .add_new_variable("x", None, VariableType::Continuous, 64., 100.)
            .unwrap();
        let var = problem.variables.get("x").expect("Variable not added to problem");
        assert_eq!(var.variable_type, VariableType::Continuous);
        assert_eq!(var.index(), 0);
        assert_eq!(problem.get_variable_bounds("x"), Some((64., 100.)));
        assert_eq!(problem.problem_type(), ProblemType::LinearContinuous);

        // Adding a binary variable changes the problem type
        problem
            .add_new_variable("y", Some("indicator"), VariableType::Binary, 0., 1.)
            .unwrap();
        let var = problem.variables.get("y").expect("Variable not added to problem");
        assert_eq!(var.index(), 1);
        assert_eq!(var.name.as_deref(), Some("indicator"));
        assert_eq!(problem.problem_type(), ProblemType::LinearMixedInteger);

        // And deleting it changes it back
        problem.delete_variable("y").unwrap();
        assert_eq!(problem.problem_type(), ProblemType::LinearContinuous);
    }

    #[test]
    fn add_bad_variable() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        let res = problem.add_new_variable("x", None, VariableType::Continuous, 100., 64.);
        assert_eq!(res, Err(ProblemError::InvalidVariableBounds("x".to_string())));

        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 1.)
            .unwrap();
        let res = problem.add_new_variable("x", None, VariableType::Continuous, 0., 1.);
        assert_eq!(res, Err(ProblemError::VariableIdAlreadyExists("x".to_string())));
    }

    #[test]
    fn add_and_remove_constraint() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        problem
            .add_new_variable("x", None, VariableType::Continuous, 64., 100.)
            .unwrap();
        problem
            .add_new_variable("y", None, VariableType::Continuous, 64., 100.)
            .unwrap();

        problem
            .add_new_equality_constraint_by_id("test_constraint", &["x", "y"], &[2., 3.], 200.)
            .unwrap();
        match problem.constraints.get("test_constraint").unwrap() {
            Constraint::Equality { equals, .. } => assert!((equals - 200.).abs() < 1e-25),
            Constraint::Inequality { .. } => panic!("Incorrect constraint type added"),
        }

        // The id is taken until the constraint is removed
        let res = problem.add_new_inequality_constraint_by_id(
            "test_constraint",
            &["x", "y"],
            &[2., 3.],
            100.,
            200.,
        );
        assert!(matches!(res, Err(ProblemError::ConstraintAlreadyExists(_))));
        assert!(problem.remove_constraint("test_constraint").is_some());
        problem
            .add_new_inequality_constraint_by_id("test_constraint", &["x", "y"], &[2., 3.], 100., 200.)
            .unwrap();
        match problem.constraints.get("test_constraint").unwrap() {
            Constraint::Inequality {
                lower_bound,
                upper_bound,
                ..
            } => {
                assert!((lower_bound - 100.).abs() < 1e-25);
                assert!((upper_bound - 200.).abs() < 1e-25);
            }
            Constraint::Equality { .. } => panic!("Incorrect constraint type added"),
        }
        assert!(problem.remove_constraint("not_there").is_none());
    }

    #[test]
    fn add_bad_constraint() {
        let mut problem = Problem::new(ObjectiveSense::Maximize);
        problem
            .add_new_variable("x", None, VariableType::Continuous, 64., 100.)
            .unwrap();

        let res =
            problem.add_new_inequality_constraint_by_id("bad_constraint", &["x"], &[2.], 200., 100.);
        assert_eq!(
            res,
            Err(ProblemError::InvalidConstraintBounds("bad_constraint".to_string()))
        );

        let res = problem.add_new_equality_constraint_by_id("missing", &["x", "z"], &[1., 1.], 0.);
        assert!(matches!(
            res,
            Err(ProblemError::NonExistentVariablesInConstraint { .. })
        ));
    }

    #[test]
    fn optimize_lp() {
        let mut problem = Problem::new_maximization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 10.)
            .unwrap();
        problem
            .add_new_variable("y", None, VariableType::Continuous, 0., 10.)
            .unwrap();
        problem
            .add_new_inequality_constraint_by_id("cap", &["x", "y"], &[1., 1.], 0., 12.)
            .unwrap();
        problem.set_objective([("x", 1.), ("y", 2.)], ObjectiveSense::Maximize).unwrap();
        let solution = problem.optimize().unwrap();
        assert!(solution.is_optimal());
        assert!((solution.objective_value.unwrap() - 22.).abs() < 1e-4);
        assert_eq!(problem.status(), solution.status);
    }

    #[test]
    fn optimize_milp() {
        let mut problem = Problem::new_minimization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 10.)
            .unwrap();
        problem
            .add_new_variable("y_x", None, VariableType::Binary, 0., 1.)
            .unwrap();
        // x can only be positive if y_x is on, and x has to be at least 1
        problem
            .add_new_inequality_constraint_by_id("link", &["x", "y_x"], &[1., -10.], f64::NEG_INFINITY, 0.)
            .unwrap();
        problem
            .add_new_inequality_constraint_by_id("min_x", &["x"], &[1.], 1., f64::INFINITY)
            .unwrap();
        problem.set_objective([("y_x", 1.)], ObjectiveSense::Minimize).unwrap();
        let solution = problem.optimize().unwrap();
        assert!(solution.is_optimal());
        assert!((solution.value("y_x").unwrap() - 1.).abs() < 1e-6);
    }
}
