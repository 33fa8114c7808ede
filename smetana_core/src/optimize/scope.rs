//! Temporary modifications of a [`Problem`]
//!
//! A [`ScopedProblem`] borrows a problem mutably and records every variable, constraint,
//! bound change and objective change made through it. Everything is reverted when the scope
//! is dropped, whether the caller returns normally, early with `?`, or unwinds.
use tracing::warn;

use crate::optimize::enumerate::{enumerate_optima, Enumeration};
use crate::optimize::objective::{Objective, ObjectiveSense};
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::variable::VariableType;
use crate::optimize::ProblemSolution;

/// Guard over a [`Problem`] which undoes its changes on drop
#[derive(Debug)]
pub struct ScopedProblem<'a> {
    problem: &'a mut Problem,
    variables: Vec<String>,
    constraints: Vec<String>,
    /// Original bounds of modified variables, in modification order
    bounds: Vec<(String, f64, f64)>,
    /// Objective to restore, saved on the first objective change
    objective: Option<Objective>,
}

impl<'a> ScopedProblem<'a> {
    /// Open a new scope on a problem
    pub fn new(problem: &'a mut Problem) -> Self {
        ScopedProblem {
            problem,
            variables: Vec::new(),
            constraints: Vec::new(),
            bounds: Vec::new(),
            objective: None,
        }
    }

    /// Open a nested scope, its changes are reverted before the ones of this scope
    pub fn scope(&mut self) -> ScopedProblem<'_> {
        ScopedProblem::new(&mut *self.problem)
    }

    /// Read access to the underlying problem
    pub fn problem(&self) -> &Problem {
        &*self.problem
    }

    /// Add a temporary variable
    pub fn add_variable(
        &mut self,
        id: &str,
        variable_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        self.problem
            .add_new_variable(id, None, variable_type, lower_bound, upper_bound)?;
        self.variables.push(id.to_string());
        Ok(())
    }

    /// Add a temporary equality constraint
    pub fn add_equality_constraint(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        equals: f64,
    ) -> Result<(), ProblemError> {
        self.problem
            .add_new_equality_constraint_by_id(id, variables, coefficients, equals)?;
        self.constraints.push(id.to_string());
        Ok(())
    }

    /// Add a temporary inequality constraint
    pub fn add_inequality_constraint(
        &mut self,
        id: &str,
        variables: &[&str],
        coefficients: &[f64],
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        self.problem.add_new_inequality_constraint_by_id(
            id,
            variables,
            coefficients,
            lower_bound,
            upper_bound,
        )?;
        self.constraints.push(id.to_string());
        Ok(())
    }

    /// Temporarily change the bounds of a variable
    pub fn set_variable_bounds(
        &mut self,
        id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ProblemError> {
        let (old_lb, old_ub) = self
            .problem
            .get_variable_bounds(id)
            .ok_or_else(|| ProblemError::NonExistentVariable(id.to_string()))?;
        self.problem
            .update_variable_bounds(id, lower_bound, upper_bound)?;
        self.bounds.push((id.to_string(), old_lb, old_ub));
        Ok(())
    }

    /// Temporarily replace the objective
    pub fn set_objective<'t, I>(&mut self, terms: I, sense: ObjectiveSense) -> Result<(), ProblemError>
    where
        I: IntoIterator<Item = (&'t str, f64)>,
    {
        if self.objective.is_none() {
            self.objective = Some(self.problem.objective().clone());
        }
        self.problem.set_objective(terms, sense)
    }

    /// Optimize the problem in its current (scoped) state
    pub fn optimize(&mut self) -> Result<ProblemSolution, ProblemError> {
        self.problem.optimize()
    }

    /// Enumerate alternative optima of the problem in its current (scoped) state
    ///
    /// `first` is an optimal solution already found for this state, see [`enumerate_optima`].
    pub fn enumerate(
        &mut self,
        first: Option<ProblemSolution>,
        indicators: &[String],
        n_solutions: usize,
        enumeration: Enumeration,
        abstol: f64,
    ) -> Result<Vec<ProblemSolution>, ProblemError> {
        enumerate_optima(
            &mut *self.problem,
            first,
            indicators,
            n_solutions,
            enumeration,
            abstol,
        )
    }
}

impl Drop for ScopedProblem<'_> {
    fn drop(&mut self) {
        for id in self.constraints.drain(..).rev() {
            self.problem.remove_constraint(&id);
        }
        for id in self.variables.drain(..).rev() {
            if let Err(err) = self.problem.delete_variable(&id) {
                warn!(variable = %id, error = %err, "Scoped variable already removed");
            }
        }
        for (id, lb, ub) in self.bounds.drain(..).rev() {
            if let Err(err) = self.problem.update_variable_bounds(&id, lb, ub) {
                warn!(variable = %id, error = %err, "Couldn't restore variable bounds");
            }
        }
        if let Some(objective) = self.objective.take() {
            self.problem.replace_objective(objective);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_problem() -> Problem {
        let mut problem = Problem::new_maximization();
        problem
            .add_new_variable("x", None, VariableType::Continuous, 0., 10.)
            .unwrap();
        problem.set_objective([("x", 1.)], ObjectiveSense::Maximize).unwrap();
        problem
    }

    #[test]
    fn changes_reverted_on_drop() {
        let mut problem = base_problem();
        {
            let mut scope = ScopedProblem::new(&mut problem);
            scope
                .add_variable("y", VariableType::Continuous, 0., 1.)
                .unwrap();
            scope
                .add_inequality_constraint("cap", &["x", "y"], &[1., 1.], 0., 3.)
                .unwrap();
            scope.set_variable_bounds("x", 1., 2.).unwrap();
            scope.set_objective([("y", 1.)], ObjectiveSense::Minimize).unwrap();
            assert_eq!(scope.problem().num_constraints(), 1);
        }
        assert!(!problem.has_variable("y"));
        assert!(!problem.has_constraint("cap"));
        assert_eq!(problem.get_variable_bounds("x"), Some((0., 10.)));
        assert_eq!(problem.objective().sense(), ObjectiveSense::Maximize);
        assert_eq!(problem.objective().terms().collect::<Vec<_>>(), vec![("x", 1.)]);
    }

    #[test]
    fn reverted_on_early_return() {
        fn failing(problem: &mut Problem) -> Result<(), ProblemError> {
            let mut scope = ScopedProblem::new(problem);
            scope.add_equality_constraint("fix", &["x"], &[1.], 2.)?;
            // Unknown variable, returns early
            scope.add_equality_constraint("bad", &["z"], &[1.], 2.)?;
            Ok(())
        }
        let mut problem = base_problem();
        assert!(failing(&mut problem).is_err());
        assert_eq!(problem.num_constraints(), 0);
    }

    #[test]
    fn nested_scopes() {
        let mut problem = base_problem();
        {
            let mut outer = ScopedProblem::new(&mut problem);
            outer
                .add_inequality_constraint("outer", &["x"], &[1.], 0., 5.)
                .unwrap();
            {
                let mut inner = outer.scope();
                inner
                    .add_inequality_constraint("inner", &["x"], &[1.], 0., 4.)
                    .unwrap();
                assert!(inner.problem().has_constraint("outer"));
            }
            assert!(!outer.problem().has_constraint("inner"));
            assert!(outer.problem().has_constraint("outer"));
        }
        assert_eq!(problem.num_constraints(), 0);
    }
}
