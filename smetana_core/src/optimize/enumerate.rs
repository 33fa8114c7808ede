//! Enumeration of alternative optima of a mixed integer problem
//!
//! Solutions are told apart by the set of binary indicator variables that are switched on.
//! After each solution an exclusion cut `sum(active indicators) <= |active| - 1` is added,
//! which forbids that activation pattern and all of its supersets, so every returned
//! solution activates a set that isn't contained in an earlier one.
use tracing::debug;

use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::scope::ScopedProblem;
use crate::optimize::ProblemSolution;

/// Strategy used to collect several solutions of a problem
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Enumeration {
    /// Solve, cut off the solution, repeat. Later solutions may have a worse objective
    Iterative,
    /// Only collect solutions whose objective is within a relative `gap` of the optimum
    Pool {
        /// Relative gap to the optimal objective value, 0.5 allows 50% worse solutions
        gap: f64,
    },
}

impl Default for Enumeration {
    fn default() -> Self {
        Enumeration::Pool { gap: 0.5 }
    }
}

/// Collect up to `n_solutions` optimal solutions of `problem`
///
/// `indicators` are the ids of the binary variables whose activation pattern identifies a
/// solution, an indicator is active when its value exceeds `abstol`. Returns an empty vec if
/// the problem has no optimal solution. All cuts are removed from the problem before
/// returning.
///
/// `first` is an optimal solution the caller already has for the problem, it is used as the
/// first solution instead of solving again.
pub fn enumerate_optima(
    problem: &mut Problem,
    first: Option<ProblemSolution>,
    indicators: &[String],
    n_solutions: usize,
    enumeration: Enumeration,
    abstol: f64,
) -> Result<Vec<ProblemSolution>, ProblemError> {
    let mut scope = ScopedProblem::new(problem);
    let mut solutions = Vec::new();
    let mut first = first;

    while solutions.len() < n_solutions {
        let solution = match first.take() {
            Some(solution) => solution,
            None => scope.optimize()?,
        };
        if !solution.is_optimal() {
            break;
        }
        if solutions.is_empty() {
            if let Enumeration::Pool { gap } = enumeration {
                bound_objective(&mut scope, &solution, gap, abstol)?;
            }
        }
        let active: Vec<&str> = indicators
            .iter()
            .map(|id| id.as_str())
            .filter(|id| solution.value(id).is_some_and(|v| v > abstol))
            .collect();
        solutions.push(solution);
        if active.is_empty() {
            // Every other pattern is a superset of the empty one
            break;
        }
        let coefficients = vec![1.; active.len()];
        let cut_id = format!("_enumeration_cut_{}", solutions.len());
        scope.add_inequality_constraint(
            &cut_id,
            &active,
            &coefficients,
            f64::NEG_INFINITY,
            active.len() as f64 - 1.,
        )?;
    }
    debug!(solutions = solutions.len(), ?enumeration, "Enumerated optima");
    Ok(solutions)
}

/// Restrict the objective to within `gap` of the first optimum
fn bound_objective(
    scope: &mut ScopedProblem<'_>,
    optimum: &ProblemSolution,
    gap: f64,
    abstol: f64,
) -> Result<(), ProblemError> {
    let Some(best) = optimum.objective_value else {
        return Ok(());
    };
    let objective = scope.problem().objective();
    let (variables, coefficients): (Vec<String>, Vec<f64>) = objective
        .terms()
        .map(|(id, coef)| (id.to_string(), coef))
        .unzip();
    if variables.is_empty() {
        return Ok(());
    }
    let slack = gap.max(0.) * best.abs() + abstol;
    let (lower_bound, upper_bound) = match objective.sense() {
        ObjectiveSense::Minimize => (f64::NEG_INFINITY, best + slack),
        ObjectiveSense::Maximize => (best - slack, f64::INFINITY),
    };
    let variables: Vec<&str> = variables.iter().map(|id| id.as_str()).collect();
    scope.add_inequality_constraint(
        "_enumeration_objective_bound",
        &variables,
        &coefficients,
        lower_bound,
        upper_bound,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::variable::VariableType;

    /// Choose at least one of a, b, c where c costs more than a and b
    fn choice_problem() -> (Problem, Vec<String>) {
        let mut problem = Problem::new_minimization();
        for id in ["a", "b", "c"] {
            problem
                .add_new_variable(id, None, VariableType::Binary, 0., 1.)
                .unwrap();
        }
        problem
            .add_new_inequality_constraint_by_id(
                "at_least_one",
                &["a", "b", "c"],
                &[1., 1., 1.],
                1.,
                f64::INFINITY,
            )
            .unwrap();
        problem
            .set_objective([("a", 1.), ("b", 1.), ("c", 3.)], ObjectiveSense::Minimize)
            .unwrap();
        (problem, vec!["a".to_string(), "b".to_string(), "c".to_string()])
    }

    fn active(solution: &ProblemSolution, ids: &[String]) -> Vec<String> {
        ids.iter()
            .filter(|id| solution.value(id).unwrap() > 0.5)
            .cloned()
            .collect()
    }

    #[test]
    fn iterative_finds_all_patterns() {
        let (mut problem, ids) = choice_problem();
        let solutions =
            enumerate_optima(&mut problem, None, &ids, 10, Enumeration::Iterative, 1e-6).unwrap();
        assert_eq!(solutions.len(), 3);
        let mut patterns: Vec<Vec<String>> =
            solutions.iter().map(|s| active(s, &ids)).collect();
        patterns.sort();
        assert_eq!(patterns, vec![vec!["a"], vec!["b"], vec!["c"]]);
        // Cuts are cleaned up
        assert_eq!(problem.num_constraints(), 1);
    }

    #[test]
    fn pool_respects_gap() {
        let (mut problem, ids) = choice_problem();
        let solutions =
            enumerate_optima(&mut problem, None, &ids, 10, Enumeration::Pool { gap: 0.5 }, 1e-6)
                .unwrap();
        assert_eq!(solutions.len(), 2);
        assert!(solutions
            .iter()
            .all(|s| (s.objective_value.unwrap() - 1.).abs() < 1e-6));
        assert_eq!(problem.num_constraints(), 1);
    }

    #[test]
    fn starts_from_a_known_solution() {
        let (mut problem, ids) = choice_problem();
        let known = {
            let mut scope = ScopedProblem::new(&mut problem);
            scope
                .add_inequality_constraint("only_c", &["a", "b"], &[1., 1.], 0., 0.)
                .unwrap();
            scope.optimize().unwrap()
        };
        let solutions = enumerate_optima(
            &mut problem,
            Some(known.clone()),
            &ids,
            10,
            Enumeration::Iterative,
            1e-6,
        )
        .unwrap();
        assert_eq!(solutions[0], known);
        assert_eq!(active(&solutions[0], &ids), vec!["c"]);
        assert_eq!(solutions.len(), 3);
        assert_eq!(problem.num_constraints(), 1);
    }

    #[test]
    fn limited_by_n_solutions() {
        let (mut problem, ids) = choice_problem();
        let solutions =
            enumerate_optima(&mut problem, None, &ids, 1, Enumeration::Iterative, 1e-6).unwrap();
        assert_eq!(solutions.len(), 1);
    }

    #[test]
    fn infeasible_gives_no_solutions() {
        let (mut problem, ids) = choice_problem();
        problem
            .add_new_inequality_constraint_by_id("none", &["a", "b", "c"], &[1., 1., 1.], 0., 0.)
            .unwrap();
        let solutions =
            enumerate_optima(&mut problem, None, &ids, 5, Enumeration::Iterative, 1e-6).unwrap();
        assert!(solutions.is_empty());
    }
}
