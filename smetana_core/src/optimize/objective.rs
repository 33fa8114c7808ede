//! Provides struct for representing an optimization problem's objective
use indexmap::IndexMap;

/// Represents the linear objective of an optimization problem
#[derive(Debug, Clone)]
pub struct Objective {
    /// Coefficients of the objective, keyed by variable id
    pub(crate) terms: IndexMap<String, f64>,
    /// Sense of the objective (maximize, or minimize), see [`ObjectiveSense`]
    pub(crate) sense: ObjectiveSense,
}

impl Objective {
    /// Create a new empty objective, with a given sense
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            terms: IndexMap::new(),
            sense,
        }
    }

    /// Create a new empty maximization objective
    pub fn new_maximize() -> Self {
        Self::new(ObjectiveSense::Maximize)
    }

    /// Create a new empty minimization objective
    pub fn new_minimize() -> Self {
        Self::new(ObjectiveSense::Minimize)
    }

    /// Change the sense of the objective
    pub fn set_sense(&mut self, sense: ObjectiveSense) {
        self.sense = sense;
    }

    /// Sense of the objective
    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    /// Add a new linear term to the objective, coefficients of a repeated variable are summed
    pub fn add_linear_term(&mut self, variable_id: &str, coefficient: f64) {
        *self.terms.entry(variable_id.to_string()).or_insert(0.) += coefficient;
    }

    /// Iterate over the (variable id, coefficient) pairs of the objective
    pub fn terms(&self) -> impl Iterator<Item = (&str, f64)> {
        self.terms.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Remove any term involving the variable
    pub fn remove_terms_with_variable(&mut self, variable_id: &str) {
        self.terms.shift_remove(variable_id);
    }

    /// Remove all the terms from the objective
    pub fn remove_all_terms(&mut self) {
        self.terms.clear();
    }

    /// Evaluate the objective for a set of variable values, missing values count as 0
    pub fn evaluate(&self, values: &IndexMap<String, f64>) -> f64 {
        self.terms
            .iter()
            .map(|(id, coef)| coef * values.get(id).copied().unwrap_or(0.))
            .sum()
    }
}

/// Represents the sense of the objective, whether it should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    /// The objective should be minimized
    Minimize,
    /// The objective should be maximized
    Maximize,
}
