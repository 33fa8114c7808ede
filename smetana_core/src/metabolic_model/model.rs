//! This module provides the Model struct for representing an entire metabolic model
use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::{Reaction, ReactionType};
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::variable::VariableType;
use crate::optimize::ProblemSolution;

/// Represents a (single organism or merged community) metabolic network
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
    /// Id associated with the Model
    pub id: String,
    /// Compartments in the model
    ///
    /// An IndexMap<String, String> of {short name: long name}
    pub compartments: IndexMap<String, String>,
    /// Map of metabolite ids to Metabolites
    pub metabolites: IndexMap<String, Metabolite>,
    /// Map of reaction ids to Reactions
    pub reactions: IndexMap<String, Reaction>,
    /// Map of reaction ids to objective function coefficients
    pub objective: IndexMap<String, f64>,
    /// Reaction representing growth
    pub biomass_reaction: Option<String>,
    /// A version identifier for the Model, stored as a string
    pub version: Option<String>,
}

impl Model {
    /// Create an empty model with an id
    pub fn new(id: &str) -> Self {
        Model {
            id: id.to_string(),
            ..Default::default()
        }
    }

    /// Add a compartment, an existing compartment with the same id is replaced
    pub fn add_compartment(&mut self, id: &str, name: &str) {
        self.compartments.insert(id.to_string(), name.to_string());
    }

    /// Add a metabolite to the model
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        self.metabolites.insert(metabolite.id.clone(), metabolite);
    }

    /// Add a reaction to the model
    ///
    /// # Parameters
    /// - reaction: Reaction to add
    ///
    /// # Examples
    /// ```rust
    /// use smetana_core::metabolic_model::model::Model;
    /// use smetana_core::metabolic_model::reaction::ReactionBuilder;
    /// let mut model = Model::new("toy");
    /// let new_reaction = ReactionBuilder::default().id("new_reaction").build().unwrap();
    /// model.add_reaction(new_reaction);
    /// assert!(model.reactions.contains_key("new_reaction"));
    /// ```
    pub fn add_reaction(&mut self, reaction: Reaction) {
        let id = reaction.id.clone();
        self.reactions.insert(id, reaction);
    }

    /// Designate the biomass reaction, which also becomes the only objective term
    pub fn set_biomass_reaction(&mut self, reaction_id: &str) -> Result<(), ModelError> {
        if !self.reactions.contains_key(reaction_id) {
            return Err(ModelError::UnknownReaction(reaction_id.to_string()));
        }
        self.biomass_reaction = Some(reaction_id.to_string());
        self.objective.clear();
        self.objective.insert(reaction_id.to_string(), 1.);
        Ok(())
    }

    /// Ids of the exchange reactions, in model order
    pub fn exchange_reactions(&self) -> Vec<&str> {
        self.reactions
            .values()
            .filter(|r| r.reaction_type == ReactionType::Exchange)
            .map(|r| r.id.as_str())
            .collect()
    }

    /// Change the flux bounds of a reaction
    pub fn set_reaction_bounds(
        &mut self,
        reaction_id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ModelError> {
        if lower_bound > upper_bound {
            return Err(ModelError::InvalidBounds {
                reaction: reaction_id.to_string(),
                lower_bound,
                upper_bound,
            });
        }
        match self.reactions.get_mut(reaction_id) {
            Some(rxn) => {
                rxn.lower_bound = lower_bound;
                rxn.upper_bound = upper_bound;
                Ok(())
            }
            None => Err(ModelError::UnknownReaction(reaction_id.to_string())),
        }
    }

    /// Compartment of a metabolite, if the metabolite exists and has one
    pub fn metabolite_compartment(&self, metabolite_id: &str) -> Option<&str> {
        self.metabolites
            .get(metabolite_id)
            .and_then(|m| m.compartment.as_deref())
    }

    /// Largest finite bound magnitude among the reactions
    pub fn max_finite_bound(&self) -> f64 {
        self.reactions
            .values()
            .flat_map(|r| [r.lower_bound, r.upper_bound])
            .filter(|b| b.is_finite())
            .fold(0., |acc: f64, b| acc.max(b.abs()))
    }

    /// Build the steady state flux problem of the network
    ///
    /// One continuous variable per reaction (id = reaction id, bounds = reaction bounds), and
    /// one mass balance equality constraint per metabolite (id = metabolite id). The objective
    /// is the model objective, maximized.
    pub fn build_problem(&self) -> Result<Problem, ProblemError> {
        let mut problem = Problem::new_maximization();
        for rxn in self.reactions.values() {
            problem.add_new_variable(
                &rxn.id,
                rxn.name.as_deref(),
                VariableType::Continuous,
                rxn.lower_bound,
                rxn.upper_bound,
            )?;
        }
        let mut balances: IndexMap<&str, (Vec<&str>, Vec<f64>)> = IndexMap::new();
        for rxn in self.reactions.values() {
            for (met, coef) in &rxn.metabolites {
                let entry = balances.entry(met.as_str()).or_default();
                entry.0.push(rxn.id.as_str());
                entry.1.push(*coef);
            }
        }
        for (met, (variables, coefficients)) in &balances {
            problem.add_new_equality_constraint_by_id(met, variables, coefficients, 0.)?;
        }
        for (rxn, coef) in &self.objective {
            problem.add_new_linear_objective_term_by_id(rxn, *coef)?;
        }
        debug!(
            model = %self.id,
            reactions = self.reactions.len(),
            metabolites = balances.len(),
            "Built flux balance problem"
        );
        Ok(problem)
    }

    /// Flux balance analysis, maximize the objective subject to steady state
    pub fn fba(&self) -> Result<ProblemSolution, ProblemError> {
        let mut problem = self.build_problem()?;
        problem.update_objective_sense(ObjectiveSense::Maximize);
        problem.optimize()
    }
}

/// Errors associated with modifying a Model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Tried to access a reaction that isn't in the model
    #[error("Reaction {0} is not in the model")]
    UnknownReaction(String),
    /// Tried to set lower_bound > upper_bound
    #[error("Invalid bounds ({lower_bound}, {upper_bound}) for reaction {reaction}")]
    InvalidBounds {
        /// Reaction whose bounds were set
        reaction: String,
        /// Requested lower bound
        lower_bound: f64,
        /// Requested upper bound
        upper_bound: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::reaction::ReactionBuilder;

    /// A -> B -> biomass, with A taken up through an exchange
    fn linear_model() -> Model {
        let mut model = Model::new("linear");
        model.add_compartment("c", "cytosol");
        model.add_compartment("e", "extracellular");
        model.add_metabolite(Metabolite::new("a_e", "e"));
        model.add_metabolite(Metabolite::new("a_c", "c"));
        model.add_metabolite(Metabolite::new("b_c", "c"));
        model.add_reaction(
            ReactionBuilder::default()
                .id("EX_a_e")
                .metabolites(IndexMap::from([("a_e".to_string(), -1.)]))
                .lower_bound(-10.)
                .reaction_type(ReactionType::Exchange)
                .build()
                .unwrap(),
        );
        model.add_reaction(
            ReactionBuilder::default()
                .id("T_a")
                .metabolites(IndexMap::from([("a_e".to_string(), -1.), ("a_c".to_string(), 1.)]))
                .build()
                .unwrap(),
        );
        model.add_reaction(
            ReactionBuilder::default()
                .id("R_ab")
                .metabolites(IndexMap::from([("a_c".to_string(), -1.), ("b_c".to_string(), 1.)]))
                .lower_bound(0.)
                .build()
                .unwrap(),
        );
        model.add_reaction(
            ReactionBuilder::default()
                .id("Growth")
                .metabolites(IndexMap::from([("b_c".to_string(), -2.)]))
                .lower_bound(0.)
                .build()
                .unwrap(),
        );
        model.set_biomass_reaction("Growth").unwrap();
        model
    }

    #[test]
    fn exchange_reactions() {
        let model = linear_model();
        assert_eq!(model.exchange_reactions(), vec!["EX_a_e"]);
        assert_eq!(model.metabolite_compartment("a_e"), Some("e"));
        assert_eq!(model.max_finite_bound(), 1000.);
    }

    #[test]
    fn set_bounds() {
        let mut model = linear_model();
        model.set_reaction_bounds("EX_a_e", -5., 0.).unwrap();
        assert_eq!(model.reactions["EX_a_e"].lower_bound, -5.);
        assert!(matches!(
            model.set_reaction_bounds("EX_a_e", 1., 0.),
            Err(ModelError::InvalidBounds { .. })
        ));
        assert_eq!(
            model.set_reaction_bounds("missing", 0., 1.),
            Err(ModelError::UnknownReaction("missing".to_string()))
        );
    }

    #[test]
    fn fba_growth() {
        let model = linear_model();
        let solution = model.fba().unwrap();
        assert!(solution.is_optimal());
        // 10 units of a make 10 b, which make 5 units of growth
        assert!((solution.objective_value.unwrap() - 5.).abs() < 1e-4);
    }

    #[test]
    fn problem_layout() {
        let model = linear_model();
        let problem = model.build_problem().unwrap();
        assert_eq!(problem.num_variables(), 4);
        assert_eq!(problem.num_constraints(), 3);
        assert_eq!(problem.get_variable_bounds("EX_a_e"), Some((-10., 1000.)));
    }
}
