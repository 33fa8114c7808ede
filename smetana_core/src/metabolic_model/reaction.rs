//! This module provides a struct for representing reactions
use derive_builder::Builder;
use indexmap::IndexMap;

use crate::configuration;

/// Represents a reaction in the metabolic model
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Reaction {
    /// Used to identify the reaction
    #[builder(setter(into))]
    pub id: String,
    /// Metabolite stoichiometry of the reaction
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Human-readable reaction name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Lower flux bound
    #[builder(default = "configuration::current().lower_bound")]
    pub lower_bound: f64,
    /// Upper flux bound
    #[builder(default = "configuration::current().upper_bound")]
    pub upper_bound: f64,
    /// Role of the reaction in the network
    #[builder(default = "ReactionType::Other")]
    pub reaction_type: ReactionType,
    /// Reaction subsystem
    #[builder(default = "None")]
    pub subsystem: Option<String>,
}

impl Reaction {
    /// Whether the reaction can carry negative flux
    pub fn is_reversible(&self) -> bool {
        self.lower_bound < 0.
    }

    /// Stoichiometric coefficient of a metabolite, 0 if it doesn't take part
    pub fn coefficient(&self, metabolite: &str) -> f64 {
        self.metabolites.get(metabolite).copied().unwrap_or(0.)
    }

    /// Make the reaction irreversible by clamping the lower bound at 0
    pub fn make_irreversible(&mut self) {
        if self.lower_bound < 0. {
            self.lower_bound = 0.;
        }
        if self.upper_bound < 0. {
            self.upper_bound = 0.;
        }
    }
}

/// Role of a reaction in a network
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReactionType {
    /// Any internal reaction (transport, metabolism, biomass)
    Other,
    /// Exchanges a metabolite with the environment, negative flux is uptake
    Exchange,
    /// Irreversible removal of a metabolite
    Sink,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_uses_configured_bounds() {
        let rxn = ReactionBuilder::default().id("R1").build().unwrap();
        assert_eq!(rxn.lower_bound, -1000.);
        assert_eq!(rxn.upper_bound, 1000.);
        assert_eq!(rxn.reaction_type, ReactionType::Other);
        assert!(rxn.is_reversible());
    }

    #[test]
    fn irreversible() {
        let mut rxn = ReactionBuilder::default()
            .id("R1")
            .metabolites(IndexMap::from([("a".to_string(), -1.), ("b".to_string(), 1.)]))
            .build()
            .unwrap();
        rxn.make_irreversible();
        assert_eq!(rxn.lower_bound, 0.);
        assert_eq!(rxn.coefficient("a"), -1.);
        assert_eq!(rxn.coefficient("c"), 0.);
    }
}
