//! Community interaction scores
//!
//! * [`species_coupling_score`] (SCS): how often an organism needs another one to grow
//! * [`metabolite_uptake_score`] (MUS): how often an organism needs a metabolite to grow
//! * [`metabolite_production_score`] (MPS): which metabolites an organism can secrete
//! * [`mip_score`] (MIP): how many nutrients a community saves by cross-feeding
//! * [`mro_score`] (MRO): how much the organisms compete for the same nutrients
//!
//! Every score builds its own merged network and problem from the community, applies the
//! environment (if any), and reports infeasibility as `None` with a warning.
pub mod mip;
pub mod mps;
pub mod mro;
pub mod mus;
pub mod scs;
pub mod smetana;

use derive_builder::Builder;
use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

pub use mip::{mip_score, MipResult};
pub use mps::metabolite_production_score;
pub use mro::{mro_score, MroResult};
pub use mus::metabolite_uptake_score;
pub use scs::species_coupling_score;
pub use smetana::{
    assemble_detailed, detailed_scores, global_scores, DetailedOptions, DetailedOptionsBuilder,
    DetailedRecord, GlobalRecord,
};

use crate::community::{Community, CommunityError};
use crate::environment::Environment;
use crate::medium::{MediumError, MediumOptions};
use crate::metabolic_model::model::{Model, ModelError};
use crate::optimize::enumerate::Enumeration;
use crate::optimize::problem::ProblemError;

/// Per organism score table, `None` when the organism couldn't grow
pub type OrganismScores = IndexMap<String, Option<IndexMap<String, f64>>>;

/// Tunables shared by all scores
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct ScoreParameters {
    /// Lower bound on constrained biomass fluxes
    #[builder(default = "0.1")]
    pub min_growth: f64,
    /// Tolerance of every "is this flux or indicator non-zero" test
    #[builder(default = "1e-6")]
    pub abstol: f64,
    /// Largest uptake flux of a compound, 10 per organism when unset
    #[builder(setter(strip_option), default)]
    pub max_uptake: Option<f64>,
    /// Flux bound used to switch reactions off with organism indicators
    #[builder(default = "100.")]
    pub big_m: f64,
    /// Number of alternative solutions enumerated by SCS and MUS
    #[builder(default = "100")]
    pub n_solutions: usize,
    /// How alternative media are enumerated by MUS
    #[builder(default)]
    pub enumeration: Enumeration,
    /// How alternative sets of partner organisms are enumerated by SCS
    #[builder(default = "Enumeration::Iterative")]
    pub coupling_enumeration: Enumeration,
    /// Minimize the molecular weight of media instead of their size
    #[builder(default = "false")]
    pub mass_weighted: bool,
    /// Original metabolite ids left out of MIP, MRO and SMETANA
    #[builder(default)]
    pub excluded_compounds: IndexSet<String>,
}

impl Default for ScoreParameters {
    fn default() -> Self {
        ScoreParameters {
            min_growth: 0.1,
            abstol: 1e-6,
            max_uptake: None,
            big_m: 100.,
            n_solutions: 100,
            enumeration: Enumeration::default(),
            coupling_enumeration: Enumeration::Iterative,
            mass_weighted: false,
            excluded_compounds: IndexSet::new(),
        }
    }
}

impl ScoreParameters {
    /// Largest uptake flux for a community
    pub fn max_uptake_for(&self, community: &Community) -> f64 {
        self.max_uptake
            .unwrap_or(10. * community.size() as f64)
    }

    pub(crate) fn medium_options(
        &self,
        max_uptake: f64,
        n_solutions: usize,
        biomass_reaction: Option<&str>,
    ) -> MediumOptions {
        MediumOptions {
            min_growth: self.min_growth,
            max_uptake,
            mass_weighted: self.mass_weighted,
            n_solutions,
            enumeration: self.enumeration,
            abstol: self.abstol,
            max_compounds: None,
            biomass_reaction: biomass_reaction.map(|b| b.to_string()),
            weights: IndexMap::new(),
        }
    }
}

/// Apply an environment exclusively, when there is one
pub(crate) fn apply_environment(
    model: &mut Model,
    environment: Option<&Environment>,
) -> Result<(), ModelError> {
    match environment {
        Some(env) => env.apply(model, true),
        None => Ok(()),
    }
}

/// Community exchange reactions, restricted to the environment when there is one
pub(crate) fn exchange_universe(model: &Model, environment: Option<&Environment>) -> Vec<String> {
    model
        .exchange_reactions()
        .into_iter()
        .filter(|r| environment.is_none_or(|env| env.contains(r)))
        .map(|r| r.to_string())
        .collect()
}

/// Errors raised while computing scores
#[derive(Error, Debug)]
pub enum ScoreError {
    /// The community couldn't be merged
    #[error(transparent)]
    Community(#[from] CommunityError),
    /// Building or solving an optimization problem failed
    #[error(transparent)]
    Problem(#[from] ProblemError),
    /// Applying bounds failed
    #[error(transparent)]
    Model(#[from] ModelError),
    /// A minimal medium search failed
    #[error(transparent)]
    Medium(#[from] MediumError),
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::PathBuf;

    use crate::community::{Community, CommunityOptions};
    use crate::community::ids::pool_exchange_id;
    use crate::environment::Environment;
    use crate::metabolic_model::model::Model;

    pub fn load(name: &str) -> Model {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join("test_models")
            .join(format!("{}.json", name));
        let mut model = Model::read_json(path).unwrap();
        model.id = name.to_string();
        model
    }

    pub fn community(names: &[&str]) -> Community {
        Community::new(
            &names.join("_"),
            names.iter().map(|n| load(n)),
            CommunityOptions::default(),
        )
    }

    pub fn environment(compounds: &[&str]) -> Environment {
        Environment::from_compounds(compounds.iter().copied(), pool_exchange_id, 10.)
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::community;
    use super::*;

    #[test]
    fn default_parameters() {
        let params = ScoreParametersBuilder::default().build().unwrap();
        assert_eq!(params, ScoreParameters::default());
        assert_eq!(params.enumeration, Enumeration::Pool { gap: 0.5 });
        assert_eq!(params.coupling_enumeration, Enumeration::Iterative);
        assert_eq!(params.max_uptake_for(&community(&["producer", "consumer"])), 20.);
        let params = ScoreParametersBuilder::default()
            .max_uptake(5.)
            .build()
            .unwrap();
        assert_eq!(params.max_uptake_for(&community(&["producer"])), 5.);
    }
}
