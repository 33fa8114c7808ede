//! Minimal growth media
//!
//! A minimal medium is a smallest set of uptake reactions which lets the biomass reaction
//! carry at least `min_growth` flux. Each candidate uptake reaction `r` gets a binary
//! indicator `y_r` and the linkage `r + max_uptake * y_r >= 0`, so uptake (negative flux) is
//! only possible when the indicator is on. The number of indicators switched on (or their
//! molecular weight) is minimized.
use derive_builder::Builder;
use indexmap::{IndexMap, IndexSet};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::metabolic_model::model::{Model, ModelError};
use crate::optimize::enumerate::Enumeration;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::scope::ScopedProblem;
use crate::optimize::variable::VariableType;
use crate::optimize::ProblemSolution;

/// Options for the minimal medium search
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct MediumOptions {
    /// Lower bound on the biomass flux
    #[builder(default = "0.1")]
    pub min_growth: f64,
    /// Largest uptake flux of a compound in the medium
    #[builder(default = "10.")]
    pub max_uptake: f64,
    /// Minimize the molecular weight of the medium instead of its size
    #[builder(default = "false")]
    pub mass_weighted: bool,
    /// Number of alternative media to look for
    #[builder(default = "1")]
    pub n_solutions: usize,
    /// How alternative media are enumerated when `n_solutions > 1`
    #[builder(default)]
    pub enumeration: Enumeration,
    /// Uptake fluxes below `-abstol` put a compound in the medium
    #[builder(default = "1e-6")]
    pub abstol: f64,
    /// Largest number of compounds in a medium
    #[builder(setter(strip_option), default)]
    pub max_compounds: Option<usize>,
    /// Reaction to constrain instead of the model biomass reaction
    #[builder(setter(into, strip_option), default)]
    pub biomass_reaction: Option<String>,
    /// Objective weight of specific uptake reactions, taking precedence over size or mass
    #[builder(default)]
    pub weights: IndexMap<String, f64>,
}

impl Default for MediumOptions {
    fn default() -> Self {
        MediumOptions {
            min_growth: 0.1,
            max_uptake: 10.,
            mass_weighted: false,
            n_solutions: 1,
            enumeration: Enumeration::default(),
            abstol: 1e-6,
            max_compounds: None,
            biomass_reaction: None,
            weights: IndexMap::new(),
        }
    }
}

/// Media found by [`minimal_medium`]
///
/// When no medium supports growth `media` is empty and `solutions` holds the failed solve.
#[derive(Debug, Clone, PartialEq)]
pub struct MinimalMedium {
    /// Uptake reaction ids of every medium found, best first
    pub media: Vec<IndexSet<String>>,
    /// Solver solution behind each medium
    pub solutions: Vec<ProblemSolution>,
}

impl MinimalMedium {
    /// Whether at least one medium was found
    pub fn is_feasible(&self) -> bool {
        !self.media.is_empty()
    }

    /// Best medium
    pub fn first(&self) -> Option<&IndexSet<String>> {
        self.media.first()
    }
}

/// Find minimal media of a model among a set of candidate uptake reactions
pub fn minimal_medium(
    model: &Model,
    exchange_reactions: &[&str],
    options: &MediumOptions,
) -> Result<MinimalMedium, MediumError> {
    let mut problem = model.build_problem()?;
    minimal_medium_with_problem(&mut problem, model, exchange_reactions, options)
}

/// Find minimal media using an already built flux problem of `model`
///
/// The problem is left as it was found, so it can be reused for several searches (for
/// instance one per organism biomass reaction).
#[instrument(skip_all, fields(model = %model.id, candidates = exchange_reactions.len()))]
pub fn minimal_medium_with_problem(
    problem: &mut Problem,
    model: &Model,
    exchange_reactions: &[&str],
    options: &MediumOptions,
) -> Result<MinimalMedium, MediumError> {
    let biomass = options
        .biomass_reaction
        .as_deref()
        .or(model.biomass_reaction.as_deref())
        .ok_or_else(|| MediumError::NoBiomassReaction(model.id.clone()))?;
    if !problem.has_variable(biomass) {
        return Err(MediumError::UnknownReaction(biomass.to_string()));
    }
    if let Some(unknown) = exchange_reactions.iter().find(|r| !problem.has_variable(r)) {
        return Err(MediumError::UnknownReaction(unknown.to_string()));
    }

    let mut scope = ScopedProblem::new(problem);
    scope.add_inequality_constraint(
        "_medium_min_growth",
        &[biomass],
        &[1.],
        options.min_growth,
        f64::INFINITY,
    )?;

    let mut indicators = Vec::with_capacity(exchange_reactions.len());
    let mut weights = Vec::with_capacity(exchange_reactions.len());
    for reaction in exchange_reactions {
        let indicator = format!("y_{}", reaction);
        scope.add_variable(&indicator, VariableType::Binary, 0., 1.)?;
        scope.add_inequality_constraint(
            &format!("_medium_uptake_{}", reaction),
            &[*reaction, indicator.as_str()],
            &[1., options.max_uptake],
            0.,
            f64::INFINITY,
        )?;
        weights.push(match options.weights.get(*reaction) {
            Some(weight) => *weight,
            None if options.mass_weighted => uptake_weight(model, reaction),
            None => 1.,
        });
        indicators.push(indicator);
    }
    let indicator_ids: Vec<&str> = indicators.iter().map(|y| y.as_str()).collect();
    if let Some(max_compounds) = options.max_compounds {
        scope.add_inequality_constraint(
            "_medium_max_compounds",
            &indicator_ids,
            &vec![1.; indicator_ids.len()],
            f64::NEG_INFINITY,
            max_compounds as f64,
        )?;
    }
    scope.set_objective(
        indicator_ids.iter().copied().zip(weights.iter().copied()),
        ObjectiveSense::Minimize,
    )?;

    let first = scope.optimize()?;
    if !first.is_optimal() {
        warn!(status = ?first.status, "No medium supports the requested growth");
        return Ok(MinimalMedium {
            media: Vec::new(),
            solutions: vec![first],
        });
    }
    let solutions = if options.n_solutions <= 1 {
        vec![first]
    } else {
        scope.enumerate(
            Some(first),
            &indicators,
            options.n_solutions,
            options.enumeration,
            options.abstol,
        )?
    };
    let media: Vec<IndexSet<String>> = solutions
        .iter()
        .map(|solution| {
            exchange_reactions
                .iter()
                .filter(|r| solution.value(r).is_some_and(|v| v < -options.abstol))
                .map(|r| r.to_string())
                .collect()
        })
        .collect();
    debug!(
        media = media.len(),
        smallest = media.iter().map(|m| m.len()).min(),
        "Found minimal media"
    );
    Ok(MinimalMedium { media, solutions })
}

/// Molecular weight of the substrates of an uptake reaction, 1 when a formula is missing
fn uptake_weight(model: &Model, reaction: &str) -> f64 {
    let weight: Option<f64> = model.reactions.get(reaction).and_then(|rxn| {
        rxn.metabolites
            .iter()
            .filter(|(_, coef)| **coef < 0.)
            .map(|(met, _)| {
                model
                    .metabolites
                    .get(met)
                    .and_then(|m| m.molecular_weight())
            })
            .sum()
    });
    match weight {
        Some(w) if w > 0. => w,
        _ => {
            warn!(reaction, "No molecular weight for uptake reaction, using 1");
            1.
        }
    }
}

/// Errors raised while searching for minimal media
#[derive(Error, Debug)]
pub enum MediumError {
    /// Building or solving the optimization problem failed
    #[error(transparent)]
    Problem(#[from] ProblemError),
    /// Applying bounds to the model failed
    #[error(transparent)]
    Model(#[from] ModelError),
    /// Neither the options nor the model name a biomass reaction
    #[error("No biomass reaction to constrain in model {0}")]
    NoBiomassReaction(String),
    /// A reaction isn't part of the model
    #[error("Reaction {0} is not in the model")]
    UnknownReaction(String),
}
