//! Growth environments, bounds on the exchange reactions of a network
use indexmap::{IndexMap, IndexSet};
use rand::Rng;
use tracing::{debug, warn};

use crate::community::MergedNetwork;
use crate::medium::{minimal_medium, MediumError, MediumOptions};
use crate::metabolic_model::model::{Model, ModelError};

/// Ordered map of exchange reaction id to (lower bound, upper bound)
///
/// Uptake is negative flux, so a compound is available when its exchange reaction has a
/// negative lower bound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    bounds: IndexMap<String, (f64, f64)>,
}

impl Environment {
    /// An empty environment
    pub fn new() -> Self {
        Environment::default()
    }

    /// Set the bounds of an exchange reaction
    pub fn insert(&mut self, reaction: &str, lower_bound: f64, upper_bound: f64) {
        self.bounds
            .insert(reaction.to_string(), (lower_bound, upper_bound));
    }

    /// Bounds of an exchange reaction
    pub fn get(&self, reaction: &str) -> Option<(f64, f64)> {
        self.bounds.get(reaction).copied()
    }

    /// Whether the environment constrains a reaction
    pub fn contains(&self, reaction: &str) -> bool {
        self.bounds.contains_key(reaction)
    }

    /// Iterate over (reaction id, (lower bound, upper bound))
    pub fn iter(&self) -> impl Iterator<Item = (&str, (f64, f64))> {
        self.bounds.iter().map(|(r, b)| (r.as_str(), *b))
    }

    /// Ids of the constrained reactions
    pub fn reactions(&self) -> impl Iterator<Item = &str> {
        self.bounds.keys().map(|r| r.as_str())
    }

    /// Number of constrained reactions
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    /// Whether the environment constrains nothing
    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Environment providing `max_uptake` of every listed reaction, secretion is unbounded
    pub fn from_reactions<'a, I>(reactions: I, max_uptake: f64) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut env = Environment::new();
        for reaction in reactions {
            env.insert(reaction, -max_uptake, f64::INFINITY);
        }
        env
    }

    /// Environment providing a set of compounds
    ///
    /// `fmt` turns a compound id into the id of its exchange reaction, for a merged community
    /// [`pool_exchange_id`](crate::community::ids::pool_exchange_id) does that.
    pub fn from_compounds<'a, I, F>(compounds: I, fmt: F, max_uptake: f64) -> Self
    where
        I: IntoIterator<Item = &'a str>,
        F: Fn(&str) -> String,
    {
        let mut env = Environment::new();
        for compound in compounds {
            env.insert(&fmt(compound), -max_uptake, f64::INFINITY);
        }
        env
    }

    /// Environment providing every compound the model can exchange
    pub fn complete(model: &Model, max_uptake: f64) -> Self {
        Environment::from_reactions(model.exchange_reactions(), max_uptake)
    }

    /// Minimal medium of the interacting community, starting from a complete environment
    ///
    /// Returns `None` (with a warning) when the community can't grow on any medium.
    pub fn minimal(
        merged: &MergedNetwork,
        options: &MediumOptions,
    ) -> Result<Option<Environment>, MediumError> {
        Environment::smallest_medium(merged, options, "minimal")
    }

    /// Random growth supporting environment of the interacting community
    ///
    /// Every community exchange reaction gets a random weight in `[0.001, 1)` and the lightest
    /// medium under these weights is kept, so each draw favours different compounds. The same
    /// seeded generator gives the same environment. Returns `None` (with a warning) when the
    /// community can't grow on any medium.
    pub fn random<R: Rng>(
        merged: &MergedNetwork,
        options: &MediumOptions,
        rng: &mut R,
    ) -> Result<Option<Environment>, MediumError> {
        let weights = merged
            .model
            .exchange_reactions()
            .into_iter()
            .map(|r| (r.to_string(), rng.gen_range(0.001..1.)))
            .collect();
        let options = MediumOptions {
            weights,
            ..options.clone()
        };
        Environment::smallest_medium(merged, &options, "random")
    }

    fn smallest_medium(
        merged: &MergedNetwork,
        options: &MediumOptions,
        kind: &str,
    ) -> Result<Option<Environment>, MediumError> {
        let env = Environment::complete(&merged.model, options.max_uptake);
        let mut model = merged.model.clone();
        env.apply(&mut model, true)?;
        let reactions: Vec<&str> = env.reactions().collect();
        let result = minimal_medium(&model, &reactions, options)?;
        match result.media.first() {
            Some(medium) => {
                debug!(
                    community = %merged.model.id,
                    compounds = medium.len(),
                    kind,
                    "Found environment"
                );
                Ok(Some(Environment::from_reactions(
                    medium.iter().map(|r| r.as_str()),
                    options.max_uptake,
                )))
            }
            None => {
                warn!(community = %merged.model.id, kind, "Failed to find an environment");
                Ok(None)
            }
        }
    }

    /// Constrain the exchange reactions of a model
    ///
    /// With `exclusive`, exchange reactions not in the environment are first closed for
    /// uptake. Reactions unknown to the model are skipped with a warning.
    pub fn apply(&self, model: &mut Model, exclusive: bool) -> Result<(), ModelError> {
        if exclusive {
            let closed: Vec<String> = model
                .exchange_reactions()
                .into_iter()
                .filter(|r| !self.contains(r))
                .map(|r| r.to_string())
                .collect();
            for reaction in closed {
                model.set_reaction_bounds(&reaction, 0., f64::INFINITY)?;
            }
        }
        for (reaction, (lower_bound, upper_bound)) in self.iter() {
            if !model.reactions.contains_key(reaction) {
                warn!(model = %model.id, reaction, "Environment reaction not in the model");
                continue;
            }
            model.set_reaction_bounds(reaction, lower_bound, upper_bound)?;
        }
        Ok(())
    }

    /// Original ids of the compounds available in the environment
    ///
    /// Reactions are translated through the exchange mapping of the merged network, the ones
    /// it doesn't know are skipped.
    pub fn compounds(&self, merged: &MergedNetwork) -> IndexSet<String> {
        self.iter()
            .filter(|(_, (lb, _))| *lb < 0.)
            .filter_map(|(r, _)| merged.exchange_mapping.compound_of(r))
            .map(|c| c.to_string())
            .collect()
    }
}
