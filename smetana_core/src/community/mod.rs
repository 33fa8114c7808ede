//! Microbial communities, and merging their members into a single network
//!
//! A [`Community`] is an immutable value holding the organism models and the merge options.
//! [`build`] turns it into a [`MergedNetwork`], a single [`Model`] in which every organism
//! keeps its own namespaced copy of its network, and organisms trade metabolites through a
//! shared pool compartment.
pub mod builder;
pub mod ids;
pub mod mapping;

use std::sync::Arc;

use derive_builder::Builder;
use indexmap::{IndexMap, IndexSet};
use thiserror::Error;
use tracing::warn;

pub use builder::{build, MergedNetwork};
pub use ids::{EntityId, Namespace};
pub use mapping::{ExchangeMapping, ExchangeMappingEntry};

use crate::metabolic_model::model::Model;

/// Options controlling how a community is merged
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct CommunityOptions {
    /// Deep copy models when adding them, instead of sharing them with other communities
    #[builder(default = "true")]
    pub copy_models: bool,
    /// Whether organisms can exchange metabolites, when false exports go to private sinks
    #[builder(default = "true")]
    pub interacting: bool,
    /// Aggregate organism growth into a single community growth reaction
    #[builder(default = "true")]
    pub create_biomass_reaction: bool,
    /// Share the extracellular compartment instead of creating a pool
    #[builder(default = "false")]
    pub merge_extracellular_compartments: bool,
    /// Id of the extracellular compartment in the organism models
    #[builder(setter(into), default = "\"e\".to_string()")]
    pub extracellular_compartment: String,
    /// Metabolites which can't be taken up again once exported
    #[builder(default = "IndexSet::new()")]
    pub blacklist: IndexSet<String>,
}

impl Default for CommunityOptions {
    fn default() -> Self {
        CommunityOptions {
            copy_models: true,
            interacting: true,
            create_biomass_reaction: true,
            merge_extracellular_compartments: false,
            extracellular_compartment: "e".to_string(),
            blacklist: IndexSet::new(),
        }
    }
}

/// A microbial community, a set of organism models with merge options
#[derive(Debug, Clone)]
pub struct Community {
    id: String,
    organisms: IndexMap<String, Arc<Model>>,
    options: CommunityOptions,
}

impl Community {
    /// Create a community from organism models, organisms are keyed by model id
    pub fn new<I>(id: &str, models: I, options: CommunityOptions) -> Self
    where
        I: IntoIterator<Item = Model>,
    {
        let mut community = Community {
            id: id.to_string(),
            organisms: IndexMap::new(),
            options,
        };
        for model in models {
            community.insert_organism(Arc::new(model));
        }
        community
    }

    /// Id of the community
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Merge options of the community
    pub fn options(&self) -> &CommunityOptions {
        &self.options
    }

    /// Organism ids, in insertion order
    pub fn organisms(&self) -> impl Iterator<Item = &str> {
        self.organisms.keys().map(|k| k.as_str())
    }

    /// Model of an organism
    pub fn organism(&self, organism: &str) -> Option<&Model> {
        self.organisms.get(organism).map(|m| m.as_ref())
    }

    /// Number of organisms
    pub fn size(&self) -> usize {
        self.organisms.len()
    }

    /// Iterate over (organism id, model) pairs
    pub(crate) fn models(&self) -> impl Iterator<Item = (&str, &Model)> {
        self.organisms.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// A community with an extra organism, a duplicate organism id is ignored with a warning
    pub fn add_organism(&self, model: Arc<Model>) -> Community {
        let mut community = self.clone();
        community.insert_organism(model);
        community
    }

    /// A community without an organism, unknown ids are ignored with a warning
    pub fn remove_organism(&self, organism: &str) -> Community {
        let mut community = self.clone();
        if community.organisms.shift_remove(organism).is_none() {
            warn!(community = %self.id, organism, "Organism is not part of the community");
        }
        community
    }

    /// The same organisms merged with different options
    ///
    /// Models are shared with this community unless the new options ask for copies
    pub fn with_options(&self, options: CommunityOptions) -> Community {
        let copy = options.copy_models;
        let organisms = self
            .organisms
            .iter()
            .map(|(id, model)| {
                let model = if copy {
                    Arc::new(model.as_ref().clone())
                } else {
                    Arc::clone(model)
                };
                (id.clone(), model)
            })
            .collect();
        Community {
            id: self.id.clone(),
            organisms,
            options,
        }
    }

    /// Same community, but interacting or not and with or without biomass aggregation
    ///
    /// Variants always trade through pool compartments, since organism reactions and
    /// non-interacting sinks have to stay private to each organism.
    pub(crate) fn variant(&self, interacting: bool, create_biomass_reaction: bool) -> Community {
        self.with_options(CommunityOptions {
            copy_models: false,
            interacting,
            create_biomass_reaction,
            merge_extracellular_compartments: false,
            ..self.options.clone()
        })
    }

    fn insert_organism(&mut self, model: Arc<Model>) {
        if self.organisms.contains_key(&model.id) {
            warn!(
                community = %self.id,
                organism = %model.id,
                "Organism already in the community, ignoring it"
            );
            return;
        }
        let model = if self.options.copy_models {
            Arc::new(model.as_ref().clone())
        } else {
            model
        };
        self.organisms.insert(model.id.clone(), model);
    }
}

/// Errors raised while merging a community
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommunityError {
    /// Some organisms lack the extracellular compartment
    #[error("Extracellular compartment '{compartment}' missing from models: {}", .organisms.join(", "))]
    MissingExtracellularCompartment {
        /// Id of the extracellular compartment
        compartment: String,
        /// All organisms lacking it
        organisms: Vec<String>,
    },
    /// Some organisms have no biomass reaction
    #[error("Biomass reaction not found in models: {}", .0.join(", "))]
    MissingBiomassReaction(Vec<String>),
    /// Non-interacting communities need a pool to route exports to private sinks
    #[error("Non-interacting communities are not supported when merging extracellular compartments")]
    NonInteractingMergedCompartments,
}
