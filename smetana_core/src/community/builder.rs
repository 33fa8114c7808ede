//! Merging the organisms of a community into one network
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, instrument, warn};

use crate::community::ids::EntityId;
use crate::community::mapping::{ExchangeMapping, ExchangeMappingEntry};
use crate::community::{Community, CommunityError, CommunityOptions};
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::{Reaction, ReactionType};

const POOL_COMPARTMENT: &str = "pool";
const POOL_BLACKLIST_COMPARTMENT: &str = "pool_blacklist";
const COMMUNITY_GROWTH: &str = "R_Community_Growth";

/// A community merged into a single network
#[derive(Debug, Clone)]
pub struct MergedNetwork {
    /// The merged model
    pub model: Model,
    /// Exchange reactions of every organism and how they map to the community
    pub exchange_mapping: ExchangeMapping,
    organisms: Vec<String>,
    /// Merged ids of the reactions copied from each organism
    organism_reactions: IndexMap<String, Vec<String>>,
    /// Merged id of the biomass reaction of each organism
    organism_biomass: IndexMap<String, String>,
    /// Structured id of every rendered compartment, metabolite and reaction id
    entities: IndexMap<String, EntityId>,
}

impl MergedNetwork {
    /// Organism ids, in community order
    pub fn organisms(&self) -> impl Iterator<Item = &str> {
        self.organisms.iter().map(|o| o.as_str())
    }

    /// Merged ids of the reactions owned by an organism
    pub fn organism_reactions(&self, organism: &str) -> &[String] {
        self.organism_reactions
            .get(organism)
            .map(|r| r.as_slice())
            .unwrap_or_default()
    }

    /// Merged id of the biomass reaction of an organism
    pub fn organism_biomass_reaction(&self, organism: &str) -> Option<&str> {
        self.organism_biomass.get(organism).map(|r| r.as_str())
    }

    /// Merged ids of all organism biomass reactions, keyed by organism
    pub fn organism_biomass_reactions(&self) -> &IndexMap<String, String> {
        &self.organism_biomass
    }

    /// Exchange reactions of an organism, keyed by merged reaction id
    pub fn organism_exchange_reactions(
        &self,
        organism: &str,
    ) -> Option<&IndexMap<String, ExchangeMappingEntry>> {
        self.exchange_mapping.organism(organism)
    }

    /// Reactions exchanging metabolites between the community and the environment
    pub fn community_exchange_reactions(&self) -> Vec<&str> {
        self.model.exchange_reactions()
    }

    /// Structured id of a rendered id
    pub fn entity(&self, rendered: &str) -> Option<&EntityId> {
        self.entities.get(rendered)
    }

    /// Split a flux distribution of the merged model into per organism distributions
    ///
    /// Only reactions copied from an organism model are kept, keyed by their original id.
    pub fn split_fluxes(
        &self,
        fluxes: &IndexMap<String, f64>,
    ) -> IndexMap<String, IndexMap<String, f64>> {
        let mut split: IndexMap<String, IndexMap<String, f64>> = self
            .organisms
            .iter()
            .map(|o| (o.clone(), IndexMap::new()))
            .collect();
        for (organism, reactions) in &self.organism_reactions {
            let Some(org_fluxes) = split.get_mut(organism) else {
                continue;
            };
            for rxn in reactions {
                let (Some(entity), Some(flux)) = (self.entities.get(rxn), fluxes.get(rxn)) else {
                    continue;
                };
                org_fluxes.insert(entity.local.clone(), *flux);
            }
        }
        split
    }
}

/// Accumulates the merged model while organisms are added
struct Merger<'a> {
    options: &'a CommunityOptions,
    merged: MergedNetwork,
    /// Organism biomass metabolites consumed by the community growth reaction
    biomass_metabolites: Vec<String>,
}

impl Merger<'_> {
    fn register(&mut self, entity: EntityId) -> String {
        let rendered = entity.render();
        if let Some(previous) = self.merged.entities.get(&rendered) {
            if *previous != entity {
                warn!(id = %rendered, "Merged id is shared by two different entities");
            }
        }
        self.merged.entities.insert(rendered.clone(), entity);
        rendered
    }

    fn is_shared(&self, compartment: Option<&str>) -> bool {
        self.options.merge_extracellular_compartments
            && compartment == Some(self.options.extracellular_compartment.as_str())
    }

    /// Merged id of an organism metabolite
    fn metabolite_id(&self, model: &Model, organism: &str, metabolite: &str) -> EntityId {
        if self.is_shared(model.metabolite_compartment(metabolite)) {
            EntityId::community(metabolite)
        } else {
            EntityId::organism(metabolite, organism)
        }
    }

    fn add_pool_compartments(&mut self) {
        let pool = self.register(EntityId::community(POOL_COMPARTMENT));
        self.merged.model.add_compartment(&pool, "common pool");
        let blacklist = self.register(EntityId::community(POOL_BLACKLIST_COMPARTMENT));
        self.merged
            .model
            .add_compartment(&blacklist, "blacklisted metabolite pool");
    }

    fn add_compartments(&mut self, organism: &str, model: &Model) {
        for (c_id, name) in &model.compartments {
            if self.is_shared(Some(c_id)) {
                if !self.merged.model.compartments.contains_key(c_id) {
                    let id = self.register(EntityId::community(c_id));
                    self.merged.model.add_compartment(&id, name);
                }
            } else {
                let id = self.register(EntityId::organism(c_id, organism));
                self.merged
                    .model
                    .add_compartment(&id, &format!("{} ({})", name, organism));
            }
        }
    }

    fn add_metabolites(&mut self, organism: &str, model: &Model, exchanged: &IndexSet<&str>) {
        for (m_id, met) in &model.metabolites {
            let entity = self.metabolite_id(model, organism, m_id);
            if entity.organism_id().is_some() || !self.merged.model.metabolites.contains_key(m_id)
            {
                let id = self.register(entity);
                let mut new_met = met.clone();
                new_met.id = id;
                if !self.is_shared(met.compartment.as_deref()) {
                    new_met.compartment = met
                        .compartment
                        .as_deref()
                        .map(|c| EntityId::organism(c, organism).render());
                    new_met.name = met.name.as_ref().map(|n| format!("{} ({})", n, organism));
                }
                self.merged.model.add_metabolite(new_met);
            }
            if !self.options.merge_extracellular_compartments && exchanged.contains(m_id.as_str())
            {
                self.add_pool_metabolite(met);
            }
        }
    }

    /// Pool metabolite and community exchange reaction of an exchanged metabolite, and the
    /// blacklist pool when needed
    fn add_pool_metabolite(&mut self, met: &Metabolite) {
        if self.options.interacting && self.options.blacklist.contains(&met.id) {
            let pool_id = EntityId::pool_blacklist(&met.id).render();
            if !self.merged.model.metabolites.contains_key(&pool_id) {
                self.add_pool_copy(met, EntityId::pool_blacklist(&met.id), POOL_BLACKLIST_COMPARTMENT);
                let exch_id = self.register(EntityId::pool_blacklist(&format!("R_EX_{}", met.id)));
                self.merged.model.add_reaction(Reaction {
                    id: exch_id,
                    metabolites: IndexMap::from([(pool_id, -1.)]),
                    name: met.name.as_ref().map(|n| format!("{} (pool (blacklist) exchange)", n)),
                    lower_bound: 0.,
                    upper_bound: f64::INFINITY,
                    reaction_type: ReactionType::Sink,
                    subsystem: None,
                });
            }
        }
        let pool_id = EntityId::pool(&met.id).render();
        if !self.merged.model.metabolites.contains_key(&pool_id) {
            self.add_pool_copy(met, EntityId::pool(&met.id), POOL_COMPARTMENT);
            let exch_id = self.register(EntityId::pool(&format!("R_EX_{}", met.id)));
            self.merged.model.add_reaction(Reaction {
                id: exch_id,
                metabolites: IndexMap::from([(pool_id, -1.)]),
                name: met.name.as_ref().map(|n| format!("{} (pool exchange)", n)),
                lower_bound: f64::NEG_INFINITY,
                upper_bound: f64::INFINITY,
                reaction_type: ReactionType::Exchange,
                subsystem: None,
            });
        }
    }

    fn add_pool_copy(&mut self, met: &Metabolite, entity: EntityId, compartment: &str) {
        let id = self.register(entity);
        let mut new_met = met.clone();
        new_met.id = id;
        new_met.compartment = Some(compartment.to_string());
        self.merged.model.add_metabolite(new_met);
    }

    fn add_reactions(&mut self, organism: &str, model: &Model) {
        let biomass = model.biomass_reaction.as_deref();
        let merge = self.options.merge_extracellular_compartments;
        for (r_id, rxn) in &model.reactions {
            let is_exchange = rxn.reaction_type == ReactionType::Exchange;
            let is_biomass = biomass == Some(r_id.as_str());
            let merged_id = if is_exchange && merge {
                self.add_shared_exchange(organism, rxn, is_biomass)
            } else {
                self.add_organism_reaction(organism, model, rxn, is_exchange, is_biomass)
            };
            self.merged
                .organism_reactions
                .entry(organism.to_string())
                .or_default()
                .push(merged_id.clone());
            if is_biomass {
                self.merged
                    .organism_biomass
                    .insert(organism.to_string(), merged_id);
            }
        }
    }

    /// Namespaced copy of an organism reaction, exchanges are rewired to the pool
    fn add_organism_reaction(
        &mut self,
        organism: &str,
        model: &Model,
        rxn: &Reaction,
        is_exchange: bool,
        is_biomass: bool,
    ) -> String {
        let id = self.register(EntityId::organism(&rxn.id, organism));
        let mut new_rxn = rxn.clone();
        new_rxn.id = id.clone();
        new_rxn.name = rxn.name.as_ref().map(|n| format!("{} ({})", n, organism));
        new_rxn.metabolites = rxn
            .metabolites
            .iter()
            .map(|(m, c)| (self.metabolite_id(model, organism, m).render(), *c))
            .collect();

        if is_exchange {
            let mut pooled = false;
            let mut blacklisted = false;
            for (m_id, coef) in &rxn.metabolites {
                if model.metabolite_compartment(m_id)
                    != Some(self.options.extracellular_compartment.as_str())
                {
                    continue;
                }
                pooled = true;
                blacklisted |= self.options.blacklist.contains(m_id);
                self.rewire_to_pool(organism, &id, &rxn.id, m_id, *coef, &mut new_rxn);
            }
            if pooled {
                new_rxn.reaction_type = ReactionType::Other;
                new_rxn.lower_bound = f64::NEG_INFINITY;
                new_rxn.upper_bound = if self.options.interacting && !blacklisted {
                    f64::INFINITY
                } else {
                    0.
                };
            } else {
                // Not an extracellular exchange, keep it as a private reaction
                new_rxn.reaction_type = ReactionType::Other;
            }
        }

        if is_biomass {
            new_rxn.make_irreversible();
            if self.options.create_biomass_reaction {
                let met_id = self.add_biomass_metabolite(organism);
                new_rxn.metabolites.insert(met_id, 1.);
            }
        }
        self.merged.model.add_reaction(new_rxn);
        id
    }

    /// Make an organism exchange reaction trade with the pool, and add its private sink or
    /// blacklist export
    fn rewire_to_pool(
        &mut self,
        organism: &str,
        merged_reaction: &str,
        original_reaction: &str,
        metabolite: &str,
        coefficient: f64,
        new_rxn: &mut Reaction,
    ) {
        let organism_met = EntityId::organism(metabolite, organism).render();
        let pool_id = EntityId::pool(metabolite).render();
        let community_exchange = EntityId::pool(&format!("R_EX_{}", metabolite)).render();
        new_rxn.metabolites.insert(pool_id.clone(), -coefficient);
        self.merged.exchange_mapping.insert(
            organism,
            ExchangeMappingEntry {
                original_reaction: original_reaction.to_string(),
                organism_reaction: merged_reaction.to_string(),
                original_metabolite: metabolite.to_string(),
                organism_metabolite: Some(organism_met.clone()),
                extracellular_metabolite: pool_id,
                community_exchange_reaction: community_exchange,
            },
        );
        if !self.options.interacting {
            let sink_id = self.register(EntityId::organism(&format!("Sink_{}", metabolite), organism));
            self.merged.model.add_reaction(Reaction {
                id: sink_id,
                metabolites: IndexMap::from([(organism_met, -1.)]),
                name: None,
                lower_bound: 0.,
                upper_bound: f64::INFINITY,
                reaction_type: ReactionType::Sink,
                subsystem: None,
            });
        } else if self.options.blacklist.contains(metabolite) {
            let export_id = self.register(EntityId::organism(
                &format!("R_EX_BLACKLIST_{}", metabolite),
                organism,
            ));
            self.merged.model.add_reaction(Reaction {
                id: export_id,
                metabolites: IndexMap::from([
                    (organism_met, -1.),
                    (EntityId::pool_blacklist(metabolite).render(), 1.),
                ]),
                name: None,
                lower_bound: 0.,
                upper_bound: f64::INFINITY,
                reaction_type: ReactionType::Other,
                subsystem: None,
            });
        }
    }

    /// Exchange reaction shared through the merged extracellular compartment
    fn add_shared_exchange(&mut self, organism: &str, rxn: &Reaction, is_biomass: bool) -> String {
        if let Some(met) = rxn.metabolites.keys().next() {
            self.merged.exchange_mapping.insert(
                organism,
                ExchangeMappingEntry {
                    original_reaction: rxn.id.clone(),
                    organism_reaction: rxn.id.clone(),
                    original_metabolite: met.clone(),
                    organism_metabolite: None,
                    extracellular_metabolite: met.clone(),
                    community_exchange_reaction: rxn.id.clone(),
                },
            );
        }
        if !self.merged.model.reactions.contains_key(&rxn.id) {
            let id = self.register(EntityId::community(&rxn.id));
            let mut new_rxn = rxn.clone();
            new_rxn.id = id;
            new_rxn.reaction_type = ReactionType::Exchange;
            if is_biomass && self.options.create_biomass_reaction {
                new_rxn.make_irreversible();
                let met_id = self.add_biomass_metabolite(organism);
                new_rxn.metabolites.insert(met_id, 1.);
            }
            self.merged.model.add_reaction(new_rxn);
        }
        rxn.id.clone()
    }

    fn add_biomass_metabolite(&mut self, organism: &str) -> String {
        let id = self.register(EntityId::organism("Biomass", organism));
        let compartment = if self.options.merge_extracellular_compartments {
            self.options.extracellular_compartment.clone()
        } else {
            POOL_COMPARTMENT.to_string()
        };
        self.merged.model.add_metabolite(Metabolite {
            id: id.clone(),
            name: Some(format!("Biomass ({})", organism)),
            compartment: Some(compartment),
            charge: 0,
            formula: None,
        });
        self.biomass_metabolites.push(id.clone());
        id
    }

    fn finish(mut self) -> MergedNetwork {
        if self.options.create_biomass_reaction {
            let id = self.register(EntityId::community(COMMUNITY_GROWTH));
            self.merged.model.add_reaction(Reaction {
                id: id.clone(),
                metabolites: self
                    .biomass_metabolites
                    .iter()
                    .map(|m| (m.clone(), -1.))
                    .collect(),
                name: Some("Community Growth".to_string()),
                lower_bound: 0.,
                upper_bound: f64::INFINITY,
                reaction_type: ReactionType::Sink,
                subsystem: None,
            });
            self.merged.model.biomass_reaction = Some(id.clone());
            self.merged.model.objective = IndexMap::from([(id, 1.)]);
        } else {
            // Without aggregation every organism keeps its own growth objective
            self.merged.model.objective = self
                .merged
                .organism_biomass
                .values()
                .map(|r| (r.clone(), 1.))
                .collect();
        }
        self.merged
    }
}

fn check_structure(community: &Community) -> Result<(), CommunityError> {
    let options = community.options();
    if !options.interacting && options.merge_extracellular_compartments {
        return Err(CommunityError::NonInteractingMergedCompartments);
    }
    let missing_compartment: Vec<String> = community
        .models()
        .filter(|(_, m)| !m.compartments.contains_key(&options.extracellular_compartment))
        .map(|(id, _)| id.to_string())
        .collect();
    if !missing_compartment.is_empty() {
        return Err(CommunityError::MissingExtracellularCompartment {
            compartment: options.extracellular_compartment.clone(),
            organisms: missing_compartment,
        });
    }
    let missing_biomass: Vec<String> = community
        .models()
        .filter(|(_, m)| {
            m.biomass_reaction
                .as_ref()
                .is_none_or(|b| !m.reactions.contains_key(b))
        })
        .map(|(id, _)| id.to_string())
        .collect();
    if !missing_biomass.is_empty() {
        return Err(CommunityError::MissingBiomassReaction(missing_biomass));
    }
    Ok(())
}

/// Merge the organisms of a community into a single network
///
/// Fails without producing anything if an organism lacks the extracellular compartment or a
/// biomass reaction (all offending organisms are named), or if a non-interacting community
/// asks for merged extracellular compartments.
#[instrument(skip_all, fields(community = %community.id()))]
pub fn build(community: &Community) -> Result<MergedNetwork, CommunityError> {
    check_structure(community)?;
    let options = community.options();
    let mut merger = Merger {
        options,
        merged: MergedNetwork {
            model: Model::new(community.id()),
            exchange_mapping: ExchangeMapping::default(),
            organisms: community.organisms().map(|o| o.to_string()).collect(),
            organism_reactions: IndexMap::new(),
            organism_biomass: IndexMap::new(),
            entities: IndexMap::new(),
        },
        biomass_metabolites: Vec::new(),
    };
    if !options.merge_extracellular_compartments {
        merger.add_pool_compartments();
    }
    for (organism, model) in community.models() {
        merger.merged.exchange_mapping.add_organism(organism);
        let exchanged: IndexSet<&str> = model
            .reactions
            .values()
            .filter(|r| r.reaction_type == ReactionType::Exchange)
            .flat_map(|r| r.metabolites.keys())
            .filter(|m| model.metabolite_compartment(m) == Some(options.extracellular_compartment.as_str()))
            .map(|m| m.as_str())
            .collect();
        merger.add_compartments(organism, model);
        merger.add_metabolites(organism, model, &exchanged);
        merger.add_reactions(organism, model);
    }
    let merged = merger.finish();
    debug!(
        organisms = merged.organisms.len(),
        reactions = merged.model.reactions.len(),
        metabolites = merged.model.metabolites.len(),
        "Merged community"
    );
    Ok(merged)
}
