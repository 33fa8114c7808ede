//! Structured identifiers of the entities in a merged community network
//!
//! Every compartment, metabolite and reaction of a merged network is named by a local id
//! plus the namespace it lives in. The flat string handed to the solver is only produced by
//! [`EntityId::render`], and the merged network keeps an index back from rendered ids, so
//! nothing ever has to slice organism suffixes off a string.
use std::fmt::{Display, Formatter};

/// Namespace an entity of the merged network belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Copied from the organism with this id
    Organism(String),
    /// Part of the shared metabolite pool
    Pool,
    /// Part of the pool for blacklisted (export only) metabolites
    PoolBlacklist,
    /// Belongs to the community as a whole (community growth, shared extracellular space)
    Community,
}

/// Identifier of an entity in a merged network
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityId {
    /// Id of the entity within its namespace
    pub local: String,
    /// Namespace of the entity
    pub namespace: Namespace,
}

impl EntityId {
    /// Entity copied from an organism
    pub fn organism(local: &str, organism: &str) -> Self {
        EntityId {
            local: local.to_string(),
            namespace: Namespace::Organism(organism.to_string()),
        }
    }

    /// Entity of the shared pool
    pub fn pool(local: &str) -> Self {
        EntityId {
            local: local.to_string(),
            namespace: Namespace::Pool,
        }
    }

    /// Entity of the blacklist pool
    pub fn pool_blacklist(local: &str) -> Self {
        EntityId {
            local: local.to_string(),
            namespace: Namespace::PoolBlacklist,
        }
    }

    /// Community level entity, rendered without a suffix
    pub fn community(local: &str) -> Self {
        EntityId {
            local: local.to_string(),
            namespace: Namespace::Community,
        }
    }

    /// Organism this entity was copied from, if any
    pub fn organism_id(&self) -> Option<&str> {
        match &self.namespace {
            Namespace::Organism(org) => Some(org),
            _ => None,
        }
    }

    /// Flat id used in the merged model, `<local>_<namespace>`
    pub fn render(&self) -> String {
        match &self.namespace {
            Namespace::Organism(org) => format!("{}_{}", self.local, org),
            Namespace::Pool => format!("{}_pool", self.local),
            Namespace::PoolBlacklist => format!("{}_pool_blacklist", self.local),
            Namespace::Community => self.local.clone(),
        }
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Id of the community exchange reaction of a pooled metabolite, `R_EX_<m>_pool`
pub fn pool_exchange_id(metabolite: &str) -> String {
    EntityId::pool(&format!("R_EX_{}", metabolite)).render()
}
