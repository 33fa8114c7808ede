//! Exchange mapping table, translating merged exchange reactions back to organism metabolites
use indexmap::IndexMap;

/// How one organism exchange reaction appears in the merged network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeMappingEntry {
    /// Exchange reaction id in the organism model
    pub original_reaction: String,
    /// Exchange reaction id in the merged model
    pub organism_reaction: String,
    /// Exchanged metabolite id in the organism model
    pub original_metabolite: String,
    /// Organism copy of the metabolite, None when extracellular compartments are merged
    pub organism_metabolite: Option<String>,
    /// Metabolite of the shared space (pool, or merged extracellular compartment)
    pub extracellular_metabolite: String,
    /// Reaction exchanging the metabolite between the community and the environment
    pub community_exchange_reaction: String,
}

/// Per organism table of merged exchange reaction id to [`ExchangeMappingEntry`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExchangeMapping {
    organisms: IndexMap<String, IndexMap<String, ExchangeMappingEntry>>,
}

impl ExchangeMapping {
    pub(crate) fn add_organism(&mut self, organism: &str) {
        self.organisms.entry(organism.to_string()).or_default();
    }

    pub(crate) fn insert(&mut self, organism: &str, entry: ExchangeMappingEntry) {
        self.organisms
            .entry(organism.to_string())
            .or_default()
            .insert(entry.organism_reaction.clone(), entry);
    }

    /// Exchange reactions of an organism, keyed by merged reaction id
    pub fn organism(&self, organism: &str) -> Option<&IndexMap<String, ExchangeMappingEntry>> {
        self.organisms.get(organism)
    }

    /// Entry of a merged exchange reaction of an organism
    pub fn entry(&self, organism: &str, reaction: &str) -> Option<&ExchangeMappingEntry> {
        self.organisms.get(organism).and_then(|m| m.get(reaction))
    }

    /// Iterate over (organism id, exchange table) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexMap<String, ExchangeMappingEntry>)> {
        self.organisms.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Original metabolite exchanged by a community exchange reaction
    pub fn compound_of(&self, community_exchange_reaction: &str) -> Option<&str> {
        self.organisms
            .values()
            .flat_map(|m| m.values())
            .find(|e| e.community_exchange_reaction == community_exchange_reaction)
            .map(|e| e.original_metabolite.as_str())
    }

    /// Community exchange reaction of an original metabolite
    pub fn community_exchange_of(&self, metabolite: &str) -> Option<&str> {
        self.organisms
            .values()
            .flat_map(|m| m.values())
            .find(|e| e.original_metabolite == metabolite)
            .map(|e| e.community_exchange_reaction.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(org: &str, met: &str) -> ExchangeMappingEntry {
        ExchangeMappingEntry {
            original_reaction: format!("EX_{}", met),
            organism_reaction: format!("EX_{}_{}", met, org),
            original_metabolite: met.to_string(),
            organism_metabolite: Some(format!("{}_{}", met, org)),
            extracellular_metabolite: format!("{}_pool", met),
            community_exchange_reaction: format!("R_EX_{}_pool", met),
        }
    }

    #[test]
    fn lookups() {
        let mut mapping = ExchangeMapping::default();
        mapping.insert("a", entry("a", "glc_e"));
        mapping.insert("b", entry("b", "ac_e"));
        mapping.add_organism("c");
        assert_eq!(mapping.compound_of("R_EX_ac_e_pool"), Some("ac_e"));
        assert_eq!(mapping.community_exchange_of("glc_e"), Some("R_EX_glc_e_pool"));
        assert_eq!(mapping.compound_of("R_EX_x_pool"), None);
        assert!(mapping.entry("a", "EX_glc_e_a").is_some());
        assert!(mapping.organism("c").unwrap().is_empty());
        assert_eq!(mapping.iter().count(), 3);
    }
}
