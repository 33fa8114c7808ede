//! Metabolite production score
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, instrument};

use crate::community::{build, Community};
use crate::environment::Environment;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::scope::ScopedProblem;
use crate::scores::{apply_environment, ScoreError, ScoreParameters};

/// Export bound used in place of an unbounded one
const MAX_EXPORT: f64 = 1000.;

/// Metabolites each organism can secrete into the community, 1 if it can and 0 otherwise
///
/// Compounds already provided by the environment aren't considered. The summed export of
/// all candidates is maximized repeatedly, every candidate carrying flux is marked as
/// produced and dropped, until a solve unblocks nothing.
#[instrument(skip_all, fields(community = %community.id()))]
pub fn metabolite_production_score(
    community: &Community,
    environment: Option<&Environment>,
    params: &ScoreParameters,
) -> Result<IndexMap<String, IndexMap<String, f64>>, ScoreError> {
    let mut merged = build(&community.variant(true, false))?;
    apply_environment(&mut merged.model, environment)?;
    let env_compounds: IndexSet<String> = environment
        .map(|env| env.compounds(&merged))
        .unwrap_or_default();

    let exchange_reactions: Vec<String> = merged
        .exchange_mapping
        .iter()
        .flat_map(|(_, exchanges)| exchanges.keys().cloned())
        .collect();
    for reaction in &exchange_reactions {
        let Some(rxn) = merged.model.reactions.get(reaction) else {
            continue;
        };
        if rxn.upper_bound.is_infinite() {
            let lower_bound = rxn.lower_bound;
            merged
                .model
                .set_reaction_bounds(reaction, lower_bound, MAX_EXPORT)?;
        }
    }
    let mut problem = merged.model.build_problem()?;

    let mut scores = IndexMap::new();
    for (org, exchanges) in merged.exchange_mapping.iter() {
        let mut produced = IndexMap::new();
        let mut remaining: Vec<&str> = exchanges
            .iter()
            .filter(|(_, entry)| !env_compounds.contains(&entry.original_metabolite))
            .map(|(reaction, _)| reaction.as_str())
            .collect();
        while !remaining.is_empty() {
            let mut scope = ScopedProblem::new(&mut problem);
            scope.set_objective(remaining.iter().map(|r| (*r, 1.)), ObjectiveSense::Maximize)?;
            let solution = scope.optimize()?;
            if !solution.is_optimal() {
                break;
            }
            let (exported, blocked): (Vec<&str>, Vec<&str>) = remaining
                .iter()
                .partition(|r| solution.value(r).is_some_and(|v| v >= params.abstol));
            if exported.is_empty() {
                break;
            }
            for reaction in exported {
                produced.insert(exchanges[reaction].original_metabolite.clone(), 1.);
            }
            remaining = blocked;
        }
        for reaction in remaining {
            produced.insert(exchanges[reaction].original_metabolite.clone(), 0.);
        }
        debug!(organism = org, produced = produced.values().filter(|v| **v > 0.).count(), "MPS");
        scores.insert(org.to_string(), produced);
    }
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::test_utils::{community, environment};

    #[test]
    fn producer_secretes_acetate() {
        let comm = community(&["producer", "consumer"]);
        let env = environment(&["glc_e"]);
        let scores =
            metabolite_production_score(&comm, Some(&env), &ScoreParameters::default()).unwrap();
        assert_eq!(scores["producer"]["ac_e"], 1.);
        assert_eq!(scores["consumer"]["ac_e"], 0.);
        // Provided by the environment
        assert!(!scores["producer"].contains_key("glc_e"));
    }

    #[test]
    fn without_environment_everything_is_a_candidate() {
        let comm = community(&["producer", "consumer"]);
        let scores =
            metabolite_production_score(&comm, None, &ScoreParameters::default()).unwrap();
        assert!(scores["producer"].contains_key("glc_e"));
        assert_eq!(scores["producer"]["ac_e"], 1.);
    }
}
