//! Metabolite uptake score
use indexmap::IndexMap;
use tracing::{instrument, warn};

use crate::community::{build, Community};
use crate::environment::Environment;
use crate::medium::minimal_medium_with_problem;
use crate::scores::{apply_environment, OrganismScores, ScoreError, ScoreParameters};

/// Frequency with which each organism needs each metabolite to grow
///
/// Alternative minimal media are enumerated over the exchange reactions of each organism,
/// the score of a metabolite is the fraction of media taking it up. Organisms without any
/// growth medium get `None`.
#[instrument(skip_all, fields(community = %community.id()))]
pub fn metabolite_uptake_score(
    community: &Community,
    environment: Option<&Environment>,
    params: &ScoreParameters,
) -> Result<OrganismScores, ScoreError> {
    let mut merged = build(&community.variant(true, false))?;
    apply_environment(&mut merged.model, environment)?;
    let mut problem = merged.model.build_problem()?;
    let max_uptake = params.max_uptake_for(community);

    let mut scores = OrganismScores::new();
    for org in merged.organisms() {
        let Some(exchanges) = merged.organism_exchange_reactions(org) else {
            continue;
        };
        let options = params.medium_options(
            max_uptake,
            params.n_solutions,
            merged.organism_biomass_reaction(org),
        );
        let candidates: Vec<&str> = exchanges.keys().map(|r| r.as_str()).collect();
        let result =
            minimal_medium_with_problem(&mut problem, &merged.model, &candidates, &options)?;
        if !result.is_feasible() {
            warn!(organism = org, "MUS: failed to find a minimal growth medium");
            scores.insert(org.to_string(), None);
            continue;
        }
        let n = result.media.len() as f64;
        let frequencies: IndexMap<String, f64> = exchanges
            .iter()
            .map(|(reaction, entry)| {
                let count = result.media.iter().filter(|m| m.contains(reaction)).count();
                (entry.original_metabolite.clone(), count as f64 / n)
            })
            .collect();
        scores.insert(org.to_string(), Some(frequencies));
    }
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::test_utils::{community, environment};

    #[test]
    fn consumer_takes_up_acetate() {
        let comm = community(&["producer", "consumer"]);
        let env = environment(&["glc_e"]);
        let scores =
            metabolite_uptake_score(&comm, Some(&env), &ScoreParameters::default()).unwrap();
        let consumer = scores["consumer"].as_ref().unwrap();
        assert_eq!(consumer["ac_e"], 1.);
        let producer = scores["producer"].as_ref().unwrap();
        assert_eq!(producer["glc_e"], 1.);
        assert_eq!(producer["ac_e"], 0.);
    }

    #[test]
    fn starving_organism_is_none() {
        let comm = community(&["producer", "consumer"]);
        let env = environment(&["ac_e"]);
        let scores =
            metabolite_uptake_score(&comm, Some(&env), &ScoreParameters::default()).unwrap();
        assert_eq!(scores["producer"], None);
        assert!(scores["consumer"].is_some());
    }
}
