//! Metabolic resource overlap
use indexmap::{IndexMap, IndexSet};
use tracing::{info, instrument, warn};

use crate::community::{build, Community};
use crate::environment::Environment;
use crate::medium::{minimal_medium, minimal_medium_with_problem};
use crate::scores::{apply_environment, exchange_universe, ScoreError, ScoreParameters};

/// Result of [`mro_score`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MroResult {
    /// Overlap of the individual media, `None` when a medium can't be found or nothing is
    /// shared between pairs (including single organism communities)
    pub score: Option<f64>,
    /// Minimal medium of the non-interacting community
    pub community_medium: Option<IndexSet<String>>,
    /// Minimal medium of every organism, as original metabolite ids
    pub individual_media: IndexMap<String, IndexSet<String>>,
    /// Compounds shared by the media of each pair of organisms
    pub pairwise: IndexMap<(String, String), IndexSet<String>>,
}

/// How much the organisms compete for the same nutrients
///
/// The environment is first limited to the minimal medium of the non-interacting community.
/// Within it each organism gets its own minimal medium and the score is
/// `k * sum(|pairwise intersections|) / (C(k, 2) * sum(|individual media|))`.
#[instrument(skip_all, fields(community = %community.id()))]
pub fn mro_score(
    community: &Community,
    environment: Option<&Environment>,
    params: &ScoreParameters,
) -> Result<MroResult, ScoreError> {
    let max_uptake = params.max_uptake_for(community);

    let mut noninteracting = build(&community.variant(false, true))?;
    let universe = exchange_universe(&noninteracting.model, environment);
    let exchanges: Vec<&str> = universe.iter().map(|r| r.as_str()).collect();
    apply_environment(&mut noninteracting.model, environment)?;
    let community_result = minimal_medium(
        &noninteracting.model,
        &exchanges,
        &params.medium_options(max_uptake, 1, None),
    )?;
    let Some(community_medium) = community_result.media.into_iter().next() else {
        warn!("MRO: failed to find a valid solution for the non-interacting community");
        return Ok(MroResult::default());
    };

    let mut merged = build(&community.variant(true, false))?;
    apply_environment(&mut merged.model, environment)?;
    Environment::from_reactions(community_medium.iter().map(|r| r.as_str()), max_uptake)
        .apply(&mut merged.model, true)?;
    let mut problem = merged.model.build_problem()?;

    let mut individual_media = IndexMap::new();
    for org in merged.organisms() {
        let Some(exchanges) = merged.organism_exchange_reactions(org) else {
            continue;
        };
        let candidates: Vec<&str> = exchanges.keys().map(|r| r.as_str()).collect();
        let options = params.medium_options(max_uptake, 1, merged.organism_biomass_reaction(org));
        let result =
            minimal_medium_with_problem(&mut problem, &merged.model, &candidates, &options)?;
        let Some(medium) = result.first() else {
            warn!(organism = org, "MRO: failed to find a valid solution");
            return Ok(MroResult {
                community_medium: Some(community_medium),
                ..Default::default()
            });
        };
        let compounds: IndexSet<String> = medium
            .iter()
            .filter_map(|r| exchanges.get(r))
            .map(|entry| entry.original_metabolite.clone())
            .filter(|c| !params.excluded_compounds.contains(c))
            .collect();
        individual_media.insert(org.to_string(), compounds);
    }

    let organisms: Vec<&String> = individual_media.keys().collect();
    let mut pairwise = IndexMap::new();
    for (i, first) in organisms.iter().enumerate() {
        for second in &organisms[i + 1..] {
            let shared: IndexSet<String> = individual_media[*first]
                .intersection(&individual_media[*second])
                .cloned()
                .collect();
            pairwise.insert(((*first).clone(), (*second).clone()), shared);
        }
    }

    let k = individual_media.len() as f64;
    let numerator = k * pairwise.values().map(|s| s.len()).sum::<usize>() as f64;
    let denominator = pairwise.len() as f64
        * individual_media.values().map(|m| m.len()).sum::<usize>() as f64;
    let score = (denominator != 0.).then(|| numerator / denominator);
    info!(?score, "MRO");
    Ok(MroResult {
        score,
        community_medium: Some(community_medium),
        individual_media,
        pairwise,
    })
}
