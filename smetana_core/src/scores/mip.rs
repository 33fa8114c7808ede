//! Metabolic interaction potential
use indexmap::IndexSet;
use tracing::{info, instrument, warn};

use crate::community::{build, Community, MergedNetwork};
use crate::environment::Environment;
use crate::medium::minimal_medium;
use crate::optimize::ProblemSolution;
use crate::scores::{apply_environment, exchange_universe, ScoreError, ScoreParameters};

/// Result of [`mip_score`]
#[derive(Debug, Clone, PartialEq)]
pub struct MipResult {
    /// Number of nutrients the community saves by interacting, `None` when either the
    /// interacting or the non-interacting community can't grow
    pub score: Option<u32>,
    /// Minimal medium of the interacting community (community exchange reaction ids)
    pub interacting_medium: Option<IndexSet<String>>,
    /// Minimal medium of the non-interacting community
    pub noninteracting_medium: Option<IndexSet<String>>,
    /// Solution behind the interacting medium
    pub interacting_solution: Option<ProblemSolution>,
    /// Solution behind the non-interacting medium
    pub noninteracting_solution: Option<ProblemSolution>,
}

/// Difference in size between the minimal media of the non-interacting and the interacting
/// community
///
/// Both communities aggregate their growth, so every organism has to grow. Excluded compounds
/// are removed from both media before counting.
#[instrument(skip_all, fields(community = %community.id()))]
pub fn mip_score(
    community: &Community,
    environment: Option<&Environment>,
    params: &ScoreParameters,
) -> Result<MipResult, ScoreError> {
    let max_uptake = params.max_uptake_for(community);
    let options = params.medium_options(max_uptake, 1, None);

    let mut interacting = build(&community.variant(true, true))?;
    let mut noninteracting = build(&community.variant(false, true))?;
    let universe = exchange_universe(&interacting.model, environment);
    let exchanges: Vec<&str> = universe.iter().map(|r| r.as_str()).collect();
    apply_environment(&mut interacting.model, environment)?;
    apply_environment(&mut noninteracting.model, environment)?;

    let interacting_result = minimal_medium(&interacting.model, &exchanges, &options)?;
    let noninteracting_result = minimal_medium(&noninteracting.model, &exchanges, &options)?;
    let interacting_medium = interacting_result
        .first()
        .map(|m| without_excluded(m, &interacting, params));
    let noninteracting_medium = noninteracting_result
        .first()
        .map(|m| without_excluded(m, &interacting, params));

    let score = match (&interacting_medium, &noninteracting_medium) {
        (Some(i), Some(ni)) => {
            let diff = ni.len().saturating_sub(i.len());
            Some(u32::try_from(diff).unwrap_or(u32::MAX))
        }
        (_, None) => {
            warn!("MIP: failed to find a valid solution for the non-interacting community");
            None
        }
        (None, Some(_)) => {
            warn!("MIP: failed to find a valid solution for the interacting community");
            None
        }
    };
    info!(?score, "MIP");
    Ok(MipResult {
        score,
        interacting_medium,
        noninteracting_medium,
        interacting_solution: interacting_result.solutions.into_iter().next(),
        noninteracting_solution: noninteracting_result.solutions.into_iter().next(),
    })
}

/// Medium without the community exchange reactions of excluded compounds
fn without_excluded(
    medium: &IndexSet<String>,
    merged: &MergedNetwork,
    params: &ScoreParameters,
) -> IndexSet<String> {
    let excluded: IndexSet<&str> = params
        .excluded_compounds
        .iter()
        .filter_map(|c| merged.exchange_mapping.community_exchange_of(c))
        .collect();
    medium
        .iter()
        .filter(|r| !excluded.contains(r.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::test_utils::{community, environment};
    use crate::scores::ScoreParametersBuilder;

    #[test]
    fn cross_feeding_saves_a_nutrient() {
        let comm = community(&["producer", "consumer"]);
        let env = environment(&["glc_e", "ac_e"]);
        let result = mip_score(&comm, Some(&env), &ScoreParameters::default()).unwrap();
        assert_eq!(result.score, Some(1));
        let interacting = result.interacting_medium.unwrap();
        assert_eq!(interacting.iter().collect::<Vec<_>>(), vec!["R_EX_glc_e_pool"]);
        assert_eq!(result.noninteracting_medium.unwrap().len(), 2);
    }

    #[test]
    fn excluded_compounds_are_not_counted() {
        let comm = community(&["producer", "consumer"]);
        let env = environment(&["glc_e", "ac_e"]);
        let params = ScoreParametersBuilder::default()
            .excluded_compounds(IndexSet::from(["ac_e".to_string()]))
            .build()
            .unwrap();
        let result = mip_score(&comm, Some(&env), &params).unwrap();
        assert_eq!(result.score, Some(0));
    }

    #[test]
    fn infeasible_is_undefined() {
        let comm = community(&["producer", "consumer"]);
        let env = environment(&["ac_e"]);
        let result = mip_score(&comm, Some(&env), &ScoreParameters::default()).unwrap();
        assert_eq!(result.score, None);
        assert_eq!(result.noninteracting_medium, None);
    }
}
