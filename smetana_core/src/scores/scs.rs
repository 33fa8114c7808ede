//! Species coupling score
use indexmap::IndexMap;
use tracing::{debug, instrument, warn};

use crate::community::{build, Community};
use crate::environment::Environment;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::scope::ScopedProblem;
use crate::optimize::variable::VariableType;
use crate::scores::{apply_environment, OrganismScores, ScoreError, ScoreParameters};

/// Frequency with which each organism needs every other organism to grow
///
/// Each organism gets a binary indicator which, through big-M constraints, switches off all
/// of its reactions. For every organism the number of other organisms switched on is
/// minimized while it grows, and alternative optima are enumerated. `scores[o][p]` is the
/// fraction of optima in which `p` is on while `o` grows, `None` when `o` can't grow.
#[instrument(skip_all, fields(community = %community.id()))]
pub fn species_coupling_score(
    community: &Community,
    environment: Option<&Environment>,
    params: &ScoreParameters,
) -> Result<OrganismScores, ScoreError> {
    let mut merged = build(&community.variant(true, false))?;
    apply_environment(&mut merged.model, environment)?;
    let biomass_reactions: Vec<String> =
        merged.organism_biomass_reactions().values().cloned().collect();
    for biomass in &biomass_reactions {
        let upper_bound = merged.model.reactions[biomass].upper_bound;
        merged.model.set_reaction_bounds(biomass, 0., upper_bound)?;
    }
    let largest_bound = merged.model.max_finite_bound();
    if params.big_m < largest_bound {
        warn!(
            big_m = params.big_m,
            largest_bound, "big M is smaller than a reaction bound, feasible fluxes may be cut"
        );
    }

    let mut problem = merged.model.build_problem()?;
    let indicators: IndexMap<&str, String> = merged
        .organisms()
        .map(|org| (org, format!("y_{}", org)))
        .collect();
    for (org, indicator) in &indicators {
        problem.add_new_variable(indicator, None, VariableType::Binary, 0., 1.)?;
        let biomass = merged.organism_biomass_reaction(org);
        for reaction in merged.organism_reactions(org) {
            if Some(reaction.as_str()) == biomass {
                continue;
            }
            let variables = [reaction.as_str(), indicator.as_str()];
            problem.add_new_inequality_constraint_by_id(
                &format!("_coupling_{}_lb", reaction),
                &variables,
                &[1., params.big_m],
                0.,
                f64::INFINITY,
            )?;
            problem.add_new_inequality_constraint_by_id(
                &format!("_coupling_{}_ub", reaction),
                &variables,
                &[1., -params.big_m],
                f64::NEG_INFINITY,
                0.,
            )?;
        }
    }

    let mut scores = OrganismScores::new();
    for (org, biomass) in merged.organism_biomass_reactions() {
        let others: Vec<(&str, &String)> = indicators
            .iter()
            .filter(|(o, _)| **o != org.as_str())
            .map(|(o, y)| (*o, y))
            .collect();
        let mut scope = ScopedProblem::new(&mut problem);
        scope.add_inequality_constraint(
            "_coupling_biomass",
            &[biomass.as_str()],
            &[1.],
            params.min_growth,
            f64::INFINITY,
        )?;
        scope.set_objective(
            others.iter().map(|(_, y)| (y.as_str(), 1.)),
            ObjectiveSense::Minimize,
        )?;
        let other_indicators: Vec<String> = others.iter().map(|(_, y)| y.to_string()).collect();
        let solutions = scope.enumerate(
            None,
            &other_indicators,
            params.n_solutions,
            params.coupling_enumeration,
            params.abstol,
        )?;
        if solutions.is_empty() {
            warn!(organism = %org, "SCS: failed to find a solution for growth");
            scores.insert(org.clone(), None);
            continue;
        }
        let n = solutions.len() as f64;
        let frequencies: IndexMap<String, f64> = others
            .iter()
            .map(|(other, y)| {
                let on = solutions
                    .iter()
                    .filter(|s| s.value(y).is_some_and(|v| v > params.abstol))
                    .count();
                (other.to_string(), on as f64 / n)
            })
            .collect();
        debug!(organism = %org, solutions = solutions.len(), "SCS");
        scores.insert(org.clone(), Some(frequencies));
    }
    Ok(scores)
}
