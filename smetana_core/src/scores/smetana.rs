//! SMETANA records, combining the scores of a community
//!
//! Detailed records rate every (receiver, donor, compound) triple as
//! `smetana = scs * mus * mps`: how much the receiver needs the donor, how often the receiver
//! takes the compound up, and whether the donor can make it. Global records hold the MIP and
//! MRO of the whole community.
use derive_builder::Builder;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::instrument;

use crate::community::Community;
use crate::environment::Environment;
use crate::scores::{
    metabolite_production_score, metabolite_uptake_score, mip_score, mro_score,
    species_coupling_score, OrganismScores, ScoreError, ScoreParameters,
};

/// One (receiver, donor, compound) row of the detailed scores
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DetailedRecord {
    pub community: String,
    pub medium: String,
    pub receiver: String,
    pub donor: String,
    pub compound: String,
    /// Absent when coupling is ignored
    pub scs: Option<f64>,
    pub mus: f64,
    pub mps: f64,
    pub smetana: f64,
}

/// Community wide scores
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GlobalRecord {
    pub community: String,
    pub medium: String,
    /// Number of organisms
    pub size: usize,
    pub mip: Option<u32>,
    pub mro: Option<f64>,
}

/// Options for assembling detailed records
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct DetailedOptions {
    /// Id of the medium reported in the records
    #[builder(setter(into), default = "\"default\".to_string()")]
    pub medium_id: String,
    /// Skip SCS and rate triples by `mus * mps` only
    #[builder(default = "false")]
    pub ignore_coupling: bool,
    /// Keep records whose SMETANA score is 0
    #[builder(default = "false")]
    pub zeros: bool,
}

impl Default for DetailedOptions {
    fn default() -> Self {
        DetailedOptions {
            medium_id: "default".to_string(),
            ignore_coupling: false,
            zeros: false,
        }
    }
}

/// Combine SCS, MUS and MPS tables into detailed records
///
/// Receivers without MUS (or without SCS, unless coupling is ignored) and donors without MPS
/// are skipped. Compounds are sorted and never include `excluded` ones.
pub fn assemble_detailed(
    community_id: &str,
    scs: Option<&OrganismScores>,
    mus: &OrganismScores,
    mps: &IndexMap<String, IndexMap<String, f64>>,
    excluded: &IndexSet<String>,
    options: &DetailedOptions,
) -> Vec<DetailedRecord> {
    let mut records = Vec::new();
    for (receiver, receiver_mus) in mus {
        let Some(receiver_mus) = receiver_mus else {
            continue;
        };
        let receiver_scs = match (options.ignore_coupling, scs) {
            (true, _) => None,
            (false, Some(scs)) => match scs.get(receiver) {
                Some(Some(table)) => Some(table),
                _ => continue,
            },
            (false, None) => continue,
        };
        for (donor, donor_mps) in mps {
            if donor == receiver {
                continue;
            }
            let mut compounds: Vec<&String> = receiver_mus
                .keys()
                .chain(donor_mps.keys())
                .filter(|c| !excluded.contains(*c))
                .collect::<IndexSet<_>>()
                .into_iter()
                .collect();
            compounds.sort();
            let coupling = receiver_scs.map(|table| table.get(donor).copied().unwrap_or(0.));
            for compound in compounds {
                let mus_value = receiver_mus.get(compound).copied().unwrap_or(0.);
                let mps_value = donor_mps.get(compound).copied().unwrap_or(0.);
                let smetana = coupling.unwrap_or(1.) * mus_value * mps_value;
                if smetana == 0. && !options.zeros {
                    continue;
                }
                records.push(DetailedRecord {
                    community: community_id.to_string(),
                    medium: options.medium_id.clone(),
                    receiver: receiver.clone(),
                    donor: donor.clone(),
                    compound: compound.clone(),
                    scs: coupling,
                    mus: mus_value,
                    mps: mps_value,
                    smetana,
                });
            }
        }
    }
    records
}

/// Compute SCS (unless ignored), MUS and MPS of a community and assemble detailed records
#[instrument(skip_all, fields(community = %community.id(), medium = %options.medium_id))]
pub fn detailed_scores(
    community: &Community,
    environment: Option<&Environment>,
    params: &ScoreParameters,
    options: &DetailedOptions,
) -> Result<Vec<DetailedRecord>, ScoreError> {
    let scs = if options.ignore_coupling {
        None
    } else {
        Some(species_coupling_score(community, environment, params)?)
    };
    let mus = metabolite_uptake_score(community, environment, params)?;
    let mps = metabolite_production_score(community, environment, params)?;
    Ok(assemble_detailed(
        community.id(),
        scs.as_ref(),
        &mus,
        &mps,
        &params.excluded_compounds,
        options,
    ))
}

/// Compute MIP and MRO of a community
#[instrument(skip_all, fields(community = %community.id(), medium = medium_id))]
pub fn global_scores(
    community: &Community,
    environment: Option<&Environment>,
    params: &ScoreParameters,
    medium_id: &str,
) -> Result<GlobalRecord, ScoreError> {
    let mip = mip_score(community, environment, params)?;
    let mro = mro_score(community, environment, params)?;
    Ok(GlobalRecord {
        community: community.id().to_string(),
        medium: medium_id.to_string(),
        size: community.size(),
        mip: mip.score,
        mro: mro.score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, f64)]) -> Option<IndexMap<String, f64>> {
        Some(entries.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }

    fn inputs() -> (OrganismScores, OrganismScores, IndexMap<String, IndexMap<String, f64>>) {
        let scs = OrganismScores::from([
            ("a".to_string(), table(&[("b", 0.5)])),
            ("b".to_string(), None),
        ]);
        let mus = OrganismScores::from([
            ("a".to_string(), table(&[("ac_e", 1.), ("o2_e", 0.5)])),
            ("b".to_string(), table(&[("glc_e", 1.)])),
        ]);
        let mps = IndexMap::from([
            ("a".to_string(), IndexMap::new()),
            (
                "b".to_string(),
                IndexMap::from([("ac_e".to_string(), 1.), ("h2_e".to_string(), 0.)]),
            ),
        ]);
        (scs, mus, mps)
    }

    #[test]
    fn detailed_records() {
        let (scs, mus, mps) = inputs();
        let options = DetailedOptionsBuilder::default()
            .medium_id("m9")
            .zeros(true)
            .build()
            .unwrap();
        let records = assemble_detailed("comm", Some(&scs), &mus, &mps, &IndexSet::new(), &options);
        // b has no SCS, so only a receives
        assert!(records.iter().all(|r| r.receiver == "a" && r.donor == "b"));
        let compounds: Vec<&str> = records.iter().map(|r| r.compound.as_str()).collect();
        assert_eq!(compounds, vec!["ac_e", "h2_e", "o2_e"]);
        assert_eq!(records[0].smetana, 0.5);
        assert_eq!(records[0].scs, Some(0.5));
        assert_eq!(records[0].medium, "m9");
    }

    #[test]
    fn zeros_and_exclusions() {
        let (scs, mus, mps) = inputs();
        let records = assemble_detailed(
            "comm",
            Some(&scs),
            &mus,
            &mps,
            &IndexSet::from(["ac_e".to_string()]),
            &DetailedOptions::default(),
        );
        assert!(records.is_empty());
    }

    #[test]
    fn ignore_coupling() {
        let (_, mus, mps) = inputs();
        let options = DetailedOptionsBuilder::default()
            .ignore_coupling(true)
            .build()
            .unwrap();
        let records = assemble_detailed("comm", None, &mus, &mps, &IndexSet::new(), &options);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].scs, None);
        assert_eq!(records[0].smetana, 1.);
        let json = serde_json::to_string(&records[0]).unwrap();
        assert!(json.contains("\"scs\":null"));
    }
}
