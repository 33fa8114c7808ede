use std::path::PathBuf;

use indexmap::{IndexMap, IndexSet};
use smetana_core::community::ids::pool_exchange_id;
use smetana_core::community::{build, Community, CommunityError, CommunityOptionsBuilder};
use smetana_core::environment::Environment;
use smetana_core::metabolic_model::model::Model;
use smetana_core::optimize::enumerate::Enumeration;
use smetana_core::scores::{
    detailed_scores, global_scores, metabolite_production_score, metabolite_uptake_score,
    mip_score, mro_score, species_coupling_score, DetailedOptionsBuilder, ScoreParameters,
    ScoreParametersBuilder,
};

fn load(name: &str) -> Model {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join("test_models")
        .join(format!("{}.json", name));
    Model::read_json(path).unwrap()
}

fn community(names: &[&str]) -> Community {
    let options = CommunityOptionsBuilder::default().build().unwrap();
    Community::new("test", names.iter().map(|n| load(n)), options)
}

fn environment(compounds: &[&str]) -> Environment {
    Environment::from_compounds(compounds.iter().copied(), pool_exchange_id, 10.)
}

#[test]
fn merging_is_repeatable() {
    let comm = community(&["producer", "consumer", "competitor"]);
    let first = build(&comm).unwrap();
    let second = build(&comm).unwrap();
    let ids = |m: &Model| {
        (
            m.reactions.keys().cloned().collect::<IndexSet<_>>(),
            m.metabolites.keys().cloned().collect::<IndexSet<_>>(),
        )
    };
    assert_eq!(ids(&first.model), ids(&second.model));
}

#[test]
fn missing_compartment_names_the_organism() {
    let mut broken = load("consumer");
    broken.compartments.shift_remove("e");
    let comm = Community::new(
        "test",
        vec![load("producer"), broken],
        Default::default(),
    );
    match build(&comm) {
        Err(CommunityError::MissingExtracellularCompartment { organisms, .. }) => {
            assert_eq!(organisms, vec!["consumer".to_string()])
        }
        other => panic!("unexpected result {:?}", other.map(|m| m.model.id)),
    }
}

#[test]
fn no_cross_feeding_without_interaction() {
    let options = CommunityOptionsBuilder::default()
        .interacting(false)
        .create_biomass_reaction(false)
        .build()
        .unwrap();
    let comm = Community::new("test", vec![load("producer"), load("consumer")], options);
    let mut merged = build(&comm).unwrap();
    environment(&["glc_e"])
        .apply(&mut merged.model, true)
        .unwrap();
    merged.model.objective = IndexMap::from([("Growth_consumer".to_string(), 1.)]);
    let solution = merged.model.fba().unwrap();
    assert!(solution.objective_value.unwrap().abs() < 1e-6);

    // The interacting community feeds the consumer
    let mut interacting = build(&comm.with_options(Default::default())).unwrap();
    environment(&["glc_e"])
        .apply(&mut interacting.model, true)
        .unwrap();
    interacting.model.objective = IndexMap::from([("Growth_consumer".to_string(), 1.)]);
    let solution = interacting.model.fba().unwrap();
    assert!(solution.objective_value.unwrap() > 1.);
}

#[test]
fn split_fluxes_recovers_organism_reactions() {
    let comm = community(&["producer", "consumer"]);
    let mut merged = build(&comm).unwrap();
    environment(&["glc_e"])
        .apply(&mut merged.model, true)
        .unwrap();
    let solution = merged.model.fba().unwrap();
    let split = merged.split_fluxes(solution.variable_values.as_ref().unwrap());
    for name in ["producer", "consumer"] {
        let model = load(name);
        let original: IndexSet<&str> = model.reactions.keys().map(|r| r.as_str()).collect();
        let recovered: IndexSet<&str> = split[name].keys().map(|r| r.as_str()).collect();
        assert_eq!(original, recovered);
    }
}

#[test]
fn score_ranges() {
    let comm = community(&["producer", "consumer", "competitor"]);
    let env = environment(&["glc_e", "ac_e"]);
    let params = ScoreParameters::default();

    let scs = species_coupling_score(&comm, Some(&env), &params).unwrap();
    let mus = metabolite_uptake_score(&comm, Some(&env), &params).unwrap();
    for table in scs.values().chain(mus.values()).flatten() {
        assert!(table.values().all(|f| (0. ..=1.).contains(f)));
    }
    let mro = mro_score(&comm, Some(&env), &params).unwrap();
    let score = mro.score.unwrap();
    assert!((0. ..=1.).contains(&score));
}

#[test]
fn environment_compounds_are_not_produced() {
    let comm = community(&["producer", "consumer"]);
    let env = environment(&["glc_e", "ac_e"]);
    let mps = metabolite_production_score(&comm, Some(&env), &ScoreParameters::default()).unwrap();
    for table in mps.values() {
        assert!(!table.contains_key("glc_e"));
        assert!(!table.contains_key("ac_e"));
    }
}

#[test]
fn global_records() {
    let params = ScoreParameters::default();
    let env = environment(&["glc_e", "ac_e"]);
    let record = global_scores(&community(&["producer", "consumer"]), Some(&env), &params, "m").unwrap();
    assert_eq!(record.size, 2);
    assert!(record.mip.unwrap() >= 1);
    assert_eq!(record.mro, Some(0.));

    let single = global_scores(&community(&["producer"]), Some(&env), &params, "m").unwrap();
    assert_eq!(single.mro, None);
}

#[test]
fn detailed_records() {
    let comm = community(&["producer", "consumer"]);
    let env = environment(&["glc_e"]);
    let options = DetailedOptionsBuilder::default()
        .medium_id("glucose")
        .build()
        .unwrap();
    let records = detailed_scores(&comm, Some(&env), &ScoreParameters::default(), &options).unwrap();
    let cross_feeding = records
        .iter()
        .find(|r| r.receiver == "consumer" && r.donor == "producer" && r.compound == "ac_e")
        .unwrap();
    assert!((cross_feeding.smetana - 1.).abs() < 1e-6);
    assert!(records.iter().all(|r| r.smetana > 0. && r.medium == "glucose"));
}

fn shared_extracellular(names: &[&str]) -> Community {
    let options = CommunityOptionsBuilder::default()
        .merge_extracellular_compartments(true)
        .build()
        .unwrap();
    Community::new("shared", names.iter().map(|n| load(n)), options)
}

#[test]
fn scores_of_a_shared_extracellular_community() {
    let comm = shared_extracellular(&["producer", "consumer"]);
    let env = environment(&["glc_e"]);
    let params = ScoreParameters::default();

    let scs = species_coupling_score(&comm, Some(&env), &params).unwrap();
    let consumer = scs["consumer"].as_ref().unwrap();
    assert!((consumer["producer"] - 1.).abs() < 1e-6);

    let mus = metabolite_uptake_score(&comm, Some(&env), &params).unwrap();
    assert_eq!(mus["consumer"].as_ref().unwrap()["ac_e"], 1.);

    let mps = metabolite_production_score(&comm, Some(&env), &params).unwrap();
    assert_eq!(mps["producer"].get("ac_e"), Some(&1.));

    let env = environment(&["glc_e", "ac_e"]);
    let mip = mip_score(&comm, Some(&env), &params).unwrap();
    assert_eq!(mip.score, Some(1));
    let mro = mro_score(&comm, Some(&env), &params).unwrap();
    assert_eq!(mro.score, Some(0.));
}

#[test]
fn iterative_enumeration_scores() {
    let comm = community(&["producer", "consumer", "competitor"]);
    let env = environment(&["glc_e", "ac_e"]);
    let params = ScoreParametersBuilder::default()
        .enumeration(Enumeration::Iterative)
        .coupling_enumeration(Enumeration::Iterative)
        .n_solutions(10)
        .build()
        .unwrap();
    let mus = metabolite_uptake_score(&comm, Some(&env), &params).unwrap();
    let consumer = mus["consumer"].as_ref().unwrap();
    assert_eq!(consumer["ac_e"], 1.);
    let producer = mus["producer"].as_ref().unwrap();
    assert_eq!(producer["glc_e"], 1.);
    let scs = species_coupling_score(&comm, Some(&env), &params).unwrap();
    for table in scs.values().flatten() {
        assert!(table.values().all(|f| (0. ..=1.).contains(f)));
    }
    // Acetate is in the environment, nobody depends on anyone
    let consumer = scs["consumer"].as_ref().unwrap();
    assert!(consumer.values().all(|f| f.abs() < 1e-6));
}

#[test]
fn global_scores_without_environment() {
    let params = ScoreParameters::default();
    let mip = mip_score(&community(&["producer", "consumer"]), None, &params).unwrap();
    assert_eq!(mip.score, Some(1));
    assert_eq!(mip.noninteracting_medium.unwrap().len(), 2);

    let mro = mro_score(&community(&["producer", "competitor"]), None, &params).unwrap();
    assert_eq!(mro.score, Some(1.));
    let mro = mro_score(&community(&["producer", "consumer"]), None, &params).unwrap();
    assert_eq!(mro.score, Some(0.));
}
