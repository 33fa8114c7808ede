//! Module providing JSON IO for metabolic models, in the COBRA JSON layout
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, warn};

use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::model::Model;
use crate::metabolic_model::reaction::{Reaction, ReactionBuilder, ReactionBuilderError, ReactionType};

/// Compartment ids treated as extracellular when classifying reactions
const EXTRACELLULAR_COMPARTMENTS: [&str; 2] = ["e", "C_e"];

// region JSON Model
/// Represents a JSON serialized model, used for reading and writing models in json format
///
/// Genes and gene reaction rules are not needed for community scoring, serde skips them
#[derive(Serialize, Deserialize)]
struct JsonModel {
    metabolites: Vec<JsonMetabolite>,
    reactions: Vec<JsonReaction>,
    id: Option<String>,
    compartments: Option<IndexMap<String, String>>,
    version: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct JsonMetabolite {
    id: String,
    name: Option<String>,
    compartment: Option<String>,
    charge: Option<i32>,
    formula: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct JsonReaction {
    id: String,
    name: Option<String>,
    metabolites: IndexMap<String, f64>,
    #[serde(with = "lower_bound")]
    lower_bound: f64,
    #[serde(with = "upper_bound")]
    upper_bound: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    objective_coefficient: Option<f64>,
    subsystem: Option<String>,
}

/// Infinite bounds are written as `null` (JSON has no infinity), and `null` reads back as
/// unbounded in the direction of the bound
fn serialize_bound<S: Serializer>(bound: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if bound.is_finite() {
        serializer.serialize_f64(*bound)
    } else {
        serializer.serialize_none()
    }
}

mod lower_bound {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bound: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        super::serialize_bound(bound, serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
    }
}

mod upper_bound {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bound: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        super::serialize_bound(bound, serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}
// endregion JSON Model

// region Conversions
impl From<JsonMetabolite> for Metabolite {
    fn from(m: JsonMetabolite) -> Self {
        Self {
            id: m.id,
            name: m.name,
            compartment: m.compartment,
            charge: m.charge.unwrap_or_default(),
            formula: m.formula,
        }
    }
}

impl From<Metabolite> for JsonMetabolite {
    fn from(m: Metabolite) -> Self {
        Self {
            id: m.id,
            name: m.name,
            compartment: m.compartment,
            charge: Some(m.charge),
            formula: m.formula,
        }
    }
}

/// Decide the role of a reaction from its id and stoichiometry
///
/// Single metabolite reactions are exchanges when prefixed `EX_`/`R_EX_` or when the
/// metabolite is extracellular, sinks when prefixed `DM_`/`SK_`/`sink_`.
fn classify_reaction(
    id: &str,
    stoichiometry: &IndexMap<String, f64>,
    metabolites: &IndexMap<String, Metabolite>,
) -> ReactionType {
    if stoichiometry.len() != 1 {
        return ReactionType::Other;
    }
    if id.starts_with("EX_") || id.starts_with("R_EX_") {
        return ReactionType::Exchange;
    }
    if id.starts_with("DM_") || id.starts_with("SK_") || id.starts_with("sink_") {
        return ReactionType::Sink;
    }
    let extracellular = stoichiometry.keys().all(|met| {
        metabolites
            .get(met)
            .and_then(|m| m.compartment.as_deref())
            .is_some_and(|c| EXTRACELLULAR_COMPARTMENTS.contains(&c))
    });
    if extracellular {
        ReactionType::Exchange
    } else {
        ReactionType::Other
    }
}

impl Model {
    /// Read a model from a COBRA JSON file
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Model, JsonError> {
        let model_str = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) => return Err(JsonError::UnableToRead(format!("{:?}", err))),
        };
        Model::from_json_str(&model_str)
    }

    /// Parse a model from a COBRA JSON string
    pub fn from_json_str(model_str: &str) -> Result<Model, JsonError> {
        let json_model = match serde_json::from_str::<JsonModel>(model_str) {
            Ok(model) => model,
            Err(err) => return Err(JsonError::UnableToParse(format!("{:?}", err))),
        };
        Model::from_json(json_model)
    }

    /// Write the model to a COBRA JSON file
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), JsonError> {
        let model_string = self.to_json_string()?;
        fs::write(path, model_string)?;
        Ok(())
    }

    /// Serialize the model as a COBRA JSON string
    pub fn to_json_string(&self) -> Result<String, JsonError> {
        Ok(serde_json::to_string(&self.to_json())?)
    }

    fn from_json(json_model: JsonModel) -> Result<Self, JsonError> {
        let mut reactions: IndexMap<String, Reaction> = IndexMap::new();
        let mut metabolites: IndexMap<String, Metabolite> = IndexMap::new();
        let mut objective: IndexMap<String, f64> = IndexMap::new();
        json_model.metabolites.into_iter().for_each(|m| {
            metabolites.insert(m.id.clone(), Metabolite::from(m));
        });
        for rxn in json_model.reactions {
            if let Some(missing) = rxn.metabolites.keys().find(|m| !metabolites.contains_key(*m)) {
                return Err(JsonError::UnknownMetabolite {
                    reaction: rxn.id,
                    metabolite: missing.clone(),
                });
            }
            let reaction_type = classify_reaction(&rxn.id, &rxn.metabolites, &metabolites);
            let new_reaction = ReactionBuilder::default()
                .id(rxn.id.clone())
                .metabolites(rxn.metabolites)
                .name(rxn.name)
                .lower_bound(rxn.lower_bound)
                .upper_bound(rxn.upper_bound)
                .reaction_type(reaction_type)
                .subsystem(rxn.subsystem)
                .build()?;
            reactions.insert(rxn.id.clone(), new_reaction);
            // Add the reaction to the objective function if desired
            if let Some(coef) = rxn.objective_coefficient.filter(|c| *c != 0.) {
                objective.insert(rxn.id, coef);
            }
        }
        let id = json_model.id.unwrap_or_default();
        let biomass_reaction = objective.keys().next().cloned();
        if objective.len() > 1 {
            warn!(model = %id, "Several objective reactions, using the first as biomass");
        }
        // Compartments are optional in the file, fall back to the ones metabolites use
        let compartments = json_model.compartments.unwrap_or_else(|| {
            metabolites
                .values()
                .filter_map(|m| m.compartment.clone())
                .map(|c| (c.clone(), c))
                .collect()
        });
        debug!(
            model = %id,
            reactions = reactions.len(),
            metabolites = metabolites.len(),
            "Read JSON model"
        );
        Ok(Model {
            id,
            compartments,
            metabolites,
            reactions,
            objective,
            biomass_reaction,
            version: json_model.version,
        })
    }

    fn to_json(&self) -> JsonModel {
        let json_metabolites: Vec<JsonMetabolite> = self
            .metabolites
            .values()
            .map(|m| m.clone().into())
            .collect();
        let json_reactions: Vec<JsonReaction> = self
            .reactions
            .values()
            .map(|r| JsonReaction {
                id: r.id.clone(),
                name: r.name.clone(),
                metabolites: r.metabolites.clone(),
                lower_bound: r.lower_bound,
                upper_bound: r.upper_bound,
                objective_coefficient: self.objective.get(&r.id).copied(),
                subsystem: r.subsystem.clone(),
            })
            .collect();
        JsonModel {
            metabolites: json_metabolites,
            reactions: json_reactions,
            id: Some(self.id.clone()),
            compartments: Some(self.compartments.clone()),
            version: self.version.clone(),
        }
    }
}

/// Errors associated with reading and writing JSON models
#[derive(Error, Debug)]
pub enum JsonError {
    #[error("Unable to read file due to {0}")]
    UnableToRead(String),
    #[error("Unable to parse json due to {0}")]
    UnableToParse(String),
    #[error("Reaction {reaction} uses metabolite {metabolite} which isn't in the model")]
    UnknownMetabolite { reaction: String, metabolite: String },
    #[error("Unable to build reaction")]
    UnableToBuildReaction(#[from] ReactionBuilderError),
    #[error("Serde json parse error")]
    SerdeJsonParseError(#[from] serde_json::Error),
    #[error("Unable to write to file")]
    UnableToWrite(#[from] std::io::Error),
}

// endregion Conversions

#[cfg(test)]
mod json_tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn json_metabolite() {
        let data = r#"{
"id":"glc__D_e",
"name":"D-Glucose",
"compartment":"e",
"charge":0,
"formula":"C6H12O6",
"notes":{
"original_bigg_ids":[
"glc_D_e"
]
},
"annotation":{
"kegg.compound":[
"C00031"
]
}
}"#;
        let met: JsonMetabolite = serde_json::from_str(data).unwrap();
        let model_met = Metabolite::from(met);
        assert_eq!(model_met.id, "glc__D_e");
        assert_eq!(model_met.name.unwrap(), "D-Glucose");
        assert_eq!(model_met.compartment.unwrap(), "e");
        assert_eq!(model_met.charge, 0);
        assert_eq!(model_met.formula.unwrap(), "C6H12O6");
    }

    #[test]
    fn json_reaction() {
        let data = r#"{
"id":"PFK",
"name":"Phosphofructokinase",
"metabolites":{
"adp_c":1.0,
"atp_c":-1.0,
"f6p_c":-1.0,
"fdp_c":1.0,
"h_c":1.0
},
"lower_bound":0.0,
"upper_bound":1000.0,
"gene_reaction_rule":"b3916 or b1723",
"subsystem":"Glycolysis/Gluconeogenesis"
}"#;
        let reaction: JsonReaction = serde_json::from_str(data).unwrap();
        assert_eq!(reaction.id, "PFK");
        assert_eq!(reaction.name.unwrap(), "Phosphofructokinase");
        assert_eq!(reaction.metabolites.len(), 5);
        assert!((reaction.metabolites["atp_c"] + 1.0).abs() < 1e-25);
        assert!((reaction.lower_bound - 0.0).abs() < 1e-25);
        assert!((reaction.upper_bound - 1000.0).abs() < 1e-25);
        assert!(reaction.objective_coefficient.is_none());
        assert_eq!(reaction.subsystem.unwrap(), "Glycolysis/Gluconeogenesis");
    }

    #[test]
    fn reaction_classification() {
        let mut metabolites = IndexMap::new();
        metabolites.insert("a_e".to_string(), Metabolite::new("a_e", "e"));
        metabolites.insert("a_c".to_string(), Metabolite::new("a_c", "c"));
        let single = |m: &str| IndexMap::from([(m.to_string(), -1.)]);
        assert_eq!(
            classify_reaction("EX_a_e", &single("a_e"), &metabolites),
            ReactionType::Exchange
        );
        assert_eq!(
            classify_reaction("uptake", &single("a_e"), &metabolites),
            ReactionType::Exchange
        );
        assert_eq!(
            classify_reaction("DM_a_c", &single("a_c"), &metabolites),
            ReactionType::Sink
        );
        assert_eq!(
            classify_reaction("store", &single("a_c"), &metabolites),
            ReactionType::Other
        );
    }

    #[test]
    fn read_toy_model() {
        let data_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join("test_models")
            .join("producer.json");
        let model = Model::read_json(data_path).unwrap();
        assert_eq!(model.id, "producer");
        assert_eq!(model.biomass_reaction.as_deref(), Some("Growth"));
        assert_eq!(model.exchange_reactions(), vec!["EX_glc_e", "EX_ac_e"]);
        assert!(model.compartments.contains_key("e"));
        let glc = &model.metabolites["glc_e"];
        assert_eq!(glc.formula.as_deref(), Some("C6H12O6"));
    }

    #[test]
    fn write_read_keeps_structure() {
        let data_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join("test_models")
            .join("producer.json");
        let model = Model::read_json(data_path).unwrap();
        let text = model.to_json_string().unwrap();
        let reread = Model::from_json_str(&text).unwrap();
        assert_eq!(reread, model);
    }

    #[test]
    fn merged_model_round_trip() {
        use crate::community::{build, Community, CommunityOptions};
        let models = ["producer", "consumer"].map(|name| {
            Model::read_json(
                PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                    .join("test_data")
                    .join("test_models")
                    .join(format!("{}.json", name)),
            )
            .unwrap()
        });
        let community = Community::new("pair", models, CommunityOptions::default());
        let merged = build(&community).unwrap().model;
        assert!(merged
            .reactions
            .values()
            .any(|r| r.upper_bound == f64::INFINITY || r.lower_bound == f64::NEG_INFINITY));
        let text = merged.to_json_string().unwrap();
        let reread = Model::from_json_str(&text).unwrap();
        assert_eq!(reread.reactions.len(), merged.reactions.len());
        for (id, reaction) in &merged.reactions {
            let other = &reread.reactions[id];
            assert_eq!(other.lower_bound, reaction.lower_bound, "{}", id);
            assert_eq!(other.upper_bound, reaction.upper_bound, "{}", id);
            assert_eq!(other.metabolites, reaction.metabolites);
        }
    }

    #[test]
    fn null_bounds_are_unbounded() {
        let data = r#"{"id":"R","metabolites":{},"lower_bound":null,"upper_bound":null}"#;
        let reaction: JsonReaction = serde_json::from_str(data).unwrap();
        assert_eq!(reaction.lower_bound, f64::NEG_INFINITY);
        assert_eq!(reaction.upper_bound, f64::INFINITY);
    }

    #[test]
    fn unknown_metabolite() {
        let data = r#"{"id":"bad","metabolites":[],"reactions":[
            {"id":"R","metabolites":{"x_c":1.0},"lower_bound":0.0,"upper_bound":1.0}
        ]}"#;
        assert!(matches!(
            Model::from_json_str(data),
            Err(JsonError::UnknownMetabolite { .. })
        ));
    }
}
