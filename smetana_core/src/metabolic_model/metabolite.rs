//! This module provides the metabolite struct representing a metabolite

use std::hash::Hash;

use derive_builder::Builder;

/// Represents a metabolite
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Metabolite {
    /// Used to identify the metabolite (must be unique)
    #[builder(setter(into))]
    pub id: String,
    /// Human Readable name of the metabolite
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Which compartment the metabolite is in
    #[builder(default = "None")]
    pub compartment: Option<String>,
    /// Electrical charge of the Metabolite
    #[builder(default = "0")]
    pub charge: i32,
    /// Chemical Formula of the metabolite
    #[builder(default = "None")]
    pub formula: Option<String>,
}

impl Metabolite {
    /// Create a metabolite with only an id and compartment
    pub fn new(id: &str, compartment: &str) -> Self {
        Metabolite {
            id: id.to_string(),
            name: None,
            compartment: Some(compartment.to_string()),
            charge: 0,
            formula: None,
        }
    }

    /// Molecular weight (g/mol) computed from the chemical formula
    ///
    /// None if the metabolite has no formula, or if the formula contains an element
    /// (or a generic group such as `R`) without a known atomic weight.
    pub fn molecular_weight(&self) -> Option<f64> {
        self.formula.as_deref().and_then(formula_weight)
    }
}

impl Hash for Metabolite {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state); // Hash by id
                             // If the metabolite has an associated compartment, also hash by that
        if let Some(ref compartment) = self.compartment {
            compartment.hash(state)
        };
    }
}

/// Standard atomic weights of the elements found in metabolic model formulas
const ATOMIC_WEIGHTS: &[(&str, f64)] = &[
    ("H", 1.008),
    ("C", 12.011),
    ("N", 14.007),
    ("O", 15.999),
    ("P", 30.974),
    ("S", 32.06),
    ("Na", 22.990),
    ("Mg", 24.305),
    ("Cl", 35.45),
    ("K", 39.098),
    ("Ca", 40.078),
    ("Mn", 54.938),
    ("Fe", 55.845),
    ("Co", 58.933),
    ("Ni", 58.693),
    ("Cu", 63.546),
    ("Zn", 65.38),
    ("Se", 78.971),
    ("Mo", 95.95),
    ("Cd", 112.414),
    ("Hg", 200.592),
    ("F", 18.998),
    ("Br", 79.904),
    ("I", 126.904),
    ("B", 10.81),
    ("Si", 28.085),
    ("As", 74.922),
    ("W", 183.84),
    ("Cr", 51.996),
    ("Al", 26.982),
    ("Li", 6.94),
];

fn atomic_weight(element: &str) -> Option<f64> {
    ATOMIC_WEIGHTS
        .iter()
        .find(|(symbol, _)| *symbol == element)
        .map(|(_, weight)| *weight)
}

/// Parse a flat chemical formula such as `C6H12O6` into a molecular weight
fn formula_weight(formula: &str) -> Option<f64> {
    let formula = formula.trim();
    if formula.is_empty() {
        return None;
    }
    let chars: Vec<char> = formula.chars().collect();
    let mut weight = 0.;
    let mut pos = 0;
    while pos < chars.len() {
        if !chars[pos].is_ascii_uppercase() {
            return None;
        }
        let start = pos;
        pos += 1;
        while pos < chars.len() && chars[pos].is_ascii_lowercase() {
            pos += 1;
        }
        let element: String = chars[start..pos].iter().collect();
        let count_start = pos;
        while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
            pos += 1;
        }
        let count = if count_start == pos {
            1.
        } else {
            chars[count_start..pos]
                .iter()
                .collect::<String>()
                .parse::<f64>()
                .ok()?
        };
        weight += atomic_weight(&element)? * count;
    }
    Some(weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glucose_weight() {
        let glc = MetaboliteBuilder::default()
            .id("glc__D_e")
            .compartment(Some("e".to_string()))
            .formula(Some("C6H12O6".to_string()))
            .build()
            .unwrap();
        let weight = glc.molecular_weight().unwrap();
        assert!((weight - 180.156).abs() < 1e-2);
    }

    #[test]
    fn implicit_counts_and_two_letter_elements() {
        assert!((formula_weight("NaCl").unwrap() - 58.44).abs() < 1e-2);
        assert!((formula_weight("H2O").unwrap() - 18.015).abs() < 1e-2);
    }

    #[test]
    fn unknown_or_missing_formula() {
        assert_eq!(formula_weight("C5H7O4R"), None);
        assert_eq!(formula_weight(""), None);
        assert_eq!(Metabolite::new("x_e", "e").molecular_weight(), None);
    }
}
