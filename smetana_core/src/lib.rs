//! Core rust implementation of SMETANA, a crate for scoring metabolic interactions in microbial
//! communities.
//!
//! Organism models ([`metabolic_model::model::Model`]) are grouped in a
//! [`community::Community`] and merged into a single network by [`community::build`]. The
//! [`scores`] module computes species coupling, metabolite uptake and production, metabolic
//! interaction potential and metabolic resource overlap on top of it, using the minimal
//! medium search of [`medium`] and the growth environments of [`environment`].

pub mod community;
pub mod configuration;
pub mod environment;
pub mod io;
pub mod medium;
pub mod metabolic_model;
pub mod optimize;
pub mod scores;
