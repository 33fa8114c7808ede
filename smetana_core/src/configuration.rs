//! Crate wide defaults
use std::sync::{LazyLock, RwLock};

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

/// Default values used when building models and solving problems
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Default lower bound of a reaction
    pub lower_bound: f64,
    /// Default upper bound of a reaction
    pub upper_bound: f64,
    /// Tolerance used when checking solutions
    pub tolerance: f64,
    /// Solver used for problems with only continuous variables
    pub lp_solver: SolverBackend,
    /// Solver used for problems with integer or binary variables
    pub milp_solver: SolverBackend,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: -1000.,
            upper_bound: 1000.,
            tolerance: 1e-07,
            lp_solver: SolverBackend::Clarabel,
            milp_solver: default_milp_solver(),
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "microlp")] {
        fn default_milp_solver() -> SolverBackend {
            SolverBackend::Microlp
        }
    } else {
        fn default_milp_solver() -> SolverBackend {
            // Will fail when a problem with binary variables is optimized
            SolverBackend::Clarabel
        }
    }
}

/// Read a copy of the current configuration
///
/// A poisoned lock only means a writer panicked, the stored values are still usable
pub fn current() -> Configuration {
    match CONFIGURATION.read() {
        Ok(config) => config.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Enum used to specify which solver to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverBackend {
    /// Use the Clarabel interior point solver (continuous problems only)
    Clarabel,
    /// Use the microlp simplex/branch and bound solver, requires the microlp feature
    Microlp,
}
