//! Power flow numerics: network reduction to per-unit matrices, iterative
//! solvers, and the engine that writes pandapower-style result tables.

pub(crate) mod dsbus_dv;
pub mod engine;
pub(crate) mod gausspf;
pub(crate) mod newtonpf;
pub(crate) mod results;
pub mod solver;
pub(crate) mod system;

pub use engine::{Algorithm, InitMethod, NewtonEngine};
pub use gausspf::gauss_seidel_pf;
pub use newtonpf::{IterationOutcome, newton_pf};

use thiserror::Error;

use crate::io::pandapower::Network;

/// Parameters of one power flow run, already resolved by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOptions {
    pub algorithm: String,
    pub max_iteration: usize,
    pub enforce_q_lims: bool,
    pub calculate_voltage_angles: bool,
    pub init: String,
    pub tolerance_mva: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            algorithm: "nr".into(),
            max_iteration: 10,
            enforce_q_lims: false,
            calculate_voltage_angles: true,
            init: "auto".into(),
            tolerance_mva: 1e-8,
        }
    }
}

/// What a solver reports back besides the state it writes into the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveOutcome {
    pub converged: bool,
    pub iterations: Option<usize>,
}

/// Warning sink handed to a solver for the duration of one call.
///
/// Messages keep the order in which they were emitted.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("algorithm '{0}' is not available (supported: nr, iwamoto_nr, gs)")]
    UnsupportedAlgorithm(String),

    #[error("unknown init method '{0}' (expected auto, flat, dc or results)")]
    UnknownInit(String),

    #[error("no reference bus: add an ext_grid or a gen with slack=True")]
    NoSlack,

    #[error("{element} {index} refers to unknown bus {bus}")]
    UnknownBus {
        element: &'static str,
        index: i64,
        bus: i64,
    },

    #[error("{element} {index} is invalid: {reason}")]
    InvalidElement {
        element: &'static str,
        index: i64,
        reason: String,
    },

    #[error("{0} is not supported by the built-in solver")]
    UnsupportedElement(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("numerical failure: {0}")]
    Numerical(String),
}

/// A power flow solver operating in place on a [`Network`].
///
/// On success the solver sets `network.converged` and, when converged, fills
/// the `res_*` tables. Non-convergence is not an error; `Err` is reserved for
/// inputs the solver cannot handle at all.
pub trait PowerFlowSolver: Send + Sync {
    fn solve(
        &self,
        network: &mut Network,
        options: &SolveOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<SolveOutcome, SolverError>;
}
