pub mod api;
pub mod basic;
pub mod config;
pub mod io;
pub mod report;
pub mod service;
pub mod telemetry;

pub mod prelude {
    pub use crate::basic::{
        Diagnostics, NewtonEngine, PowerFlowSolver, SolveOptions, SolveOutcome, SolverError,
    };
    pub use crate::io::pandapower::{self, Network, NetworkBuilder};
    pub use crate::service::{
        FileFormat, PowerFlowRequest, PowerFlowResult, PowerFlowService, SessionStore,
    };
}
