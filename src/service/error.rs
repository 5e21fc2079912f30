use thiserror::Error;

/// Failures surfaced by the session-backed service.
///
/// Solver faults never show up here: the runner turns them into a
/// non-converged [`PowerFlowResult`](super::PowerFlowResult).
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported file format. Supported formats: {supported}")]
    UnsupportedFormat { supported: String },

    #[error("{0}")]
    InvalidNetwork(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Session not found")]
    SessionNotFound,

    /// Results were requested before a run, or an export found no converged run.
    #[error("{0}")]
    NoResultsAvailable(&'static str),

    #[error("Unknown example network: {0}")]
    UnknownExample(String),

    #[error("session storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session record could not be encoded: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("spreadsheet export failed: {0}")]
    Export(String),
}

impl From<rust_xlsxwriter::XlsxError> for Error {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        Error::Export(e.to_string())
    }
}

impl From<crate::io::pandapower::CodecError> for Error {
    fn from(e: crate::io::pandapower::CodecError) -> Self {
        Error::Export(e.to_string())
    }
}

impl Error {
    pub(crate) fn no_results() -> Self {
        Error::NoResultsAvailable("No results available. Run power flow first.")
    }

    pub(crate) fn nothing_to_export() -> Self {
        Error::NoResultsAvailable("No converged results available to export")
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
