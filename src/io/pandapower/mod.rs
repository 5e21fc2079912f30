//! pandapower network model and file codecs.

pub mod builder;
mod de;
pub mod excel;
pub mod file_io;
pub mod json;
pub mod pickle;
pub mod results;
pub mod sqlite;
pub mod table;

pub use builder::NetworkBuilder;
pub use file_io::*;
pub use results::ResultTable;
pub use table::{Parameters, RawTable};

use thiserror::Error;

/// Errors raised while decoding or encoding a pandapower network.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed table data: {0}")]
    Malformed(String),

    #[error("required table '{0}' is missing")]
    MissingTable(&'static str),

    #[error("invalid {table} element at index {index}: {message}")]
    Element {
        table: String,
        index: String,
        message: String,
    },

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("pickle error: {0}")]
    Pickle(#[from] serde_pickle::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<calamine::Error> for CodecError {
    fn from(e: calamine::Error) -> Self {
        CodecError::Spreadsheet(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for CodecError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        CodecError::Spreadsheet(e.to_string())
    }
}
