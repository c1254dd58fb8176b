//! CSV input and output
//!
//! - `loader`: catalog id lists, TLE tables and ground trajectories
//! - `writer`: the attenuation table and downloaded TLE tables

mod loader;
mod writer;

pub use loader::*;
pub use writer::*;

use crate::orbit::TleError;

/// Problems with a tabular input or output file
#[derive(Debug)]
pub enum DataError {
    /// File has no header row
    Empty,

    /// Required column is absent from the header
    MissingColumn { column: String },

    /// A cell that must be numeric is not (`row` is 1-based, header excluded)
    MalformedField {
        row: usize,
        column: String,
        value: String,
    },

    /// TLE columns of a row failed validation
    InvalidElements { row: usize, source: TleError },

    Csv(csv::Error),

    Io(std::io::Error),
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "The CSV file is empty."),
            Self::MissingColumn { column } => write!(f, "Missing {} header.", column),
            Self::MalformedField { row, column, value } => {
                write!(
                    f,
                    "Ill-formed file: row {} column {:?} has non-numeric value {:?}",
                    row, column, value
                )
            }
            Self::InvalidElements { row, source } => {
                write!(f, "Ill-formed TLE on row {}: {}", row, source)
            }
            Self::Csv(e) => write!(f, "CSV error: {}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidElements { source, .. } => Some(source),
            Self::Csv(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<csv::Error> for DataError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

impl From<std::io::Error> for DataError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
