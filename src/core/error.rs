//! Error types for butterfly-sumo
//!
//! Provides error handling for CSV ingestion, file output and toolchain runs.

use std::fmt;
use std::path::PathBuf;

use strsim::normalized_levenshtein;

/// Minimum similarity for a header to be offered as a correction
const MIN_HEADER_SIMILARITY: f64 = 0.6;

/// Suggest the CSV header a user most likely meant when `column` is missing
///
/// Case-insensitive exact matches win outright; otherwise the closest header by
/// normalized Levenshtein similarity is returned if it is close enough.
pub fn suggest_column(column: &str, headers: &[String]) -> Option<String> {
    let wanted = column.trim().to_lowercase();
    let mut best_match = None;
    let mut best_score = MIN_HEADER_SIMILARITY;

    for header in headers {
        let candidate = header.trim().to_lowercase();
        if candidate == wanted {
            return Some(header.clone());
        }

        let score = normalized_levenshtein(&wanted, &candidate);
        if score >= best_score {
            best_score = score;
            best_match = Some(header.clone());
        }
    }

    best_match
}

/// Main error type for butterfly-sumo operations
#[derive(Debug)]
pub enum Error {
    /// A required CSV column is absent from the header row
    MissingColumn {
        column: String,
        suggestion: Option<String>,
    },

    /// Malformed CSV content
    CsvError(csv::Error),

    /// File I/O error
    IoError(std::io::Error),

    /// Pipeline configuration could not be read or parsed
    ConfigError { path: PathBuf, message: String },

    /// An external tool could not be started
    ToolSpawnFailed { tool: String, source: std::io::Error },

    /// An external tool exited unsuccessfully
    ToolFailed { tool: String, status: String },

    /// Invalid parameters
    InvalidInput(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingColumn { column, suggestion } => {
                write!(f, "CSV is missing the '{}' column", column)?;
                if let Some(suggestion) = suggestion {
                    write!(f, " (did you mean '{}'?)", suggestion)?;
                }
                Ok(())
            }
            Error::CsvError(err) => {
                write!(f, "CSV error: {}", err)
            }
            Error::IoError(err) => {
                write!(f, "I/O error: {}", err)
            }
            Error::ConfigError { path, message } => {
                write!(f, "Invalid configuration {}: {}", path.display(), message)
            }
            Error::ToolSpawnFailed { tool, source } => {
                write!(f, "Failed to start '{}': {}", tool, source)
            }
            Error::ToolFailed { tool, status } => {
                write!(f, "'{}' failed: {}", tool, status)
            }
            Error::InvalidInput(msg) => {
                write!(f, "Invalid input: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::CsvError(err) => Some(err),
            Error::IoError(err) => Some(err),
            Error::ToolSpawnFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::CsvError(err)
    }
}

/// Convenience result type for butterfly-sumo operations
pub type Result<T> = std::result::Result<T, Error>;
