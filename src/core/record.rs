//! Signal record parsing for butterfly-sumo
//!
//! Reads traffic signal rows from CSV and extracts the pair of location
//! identifiers each row connects.

use std::fs::File;
use std::io;
use std::path::Path;

use serde::Deserialize;

use crate::core::error::{suggest_column, Error, Result};

/// Header of the column holding the signal identifier
pub const SIGNAL_ID_COLUMN: &str = "Signal ID";

/// Header of the column holding the bracketed location list
pub const EDGES_COLUMN: &str = "Edges";

/// One row of the signal dataset
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SignalRecord {
    #[serde(rename = "Signal ID")]
    pub signal_id: String,

    #[serde(rename = "Edges")]
    pub edges: String,
}

/// Location identifiers referenced by a row
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoints<'a> {
    /// Nothing between the brackets
    Empty,
    /// A single identifier, not enough for a road segment
    Single(&'a str),
    /// First two identifiers, plus how many more were ignored
    Pair {
        from: &'a str,
        to: &'a str,
        ignored: usize,
    },
}

impl SignalRecord {
    /// Classify the row's location list
    pub fn endpoints(&self) -> Endpoints<'_> {
        let ids = parse_edge_list(&self.edges);
        match ids.as_slice() {
            [] => Endpoints::Empty,
            [only] => Endpoints::Single(*only),
            [from, to, rest @ ..] => Endpoints::Pair {
                from: *from,
                to: *to,
                ignored: rest.len(),
            },
        }
    }
}

/// Split a bracketed list such as `[A123, B456]` into trimmed identifiers
///
/// Brackets are optional. Blank entries are dropped, so `[]`, `[ ]` and `[,]`
/// all yield an empty list.
pub fn parse_edge_list(raw: &str) -> Vec<&str> {
    let inner = raw
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']');

    inner
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect()
}

/// Lazy reader over the rows of a signal CSV
pub struct RecordReader<R: io::Read> {
    records: csv::DeserializeRecordsIntoIter<R, SignalRecord>,
}

impl RecordReader<File> {
    /// Open a CSV file and validate its header row
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::IoError(io::Error::new(
                e.kind(),
                format!("Cannot open {}: {e}", path.display()),
            ))
        })?;
        Self::from_reader(file)
    }
}

impl<R: io::Read> RecordReader<R> {
    /// Wrap any reader and validate its header row
    pub fn from_reader(rdr: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(rdr);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        for column in [SIGNAL_ID_COLUMN, EDGES_COLUMN] {
            if !headers.iter().any(|h| h == column) {
                return Err(Error::MissingColumn {
                    column: column.to_string(),
                    suggestion: suggest_column(column, &headers),
                });
            }
        }

        Ok(Self {
            records: reader.into_deserialize(),
        })
    }
}

impl<R: io::Read> Iterator for RecordReader<R> {
    type Item = Result<SignalRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next().map(|r| r.map_err(Error::from))
    }
}
