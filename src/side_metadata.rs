//! The side-metadata table (`objects/metadata/metadata.csv`).
//!
//! The first column names a file by its package-relative path; every other
//! column is a metadata field. Rows are keyed by path: a later row for the
//! same path replaces the earlier one but keeps its position.

use std::io::Read;
use std::path::Path;

use tracing::warn;

use crate::error::ReingestError;

/// One row: the file it describes and its non-empty fields in column order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SideMetadataRow {
    pub path: String,
    pub fields: Vec<(String, String)>,
}

/// A parsed side-metadata table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SideMetadata {
    rows: Vec<SideMetadataRow>,
}

impl SideMetadata {
    /// Read and parse the table at `path`.
    ///
    /// # Errors
    /// Returns [`ReingestError::SideMetadata`] if the file cannot be read or
    /// is not valid CSV.
    pub fn from_path(path: &Path) -> Result<Self, ReingestError> {
        let file = std::fs::File::open(path).map_err(|e| ReingestError::io(path, e))?;
        Self::from_reader(file).map_err(|e| ReingestError::SideMetadata {
            path: path.to_owned(),
            detail: e.to_string(),
        })
    }

    /// Parse a table from any reader.
    ///
    /// # Errors
    /// Returns the CSV error for malformed input (including rows whose
    /// length differs from the header's).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        let headers = csv.headers()?.clone();
        let mut rows: Vec<SideMetadataRow> = Vec::new();
        for record in csv.records() {
            let record = record?;
            let Some(raw_path) = record.get(0) else {
                continue;
            };
            let path = raw_path.trim().trim_end_matches('/').to_owned();
            if path.is_empty() {
                continue;
            }
            let fields = headers
                .iter()
                .zip(record.iter())
                .skip(1)
                .filter(|(_, value)| !value.trim().is_empty())
                .map(|(key, value)| (key.to_owned(), value.to_owned()))
                .collect();
            let row = SideMetadataRow { path, fields };
            if let Some(existing) = rows.iter_mut().find(|r| r.path == row.path) {
                warn!(path = %row.path, "duplicate side-metadata row; the later row wins");
                *existing = row;
            } else {
                rows.push(row);
            }
        }
        Ok(Self { rows })
    }

    #[must_use]
    pub fn rows(&self) -> &[SideMetadataRow] {
        &self.rows
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
