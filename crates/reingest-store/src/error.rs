//! Error types for record store queries.
//!
//! [`StoreError`] is the single error type returned by every
//! [`RecordStore`](crate::RecordStore) method. "No rows" is never an error:
//! queries return empty vectors and the caller decides what absence means.

use thiserror::Error;

/// Errors returned by [`RecordStore`](crate::RecordStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The SQLite backend failed (open, prepare, or step).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A row was read successfully but a column held an unusable value.
    #[error("malformed {table} row `{key}`: {reason}")]
    MalformedRow {
        /// Table the row came from.
        table: &'static str,
        /// Primary key (or best available identifier) of the row.
        key: String,
        /// Which column was bad and why.
        reason: String,
    },
}

impl StoreError {
    pub(crate) fn malformed(
        table: &'static str,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedRow {
            table,
            key: key.into(),
            reason: reason.into(),
        }
    }
}
