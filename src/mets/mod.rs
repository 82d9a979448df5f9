//! METS serialization: reading a document into the model and writing it back.

pub mod read;
pub mod write;

use chrono::{DateTime, Utc};

pub use read::{parse_mets, read_mets};
pub use write::{render, write_mets};

/// The timestamp format used for `CREATED` and `LASTMODDATE`.
#[must_use]
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S").to_string()
}
