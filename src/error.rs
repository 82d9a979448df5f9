//! Error types for the reconciliation engine.
//!
//! Defines [`ReingestError`], the error type returned by every step that can
//! abort a run. Error messages are written for whoever runs the tool: each
//! variant says what went wrong and how to fix it.
//!
//! Per-record problems (a change record pointing at an entry that does not
//! exist, an ambiguous agent lookup) are *not* errors. Mergers log them, record
//! an [`Anomaly`](crate::merge::Anomaly) and carry on.

use std::fmt;
use std::path::PathBuf;

use reingest_store::StoreError;
use reingest_xml::XmlError;

// ---------------------------------------------------------------------------
// ReingestError
// ---------------------------------------------------------------------------

/// Fatal errors: the run aborts and no output document is written.
#[derive(Debug)]
pub enum ReingestError {
    /// The prior document could not be parsed as XML.
    DocumentParse {
        /// Path of the document, when read from disk.
        path: Option<PathBuf>,
        /// The underlying XML error.
        source: XmlError,
    },

    /// The prior document is well-formed XML but not a usable METS document.
    MalformedDocument {
        /// Human-readable description of the problem.
        detail: String,
    },

    /// An anchor entry the merge attaches to is missing from the structural map.
    MissingAnchor {
        /// Label of the directory entry that was expected (e.g. `objects`).
        label: String,
    },

    /// An entry that must carry an administrative section has none.
    MissingAdministrativeSection {
        /// Path, label or content identifier of the entry.
        entry: String,
    },

    /// A supersession step would break the history invariants.
    Supersession {
        /// Identifier of the subsection being retired.
        subsection: String,
        /// What was wrong.
        detail: String,
    },

    /// The side-metadata table could not be read.
    SideMetadata {
        /// Path of the table.
        path: PathBuf,
        /// Description of the problem.
        detail: String,
    },

    /// The record store failed.
    Store(StoreError),

    /// Serializing the reconciled document failed.
    Serialize(XmlError),

    /// The configuration file could not be loaded or parsed.
    Config {
        /// Path to the configuration file, when read from disk.
        path: Option<PathBuf>,
        /// Human-readable description of the problem.
        detail: String,
    },

    /// An I/O error while reading inputs or writing the output.
    Io {
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
}

impl ReingestError {
    /// Convenience constructor for [`ReingestError::Io`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Convenience constructor for [`ReingestError::MalformedDocument`].
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedDocument {
            detail: detail.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for ReingestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DocumentParse { path, source } => {
                let at = path
                    .as_ref()
                    .map(|p| format!(" at {}", p.display()))
                    .unwrap_or_default();
                write!(
                    f,
                    "prior METS document{at} is not well-formed XML: {source}\n  To fix: restore the document from the stored package and retry."
                )
            }
            Self::MalformedDocument { detail } => {
                write!(
                    f,
                    "prior METS document is malformed: {detail}\n  To fix: check that the document was produced for this package and is complete."
                )
            }
            Self::MissingAnchor { label } => {
                write!(
                    f,
                    "structural map has no '{label}' directory entry to attach to.\n  To fix: the prior document must contain a Directory div labelled '{label}'."
                )
            }
            Self::MissingAdministrativeSection { entry } => {
                write!(
                    f,
                    "entry '{entry}' has no administrative section (amdSec).\n  To fix: every original or metadata file in the prior document must reference an amdSec via ADMID."
                )
            }
            Self::Supersession { subsection, detail } => {
                write!(f, "cannot supersede '{subsection}': {detail}")
            }
            Self::SideMetadata { path, detail } => {
                write!(
                    f,
                    "side-metadata table {} could not be parsed: {detail}\n  To fix: correct the CSV (first column is the file path, one header per column) and retry.",
                    path.display()
                )
            }
            Self::Store(e) => {
                write!(
                    f,
                    "record store query failed: {e}\n  To fix: check the [store] path in the configuration and that the database is readable."
                )
            }
            Self::Serialize(e) => write!(f, "failed to serialize reconciled document: {e}"),
            Self::Config { path, detail } => {
                let at = path
                    .as_ref()
                    .map(|p| format!(" in {}", p.display()))
                    .unwrap_or_default();
                write!(
                    f,
                    "config error{at}: {detail}\n  To fix: check the file syntax, or remove it to use defaults."
                )
            }
            Self::Io { path, source } => write!(f, "I/O error on {}: {source}", path.display()),
        }
    }
}

impl std::error::Error for ReingestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DocumentParse { source, .. } | Self::Serialize(source) => Some(source),
            Self::Store(e) => Some(e),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<StoreError> for ReingestError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_anchor_names_the_label_and_fix() {
        let msg = ReingestError::MissingAnchor {
            label: "metadata".into(),
        }
        .to_string();
        assert!(msg.contains("'metadata'"));
        assert!(msg.contains("To fix:"));
    }

    #[test]
    fn store_errors_keep_their_source() {
        let err: ReingestError = StoreError::MalformedRow {
            table: "files",
            key: "x".into(),
            reason: "bad UUID".into(),
        }
        .into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("bad UUID"));
    }
}
