//! Error types for XML parsing and serialization.

use thiserror::Error;

/// Errors returned by [`parse_document`](crate::parse_document) and
/// [`write_document`](crate::write_document).
#[derive(Debug, Error)]
pub enum XmlError {
    /// The input is not well-formed XML.
    #[error("malformed XML at byte {position}: {message}")]
    Malformed {
        /// Reader offset where the problem was detected.
        position: u64,
        /// Description from the underlying reader.
        message: String,
    },

    /// The input ended while elements were still open.
    #[error("unexpected end of document: <{open}> is never closed")]
    UnexpectedEof {
        /// Name of the innermost unclosed element.
        open: String,
    },

    /// The input contains no root element.
    #[error("document has no root element")]
    NoRoot,

    /// Text content was not valid UTF-8.
    #[error("invalid UTF-8 in {context}")]
    InvalidUtf8 {
        /// Which construct carried the bad bytes.
        context: &'static str,
    },

    /// Serialization failed.
    #[error("failed to write XML: {message}")]
    Write {
        /// Description from the underlying writer.
        message: String,
    },
}
