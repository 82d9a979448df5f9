//! XML tree layer for mets-reingest.
//!
//! This crate is the only place that talks to `quick-xml`. Everything above it
//! works with the owned [`Element`] tree: parse a document once, walk and
//! mutate elements in memory, then serialize the whole tree back out.
//!
//! # Crate layout
//!
//! - [`element`]: the [`Element`] / [`Node`] tree and its query helpers.
//! - [`read`]: parsing text into an [`XmlDocument`].
//! - [`write`]: pretty-printed serialization.
//! - [`error`]: the [`XmlError`] enum.
//!
//! Names are kept exactly as written (`mets:div`, `xlink:href`); namespace
//! declarations are ordinary attributes. Lookups by local name ignore the
//! prefix, which is what callers want when documents use differing prefixes
//! for the same vocabulary.

pub mod element;
pub mod error;
pub mod read;
pub mod write;

pub use element::{Element, Node, local_name};
pub use error::XmlError;
pub use read::{XmlDocument, parse_document, parse_element};
pub use write::{to_pretty_string, write_document};
