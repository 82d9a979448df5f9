//! Record store layer for mets-reingest.
//!
//! This crate defines the [`RecordStore`] trait, the read-only query surface
//! through which the reconciliation engine reads pending change records. No
//! other crate talks to the database directly; they depend on `reingest-store`
//! and program against the trait.
//!
//! # Crate layout
//!
//! - [`store`]: the [`RecordStore`] trait and its query types.
//! - [`records`]: value types returned by the trait ([`DublinCoreRecord`],
//!   [`RightsRecord`], [`EventRecord`], [`AgentRecord`], [`FileRecord`]).
//! - [`sqlite`]: [`SqliteStore`], the production backend.
//! - [`memory`]: [`MemoryStore`], an in-process backend for tests and tools.
//! - [`error`]: the [`StoreError`] enum returned by all trait methods.

pub mod error;
pub mod memory;
pub mod records;
pub mod sqlite;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use records::{
    AgentRecord, DublinCoreFields, DublinCoreRecord, EventRecord, FileRecord, MetadataStatus,
    RightsBasis, RightsDetail, RightsGranted, RightsRecord, Scope, ScopeKind,
};
pub use sqlite::SqliteStore;
pub use store::{AgentQuery, EventQuery, EventScope, FileQuery, LocationMatch, RecordStore};
