//! The [`RecordStore`] trait: the single abstraction boundary between the
//! reconciliation engine and wherever pending change records live.
//!
//! | Query                   | Used by                                  |
//! |-------------------------|------------------------------------------|
//! | `descriptive_metadata`  | descriptive merge                        |
//! | `rights_statements`     | rights merge                             |
//! | `events`                | event merge, deletion marking, extender  |
//! | `agents`                | event merge                              |
//! | `files`                 | structural extender, side-metadata rows  |

use uuid::Uuid;

use crate::error::StoreError;
use crate::records::{
    AgentRecord, DublinCoreRecord, EventRecord, FileRecord, MetadataStatus, RightsRecord, Scope,
};

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// Which events to fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventScope {
    /// Every event on every file of a package.
    Package(Uuid),
    /// Events on one file.
    File(Uuid),
}

/// Event filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventQuery {
    pub scope: EventScope,
    /// Restrict to one event type (e.g. `reingestion`). `None` returns all.
    pub event_type: Option<String>,
}

impl EventQuery {
    /// Events of one type across a package.
    pub fn package_events(package: Uuid, event_type: impl Into<String>) -> Self {
        Self {
            scope: EventScope::Package(package),
            event_type: Some(event_type.into()),
        }
    }

    /// All events recorded against one file.
    #[must_use]
    pub const fn file_events(content_id: Uuid) -> Self {
        Self {
            scope: EventScope::File(content_id),
            event_type: None,
        }
    }
}

/// Agent lookup by its identifying triple.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentQuery {
    pub identifier_type: String,
    pub name: String,
    pub agent_type: String,
}

/// How to match a file's location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocationMatch {
    /// Current location equals the given string exactly.
    CurrentIs(String),
    /// Original location ends with the given suffix.
    OriginalEndsWith(String),
    /// Current location ends with the given suffix.
    CurrentEndsWith(String),
}

impl LocationMatch {
    /// Apply the predicate to a file record.
    #[must_use]
    pub fn matches(&self, file: &FileRecord) -> bool {
        match self {
            Self::CurrentIs(loc) => file.current_location == *loc,
            Self::OriginalEndsWith(suffix) => file.original_location.ends_with(suffix.as_str()),
            Self::CurrentEndsWith(suffix) => file.current_location.ends_with(suffix.as_str()),
        }
    }
}

/// File filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileQuery {
    pub package: Uuid,
    /// Restrict to one file group use (e.g. `metadata`).
    pub use_category: Option<String>,
    pub location: Option<LocationMatch>,
}

impl FileQuery {
    /// All files in a package.
    #[must_use]
    pub const fn in_package(package: Uuid) -> Self {
        Self {
            package,
            use_category: None,
            location: None,
        }
    }

    /// Builder: restrict to a file group use.
    #[must_use]
    pub fn with_use(mut self, use_category: impl Into<String>) -> Self {
        self.use_category = Some(use_category.into());
        self
    }

    /// Builder: restrict by location.
    #[must_use]
    pub fn with_location(mut self, location: LocationMatch) -> Self {
        self.location = Some(location);
        self
    }

    /// Apply the whole filter to a file record.
    #[must_use]
    pub fn matches(&self, file: &FileRecord) -> bool {
        file.package == self.package
            && self
                .use_category
                .as_ref()
                .is_none_or(|u| file.use_category == *u)
            && self.location.as_ref().is_none_or(|l| l.matches(file))
    }
}

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

/// Read-only query surface over pending change records.
///
/// Every method returns rows in a stable order (insertion order, or event
/// time for events) so that repeated runs see the same sequence.
///
/// # Object safety
///
/// This trait is object-safe; the engine takes `&dyn RecordStore`.
pub trait RecordStore {
    /// Dublin Core records for a scope, optionally filtered by status.
    fn descriptive_metadata(
        &self,
        scope: &Scope,
        status: Option<MetadataStatus>,
    ) -> Result<Vec<DublinCoreRecord>, StoreError>;

    /// Rights statements for a scope with the given status.
    fn rights_statements(
        &self,
        scope: &Scope,
        status: MetadataStatus,
    ) -> Result<Vec<RightsRecord>, StoreError>;

    /// Events matching the query, with their linked agents.
    fn events(&self, query: &EventQuery) -> Result<Vec<EventRecord>, StoreError>;

    /// Agents matching the identifying triple. Zero, one or many.
    fn agents(&self, query: &AgentQuery) -> Result<Vec<AgentRecord>, StoreError>;

    /// Files matching the query.
    fn files(&self, query: &FileQuery) -> Result<Vec<FileRecord>, StoreError>;
}
