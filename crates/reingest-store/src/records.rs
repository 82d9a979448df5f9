//! Value types returned by [`RecordStore`](crate::RecordStore) queries.
//!
//! These are read-only snapshots of pending change records. The engine never
//! mutates them; it only turns them into document payloads.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// MetadataStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a descriptive or rights record relative to reingest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetadataStatus {
    /// Newly created since the package was last stored.
    Original,
    /// Carried over from the prior document and not touched since.
    Reingest,
    /// Edited since the package was last stored.
    Updated,
}

impl MetadataStatus {
    /// The column value used by the SQLite schema.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Original => "ORIGINAL",
            Self::Reingest => "REINGEST",
            Self::Updated => "UPDATED",
        }
    }
}

impl fmt::Display for MetadataStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ORIGINAL" => Ok(Self::Original),
            "REINGEST" => Ok(Self::Reingest),
            "UPDATED" => Ok(Self::Updated),
            other => Err(format!("unknown metadata status `{other}`")),
        }
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// What a metadata record applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    /// The package as a whole.
    Package,
    /// A single file within the package.
    File,
}

impl ScopeKind {
    /// The column value used by the SQLite schema.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::File => "file",
        }
    }
}

impl FromStr for ScopeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "package" => Ok(Self::Package),
            "file" => Ok(Self::File),
            other => Err(format!("unknown scope kind `{other}`")),
        }
    }
}

/// A (kind, identifier) pair naming the subject of a metadata record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// Package or file.
    pub kind: ScopeKind,
    /// The package or file UUID.
    pub id: Uuid,
}

impl Scope {
    /// Scope covering a whole package.
    #[must_use]
    pub const fn package(id: Uuid) -> Self {
        Self {
            kind: ScopeKind::Package,
            id,
        }
    }

    /// Scope covering one file.
    #[must_use]
    pub const fn file(id: Uuid) -> Self {
        Self {
            kind: ScopeKind::File,
            id,
        }
    }
}

// ---------------------------------------------------------------------------
// Dublin Core
// ---------------------------------------------------------------------------

/// The fifteen Dublin Core elements plus `isPartOf`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DublinCoreFields {
    pub title: Option<String>,
    pub is_part_of: Option<String>,
    pub creator: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub contributor: Option<String>,
    pub date: Option<String>,
    pub kind: Option<String>,
    pub format: Option<String>,
    pub identifier: Option<String>,
    pub source: Option<String>,
    pub relation: Option<String>,
    pub language: Option<String>,
    pub coverage: Option<String>,
    pub rights: Option<String>,
}

impl DublinCoreFields {
    /// Element names paired with values, in serialization order.
    #[must_use]
    pub fn entries(&self) -> [(&'static str, Option<&str>); 16] {
        [
            ("dc:title", self.title.as_deref()),
            ("dcterms:isPartOf", self.is_part_of.as_deref()),
            ("dc:creator", self.creator.as_deref()),
            ("dc:subject", self.subject.as_deref()),
            ("dc:description", self.description.as_deref()),
            ("dc:publisher", self.publisher.as_deref()),
            ("dc:contributor", self.contributor.as_deref()),
            ("dc:date", self.date.as_deref()),
            ("dc:type", self.kind.as_deref()),
            ("dc:format", self.format.as_deref()),
            ("dc:identifier", self.identifier.as_deref()),
            ("dc:source", self.source.as_deref()),
            ("dc:relation", self.relation.as_deref()),
            ("dc:language", self.language.as_deref()),
            ("dc:coverage", self.coverage.as_deref()),
            ("dc:rights", self.rights.as_deref()),
        ]
    }

    /// `true` when every field is absent or blank.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries()
            .iter()
            .all(|(_, v)| v.is_none_or(|s| s.trim().is_empty()))
    }
}

/// A Dublin Core record for a package or file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DublinCoreRecord {
    /// Store-assigned row identifier; later rows were written later.
    pub id: i64,
    /// What the record describes.
    pub scope: Scope,
    /// Reingest status.
    pub status: MetadataStatus,
    /// Element values.
    pub fields: DublinCoreFields,
}

// ---------------------------------------------------------------------------
// Rights
// ---------------------------------------------------------------------------

/// The legal basis of a rights statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RightsBasis {
    Copyright,
    Statute,
    License,
    Donor,
    Policy,
    Other,
}

impl RightsBasis {
    /// The text written into `premis:rightsBasis`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Copyright => "Copyright",
            Self::Statute => "Statute",
            Self::License => "License",
            Self::Donor => "Donor",
            Self::Policy => "Policy",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for RightsBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RightsBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "copyright" => Ok(Self::Copyright),
            "statute" => Ok(Self::Statute),
            "license" => Ok(Self::License),
            "donor" => Ok(Self::Donor),
            "policy" => Ok(Self::Policy),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown rights basis `{other}`")),
        }
    }
}

/// Basis-specific information attached to a rights statement. Only the
/// fields matching the record's basis are expected to be populated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RightsDetail {
    pub copyright_status: Option<String>,
    pub copyright_jurisdiction: Option<String>,
    pub copyright_determination_date: Option<String>,
    pub license_terms: Option<String>,
    pub statute_jurisdiction: Option<String>,
    pub statute_citation: Option<String>,
    pub statute_determination_date: Option<String>,
    pub note: Option<String>,
}

/// One act granted (or restricted) by a rights statement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RightsGranted {
    pub act: String,
    pub restriction: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// The grant has no end date.
    pub end_open: bool,
    pub note: Option<String>,
}

/// A rights statement applying to a package.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RightsRecord {
    /// Store-assigned row identifier.
    pub id: i64,
    /// What the statement applies to.
    pub scope: Scope,
    /// Reingest status.
    pub status: MetadataStatus,
    /// Legal basis; the key used to thread supersession.
    pub basis: RightsBasis,
    /// `rightsStatementIdentifierType`.
    pub identifier_type: String,
    /// `rightsStatementIdentifierValue`.
    pub identifier_value: String,
    /// Basis-specific detail.
    pub detail: RightsDetail,
    /// Granted acts, in insertion order.
    pub granted: Vec<RightsGranted>,
}

// ---------------------------------------------------------------------------
// Agents and events
// ---------------------------------------------------------------------------

/// An actor responsible for preservation events.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Store-assigned row identifier.
    pub id: i64,
    pub identifier_type: String,
    pub identifier_value: String,
    pub name: String,
    pub agent_type: String,
}

/// A preservation event recorded against one file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Globally unique event identifier.
    pub event_id: Uuid,
    /// The file the event happened to.
    pub content_id: Uuid,
    /// Event type, e.g. `reingestion`, `deletion`, `ingestion`.
    pub event_type: String,
    pub datetime: DateTime<Utc>,
    pub detail: Option<String>,
    pub outcome: Option<String>,
    pub outcome_detail: Option<String>,
    /// Agents linked to this event.
    pub agents: Vec<AgentRecord>,
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// A file belonging to a package.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Stable content identifier.
    pub content_id: Uuid,
    /// Owning package.
    pub package: Uuid,
    /// Location when the file first entered the system, with placeholder
    /// prefix (e.g. `%transferDirectory%objects/a.txt`).
    pub original_location: String,
    /// Location inside the package, with placeholder prefix (e.g.
    /// `%SIPDirectory%objects/metadata/metadata.csv`).
    pub current_location: String,
    /// File group use, e.g. `original`, `metadata`, `preservation`.
    pub use_category: String,
    pub checksum: Option<String>,
    pub checksum_type: Option<String>,
    pub size: Option<u64>,
}
