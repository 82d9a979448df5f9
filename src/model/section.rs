//! Metadata sections and their versioned subsections.
//!
//! A [`MetadataSection`] is the ordered history of metadata attached to one
//! entry: the descriptive history (`dmdSec` elements) or one administrative
//! section (`amdSec`). Each [`Subsection`] is one version of one kind of
//! metadata. Versions of the same kind form a chain: the older subsection is
//! *superseded by* the newer one.
//!
//! Subsections are only ever appended. A supersession pointer, once set, is
//! never reassigned or cleared.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use reingest_xml::Element;

use crate::error::ReingestError;

// ---------------------------------------------------------------------------
// MdSecType
// ---------------------------------------------------------------------------

/// The METS element a subsection is serialized as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MdSecType {
    /// `dmdSec`, a top-level descriptive section.
    Dmd,
    /// `techMD` inside an `amdSec`.
    Tech,
    /// `rightsMD` inside an `amdSec`.
    Rights,
    /// `sourceMD` inside an `amdSec`.
    Source,
    /// `digiprovMD` inside an `amdSec`.
    Digiprov,
}

impl MdSecType {
    /// Local element name.
    #[must_use]
    pub const fn element_name(self) -> &'static str {
        match self {
            Self::Dmd => "dmdSec",
            Self::Tech => "techMD",
            Self::Rights => "rightsMD",
            Self::Source => "sourceMD",
            Self::Digiprov => "digiprovMD",
        }
    }

    /// Parse a local element name. Returns `None` for anything that is not a
    /// metadata subsection.
    #[must_use]
    pub fn from_element_name(local: &str) -> Option<Self> {
        match local {
            "dmdSec" => Some(Self::Dmd),
            "techMD" => Some(Self::Tech),
            "rightsMD" => Some(Self::Rights),
            "sourceMD" => Some(Self::Source),
            "digiprovMD" => Some(Self::Digiprov),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SubsectionKind
// ---------------------------------------------------------------------------

/// What a subsection describes. Supersession chains never cross kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubsectionKind {
    Descriptive,
    Technical,
    Rights,
    Source,
    /// A `digiprovMD` wrapping a PREMIS event.
    Event,
    /// A `digiprovMD` wrapping a PREMIS agent.
    Agent,
    /// Any other `digiprovMD`.
    Provenance,
}

impl fmt::Display for SubsectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Descriptive => "descriptive",
            Self::Technical => "technical",
            Self::Rights => "rights",
            Self::Source => "source",
            Self::Event => "event",
            Self::Agent => "agent",
            Self::Provenance => "provenance",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// The `STATUS` attribute of a subsection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Original,
    Current,
    Updated,
    Superseded,
    Deleted,
    Other(String),
}

impl Status {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Original => "original",
            Self::Current => "current",
            Self::Updated => "updated",
            Self::Superseded => "superseded",
            Self::Deleted => "deleted",
            Self::Other(s) => s,
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "original" => Self::Original,
            "current" => Self::Current,
            "updated" => Self::Updated,
            "superseded" => Self::Superseded,
            "deleted" => Self::Deleted,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Subsection
// ---------------------------------------------------------------------------

/// One version of one kind of metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subsection {
    /// Document-unique `ID`.
    pub id: String,
    /// Which METS element this serializes as.
    pub element: MdSecType,
    /// `CREATED` attribute, verbatim.
    pub created: Option<String>,
    /// `STATUS` attribute.
    pub status: Option<Status>,
    /// Attributes other than `ID`, `CREATED` and `STATUS`, in document order.
    pub extra_attributes: Vec<(String, String)>,
    /// The `mdWrap` or `mdRef` child, opaque to the model.
    pub payload: Element,
    superseded_by: Option<String>,
}

impl Subsection {
    /// A new, active subsection.
    pub fn new(
        element: MdSecType,
        id: impl Into<String>,
        created: Option<String>,
        status: Option<Status>,
        payload: Element,
    ) -> Self {
        Self {
            id: id.into(),
            element,
            created,
            status,
            extra_attributes: Vec::new(),
            payload,
            superseded_by: None,
        }
    }

    /// The subsection's kind, derived from the element and the payload's
    /// `MDTYPE`.
    #[must_use]
    pub fn kind(&self) -> SubsectionKind {
        match self.element {
            MdSecType::Dmd => SubsectionKind::Descriptive,
            MdSecType::Tech => SubsectionKind::Technical,
            MdSecType::Rights => SubsectionKind::Rights,
            MdSecType::Source => SubsectionKind::Source,
            MdSecType::Digiprov => match self.md_type() {
                Some("PREMIS:EVENT") => SubsectionKind::Event,
                Some("PREMIS:AGENT") => SubsectionKind::Agent,
                _ => SubsectionKind::Provenance,
            },
        }
    }

    /// `MDTYPE` of the payload.
    #[must_use]
    pub fn md_type(&self) -> Option<&str> {
        self.payload.attr("MDTYPE")
    }

    /// The first element inside `mdWrap/xmlData`, if any.
    #[must_use]
    pub fn xml_data(&self) -> Option<&Element> {
        self.payload
            .find_child("xmlData")
            .and_then(|data| data.child_elements().next())
    }

    /// The ID of the subsection that replaced this one.
    #[must_use]
    pub fn superseded_by(&self) -> Option<&str> {
        self.superseded_by.as_deref()
    }

    /// Whether this subsection is the head of its chain.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.superseded_by.is_none() && self.status != Some(Status::Superseded)
    }

    /// `CREATED` as a timestamp, for ordering. Accepts RFC 3339 and the
    /// zone-less `YYYY-MM-DDTHH:MM:SS` form.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.created.as_deref()?.trim();
        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|t| t.and_utc())
            })
    }

    /// Restore a pointer read back from a serialized document.
    pub(crate) fn link_successor(&mut self, successor: &str) {
        if self.superseded_by.is_none() {
            self.superseded_by = Some(successor.to_owned());
        }
    }
}

// ---------------------------------------------------------------------------
// MetadataSection
// ---------------------------------------------------------------------------

/// An append-only, ordered list of subsections.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataSection {
    /// `ID` of the `amdSec`. `None` for the descriptive history.
    pub id: Option<String>,
    /// Attributes of the `amdSec` other than `ID`.
    pub extra_attributes: Vec<(String, String)>,
    subsections: Vec<Subsection>,
}

impl MetadataSection {
    /// An empty descriptive history.
    #[must_use]
    pub fn descriptive() -> Self {
        Self::default()
    }

    /// An empty administrative section.
    pub fn administrative(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn subsections(&self) -> &[Subsection] {
        &self.subsections
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subsections.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subsections.len()
    }

    /// Most recently appended subsection.
    #[must_use]
    pub fn last(&self) -> Option<&Subsection> {
        self.subsections.last()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Subsection> {
        self.subsections.iter().find(|s| s.id == id)
    }

    /// Subsections of one kind, in document order.
    pub fn of_kind(&self, kind: SubsectionKind) -> impl Iterator<Item = &Subsection> {
        self.subsections.iter().filter(move |s| s.kind() == kind)
    }

    /// The newest active subsection of `kind`.
    #[must_use]
    pub fn active(&self, kind: SubsectionKind) -> Option<&Subsection> {
        self.of_kind(kind).filter(|s| s.is_active()).last()
    }

    /// Append a subsection at the end.
    pub fn append(&mut self, subsection: Subsection) {
        self.subsections.push(subsection);
    }

    /// Record that `new_id` replaces `old_id`.
    ///
    /// Sets the old subsection's pointer and `STATUS="superseded"`, and marks
    /// the new one `STATUS="updated"`.
    ///
    /// # Errors
    /// Fails if either subsection is missing, if they are of different kinds,
    /// if `old_id` already has a successor, or if the new subsection does not
    /// come after the old one.
    pub fn supersede(&mut self, old_id: &str, new_id: &str) -> Result<(), ReingestError> {
        let fail = |detail: String| ReingestError::Supersession {
            subsection: old_id.to_owned(),
            detail,
        };
        let old = self
            .position(old_id)
            .ok_or_else(|| fail("subsection not found".to_owned()))?;
        let new = self
            .position(new_id)
            .ok_or_else(|| fail(format!("successor '{new_id}' not found")))?;
        if new <= old {
            return Err(fail(format!("successor '{new_id}' is not newer")));
        }
        let (old_kind, new_kind) = (self.subsections[old].kind(), self.subsections[new].kind());
        if old_kind != new_kind {
            return Err(fail(format!(
                "kind mismatch: {old_kind} cannot be superseded by {new_kind}"
            )));
        }
        if let Some(existing) = self.subsections[old].superseded_by() {
            return Err(fail(format!("already superseded by '{existing}'")));
        }

        let retired = &mut self.subsections[old];
        retired.superseded_by = Some(new_id.to_owned());
        retired.status = Some(Status::Superseded);
        self.subsections[new].status = Some(Status::Updated);
        Ok(())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.subsections.iter().position(|s| s.id == id)
    }

    pub(crate) fn subsections_mut(&mut self) -> &mut [Subsection] {
        &mut self.subsections
    }
}
