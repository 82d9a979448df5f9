//! The five mergers and what they share.
//!
//! Each merger reads pending records through the
//! [`RecordStore`](reingest_store::RecordStore), mutates the [`Document`] in
//! place and returns a [`MergeReport`]. Mergers are safe to re-run: work an
//! earlier run already did is detected and skipped.
//!
//! | Merger                          | Records                     | Target                         |
//! |---------------------------------|-----------------------------|--------------------------------|
//! | [`merge_descriptive`]           | package Dublin Core         | `objects` directory dmdSecs    |
//! | [`merge_rights`]                | package rights statements   | every `original` file's amdSec |
//! | [`merge_events`]                | `reingestion` events        | event target's amdSec          |
//! | [`extend_structure`]            | metadata files on disk      | `objects/metadata` subtree     |
//! | [`mark_deletions`]              | `deletion` events           | tombstones                     |

pub mod delete;
pub mod descriptive;
pub mod events;
pub mod extend;
pub mod rights;
pub mod types;

use chrono::{DateTime, Utc};
use reingest_store::{AgentQuery, AgentRecord, EventRecord};
use reingest_xml::Element;
use tracing::debug;

use crate::config::ReingestConfig;
use crate::error::ReingestError;
use crate::mets::timestamp;
use crate::model::{
    Document, EntryId, IdKind, MdSecType, MetadataSection, Status, Subsection, SubsectionKind,
};
use crate::payload;

pub use delete::mark_deletions;
pub use descriptive::merge_descriptive;
pub use events::merge_events;
pub use extend::extend_structure;
pub use rights::merge_rights;
pub use types::{Anomaly, MergeContext, MergeReport};

// ---------------------------------------------------------------------------
// Descriptive history
// ---------------------------------------------------------------------------

/// Append `payload` to an entry's descriptive history, superseding the
/// previous last subsection. Skips when the active payload is identical.
pub(crate) fn append_descriptive(
    doc: &mut Document,
    entry: EntryId,
    payload: Element,
    now: DateTime<Utc>,
    report: &mut MergeReport,
) -> Result<(), ReingestError> {
    let history = &doc.entry(entry).descriptive;
    if history
        .active(SubsectionKind::Descriptive)
        .is_some_and(|s| s.payload == payload)
    {
        debug!(entry = %doc.entry(entry).display_name(), "descriptive payload unchanged");
        report.skipped += 1;
        return Ok(());
    }

    let id = doc.mint_id(IdKind::DmdSec);
    let sub = Subsection::new(
        MdSecType::Dmd,
        id.clone(),
        Some(timestamp(now)),
        Some(Status::Original),
        payload,
    );
    let history = &mut doc.entry_mut(entry).descriptive;
    let previous = history.last().map(|s| s.id.clone());
    history.append(sub);
    report.appended += 1;
    if let Some(previous) = previous {
        history.supersede(&previous, &id)?;
        report.superseded += 1;
    }
    doc.mark_modified();
    Ok(())
}

// ---------------------------------------------------------------------------
// Administrative sections
// ---------------------------------------------------------------------------

/// The entry's primary administrative section, or the fatal error for an
/// entry that should have one.
pub(crate) fn require_administrative(
    doc: &Document,
    entry: EntryId,
) -> Result<&MetadataSection, ReingestError> {
    let e = doc.entry(entry);
    e.primary_administrative()
        .ok_or_else(|| ReingestError::MissingAdministrativeSection {
            entry: e.display_name(),
        })
}

/// Append a new `STATUS="current"` subsection to the entry's primary
/// administrative section and return its ID.
pub(crate) fn append_administrative(
    doc: &mut Document,
    entry: EntryId,
    element: MdSecType,
    id_kind: IdKind,
    payload: Element,
    now: DateTime<Utc>,
) -> Result<String, ReingestError> {
    require_administrative(doc, entry)?;
    let id = doc.mint_id(id_kind);
    let sub = Subsection::new(
        element,
        id.clone(),
        Some(timestamp(now)),
        Some(Status::Current),
        payload,
    );
    if let Some(section) = doc.entry_mut(entry).primary_administrative_mut() {
        section.append(sub);
    }
    doc.mark_modified();
    Ok(id)
}

/// A new provenance subsection, not yet attached to any section.
pub(crate) fn digiprov(doc: &mut Document, payload: Element, now: DateTime<Utc>) -> Subsection {
    Subsection::new(
        MdSecType::Digiprov,
        doc.mint_id(IdKind::DigiprovMd),
        Some(timestamp(now)),
        Some(Status::Current),
        payload,
    )
}

/// Append an event unless its identifier is already recorded on the entry.
/// Returns whether anything was appended.
pub(crate) fn append_event(
    doc: &mut Document,
    entry: EntryId,
    event: &EventRecord,
    now: DateTime<Utc>,
    report: &mut MergeReport,
) -> Result<bool, ReingestError> {
    let event_id = event.event_id.to_string();
    let section = require_administrative(doc, entry)?;
    if section
        .of_kind(SubsectionKind::Event)
        .any(|s| payload::event_identifier(s).as_deref() == Some(event_id.as_str()))
    {
        debug!(%event_id, "event already recorded");
        report.skipped += 1;
        return Ok(false);
    }
    let payload = payload::event(doc.names(), event);
    append_administrative(doc, entry, MdSecType::Digiprov, IdKind::DigiprovMd, payload, now)?;
    report.appended += 1;
    Ok(true)
}

/// Append an agent unless one with the same identifier value is already
/// recorded in the entry's administrative section.
pub(crate) fn append_agent(
    doc: &mut Document,
    entry: EntryId,
    agent: &AgentRecord,
    now: DateTime<Utc>,
    report: &mut MergeReport,
) -> Result<bool, ReingestError> {
    let section = require_administrative(doc, entry)?;
    if section
        .of_kind(SubsectionKind::Agent)
        .any(|s| payload::agent_identifier(s).as_deref() == Some(agent.identifier_value.as_str()))
    {
        return Ok(false);
    }
    let payload = payload::agent(doc.names(), agent);
    append_administrative(doc, entry, MdSecType::Digiprov, IdKind::DigiprovMd, payload, now)?;
    report.appended += 1;
    Ok(true)
}

/// Look up the configured software agent. Zero matches and several matches
/// both mean "no agent"; the latter is reported.
pub(crate) fn canonical_agent(
    ctx: &MergeContext<'_>,
    report: &mut MergeReport,
) -> Result<Option<AgentRecord>, ReingestError> {
    let query = agent_query(ctx.config);
    let mut found = ctx.store.agents(&query)?;
    match found.len() {
        0 => {
            debug!(name = %query.name, "no canonical agent recorded");
            Ok(None)
        }
        1 => Ok(found.pop()),
        matches => {
            report.anomaly(Anomaly::AmbiguousAgent {
                name: query.name,
                matches,
            });
            Ok(None)
        }
    }
}

fn agent_query(config: &ReingestConfig) -> AgentQuery {
    AgentQuery {
        identifier_type: config.agent.identifier_type.clone(),
        name: config.agent.name.clone(),
        agent_type: config.agent.agent_type.clone(),
    }
}
