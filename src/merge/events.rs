//! Reingestion events and the agent that performed them.

use reingest_store::EventQuery;
use tracing::{info, instrument};

use super::{
    Anomaly, MergeContext, MergeReport, append_agent, append_event, canonical_agent,
};
use crate::error::ReingestError;
use crate::model::{Document, IdentityKey};

/// Record every pending `reingestion` event on its target entry, followed by
/// the canonical software agent.
///
/// Agents are recorded at most once per administrative section. Events are
/// recorded at most once per identifier.
///
/// # Errors
/// Store failures, or [`ReingestError::MissingAdministrativeSection`] for a
/// target entry without an amdSec.
#[instrument(skip_all, fields(package = %ctx.package))]
pub fn merge_events(
    doc: &mut Document,
    ctx: &MergeContext<'_>,
) -> Result<MergeReport, ReingestError> {
    let mut report = MergeReport::default();
    let events = ctx
        .store
        .events(&EventQuery::package_events(ctx.package, "reingestion"))?;
    if events.is_empty() {
        info!("no reingestion events");
        return Ok(report);
    }
    let agent = canonical_agent(ctx, &mut report)?;

    for event in &events {
        let Some(entry) = doc.resolve(&IdentityKey::content(event.content_id)) else {
            report.anomaly(Anomaly::UnresolvedEvent {
                event_id: event.event_id,
                content_id: event.content_id,
            });
            continue;
        };
        append_event(doc, entry, event, ctx.now, &mut report)?;
        if let Some(agent) = &agent {
            append_agent(doc, entry, agent, ctx.now, &mut report)?;
        }
    }
    info!(events = events.len(), %report, "event merge done");
    Ok(report)
}
