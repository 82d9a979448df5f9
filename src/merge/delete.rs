//! Tombstoning deleted files.

use reingest_store::EventQuery;
use tracing::{info, instrument};

use super::{Anomaly, MergeContext, MergeReport, append_event};
use crate::error::ReingestError;
use crate::model::{Document, IdentityKey};

/// Tombstone every entry named by a `deletion` event and record the event on
/// it. History is kept; only the label, locator and file group change.
///
/// # Errors
/// Store failures.
#[instrument(skip_all, fields(package = %ctx.package))]
pub fn mark_deletions(
    doc: &mut Document,
    ctx: &MergeContext<'_>,
) -> Result<MergeReport, ReingestError> {
    let mut report = MergeReport::default();
    let events = ctx
        .store
        .events(&EventQuery::package_events(ctx.package, "deletion"))?;
    for event in &events {
        let Some(entry) = doc.resolve(&IdentityKey::content(event.content_id)) else {
            report.anomaly(Anomaly::UnresolvedDeletion {
                content_id: event.content_id,
            });
            continue;
        };
        if doc.tombstone(entry) {
            info!(content_id = %event.content_id, "file marked deleted");
            report.tombstoned += 1;
        }
        if doc.entry(entry).primary_administrative().is_some() {
            append_event(doc, entry, event, ctx.now, &mut report)?;
        }
    }
    if !events.is_empty() {
        info!(%report, "deletions marked");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::{TimeZone, Utc};
    use reingest_store::{EventRecord, FileRecord, MemoryStore};
    use uuid::Uuid;

    use super::*;
    use crate::config::ReingestConfig;
    use crate::model::{
        DocumentEntry, IdKind, MetadataSection, SubsectionKind, UseCategory,
    };

    fn deletion(content_id: Uuid) -> EventRecord {
        EventRecord {
            event_id: Uuid::new_v4(),
            content_id,
            event_type: "deletion".to_owned(),
            datetime: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            detail: None,
            outcome: None,
            outcome_detail: None,
            agents: Vec::new(),
        }
    }

    fn file(package: Uuid, content_id: Uuid) -> FileRecord {
        FileRecord {
            content_id,
            package,
            original_location: "%SIPDirectory%objects/a.txt".to_owned(),
            current_location: "%SIPDirectory%objects/a.txt".to_owned(),
            use_category: "original".to_owned(),
            checksum: None,
            checksum_type: None,
            size: None,
        }
    }

    fn run(doc: &mut Document, store: &MemoryStore, package: Uuid) -> MergeReport {
        let config = ReingestConfig::default();
        let ctx = MergeContext {
            store,
            package,
            package_root: Path::new("."),
            now: Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
            config: &config,
        };
        mark_deletions(doc, &ctx).unwrap()
    }

    #[test]
    fn tombstone_keeps_history_and_stays_addressable() {
        let (package, content) = (Uuid::new_v4(), Uuid::new_v4());
        let mut doc = Document::empty();
        let amd = doc.mint_id(IdKind::AmdSec);
        let entry = doc.add_entry(
            None,
            DocumentEntry::item("a.txt", content, "objects/a.txt", UseCategory::Original)
                .with_administrative(MetadataSection::administrative(amd)),
        );
        let store = MemoryStore::new()
            .with_file(file(package, content))
            .with_event(deletion(content));

        let report = run(&mut doc, &store, package);
        assert_eq!((report.tombstoned, report.appended), (1, 1));
        let e = doc.entry(entry);
        assert!(e.is_tombstone());
        assert_eq!((e.label.as_deref(), e.path.as_deref()), (None, None));
        assert_eq!(doc.resolve(&IdentityKey::content(content)), Some(entry));
        assert_eq!(doc.resolve(&IdentityKey::location("objects/a.txt")), None);

        // Re-running neither re-tombstones nor duplicates the event.
        assert!(run(&mut doc, &store, package).is_noop());
        let section = doc.entry(entry).primary_administrative().unwrap();
        assert_eq!(section.of_kind(SubsectionKind::Event).count(), 1);
    }

    #[test]
    fn unknown_content_is_reported() {
        let (package, content) = (Uuid::new_v4(), Uuid::new_v4());
        let mut doc = Document::empty();
        let store = MemoryStore::new()
            .with_file(file(package, content))
            .with_event(deletion(content));
        let report = run(&mut doc, &store, package);
        assert_eq!(
            report.anomalies,
            vec![Anomaly::UnresolvedDeletion { content_id: content }]
        );
    }
}
