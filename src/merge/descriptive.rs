//! Package-level descriptive metadata.

use reingest_store::{MetadataStatus, Scope};
use tracing::{info, instrument};

use super::{MergeContext, MergeReport, append_descriptive};
use crate::error::ReingestError;
use crate::model::Document;
use crate::payload;

/// Merge the package's Dublin Core record into the `objects` directory's
/// descriptive history.
///
/// - Every record `REINGEST` (and at least one record): nothing changed.
/// - Otherwise the latest non-empty `ORIGINAL`/`UPDATED` record is appended.
/// - No such record but prior history exists: an empty placeholder is
///   appended to record the withdrawal.
///
/// # Errors
/// Store failures, or [`ReingestError::MissingAnchor`] when the document has
/// no `objects` directory to attach to.
#[instrument(skip_all, fields(package = %ctx.package))]
pub fn merge_descriptive(
    doc: &mut Document,
    ctx: &MergeContext<'_>,
) -> Result<MergeReport, ReingestError> {
    let mut report = MergeReport::default();
    let records = ctx
        .store
        .descriptive_metadata(&Scope::package(ctx.package), None)?;
    if !records.is_empty()
        && records
            .iter()
            .all(|r| r.status == MetadataStatus::Reingest)
    {
        info!("descriptive metadata untouched since last reingest");
        return Ok(report);
    }

    let objects = doc
        .find_directory("objects")
        .ok_or_else(|| ReingestError::MissingAnchor {
            label: "objects".to_owned(),
        })?;
    let current = records
        .iter()
        .rev()
        .find(|r| r.status != MetadataStatus::Reingest && !r.fields.is_empty());

    let payload = match current {
        Some(record) => payload::dublin_core(doc.names(), &record.fields),
        None if doc.entry(objects).descriptive.is_empty() => {
            info!("no descriptive metadata for package");
            return Ok(report);
        }
        None => {
            info!("descriptive metadata withdrawn; recording empty placeholder");
            payload::withdrawn_dublin_core(doc.names())
        }
    };

    append_descriptive(doc, objects, payload, ctx.now, &mut report)?;
    info!(%report, "descriptive merge done");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::{TimeZone, Utc};
    use reingest_store::{DublinCoreFields, DublinCoreRecord, MemoryStore};
    use uuid::Uuid;

    use super::*;
    use crate::config::ReingestConfig;
    use crate::model::{DocumentEntry, Status, SubsectionKind};

    fn record(id: i64, package: Uuid, status: MetadataStatus, title: &str) -> DublinCoreRecord {
        DublinCoreRecord {
            id,
            scope: Scope::package(package),
            status,
            fields: DublinCoreFields {
                title: Some(title.to_owned()),
                ..DublinCoreFields::default()
            },
        }
    }

    fn run(doc: &mut Document, store: &MemoryStore, package: Uuid) -> MergeReport {
        let config = ReingestConfig::default();
        let ctx = MergeContext {
            store,
            package,
            package_root: Path::new("."),
            now: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            config: &config,
        };
        merge_descriptive(doc, &ctx).unwrap()
    }

    fn doc_with_objects() -> Document {
        let mut doc = Document::empty();
        doc.add_entry(None, DocumentEntry::directory("objects"));
        doc
    }

    #[test]
    fn appends_then_supersedes_and_settles() {
        let package = Uuid::new_v4();
        let mut doc = doc_with_objects();
        let objects = doc.find_directory("objects").unwrap();

        let store = MemoryStore::new().with_dublin_core(record(1, package, MetadataStatus::Updated, "First"));
        assert_eq!(run(&mut doc, &store, package).appended, 1);

        let store = MemoryStore::new().with_dublin_core(record(2, package, MetadataStatus::Updated, "Second"));
        let report = run(&mut doc, &store, package);
        assert_eq!((report.appended, report.superseded), (1, 1));

        let history = &doc.entry(objects).descriptive;
        assert_eq!(history.len(), 2);
        let first = &history.subsections()[0];
        assert_eq!(first.superseded_by(), Some(history.subsections()[1].id.as_str()));
        assert_eq!(first.status, Some(Status::Superseded));

        // Same record again: nothing new.
        let report = run(&mut doc, &store, package);
        assert!(report.is_noop());
        assert_eq!(doc.entry(objects).descriptive.len(), 2);
    }

    #[test]
    fn untouched_records_do_nothing() {
        let package = Uuid::new_v4();
        let mut doc = doc_with_objects();
        let store = MemoryStore::new().with_dublin_core(record(1, package, MetadataStatus::Reingest, "Kept"));
        assert!(run(&mut doc, &store, package).is_noop());
        let objects = doc.find_directory("objects").unwrap();
        assert!(doc.entry(objects).descriptive.is_empty());
    }

    #[test]
    fn withdrawal_appends_placeholder_only_with_history() {
        let package = Uuid::new_v4();
        let mut doc = doc_with_objects();
        let objects = doc.find_directory("objects").unwrap();
        let empty = MemoryStore::new();
        assert!(run(&mut doc, &empty, package).is_noop());

        let store = MemoryStore::new().with_dublin_core(record(1, package, MetadataStatus::Original, "T"));
        run(&mut doc, &store, package);

        let mut blank = record(2, package, MetadataStatus::Updated, "");
        blank.fields.title = None;
        let store = MemoryStore::new().with_dublin_core(blank);
        let report = run(&mut doc, &store, package);
        assert_eq!(report.appended, 1);
        let active = doc
            .entry(objects)
            .descriptive
            .active(SubsectionKind::Descriptive)
            .unwrap();
        let dc = active.payload.find_descendant("dublincore").unwrap();
        assert!(!dc.has_child_elements());

        // A second withdrawal is recognised as already applied.
        assert!(run(&mut doc, &store, package).is_noop());
    }

    #[test]
    fn missing_objects_directory_is_fatal() {
        let package = Uuid::new_v4();
        let mut doc = Document::empty();
        let store = MemoryStore::new().with_dublin_core(record(1, package, MetadataStatus::Updated, "T"));
        let config = ReingestConfig::default();
        let ctx = MergeContext {
            store: &store,
            package,
            package_root: Path::new("."),
            now: Utc::now(),
            config: &config,
        };
        assert!(matches!(
            merge_descriptive(&mut doc, &ctx),
            Err(ReingestError::MissingAnchor { .. })
        ));
    }
}
