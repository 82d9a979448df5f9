//! New metadata files and the side-metadata table.
//!
//! Files that appeared under `objects/metadata` since the document was written
//! get an item entry (with intermediate directories) and an amdSec built from
//! their store record. When the side-metadata table itself is new, its rows
//! become descriptive subsections on the files they name.

use std::path::{Path, PathBuf};

use reingest_store::{AgentRecord, EventQuery, FileQuery, FileRecord, LocationMatch};
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use super::{Anomaly, MergeContext, MergeReport, append_descriptive, digiprov};
use crate::error::ReingestError;
use crate::mets::timestamp;
use crate::model::{
    Document, DocumentEntry, EntryId, IdKind, IdentityKey, MdSecType, MetadataSection, Status,
    Subsection, UseCategory, normalize_location,
};
use crate::payload;
use crate::side_metadata::SideMetadata;

const METADATA_ROOT: &str = "objects/metadata/";
const OBJECTS_ROOT: &str = "objects/";
const SIDE_METADATA_TABLE: &str = "objects/metadata/metadata.csv";

/// Attach metadata files that exist on disk but not in the document, then
/// apply the side-metadata table if it is one of them.
///
/// # Errors
/// I/O failures walking the package, store failures, a malformed
/// side-metadata table, or [`ReingestError::MissingAnchor`] when new files
/// exist but the document has no `metadata` directory.
#[instrument(skip_all, fields(package = %ctx.package))]
pub fn extend_structure(
    doc: &mut Document,
    ctx: &MergeContext<'_>,
) -> Result<MergeReport, ReingestError> {
    let mut report = MergeReport::default();
    let mut new_files = Vec::new();
    for relative in metadata_files(ctx.package_root)? {
        // Only the current path counts: a file moved out of the way by an
        // earlier transfer keeps this path as its original location.
        if doc.resolve_current(&relative).is_some() {
            debug!(%relative, "already in document");
            continue;
        }
        let location = format!("{}{relative}", ctx.config.package.placeholder);
        let query = FileQuery::in_package(ctx.package)
            .with_use("metadata")
            .with_location(LocationMatch::CurrentIs(location.clone()));
        match ctx.store.files(&query)?.into_iter().next() {
            Some(file) => new_files.push(file),
            None => report.anomaly(Anomaly::UnrecordedFile { location }),
        }
    }
    if new_files.is_empty() {
        info!("no new metadata files");
        return Ok(report);
    }

    let anchor = metadata_directory(doc)?;
    let mut table = None;
    for file in &new_files {
        attach_file(doc, anchor, METADATA_ROOT, file, ctx, &mut report)?;
        if normalize_location(&file.current_location) == SIDE_METADATA_TABLE {
            table = Some(file);
        }
    }
    if let Some(file) = table {
        apply_side_metadata(doc, file, ctx, &mut report)?;
    }
    info!(files = new_files.len(), %report, "structure extended");
    Ok(report)
}

/// Package-relative paths of every file under `objects/metadata`, sorted.
fn metadata_files(package_root: &Path) -> Result<Vec<String>, ReingestError> {
    let dir = package_root.join("objects").join("metadata");
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in WalkDir::new(&dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map_or_else(|| dir.clone(), Path::to_path_buf);
            ReingestError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(package_root) else {
            continue;
        };
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        out.push(parts.join("/"));
    }
    Ok(out)
}

fn metadata_directory(doc: &Document) -> Result<EntryId, ReingestError> {
    doc.find_directory("objects")
        .and_then(|objects| doc.child_directory(objects, "metadata"))
        .or_else(|| doc.find_directory("metadata"))
        .ok_or_else(|| ReingestError::MissingAnchor {
            label: "metadata".to_owned(),
        })
}

// ---------------------------------------------------------------------------
// New file entries
// ---------------------------------------------------------------------------

/// Create an item entry for `file` below `anchor`, creating the directories
/// between them. `prefix` is the anchor's own package-relative path.
fn attach_file(
    doc: &mut Document,
    anchor: EntryId,
    prefix: &str,
    file: &FileRecord,
    ctx: &MergeContext<'_>,
    report: &mut MergeReport,
) -> Result<EntryId, ReingestError> {
    let path = normalize_location(&file.current_location);
    let relative = path.strip_prefix(prefix).unwrap_or(&path);
    let (dirs, name) = relative.rsplit_once('/').unwrap_or(("", relative));

    let mut parent = anchor;
    for dir in dirs.split('/').filter(|d| !d.is_empty()) {
        let (id, created) = doc.ensure_child_directory(parent, dir);
        if created {
            debug!(directory = dir, "created directory entry");
            report.entries_added += 1;
        }
        parent = id;
    }

    let section = new_file_section(doc, file, ctx, report)?;
    let mut entry = DocumentEntry::item(
        name,
        file.content_id,
        path.clone(),
        UseCategory::parse(&file.use_category),
    )
    .with_administrative(section);
    entry.original_location = Some(file.original_location.clone());
    entry.file_xml.locator_attributes = vec![
        ("LOCTYPE".to_owned(), "OTHER".to_owned()),
        ("OTHERLOCTYPE".to_owned(), "SYSTEM".to_owned()),
    ];
    let id = doc.add_entry(Some(parent), entry);
    report.entries_added += 1;
    info!(%path, content_id = %file.content_id, "added file entry");
    Ok(id)
}

/// An amdSec for a file entering the document: one techMD describing the
/// file, one event per recorded file event and each linked agent once.
fn new_file_section(
    doc: &mut Document,
    file: &FileRecord,
    ctx: &MergeContext<'_>,
    report: &mut MergeReport,
) -> Result<MetadataSection, ReingestError> {
    let mut section = MetadataSection::administrative(doc.mint_id(IdKind::AmdSec));
    let object = payload::file_object(doc.names(), file);
    section.append(Subsection::new(
        MdSecType::Tech,
        doc.mint_id(IdKind::TechMd),
        Some(timestamp(ctx.now)),
        Some(Status::Current),
        object,
    ));

    let events = ctx.store.events(&EventQuery::file_events(file.content_id))?;
    let mut agents: Vec<&AgentRecord> = Vec::new();
    for event in &events {
        let payload = payload::event(doc.names(), event);
        section.append(digiprov(doc, payload, ctx.now));
        for agent in &event.agents {
            if !agents
                .iter()
                .any(|a| a.identifier_value == agent.identifier_value)
            {
                agents.push(agent);
            }
        }
    }
    for agent in agents {
        let payload = payload::agent(doc.names(), agent);
        section.append(digiprov(doc, payload, ctx.now));
    }
    report.appended += section.len();
    Ok(section)
}

// ---------------------------------------------------------------------------
// Side-metadata rows
// ---------------------------------------------------------------------------

fn apply_side_metadata(
    doc: &mut Document,
    table_file: &FileRecord,
    ctx: &MergeContext<'_>,
    report: &mut MergeReport,
) -> Result<(), ReingestError> {
    let disk_path: PathBuf = ctx
        .package_root
        .join(normalize_location(&table_file.current_location));
    let table = SideMetadata::from_path(&disk_path)?;
    info!(rows = table.rows().len(), "applying side metadata");

    let objects = doc
        .find_directory("objects")
        .ok_or_else(|| ReingestError::MissingAnchor {
            label: "objects".to_owned(),
        })?;
    let metadata = metadata_directory(doc)?;

    for row in table.rows() {
        let Some(file) = row_file(ctx, &row.path)? else {
            report.anomaly(Anomaly::UnresolvedRow {
                path: row.path.clone(),
            });
            continue;
        };
        if UseCategory::parse(&file.use_category) == UseCategory::Metadata {
            report.anomaly(Anomaly::MetadataRow {
                path: row.path.clone(),
            });
            continue;
        }
        let entry = match doc.resolve(&IdentityKey::content(file.content_id)) {
            Some(entry) if doc.is_within(entry, metadata) => {
                report.anomaly(Anomaly::MetadataRow {
                    path: row.path.clone(),
                });
                continue;
            }
            Some(entry) => entry,
            None => attach_file(doc, objects, OBJECTS_ROOT, &file, ctx, report)?,
        };
        for payload in payload::side_metadata(doc.names(), &row.fields) {
            append_descriptive(doc, entry, payload, ctx.now, report)?;
        }
    }
    Ok(())
}

/// The store record a row names. Rows carry a path relative to the package
/// or to `objects`, so both placeholder-anchored and directory-anchored
/// suffixes are tried, original location first.
fn row_file(ctx: &MergeContext<'_>, path: &str) -> Result<Option<FileRecord>, ReingestError> {
    let lookups = [
        LocationMatch::OriginalEndsWith(format!("%{path}")),
        LocationMatch::CurrentEndsWith(format!("%{path}")),
        LocationMatch::OriginalEndsWith(format!("/{path}")),
        LocationMatch::CurrentEndsWith(format!("/{path}")),
    ];
    for location in lookups {
        let query = FileQuery::in_package(ctx.package).with_location(location);
        let mut found = ctx.store.files(&query)?;
        if found.is_empty() {
            continue;
        }
        let pick = found
            .iter()
            .position(|f| UseCategory::parse(&f.use_category) != UseCategory::Metadata)
            .unwrap_or(0);
        return Ok(Some(found.swap_remove(pick)));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::{TimeZone, Utc};
    use reingest_store::{EventRecord, MemoryStore};
    use uuid::Uuid;

    use super::*;
    use crate::config::ReingestConfig;
    use crate::model::SubsectionKind;

    fn record(package: Uuid, location: &str, use_category: &str) -> FileRecord {
        FileRecord {
            content_id: Uuid::new_v4(),
            package,
            original_location: format!("%SIPDirectory%{location}"),
            current_location: format!("%SIPDirectory%{location}"),
            use_category: use_category.to_owned(),
            checksum: Some("abc123".to_owned()),
            checksum_type: Some("sha256".to_owned()),
            size: Some(42),
        }
    }

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// `objects/` holding `a.txt` and an empty `metadata/` directory.
    fn base_doc(a: &FileRecord) -> Document {
        let mut doc = Document::empty();
        let objects = doc.add_entry(None, DocumentEntry::directory("objects"));
        doc.add_entry(Some(objects), DocumentEntry::directory("metadata"));
        let amd = doc.mint_id(IdKind::AmdSec);
        let mut item = DocumentEntry::item("a.txt", a.content_id, "objects/a.txt", UseCategory::Original)
            .with_administrative(MetadataSection::administrative(amd));
        item.original_location = Some(a.original_location.clone());
        doc.add_entry(Some(objects), item);
        doc
    }

    fn run(doc: &mut Document, store: &MemoryStore, package: Uuid, root: &Path) -> MergeReport {
        let config = ReingestConfig::default();
        let ctx = MergeContext {
            store,
            package,
            package_root: root,
            now: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            config: &config,
        };
        extend_structure(doc, &ctx).unwrap()
    }

    #[test]
    fn attaches_nested_files_and_applies_table() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let package = Uuid::new_v4();
        write(
            root,
            "objects/metadata/metadata.csv",
            "filename,dc.title,Note\nobjects/a.txt,Alpha,first\ndata/file1.txt,One,\nghost.txt,Boo,\n",
        );
        write(root, "objects/metadata/reports/2024/notes.txt", "n");

        let a = record(package, "objects/a.txt", "original");
        let table = record(package, "objects/metadata/metadata.csv", "metadata");
        let notes = record(package, "objects/metadata/reports/2024/notes.txt", "metadata");
        let file1 = record(package, "objects/data/file1.txt", "original");
        let ingest = EventRecord {
            event_id: Uuid::new_v4(),
            content_id: notes.content_id,
            event_type: "ingestion".to_owned(),
            datetime: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            detail: None,
            outcome: None,
            outcome_detail: None,
            agents: Vec::new(),
        };
        let store = MemoryStore::new()
            .with_file(a.clone())
            .with_file(table)
            .with_file(notes.clone())
            .with_file(file1.clone())
            .with_event(ingest);

        let mut doc = base_doc(&a);
        let report = run(&mut doc, &store, package, root);
        assert!(matches!(
            report.anomalies.as_slice(),
            [Anomaly::UnresolvedRow { path }] if path == "ghost.txt"
        ));

        let notes_entry = doc.resolve(&IdentityKey::content(notes.content_id)).unwrap();
        let year = doc.entry(notes_entry).parent().unwrap();
        let reports = doc.entry(year).parent().unwrap();
        assert_eq!(doc.entry(year).label.as_deref(), Some("2024"));
        assert_eq!(doc.entry(reports).label.as_deref(), Some("reports"));
        let section = doc.entry(notes_entry).primary_administrative().unwrap();
        assert_eq!(section.of_kind(SubsectionKind::Technical).count(), 1);
        assert_eq!(section.of_kind(SubsectionKind::Event).count(), 1);

        let a_entry = doc.resolve(&IdentityKey::content(a.content_id)).unwrap();
        // DC block then CUSTOM block; the custom one is active.
        assert_eq!(doc.entry(a_entry).descriptive.len(), 2);

        let file1_entry = doc.resolve(&IdentityKey::content(file1.content_id)).unwrap();
        let entry = doc.entry(file1_entry);
        assert_eq!(entry.path.as_deref(), Some("objects/data/file1.txt"));
        assert_eq!(entry.descriptive.len(), 1);
        let data = entry.parent().unwrap();
        assert_eq!(doc.entry(data).label.as_deref(), Some("data"));

        // Second run with the same inputs adds nothing.
        let before = doc.len();
        let report = run(&mut doc, &store, package, root);
        assert!(report.is_noop());
        assert_eq!(doc.len(), before);
    }

    #[test]
    fn existing_directories_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let package = Uuid::new_v4();
        write(root, "objects/metadata/sub/one.txt", "1");
        write(root, "objects/metadata/sub/two.txt", "2");
        let a = record(package, "objects/a.txt", "original");
        let store = MemoryStore::new()
            .with_file(record(package, "objects/metadata/sub/one.txt", "metadata"))
            .with_file(record(package, "objects/metadata/sub/two.txt", "metadata"));

        let mut doc = base_doc(&a);
        let report = run(&mut doc, &store, package, root);
        // One directory plus two items.
        assert_eq!(report.entries_added, 3);
        let metadata = metadata_directory(&doc).unwrap();
        let sub = doc.child_directory(metadata, "sub").unwrap();
        assert_eq!(doc.entry(sub).children().len(), 2);
    }

    #[test]
    fn unrecorded_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let package = Uuid::new_v4();
        write(root, "objects/metadata/stray.txt", "?");
        let a = record(package, "objects/a.txt", "original");
        let mut doc = base_doc(&a);
        let report = run(&mut doc, &MemoryStore::new(), package, root);
        assert!(report.is_noop());
        assert!(matches!(
            report.anomalies.as_slice(),
            [Anomaly::UnrecordedFile { location }]
                if location == "%SIPDirectory%objects/metadata/stray.txt"
        ));
    }

    #[test]
    fn missing_metadata_directory_is_fatal_only_with_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let package = Uuid::new_v4();
        let mut doc = Document::empty();
        doc.add_entry(None, DocumentEntry::directory("objects"));
        let config = ReingestConfig::default();
        let store = MemoryStore::new()
            .with_file(record(package, "objects/metadata/x.txt", "metadata"));
        let ctx = MergeContext {
            store: &store,
            package,
            package_root: root,
            now: Utc::now(),
            config: &config,
        };
        assert!(extend_structure(&mut doc, &ctx).unwrap().is_noop());

        write(root, "objects/metadata/x.txt", "x");
        assert!(matches!(
            extend_structure(&mut doc, &ctx),
            Err(ReingestError::MissingAnchor { .. })
        ));
    }

    #[test]
    fn table_moved_by_earlier_transfer_does_not_hide_new_table() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let package = Uuid::new_v4();
        write(
            root,
            "objects/metadata/transfers/t1/metadata.csv",
            "filename,dc.title\nobjects/a.txt,Old\n",
        );
        write(
            root,
            "objects/metadata/metadata.csv",
            "filename,dc.title\nobjects/a.txt,Alpha\n",
        );

        let a = record(package, "objects/a.txt", "original");
        let mut old_table = record(package, "objects/metadata/transfers/t1/metadata.csv", "metadata");
        old_table.original_location = "%transferDirectory%objects/metadata/metadata.csv".to_owned();
        let new_table = record(package, "objects/metadata/metadata.csv", "metadata");
        let store = MemoryStore::new()
            .with_file(a.clone())
            .with_file(old_table.clone())
            .with_file(new_table.clone());

        let mut doc = base_doc(&a);
        let metadata = metadata_directory(&doc).unwrap();
        let (transfers, _) = doc.ensure_child_directory(metadata, "transfers");
        let (t1, _) = doc.ensure_child_directory(transfers, "t1");
        let mut old_entry = DocumentEntry::item(
            "metadata.csv",
            old_table.content_id,
            "objects/metadata/transfers/t1/metadata.csv",
            UseCategory::Metadata,
        );
        old_entry.original_location = Some(old_table.original_location.clone());
        doc.add_entry(Some(t1), old_entry);

        let report = run(&mut doc, &store, package, root);
        assert!(report.anomalies.is_empty(), "{report}");
        assert_eq!(report.entries_added, 1);

        let table_entry = doc.resolve(&IdentityKey::content(new_table.content_id)).unwrap();
        assert_eq!(
            doc.entry(table_entry).path.as_deref(),
            Some("objects/metadata/metadata.csv")
        );
        assert_eq!(doc.entry(table_entry).parent(), Some(metadata));
        let a_entry = doc.resolve(&IdentityKey::content(a.content_id)).unwrap();
        assert_eq!(doc.entry(a_entry).descriptive.len(), 1);

        let report = run(&mut doc, &store, package, root);
        assert!(report.is_noop());
    }

    #[test]
    fn malformed_table_aborts_extension() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let package = Uuid::new_v4();
        write(
            root,
            "objects/metadata/metadata.csv",
            "filename,dc.title\nobjects/a.txt,Alpha,extra\n",
        );
        let a = record(package, "objects/a.txt", "original");
        let store = MemoryStore::new()
            .with_file(a.clone())
            .with_file(record(package, "objects/metadata/metadata.csv", "metadata"));
        let config = ReingestConfig::default();
        let ctx = MergeContext {
            store: &store,
            package,
            package_root: root,
            now: Utc::now(),
            config: &config,
        };

        let mut doc = base_doc(&a);
        let err = extend_structure(&mut doc, &ctx).unwrap_err();
        assert!(
            matches!(&err, ReingestError::SideMetadata { path, .. } if path.ends_with("objects/metadata/metadata.csv")),
            "{err}"
        );
    }
}
