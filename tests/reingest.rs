//! End-to-end reconciliation runs against a stored package.

mod common;

use std::collections::{HashMap, HashSet};

use common::*;
use reingest::merge::Anomaly;
use reingest::model::{Document, Status, SubsectionKind, UseCategory};
use reingest::payload;
use reingest_store::{MemoryStore, MetadataStatus, RightsBasis};

fn base_store() -> MemoryStore {
    let [a, b] = original_files();
    MemoryStore::new().with_file(a).with_file(b)
}

/// Every subsection ID with its forward pointer, across the whole document.
fn pointers(doc: &Document) -> HashMap<String, Option<String>> {
    let mut out = HashMap::new();
    for id in doc.pre_order() {
        let entry = doc.entry(id);
        let sections = std::iter::once(&entry.descriptive).chain(&entry.administrative);
        for section in sections {
            for sub in section.subsections() {
                out.insert(sub.id.clone(), sub.superseded_by().map(str::to_owned));
            }
        }
    }
    out
}

#[test]
fn second_run_without_new_records_is_byte_identical() {
    let dir = package_dir();
    let mut store = base_store()
        .with_dublin_core(dublin_core(1, MetadataStatus::Updated, "Minutes"))
        .with_rights(rights(1, MetadataStatus::Original, RightsBasis::License, "CC-BY"))
        .with_agent(software_agent(1))
        .with_event(event(FILE_A, "reingestion", 1));

    let (first, report) = run_and_store(dir.path(), &store, at(1));
    assert!(!report.total().is_noop());

    store.mark_dublin_core(MetadataStatus::Reingest);
    let (second, report) = run_and_store(dir.path(), &store, at(2));
    assert!(report.total().is_noop(), "{report}");
    assert_eq!(first, second);
    let text = String::from_utf8(second).unwrap();
    assert!(text.contains(r#"LASTMODDATE="2024-06-01T09:00:00""#));
    assert!(text.contains("<!-- stored by the ingest pipeline -->"));
}

#[test]
fn untouched_package_round_trips_without_stamp() {
    let dir = package_dir();
    let (bytes, report) = run_and_store(dir.path(), &base_store(), at(1));
    assert!(report.total().is_noop());
    let text = String::from_utf8(bytes).unwrap();
    assert!(!text.contains("LASTMODDATE"));
}

#[test]
fn supersession_is_monotonic_across_runs() {
    let dir = package_dir();
    let store = base_store()
        .with_dublin_core(dublin_core(1, MetadataStatus::Updated, "One"))
        .with_rights(rights(1, MetadataStatus::Updated, RightsBasis::Copyright, "v1"));
    let (bytes, _) = run_and_store(dir.path(), &store, at(1));
    let before = pointers(&reparse(&bytes));

    let store = base_store()
        .with_dublin_core(dublin_core(2, MetadataStatus::Updated, "Two"))
        .with_rights(rights(2, MetadataStatus::Updated, RightsBasis::Copyright, "v2"));
    let (bytes, _) = run_and_store(dir.path(), &store, at(2));
    let after = pointers(&reparse(&bytes));

    assert!(after.len() > before.len());
    for (id, pointer) in &before {
        let now = after.get(id).unwrap_or_else(|| panic!("{id} disappeared"));
        if pointer.is_some() {
            assert_eq!(now, pointer, "pointer of {id} was reassigned");
        }
    }
}

#[test]
fn agents_stay_unique_over_many_runs() {
    let dir = package_dir();
    let mut store = base_store().with_agent(software_agent(1));
    for n in 1..=3 {
        store = store.with_event(event(FILE_A, "reingestion", n));
        run_and_store(dir.path(), &store, at(n));
    }
    let doc = reparse(&std::fs::read(
        reingest::ReingestConfig::default().input_path(dir.path(), PACKAGE),
    )
    .unwrap());
    let section = doc
        .entry(entry_for(&doc, FILE_A))
        .primary_administrative()
        .unwrap();
    assert_eq!(section.of_kind(SubsectionKind::Event).count(), 3);
    let agents: Vec<String> = section
        .of_kind(SubsectionKind::Agent)
        .filter_map(payload::agent_identifier)
        .collect();
    let distinct: HashSet<&String> = agents.iter().collect();
    assert_eq!(agents.len(), 1);
    assert_eq!(distinct.len(), agents.len());
}

#[test]
fn deleted_file_keeps_history() {
    let dir = package_dir();
    let before = reparse(prior_mets().as_bytes());
    let history = before
        .entry(entry_for(&before, FILE_B))
        .primary_administrative()
        .unwrap()
        .len();

    let store = base_store().with_event(event(FILE_B, "deletion", 1));
    let (bytes, report) = run_and_store(dir.path(), &store, at(1));
    assert_eq!(report.deletions.tombstoned, 1);

    let doc = reparse(&bytes);
    let entry = doc.entry(entry_for(&doc, FILE_B));
    assert!(entry.is_tombstone());
    assert_eq!(entry.label, None);
    assert_eq!(entry.path, None);
    assert_eq!(entry.use_category, Some(UseCategory::Deleted));
    // The techMD survives; the deletion event is added.
    assert_eq!(entry.primary_administrative().unwrap().len(), history + 1);
    let text = String::from_utf8(bytes).unwrap();
    assert!(!text.contains("objects/docs/b.txt\""));
}

#[test]
fn copyright_update_supersedes_original_statement() {
    let dir = package_dir();
    let store = base_store().with_rights(rights(
        1,
        MetadataStatus::Updated,
        RightsBasis::Copyright,
        "renewed",
    ));
    let (bytes, _) = run_and_store(dir.path(), &store, at(1));
    let doc = reparse(&bytes);
    let section = doc
        .entry(entry_for(&doc, FILE_A))
        .primary_administrative()
        .unwrap();
    let rights: Vec<_> = section.of_kind(SubsectionKind::Rights).collect();
    assert_eq!(rights.len(), 2);
    assert_eq!(rights[0].id, "rightsMD_1");
    assert_eq!(rights[0].superseded_by(), Some(rights[1].id.as_str()));
    assert_eq!(rights[0].status, Some(Status::Superseded));
    assert_eq!(section.subsections().last().map(|s| s.id.as_str()), Some(rights[1].id.as_str()));

    // b.txt had no prior Copyright statement, so its new one stands alone.
    let b = doc.entry(entry_for(&doc, FILE_B)).primary_administrative().unwrap();
    let b_rights: Vec<_> = b.of_kind(SubsectionKind::Rights).collect();
    assert_eq!(b_rights.len(), 1);
    assert!(b_rights[0].is_active());
}

#[test]
fn two_descriptive_updates_leave_a_two_step_chain() {
    let dir = package_dir();
    let mut store = base_store().with_dublin_core(dublin_core(1, MetadataStatus::Updated, "First"));
    run_and_store(dir.path(), &store, at(1));
    store.dublin_core_mut()[0] = dublin_core(1, MetadataStatus::Updated, "Second");
    run_and_store(dir.path(), &store, at(2));

    store.mark_dublin_core(MetadataStatus::Reingest);
    let (bytes, report) = run_and_store(dir.path(), &store, at(3));
    assert!(report.descriptive.is_noop());

    let doc = reparse(&bytes);
    let objects = doc.find_directory("objects").unwrap();
    let history = doc.entry(objects).descriptive.subsections();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].superseded_by(), Some(history[1].id.as_str()));
    assert!(history[1].is_active());
}

#[test]
fn side_metadata_row_creates_entry_for_unknown_file() {
    let dir = package_dir();
    let file1 = uuid::Uuid::from_u128(0x7777_7777_7777_4777_8777_7777_7777_7777);
    let table = uuid::Uuid::from_u128(0x2222_2222_2222_4222_8222_2222_2222_2222);
    write_file(
        dir.path(),
        "objects/metadata/metadata.csv",
        "filename,dc.title\ndata/file1.txt,Field notes\n",
    );
    let store = base_store()
        .with_file(file_record(table, "objects/metadata/metadata.csv", "metadata"))
        .with_file(file_record(file1, "objects/data/file1.txt", "original"));

    let (bytes, report) = run_and_store(dir.path(), &store, at(1));
    assert!(report.structure.anomalies.is_empty(), "{report}");

    let doc = reparse(&bytes);
    let entry = doc.entry(entry_for(&doc, file1));
    assert_eq!(entry.path.as_deref(), Some("objects/data/file1.txt"));
    assert_eq!(entry.descriptive.len(), 1);
    let table_entry = doc.entry(entry_for(&doc, table));
    assert_eq!(table_entry.use_category, Some(UseCategory::Metadata));
    let metadata = doc.find_directory("metadata").unwrap();
    assert_eq!(table_entry.parent(), Some(metadata));
}

#[test]
fn new_metadata_files_attach_once() {
    let dir = package_dir();
    let report_file = uuid::Uuid::from_u128(0x8888_8888_8888_4888_8888_8888_8888_8888);
    write_file(dir.path(), "objects/metadata/transfers/t1/report.xml", "<r/>");
    let store = base_store()
        .with_file(file_record(
            report_file,
            "objects/metadata/transfers/t1/report.xml",
            "metadata",
        ))
        .with_event(event(report_file, "ingestion", 1));

    let (bytes, report) = run_and_store(dir.path(), &store, at(1));
    assert_eq!(report.structure.entries_added, 3);
    let doc = reparse(&bytes);
    let item = entry_for(&doc, report_file);
    let t1 = doc.entry(item).parent().unwrap();
    let transfers = doc.entry(t1).parent().unwrap();
    assert_eq!(doc.entry(t1).label.as_deref(), Some("t1"));
    assert_eq!(doc.entry(transfers).label.as_deref(), Some("transfers"));
    assert_eq!(doc.entry(transfers).parent(), doc.find_directory("metadata"));
    let section = doc.entry(item).primary_administrative().unwrap();
    assert_eq!(section.of_kind(SubsectionKind::Technical).count(), 1);
    assert_eq!(section.of_kind(SubsectionKind::Event).count(), 1);

    let (again, report) = run_and_store(dir.path(), &store, at(2));
    assert!(report.structure.is_noop());
    assert_eq!(again, bytes);
    let doc = reparse(&again);
    let metadata = doc.find_directory("metadata").unwrap();
    assert_eq!(doc.entry(metadata).children().len(), 1);
}

#[test]
fn unknown_event_targets_are_reported_not_fatal() {
    let dir = package_dir();
    let stranger = uuid::Uuid::from_u128(0x9999_9999_9999_4999_8999_9999_9999_9999);
    let store = base_store()
        .with_file(file_record(stranger, "objects/gone.txt", "original"))
        .with_event(event(stranger, "reingestion", 1));
    let (_, report) = run_and_store(dir.path(), &store, at(1));
    assert!(matches!(
        report.events.anomalies.as_slice(),
        [Anomaly::UnresolvedEvent { content_id, .. }] if *content_id == stranger
    ));
}
