//! Shared fixtures for mets-reingest integration tests.
//!
//! Every test builds its package in a temp directory: the prior METS document
//! under `objects/submissionDocumentation/`, plus whatever metadata files the
//! test needs. Record stores are in-memory unless the test says otherwise.

#![allow(dead_code)]

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use reingest::config::ReingestConfig;
use reingest::model::{Document, IdentityKey};
use reingest::{RunReport, run};
use reingest_store::{
    AgentRecord, DublinCoreFields, DublinCoreRecord, EventRecord, FileRecord, MetadataStatus,
    RecordStore, RightsBasis, RightsDetail, RightsRecord, Scope,
};
use tempfile::TempDir;
use uuid::Uuid;

pub const PACKAGE: Uuid = Uuid::from_u128(0x6a1f_2c8e_3a4b_4c5d_8e9f_0a1b_2c3d_4e5f);
pub const FILE_A: Uuid = Uuid::from_u128(0x1111_1111_1111_4111_8111_1111_1111_1111);
pub const FILE_B: Uuid = Uuid::from_u128(0x5555_5555_5555_4555_8555_5555_5555_5555);

/// A stored package: `objects/` with `a.txt` (one Copyright rights statement
/// created at 2015-01-01), `docs/b.txt`, and an empty `metadata/` directory.
pub fn prior_mets() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- stored by the ingest pipeline -->
<mets:mets xmlns:mets="http://www.loc.gov/METS/" xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:premis="info:lc/xmlns/premis-v2" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <mets:metsHdr CREATEDATE="2015-01-01T00:00:00"/>
  <mets:amdSec ID="amdSec_1">
    <mets:techMD ID="techMD_1">
      <mets:mdWrap MDTYPE="PREMIS:OBJECT"><mets:xmlData><premis:object><premis:originalName>%transferDirectory%objects/a.txt</premis:originalName></premis:object></mets:xmlData></mets:mdWrap>
    </mets:techMD>
    <mets:rightsMD ID="rightsMD_1" CREATED="2015-01-01T00:00:00" STATUS="current">
      <mets:mdWrap MDTYPE="PREMIS:RIGHTS"><mets:xmlData><premis:rightsStatement><premis:rightsBasis>Copyright</premis:rightsBasis></premis:rightsStatement></mets:xmlData></mets:mdWrap>
    </mets:rightsMD>
  </mets:amdSec>
  <mets:amdSec ID="amdSec_2">
    <mets:techMD ID="techMD_2">
      <mets:mdWrap MDTYPE="PREMIS:OBJECT"><mets:xmlData><premis:object><premis:originalName>%transferDirectory%objects/docs/b.txt</premis:originalName></premis:object></mets:xmlData></mets:mdWrap>
    </mets:techMD>
  </mets:amdSec>
  <mets:fileSec>
    <mets:fileGrp USE="original">
      <mets:file ID="file-{a}" GROUPID="Group-{a}" ADMID="amdSec_1">
        <mets:FLocat xlink:href="objects/a.txt" LOCTYPE="OTHER" OTHERLOCTYPE="SYSTEM"/>
      </mets:file>
      <mets:file ID="file-{b}" GROUPID="Group-{b}" ADMID="amdSec_2">
        <mets:FLocat xlink:href="objects/docs/b.txt" LOCTYPE="OTHER" OTHERLOCTYPE="SYSTEM"/>
      </mets:file>
    </mets:fileGrp>
  </mets:fileSec>
  <mets:structMap TYPE="physical" ID="structMap_1">
    <mets:div TYPE="Directory" LABEL="pkg-{p}">
      <mets:div TYPE="Directory" LABEL="objects">
        <mets:div TYPE="Item" LABEL="a.txt">
          <mets:fptr FILEID="file-{a}"/>
        </mets:div>
        <mets:div TYPE="Directory" LABEL="docs">
          <mets:div TYPE="Item" LABEL="b.txt">
            <mets:fptr FILEID="file-{b}"/>
          </mets:div>
        </mets:div>
        <mets:div TYPE="Directory" LABEL="metadata"/>
      </mets:div>
    </mets:div>
  </mets:structMap>
</mets:mets>
"#,
        a = FILE_A,
        b = FILE_B,
        p = PACKAGE,
    )
}

/// A temp package directory holding [`prior_mets`] at the configured input
/// path.
pub fn package_dir() -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    store_document(dir.path(), prior_mets().as_bytes());
    dir
}

/// Replace the package's stored METS document, as the storage step does
/// after a successful run.
pub fn store_document(root: &Path, bytes: &[u8]) {
    let path = ReingestConfig::default().input_path(root, PACKAGE);
    std::fs::create_dir_all(path.parent().expect("input path has a parent"))
        .expect("failed to create submissionDocumentation");
    std::fs::write(path, bytes).expect("failed to write METS");
}

/// Write a file into the package.
pub fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().expect("relative path has a parent"))
        .expect("failed to create directories");
    std::fs::write(path, contents).expect("failed to write file");
}

/// The run timestamp for the `n`th run.
pub fn at(n: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, n, 9, 0, 0).unwrap()
}

/// Run once and store the result as the package's new prior document.
pub fn run_and_store(root: &Path, store: &dyn RecordStore, now: DateTime<Utc>) -> (Vec<u8>, RunReport) {
    let (bytes, report) =
        run(store, root, PACKAGE, &ReingestConfig::default(), now).expect("run failed");
    store_document(root, &bytes);
    (bytes, report)
}

/// Parse serialized output back into the model.
pub fn reparse(bytes: &[u8]) -> Document {
    reingest::mets::parse_mets(std::str::from_utf8(bytes).expect("output is UTF-8"))
        .expect("output parses")
}

pub fn entry_for(doc: &Document, content_id: Uuid) -> reingest::model::EntryId {
    doc.resolve(&IdentityKey::content(content_id))
        .expect("entry present")
}

// ---------------------------------------------------------------------------
// Store records
// ---------------------------------------------------------------------------

pub fn file_record(content_id: Uuid, location: &str, use_category: &str) -> FileRecord {
    FileRecord {
        content_id,
        package: PACKAGE,
        original_location: format!("%SIPDirectory%{location}"),
        current_location: format!("%SIPDirectory%{location}"),
        use_category: use_category.to_owned(),
        checksum: Some("e3b0c44298fc1c149afbf4c8996fb924".to_owned()),
        checksum_type: Some("md5".to_owned()),
        size: Some(128),
    }
}

/// The two original files of [`prior_mets`].
pub fn original_files() -> [FileRecord; 2] {
    let mut a = file_record(FILE_A, "objects/a.txt", "original");
    a.original_location = "%transferDirectory%objects/a.txt".to_owned();
    let mut b = file_record(FILE_B, "objects/docs/b.txt", "original");
    b.original_location = "%transferDirectory%objects/docs/b.txt".to_owned();
    [a, b]
}

pub fn dublin_core(id: i64, status: MetadataStatus, title: &str) -> DublinCoreRecord {
    DublinCoreRecord {
        id,
        scope: Scope::package(PACKAGE),
        status,
        fields: DublinCoreFields {
            title: Some(title.to_owned()),
            ..DublinCoreFields::default()
        },
    }
}

pub fn rights(id: i64, status: MetadataStatus, basis: RightsBasis, note: &str) -> RightsRecord {
    RightsRecord {
        id,
        scope: Scope::package(PACKAGE),
        status,
        basis,
        identifier_type: "UUID".to_owned(),
        identifier_value: format!("rights-{id}"),
        detail: RightsDetail {
            note: Some(note.to_owned()),
            ..RightsDetail::default()
        },
        granted: Vec::new(),
    }
}

pub fn event(content_id: Uuid, event_type: &str, n: u32) -> EventRecord {
    EventRecord {
        event_id: Uuid::from_u128(0xeeee_0000_0000_4000_8000_0000_0000_0000 + u128::from(n)),
        content_id,
        event_type: event_type.to_owned(),
        datetime: at(n),
        detail: Some(format!("{event_type} #{n}")),
        outcome: Some("success".to_owned()),
        outcome_detail: None,
        agents: Vec::new(),
    }
}

/// The canonical software agent under the default configuration.
pub fn software_agent(id: i64) -> AgentRecord {
    AgentRecord {
        id,
        identifier_type: "preservation system".to_owned(),
        identifier_value: format!("Archivematica-1.{id}"),
        name: "Archivematica".to_owned(),
        agent_type: "software".to_owned(),
    }
}
