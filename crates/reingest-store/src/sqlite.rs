//! SQLite-backed [`RecordStore`].
//!
//! # Schema
//!
//! | Table               | Holds                                             |
//! |---------------------|---------------------------------------------------|
//! | `dublin_core`       | Dublin Core records, one row per record            |
//! | `rights_statements` | rights statements with basis-specific columns      |
//! | `rights_granted`    | granted acts, keyed by `rights_id`                 |
//! | `files`             | package files with original/current locations      |
//! | `events`            | preservation events, keyed by `file_uuid`          |
//! | `agents`            | agents                                            |
//! | `event_agents`      | event ↔ agent links                               |
//!
//! UUIDs are stored as hyphenated text, timestamps as RFC 3339 text.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, OpenFlags, Row, params};
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::records::{
    AgentRecord, DublinCoreFields, DublinCoreRecord, EventRecord, FileRecord, MetadataStatus,
    RightsDetail, RightsGranted, RightsRecord, Scope,
};
use crate::store::{AgentQuery, EventQuery, EventScope, FileQuery, LocationMatch, RecordStore};

/// DDL for every table the store reads.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS dublin_core (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    applies_to_type TEXT NOT NULL,
    applies_to TEXT NOT NULL,
    status TEXT NOT NULL,
    title TEXT, is_part_of TEXT, creator TEXT, subject TEXT, description TEXT,
    publisher TEXT, contributor TEXT, date TEXT, type TEXT, format TEXT,
    identifier TEXT, source TEXT, relation TEXT, language TEXT, coverage TEXT,
    rights TEXT
);
CREATE TABLE IF NOT EXISTS rights_statements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    applies_to_type TEXT NOT NULL,
    applies_to TEXT NOT NULL,
    status TEXT NOT NULL,
    basis TEXT NOT NULL,
    identifier_type TEXT NOT NULL DEFAULT 'UUID',
    identifier_value TEXT NOT NULL,
    copyright_status TEXT, copyright_jurisdiction TEXT, copyright_determination_date TEXT,
    license_terms TEXT,
    statute_jurisdiction TEXT, statute_citation TEXT, statute_determination_date TEXT,
    note TEXT
);
CREATE TABLE IF NOT EXISTS rights_granted (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    rights_id INTEGER NOT NULL REFERENCES rights_statements(id),
    act TEXT NOT NULL,
    restriction TEXT,
    start_date TEXT,
    end_date TEXT,
    end_open INTEGER NOT NULL DEFAULT 0,
    note TEXT
);
CREATE TABLE IF NOT EXISTS files (
    uuid TEXT PRIMARY KEY,
    sip_uuid TEXT NOT NULL,
    original_location TEXT NOT NULL,
    current_location TEXT NOT NULL,
    file_grp_use TEXT NOT NULL,
    checksum TEXT,
    checksum_type TEXT,
    size INTEGER
);
CREATE TABLE IF NOT EXISTS agents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    identifier_type TEXT NOT NULL,
    identifier_value TEXT NOT NULL,
    name TEXT NOT NULL,
    agent_type TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS events (
    event_id TEXT PRIMARY KEY,
    file_uuid TEXT NOT NULL REFERENCES files(uuid),
    event_type TEXT NOT NULL,
    event_datetime TEXT NOT NULL,
    event_detail TEXT,
    event_outcome TEXT,
    event_outcome_detail TEXT
);
CREATE TABLE IF NOT EXISTS event_agents (
    event_id TEXT NOT NULL REFERENCES events(event_id),
    agent_id INTEGER NOT NULL REFERENCES agents(id),
    PRIMARY KEY (event_id, agent_id)
);
";

const DUBLIN_CORE_COLUMNS: &str = "id, applies_to_type, applies_to, status, title, is_part_of, \
    creator, subject, description, publisher, contributor, date, type, format, identifier, \
    source, relation, language, coverage, rights";

const RIGHTS_COLUMNS: &str = "id, applies_to_type, applies_to, status, basis, identifier_type, \
    identifier_value, copyright_status, copyright_jurisdiction, copyright_determination_date, \
    license_terms, statute_jurisdiction, statute_citation, statute_determination_date, note";

const EVENT_COLUMNS: &str = "e.event_id, e.file_uuid, e.event_type, e.event_datetime, \
    e.event_detail, e.event_outcome, e.event_outcome_detail";

const FILE_COLUMNS: &str = "uuid, sip_uuid, original_location, current_location, file_grp_use, \
    checksum, checksum_type, size";

/// A [`RecordStore`] over a SQLite database.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open an existing database read-only.
    ///
    /// # Errors
    /// Returns [`StoreError::Sqlite`] if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!(path = %path.display(), "opened record store");
        Ok(Self { conn })
    }

    /// Wrap an already-open connection (e.g. an in-memory database seeded by
    /// a test).
    #[must_use]
    pub const fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Create every table the store reads, if missing.
    ///
    /// # Errors
    /// Returns [`StoreError::Sqlite`] if the DDL fails.
    pub fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn granted_for(&self, rights_id: i64) -> Result<Vec<RightsGranted>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT act, restriction, start_date, end_date, end_open, note \
             FROM rights_granted WHERE rights_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![rights_id], |row| {
            Ok(RightsGranted {
                act: row.get(0)?,
                restriction: row.get(1)?,
                start_date: row.get(2)?,
                end_date: row.get(3)?,
                end_open: row.get::<_, i64>(4)? != 0,
                note: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn agents_for(&self, event_id: &str) -> Result<Vec<AgentRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.identifier_type, a.identifier_value, a.name, a.agent_type \
             FROM agents a JOIN event_agents ea ON ea.agent_id = a.id \
             WHERE ea.event_id = ?1 ORDER BY a.id",
        )?;
        let rows = stmt.query_map(params![event_id], agent_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl RecordStore for SqliteStore {
    fn descriptive_metadata(
        &self,
        scope: &Scope,
        status: Option<MetadataStatus>,
    ) -> Result<Vec<DublinCoreRecord>, StoreError> {
        let sql = format!(
            "SELECT {DUBLIN_CORE_COLUMNS} FROM dublin_core \
             WHERE applies_to_type = ?1 AND applies_to = ?2 AND (?3 IS NULL OR status = ?3) \
             ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                scope.kind.as_str(),
                scope.id.to_string(),
                status.map(MetadataStatus::as_str)
            ],
            |row| {
                let raw = RawScoped::from_row(row)?;
                let fields = DublinCoreFields {
                    title: row.get(4)?,
                    is_part_of: row.get(5)?,
                    creator: row.get(6)?,
                    subject: row.get(7)?,
                    description: row.get(8)?,
                    publisher: row.get(9)?,
                    contributor: row.get(10)?,
                    date: row.get(11)?,
                    kind: row.get(12)?,
                    format: row.get(13)?,
                    identifier: row.get(14)?,
                    source: row.get(15)?,
                    relation: row.get(16)?,
                    language: row.get(17)?,
                    coverage: row.get(18)?,
                    rights: row.get(19)?,
                };
                Ok((raw, fields))
            },
        )?;

        let mut out = Vec::new();
        for row in rows {
            let (raw, fields) = row?;
            let (scope, status) = raw.parse("dublin_core")?;
            out.push(DublinCoreRecord {
                id: raw.id,
                scope,
                status,
                fields,
            });
        }
        Ok(out)
    }

    fn rights_statements(
        &self,
        scope: &Scope,
        status: MetadataStatus,
    ) -> Result<Vec<RightsRecord>, StoreError> {
        let sql = format!(
            "SELECT {RIGHTS_COLUMNS} FROM rights_statements \
             WHERE applies_to_type = ?1 AND applies_to = ?2 AND status = ?3 ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![scope.kind.as_str(), scope.id.to_string(), status.as_str()],
            |row| {
                let raw = RawScoped::from_row(row)?;
                let basis: String = row.get(4)?;
                let identifier_type: String = row.get(5)?;
                let identifier_value: String = row.get(6)?;
                let detail = RightsDetail {
                    copyright_status: row.get(7)?,
                    copyright_jurisdiction: row.get(8)?,
                    copyright_determination_date: row.get(9)?,
                    license_terms: row.get(10)?,
                    statute_jurisdiction: row.get(11)?,
                    statute_citation: row.get(12)?,
                    statute_determination_date: row.get(13)?,
                    note: row.get(14)?,
                };
                Ok((raw, basis, identifier_type, identifier_value, detail))
            },
        )?;

        let mut out = Vec::new();
        for row in rows {
            let (raw, basis, identifier_type, identifier_value, detail) = row?;
            let (scope, status) = raw.parse("rights_statements")?;
            let basis = basis
                .parse()
                .map_err(|e: String| StoreError::malformed("rights_statements", raw.id.to_string(), e))?;
            out.push(RightsRecord {
                id: raw.id,
                scope,
                status,
                basis,
                identifier_type,
                identifier_value,
                detail,
                granted: Vec::new(),
            });
        }
        for record in &mut out {
            record.granted = self.granted_for(record.id)?;
        }
        Ok(out)
    }

    fn events(&self, query: &EventQuery) -> Result<Vec<EventRecord>, StoreError> {
        let (scope_clause, scope_value) = match query.scope {
            EventScope::Package(package) => ("f.sip_uuid = ?1", package),
            EventScope::File(content_id) => ("e.file_uuid = ?1", content_id),
        };
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events e JOIN files f ON f.uuid = e.file_uuid \
             WHERE {scope_clause} AND (?2 IS NULL OR e.event_type = ?2) \
             ORDER BY e.event_datetime, e.event_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![scope_value.to_string(), query.event_type.as_deref()],
            |row| {
                Ok(RawEvent {
                    event_id: row.get(0)?,
                    file_uuid: row.get(1)?,
                    event_type: row.get(2)?,
                    datetime: row.get(3)?,
                    detail: row.get(4)?,
                    outcome: row.get(5)?,
                    outcome_detail: row.get(6)?,
                })
            },
        )?;
        let raws = rows.collect::<Result<Vec<_>, _>>()?;

        let mut out = Vec::with_capacity(raws.len());
        for raw in raws {
            let agents = self.agents_for(&raw.event_id)?;
            out.push(EventRecord {
                event_id: parse_uuid("events", &raw.event_id, &raw.event_id)?,
                content_id: parse_uuid("events", &raw.event_id, &raw.file_uuid)?,
                datetime: parse_datetime("events", &raw.event_id, &raw.datetime)?,
                event_type: raw.event_type,
                detail: raw.detail,
                outcome: raw.outcome,
                outcome_detail: raw.outcome_detail,
                agents,
            });
        }
        Ok(out)
    }

    fn agents(&self, query: &AgentQuery) -> Result<Vec<AgentRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, identifier_type, identifier_value, name, agent_type FROM agents \
             WHERE identifier_type = ?1 AND name = ?2 AND agent_type = ?3 ORDER BY id",
        )?;
        let rows = stmt.query_map(
            params![query.identifier_type, query.name, query.agent_type],
            agent_from_row,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn files(&self, query: &FileQuery) -> Result<Vec<FileRecord>, StoreError> {
        // Suffix matches compare the tail with substr() so that '%' and '_'
        // in the suffix are literal rather than LIKE wildcards.
        let location_clause = match &query.location {
            None => "?3 IS NULL",
            Some(LocationMatch::CurrentIs(_)) => "current_location = ?3",
            Some(LocationMatch::OriginalEndsWith(_)) => {
                "substr(original_location, -length(?3)) = ?3"
            }
            Some(LocationMatch::CurrentEndsWith(_)) => "substr(current_location, -length(?3)) = ?3",
        };
        let location_value = query.location.as_ref().map(|l| match l {
            LocationMatch::CurrentIs(v)
            | LocationMatch::OriginalEndsWith(v)
            | LocationMatch::CurrentEndsWith(v) => v.as_str(),
        });
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM files \
             WHERE sip_uuid = ?1 AND (?2 IS NULL OR file_grp_use = ?2) AND {location_clause} \
             ORDER BY current_location, uuid"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                query.package.to_string(),
                query.use_category.as_deref(),
                location_value
            ],
            |row| {
                Ok(RawFile {
                    uuid: row.get(0)?,
                    sip_uuid: row.get(1)?,
                    original_location: row.get(2)?,
                    current_location: row.get(3)?,
                    use_category: row.get(4)?,
                    checksum: row.get(5)?,
                    checksum_type: row.get(6)?,
                    size: row.get(7)?,
                })
            },
        )?;

        let mut out = Vec::new();
        for row in rows {
            let raw = row?;
            let size = raw
                .size
                .map(u64::try_from)
                .transpose()
                .map_err(|_| StoreError::malformed("files", raw.uuid.clone(), "negative size"))?;
            let file = FileRecord {
                content_id: parse_uuid("files", &raw.uuid, &raw.uuid)?,
                package: parse_uuid("files", &raw.uuid, &raw.sip_uuid)?,
                original_location: raw.original_location,
                current_location: raw.current_location,
                use_category: raw.use_category,
                checksum: raw.checksum,
                checksum_type: raw.checksum_type,
                size,
            };
            out.push(file);
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

struct RawScoped {
    id: i64,
    kind: String,
    applies_to: String,
    status: String,
}

impl RawScoped {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            applies_to: row.get(2)?,
            status: row.get(3)?,
        })
    }

    fn parse(&self, table: &'static str) -> Result<(Scope, MetadataStatus), StoreError> {
        let key = self.id.to_string();
        let kind = self
            .kind
            .parse()
            .map_err(|e: String| StoreError::malformed(table, key.clone(), e))?;
        let id = parse_uuid(table, &key, &self.applies_to)?;
        let status = self
            .status
            .parse()
            .map_err(|e: String| StoreError::malformed(table, key, e))?;
        Ok((Scope { kind, id }, status))
    }
}

struct RawEvent {
    event_id: String,
    file_uuid: String,
    event_type: String,
    datetime: String,
    detail: Option<String>,
    outcome: Option<String>,
    outcome_detail: Option<String>,
}

struct RawFile {
    uuid: String,
    sip_uuid: String,
    original_location: String,
    current_location: String,
    use_category: String,
    checksum: Option<String>,
    checksum_type: Option<String>,
    size: Option<i64>,
}

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<AgentRecord> {
    Ok(AgentRecord {
        id: row.get(0)?,
        identifier_type: row.get(1)?,
        identifier_value: row.get(2)?,
        name: row.get(3)?,
        agent_type: row.get(4)?,
    })
}

fn parse_uuid(table: &'static str, key: &str, value: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(value)
        .map_err(|e| StoreError::malformed(table, key, format!("bad UUID `{value}`: {e}")))
}

/// Accepts RFC 3339 and SQLite's default `YYYY-MM-DD HH:MM:SS[.fff]` (UTC).
fn parse_datetime(table: &'static str, key: &str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| StoreError::malformed(table, key, format!("bad timestamp `{value}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{RightsBasis, ScopeKind};

    const PACKAGE: &str = "6a1f2c8e-3a4b-4c5d-8e9f-0a1b2c3d4e5f";
    const FILE_A: &str = "11111111-1111-4111-8111-111111111111";
    const FILE_CSV: &str = "22222222-2222-4222-8222-222222222222";

    fn seeded() -> SqliteStore {
        let conn = Connection::open_in_memory().unwrap();
        SqliteStore::init_schema(&conn).unwrap();
        conn.execute_batch(&format!(
            "
            INSERT INTO files VALUES ('{FILE_A}', '{PACKAGE}', '%transferDirectory%objects/a_b.txt',
                '%SIPDirectory%objects/a_b.txt', 'original', 'abc', 'sha256', 12);
            INSERT INTO files VALUES ('{FILE_CSV}', '{PACKAGE}', '%SIPDirectory%objects/metadata/metadata.csv',
                '%SIPDirectory%objects/metadata/metadata.csv', 'metadata', NULL, NULL, NULL);
            INSERT INTO agents (identifier_type, identifier_value, name, agent_type)
                VALUES ('preservation system', 'Archivematica-1.0', 'Archivematica', 'software');
            INSERT INTO events VALUES ('33333333-3333-4333-8333-333333333333', '{FILE_A}',
                'reingestion', '2024-05-01 10:00:00', 'full reingest', 'success', NULL);
            INSERT INTO events VALUES ('44444444-4444-4444-8444-444444444444', '{FILE_A}',
                'deletion', '2024-05-01T11:00:00Z', NULL, NULL, NULL);
            INSERT INTO event_agents VALUES ('33333333-3333-4333-8333-333333333333', 1);
            INSERT INTO dublin_core (applies_to_type, applies_to, status, title)
                VALUES ('package', '{PACKAGE}', 'UPDATED', 'New title');
            INSERT INTO rights_statements (applies_to_type, applies_to, status, basis,
                identifier_value, copyright_status)
                VALUES ('package', '{PACKAGE}', 'UPDATED', 'copyright', 'r-1', 'copyrighted');
            INSERT INTO rights_granted (rights_id, act, restriction) VALUES (1, 'disseminate', 'Allow');
            "
        ))
        .unwrap();
        SqliteStore::from_connection(conn)
    }

    fn package() -> Uuid {
        Uuid::parse_str(PACKAGE).unwrap()
    }

    #[test]
    fn reads_dublin_core_with_status_filter() {
        let store = seeded();
        let scope = Scope::package(package());
        let all = store.descriptive_metadata(&scope, None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].fields.title.as_deref(), Some("New title"));
        assert_eq!(all[0].scope.kind, ScopeKind::Package);
        let untouched = store
            .descriptive_metadata(&scope, Some(MetadataStatus::Reingest))
            .unwrap();
        assert!(untouched.is_empty());
    }

    #[test]
    fn reads_rights_with_granted_acts() {
        let store = seeded();
        let rights = store
            .rights_statements(&Scope::package(package()), MetadataStatus::Updated)
            .unwrap();
        assert_eq!(rights.len(), 1);
        assert_eq!(rights[0].basis, RightsBasis::Copyright);
        assert_eq!(rights[0].granted.len(), 1);
        assert_eq!(rights[0].granted[0].act, "disseminate");
    }

    #[test]
    fn reads_events_with_agents_in_time_order() {
        let store = seeded();
        let events = store
            .events(&EventQuery {
                scope: EventScope::Package(package()),
                event_type: None,
            })
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "reingestion");
        assert_eq!(events[0].agents.len(), 1);
        assert!(events[1].agents.is_empty());

        let deletions = store
            .events(&EventQuery::package_events(package(), "deletion"))
            .unwrap();
        assert_eq!(deletions.len(), 1);
    }

    #[test]
    fn suffix_match_treats_underscore_literally() {
        let store = seeded();
        let hit = store
            .files(
                &FileQuery::in_package(package())
                    .with_location(LocationMatch::OriginalEndsWith("%objects/a_b.txt".into())),
            )
            .unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].size, Some(12));

        let miss = store
            .files(
                &FileQuery::in_package(package())
                    .with_location(LocationMatch::OriginalEndsWith("%objects/aXb.txt".into())),
            )
            .unwrap();
        assert!(miss.is_empty());
    }

    #[test]
    fn metadata_files_by_exact_location() {
        let store = seeded();
        let found = store
            .files(
                &FileQuery::in_package(package())
                    .with_use("metadata")
                    .with_location(LocationMatch::CurrentIs(
                        "%SIPDirectory%objects/metadata/metadata.csv".into(),
                    )),
            )
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content_id, Uuid::parse_str(FILE_CSV).unwrap());
    }

    #[test]
    fn agents_by_triple() {
        let store = seeded();
        let query = AgentQuery {
            identifier_type: "preservation system".into(),
            name: "Archivematica".into(),
            agent_type: "software".into(),
        };
        assert_eq!(store.agents(&query).unwrap().len(), 1);
    }

    #[test]
    fn malformed_uuid_is_reported() {
        let conn = Connection::open_in_memory().unwrap();
        SqliteStore::init_schema(&conn).unwrap();
        conn.execute_batch(&format!(
            "INSERT INTO dublin_core (applies_to_type, applies_to, status) VALUES ('package', 'nope', 'ORIGINAL');
             INSERT INTO dublin_core (applies_to_type, applies_to, status) VALUES ('package', '{PACKAGE}', 'BOGUS');"
        ))
        .unwrap();
        let store = SqliteStore::from_connection(conn);
        let err = store
            .descriptive_metadata(&Scope::package(package()), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::MalformedRow { table: "dublin_core", .. }));
    }
}
