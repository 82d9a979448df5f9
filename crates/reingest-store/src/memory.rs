//! In-process [`RecordStore`] backend.
//!
//! Holds records in plain vectors and applies the same filters as the SQLite
//! backend. Used by tests and by tools that assemble records programmatically.

use crate::error::StoreError;
use crate::records::{
    AgentRecord, DublinCoreRecord, EventRecord, FileRecord, MetadataStatus, RightsRecord, Scope,
};
use crate::store::{AgentQuery, EventQuery, EventScope, FileQuery, RecordStore};

/// A [`RecordStore`] backed by vectors.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    dublin_core: Vec<DublinCoreRecord>,
    rights: Vec<RightsRecord>,
    events: Vec<EventRecord>,
    agents: Vec<AgentRecord>,
    files: Vec<FileRecord>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a Dublin Core record.
    #[must_use]
    pub fn with_dublin_core(mut self, record: DublinCoreRecord) -> Self {
        self.dublin_core.push(record);
        self
    }

    /// Builder: add a rights statement.
    #[must_use]
    pub fn with_rights(mut self, record: RightsRecord) -> Self {
        self.rights.push(record);
        self
    }

    /// Builder: add an event.
    #[must_use]
    pub fn with_event(mut self, record: EventRecord) -> Self {
        self.events.push(record);
        self
    }

    /// Builder: add an agent.
    #[must_use]
    pub fn with_agent(mut self, record: AgentRecord) -> Self {
        self.agents.push(record);
        self
    }

    /// Builder: add a file.
    #[must_use]
    pub fn with_file(mut self, record: FileRecord) -> Self {
        self.files.push(record);
        self
    }

    /// Change the status of every Dublin Core record, as the capture workflow
    /// does once a reingest has been stored.
    pub fn mark_dublin_core(&mut self, status: MetadataStatus) {
        for record in &mut self.dublin_core {
            record.status = status;
        }
    }

    /// Mutable access to the Dublin Core records.
    pub fn dublin_core_mut(&mut self) -> &mut Vec<DublinCoreRecord> {
        &mut self.dublin_core
    }

    /// Mutable access to the rights records.
    pub fn rights_mut(&mut self) -> &mut Vec<RightsRecord> {
        &mut self.rights
    }

    /// Mutable access to the event records.
    pub fn events_mut(&mut self) -> &mut Vec<EventRecord> {
        &mut self.events
    }

    fn file_package(&self, content_id: uuid::Uuid) -> Option<uuid::Uuid> {
        self.files
            .iter()
            .find(|f| f.content_id == content_id)
            .map(|f| f.package)
    }
}

impl RecordStore for MemoryStore {
    fn descriptive_metadata(
        &self,
        scope: &Scope,
        status: Option<MetadataStatus>,
    ) -> Result<Vec<DublinCoreRecord>, StoreError> {
        Ok(self
            .dublin_core
            .iter()
            .filter(|r| r.scope == *scope && status.is_none_or(|s| r.status == s))
            .cloned()
            .collect())
    }

    fn rights_statements(
        &self,
        scope: &Scope,
        status: MetadataStatus,
    ) -> Result<Vec<RightsRecord>, StoreError> {
        Ok(self
            .rights
            .iter()
            .filter(|r| r.scope == *scope && r.status == status)
            .cloned()
            .collect())
    }

    fn events(&self, query: &EventQuery) -> Result<Vec<EventRecord>, StoreError> {
        let mut out: Vec<EventRecord> = self
            .events
            .iter()
            .filter(|e| match query.scope {
                EventScope::Package(package) => self.file_package(e.content_id) == Some(package),
                EventScope::File(content_id) => e.content_id == content_id,
            })
            .filter(|e| {
                query
                    .event_type
                    .as_ref()
                    .is_none_or(|t| e.event_type == *t)
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            a.datetime
                .cmp(&b.datetime)
                .then_with(|| a.event_id.cmp(&b.event_id))
        });
        Ok(out)
    }

    fn agents(&self, query: &AgentQuery) -> Result<Vec<AgentRecord>, StoreError> {
        Ok(self
            .agents
            .iter()
            .filter(|a| {
                a.identifier_type == query.identifier_type
                    && a.name == query.name
                    && a.agent_type == query.agent_type
            })
            .cloned()
            .collect())
    }

    fn files(&self, query: &FileQuery) -> Result<Vec<FileRecord>, StoreError> {
        Ok(self
            .files
            .iter()
            .filter(|f| query.matches(f))
            .cloned()
            .collect())
    }
}
