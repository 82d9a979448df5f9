//! Merge context and per-merger reports.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use reingest_store::RecordStore;
use tracing::warn;
use uuid::Uuid;

use crate::config::ReingestConfig;

/// Everything a merger needs besides the document.
#[derive(Clone, Copy)]
pub struct MergeContext<'a> {
    /// Pending change records.
    pub store: &'a dyn RecordStore,
    /// The package being reconciled.
    pub package: Uuid,
    /// The package directory on disk.
    pub package_root: &'a Path,
    /// Run timestamp stamped on every new subsection.
    pub now: DateTime<Utc>,
    pub config: &'a ReingestConfig,
}

impl fmt::Debug for MergeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeContext")
            .field("package", &self.package)
            .field("package_root", &self.package_root)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

/// A per-record problem that was skipped rather than failing the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Anomaly {
    /// A `reingestion` event names content the document does not contain.
    UnresolvedEvent { event_id: Uuid, content_id: Uuid },
    /// A `deletion` event names content the document does not contain.
    UnresolvedDeletion { content_id: Uuid },
    /// More than one agent matched the canonical triple.
    AmbiguousAgent { name: String, matches: usize },
    /// Several active rights chains on one entry share a basis.
    DuplicateRightsChains {
        entry: String,
        basis: String,
        chains: usize,
    },
    /// A metadata file exists on disk but the store has no record of it.
    UnrecordedFile { location: String },
    /// A side-metadata row names a file the store does not know.
    UnresolvedRow { path: String },
    /// A side-metadata row points at a file inside the metadata area.
    MetadataRow { path: String },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedEvent {
                event_id,
                content_id,
            } => write!(
                f,
                "event {event_id} targets {content_id}, which is not in the document"
            ),
            Self::UnresolvedDeletion { content_id } => {
                write!(f, "deleted content {content_id} is not in the document")
            }
            Self::AmbiguousAgent { name, matches } => {
                write!(f, "{matches} agents match '{name}'; no agent recorded")
            }
            Self::DuplicateRightsChains {
                entry,
                basis,
                chains,
            } => write!(
                f,
                "{entry} has {chains} active rights chains with basis '{basis}'; the most recent was superseded"
            ),
            Self::UnrecordedFile { location } => {
                write!(f, "no file record for {location}")
            }
            Self::UnresolvedRow { path } => {
                write!(f, "side-metadata row '{path}' matches no recorded file")
            }
            Self::MetadataRow { path } => {
                write!(f, "side-metadata row '{path}' refers to a metadata file")
            }
        }
    }
}

/// What one merger did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Subsections appended.
    pub appended: usize,
    /// Supersession pointers set.
    pub superseded: usize,
    /// Records skipped because the document already reflected them.
    pub skipped: usize,
    /// Structural entries created.
    pub entries_added: usize,
    /// Entries newly tombstoned.
    pub tombstoned: usize,
    pub anomalies: Vec<Anomaly>,
}

impl MergeReport {
    /// Log and record an anomaly.
    pub fn anomaly(&mut self, anomaly: Anomaly) {
        warn!(%anomaly, "skipping record");
        self.anomalies.push(anomaly);
    }

    /// Fold another report into this one.
    pub fn absorb(&mut self, other: Self) {
        self.appended += other.appended;
        self.superseded += other.superseded;
        self.skipped += other.skipped;
        self.entries_added += other.entries_added;
        self.tombstoned += other.tombstoned;
        self.anomalies.extend(other.anomalies);
    }

    /// Whether the merger changed nothing.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.appended == 0 && self.superseded == 0 && self.entries_added == 0 && self.tombstoned == 0
    }
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} appended, {} superseded, {} skipped, {} entries added, {} tombstoned, {} anomalies",
            self.appended,
            self.superseded,
            self.skipped,
            self.entries_added,
            self.tombstoned,
            self.anomalies.len()
        )
    }
}
