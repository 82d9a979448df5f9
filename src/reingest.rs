//! The reconciliation run: load, merge, serialize.

use std::fmt;
use std::io::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use reingest_store::RecordStore;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::ReingestConfig;
use crate::error::ReingestError;
use crate::merge::{
    MergeContext, MergeReport, extend_structure, mark_deletions, merge_descriptive, merge_events,
    merge_rights,
};
use crate::mets::{read_mets, write_mets};
use crate::model::Document;

/// What each merge step did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub descriptive: MergeReport,
    pub rights: MergeReport,
    pub events: MergeReport,
    pub structure: MergeReport,
    pub deletions: MergeReport,
}

impl RunReport {
    /// All steps folded together.
    #[must_use]
    pub fn total(&self) -> MergeReport {
        let mut total = MergeReport::default();
        for step in [
            &self.descriptive,
            &self.rights,
            &self.events,
            &self.structure,
            &self.deletions,
        ] {
            total.absorb(step.clone());
        }
        total
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "descriptive: {}", self.descriptive)?;
        writeln!(f, "rights:      {}", self.rights)?;
        writeln!(f, "events:      {}", self.events)?;
        writeln!(f, "structure:   {}", self.structure)?;
        write!(f, "deletions:   {}", self.deletions)
    }
}

/// Apply every merge step to `doc`, in order.
///
/// Deletions run last so tombstoned entries stay reachable by location for
/// the earlier steps.
///
/// # Errors
/// The first fatal error from any step.
pub fn reconcile(doc: &mut Document, ctx: &MergeContext<'_>) -> Result<RunReport, ReingestError> {
    Ok(RunReport {
        descriptive: merge_descriptive(doc, ctx)?,
        rights: merge_rights(doc, ctx)?,
        events: merge_events(doc, ctx)?,
        structure: extend_structure(doc, ctx)?,
        deletions: mark_deletions(doc, ctx)?,
    })
}

/// Load the package's prior document, reconcile it and return the
/// serialized result.
///
/// Nothing is written; see [`write_output`].
///
/// # Errors
/// Any fatal error while loading, merging or serializing.
#[instrument(skip(store, config, now), fields(package_root = %package_root.display()))]
pub fn run(
    store: &dyn RecordStore,
    package_root: &Path,
    package: Uuid,
    config: &ReingestConfig,
    now: DateTime<Utc>,
) -> Result<(Vec<u8>, RunReport), ReingestError> {
    let input = config.input_path(package_root, package);
    info!(input = %input.display(), "loading prior document");
    let mut doc = read_mets(&input)?;
    info!(entries = doc.len(), "document loaded");

    let ctx = MergeContext {
        store,
        package,
        package_root,
        now,
        config,
    };
    let report = reconcile(&mut doc, &ctx)?;
    let total = report.total();
    info!(%total, modified = doc.is_modified(), "reconciliation complete");
    let bytes = write_mets(&doc, now)?;
    Ok((bytes, report))
}

/// Write `bytes` to `dest` through a temporary file in the same directory, so
/// `dest` is either untouched or fully written.
///
/// # Errors
/// [`ReingestError::Io`] if the temporary file cannot be created, written or
/// renamed into place.
pub fn write_output(bytes: &[u8], dest: &Path) -> Result<(), ReingestError> {
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ReingestError::io(dir, e))?;
    let written = tmp.write_all(bytes).and_then(|()| tmp.flush());
    written.map_err(|e| ReingestError::io(tmp.path(), e))?;
    tmp.persist(dest)
        .map_err(|e| ReingestError::io(dest, e.error))?;
    info!(dest = %dest.display(), bytes = bytes.len(), "wrote reconciled document");
    Ok(())
}
