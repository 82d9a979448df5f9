//! Package rights statements.

use reingest_store::{MetadataStatus, RightsRecord, Scope};
use tracing::{info, instrument};

use super::{Anomaly, MergeContext, MergeReport, append_administrative, require_administrative};
use crate::error::ReingestError;
use crate::mets::read::rights_basis;
use crate::model::{
    Document, EntryId, IdKind, MdSecType, MetadataSection, SubsectionKind, UseCategory,
};
use crate::payload;

/// Apply new (`ORIGINAL`) and edited (`UPDATED`) rights statements to every
/// `original` file.
///
/// New statements are appended. Edited statements are appended and supersede
/// the most recent active statement with the same basis.
///
/// # Errors
/// Store failures, or [`ReingestError::MissingAdministrativeSection`] for an
/// original file without an amdSec.
#[instrument(skip_all, fields(package = %ctx.package))]
pub fn merge_rights(
    doc: &mut Document,
    ctx: &MergeContext<'_>,
) -> Result<MergeReport, ReingestError> {
    let mut report = MergeReport::default();
    let scope = Scope::package(ctx.package);
    let added = ctx
        .store
        .rights_statements(&scope, MetadataStatus::Original)?;
    let updated = ctx.store.rights_statements(&scope, MetadataStatus::Updated)?;
    if added.is_empty() && updated.is_empty() {
        info!("no new or updated rights");
        return Ok(report);
    }

    let targets = doc.entries_with_use(&UseCategory::Original);
    for &entry in &targets {
        for rights in &added {
            add_statement(doc, entry, rights, false, ctx, &mut report)?;
        }
    }
    for &entry in &targets {
        for rights in &updated {
            add_statement(doc, entry, rights, true, ctx, &mut report)?;
        }
    }
    info!(files = targets.len(), %report, "rights merge done");
    Ok(report)
}

fn add_statement(
    doc: &mut Document,
    entry: EntryId,
    rights: &RightsRecord,
    replaces: bool,
    ctx: &MergeContext<'_>,
    report: &mut MergeReport,
) -> Result<(), ReingestError> {
    let payload = payload::rights_statement(doc.names(), rights, doc.entry(entry).content_id);
    let section = require_administrative(doc, entry)?;
    if section
        .of_kind(SubsectionKind::Rights)
        .any(|s| s.is_active() && s.payload == payload)
    {
        report.skipped += 1;
        return Ok(());
    }
    let target = if replaces {
        let name = doc.entry(entry).display_name();
        supersession_target(section, rights, &name, report)
    } else {
        None
    };

    let new_id = append_administrative(
        doc,
        entry,
        MdSecType::Rights,
        IdKind::RightsMd,
        payload,
        ctx.now,
    )?;
    report.appended += 1;
    if let Some(old_id) = target
        && let Some(section) = doc.entry_mut(entry).primary_administrative_mut()
    {
        section.supersede(&old_id, &new_id)?;
        report.superseded += 1;
    }
    Ok(())
}

/// The most recent active rights subsection sharing the record's basis.
/// Creation time orders candidates; ties keep document order.
fn supersession_target(
    section: &MetadataSection,
    rights: &RightsRecord,
    entry_name: &str,
    report: &mut MergeReport,
) -> Option<String> {
    let basis = rights.basis.as_str().to_ascii_lowercase();
    let mut candidates: Vec<_> = section
        .of_kind(SubsectionKind::Rights)
        .filter(|s| s.is_active() && rights_basis(s).as_deref() == Some(basis.as_str()))
        .collect();
    candidates.sort_by_key(|s| s.created_at());
    if candidates.len() > 1 {
        report.anomaly(Anomaly::DuplicateRightsChains {
            entry: entry_name.to_owned(),
            basis: rights.basis.as_str().to_owned(),
            chains: candidates.len(),
        });
    }
    candidates.last().map(|s| s.id.clone())
}
