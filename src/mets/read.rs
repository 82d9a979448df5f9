//! METS text to [`Document`].

use std::collections::HashMap;
use std::path::Path;

use reingest_xml::{Element, Node, parse_document};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::ReingestError;
use crate::model::{
    Document, DocumentEntry, EntryId, EntryKind, FileRecordXml, IdAllocator, MdSecType,
    MetadataSection, MetsNames, Preserved, Status, Subsection, SubsectionKind, UseCategory,
};

/// Read and parse a METS document from disk.
///
/// # Errors
/// I/O failure, malformed XML, or a document the model cannot represent.
#[instrument(fields(path = %path.display()))]
pub fn read_mets(path: &Path) -> Result<Document, ReingestError> {
    let text = std::fs::read_to_string(path).map_err(|e| ReingestError::io(path, e))?;
    parse_mets(&text).map_err(|e| match e {
        ReingestError::DocumentParse { source, .. } => ReingestError::DocumentParse {
            path: Some(path.to_owned()),
            source,
        },
        other => other,
    })
}

/// Parse METS text into a [`Document`].
///
/// # Errors
/// Returns [`ReingestError::DocumentParse`] for malformed XML and
/// [`ReingestError::MalformedDocument`] when structural references dangle or
/// required attributes are missing.
pub fn parse_mets(text: &str) -> Result<Document, ReingestError> {
    let xml = parse_document(text)
        .map_err(|source| ReingestError::DocumentParse { path: None, source })?;
    let root = xml.root;
    if root.local_name() != "mets" {
        return Err(ReingestError::malformed(format!(
            "root element is <{}>, expected <mets>",
            root.name
        )));
    }
    let names = MetsNames::new(root.name.rsplit_once(':').map_or("", |(p, _)| p));

    let mut ids = IdAllocator::new();
    observe_ids(&root, &mut ids);

    let mut preserved = Preserved {
        leading_comments: xml.leading_comments,
        root: shell(&root),
        ..Preserved::default()
    };
    let mut dmd = Pool::default();
    let mut amd = Pool::default();
    let mut files = Pool::default();
    let mut physical: Option<&Element> = None;
    let mut seen_file_sec = false;

    for child in root.child_elements() {
        match child.local_name() {
            "metsHdr" if preserved.header.is_none() => preserved.header = Some(child.clone()),
            "dmdSec" => {
                let sub = parse_subsection(child, MdSecType::Dmd)?;
                dmd.insert(sub.id.clone(), sub);
            }
            "amdSec" => {
                let section = parse_administrative(child)?;
                let id = section.id.clone().unwrap_or_default();
                amd.insert(id, section);
            }
            "fileSec" if !seen_file_sec => {
                seen_file_sec = true;
                preserved.file_sec_attributes.clone_from(&child.attributes);
                parse_file_groups(child, &mut preserved, &mut files)?;
            }
            "structMap" if physical.is_none() && is_physical(child) => physical = Some(child),
            _ => preserved.passthrough.push(child.clone()),
        }
    }

    let physical =
        physical.ok_or_else(|| ReingestError::malformed("no physical structMap found"))?;
    preserved.struct_map = shell(physical);

    let mut builder = TreeBuilder {
        entries: Vec::new(),
        dmd,
        amd,
        files,
    };
    let mut roots = Vec::new();
    for div in physical.find_children("div") {
        roots.push(builder.build(div, None)?);
    }

    let TreeBuilder {
        mut entries,
        dmd,
        amd,
        files,
    } = builder;
    preserved.detached_descriptive = dmd.into_remaining();
    preserved.detached_administrative = amd.into_remaining();
    preserved.orphan_files = files
        .into_remaining()
        .into_iter()
        .map(|f| (f.group, f.element))
        .collect();
    if !preserved.detached_administrative.is_empty() || !preserved.detached_descriptive.is_empty()
    {
        debug!(
            dmd = preserved.detached_descriptive.len(),
            amd = preserved.detached_administrative.len(),
            "sections not referenced from the structural map are kept verbatim"
        );
    }

    for entry in &mut entries {
        relink(&mut entry.descriptive);
        for section in &mut entry.administrative {
            relink(section);
        }
        entry.original_location = original_location(entry);
    }
    let mut detached_dmd = MetadataSection::descriptive();
    for sub in std::mem::take(&mut preserved.detached_descriptive) {
        detached_dmd.append(sub);
    }
    relink(&mut detached_dmd);
    preserved.detached_descriptive = detached_dmd.subsections().to_vec();
    for section in &mut preserved.detached_administrative {
        relink(section);
    }

    Ok(Document::from_parts(names, entries, roots, ids, preserved))
}

// ---------------------------------------------------------------------------
// Section parsing
// ---------------------------------------------------------------------------

/// Attributes split into the ones the model owns and the rest.
fn split_attributes(
    el: &Element,
    owned: &[&str],
) -> (HashMap<String, String>, Vec<(String, String)>) {
    let mut known = HashMap::new();
    let mut rest = Vec::new();
    for (k, v) in &el.attributes {
        if owned.contains(&k.as_str()) {
            known.insert(k.clone(), v.clone());
        } else {
            rest.push((k.clone(), v.clone()));
        }
    }
    (known, rest)
}

fn parse_subsection(el: &Element, element: MdSecType) -> Result<Subsection, ReingestError> {
    let (mut known, extra) = split_attributes(el, &["ID", "CREATED", "STATUS"]);
    let id = known
        .remove("ID")
        .ok_or_else(|| ReingestError::malformed(format!("<{}> without ID", el.name)))?;
    let payload = el
        .child_elements()
        .find(|c| matches!(c.local_name(), "mdWrap" | "mdRef"))
        .cloned()
        .ok_or_else(|| ReingestError::malformed(format!("{id} has no mdWrap or mdRef")))?;
    let mut sub = Subsection::new(
        element,
        id,
        known.remove("CREATED"),
        known.remove("STATUS").as_deref().map(Status::parse),
        payload,
    );
    sub.extra_attributes = extra;
    Ok(sub)
}

fn parse_administrative(el: &Element) -> Result<MetadataSection, ReingestError> {
    let (mut known, extra) = split_attributes(el, &["ID"]);
    let id = known
        .remove("ID")
        .ok_or_else(|| ReingestError::malformed("<amdSec> without ID"))?;
    let mut section = MetadataSection::administrative(id.clone());
    section.extra_attributes = extra;
    for child in el.child_elements() {
        match MdSecType::from_element_name(child.local_name()) {
            Some(kind) if kind != MdSecType::Dmd => section.append(parse_subsection(child, kind)?),
            _ => warn!(amd_sec = %id, element = %child.name, "dropping unrecognised amdSec child"),
        }
    }
    Ok(section)
}

/// Rebuild forward pointers from `STATUS="superseded"` markers: each
/// superseded subsection points at the next subsection of the same chain.
fn relink(section: &mut MetadataSection) {
    let subs = section.subsections_mut();
    for i in 0..subs.len() {
        if subs[i].status != Some(Status::Superseded) || subs[i].superseded_by().is_some() {
            continue;
        }
        let key = chain_key(&subs[i]);
        if let Some(next) = subs[i + 1..].iter().find(|s| chain_key(s) == key) {
            let next = next.id.clone();
            subs[i].link_successor(&next);
        }
    }
}

/// What identifies a supersession chain: the kind, plus the basis for rights.
pub(crate) fn chain_key(sub: &Subsection) -> (SubsectionKind, Option<String>) {
    let kind = sub.kind();
    let basis = (kind == SubsectionKind::Rights)
        .then(|| rights_basis(sub))
        .flatten();
    (kind, basis)
}

/// `rightsBasis` text of a rights subsection, lowercased.
pub(crate) fn rights_basis(sub: &Subsection) -> Option<String> {
    sub.payload
        .descendant_text("rightsBasis")
        .map(|b| b.to_ascii_lowercase())
}

fn original_location(entry: &DocumentEntry) -> Option<String> {
    entry
        .administrative
        .iter()
        .flat_map(|s| s.of_kind(SubsectionKind::Technical))
        .find_map(|s| s.payload.descendant_text("originalName"))
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// File section
// ---------------------------------------------------------------------------

struct FileInfo {
    group: String,
    group_id: Option<String>,
    admids: Vec<String>,
    href: Option<String>,
    xml: FileRecordXml,
    element: Element,
}

fn parse_file_groups(
    el: &Element,
    preserved: &mut Preserved,
    files: &mut Pool<FileInfo>,
) -> Result<(), ReingestError> {
    for group in el.find_children("fileGrp") {
        let (mut known, rest) = split_attributes(group, &["USE"]);
        let use_name = known.remove("USE").unwrap_or_default();
        if !preserved.file_groups.iter().any(|(u, _)| *u == use_name) {
            preserved.file_groups.push((use_name.clone(), rest));
        }
        for file in group.find_children("file") {
            let (id, info) = parse_file(file, &use_name, preserved)?;
            files.insert(id, info);
        }
        parse_file_groups(group, preserved, files)?;
    }
    Ok(())
}

fn parse_file(
    el: &Element,
    group: &str,
    preserved: &mut Preserved,
) -> Result<(String, FileInfo), ReingestError> {
    let (mut known, attributes) = split_attributes(el, &["ID", "GROUPID", "ADMID"]);
    let id = known
        .remove("ID")
        .ok_or_else(|| ReingestError::malformed("<file> without ID"))?;
    let mut href = None;
    let mut locator_attributes = Vec::new();
    let mut extra_children = Vec::new();
    for child in el.child_elements() {
        if child.local_name() == "FLocat" && href.is_none() {
            for (k, v) in &child.attributes {
                if reingest_xml::local_name(k) == "href" {
                    href = Some(v.clone());
                    preserved.href_name.get_or_insert_with(|| k.clone());
                } else {
                    locator_attributes.push((k.clone(), v.clone()));
                }
            }
        } else {
            extra_children.push(child.clone());
        }
    }
    let info = FileInfo {
        group: group.to_owned(),
        group_id: known.remove("GROUPID"),
        admids: split_ids(known.remove("ADMID").as_deref()),
        href,
        xml: FileRecordXml {
            attributes,
            locator_attributes,
            extra_children,
        },
        element: el.clone(),
    };
    Ok((id, info))
}

// ---------------------------------------------------------------------------
// Structural map
// ---------------------------------------------------------------------------

fn is_physical(el: &Element) -> bool {
    el.attr("TYPE")
        .is_none_or(|t| t.eq_ignore_ascii_case("physical"))
}

struct TreeBuilder {
    entries: Vec<DocumentEntry>,
    dmd: Pool<Subsection>,
    amd: Pool<MetadataSection>,
    files: Pool<FileInfo>,
}

impl TreeBuilder {
    fn build(&mut self, div: &Element, parent: Option<EntryId>) -> Result<EntryId, ReingestError> {
        let (mut known, div_attributes) = split_attributes(div, &["TYPE", "LABEL", "DMDID"]);
        let has_child_divs = div.find_children("div").next().is_some();
        let kind = known.remove("TYPE").map_or_else(
            || {
                if has_child_divs {
                    EntryKind::Directory
                } else {
                    EntryKind::Item
                }
            },
            |t| EntryKind::parse(&t),
        );
        let mut entry = DocumentEntry::bare(kind, known.remove("LABEL"));
        entry.div_attributes = div_attributes;
        entry.parent = parent;

        for dmd_id in split_ids(known.remove("DMDID").as_deref()) {
            let sub = self.dmd.take(&dmd_id).ok_or_else(|| {
                ReingestError::malformed(format!(
                    "div references dmdSec '{dmd_id}' which is missing or already claimed"
                ))
            })?;
            entry.descriptive.append(sub);
        }

        let mut pointers = div.find_children("fptr").filter_map(|f| f.attr("FILEID"));
        if let Some(file_id) = pointers.next() {
            let info = self.files.take(file_id).ok_or_else(|| {
                ReingestError::malformed(format!(
                    "fptr references file '{file_id}' which is missing or already claimed"
                ))
            })?;
            for amd_id in &info.admids {
                let section = self.amd.take(amd_id).ok_or_else(|| {
                    ReingestError::malformed(format!(
                        "file '{file_id}' references amdSec '{amd_id}' which is missing or already claimed"
                    ))
                })?;
                entry.administrative.push(section);
            }
            entry.content_id = file_id
                .strip_prefix("file-")
                .and_then(|u| Uuid::parse_str(u).ok());
            entry.file_id = Some(file_id.to_owned());
            entry.group_id = info.group_id;
            entry.path = info.href;
            entry.use_category = Some(UseCategory::parse(&info.group));
            entry.file_xml = info.xml;
        }
        if pointers.next().is_some() {
            warn!(
                label = entry.label.as_deref().unwrap_or_default(),
                "div has several fptr children; only the first is modelled"
            );
        }

        let id = EntryId(self.entries.len());
        self.entries.push(entry);
        let mut children = Vec::new();
        for child in div.find_children("div") {
            children.push(self.build(child, Some(id))?);
        }
        self.entries[id.0].children = children;
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Items keyed by ID that can each be claimed once; unclaimed items keep
/// their document order.
struct Pool<T> {
    order: Vec<String>,
    items: HashMap<String, T>,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            items: HashMap::new(),
        }
    }
}

impl<T> Pool<T> {
    fn insert(&mut self, id: String, item: T) {
        if self.items.contains_key(&id) {
            warn!(%id, "duplicate ID; keeping the first occurrence");
            return;
        }
        self.order.push(id.clone());
        self.items.insert(id, item);
    }

    fn take(&mut self, id: &str) -> Option<T> {
        self.items.remove(id)
    }

    fn into_remaining(mut self) -> Vec<T> {
        self.order
            .iter()
            .filter_map(|id| self.items.remove(id))
            .collect()
    }
}

fn split_ids(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| s.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}

/// An element's name and attributes without its children.
fn shell(el: &Element) -> Element {
    Element {
        name: el.name.clone(),
        attributes: el.attributes.clone(),
        children: Vec::new(),
    }
}

fn observe_ids(el: &Element, ids: &mut IdAllocator) {
    if let Some(id) = el.attr("ID") {
        ids.observe(id);
    }
    for child in &el.children {
        if let Node::Element(e) = child {
            observe_ids(e, ids);
        }
    }
}
