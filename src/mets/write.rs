//! [`Document`] to METS text.
//!
//! Sections are emitted in a canonical order: header, descriptive sections,
//! administrative sections, file section, physical map, then every other
//! top-level element in its original order. Serializing an unchanged model
//! twice yields identical bytes.

use chrono::{DateTime, Utc};
use reingest_xml::{Element, write_document};

use super::timestamp;
use crate::error::ReingestError;
use crate::model::{Document, DocumentEntry, EntryId, MetadataSection, MetsNames, Subsection};

const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Serialize the document. `now` stamps `LASTMODDATE` on the header, and
/// only when the document was modified.
///
/// # Errors
/// Returns [`ReingestError::Serialize`] if the XML writer fails.
pub fn write_mets(doc: &Document, now: DateTime<Utc>) -> Result<Vec<u8>, ReingestError> {
    let root = render(doc, now);
    let mut bytes = write_document(&root).map_err(ReingestError::Serialize)?;
    let comments = &doc.preserved.leading_comments;
    if !comments.is_empty() {
        let at = bytes
            .iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |i| i + 1);
        let mut head: Vec<u8> = Vec::new();
        for comment in comments {
            head.extend_from_slice(format!("<!--{comment}-->\n").as_bytes());
        }
        bytes.splice(at..at, head);
    }
    Ok(bytes)
}

/// Build the output element tree.
#[must_use]
pub fn render(doc: &Document, now: DateTime<Utc>) -> Element {
    let names = doc.names();
    let preserved = &doc.preserved;
    let order = doc.pre_order();

    let mut root = preserved.root.clone();
    let href_name = preserved
        .href_name
        .clone()
        .unwrap_or_else(|| "xlink:href".to_owned());
    if preserved.href_name.is_none()
        && root.attr("xmlns:xlink").is_none()
        && order.iter().any(|&id| doc.entry(id).path.is_some())
    {
        root.set_attr("xmlns:xlink", XLINK_NS);
    }

    if let Some(header) = header(doc, names, now) {
        root.push_child(header);
    }
    for &id in &order {
        for sub in doc.entry(id).descriptive.subsections() {
            root.push_child(subsection_element(names, sub));
        }
    }
    for sub in &preserved.detached_descriptive {
        root.push_child(subsection_element(names, sub));
    }
    for &id in &order {
        for section in &doc.entry(id).administrative {
            root.push_child(administrative_element(names, section));
        }
    }
    for section in &preserved.detached_administrative {
        root.push_child(administrative_element(names, section));
    }
    if let Some(file_sec) = file_sec(doc, names, &href_name, &order) {
        root.push_child(file_sec);
    }
    let mut struct_map = preserved.struct_map.clone();
    for &id in doc.roots() {
        struct_map.push_child(div_element(doc, names, id));
    }
    root.push_child(struct_map);
    for el in &preserved.passthrough {
        root.push_child(el.clone());
    }
    root
}

fn header(doc: &Document, names: &MetsNames, now: DateTime<Utc>) -> Option<Element> {
    let existing = doc.preserved.header.clone();
    if !doc.is_modified() {
        return existing;
    }
    let stamp = timestamp(now);
    let mut header = existing
        .unwrap_or_else(|| Element::new(names.name("metsHdr")).with_attr("CREATEDATE", &stamp));
    header.set_attr("LASTMODDATE", stamp);
    Some(header)
}

fn subsection_element(names: &MetsNames, sub: &Subsection) -> Element {
    let mut el = Element::new(names.name(sub.element.element_name())).with_attr("ID", &sub.id);
    if let Some(created) = &sub.created {
        el.set_attr("CREATED", created);
    }
    if let Some(status) = &sub.status {
        el.set_attr("STATUS", status.as_str());
    }
    el.attributes.extend(sub.extra_attributes.iter().cloned());
    el.with_child(sub.payload.clone())
}

fn administrative_element(names: &MetsNames, section: &MetadataSection) -> Element {
    let mut el = Element::new(names.name("amdSec"));
    if let Some(id) = &section.id {
        el.set_attr("ID", id);
    }
    el.attributes.extend(section.extra_attributes.iter().cloned());
    for sub in section.subsections() {
        el.push_child(subsection_element(names, sub));
    }
    el
}

fn file_sec(
    doc: &Document,
    names: &MetsNames,
    href_name: &str,
    order: &[EntryId],
) -> Option<Element> {
    let preserved = &doc.preserved;
    let mut groups: Vec<(String, Vec<(String, String)>, Vec<Element>)> = preserved
        .file_groups
        .iter()
        .map(|(use_name, attrs)| (use_name.clone(), attrs.clone(), Vec::new()))
        .collect();
    let mut place = |use_name: &str, file: Element| {
        if let Some(group) = groups.iter_mut().find(|(u, _, _)| u == use_name) {
            group.2.push(file);
        } else {
            groups.push((use_name.to_owned(), Vec::new(), vec![file]));
        }
    };
    for &id in order {
        let entry = doc.entry(id);
        if let Some(file) = file_element(names, href_name, entry) {
            let use_name = entry
                .use_category
                .as_ref()
                .map_or("", |u| u.as_str())
                .to_owned();
            place(&use_name, file);
        }
    }
    for (use_name, file) in &preserved.orphan_files {
        place(use_name, file.clone());
    }

    let mut sec = Element::new(names.name("fileSec"));
    sec.attributes.clone_from(&preserved.file_sec_attributes);
    for (use_name, attrs, files) in groups {
        if files.is_empty() {
            continue;
        }
        let mut group = Element::new(names.name("fileGrp"));
        if !use_name.is_empty() {
            group.set_attr("USE", use_name);
        }
        group.attributes.extend(attrs);
        for file in files {
            group.push_child(file);
        }
        sec.push_child(group);
    }
    sec.has_child_elements().then_some(sec)
}

fn file_element(names: &MetsNames, href_name: &str, entry: &DocumentEntry) -> Option<Element> {
    let file_id = entry.file_id.as_ref()?;
    let mut el = Element::new(names.name("file")).with_attr("ID", file_id);
    if let Some(group_id) = &entry.group_id {
        el.set_attr("GROUPID", group_id);
    }
    let admids: Vec<&str> = entry
        .administrative
        .iter()
        .filter_map(|s| s.id.as_deref())
        .collect();
    if !admids.is_empty() {
        el.set_attr("ADMID", admids.join(" "));
    }
    el.attributes
        .extend(entry.file_xml.attributes.iter().cloned());
    if let Some(path) = &entry.path {
        let mut locator = Element::new(names.name("FLocat")).with_attr(href_name, path);
        locator
            .attributes
            .extend(entry.file_xml.locator_attributes.iter().cloned());
        el.push_child(locator);
    }
    for child in &entry.file_xml.extra_children {
        el.push_child(child.clone());
    }
    Some(el)
}

fn div_element(doc: &Document, names: &MetsNames, id: EntryId) -> Element {
    let entry = doc.entry(id);
    let mut div = Element::new(names.name("div")).with_attr("TYPE", entry.kind.as_str());
    if let Some(label) = &entry.label {
        div.set_attr("LABEL", label);
    }
    let dmdids: Vec<&str> = entry
        .descriptive
        .subsections()
        .iter()
        .map(|s| s.id.as_str())
        .collect();
    if !dmdids.is_empty() {
        div.set_attr("DMDID", dmdids.join(" "));
    }
    div.attributes.extend(entry.div_attributes.iter().cloned());
    if let Some(file_id) = &entry.file_id {
        div.push_child(Element::new(names.name("fptr")).with_attr("FILEID", file_id));
    }
    for &child in entry.children() {
        div.push_child(div_element(doc, names, child));
    }
    div
}
