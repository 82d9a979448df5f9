//! Dublin Core and custom descriptive payloads.

use reingest_store::DublinCoreFields;
use reingest_xml::Element;

use super::{XSI_NS, wrap};
use crate::model::MetsNames;

const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
const DCTERMS_SCHEMA: &str =
    "http://purl.org/dc/terms/ http://dublincore.org/schemas/xmls/qdc/2008/02/11/dcterms.xsd";

fn dublin_core_root() -> Element {
    Element::new("dcterms:dublincore")
        .with_attr("xmlns:dcterms", DCTERMS_NS)
        .with_attr("xmlns:dc", DC_NS)
        .with_attr("xmlns:xsi", XSI_NS)
        .with_attr("xsi:schemaLocation", DCTERMS_SCHEMA)
}

/// A `DC` payload carrying every non-blank field.
#[must_use]
pub fn dublin_core(names: &MetsNames, fields: &DublinCoreFields) -> Element {
    let mut dc = dublin_core_root();
    for (name, value) in fields.entries() {
        dc = dc.with_text_child(name, value.filter(|v| !v.trim().is_empty()));
    }
    wrap(names, "DC", None, [dc])
}

/// An empty `DC` payload, recording that descriptive metadata was removed.
#[must_use]
pub fn withdrawn_dublin_core(names: &MetsNames) -> Element {
    wrap(names, "DC", None, [dublin_core_root()])
}

enum Block {
    DublinCore(Element),
    Custom(Vec<Element>),
}

/// Payloads for one side-metadata row, in order of each block's first column.
///
/// `dc.*` and `dcterms.*` columns form a Dublin Core block. Every other
/// column goes into a `CUSTOM` block of plain elements named after the
/// column.
#[must_use]
pub fn side_metadata(names: &MetsNames, fields: &[(String, String)]) -> Vec<Element> {
    let mut blocks: Vec<Block> = Vec::new();
    for (key, value) in fields {
        if value.trim().is_empty() {
            continue;
        }
        let dc_name = key
            .strip_prefix("dc.")
            .map(|term| format!("dc:{}", element_name(term)))
            .or_else(|| {
                key.strip_prefix("dcterms.")
                    .map(|term| format!("dcterms:{}", element_name(term)))
            });
        match dc_name {
            Some(name) => {
                let el = Element::new(name).with_text(value);
                if let Some(Block::DublinCore(dc)) =
                    blocks.iter_mut().find(|b| matches!(b, Block::DublinCore(_)))
                {
                    dc.push_child(el);
                } else {
                    blocks.push(Block::DublinCore(dublin_core_root().with_child(el)));
                }
            }
            None => {
                let el = Element::new(element_name(key)).with_text(value);
                if let Some(Block::Custom(items)) =
                    blocks.iter_mut().find(|b| matches!(b, Block::Custom(_)))
                {
                    items.push(el);
                } else {
                    blocks.push(Block::Custom(vec![el]));
                }
            }
        }
    }
    blocks
        .into_iter()
        .map(|block| match block {
            Block::DublinCore(dc) => wrap(names, "DC", None, [dc]),
            Block::Custom(items) => wrap(names, "OTHER", Some("CUSTOM"), items),
        })
        .collect()
}

/// Turn a column header into a usable XML element name.
fn element_name(raw: &str) -> String {
    let mut name: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !name.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        name.insert(0, '_');
    }
    name
}
