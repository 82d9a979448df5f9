//! Builders for subsection payloads (`mdWrap` elements).
//!
//! Payloads are built deterministically from store records: the same record
//! always yields an equal [`Element`], which is what the mergers rely on to
//! recognise work that an earlier run already did.

pub mod dublin_core;
pub mod premis;

use reingest_xml::Element;

use crate::model::MetsNames;

pub use dublin_core::{dublin_core, side_metadata, withdrawn_dublin_core};
pub use premis::{
    agent, agent_identifier, event, event_identifier, file_object, rights_statement,
};

pub(crate) const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// `<mdWrap MDTYPE=...><xmlData>content</xmlData></mdWrap>`.
pub fn wrap(
    names: &MetsNames,
    md_type: &str,
    other_md_type: Option<&str>,
    content: impl IntoIterator<Item = Element>,
) -> Element {
    let mut md_wrap = Element::new(names.name("mdWrap")).with_attr("MDTYPE", md_type);
    if let Some(other) = other_md_type {
        md_wrap.set_attr("OTHERMDTYPE", other);
    }
    let mut data = Element::new(names.name("xmlData"));
    for el in content {
        data.push_child(el);
    }
    md_wrap.with_child(data)
}
