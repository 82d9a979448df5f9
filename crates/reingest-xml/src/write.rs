//! Pretty-printed serialization.
//!
//! Output is deterministic: the same tree always produces the same bytes, and
//! re-parsing the output yields an equal tree. That property is what lets a
//! caller compare two runs byte-for-byte.

use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::element::{Element, Node};
use crate::error::XmlError;

const INDENT_WIDTH: usize = 2;

/// Serialize a whole document with an XML declaration, two-space indentation
/// and a trailing newline.
///
/// # Errors
/// Returns [`XmlError::Write`] if the writer fails.
pub fn write_document(root: &Element) -> Result<Vec<u8>, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_WIDTH);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_error)?;
    write_element(&mut writer, root)?;
    let mut out = writer.into_inner();
    out.push(b'\n');
    Ok(out)
}

/// Serialize a single element (no declaration) as an indented string.
///
/// # Errors
/// Returns [`XmlError`] if the writer fails.
pub fn to_pretty_string(element: &Element) -> Result<String, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_WIDTH);
    write_element(&mut writer, element)?;
    String::from_utf8(writer.into_inner()).map_err(|_| XmlError::InvalidUtf8 { context: "output" })
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(write_error);
    }

    writer.write_event(Event::Start(start)).map_err(write_error)?;
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(writer, e)?,
            Node::Text(t) => writer
                .write_event(Event::Text(BytesText::new(t)))
                .map_err(write_error)?,
            Node::CData(t) => writer
                .write_event(Event::CData(BytesCData::new(t.as_str())))
                .map_err(write_error)?,
            Node::Comment(t) => writer
                .write_event(Event::Comment(BytesText::from_escaped(t.as_str())))
                .map_err(write_error)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(write_error)
}

fn write_error(err: impl std::fmt::Display) -> XmlError {
    XmlError::Write {
        message: err.to_string(),
    }
}
