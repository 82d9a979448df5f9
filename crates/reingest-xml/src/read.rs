//! Parsing text into an [`Element`] tree.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::element::{Element, Node};
use crate::error::XmlError;

/// A parsed document: its root element plus any comments that preceded it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlDocument {
    /// Comments that appeared before the root element.
    pub leading_comments: Vec<String>,
    /// The document element.
    pub root: Element,
}

/// Parse a complete document.
///
/// Whitespace-only text between elements is discarded; all other text is kept
/// verbatim (unescaped). Processing instructions and the doctype are dropped.
///
/// # Errors
/// Returns [`XmlError`] if the input is not well-formed.
pub fn parse_document(input: &str) -> Result<XmlDocument, XmlError> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut leading_comments = Vec::new();

    loop {
        let position = position_of(&reader);
        let event = reader
            .read_event()
            .map_err(|e| malformed(position, e))?;
        match event {
            Event::Start(start) => stack.push(open_element(&start, position)?),
            Event::Empty(start) => {
                let element = open_element(&start, position)?;
                attach(&mut stack, &mut root, element, position)?;
            }
            Event::End(_) => {
                let Some(mut element) = stack.pop() else {
                    return Err(malformed(position, "closing tag without an open element"));
                };
                element.strip_ignorable_whitespace();
                attach(&mut stack, &mut root, element, position)?;
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    let text = text.unescape().map_err(|e| malformed(position, e))?;
                    push_text(parent, &text);
                }
            }
            Event::CData(cdata) => {
                if let Some(parent) = stack.last_mut() {
                    let body = String::from_utf8(cdata.into_inner().into_owned())
                        .map_err(|_| XmlError::InvalidUtf8 { context: "CDATA" })?;
                    parent.children.push(Node::CData(body));
                }
            }
            Event::Comment(comment) => {
                let body = String::from_utf8(comment.to_vec())
                    .map_err(|_| XmlError::InvalidUtf8 { context: "comment" })?;
                match (stack.last_mut(), &root) {
                    (Some(parent), _) => parent.children.push(Node::Comment(body)),
                    (None, None) => leading_comments.push(body),
                    (None, Some(_)) => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::UnexpectedEof {
            open: open.name.clone(),
        });
    }
    let root = root.ok_or(XmlError::NoRoot)?;
    Ok(XmlDocument {
        leading_comments,
        root,
    })
}

/// Parse a single element, e.g. a metadata payload fragment.
///
/// # Errors
/// Returns [`XmlError`] if the input is not a well-formed element.
pub fn parse_element(input: &str) -> Result<Element, XmlError> {
    parse_document(input).map(|doc| doc.root)
}

fn open_element(start: &BytesStart<'_>, position: u64) -> Result<Element, XmlError> {
    let name = String::from_utf8(start.name().as_ref().to_vec())
        .map_err(|_| XmlError::InvalidUtf8 { context: "element name" })?;
    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| malformed(position, e))?;
        let key = String::from_utf8(attr.key.as_ref().to_vec())
            .map_err(|_| XmlError::InvalidUtf8 { context: "attribute name" })?;
        let value = attr
            .unescape_value()
            .map_err(|e| malformed(position, e))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
    position: u64,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(malformed(position, "more than one root element"));
    }
    *root = Some(element);
    Ok(())
}

fn push_text(parent: &mut Element, text: &str) {
    if let Some(Node::Text(previous)) = parent.children.last_mut() {
        previous.push_str(text);
    } else {
        parent.children.push(Node::Text(text.to_owned()));
    }
}

fn position_of(reader: &Reader<&[u8]>) -> u64 {
    u64::try_from(reader.buffer_position()).unwrap_or(u64::MAX)
}

fn malformed(position: u64, err: impl std::fmt::Display) -> XmlError {
    XmlError::Malformed {
        position,
        message: err.to_string(),
    }
}
