//! The owned element tree.

use std::fmt;

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A child of an [`Element`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// A nested element.
    Element(Element),
    /// Character data, already unescaped.
    Text(String),
    /// A CDATA section, kept distinct so it round-trips as CDATA.
    CData(String),
    /// A comment body (without the `<!--` / `-->` delimiters).
    Comment(String),
}

impl Node {
    /// The element inside this node, if it is one.
    #[must_use]
    pub const fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(e) => Some(e),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Element
// ---------------------------------------------------------------------------

/// An XML element with its qualified name, attributes in document order, and
/// children.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    /// Qualified name exactly as written, e.g. `mets:dmdSec`.
    pub name: String,
    /// Attributes in document order. Values are unescaped.
    pub attributes: Vec<(String, String)>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

/// The part of a qualified name after the prefix.
#[must_use]
pub fn local_name(qualified: &str) -> &str {
    qualified
        .rsplit_once(':')
        .map_or(qualified, |(_, local)| local)
}

impl Element {
    /// Create an element with no attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder: set an attribute.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder: append a child element.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Builder: append a text node.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Builder: append `<name>text</name>` when `text` is present and non-empty.
    #[must_use]
    pub fn with_text_child(self, name: &str, text: Option<&str>) -> Self {
        match text {
            Some(t) if !t.is_empty() => self.with_child(Self::new(name).with_text(t)),
            _ => self,
        }
    }

    /// The local part of this element's name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Look up an attribute by its qualified name.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place so attribute
    /// order stays stable.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.attributes.push((key, value));
        }
    }

    /// Remove an attribute, returning its old value.
    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == key)?;
        Some(self.attributes.remove(pos).1)
    }

    /// Append a child element.
    pub fn push_child(&mut self, child: Self) {
        self.children.push(Node::Element(child));
    }

    /// Iterate over direct child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Mutable iteration over direct child elements.
    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Self> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First direct child with the given local name.
    #[must_use]
    pub fn find_child(&self, local: &str) -> Option<&Self> {
        self.child_elements().find(|e| e.local_name() == local)
    }

    /// All direct children with the given local name.
    pub fn find_children<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.child_elements().filter(move |e| e.local_name() == local)
    }

    /// Depth-first pre-order iterator over this element and every descendant
    /// element.
    #[must_use]
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// First descendant (including `self`) with the given local name.
    #[must_use]
    pub fn find_descendant(&self, local: &str) -> Option<&Self> {
        self.descendants().find(|e| e.local_name() == local)
    }

    /// Concatenated text and CDATA of the direct children, trimmed.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(t) | Node::CData(t) => out.push_str(t),
                _ => {}
            }
        }
        out.trim().to_owned()
    }

    /// Text of the first descendant with the given local name, if non-empty.
    #[must_use]
    pub fn descendant_text(&self, local: &str) -> Option<String> {
        self.descendants()
            .filter(|e| e.local_name() == local)
            .map(Self::text)
            .find(|t| !t.is_empty())
    }

    /// Whether the element has at least one child element.
    #[must_use]
    pub fn has_child_elements(&self) -> bool {
        self.children.iter().any(|n| matches!(n, Node::Element(_)))
    }

    /// Drop whitespace-only text nodes from elements that also hold child
    /// elements. Indentation in element-only content carries no data.
    pub(crate) fn strip_ignorable_whitespace(&mut self) {
        if self.has_child_elements() {
            self.children
                .retain(|n| !matches!(n, Node::Text(t) if t.trim().is_empty()));
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match crate::write::to_pretty_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}

// ---------------------------------------------------------------------------
// Descendants
// ---------------------------------------------------------------------------

/// Iterator returned by [`Element::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        // Push in reverse so the first child is visited first.
        let children: Vec<&Element> = next.child_elements().collect();
        self.stack.extend(children.into_iter().rev());
        Some(next)
    }
}
