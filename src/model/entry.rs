//! Structural entries: the directories and items of the physical map.

use std::fmt;

use reingest_xml::Element;
use uuid::Uuid;

use super::section::MetadataSection;

/// Index of an entry in its [`Document`](super::Document).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) usize);

/// The `TYPE` of a structural `div`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Directory,
    Item,
    Other(String),
}

impl EntryKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Directory => "Directory",
            Self::Item => "Item",
            Self::Other(s) => s,
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "Directory" => Self::Directory,
            "Item" => Self::Item,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// The `USE` of the file group an item's file lives in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum UseCategory {
    Original,
    Metadata,
    Deleted,
    Other(String),
}

impl UseCategory {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Original => "original",
            Self::Metadata => "metadata",
            Self::Deleted => "deleted",
            Self::Other(s) => s,
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "original" => Self::Original,
            "metadata" => Self::Metadata,
            "deleted" => Self::Deleted,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for UseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `mets:file` behind an item, minus what the entry models directly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileRecordXml {
    /// `mets:file` attributes other than `ID`, `GROUPID` and `ADMID`.
    pub attributes: Vec<(String, String)>,
    /// `FLocat` attributes other than the href.
    pub locator_attributes: Vec<(String, String)>,
    /// Children of `mets:file` other than `FLocat`.
    pub extra_children: Vec<Element>,
}

/// One directory or item in the physical structural map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentEntry {
    pub kind: EntryKind,
    /// `LABEL`; absent on tombstones.
    pub label: Option<String>,
    /// Stable content identifier, from the `file-<uuid>` file ID.
    pub content_id: Option<Uuid>,
    /// Package-relative path from the file locator.
    pub path: Option<String>,
    /// Location the file had when it first entered the system.
    pub original_location: Option<String>,
    pub use_category: Option<UseCategory>,
    /// `ID` of the `mets:file`.
    pub file_id: Option<String>,
    /// `GROUPID` of the `mets:file`.
    pub group_id: Option<String>,
    /// Serialization details of the `mets:file`.
    pub file_xml: FileRecordXml,
    /// `div` attributes other than `TYPE`, `LABEL` and `DMDID`.
    pub div_attributes: Vec<(String, String)>,
    pub descriptive: MetadataSection,
    pub administrative: Vec<MetadataSection>,
    pub(crate) parent: Option<EntryId>,
    pub(crate) children: Vec<EntryId>,
}

impl DocumentEntry {
    pub(crate) fn bare(kind: EntryKind, label: Option<String>) -> Self {
        Self {
            kind,
            label,
            content_id: None,
            path: None,
            original_location: None,
            use_category: None,
            file_id: None,
            group_id: None,
            file_xml: FileRecordXml::default(),
            div_attributes: Vec::new(),
            descriptive: MetadataSection::descriptive(),
            administrative: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// A directory entry.
    pub fn directory(label: impl Into<String>) -> Self {
        Self::bare(EntryKind::Directory, Some(label.into()))
    }

    /// An item entry backed by a file.
    pub fn item(
        label: impl Into<String>,
        content_id: Uuid,
        path: impl Into<String>,
        use_category: UseCategory,
    ) -> Self {
        let mut entry = Self::bare(EntryKind::Item, Some(label.into()));
        entry.content_id = Some(content_id);
        entry.path = Some(path.into());
        entry.use_category = Some(use_category);
        entry.file_id = Some(format!("file-{content_id}"));
        entry.group_id = Some(format!("Group-{content_id}"));
        entry
    }

    /// Builder: attach an administrative section.
    #[must_use]
    pub fn with_administrative(mut self, section: MetadataSection) -> Self {
        self.administrative.push(section);
        self
    }

    #[must_use]
    pub const fn parent(&self) -> Option<EntryId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[EntryId] {
        &self.children
    }

    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Whether the entry has been marked deleted.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.use_category == Some(UseCategory::Deleted)
    }

    /// The administrative section new subsections are appended to.
    #[must_use]
    pub fn primary_administrative(&self) -> Option<&MetadataSection> {
        self.administrative.first()
    }

    pub fn primary_administrative_mut(&mut self) -> Option<&mut MetadataSection> {
        self.administrative.first_mut()
    }

    /// Something to call the entry by in log lines and error messages.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.path
            .clone()
            .or_else(|| self.label.clone())
            .or_else(|| self.content_id.map(|id| id.to_string()))
            .or_else(|| self.file_id.clone())
            .unwrap_or_else(|| "<unlabelled>".to_owned())
    }
}
