//! The whole METS document as an editable model.

use reingest_xml::Element;

use super::entry::{DocumentEntry, EntryId, EntryKind, UseCategory};
use super::identity::{IdentityIndex, IdentityKey};
use super::ids::{IdAllocator, IdKind};
use super::section::{MetadataSection, Subsection};

/// Qualified-name helper for the document's METS prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetsNames {
    prefix: String,
}

impl MetsNames {
    /// Names with the given prefix (`"mets"`), or unprefixed when empty.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The qualified form of a METS local name.
    #[must_use]
    pub fn name(&self, local: &str) -> String {
        if self.prefix.is_empty() {
            local.to_owned()
        } else {
            format!("{}:{local}", self.prefix)
        }
    }
}

impl Default for MetsNames {
    fn default() -> Self {
        Self::new("mets")
    }
}

/// Parts of the source document the model carries without interpreting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Preserved {
    /// Comments ahead of the root element.
    pub leading_comments: Vec<String>,
    /// The root element's name and attributes (children ignored).
    pub root: Element,
    /// `metsHdr`, if present.
    pub header: Option<Element>,
    /// `fileSec` attributes.
    pub file_sec_attributes: Vec<(String, String)>,
    /// File group `USE` values in first-seen order, with their attributes.
    pub file_groups: Vec<(String, Vec<(String, String)>)>,
    /// `mets:file` elements no structural entry points at, keyed by group.
    pub orphan_files: Vec<(String, Element)>,
    /// Qualified name of the locator href attribute, when one was seen.
    pub href_name: Option<String>,
    /// The physical `structMap`'s name and attributes (children ignored).
    pub struct_map: Element,
    /// `dmdSec` elements no entry references.
    pub detached_descriptive: Vec<Subsection>,
    /// `amdSec` elements no entry references.
    pub detached_administrative: Vec<MetadataSection>,
    /// Top-level elements the model does not interpret, in document order.
    pub passthrough: Vec<Element>,
}

/// An editable METS document.
///
/// Entries live in an arena and refer to each other by [`EntryId`]. Entries
/// are never removed; deletion is modelled as a tombstone.
#[derive(Clone, Debug)]
pub struct Document {
    names: MetsNames,
    entries: Vec<DocumentEntry>,
    roots: Vec<EntryId>,
    ids: IdAllocator,
    index: IdentityIndex,
    modified: bool,
    pub(crate) preserved: Preserved,
}

impl Document {
    pub(crate) fn from_parts(
        names: MetsNames,
        entries: Vec<DocumentEntry>,
        roots: Vec<EntryId>,
        ids: IdAllocator,
        preserved: Preserved,
    ) -> Self {
        let mut index = IdentityIndex::default();
        for (i, entry) in entries.iter().enumerate() {
            index.insert(EntryId(i), entry);
        }
        Self {
            names,
            entries,
            roots,
            ids,
            index,
            modified: false,
            preserved,
        }
    }

    /// An empty document with a bare physical map.
    #[must_use]
    pub fn empty() -> Self {
        let names = MetsNames::default();
        let preserved = Preserved {
            root: Element::new(names.name("mets")),
            struct_map: Element::new(names.name("structMap")).with_attr("TYPE", "physical"),
            ..Preserved::default()
        };
        Self::from_parts(names, Vec::new(), Vec::new(), IdAllocator::new(), preserved)
    }

    #[must_use]
    pub const fn names(&self) -> &MetsNames {
        &self.names
    }

    // -----------------------------------------------------------------------
    // Entries
    // -----------------------------------------------------------------------

    /// # Panics
    /// Panics if `id` does not belong to this document.
    #[must_use]
    pub fn entry(&self, id: EntryId) -> &DocumentEntry {
        &self.entries[id.0]
    }

    /// Mutable access to an entry's metadata. Location changes must go
    /// through [`Document::tombstone`] so the identity index stays current.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this document.
    pub fn entry_mut(&mut self, id: EntryId) -> &mut DocumentEntry {
        &mut self.entries[id.0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-level entries of the physical map.
    #[must_use]
    pub fn roots(&self) -> &[EntryId] {
        &self.roots
    }

    /// Every entry in structural pre-order.
    #[must_use]
    pub fn pre_order(&self) -> Vec<EntryId> {
        let mut out = Vec::with_capacity(self.entries.len());
        let mut stack: Vec<EntryId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.entry(id).children.iter().rev().copied());
        }
        out
    }

    /// Items whose file lives in the given group, in pre-order.
    #[must_use]
    pub fn entries_with_use(&self, use_category: &UseCategory) -> Vec<EntryId> {
        self.pre_order()
            .into_iter()
            .filter(|&id| self.entry(id).use_category.as_ref() == Some(use_category))
            .collect()
    }

    /// The first directory with `label`, in pre-order.
    #[must_use]
    pub fn find_directory(&self, label: &str) -> Option<EntryId> {
        self.pre_order().into_iter().find(|&id| {
            let e = self.entry(id);
            e.is_directory() && e.label.as_deref() == Some(label)
        })
    }

    /// The child directory of `parent` with `label`.
    #[must_use]
    pub fn child_directory(&self, parent: EntryId, label: &str) -> Option<EntryId> {
        self.entry(parent).children.iter().copied().find(|&id| {
            let e = self.entry(id);
            e.is_directory() && e.label.as_deref() == Some(label)
        })
    }

    /// Whether `id` is `ancestor` or lies beneath it.
    #[must_use]
    pub fn is_within(&self, id: EntryId, ancestor: EntryId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.entry(current).parent;
        }
        false
    }

    /// Attach a new entry as the last child of `parent` (or as a new root).
    ///
    /// Returns the new entry's id. Any children already recorded on `entry`
    /// are discarded; the new entry is always a leaf.
    pub fn add_entry(&mut self, parent: Option<EntryId>, mut entry: DocumentEntry) -> EntryId {
        let id = EntryId(self.entries.len());
        entry.parent = parent;
        entry.children.clear();
        for section in &entry.administrative {
            if let Some(amd) = &section.id {
                self.ids.observe(amd);
            }
            for sub in section.subsections() {
                self.ids.observe(&sub.id);
            }
        }
        for sub in entry.descriptive.subsections() {
            self.ids.observe(&sub.id);
        }
        if let Some(file_id) = &entry.file_id {
            self.ids.observe(file_id);
        }
        self.index.insert(id, &entry);
        self.entries.push(entry);
        match parent {
            Some(p) => self.entries[p.0].children.push(id),
            None => self.roots.push(id),
        }
        self.modified = true;
        id
    }

    /// Find `label` under `parent`, creating a directory if needed.
    pub fn ensure_child_directory(&mut self, parent: EntryId, label: &str) -> (EntryId, bool) {
        match self.child_directory(parent, label) {
            Some(id) => (id, false),
            None => (self.add_entry(Some(parent), DocumentEntry::directory(label)), true),
        }
    }

    /// Mark an entry deleted: clear its label and locator and move its file
    /// to the `deleted` group. Returns `false` if it already was.
    pub fn tombstone(&mut self, id: EntryId) -> bool {
        let entry = &mut self.entries[id.0];
        if entry.is_tombstone() {
            return false;
        }
        entry.label = None;
        entry.path = None;
        entry.use_category = Some(UseCategory::Deleted);
        entry.kind = EntryKind::Item;
        self.index.forget_locations(id);
        self.modified = true;
        true
    }

    // -----------------------------------------------------------------------
    // Identity and identifiers
    // -----------------------------------------------------------------------

    /// Resolve a record to an entry.
    #[must_use]
    pub fn resolve(&self, key: &IdentityKey<'_>) -> Option<EntryId> {
        self.index.resolve(key)
    }

    /// The entry currently located at `location`, ignoring original
    /// locations and suffix matches.
    #[must_use]
    pub fn resolve_current(&self, location: &str) -> Option<EntryId> {
        self.index.resolve_current(location)
    }

    /// Mint a document-unique identifier.
    pub fn mint_id(&mut self, kind: IdKind) -> String {
        self.ids.mint(kind)
    }

    // -----------------------------------------------------------------------
    // Change tracking
    // -----------------------------------------------------------------------

    /// Record that the document content changed.
    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    /// Whether anything changed since the document was loaded.
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.modified
    }
}
