//! Resolving change records to document entries.
//!
//! Records reach the engine carrying a content identifier, a location, or
//! both. Locations arrive in several spellings (`%SIPDirectory%objects/a.txt`,
//! `%transferDirectory%objects/a.txt`, `./objects/a.txt`), so every location
//! is normalized before comparison and, failing an exact match, compared by
//! whole-component suffix.

use std::collections::{BTreeSet, HashMap};

use uuid::Uuid;

use super::entry::{DocumentEntry, EntryId};

/// Strip the placeholder prefix (`%...%`), leading `./` and `/`, and any
/// trailing `/`.
#[must_use]
pub fn normalize_location(raw: &str) -> String {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix('%')
        && let Some(end) = rest.find('%')
    {
        s = &rest[end + 1..];
    }
    loop {
        if let Some(rest) = s.strip_prefix("./") {
            s = rest;
        } else if let Some(rest) = s.strip_prefix('/') {
            s = rest;
        } else {
            break;
        }
    }
    s.trim_end_matches('/').to_owned()
}

/// `true` when `suffix` equals the trailing path components of `full`.
fn is_component_suffix(full: &str, suffix: &str) -> bool {
    full.len() > suffix.len()
        && full.ends_with(suffix)
        && full.as_bytes()[full.len() - suffix.len() - 1] == b'/'
}

/// What a record knows about the entry it targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdentityKey<'a> {
    pub content_id: Option<Uuid>,
    pub location: Option<&'a str>,
}

impl<'a> IdentityKey<'a> {
    #[must_use]
    pub const fn content(id: Uuid) -> Self {
        Self {
            content_id: Some(id),
            location: None,
        }
    }

    #[must_use]
    pub const fn location(location: &'a str) -> Self {
        Self {
            content_id: None,
            location: Some(location),
        }
    }
}

/// Lookup tables from content identifiers and normalized locations to entries.
#[derive(Clone, Debug, Default)]
pub struct IdentityIndex {
    by_content: HashMap<Uuid, EntryId>,
    by_path: HashMap<String, EntryId>,
    by_original: HashMap<String, EntryId>,
}

impl IdentityIndex {
    /// Index an entry. The first entry registered under a key keeps it.
    pub fn insert(&mut self, id: EntryId, entry: &DocumentEntry) {
        if let Some(content) = entry.content_id {
            self.by_content.entry(content).or_insert(id);
        }
        if let Some(path) = entry.path.as_deref().map(normalize_location)
            && !path.is_empty()
        {
            self.by_path.entry(path).or_insert(id);
        }
        if let Some(original) = entry.original_location.as_deref().map(normalize_location)
            && !original.is_empty()
        {
            self.by_original.entry(original).or_insert(id);
        }
    }

    /// Drop the location keys pointing at `id`. The content key is kept.
    pub fn forget_locations(&mut self, id: EntryId) {
        self.by_path.retain(|_, e| *e != id);
        self.by_original.retain(|_, e| *e != id);
    }

    /// The entry whose current location is exactly `location`, after
    /// normalization. Original locations are not consulted.
    #[must_use]
    pub fn resolve_current(&self, location: &str) -> Option<EntryId> {
        self.by_path.get(&normalize_location(location)).copied()
    }

    /// Resolve a record to an entry.
    ///
    /// Tries the content identifier, then an exact normalized location, then
    /// a unique whole-component suffix match. Ambiguous suffix matches
    /// resolve to nothing.
    #[must_use]
    pub fn resolve(&self, key: &IdentityKey<'_>) -> Option<EntryId> {
        if let Some(content) = key.content_id
            && let Some(&id) = self.by_content.get(&content)
        {
            return Some(id);
        }
        let location = normalize_location(key.location?);
        if location.is_empty() {
            return None;
        }
        if let Some(&id) = self
            .by_path
            .get(&location)
            .or_else(|| self.by_original.get(&location))
        {
            return Some(id);
        }
        let hits: BTreeSet<EntryId> = self
            .by_path
            .iter()
            .chain(&self.by_original)
            .filter(|(known, _)| {
                is_component_suffix(known, &location) || is_component_suffix(&location, known)
            })
            .map(|(_, id)| *id)
            .collect();
        if hits.len() == 1 {
            hits.into_iter().next()
        } else {
            if hits.len() > 1 {
                tracing::warn!(%location, matches = hits.len(), "ambiguous location match");
            }
            None
        }
    }
}
