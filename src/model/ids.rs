//! Document-unique identifier allocation.
//!
//! METS `ID` attributes share one namespace across the whole document. The
//! allocator is seeded with every ID already present and then mints
//! `<prefix><n>` identifiers, continuing each prefix's numbering from the
//! highest suffix seen and skipping anything already taken.

use std::collections::HashSet;

/// The families of identifiers the engine mints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdKind {
    DmdSec,
    AmdSec,
    TechMd,
    RightsMd,
    SourceMd,
    DigiprovMd,
}

impl IdKind {
    const ALL: [Self; 6] = [
        Self::DmdSec,
        Self::AmdSec,
        Self::TechMd,
        Self::RightsMd,
        Self::SourceMd,
        Self::DigiprovMd,
    ];

    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::DmdSec => "dmdSec_",
            Self::AmdSec => "amdSec_",
            Self::TechMd => "techMD_",
            Self::RightsMd => "rightsMD_",
            Self::SourceMd => "sourceMD_",
            Self::DigiprovMd => "digiprovMD_",
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::DmdSec => 0,
            Self::AmdSec => 1,
            Self::TechMd => 2,
            Self::RightsMd => 3,
            Self::SourceMd => 4,
            Self::DigiprovMd => 5,
        }
    }
}

/// Mints identifiers that collide with nothing in the document.
#[derive(Clone, Debug)]
pub struct IdAllocator {
    taken: HashSet<String>,
    next: [u64; 6],
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            taken: HashSet::new(),
            next: [1; 6],
        }
    }

    /// Record an identifier already present in the document.
    pub fn observe(&mut self, id: &str) {
        for kind in IdKind::ALL {
            if let Some(n) = id
                .strip_prefix(kind.prefix())
                .and_then(|suffix| suffix.parse::<u64>().ok())
            {
                let slot = &mut self.next[kind.slot()];
                *slot = (*slot).max(n.saturating_add(1));
            }
        }
        self.taken.insert(id.to_owned());
    }

    /// Whether `id` is already in use.
    #[must_use]
    pub fn is_taken(&self, id: &str) -> bool {
        self.taken.contains(id)
    }

    /// Allocate a fresh identifier of `kind`.
    pub fn mint(&mut self, kind: IdKind) -> String {
        loop {
            let slot = &mut self.next[kind.slot()];
            let candidate = format!("{}{}", kind.prefix(), *slot);
            *slot += 1;
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn continues_from_highest_suffix() {
        let mut ids = IdAllocator::new();
        for id in ["dmdSec_1", "dmdSec_7", "amdSec_2", "file-abc"] {
            ids.observe(id);
        }
        assert_eq!(ids.mint(IdKind::DmdSec), "dmdSec_8");
        assert_eq!(ids.mint(IdKind::DmdSec), "dmdSec_9");
        assert_eq!(ids.mint(IdKind::AmdSec), "amdSec_3");
        assert_eq!(ids.mint(IdKind::RightsMd), "rightsMD_1");
    }

    #[test]
    fn non_numeric_suffixes_are_still_reserved() {
        let mut ids = IdAllocator::new();
        ids.observe("techMD_x");
        assert!(ids.is_taken("techMD_x"));
        assert_eq!(ids.mint(IdKind::TechMd), "techMD_1");
    }

    proptest! {
        #[test]
        fn minted_ids_never_collide(
            existing in proptest::collection::vec(
                (0usize..6, 0u64..50).prop_map(|(k, n)| format!("{}{n}", IdKind::ALL[k].prefix())),
                0..40,
            ),
            mints in proptest::collection::vec(0usize..6, 1..30),
        ) {
            let mut ids = IdAllocator::new();
            for id in &existing {
                ids.observe(id);
            }
            let mut seen: HashSet<String> = existing.iter().cloned().collect();
            for k in mints {
                let id = ids.mint(IdKind::ALL[k]);
                prop_assert!(seen.insert(id));
            }
        }
    }
}
