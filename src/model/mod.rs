//! Document model: entries, metadata histories, identifiers.
//!
//! - [`Document`] owns the structural tree and everything hanging off it.
//! - [`DocumentEntry`] is one `div` of the physical map.
//! - [`MetadataSection`] / [`Subsection`] hold versioned metadata.
//! - [`IdAllocator`] mints collision-free `ID`s.
//! - [`IdentityIndex`] maps change records to entries.

pub mod document;
pub mod entry;
pub mod identity;
pub mod ids;
pub mod section;

pub use document::{Document, MetsNames, Preserved};
pub use entry::{DocumentEntry, EntryId, EntryKind, FileRecordXml, UseCategory};
pub use identity::{IdentityIndex, IdentityKey, normalize_location};
pub use ids::{IdAllocator, IdKind};
pub use section::{MdSecType, MetadataSection, Status, Subsection, SubsectionKind};
