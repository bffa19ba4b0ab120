//! Catalog entry model

use crate::icon::IconHandle;
use serde::{Deserialize, Serialize};

/// One of the two physical storage classes a title can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageTier {
    /// Fast built-in store
    Internal,
    /// Removable store (memory card)
    Removable,
}

/// Per-tier occupied sizes for one title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierSizes {
    pub internal: u64,
    pub removable: u64,
}

impl TierSizes {
    pub fn new(internal: u64, removable: u64) -> Self {
        Self { internal, removable }
    }

    /// Total bytes across both tiers.
    pub fn total(&self) -> u64 {
        self.internal + self.removable
    }
}

/// One installed title's display/size/icon record.
///
/// The entry owns its raw icon bytes; the decoded icon handle belongs to the
/// rendering collaborator and is only released by whoever set `owns_icon`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Opaque title identifier, unique within the catalog
    pub id: u64,

    /// Display name (sentinel text for corrupted installs)
    pub name: String,

    /// Occupied sizes per storage tier
    pub sizes: TierSizes,

    /// Decoded icon reference, `IconHandle::PLACEHOLDER` until a load succeeds
    pub icon: IconHandle,

    /// True only when this entry's own decode produced `icon`
    pub owns_icon: bool,

    /// Raw icon bytes cached at scan time, read-only afterwards
    pub icon_bytes: Vec<u8>,

    /// Whether `icon_bytes` holds usable data
    pub has_icon_bytes: bool,

    /// Marked for removal by the user
    pub selected: bool,

    /// Metadata fetch failed; zero size, placeholder icon, never prefetched
    pub corrupted: bool,
}

impl CatalogEntry {
    pub fn new(id: u64, name: String, sizes: TierSizes) -> Self {
        Self {
            id,
            name,
            sizes,
            icon: IconHandle::PLACEHOLDER,
            owns_icon: false,
            icon_bytes: Vec::new(),
            has_icon_bytes: false,
            selected: false,
            corrupted: false,
        }
    }

    /// Sentinel entry for an identifier whose metadata could not be read.
    /// It stays visible so the user can still select and remove it.
    pub fn corrupted(id: u64) -> Self {
        let mut entry = Self::new(id, "Corrupted installation".to_string(), TierSizes::default());
        entry.corrupted = true;
        entry
    }

    /// Attach raw icon bytes fetched from the metadata source.
    pub fn with_icon_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.has_icon_bytes = !bytes.is_empty();
        self.icon_bytes = bytes;
        self
    }

    /// Has a non-placeholder icon been installed?
    pub fn has_loaded_icon(&self) -> bool {
        self.icon != IconHandle::PLACEHOLDER
    }
}

/// Format a byte count for status display: one decimal in GB or MB,
/// empty string for zero.
pub fn format_size(size_bytes: u64) -> String {
    const GIB: f64 = 0x4000_0000u64 as f64;
    const MIB: f64 = 0x10_0000u64 as f64;

    if size_bytes == 0 {
        return String::new();
    }

    let gb = size_bytes as f64 / GIB;
    if gb >= 1.0 {
        format!("{:.1} GB", gb)
    } else {
        format!("{:.1} MB", size_bytes as f64 / MIB)
    }
}
