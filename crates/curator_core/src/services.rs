//! Collaborator contracts
//!
//! The pipeline never talks to the OS or the renderer directly; it goes
//! through these traits. Production implementations wrap the platform's
//! title-management calls, tests plug in mocks.

use crate::entry::{StorageTier, TierSizes};
use crate::error::CoreError;
use crate::icon::IconHandle;

/// Basic per-title metadata returned by [`MetadataSource::basic_info`].
#[derive(Debug, Clone)]
pub struct TitleInfo {
    pub name: String,
    /// Raw icon bytes when the metadata cache (or the authoritative
    /// source) had them; `None` means the entry loads without an icon.
    pub icon_bytes: Option<Vec<u8>>,
}

/// Paged enumeration of installed title identifiers.
///
/// `list_page` must tolerate arbitrarily large catalogs: callers pass an
/// offset cursor and read until an empty page comes back.
pub trait TitleRegistry: Send + Sync {
    fn list_page(&self, offset: usize, limit: usize) -> Result<Vec<u64>, CoreError>;
}

/// Per-title metadata and occupied-size queries.
///
/// Implementations may consult an opaque metadata cache first and fall back
/// to the slower authoritative source on a miss.
pub trait MetadataSource: Send + Sync {
    fn basic_info(&self, id: u64) -> Result<TitleInfo, CoreError>;
    fn occupied_size(&self, id: u64) -> Result<TierSizes, CoreError>;
}

/// Complete removal of one installed title.
pub trait RemovalService: Send + Sync {
    fn remove_completely(&self, id: u64) -> Result<(), CoreError>;
}

/// Decoded-icon lifecycle, owned by the rendering collaborator.
///
/// `decode` turns validated icon bytes into an opaque handle; `release`
/// frees it. `IconHandle::PLACEHOLDER` is shared and never released.
pub trait IconRenderer: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<IconHandle, CoreError>;
    fn release(&self, handle: IconHandle);
}

/// Total/free space for one storage tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierSpace {
    pub total: u64,
    pub free: u64,
}

impl TierSpace {
    pub fn used(&self) -> u64 {
        self.total.saturating_sub(self.free)
    }
}

/// Device-level space queries for the status display.
pub trait StorageProbe: Send + Sync {
    fn space(&self, tier: StorageTier) -> Result<TierSpace, CoreError>;
}
