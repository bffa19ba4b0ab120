//! TitleCurator Core Domain Logic
//!
//! This crate contains:
//! - Catalog store and entry model
//! - Background catalog scan
//! - Priority load scheduler with a per-tick icon budget
//! - Viewport-driven icon prefetch
//! - Cancellable bulk deletion
//! - Collaborator contracts for the platform and the renderer
//! - Configuration

pub mod cancel;
pub mod config;
pub mod curator;
pub mod deletion;
pub mod entry;
pub mod error;
pub mod icon;
pub mod prefetch;
pub mod scanner;
pub mod scheduler;
pub mod services;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

pub use cancel::CancelToken;
pub use config::{CuratorConfig, LoaderConfig, ScanConfig};
pub use curator::{Curator, StorageOverview};
pub use deletion::{DeletionCoordinator, DeletionPhase, DoneCallback, ItemCallback, JobTotals};
pub use entry::{format_size, CatalogEntry, StorageTier, TierSizes};
pub use error::CoreError;
pub use icon::{is_valid_jpeg, DecodedIconStore, IconHandle};
pub use prefetch::{SelectionPrefetcher, ViewportPrefetcher};
pub use scanner::{CatalogScanner, ScanHandle};
pub use scheduler::{LoadScheduler, LoadTask, TaskCategory};
pub use services::{
    IconRenderer, MetadataSource, RemovalService, StorageProbe, TierSpace, TitleInfo,
    TitleRegistry,
};
pub use store::{CatalogStore, IconSwap, SortKey};

/// Initialize logging, the panic hook and the debug deadlock detector.
/// Call once at startup, before constructing a [`Curator`].
pub fn init_observability() -> anyhow::Result<()> {
    curator_log::init()
}
