//! Catalog manager facade
//!
//! Owns the store, the scheduler, both prefetchers, the scanner and the
//! deletion coordinator, wired from one config. The consumer thread drives
//! it: `run_tick` once per frame, `request_prefetch` on scroll input, the
//! scan and deletion entry points on user actions. Everything here is
//! `&self`; internal locks make the facade shareable behind an `Arc`.

use crate::config::CuratorConfig;
use crate::deletion::{DeletionCoordinator, DeletionPhase, DoneCallback, ItemCallback};
use crate::entry::StorageTier;
use crate::error::CoreError;
use crate::prefetch::{SelectionPrefetcher, ViewportPrefetcher};
use crate::scanner::{CatalogScanner, ScanHandle};
use crate::scheduler::LoadScheduler;
use crate::services::{
    IconRenderer, MetadataSource, RemovalService, StorageProbe, TierSpace, TitleRegistry,
};
use crate::store::{CatalogStore, SortKey};
use parking_lot::Mutex;
use std::sync::Arc;

/// Per-tier space snapshot for the status display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageOverview {
    pub internal: TierSpace,
    pub removable: TierSpace,
}

pub struct Curator {
    store: Arc<CatalogStore>,
    scheduler: Arc<LoadScheduler>,
    storage: Arc<dyn StorageProbe>,
    scanner: CatalogScanner,
    scan: Mutex<Option<ScanHandle>>,
    deletion: DeletionCoordinator,
    list_prefetch: Mutex<ViewportPrefetcher>,
    confirm_prefetch: Mutex<SelectionPrefetcher>,
}

impl Curator {
    pub fn new(
        config: &CuratorConfig,
        registry: Arc<dyn TitleRegistry>,
        metadata: Arc<dyn MetadataSource>,
        remover: Arc<dyn RemovalService>,
        renderer: Arc<dyn IconRenderer>,
        storage: Arc<dyn StorageProbe>,
    ) -> Self {
        let store = Arc::new(CatalogStore::new());
        let scheduler = Arc::new(LoadScheduler::new(config.loader.icon_loads_per_tick));

        let scanner = CatalogScanner::new(
            store.clone(),
            registry,
            metadata,
            renderer.clone(),
            scheduler.clone(),
            config.scan.clone(),
        );
        let deletion = DeletionCoordinator::new(store.clone(), remover, renderer.clone());
        let list_prefetch = ViewportPrefetcher::new(
            store.clone(),
            scheduler.clone(),
            renderer.clone(),
            &config.loader,
            config.scan.first_batch,
        );
        let confirm_prefetch = SelectionPrefetcher::new(
            store.clone(),
            scheduler.clone(),
            renderer,
            &config.loader,
        );

        Self {
            store,
            scheduler,
            storage,
            scanner,
            scan: Mutex::new(None),
            deletion,
            list_prefetch: Mutex::new(list_prefetch),
            confirm_prefetch: Mutex::new(confirm_prefetch),
        }
    }

    /// Shared entry store, for rendering snapshots and selection edits.
    pub fn store(&self) -> &Arc<CatalogStore> {
        &self.store
    }

    // ===== Frame loop =====

    /// Drain the scheduler within its icon budget. Call once per frame on
    /// the consumer thread.
    pub fn run_tick(&self) {
        self.scheduler.run_tick();
    }

    /// Main-list prefetch; `top_row` is the first visible catalog index.
    pub fn request_prefetch(&self, top_row: usize) {
        self.list_prefetch.lock().request_prefetch(top_row);
    }

    /// Confirmation-view prefetch over the ordered marked identifiers.
    pub fn request_confirm_prefetch(&self, top_row: usize, selection: &[u64]) {
        self.confirm_prefetch
            .lock()
            .request_prefetch(top_row, selection);
    }

    // ===== Scan =====

    /// Launch a scan pass. Returns false while a pass is still running.
    pub fn start_scan(&self) -> bool {
        let mut scan = self.scan.lock();
        if scan.as_ref().is_some_and(|handle| !handle.is_finished()) {
            tracing::warn!("Scan request rejected, a pass is already running");
            return false;
        }
        // replacing the old handle joins its (finished) thread
        *scan = Some(self.scanner.start());
        true
    }

    /// Cancel the running pass and block until its thread exits. Partial
    /// results stay in the store.
    pub fn cancel_scan(&self) {
        if let Some(handle) = self.scan.lock().take() {
            handle.cancel();
            handle.join();
        }
    }

    pub fn scanned_count(&self) -> usize {
        self.store.scanned_count()
    }

    pub fn total_count(&self) -> usize {
        self.store.total_count()
    }

    pub fn scan_running(&self) -> bool {
        self.store.scan_running()
    }

    pub fn scan_finished(&self) -> bool {
        self.store.scan_finished()
    }

    pub fn initial_batch_ready(&self) -> bool {
        self.store.initial_batch_ready()
    }

    // ===== Deletion =====

    /// Start removing the currently marked titles, in catalog order.
    /// Returns false (rejected, not queued) while a job is running.
    pub fn start_deletion_of_selected(
        &self,
        item_cb: ItemCallback,
        done_cb: DoneCallback,
    ) -> bool {
        self.deletion
            .start_deletion(self.store.selected_ids(), item_cb, done_cb)
    }

    /// Cancel the running job; blocks until the worker acknowledges.
    pub fn request_cancel_deletion(&self) -> DeletionPhase {
        self.deletion.request_cancel_deletion()
    }

    pub fn is_deleting(&self) -> bool {
        self.deletion.is_deleting()
    }

    pub fn deletion(&self) -> &DeletionCoordinator {
        &self.deletion
    }

    // ===== Display helpers =====

    /// Reorder the catalog. Safe mid-scan.
    pub fn sort(&self, key: SortKey) {
        self.store.sort(key);
    }

    /// Space snapshot across both tiers for the status line.
    pub fn storage_overview(&self) -> Result<StorageOverview, CoreError> {
        Ok(StorageOverview {
            internal: self.storage.space(StorageTier::Internal)?,
            removable: self.storage.space(StorageTier::Removable)?,
        })
    }
}
