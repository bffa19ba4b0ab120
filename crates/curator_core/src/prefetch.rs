//! Viewport-driven icon prefetch
//!
//! Turns cursor position into prioritized scheduler submissions. Two
//! variants share the debounce and the unit of work: [`ViewportPrefetcher`]
//! for the main list (with a permanent top-priority first page) and
//! [`SelectionPrefetcher`] for the removal-confirmation view, which only
//! ever sees the marked subset.

use crate::config::LoaderConfig;
use crate::icon::is_valid_jpeg;
use crate::scheduler::{LoadScheduler, LoadTask, TaskCategory};
use crate::services::IconRenderer;
use crate::store::{CatalogStore, IconSwap};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Suppresses redundant prefetch passes: a request is dropped only when the
/// computed range is unchanged AND the interval has not yet elapsed.
struct Debounce {
    interval: Duration,
    last_range: Option<(usize, usize)>,
    last_at: Option<Instant>,
}

impl Debounce {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_range: None,
            last_at: None,
        }
    }

    fn admit(&mut self, range: (usize, usize)) -> bool {
        let now = Instant::now();
        let same_range = self.last_range == Some(range);
        let within_window = self
            .last_at
            .is_some_and(|at| now.duration_since(at) < self.interval);
        if same_range && within_window {
            return false;
        }
        self.last_range = Some(range);
        self.last_at = Some(now);
        true
    }
}

/// Build the deferred decode-and-swap work for one entry's icon.
///
/// The work runs later on the consumer thread: clone the cached bytes under
/// the store lock, validate the JPEG container, decode with no lock held,
/// then swap the handle in under the lock again. An entry deleted while the
/// task sat queued makes the whole thing a no-op (the fresh handle goes
/// straight back to the renderer).
pub(crate) fn icon_load_task(
    store: Arc<CatalogStore>,
    renderer: Arc<dyn IconRenderer>,
    id: u64,
    priority: u8,
) -> LoadTask {
    LoadTask::new(id, priority, TaskCategory::Icon, move || {
        let Some(bytes) = store.cached_icon_bytes(id) else {
            return;
        };
        if !is_valid_jpeg(&bytes) {
            tracing::debug!("Rejected malformed icon bytes for {:#018x}", id);
            return;
        }
        let handle = match renderer.decode(&bytes) {
            Ok(handle) => handle,
            Err(e) => {
                // entry keeps its placeholder; a later prefetch pass may retry
                tracing::debug!("Icon decode failed for {:#018x}: {}", id, e);
                return;
            }
        };
        match store.install_icon(id, handle) {
            IconSwap::Installed { released: Some(old) } => renderer.release(old),
            IconSwap::Installed { released: None } => {}
            IconSwap::Missing => renderer.release(handle),
        }
    })
}

/// Prefetcher for the main catalog list.
pub struct ViewportPrefetcher {
    store: Arc<CatalogStore>,
    scheduler: Arc<LoadScheduler>,
    renderer: Arc<dyn IconRenderer>,
    visible_rows: usize,
    preload_rows: usize,
    /// Indices below this always load at maximum priority, so the initial
    /// screen wins races against scroll-driven prefetch
    first_page: usize,
    debounce: Debounce,
}

impl ViewportPrefetcher {
    pub fn new(
        store: Arc<CatalogStore>,
        scheduler: Arc<LoadScheduler>,
        renderer: Arc<dyn IconRenderer>,
        config: &LoaderConfig,
        first_page: usize,
    ) -> Self {
        Self {
            store,
            scheduler,
            renderer,
            visible_rows: config.visible_rows,
            preload_rows: config.preload_rows,
            first_page,
            debounce: Debounce::new(Duration::from_millis(config.debounce_ms)),
        }
    }

    /// Called on any cursor or scroll change; `top_row` is the index of the
    /// first visible entry.
    pub fn request_prefetch(&mut self, top_row: usize) {
        let len = self.store.len();
        if len == 0 {
            return;
        }

        let visible_start = top_row.min(len);
        let visible_end = (visible_start + self.visible_rows).min(len);
        let load_start = visible_start.saturating_sub(self.preload_rows);
        let load_end = (visible_end + self.preload_rows).min(len);

        if !self.debounce.admit((load_start, load_end)) {
            return;
        }

        for (offset, entry) in self
            .store
            .snapshot_range(load_start, load_end)
            .iter()
            .enumerate()
        {
            if entry.has_loaded_icon() || entry.corrupted || !entry.has_icon_bytes {
                continue;
            }
            let index = load_start + offset;
            let priority = if index < self.first_page {
                0
            } else if index >= visible_start && index < visible_end {
                1
            } else {
                2
            };
            self.scheduler.submit(icon_load_task(
                self.store.clone(),
                self.renderer.clone(),
                entry.id,
                priority,
            ));
        }
    }
}

/// Prefetcher for the removal-confirmation view.
///
/// Operates on the caller's ordered selection worklist instead of the whole
/// catalog, and has no always-hot first page: preload runs downward from the
/// visible window only, matching how that view is scrolled.
pub struct SelectionPrefetcher {
    store: Arc<CatalogStore>,
    scheduler: Arc<LoadScheduler>,
    renderer: Arc<dyn IconRenderer>,
    visible_rows: usize,
    preload_rows: usize,
    debounce: Debounce,
}

impl SelectionPrefetcher {
    pub fn new(
        store: Arc<CatalogStore>,
        scheduler: Arc<LoadScheduler>,
        renderer: Arc<dyn IconRenderer>,
        config: &LoaderConfig,
    ) -> Self {
        Self {
            store,
            scheduler,
            renderer,
            visible_rows: config.visible_rows,
            preload_rows: config.preload_rows,
            debounce: Debounce::new(Duration::from_millis(config.debounce_ms)),
        }
    }

    /// `top_row` indexes into `selection`, the ordered marked identifiers.
    pub fn request_prefetch(&mut self, top_row: usize, selection: &[u64]) {
        if selection.is_empty() {
            return;
        }

        let len = selection.len();
        let visible_start = top_row.min(len);
        let visible_end = (visible_start + self.visible_rows).min(len);
        let load_end = (visible_end + self.preload_rows).min(len);

        if !self.debounce.admit((visible_start, load_end)) {
            return;
        }

        for (index, &id) in selection
            .iter()
            .enumerate()
            .take(load_end)
            .skip(visible_start)
        {
            let Some(entry) = self.store.entry_by_id(id) else {
                continue;
            };
            if entry.has_loaded_icon() || entry.corrupted || !entry.has_icon_bytes {
                continue;
            }
            let priority = if index < visible_end { 1 } else { 2 };
            self.scheduler.submit(icon_load_task(
                self.store.clone(),
                self.renderer.clone(),
                id,
                priority,
            ));
        }
    }
}
