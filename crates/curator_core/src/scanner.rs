//! Background catalog scan
//!
//! One scan pass enumerates every installed title through the paged
//! registry, then walks the identifier list in order, appending one entry
//! per identifier so the consumer can render partial results immediately.
//! The pass is cancellable between identifiers; whatever already landed in
//! the store stays there.

use crate::cancel::CancelToken;
use crate::config::ScanConfig;
use crate::entry::{CatalogEntry, TierSizes};
use crate::error::CoreError;
use crate::prefetch::icon_load_task;
use crate::scheduler::LoadScheduler;
use crate::services::{IconRenderer, MetadataSource, TitleRegistry};
use crate::store::CatalogStore;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handle to a running scan pass. Dropping it cancels and joins.
pub struct ScanHandle {
    token: CancelToken,
    thread: Option<JoinHandle<()>>,
}

impl ScanHandle {
    /// Request cooperative cancellation; checked once per identifier.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Block until the scan thread exits.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Drives one full enumeration pass per invocation.
pub struct CatalogScanner {
    store: Arc<CatalogStore>,
    registry: Arc<dyn TitleRegistry>,
    metadata: Arc<dyn MetadataSource>,
    renderer: Arc<dyn IconRenderer>,
    scheduler: Arc<LoadScheduler>,
    config: ScanConfig,
}

impl CatalogScanner {
    pub fn new(
        store: Arc<CatalogStore>,
        registry: Arc<dyn TitleRegistry>,
        metadata: Arc<dyn MetadataSource>,
        renderer: Arc<dyn IconRenderer>,
        scheduler: Arc<LoadScheduler>,
        config: ScanConfig,
    ) -> Self {
        Self {
            store,
            registry,
            metadata,
            renderer,
            scheduler,
            config,
        }
    }

    /// Spawn the scan on its own thread.
    pub fn start(&self) -> ScanHandle {
        let token = CancelToken::new();
        let worker_token = token.clone();
        let store = self.store.clone();
        let registry = self.registry.clone();
        let metadata = self.metadata.clone();
        let renderer = self.renderer.clone();
        let scheduler = self.scheduler.clone();
        let config = self.config.clone();

        let thread = thread::spawn(move || {
            run_scan(
                store,
                registry,
                metadata,
                renderer,
                scheduler,
                &config,
                &worker_token,
            );
        });

        ScanHandle {
            token,
            thread: Some(thread),
        }
    }

    /// Run the pass synchronously on the calling thread.
    pub fn run(&self, token: &CancelToken) {
        run_scan(
            self.store.clone(),
            self.registry.clone(),
            self.metadata.clone(),
            self.renderer.clone(),
            self.scheduler.clone(),
            &self.config,
            token,
        );
    }
}

/// Enumerate every identifier through repeated paged calls. On a paging
/// failure the identifiers gathered so far are returned alongside the error
/// so the progress counters still reflect what was last known.
fn collect_all_ids(
    registry: &dyn TitleRegistry,
    page_size: usize,
) -> (Vec<u64>, Option<CoreError>) {
    let mut ids = Vec::new();
    let mut offset = 0;
    loop {
        match registry.list_page(offset, page_size) {
            Ok(page) => {
                if page.is_empty() {
                    return (ids, None);
                }
                offset += page.len();
                ids.extend(page);
            }
            Err(e) => return (ids, Some(e)),
        }
    }
}

fn run_scan(
    store: Arc<CatalogStore>,
    registry: Arc<dyn TitleRegistry>,
    metadata: Arc<dyn MetadataSource>,
    renderer: Arc<dyn IconRenderer>,
    scheduler: Arc<LoadScheduler>,
    config: &ScanConfig,
    token: &CancelToken,
) {
    store.begin_scan();

    let (ids, paging_error) = collect_all_ids(&*registry, config.page_size);
    store.set_total(ids.len());

    if let Some(e) = paging_error {
        // fatal to this pass only; the consumer sees a degraded result
        // (scan finished with scanned_count < total_count)
        tracing::warn!("Title enumeration aborted the scan pass: {}", e);
        store.mark_initial_batch_ready();
        store.finish_scan();
        return;
    }

    tracing::info!("Scanning {} installed titles", ids.len());

    for (index, id) in ids.into_iter().enumerate() {
        if token.is_cancelled() {
            tracing::info!("Scan cancelled after {} titles", store.scanned_count());
            break;
        }

        let entry = match metadata.basic_info(id) {
            Ok(info) => {
                // size failures degrade to zero, the entry itself survives
                let sizes = metadata.occupied_size(id).unwrap_or_else(|e| {
                    tracing::debug!("{}", e);
                    TierSizes::default()
                });
                CatalogEntry::new(id, info.name, sizes)
                    .with_icon_bytes(info.icon_bytes.unwrap_or_default())
            }
            Err(e) => {
                // every identifier yields exactly one entry; this one is a
                // visible zero-size sentinel
                tracing::debug!("{}", e);
                CatalogEntry::corrupted(id)
            }
        };

        let warm_icon = index < config.first_batch && !entry.corrupted && entry.has_icon_bytes;
        store.append(entry);

        // the first screenful never shows placeholder icons if we can help it
        if warm_icon {
            scheduler.submit(icon_load_task(store.clone(), renderer.clone(), id, 0));
        }

        if store.scanned_count() == config.first_batch {
            store.mark_initial_batch_ready();
        }

        // cap CPU pressure; the consumer thread keeps its frame budget
        thread::sleep(Duration::from_millis(config.yield_interval_ms));
    }

    store.mark_initial_batch_ready();
    store.finish_scan();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockMetadata, MockRegistry, MockRenderer};
    use std::collections::HashSet;
    use std::time::Instant;

    fn scan_config() -> ScanConfig {
        ScanConfig {
            page_size: 30,
            first_batch: 4,
            yield_interval_ms: 0,
        }
    }

    fn scanner_for(
        registry: MockRegistry,
        metadata: MockMetadata,
    ) -> (Arc<CatalogStore>, Arc<LoadScheduler>, CatalogScanner) {
        let store = Arc::new(CatalogStore::new());
        let scheduler = Arc::new(LoadScheduler::new(2));
        let scanner = CatalogScanner::new(
            store.clone(),
            Arc::new(registry),
            Arc::new(metadata),
            Arc::new(MockRenderer::new()),
            scheduler.clone(),
            scan_config(),
        );
        (store, scheduler, scanner)
    }

    fn metadata_for(ids: &[u64]) -> MockMetadata {
        let mut metadata = MockMetadata::new();
        for &id in ids {
            metadata = metadata.with_title(id, &format!("title-{id}"), id * 100, id * 10);
        }
        metadata
    }

    #[test]
    fn full_scan_populates_every_identifier_in_order() {
        let ids: Vec<u64> = (1..=10).collect();
        let (store, _, scanner) =
            scanner_for(MockRegistry::new(ids.clone()), metadata_for(&ids));

        scanner.run(&CancelToken::new());

        assert_eq!(store.scanned_count(), 10);
        assert_eq!(store.total_count(), 10);
        assert!(store.scan_finished());
        assert!(!store.scan_running());

        let entries = store.snapshot_range(0, 10);
        let seen: Vec<u64> = entries.iter().map(|e| e.id).collect();
        assert_eq!(seen, ids, "append order equals enumeration order");
        assert_eq!(seen.iter().collect::<HashSet<_>>().len(), 10);
        assert_eq!(entries[2].sizes, TierSizes::new(300, 30));
    }

    #[test]
    fn enumeration_spans_multiple_pages() {
        let ids: Vec<u64> = (0..75).collect();
        let registry = MockRegistry::new(ids.clone());
        let (store, _, scanner) = scanner_for(registry, metadata_for(&ids));

        scanner.run(&CancelToken::new());

        assert_eq!(store.scanned_count(), 75);
        assert_eq!(store.total_count(), 75);
    }

    #[test]
    fn metadata_failure_yields_corrupted_sentinel() {
        let ids: Vec<u64> = (1..=10).collect();
        let metadata = metadata_for(&ids).with_failing(7);
        let (store, _, scanner) = scanner_for(MockRegistry::new(ids), metadata);

        scanner.run(&CancelToken::new());

        assert_eq!(store.scanned_count(), 10);
        let seventh = store.entry_by_id(7).expect("sentinel entry present");
        assert!(seventh.corrupted);
        assert_eq!(seventh.sizes.total(), 0);
        assert!(!seventh.has_icon_bytes);
        // the slot is not skipped; neighbors are intact
        assert_eq!(store.len(), 10);
    }

    #[test]
    fn size_failure_degrades_to_zero_without_corrupting() {
        let ids = vec![1, 2];
        let metadata = metadata_for(&ids).with_size_failing(2);
        let (store, _, scanner) = scanner_for(MockRegistry::new(ids), metadata);

        scanner.run(&CancelToken::new());

        let entry = store.entry_by_id(2).unwrap();
        assert!(!entry.corrupted);
        assert_eq!(entry.sizes, TierSizes::default());
        assert_eq!(entry.name, "title-2");
    }

    #[test]
    fn first_batch_gets_max_priority_icon_tasks() {
        let ids: Vec<u64> = (1..=6).collect();
        let (_, scheduler, scanner) =
            scanner_for(MockRegistry::new(ids.clone()), metadata_for(&ids));

        scanner.run(&CancelToken::new());

        // exactly the first K=4 identifiers got warm-up tasks
        assert_eq!(scheduler.pending_count(), 4);
    }

    #[test]
    fn initial_batch_flag_flips_after_first_screenful() {
        let ids: Vec<u64> = (1..=6).collect();
        let (store, _, scanner) =
            scanner_for(MockRegistry::new(ids.clone()), metadata_for(&ids));

        assert!(!store.initial_batch_ready());
        scanner.run(&CancelToken::new());
        assert!(store.initial_batch_ready());
    }

    #[test]
    fn paging_failure_aborts_but_finalizes() {
        let ids: Vec<u64> = (0..40).collect();
        // first page of 30 succeeds, the second errors out
        let registry = MockRegistry::failing_from_offset(ids.clone(), 30);
        let (store, _, scanner) = scanner_for(registry, metadata_for(&ids));

        scanner.run(&CancelToken::new());

        assert!(store.scan_finished());
        assert!(!store.scan_running());
        assert_eq!(store.total_count(), 30, "last known cardinality");
        assert_eq!(store.scanned_count(), 0, "pass aborted before appending");
    }

    #[test]
    fn cancellation_retains_partial_results() {
        let ids: Vec<u64> = (1..=200).collect();
        let store = Arc::new(CatalogStore::new());
        let scheduler = Arc::new(LoadScheduler::new(2));
        let scanner = CatalogScanner::new(
            store.clone(),
            Arc::new(MockRegistry::new(ids.clone())),
            Arc::new(metadata_for(&ids)),
            Arc::new(MockRenderer::new()),
            scheduler,
            ScanConfig {
                yield_interval_ms: 1,
                ..scan_config()
            },
        );

        let handle = scanner.start();
        let deadline = Instant::now() + Duration::from_secs(5);
        while store.scanned_count() < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        handle.cancel();
        handle.join();

        assert!(store.scan_finished());
        assert!(!store.scan_running());
        let scanned = store.scanned_count();
        assert!(scanned >= 2, "saw at least the entries before cancellation");
        assert_eq!(store.len(), scanned, "partial results retained, none rolled back");
    }

    #[test]
    fn dropping_the_handle_cancels_and_joins() {
        let ids: Vec<u64> = (1..=200).collect();
        let store = Arc::new(CatalogStore::new());
        let scheduler = Arc::new(LoadScheduler::new(2));
        let scanner = CatalogScanner::new(
            store.clone(),
            Arc::new(MockRegistry::new(ids.clone())),
            Arc::new(metadata_for(&ids)),
            Arc::new(MockRenderer::new()),
            scheduler,
            ScanConfig {
                yield_interval_ms: 1,
                ..scan_config()
            },
        );

        drop(scanner.start());
        assert!(!store.scan_running());
    }
}
