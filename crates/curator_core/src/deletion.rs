//! Cancellable bulk-deletion coordinator
//!
//! Runs one removal job at a time on a dedicated worker thread. The worker
//! walks the worklist in order: removal primitive, store removal on success,
//! per-item callback, then a cancellation checkpoint between items. Cancellation is
//! cancel-then-join; a cancel that lands after the last item resolves to
//! Completed, never Interrupted, because every requested removal was in fact
//! carried out and reported.

use crate::cancel::CancelToken;
use crate::services::{IconRenderer, RemovalService};
use crate::store::CatalogStore;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Told once per worklist item, with the identifier and the success flag.
pub type ItemCallback = Box<dyn Fn(u64, bool) + Send + 'static>;

/// Told once when the worklist is exhausted normally. Not called on
/// interruption.
pub type DoneCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionPhase {
    Idle,
    Running,
    Completed,
    Interrupted,
}

/// A-priori aggregate for one job, computed from the store before the first
/// removal. Per-item callbacks cannot reconstruct this: by the time one
/// fires the entry may already be evicted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobTotals {
    pub titles: usize,
    pub internal_bytes: u64,
    pub removable_bytes: u64,
}

pub struct DeletionCoordinator {
    store: Arc<CatalogStore>,
    remover: Arc<dyn RemovalService>,
    renderer: Arc<dyn IconRenderer>,
    phase: Arc<Mutex<DeletionPhase>>,
    worker: Mutex<Option<(JoinHandle<()>, CancelToken)>>,
    totals: Mutex<Option<JobTotals>>,
    removed: Arc<AtomicUsize>,
}

impl DeletionCoordinator {
    pub fn new(
        store: Arc<CatalogStore>,
        remover: Arc<dyn RemovalService>,
        renderer: Arc<dyn IconRenderer>,
    ) -> Self {
        Self {
            store,
            remover,
            renderer,
            phase: Arc::new(Mutex::new(DeletionPhase::Idle)),
            worker: Mutex::new(None),
            totals: Mutex::new(None),
            removed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Start a job over `worklist`. Returns false (rejected, not queued)
    /// while a prior job is still running.
    pub fn start_deletion(
        &self,
        worklist: Vec<u64>,
        item_cb: ItemCallback,
        done_cb: DoneCallback,
    ) -> bool {
        let mut worker = self.worker.lock();
        {
            let mut phase = self.phase.lock();
            if *phase == DeletionPhase::Running {
                tracing::warn!("Deletion request rejected, a job is already running");
                return false;
            }
            *phase = DeletionPhase::Running;
        }

        // reap the previous worker, it exited long ago
        if let Some((handle, _)) = worker.take() {
            let _ = handle.join();
        }

        let mut totals = JobTotals {
            titles: worklist.len(),
            ..JobTotals::default()
        };
        for &id in &worklist {
            if let Some(sizes) = self.store.entry_sizes(id) {
                totals.internal_bytes += sizes.internal;
                totals.removable_bytes += sizes.removable;
            }
        }
        *self.totals.lock() = Some(totals);
        self.removed.store(0, Ordering::Relaxed);

        tracing::info!("Deleting {} titles", worklist.len());

        let token = CancelToken::new();
        let worker_token = token.clone();
        let store = self.store.clone();
        let remover = self.remover.clone();
        let renderer = self.renderer.clone();
        let phase = self.phase.clone();
        let removed = self.removed.clone();

        let handle = thread::spawn(move || {
            let mut worklist = worklist.into_iter().peekable();
            while let Some(id) = worklist.next() {
                let ok = match remover.remove_completely(id) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!("{}", e);
                        false
                    }
                };

                if ok {
                    removed.fetch_add(1, Ordering::Relaxed);
                    // a failed entry stays visible and selected for retry
                    if let Some(entry) = store.remove_by_id(id) {
                        if entry.owns_icon {
                            renderer.release(entry.icon);
                        }
                    }
                }

                item_cb(id, ok);

                // a cancel observed after the last item changes nothing:
                // every removal was already carried out and reported
                if worklist.peek().is_some() && worker_token.is_cancelled() {
                    tracing::info!("Deletion interrupted before the worklist was exhausted");
                    return;
                }
            }

            *phase.lock() = DeletionPhase::Completed;
            done_cb();
        });

        *worker = Some((handle, token));
        true
    }

    /// Cancel the running job and block until the worker acknowledges.
    /// Returns the resulting phase: Completed when the worker had already
    /// finished the worklist by the time cancellation was observed,
    /// Interrupted otherwise.
    pub fn request_cancel_deletion(&self) -> DeletionPhase {
        let taken = self.worker.lock().take();
        let Some((handle, token)) = taken else {
            return *self.phase.lock();
        };

        token.cancel();
        let _ = handle.join();

        let mut phase = self.phase.lock();
        if *phase == DeletionPhase::Running {
            *phase = DeletionPhase::Interrupted;
        }
        *phase
    }

    pub fn is_deleting(&self) -> bool {
        *self.phase.lock() == DeletionPhase::Running
    }

    pub fn phase(&self) -> DeletionPhase {
        *self.phase.lock()
    }

    /// Return to Idle after the caller has consumed the outcome. No-op
    /// while a job is running.
    pub fn reset(&self) {
        let mut phase = self.phase.lock();
        if *phase != DeletionPhase::Running {
            *phase = DeletionPhase::Idle;
            *self.totals.lock() = None;
        }
    }

    /// A-priori totals for the current or most recent job.
    pub fn job_totals(&self) -> Option<JobTotals> {
        *self.totals.lock()
    }

    /// Worklist items whose removal primitive succeeded so far.
    pub fn removed_count(&self) -> usize {
        self.removed.load(Ordering::Relaxed)
    }
}
