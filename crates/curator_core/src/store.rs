//! Thread-safe catalog store
//!
//! Single source of truth for the entry list. The scanner and the deletion
//! worker are the only writers of the sequence itself; the consumer thread
//! reads snapshots and flips selection flags. Every sequence operation takes
//! the internal lock for its own duration only. Scan-progress counters are
//! lock-free atomics so the consumer can poll them every tick without
//! contending with a running scan.

use crate::entry::{CatalogEntry, TierSizes};
use crate::icon::IconHandle;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// User-selectable catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    /// Largest total occupied size first
    #[serde(rename = "size")]
    SizeDescending,
    /// Display name A-Z
    #[serde(rename = "name")]
    NameAscending,
}

/// Outcome of installing a decoded icon into an entry.
#[derive(Debug, PartialEq, Eq)]
pub enum IconSwap {
    /// Icon installed; `released` is the previously owned handle the caller
    /// must hand back to the renderer, if there was one.
    Installed { released: Option<IconHandle> },
    /// The entry is gone (deleted mid-flight); the caller still owns the
    /// fresh handle and must release it.
    Missing,
}

/// Ordered, lock-protected container of catalog entries plus scan progress.
pub struct CatalogStore {
    entries: Mutex<Vec<CatalogEntry>>,

    // Progress counters are display-oriented and tolerate eventual
    // consistency; each has a single logical writer.
    scanned: AtomicUsize,
    total: AtomicUsize,
    scan_running: AtomicBool,
    scan_finished: AtomicBool,
    initial_batch_ready: AtomicBool,
    selected: AtomicUsize,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            scanned: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            scan_running: AtomicBool::new(false),
            scan_finished: AtomicBool::new(false),
            initial_batch_ready: AtomicBool::new(false),
            selected: AtomicUsize::new(0),
        }
    }

    // ===== Entry sequence =====

    /// Append one scanned entry and bump `scanned_count`.
    pub fn append(&self, entry: CatalogEntry) {
        let mut entries = self.entries.lock();
        entries.push(entry);
        self.scanned.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove the entry with `id`, returning it so the caller can release
    /// its icon outside the lock. Missing identifiers are a no-op: a stale
    /// reference racing a concurrent delete is expected, not an error.
    pub fn remove_by_id(&self, id: u64) -> Option<CatalogEntry> {
        let mut entries = self.entries.lock();
        let pos = entries.iter().position(|e| e.id == id)?;
        let entry = entries.remove(pos);
        if entry.selected {
            self.selected.fetch_sub(1, Ordering::Relaxed);
        }
        Some(entry)
    }

    /// Run `f` over every entry under the lock. Keep `f` short; it must not
    /// call back into a collaborator.
    pub fn for_each_mut(&self, mut f: impl FnMut(&mut CatalogEntry)) {
        let mut entries = self.entries.lock();
        for entry in entries.iter_mut() {
            f(entry);
        }
    }

    /// Clone the entries in `[start, end)`, clamped to the catalog bounds.
    /// An inverted range yields an empty snapshot.
    pub fn snapshot_range(&self, start: usize, end: usize) -> Vec<CatalogEntry> {
        let entries = self.entries.lock();
        let start = start.min(entries.len());
        let end = end.min(entries.len()).max(start);
        entries[start..end].to_vec()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Stable reorder of whatever has arrived so far. Safe mid-scan: the
    /// scanner keeps appending at the new logical end.
    pub fn sort(&self, key: SortKey) {
        let mut entries = self.entries.lock();
        match key {
            SortKey::SizeDescending => {
                entries.sort_by(|a, b| b.sizes.total().cmp(&a.sizes.total()))
            }
            SortKey::NameAscending => entries.sort_by(|a, b| a.name.cmp(&b.name)),
        }
    }

    // ===== Selection =====

    /// Set one entry's removal mark. Returns false when `id` is unknown.
    pub fn set_selected(&self, id: u64, selected: bool) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.iter_mut().find(|e| e.id == id) else {
            return false;
        };
        if entry.selected != selected {
            entry.selected = selected;
            if selected {
                self.selected.fetch_add(1, Ordering::Relaxed);
            } else {
                self.selected.fetch_sub(1, Ordering::Relaxed);
            }
        }
        true
    }

    /// Flip one entry's removal mark, returning the new state.
    pub fn toggle_selected(&self, id: u64) -> Option<bool> {
        let now = {
            let mut entries = self.entries.lock();
            let entry = entries.iter_mut().find(|e| e.id == id)?;
            entry.selected = !entry.selected;
            entry.selected
        };
        if now {
            self.selected.fetch_add(1, Ordering::Relaxed);
        } else {
            self.selected.fetch_sub(1, Ordering::Relaxed);
        }
        Some(now)
    }

    /// Clear every removal mark.
    pub fn clear_selection(&self) {
        let mut entries = self.entries.lock();
        for entry in entries.iter_mut() {
            entry.selected = false;
        }
        self.selected.store(0, Ordering::Relaxed);
    }

    pub fn selected_count(&self) -> usize {
        self.selected.load(Ordering::Relaxed)
    }

    /// Identifiers marked for removal, in catalog order.
    pub fn selected_ids(&self) -> Vec<u64> {
        let entries = self.entries.lock();
        entries.iter().filter(|e| e.selected).map(|e| e.id).collect()
    }

    // ===== Icon plumbing =====

    /// Clone the cached raw icon bytes for `id`, if the entry is still
    /// present and has any.
    pub fn cached_icon_bytes(&self, id: u64) -> Option<Vec<u8>> {
        let entries = self.entries.lock();
        entries
            .iter()
            .find(|e| e.id == id && e.has_icon_bytes)
            .map(|e| e.icon_bytes.clone())
    }

    /// Swap a freshly decoded icon into the entry for `id`.
    pub fn install_icon(&self, id: u64, handle: IconHandle) -> IconSwap {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.iter_mut().find(|e| e.id == id) else {
            return IconSwap::Missing;
        };

        let released = if entry.owns_icon && entry.icon != IconHandle::PLACEHOLDER {
            Some(entry.icon)
        } else {
            None
        };
        entry.icon = handle;
        entry.owns_icon = handle != IconHandle::PLACEHOLDER;
        IconSwap::Installed { released }
    }

    /// Clone the entry with `id`, if still present.
    pub fn entry_by_id(&self, id: u64) -> Option<CatalogEntry> {
        let entries = self.entries.lock();
        entries.iter().find(|e| e.id == id).cloned()
    }

    /// Size breakdown for `id`, if still present.
    pub fn entry_sizes(&self, id: u64) -> Option<TierSizes> {
        let entries = self.entries.lock();
        entries.iter().find(|e| e.id == id).map(|e| e.sizes)
    }

    // ===== Scan progress =====

    pub(crate) fn begin_scan(&self) {
        self.scan_running.store(true, Ordering::Relaxed);
        self.scan_finished.store(false, Ordering::Relaxed);
        self.initial_batch_ready.store(false, Ordering::Relaxed);
        self.scanned.store(0, Ordering::Relaxed);
        self.total.store(0, Ordering::Relaxed);
    }

    pub(crate) fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
    }

    pub(crate) fn finish_scan(&self) {
        self.scan_running.store(false, Ordering::Relaxed);
        self.scan_finished.store(true, Ordering::Relaxed);
    }

    pub(crate) fn mark_initial_batch_ready(&self) {
        self.initial_batch_ready.store(true, Ordering::Relaxed);
    }

    pub fn scanned_count(&self) -> usize {
        self.scanned.load(Ordering::Relaxed)
    }

    /// Enumerated cardinality; 0 until the enumeration call returns, fixed
    /// afterwards. Deletion does not decrement it.
    pub fn total_count(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn scan_running(&self) -> bool {
        self.scan_running.load(Ordering::Relaxed)
    }

    pub fn scan_finished(&self) -> bool {
        self.scan_finished.load(Ordering::Relaxed)
    }

    /// First screenful of entries has landed; the consumer can leave the
    /// loading view while the scan continues.
    pub fn initial_batch_ready(&self) -> bool {
        self.initial_batch_ready.load(Ordering::Relaxed)
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}
