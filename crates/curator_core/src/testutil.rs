//! Mock collaborators shared by the unit tests

use crate::entry::{StorageTier, TierSizes};
use crate::error::CoreError;
use crate::icon::IconHandle;
use crate::services::{
    IconRenderer, MetadataSource, RemovalService, StorageProbe, TierSpace, TitleInfo,
    TitleRegistry,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Receiver;

/// Minimal well-formed icon byte stream carrying a recognizable tag.
pub fn fake_jpeg(tag: u8) -> Vec<u8> {
    vec![0xff, 0xd8, tag, 0x00, 0xff, 0xd9]
}

/// Records decodes (by the tag byte) and releases; optionally fails.
pub struct MockRenderer {
    next: AtomicU64,
    decoded: Mutex<Vec<u64>>,
    released: Mutex<Vec<IconHandle>>,
    fail: bool,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            decoded: Mutex::new(Vec::new()),
            released: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::new() }
    }

    /// Tags of successfully decoded byte streams, in decode order.
    pub fn decoded_tags(&self) -> Vec<u64> {
        self.decoded.lock().clone()
    }

    pub fn released_handles(&self) -> Vec<IconHandle> {
        self.released.lock().clone()
    }
}

impl IconRenderer for MockRenderer {
    fn decode(&self, bytes: &[u8]) -> Result<IconHandle, CoreError> {
        if self.fail {
            return Err(CoreError::IconDecode("mock decode failure".into()));
        }
        let tag = bytes.get(2).copied().unwrap_or(0) as u64;
        self.decoded.lock().push(tag);
        Ok(IconHandle(self.next.fetch_add(1, Ordering::Relaxed)))
    }

    fn release(&self, handle: IconHandle) {
        self.released.lock().push(handle);
    }
}

/// Pages a fixed identifier list; can fail from a given page onward.
pub struct MockRegistry {
    ids: Vec<u64>,
    fail_from_offset: Option<usize>,
    pages_served: AtomicU64,
}

impl MockRegistry {
    pub fn new(ids: Vec<u64>) -> Self {
        Self {
            ids,
            fail_from_offset: None,
            pages_served: AtomicU64::new(0),
        }
    }

    pub fn failing_from_offset(ids: Vec<u64>, offset: usize) -> Self {
        Self {
            fail_from_offset: Some(offset),
            ..Self::new(ids)
        }
    }

    pub fn pages_served(&self) -> u64 {
        self.pages_served.load(Ordering::Relaxed)
    }
}

impl TitleRegistry for MockRegistry {
    fn list_page(&self, offset: usize, limit: usize) -> Result<Vec<u64>, CoreError> {
        if self.fail_from_offset.is_some_and(|fail| offset >= fail) {
            return Err(CoreError::Registry("mock paging failure".into()));
        }
        self.pages_served.fetch_add(1, Ordering::Relaxed);
        let start = offset.min(self.ids.len());
        let end = (offset + limit).min(self.ids.len());
        Ok(self.ids[start..end].to_vec())
    }
}

/// Serves canned metadata; identifiers in `fail_ids` error out.
pub struct MockMetadata {
    titles: HashMap<u64, (TitleInfo, TierSizes)>,
    fail_ids: HashSet<u64>,
    size_fail_ids: HashSet<u64>,
}

impl MockMetadata {
    pub fn new() -> Self {
        Self {
            titles: HashMap::new(),
            fail_ids: HashSet::new(),
            size_fail_ids: HashSet::new(),
        }
    }

    pub fn with_title(mut self, id: u64, name: &str, internal: u64, removable: u64) -> Self {
        self.titles.insert(
            id,
            (
                TitleInfo {
                    name: name.to_string(),
                    icon_bytes: Some(fake_jpeg(id as u8)),
                },
                TierSizes::new(internal, removable),
            ),
        );
        self
    }

    pub fn with_failing(mut self, id: u64) -> Self {
        self.fail_ids.insert(id);
        self
    }

    pub fn with_size_failing(mut self, id: u64) -> Self {
        self.size_fail_ids.insert(id);
        self
    }
}

impl MetadataSource for MockMetadata {
    fn basic_info(&self, id: u64) -> Result<TitleInfo, CoreError> {
        if self.fail_ids.contains(&id) {
            return Err(CoreError::Metadata(id));
        }
        self.titles
            .get(&id)
            .map(|(info, _)| info.clone())
            .ok_or(CoreError::Metadata(id))
    }

    fn occupied_size(&self, id: u64) -> Result<TierSizes, CoreError> {
        if self.size_fail_ids.contains(&id) {
            return Err(CoreError::OccupiedSize(id));
        }
        self.titles
            .get(&id)
            .map(|(_, sizes)| *sizes)
            .ok_or(CoreError::OccupiedSize(id))
    }
}

/// Records removals; identifiers in `fail_ids` fail. An optional gate makes
/// the worker block before each removal so tests control the interleaving.
pub struct MockRemover {
    fail_ids: HashSet<u64>,
    removed: Mutex<Vec<u64>>,
    attempted: Mutex<Vec<u64>>,
    gate: Option<Mutex<Receiver<()>>>,
}

impl MockRemover {
    pub fn new() -> Self {
        Self {
            fail_ids: HashSet::new(),
            removed: Mutex::new(Vec::new()),
            attempted: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn with_failing(mut self, id: u64) -> Self {
        self.fail_ids.insert(id);
        self
    }

    /// Block before each removal until the test sends one permit.
    pub fn gated(mut self, permits: Receiver<()>) -> Self {
        self.gate = Some(Mutex::new(permits));
        self
    }

    pub fn removed_ids(&self) -> Vec<u64> {
        self.removed.lock().clone()
    }

    /// Identifiers whose removal was entered, recorded before the gate so
    /// tests can tell when the worker is parked inside a call.
    pub fn attempted_ids(&self) -> Vec<u64> {
        self.attempted.lock().clone()
    }
}

impl RemovalService for MockRemover {
    fn remove_completely(&self, id: u64) -> Result<(), CoreError> {
        self.attempted.lock().push(id);
        if let Some(gate) = &self.gate {
            // sender dropped means the test no longer cares; proceed
            let _ = gate.lock().recv();
        }
        if self.fail_ids.contains(&id) {
            return Err(CoreError::Removal(id));
        }
        self.removed.lock().push(id);
        Ok(())
    }
}

/// Fixed per-tier space answers.
pub struct MockStorage {
    pub internal: TierSpace,
    pub removable: TierSpace,
}

impl StorageProbe for MockStorage {
    fn space(&self, tier: StorageTier) -> Result<TierSpace, CoreError> {
        Ok(match tier {
            StorageTier::Internal => self.internal,
            StorageTier::Removable => self.removable,
        })
    }
}
