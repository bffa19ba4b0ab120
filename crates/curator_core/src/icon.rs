//! Icon handles, JPEG validation, and the default in-process decoder

use crate::error::CoreError;
use crate::services::IconRenderer;
use image::ImageReader;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque reference to a decoded icon owned by the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IconHandle(pub u64);

impl IconHandle {
    /// The shared default icon. Never owned by any entry.
    pub const PLACEHOLDER: IconHandle = IconHandle(0);
}

/// Validate the JPEG container before handing bytes to the decoder:
/// SOI marker up front, EOI marker at the end. Truncated cache reads
/// are common enough that decoding without this check wastes a frame.
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    if data.len() < 4 {
        return false;
    }
    let has_header = data[0] == 0xff && data[1] == 0xd8;
    let has_trailer = data[data.len() - 2] == 0xff && data[data.len() - 1] == 0xd9;
    has_header && has_trailer
}

/// A decoded RGBA8 icon.
#[derive(Debug, Clone)]
pub struct DecodedIcon {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Default `IconRenderer` backed by the `image` crate.
///
/// Decodes icon bytes into RGBA8 pixels held in a slab keyed by handle, so a
/// GPU-less embedder (and the test suite) can run the full pipeline. A real
/// renderer replaces this with texture uploads behind the same trait.
pub struct DecodedIconStore {
    icons: Mutex<HashMap<u64, DecodedIcon>>,
    next_id: AtomicU64,
}

impl DecodedIconStore {
    pub fn new() -> Self {
        Self {
            icons: Mutex::new(HashMap::new()),
            // 0 is reserved for IconHandle::PLACEHOLDER
            next_id: AtomicU64::new(1),
        }
    }

    /// Fetch the pixels behind a handle, if still alive.
    pub fn get(&self, handle: IconHandle) -> Option<DecodedIcon> {
        self.icons.lock().get(&handle.0).cloned()
    }

    /// Number of live decoded icons.
    pub fn live_count(&self) -> usize {
        self.icons.lock().len()
    }
}

impl Default for DecodedIconStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IconRenderer for DecodedIconStore {
    fn decode(&self, bytes: &[u8]) -> Result<IconHandle, CoreError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CoreError::IconDecode(e.to_string()))?;

        let img = reader
            .decode()
            .map_err(|e| CoreError::IconDecode(e.to_string()))?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.icons.lock().insert(
            id,
            DecodedIcon {
                width,
                height,
                rgba: rgba.into_raw(),
            },
        );

        Ok(IconHandle(id))
    }

    fn release(&self, handle: IconHandle) {
        if handle == IconHandle::PLACEHOLDER {
            return;
        }
        if self.icons.lock().remove(&handle.0).is_none() {
            tracing::warn!("Released unknown icon handle {:?}", handle);
        }
    }
}
