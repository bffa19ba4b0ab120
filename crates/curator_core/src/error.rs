//! Core error types

use thiserror::Error;

/// Main error type for the catalog pipeline
#[derive(Error, Debug)]
pub enum CoreError {
    // ===== Recoverable Errors (degrade, continue) =====
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Title enumeration failed: {0}")]
    Registry(String),

    #[error("Metadata fetch failed for {0:#018x}")]
    Metadata(u64),

    #[error("Occupied-size query failed for {0:#018x}")]
    OccupiedSize(u64),

    #[error("Icon decode error: {0}")]
    IconDecode(String),

    #[error("Removal failed for {0:#018x}")]
    Removal(u64),

    #[error("Storage probe failed: {0}")]
    StorageProbe(String),

    // ===== Fatal Errors (surface to the embedder) =====
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Init(String),
}

impl CoreError {
    /// Is this error recoverable?
    ///
    /// Recoverable errors degrade a single entry or a single scan pass; the
    /// catalog stays consistent and usable. Nothing in this crate escalates
    /// to process termination.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CoreError::Config(_) | CoreError::Init(_))
    }

    /// Is this a fatal error?
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

impl From<image::ImageError> for CoreError {
    fn from(e: image::ImageError) -> Self {
        CoreError::IconDecode(e.to_string())
    }
}
