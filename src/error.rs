//! Error types for the binding layer
//!
//! Every failure that can cross the native boundary is surfaced here as an
//! explicit result. Missing metadata fields are not errors; they come back as
//! `None` from the accessors.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for binding operations
pub type Result<T> = std::result::Result<T, EpubError>;

/// Binding error type
#[derive(Debug, Error)]
pub enum EpubError {
    /// The engine could not produce a document (missing file, unreadable
    /// archive, unsupported format)
    #[error("Failed to open EPUB: {}", path.display())]
    OpenFailure { path: PathBuf },

    /// Path was empty, not valid UTF-8, or contained a NUL byte
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Operation attempted on a released handle or on a view whose owner is gone
    #[error("Document handle used after release")]
    UseAfterRelease,

    /// Direct index access outside `[0, count)`
    #[error("Index {index} out of range for {field} (count {count})")]
    IndexOutOfRange {
        field: &'static str,
        index: usize,
        count: usize,
    },

    /// The engine reported exhaustion while deriving a resource
    #[error("Native allocation failure: {0}")]
    AllocationFailure(String),

    /// The engine could not locate or write the cover image
    #[error("Cover image could not be saved to {}", path.display())]
    CoverNotSaved { path: PathBuf },
}

impl EpubError {
    /// Whether this error indicates a caller logic defect rather than a
    /// recoverable condition
    pub fn is_programming_error(&self) -> bool {
        matches!(self, EpubError::UseAfterRelease)
    }
}
