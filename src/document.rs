//! Document handle lifecycle
//!
//! A [`Document`] owns one native document resource. The metadata resource
//! derived from it is fetched once, right after the open succeeds, and is
//! cached next to the document pointer.
//!
//! # Design
//!
//! ```text
//! Document ──owns──> Arc<Handle> ──Mutex──> RawHandle { document, metadata }
//!                        ^
//! Metadata ──Weak────────┘
//! ```
//!
//! Releasing clears both raw pointers to null. Every accessor takes the
//! handle lock and checks for null first, so a released handle yields
//! [`EpubError::UseAfterRelease`] instead of a dereference of freed memory.
//! Dropping a still-live `Document` releases it, so each successful open is
//! paired with exactly one native free on every exit path.
//!
//! # Threading
//!
//! The engine is not safe for concurrent use against one document. All
//! calls through a single handle (including its [`Metadata`] views) are
//! serialized by the handle lock. Distinct documents own disjoint native
//! memory and share no lock.

use std::os::raw::c_int;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{EpubError, Result};
use crate::metadata::Metadata;
use crate::sys::{self, EngineApi, EpubDocument, EpubMetadata};

/// Raw native identities; both null once released
#[derive(Debug)]
struct RawHandle {
    document: *mut EpubDocument,
    metadata: *const EpubMetadata,
}

impl RawHandle {
    fn is_live(&self) -> bool {
        !self.document.is_null()
    }

    fn clear(&mut self) {
        self.document = ptr::null_mut();
        self.metadata = ptr::null();
    }
}

/// Shared state between a document and its metadata views
#[derive(Debug)]
pub(crate) struct Handle {
    api: EngineApi,
    path: PathBuf,
    raw: Mutex<RawHandle>,
}

// SAFETY: Handle is Send + Sync because:
//
// 1. The raw pointers are only read or written while `raw` is locked, so no
//    two threads ever call into the engine for the same document at once.
// 2. The pointers are never handed out; accessors copy every returned string
//    into an owned `String` before the lock is released.
// 3. The engine keeps no thread-local state tied to a document, and distinct
//    documents own disjoint native memory.
unsafe impl Send for Handle {}
unsafe impl Sync for Handle {}

impl Handle {
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against the live metadata resource
    pub(crate) fn with_metadata<F, T>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&EngineApi, *const EpubMetadata) -> Result<T>,
    {
        let raw = self.raw.lock();
        if !raw.is_live() {
            return Err(use_after_release(operation, Some(&self.path)));
        }
        f(&self.api, raw.metadata)
    }

    fn with_document<F, T>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&EngineApi, *mut EpubDocument) -> Result<T>,
    {
        let raw = self.raw.lock();
        if !raw.is_live() {
            return Err(use_after_release(operation, Some(&self.path)));
        }
        f(&self.api, raw.document)
    }

    pub(crate) fn is_live(&self) -> bool {
        self.raw.lock().is_live()
    }

    fn release(&self) -> Result<()> {
        let mut raw = self.raw.lock();
        if !raw.is_live() {
            return Err(use_after_release("release", Some(&self.path)));
        }

        // SAFETY: the document is live and the lock excludes every other caller
        unsafe { (self.api.release_document)(raw.document) };
        raw.clear();

        tracing::debug!(path = %self.path.display(), "Released EPUB document");
        Ok(())
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        let raw = self.raw.get_mut();
        if raw.is_live() {
            // SAFETY: exclusive access through `&mut self`, document still live
            unsafe { (self.api.release_document)(raw.document) };
            raw.clear();
            tracing::debug!(path = %self.path.display(), "Released EPUB document on drop");
        }
    }
}

/// Log and build a use-after-release error
pub(crate) fn use_after_release(operation: &'static str, path: Option<&Path>) -> EpubError {
    match path {
        Some(path) => tracing::error!(
            operation,
            path = %path.display(),
            "Document handle used after release"
        ),
        None => tracing::error!(operation, "Metadata view used after its document was dropped"),
    }
    EpubError::UseAfterRelease
}

/// An open EPUB document
///
/// Move-only: there is exactly one owner, and exactly one native free per
/// successful [`Document::open`]. Call [`Document::release`] to free early
/// and observe the result, or let `Drop` do it.
#[derive(Debug)]
pub struct Document {
    handle: Arc<Handle>,
}

impl Document {
    /// Open a document with the default engine
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(EngineApi::default(), path)
    }

    /// Open a document through a specific engine function table
    pub fn open_with<P: AsRef<Path>>(api: EngineApi, path: P) -> Result<Self> {
        let path = path.as_ref();
        let c_path = sys::path_to_cstring(path)?;

        // SAFETY: `c_path` is a valid NUL-terminated string for this call
        let document = unsafe { (api.open)(c_path.as_ptr()) };
        if document.is_null() {
            tracing::debug!(path = %path.display(), "Engine returned no document");
            return Err(EpubError::OpenFailure {
                path: path.to_path_buf(),
            });
        }

        // SAFETY: `document` was just returned live by the engine
        let metadata = unsafe { (api.get_metadata)(document) };
        if metadata.is_null() {
            // SAFETY: still live, never shared; freed exactly once here
            unsafe { (api.release_document)(document) };
            return Err(EpubError::AllocationFailure(format!(
                "engine returned no metadata for {}",
                path.display()
            )));
        }

        tracing::debug!(path = %path.display(), "Opened EPUB document");

        Ok(Self {
            handle: Arc::new(Handle {
                api,
                path: path.to_path_buf(),
                raw: Mutex::new(RawHandle { document, metadata }),
            }),
        })
    }

    /// Path this document was opened from
    pub fn path(&self) -> &Path {
        self.handle.path()
    }

    /// Whether the native document has not been released yet
    pub fn is_live(&self) -> bool {
        self.handle.is_live()
    }

    /// Non-owning view over this document's metadata
    ///
    /// Views can be cloned and moved freely. They have no release operation
    /// of their own; once this document is released or dropped every view
    /// accessor returns [`EpubError::UseAfterRelease`].
    pub fn metadata(&self) -> Metadata {
        Metadata::new(Arc::downgrade(&self.handle))
    }

    /// Free the native document now
    ///
    /// The first call frees the document. Any further call returns
    /// [`EpubError::UseAfterRelease`] and does not reach the engine.
    pub fn release(&mut self) -> Result<()> {
        self.handle.release()
    }

    /// Save the cover image to `output`
    pub fn save_cover<P: AsRef<Path>>(&self, output: P) -> Result<()> {
        let output = output.as_ref();
        let c_output = sys::path_to_cstring(output)?;

        let status: c_int = self.handle.with_document("save_cover", |api, document| {
            // SAFETY: document is live under the handle lock; path is valid for the call
            Ok(unsafe { (api.save_cover)(document, c_output.as_ptr()) })
        })?;

        if status != 0 {
            return Err(EpubError::CoverNotSaved {
                path: output.to_path_buf(),
            });
        }
        tracing::debug!(output = %output.display(), "Saved cover image");
        Ok(())
    }
}
