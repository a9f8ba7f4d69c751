//! C ABI entry points of the reference engine
//!
//! Signatures mirror `epubinfo.h` one-to-one so the table in
//! [`crate::sys::EngineApi`] can point at either implementation.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr;

use super::{NativeDocument, NativeMetadata};
use crate::sys::{EpubDocument, EpubMetadata};

/// Load a document from a NUL-terminated UTF-8 path.
///
/// # Safety
///
/// `path` must be null or a valid NUL-terminated string.
pub unsafe extern "C" fn epub_document_open(path: *const c_char) -> *mut EpubDocument {
    if path.is_null() {
        return ptr::null_mut();
    }
    let Ok(path) = CStr::from_ptr(path).to_str() else {
        tracing::warn!("Engine rejected a non UTF-8 path");
        return ptr::null_mut();
    };

    match NativeDocument::load(Path::new(path)) {
        Ok(doc) => Box::into_raw(Box::new(doc)).cast(),
        Err(e) => {
            tracing::warn!(path, error = %e, "Engine failed to open EPUB");
            ptr::null_mut()
        }
    }
}

/// Free a document and the metadata derived from it.
///
/// # Safety
///
/// `doc` must be null or a pointer returned by [`epub_document_open`] that
/// has not been freed yet.
pub unsafe extern "C" fn epub_document_free(doc: *mut EpubDocument) {
    if !doc.is_null() {
        drop(Box::from_raw(doc.cast::<NativeDocument>()));
    }
}

/// Borrow the metadata of a live document. Never free the result.
///
/// # Safety
///
/// `doc` must be null or a live document pointer.
pub unsafe extern "C" fn epub_document_get_metadata(doc: *mut EpubDocument) -> *const EpubMetadata {
    match doc.cast::<NativeDocument>().as_ref() {
        Some(doc) => (doc.metadata() as *const NativeMetadata).cast(),
        None => ptr::null(),
    }
}

/// Write the cover image to `path`. Returns 0 on success.
///
/// # Safety
///
/// `doc` must be null or a live document pointer; `path` must be null or a
/// valid NUL-terminated string.
pub unsafe extern "C" fn epub_document_save_cover(
    doc: *const EpubDocument,
    path: *const c_char,
) -> c_int {
    let Some(doc) = doc.cast::<NativeDocument>().as_ref() else {
        return -1;
    };
    if path.is_null() {
        return -1;
    }
    let Ok(output) = CStr::from_ptr(path).to_str() else {
        return -1;
    };

    match doc.save_cover(Path::new(output)) {
        Ok(()) => 0,
        Err(e) => {
            tracing::warn!(output, error = %e, "Engine failed to save cover");
            -1
        }
    }
}

unsafe fn metadata<'a>(meta: *const EpubMetadata) -> Option<&'a NativeMetadata> {
    meta.cast::<NativeMetadata>().as_ref()
}

fn scalar(value: Option<&CString>) -> *const c_char {
    value.map_or(ptr::null(), |s| s.as_ptr())
}

fn count(values: &[CString]) -> c_int {
    c_int::try_from(values.len()).unwrap_or(c_int::MAX)
}

fn item(values: &[CString], index: c_int) -> *const c_char {
    usize::try_from(index)
        .ok()
        .and_then(|i| values.get(i))
        .map_or(ptr::null(), |s| s.as_ptr())
}

macro_rules! scalar_reader {
    ($(#[$doc:meta])* $name:ident, $field:ident) => {
        $(#[$doc])*
        ///
        /// # Safety
        ///
        /// `meta` must be null or the metadata of a live document.
        pub unsafe extern "C" fn $name(meta: *const EpubMetadata) -> *const c_char {
            metadata(meta).map_or(ptr::null(), |m| scalar(m.$field.as_ref()))
        }
    };
}

macro_rules! repeated_reader {
    ($(#[$doc:meta])* $count_fn:ident, $item_fn:ident, $field:ident) => {
        $(#[$doc])*
        ///
        /// # Safety
        ///
        /// `meta` must be null or the metadata of a live document.
        pub unsafe extern "C" fn $count_fn(meta: *const EpubMetadata) -> c_int {
            metadata(meta).map_or(0, |m| count(&m.$field))
        }

        /// Element at `index`, or null when out of bounds.
        ///
        /// # Safety
        ///
        /// `meta` must be null or the metadata of a live document.
        pub unsafe extern "C" fn $item_fn(meta: *const EpubMetadata, index: c_int) -> *const c_char {
            metadata(meta).map_or(ptr::null(), |m| item(&m.$field, index))
        }
    };
}

scalar_reader! {
    /// Title, or null.
    epub_metadata_get_title, title
}

scalar_reader! {
    /// Subtitle, or null.
    epub_metadata_get_subtitle, subtitle
}

scalar_reader! {
    /// Language code, or null.
    epub_metadata_get_language, language
}

scalar_reader! {
    /// Description, or null.
    epub_metadata_get_description, description
}

scalar_reader! {
    /// Publisher, or null.
    epub_metadata_get_publisher, publisher
}

repeated_reader! {
    /// Number of authors.
    epub_metadata_get_author_count, epub_metadata_get_author, authors
}

repeated_reader! {
    /// Number of creators.
    epub_metadata_get_creator_count, epub_metadata_get_creator, creators
}

repeated_reader! {
    /// Number of identifiers.
    epub_metadata_get_identifier_count, epub_metadata_get_identifier, identifiers
}
