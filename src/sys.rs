//! Native engine ABI
//!
//! The engine is reached only through the fixed set of C entry points below.
//! [`EngineApi`] collects them into a function table so the binding layer can
//! run against either the in-crate reference engine or the system
//! `libepubinfo` library (cargo feature `system-engine`).
//!
//! # Safety
//!
//! Every pointer in the table is `unsafe extern "C"`. The callers in
//! [`crate::document`] and [`crate::metadata`] uphold the engine contract:
//!
//! 1. Document pointers are passed only while live (never after release)
//! 2. Metadata pointers are used only while their document is live
//! 3. Indexes passed to item readers are always within `[0, count)`
//! 4. Returned strings are copied before the next call into the engine

use std::ffi::{CStr, CString};
use std::marker::{PhantomData, PhantomPinned};
use std::os::raw::{c_char, c_int};
use std::path::Path;

use crate::error::{EpubError, Result};

/// Opaque native document resource
#[repr(C)]
pub struct EpubDocument {
    _data: [u8; 0],
    _marker: PhantomData<(*mut u8, PhantomPinned)>,
}

/// Opaque native metadata resource, owned by its document
#[repr(C)]
pub struct EpubMetadata {
    _data: [u8; 0],
    _marker: PhantomData<(*mut u8, PhantomPinned)>,
}

/// `open(path) -> document | null`
pub type OpenFn = unsafe extern "C" fn(path: *const c_char) -> *mut EpubDocument;
/// `release_document(document)`
pub type ReleaseFn = unsafe extern "C" fn(doc: *mut EpubDocument);
/// `get_metadata(document) -> metadata`
pub type MetadataFn = unsafe extern "C" fn(doc: *mut EpubDocument) -> *const EpubMetadata;
/// `get_<scalar>(metadata) -> string | null`
pub type ScalarFn = unsafe extern "C" fn(meta: *const EpubMetadata) -> *const c_char;
/// `get_<repeated>_count(metadata) -> int`
pub type CountFn = unsafe extern "C" fn(meta: *const EpubMetadata) -> c_int;
/// `get_<repeated>_at(metadata, index) -> string | null`
pub type ItemFn = unsafe extern "C" fn(meta: *const EpubMetadata, index: c_int) -> *const c_char;
/// `save_cover(document, path) -> 0 on success`
pub type SaveCoverFn = unsafe extern "C" fn(doc: *const EpubDocument, path: *const c_char) -> c_int;

/// Function table for one native engine
#[derive(Clone, Copy, Debug)]
pub struct EngineApi {
    pub open: OpenFn,
    pub release_document: ReleaseFn,
    pub get_metadata: MetadataFn,

    pub get_title: ScalarFn,
    pub get_subtitle: ScalarFn,
    pub get_language: ScalarFn,
    pub get_description: ScalarFn,
    pub get_publisher: ScalarFn,

    pub get_author_count: CountFn,
    pub get_author_at: ItemFn,
    pub get_creator_count: CountFn,
    pub get_creator_at: ItemFn,
    pub get_identifier_count: CountFn,
    pub get_identifier_at: ItemFn,

    pub save_cover: SaveCoverFn,
}

impl EngineApi {
    /// Table backed by the in-crate reference engine
    pub fn builtin() -> Self {
        use crate::engine::ffi;

        Self {
            open: ffi::epub_document_open,
            release_document: ffi::epub_document_free,
            get_metadata: ffi::epub_document_get_metadata,
            get_title: ffi::epub_metadata_get_title,
            get_subtitle: ffi::epub_metadata_get_subtitle,
            get_language: ffi::epub_metadata_get_language,
            get_description: ffi::epub_metadata_get_description,
            get_publisher: ffi::epub_metadata_get_publisher,
            get_author_count: ffi::epub_metadata_get_author_count,
            get_author_at: ffi::epub_metadata_get_author,
            get_creator_count: ffi::epub_metadata_get_creator_count,
            get_creator_at: ffi::epub_metadata_get_creator,
            get_identifier_count: ffi::epub_metadata_get_identifier_count,
            get_identifier_at: ffi::epub_metadata_get_identifier,
            save_cover: ffi::epub_document_save_cover,
        }
    }

    /// Table backed by the linked `libepubinfo`
    #[cfg(feature = "system-engine")]
    pub fn system() -> Self {
        use self::system as sys;

        Self {
            open: sys::EpubDocument_from_file,
            release_document: sys::EpubDocument_free,
            get_metadata: sys::EpubDocument_get_metadata,
            get_title: sys::EpubMetadata_get_title,
            get_subtitle: sys::EpubMetadata_get_subtitle,
            get_language: sys::EpubMetadata_get_language,
            get_description: sys::EpubMetadata_get_description,
            get_publisher: sys::EpubMetadata_get_publisher,
            get_author_count: sys::EpubMetadata_get_author_count,
            get_author_at: sys::EpubMetadata_get_author,
            get_creator_count: sys::EpubMetadata_get_creator_count,
            get_creator_at: sys::EpubMetadata_get_creator,
            get_identifier_count: sys::EpubMetadata_get_identifier_count,
            get_identifier_at: sys::EpubMetadata_get_identifier,
            save_cover: sys::EpubDocument_save_cover,
        }
    }
}

impl Default for EngineApi {
    #[cfg(feature = "system-engine")]
    fn default() -> Self {
        Self::system()
    }

    #[cfg(not(feature = "system-engine"))]
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(feature = "system-engine")]
#[allow(non_snake_case)]
mod system {
    use super::{EpubDocument, EpubMetadata};
    use std::os::raw::{c_char, c_int};

    #[link(name = "epubinfo")]
    extern "C" {
        pub fn EpubDocument_from_file(filename: *const c_char) -> *mut EpubDocument;
        pub fn EpubDocument_free(doc: *mut EpubDocument);
        pub fn EpubDocument_get_metadata(doc: *mut EpubDocument) -> *const EpubMetadata;

        pub fn EpubMetadata_get_title(meta: *const EpubMetadata) -> *const c_char;
        pub fn EpubMetadata_get_subtitle(meta: *const EpubMetadata) -> *const c_char;
        pub fn EpubMetadata_get_language(meta: *const EpubMetadata) -> *const c_char;
        pub fn EpubMetadata_get_description(meta: *const EpubMetadata) -> *const c_char;
        pub fn EpubMetadata_get_publisher(meta: *const EpubMetadata) -> *const c_char;

        pub fn EpubMetadata_get_author_count(meta: *const EpubMetadata) -> c_int;
        pub fn EpubMetadata_get_author(meta: *const EpubMetadata, index: c_int) -> *const c_char;
        pub fn EpubMetadata_get_creator_count(meta: *const EpubMetadata) -> c_int;
        pub fn EpubMetadata_get_creator(meta: *const EpubMetadata, index: c_int) -> *const c_char;
        pub fn EpubMetadata_get_identifier_count(meta: *const EpubMetadata) -> c_int;
        pub fn EpubMetadata_get_identifier(
            meta: *const EpubMetadata,
            index: c_int,
        ) -> *const c_char;

        pub fn EpubDocument_save_cover(doc: *const EpubDocument, filename: *const c_char) -> c_int;
    }
}

/// Convert a caller path into the byte string the engine expects
pub fn path_to_cstring(path: &Path) -> Result<CString> {
    let text = path
        .to_str()
        .ok_or_else(|| EpubError::InvalidPath(format!("not valid UTF-8: {}", path.display())))?;

    if text.is_empty() {
        return Err(EpubError::InvalidPath("path is empty".into()));
    }

    CString::new(text).map_err(|_| EpubError::InvalidPath(format!("contains NUL byte: {}", text)))
}

/// Copy a native string into an owned `String`
///
/// Invalid UTF-8 is replaced rather than rejected.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated buffer that stays valid
/// for the duration of this call.
pub unsafe fn copy_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// Interpret a native element count
pub fn count_from_raw(raw: c_int, field: &str) -> usize {
    usize::try_from(raw).unwrap_or_else(|_| {
        tracing::warn!(field, count = raw, "Engine reported a negative count, treating as empty");
        0
    })
}
