//! Metadata view and field accessors
//!
//! A [`Metadata`] view borrows nothing and owns nothing: it carries a weak
//! back-reference to its document and checks liveness before every call
//! into the engine. Native strings are copied into owned `String`s inside
//! the handle lock; no engine buffer outlives the accessor that read it.

use std::os::raw::c_int;
use std::sync::Weak;

use serde::{Deserialize, Serialize};

use crate::document::{use_after_release, Handle};
use crate::error::{EpubError, Result};
use crate::sys::{self, CountFn, EngineApi, EpubMetadata, ItemFn, ScalarFn};

/// Single-valued metadata fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarField {
    Title,
    Subtitle,
    Language,
    Description,
    Publisher,
}

impl ScalarField {
    pub const ALL: [ScalarField; 5] = [
        ScalarField::Title,
        ScalarField::Subtitle,
        ScalarField::Language,
        ScalarField::Description,
        ScalarField::Publisher,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScalarField::Title => "title",
            ScalarField::Subtitle => "subtitle",
            ScalarField::Language => "language",
            ScalarField::Description => "description",
            ScalarField::Publisher => "publisher",
        }
    }

    fn reader(self, api: &EngineApi) -> ScalarFn {
        match self {
            ScalarField::Title => api.get_title,
            ScalarField::Subtitle => api.get_subtitle,
            ScalarField::Language => api.get_language,
            ScalarField::Description => api.get_description,
            ScalarField::Publisher => api.get_publisher,
        }
    }
}

/// Ordered, multi-valued metadata fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepeatedField {
    Authors,
    Creators,
    Identifiers,
}

impl RepeatedField {
    pub const ALL: [RepeatedField; 3] = [
        RepeatedField::Authors,
        RepeatedField::Creators,
        RepeatedField::Identifiers,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RepeatedField::Authors => "authors",
            RepeatedField::Creators => "creators",
            RepeatedField::Identifiers => "identifiers",
        }
    }

    fn readers(self, api: &EngineApi) -> (CountFn, ItemFn) {
        match self {
            RepeatedField::Authors => (api.get_author_count, api.get_author_at),
            RepeatedField::Creators => (api.get_creator_count, api.get_creator_at),
            RepeatedField::Identifiers => (api.get_identifier_count, api.get_identifier_at),
        }
    }
}

/// Snapshot of every metadata field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub authors: Vec<String>,
    pub creators: Vec<String>,
    pub identifiers: Vec<String>,
}

/// Non-owning view over a document's metadata
///
/// Obtained from [`crate::Document::metadata`]. There is no way to release a
/// view; dropping it never touches native memory.
#[derive(Debug, Clone)]
pub struct Metadata {
    owner: Weak<Handle>,
}

impl Metadata {
    pub(crate) fn new(owner: Weak<Handle>) -> Self {
        Self { owner }
    }

    fn with_live<F, T>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&EngineApi, *const EpubMetadata) -> Result<T>,
    {
        let owner = self
            .owner
            .upgrade()
            .ok_or_else(|| use_after_release(operation, None))?;
        owner.with_metadata(operation, f)
    }

    /// Whether the owning document is still live
    pub fn is_live(&self) -> bool {
        self.owner.upgrade().map_or(false, |owner| owner.is_live())
    }

    /// Read a scalar field; `None` when the engine reports it absent
    pub fn get(&self, field: ScalarField) -> Result<Option<String>> {
        self.with_live("get", |api, meta| {
            // SAFETY: metadata is live under the handle lock; the buffer is
            // copied before the lock is released
            Ok(unsafe { sys::copy_c_str((field.reader(api))(meta)) })
        })
    }

    /// Number of elements the engine reports for a repeated field
    pub fn count(&self, field: RepeatedField) -> Result<usize> {
        self.with_live("count", |api, meta| Ok(raw_count(api, meta, field)))
    }

    /// Read one element of a repeated field
    ///
    /// Fails with [`EpubError::IndexOutOfRange`] unless `index` is below the
    /// current count. A malformed (null) entry inside the range is `None`.
    pub fn get_at(&self, field: RepeatedField, index: usize) -> Result<Option<String>> {
        self.with_live("get_at", |api, meta| {
            let count = raw_count(api, meta, field);
            if index >= count {
                return Err(EpubError::IndexOutOfRange {
                    field: field.name(),
                    index,
                    count,
                });
            }
            // SAFETY: index is within [0, count) and metadata is live
            Ok(unsafe { raw_item(api, meta, field, index) })
        })
    }

    /// Read every element of a repeated field, in engine order
    ///
    /// Null and empty entries are skipped, so the result may be shorter
    /// than [`Metadata::count`]. Nothing is reordered or deduplicated.
    pub fn list(&self, field: RepeatedField) -> Result<Vec<String>> {
        self.with_live("list", |api, meta| {
            let count = raw_count(api, meta, field);
            let mut values = Vec::with_capacity(count);

            for index in 0..count {
                // SAFETY: index is within [0, count) and metadata is live
                match unsafe { raw_item(api, meta, field, index) } {
                    Some(value) if !value.is_empty() => values.push(value),
                    Some(_) => {
                        tracing::debug!(field = field.name(), index, "Skipping empty entry")
                    }
                    None => tracing::warn!(field = field.name(), index, "Skipping null entry"),
                }
            }
            Ok(values)
        })
    }

    pub fn title(&self) -> Result<Option<String>> {
        self.get(ScalarField::Title)
    }

    pub fn subtitle(&self) -> Result<Option<String>> {
        self.get(ScalarField::Subtitle)
    }

    pub fn language(&self) -> Result<Option<String>> {
        self.get(ScalarField::Language)
    }

    pub fn description(&self) -> Result<Option<String>> {
        self.get(ScalarField::Description)
    }

    pub fn publisher(&self) -> Result<Option<String>> {
        self.get(ScalarField::Publisher)
    }

    pub fn authors(&self) -> Result<Vec<String>> {
        self.list(RepeatedField::Authors)
    }

    pub fn creators(&self) -> Result<Vec<String>> {
        self.list(RepeatedField::Creators)
    }

    pub fn identifiers(&self) -> Result<Vec<String>> {
        self.list(RepeatedField::Identifiers)
    }

    /// Read all fields into an owned record
    pub fn record(&self) -> Result<MetadataRecord> {
        Ok(MetadataRecord {
            title: self.title()?,
            subtitle: self.subtitle()?,
            language: self.language()?,
            description: self.description()?,
            publisher: self.publisher()?,
            authors: self.authors()?,
            creators: self.creators()?,
            identifiers: self.identifiers()?,
        })
    }
}

fn raw_count(api: &EngineApi, meta: *const EpubMetadata, field: RepeatedField) -> usize {
    let (count_fn, _) = field.readers(api);
    // SAFETY: callers hold the handle lock with live metadata
    let raw = unsafe { count_fn(meta) };
    sys::count_from_raw(raw, field.name())
}

/// # Safety
///
/// `meta` must be live and `index` below the count just reported for `field`.
unsafe fn raw_item(
    api: &EngineApi,
    meta: *const EpubMetadata,
    field: RepeatedField,
    index: usize,
) -> Option<String> {
    let (_, item_fn) = field.readers(api);
    // Counts come from a c_int, so any index below one fits
    sys::copy_c_str(item_fn(meta, index as c_int))
}
