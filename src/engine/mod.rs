//! Reference native engine
//!
//! A Rust implementation of the engine side of the ABI in [`crate::sys`]. It
//! plays the role of `libepubinfo` when the crate is built without the
//! `system-engine` feature: documents are heap allocated and handed across
//! the boundary as raw pointers, and every string it returns is a `CString`
//! owned by the document, valid until `release_document`.
//!
//! The binding layer never calls into this module directly; it only sees the
//! function table returned by [`crate::sys::EngineApi::builtin`].

mod archive;
pub mod ffi;
mod opf;

use std::ffi::CString;
use std::path::{Path, PathBuf};

use thiserror::Error;

use archive::EpubArchive;
use opf::PackageMetadata;

/// Engine-internal failure, logged and reported to the binding as null
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("Entry not found in archive: {0}")]
    MissingEntry(String),

    #[error("Entry {name} exceeds the {limit} byte limit")]
    EntryTooLarge { name: String, limit: u64 },

    #[error("Invalid EPUB: rootfile not found in container.xml")]
    MissingRootfile,

    #[error("Entry is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("No cover image declared in package document")]
    NoCover,
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Native-side document: the parse of one archive
pub(crate) struct NativeDocument {
    source: PathBuf,
    package_path: String,
    cover_href: Option<String>,
    metadata: NativeMetadata,
}

/// Native-side metadata, owned by its document
#[derive(Debug, Default)]
pub(crate) struct NativeMetadata {
    title: Option<CString>,
    subtitle: Option<CString>,
    language: Option<CString>,
    description: Option<CString>,
    publisher: Option<CString>,
    authors: Vec<CString>,
    creators: Vec<CString>,
    identifiers: Vec<CString>,
}

impl NativeDocument {
    pub(crate) fn load(path: &Path) -> EngineResult<Self> {
        let mut archive = EpubArchive::open(path)?;
        let (package_path, xml) = archive.package_document()?;
        let package = opf::parse_package(&xml)?;

        tracing::debug!(
            path = %path.display(),
            package = %package_path,
            "Engine parsed package document"
        );

        Ok(Self {
            source: path.to_path_buf(),
            package_path,
            cover_href: package.cover_href.clone(),
            metadata: NativeMetadata::from(package),
        })
    }

    pub(crate) fn metadata(&self) -> &NativeMetadata {
        &self.metadata
    }

    /// Copy the cover image entry out of the archive to `output`
    pub(crate) fn save_cover(&self, output: &Path) -> EngineResult<()> {
        let href = self.cover_href.as_deref().ok_or(EngineError::NoCover)?;
        let entry = archive::resolve_href(&self.package_path, href);

        let mut archive = EpubArchive::open(&self.source)?;
        let bytes = archive.read_entry(&entry)?;
        std::fs::write(output, bytes)?;
        Ok(())
    }
}

impl From<PackageMetadata> for NativeMetadata {
    fn from(package: PackageMetadata) -> Self {
        Self {
            title: package.title.and_then(to_cstring),
            subtitle: package.subtitle.and_then(to_cstring),
            language: package.language.and_then(to_cstring),
            description: package.description.and_then(to_cstring),
            publisher: package.publisher.and_then(to_cstring),
            authors: package.authors.into_iter().filter_map(to_cstring).collect(),
            creators: package.creators.into_iter().filter_map(to_cstring).collect(),
            identifiers: package.identifiers.into_iter().filter_map(to_cstring).collect(),
        }
    }
}

fn to_cstring(value: String) -> Option<CString> {
    CString::new(value)
        .map_err(|e| tracing::warn!(position = e.nul_position(), "Dropping metadata value with NUL byte"))
        .ok()
}
