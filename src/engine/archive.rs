//! EPUB container access
//!
//! Thin layer over `zip::ZipArchive` that knows where an EPUB keeps its
//! package document.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use super::opf;
use super::{EngineError, EngineResult};

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Largest entry, after decompression, the engine will read into memory
pub const MAX_ENTRY_SIZE: u64 = 64 * 1024 * 1024;

/// An opened EPUB ZIP container
pub struct EpubArchive<R: Read + Seek> {
    zip: ZipArchive<R>,
}

impl EpubArchive<BufReader<File>> {
    /// Open an EPUB from disk
    pub fn open(path: &Path) -> EngineResult<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> EpubArchive<R> {
    pub fn new(reader: R) -> EngineResult<Self> {
        Ok(Self {
            zip: ZipArchive::new(reader)?,
        })
    }

    /// Read an entry, tolerating a leading `./` or `/` on either side
    pub fn read_entry(&mut self, name: &str) -> EngineResult<Vec<u8>> {
        let wanted = normalize_entry_path(name);
        let matched = self
            .zip
            .file_names()
            .find(|candidate| normalize_entry_path(candidate) == wanted)
            .map(str::to_string)
            .ok_or_else(|| EngineError::MissingEntry(name.to_string()))?;

        let file = self.zip.by_name(&matched)?;
        let too_large = || EngineError::EntryTooLarge {
            name: matched.clone(),
            limit: MAX_ENTRY_SIZE,
        };
        // Declared sizes come from the archive and are not trusted for allocation
        if file.size() > MAX_ENTRY_SIZE {
            return Err(too_large());
        }

        let mut content = Vec::new();
        file.take(MAX_ENTRY_SIZE + 1).read_to_end(&mut content)?;
        if content.len() as u64 > MAX_ENTRY_SIZE {
            return Err(too_large());
        }
        Ok(content)
    }

    /// Read an entry as UTF-8 text, dropping a leading byte order mark
    pub fn read_text(&mut self, name: &str) -> EngineResult<String> {
        let bytes = self.read_entry(name)?;
        let text = String::from_utf8(bytes).map_err(|_| EngineError::Encoding(name.to_string()))?;
        Ok(match text.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => text,
        })
    }

    /// Locate and read the package document named by `container.xml`
    ///
    /// Returns the package path inside the archive and its XML content.
    pub fn package_document(&mut self) -> EngineResult<(String, String)> {
        let container = self.read_text(CONTAINER_PATH)?;
        let rootfile = opf::find_rootfile(&container)?.ok_or(EngineError::MissingRootfile)?;
        let content = self.read_text(&rootfile)?;
        Ok((rootfile, content))
    }
}

/// Resolve an href from the package document to an archive entry path
pub fn resolve_href(package_path: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or(href);
    let mut parts: Vec<&str> = match package_path.rfind('/') {
        Some(idx) => package_path[..idx].split('/').collect(),
        None => Vec::new(),
    };

    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

fn normalize_entry_path(path: &str) -> String {
    path.replace('\\', "/")
        .trim_start_matches("./")
        .trim_start_matches('/')
        .to_string()
}
