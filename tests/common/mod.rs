//! Fixture EPUB builder shared by the integration tests

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::{write::SimpleFileOptions, ZipWriter};

pub const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// Metadata block contents of a fixture package document
pub struct Fixture {
    pub metadata: String,
    pub manifest: String,
    pub extra_entries: Vec<(String, Vec<u8>)>,
}

impl Fixture {
    pub fn new(metadata: &str) -> Self {
        Self {
            metadata: metadata.to_string(),
            manifest: String::new(),
            extra_entries: Vec::new(),
        }
    }

    pub fn with_cover(mut self, href: &str, bytes: &[u8]) -> Self {
        self.manifest.push_str(&format!(
            r#"<item id="cover" href="{}" media-type="image/jpeg" properties="cover-image"/>"#,
            href
        ));
        self.extra_entries
            .push((format!("OEBPS/{}", href), bytes.to_vec()));
        self
    }

    fn package(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package version="3.0" xmlns="http://www.idpf.org/2007/opf" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    {}
  </metadata>
  <manifest>
    <item id="chapter1" href="chapter1.xhtml" media-type="application/xhtml+xml"/>
    {}
  </manifest>
  <spine>
    <itemref idref="chapter1"/>
  </spine>
</package>"#,
            self.metadata, self.manifest
        )
    }

    /// Write the fixture as `name` inside `dir`
    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mut zip = ZipWriter::new(file);
        let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let options = SimpleFileOptions::default();

        // mimetype (must be first, uncompressed)
        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();

        zip.start_file("META-INF/container.xml", options).unwrap();
        zip.write_all(CONTAINER.as_bytes()).unwrap();

        zip.start_file("OEBPS/content.opf", options).unwrap();
        zip.write_all(self.package().as_bytes()).unwrap();

        zip.start_file("OEBPS/chapter1.xhtml", options).unwrap();
        zip.write_all(b"<html><body><p>Chapter 1</p></body></html>").unwrap();

        for (name, bytes) in &self.extra_entries {
            zip.start_file(name.as_str(), options).unwrap();
            zip.write_all(bytes).unwrap();
        }

        zip.finish().unwrap();
        path
    }
}

/// The round-trip fixture: title "T", authors A1/A2, one identifier, no publisher
pub fn round_trip_fixture() -> Fixture {
    Fixture::new(
        r#"<dc:identifier id="uid">id-1</dc:identifier>
    <dc:title>T</dc:title>
    <dc:author>A1</dc:author>
    <dc:author>A2</dc:author>
    <dc:creator>C1</dc:creator>
    <dc:language>en</dc:language>"#,
    )
}
