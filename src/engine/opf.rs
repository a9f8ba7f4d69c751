//! OPF and container.xml parsing
//!
//! Streams the XML with `quick_xml::Reader` rather than deserializing, so
//! repeated Dublin Core elements keep their document order.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::EngineResult;

/// Metadata extracted from a package document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub authors: Vec<String>,
    pub creators: Vec<String>,
    pub identifiers: Vec<String>,
    /// Cover image href, relative to the package document
    pub cover_href: Option<String>,
}

/// Dublin Core elements the engine records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DcElement {
    Title,
    Subject,
    Language,
    Description,
    Publisher,
    Creator,
    Identifier,
    Author,
}

impl DcElement {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"subject" => Some(Self::Subject),
            b"language" => Some(Self::Language),
            b"description" => Some(Self::Description),
            b"publisher" => Some(Self::Publisher),
            b"creator" => Some(Self::Creator),
            b"identifier" => Some(Self::Identifier),
            b"author" => Some(Self::Author),
            _ => None,
        }
    }

    fn local_name(self) -> &'static [u8] {
        match self {
            Self::Title => b"title",
            Self::Subject => b"subject",
            Self::Language => b"language",
            Self::Description => b"description",
            Self::Publisher => b"publisher",
            Self::Creator => b"creator",
            Self::Identifier => b"identifier",
            Self::Author => b"author",
        }
    }
}

/// Manifest entry (only what cover lookup needs)
#[derive(Debug)]
struct ManifestItem {
    id: Option<String>,
    href: String,
    properties: Option<String>,
}

impl PackageMetadata {
    fn record(&mut self, element: DcElement, text: String) {
        let scalar = match element {
            DcElement::Title => &mut self.title,
            // `dc:subject` has always been reported as the subtitle
            DcElement::Subject => &mut self.subtitle,
            DcElement::Language => &mut self.language,
            DcElement::Description => &mut self.description,
            DcElement::Publisher => &mut self.publisher,
            DcElement::Creator => return self.creators.push(text),
            DcElement::Identifier => return self.identifiers.push(text),
            DcElement::Author => return self.authors.push(text),
        };
        if scalar.is_none() {
            *scalar = Some(text);
        }
    }
}

/// Find `rootfile[full-path]` in `META-INF/container.xml`
pub fn find_rootfile(xml: &str) -> EngineResult<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"rootfile" => {
                if let Some(path) = attribute(&e, b"full-path")? {
                    return Ok(Some(path));
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Parse the `<metadata>` section of a package document, then look for a cover
///
/// Markup errors inside `<metadata>` fail the parse. Nothing after
/// `</metadata>` is parsed strictly: the manifest is only read to find the
/// cover, and a broken manifest means no cover.
pub fn parse_package(xml: &str) -> EngineResult<PackageMetadata> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut meta = PackageMetadata::default();
    let mut cover_id = None;

    let mut in_metadata = false;
    let mut current: Option<(DcElement, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if e.local_name().as_ref() == b"metadata" {
                    in_metadata = true;
                } else if in_metadata && current.is_none() {
                    if let Some(element) = dublin_core(&e) {
                        current = Some((element, String::new()));
                    } else {
                        inspect_meta(&e, &mut cover_id);
                    }
                }
            }
            Event::Empty(e) if in_metadata => inspect_meta(&e, &mut cover_id),
            Event::Text(t) => {
                if let Some((_, text)) = current.as_mut() {
                    // Undeclared entities such as `&nbsp;` are kept verbatim
                    match t.unescape() {
                        Ok(unescaped) => text.push_str(&unescaped),
                        Err(_) => text.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Event::CData(c) => {
                if let Some((_, text)) = current.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => {
                let local = e.local_name();
                match current.take() {
                    Some((element, text)) if local.as_ref() == element.local_name() => {
                        let text = text.trim();
                        if !text.is_empty() {
                            meta.record(element, text.to_string());
                        }
                    }
                    other => current = other,
                }
                if in_metadata && local.as_ref() == b"metadata" {
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let mut manifest = Vec::new();
    if let Err(e) = scan_manifest(xml, &mut manifest) {
        tracing::debug!(error = %e, items = manifest.len(), "Stopped reading manifest early");
    }
    meta.cover_href = find_cover(&manifest, cover_id.as_deref());
    Ok(meta)
}

/// Collect manifest items into `items` until the end of the document
///
/// Items with unreadable attributes are skipped. On a markup error the items
/// gathered so far are kept.
fn scan_manifest(xml: &str, items: &mut Vec<ManifestItem>) -> EngineResult<()> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"item" => {
                match manifest_item(&e) {
                    Ok(item) => items.extend(item),
                    Err(e) => tracing::debug!(error = %e, "Skipping unreadable manifest item"),
                }
            }
            Event::Eof => return Ok(()),
            _ => {}
        }
    }
}

fn dublin_core(e: &BytesStart<'_>) -> Option<DcElement> {
    let name = e.name();
    let is_dc = name.prefix().map_or(false, |p| p.as_ref() == b"dc");
    if !is_dc {
        return None;
    }
    DcElement::from_local_name(name.local_name().as_ref())
}

/// EPUB 2 cover declaration: `<meta name="cover" content="item-id"/>`
fn inspect_meta(e: &BytesStart<'_>, cover_id: &mut Option<String>) {
    if e.local_name().as_ref() != b"meta" || cover_id.is_some() {
        return;
    }
    let declared = attribute(e, b"name").and_then(|name| match name.as_deref() {
        Some("cover") => attribute(e, b"content"),
        _ => Ok(None),
    });
    match declared {
        Ok(id) => *cover_id = id,
        Err(e) => tracing::debug!(error = %e, "Ignoring unreadable <meta> element"),
    }
}

fn manifest_item(e: &BytesStart<'_>) -> EngineResult<Option<ManifestItem>> {
    let Some(href) = attribute(e, b"href")? else {
        return Ok(None);
    };
    Ok(Some(ManifestItem {
        id: attribute(e, b"id")?,
        href,
        properties: attribute(e, b"properties")?,
    }))
}

fn find_cover(manifest: &[ManifestItem], cover_id: Option<&str>) -> Option<String> {
    let epub3 = manifest.iter().find(|item| {
        item.properties
            .as_deref()
            .map_or(false, |p| p.split_whitespace().any(|p| p == "cover-image"))
    });

    epub3
        .or_else(|| {
            let id = cover_id?;
            manifest.iter().find(|item| item.id.as_deref() == Some(id))
        })
        .map(|item| item.href.clone())
}

pub(super) fn attribute(e: &BytesStart<'_>, name: &[u8]) -> EngineResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
