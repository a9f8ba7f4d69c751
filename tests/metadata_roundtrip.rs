//! End-to-end tests against the reference engine with fixture archives

mod common;

use std::thread;

use epubinfo::{Document, EngineApi, EpubError, RepeatedField, ScalarField};
use tempfile::TempDir;

use common::{round_trip_fixture, Fixture};

#[test]
fn test_round_trip_then_release() {
    let dir = TempDir::new().unwrap();
    let path = round_trip_fixture().write(dir.path(), "round-trip.epub");

    let mut doc = Document::open_with(EngineApi::builtin(), &path).unwrap();
    let meta = doc.metadata();

    assert_eq!(meta.get(ScalarField::Title).unwrap().as_deref(), Some("T"));
    assert_eq!(meta.list(RepeatedField::Authors).unwrap(), vec!["A1", "A2"]);
    assert_eq!(meta.list(RepeatedField::Identifiers).unwrap(), vec!["id-1"]);
    assert_eq!(meta.creators().unwrap(), vec!["C1"]);
    assert_eq!(meta.language().unwrap().as_deref(), Some("en"));

    doc.release().unwrap();
    assert!(matches!(
        meta.get(ScalarField::Title),
        Err(EpubError::UseAfterRelease)
    ));
    assert!(matches!(
        meta.list(RepeatedField::Authors),
        Err(EpubError::UseAfterRelease)
    ));
}

#[test]
fn test_missing_publisher_is_absent() {
    let dir = TempDir::new().unwrap();
    let path = round_trip_fixture().write(dir.path(), "no-publisher.epub");

    let doc = Document::open_with(EngineApi::builtin(), &path).unwrap();
    assert_eq!(doc.metadata().publisher().unwrap(), None);
    assert_eq!(doc.metadata().subtitle().unwrap(), None);
}

#[test]
fn test_nonexistent_path_fails_to_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("does-not-exist.epub");

    for _ in 0..2 {
        let err = Document::open_with(EngineApi::builtin(), &path).unwrap_err();
        assert!(matches!(err, EpubError::OpenFailure { .. }));
    }
}

#[test]
fn test_non_epub_fails_to_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.epub");
    std::fs::write(&path, "not a zip archive").unwrap();

    let err = Document::open_with(EngineApi::builtin(), &path).unwrap_err();
    assert!(matches!(err, EpubError::OpenFailure { .. }));
}

#[test]
fn test_oversized_entry_claim_fails_to_open() {
    let dir = TempDir::new().unwrap();
    let path = round_trip_fixture().write(dir.path(), "huge-claim.epub");

    // Every central directory record claims a ~4 GiB uncompressed size
    let mut data = std::fs::read(&path).unwrap();
    for i in 0..data.len().saturating_sub(28) {
        if data[i..].starts_with(b"PK\x01\x02") {
            data[i + 24..i + 28].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        }
    }
    std::fs::write(&path, data).unwrap();

    let err = Document::open_with(EngineApi::builtin(), &path).unwrap_err();
    assert!(matches!(err, EpubError::OpenFailure { .. }));
}

#[test]
fn test_undeclared_entity_in_description() {
    let dir = TempDir::new().unwrap();
    let path = Fixture::new(
        r#"<dc:title>T</dc:title>
    <dc:description>A&nbsp;B</dc:description>"#,
    )
    .write(dir.path(), "nbsp.epub");

    let doc = Document::open_with(EngineApi::builtin(), &path).unwrap();
    let meta = doc.metadata();
    assert_eq!(meta.title().unwrap().as_deref(), Some("T"));
    assert_eq!(meta.description().unwrap().as_deref(), Some("A&nbsp;B"));
}

#[test]
fn test_unescaped_ampersand_in_manifest() {
    let dir = TempDir::new().unwrap();
    let mut fixture = Fixture::new("<dc:title>T</dc:title>");
    fixture.manifest =
        r#"<item id="c2" href="a&b.xhtml" media-type="application/xhtml+xml"/>"#.to_string();
    let path = fixture
        .with_cover("images/cover.jpg", b"jpeg-bytes")
        .write(dir.path(), "ampersand.epub");

    let doc = Document::open_with(EngineApi::builtin(), &path).unwrap();
    assert_eq!(doc.metadata().title().unwrap().as_deref(), Some("T"));

    let output = dir.path().join("cover.jpg");
    doc.save_cover(&output).unwrap();
    assert_eq!(std::fs::read(&output).unwrap(), b"jpeg-bytes");
}

#[test]
fn test_release_twice_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let path = round_trip_fixture().write(dir.path(), "twice.epub");

    let mut doc = Document::open_with(EngineApi::builtin(), &path).unwrap();
    assert!(doc.release().is_ok());
    for _ in 0..3 {
        assert!(matches!(doc.release(), Err(EpubError::UseAfterRelease)));
    }
}

#[test]
fn test_repeated_fields_bounded_non_empty_and_stable() {
    let dir = TempDir::new().unwrap();
    let path = Fixture::new(
        r#"<dc:title>Anthology</dc:title>
    <dc:creator>Zed</dc:creator>
    <dc:creator>Amy</dc:creator>
    <dc:creator>Zed</dc:creator>
    <dc:creator></dc:creator>
    <dc:identifier>urn:uuid:1</dc:identifier>
    <dc:identifier>isbn:2</dc:identifier>"#,
    )
    .write(dir.path(), "anthology.epub");

    let doc = Document::open_with(EngineApi::builtin(), &path).unwrap();
    let meta = doc.metadata();

    for field in RepeatedField::ALL {
        let count = meta.count(field).unwrap();
        let first = meta.list(field).unwrap();
        let second = meta.list(field).unwrap();

        assert!(first.len() <= count, "{} longer than count", field.name());
        assert!(first.iter().all(|v| !v.is_empty()));
        assert_eq!(first, second);
    }

    // engine order, duplicates kept
    assert_eq!(meta.creators().unwrap(), vec!["Zed", "Amy", "Zed"]);
    assert_eq!(meta.identifiers().unwrap(), vec!["urn:uuid:1", "isbn:2"]);
    assert!(meta.authors().unwrap().is_empty());
}

#[test]
fn test_get_at_matches_list() {
    let dir = TempDir::new().unwrap();
    let path = round_trip_fixture().write(dir.path(), "index.epub");

    let doc = Document::open_with(EngineApi::builtin(), &path).unwrap();
    let meta = doc.metadata();

    assert_eq!(meta.get_at(RepeatedField::Authors, 0).unwrap().as_deref(), Some("A1"));
    assert_eq!(meta.get_at(RepeatedField::Authors, 1).unwrap().as_deref(), Some("A2"));
    assert!(matches!(
        meta.get_at(RepeatedField::Authors, 2),
        Err(EpubError::IndexOutOfRange { index: 2, count: 2, .. })
    ));
}

#[test]
fn test_record_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = round_trip_fixture().write(dir.path(), "record.epub");

    let doc = Document::open_with(EngineApi::builtin(), &path).unwrap();
    let record = doc.metadata().record().unwrap();

    assert_eq!(record.title.as_deref(), Some("T"));
    assert_eq!(record.publisher, None);
    assert_eq!(record.authors, vec!["A1", "A2"]);
    assert_eq!(record.identifiers, vec!["id-1"]);
}

#[test]
fn test_save_cover() {
    let dir = TempDir::new().unwrap();
    let path = round_trip_fixture()
        .with_cover("images/cover.jpg", b"\xff\xd8fake-jpeg")
        .write(dir.path(), "cover.epub");
    let output = dir.path().join("cover-out.jpg");

    let doc = Document::open_with(EngineApi::builtin(), &path).unwrap();
    doc.save_cover(&output).unwrap();
    assert_eq!(std::fs::read(&output).unwrap(), b"\xff\xd8fake-jpeg");
}

#[test]
fn test_save_cover_without_cover() {
    let dir = TempDir::new().unwrap();
    let path = round_trip_fixture().write(dir.path(), "no-cover.epub");

    let doc = Document::open_with(EngineApi::builtin(), &path).unwrap();
    let err = doc.save_cover(dir.path().join("out.jpg")).unwrap_err();
    assert!(matches!(err, EpubError::CoverNotSaved { .. }));
}

#[test]
fn test_distinct_documents_concurrently() {
    let dir = TempDir::new().unwrap();
    let paths: Vec<_> = (0..4)
        .map(|i| {
            Fixture::new(&format!(
                "<dc:title>Book {i}</dc:title><dc:author>Author {i}</dc:author>"
            ))
            .write(dir.path(), &format!("book-{i}.epub"))
        })
        .collect();

    let handles: Vec<_> = paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| {
            thread::spawn(move || {
                let mut doc = Document::open_with(EngineApi::builtin(), &path).unwrap();
                let meta = doc.metadata();
                assert_eq!(meta.title().unwrap(), Some(format!("Book {i}")));
                assert_eq!(meta.authors().unwrap(), vec![format!("Author {i}")]);
                doc.release().unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_view_outlives_document() {
    let dir = TempDir::new().unwrap();
    let path = round_trip_fixture().write(dir.path(), "scoped.epub");

    let meta = {
        let doc = Document::open_with(EngineApi::builtin(), &path).unwrap();
        doc.metadata()
    };
    assert!(!meta.is_live());
    assert!(matches!(meta.identifiers(), Err(EpubError::UseAfterRelease)));
}
