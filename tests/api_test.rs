#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::rc::Rc;
use tangle::{ErrorKind, Obj, SerdeCodec, Structural, Tangle};

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
struct Settings {
    name: String,
    retries: u32,
    weights: Vec<f64>,
    labels: BTreeMap<String, i64>,
}

#[derive(Structural, Debug)]
struct Document {
    title: String,
    settings: Obj,
    sections: Vec<Rc<Section>>,
}

#[derive(Structural, Debug, PartialEq)]
struct Section {
    heading: String,
    words: u32,
}

fn settings() -> Settings {
    Settings {
        name: "default".to_string(),
        retries: 3,
        weights: vec![0.5, 0.25],
        labels: BTreeMap::from([("a".to_string(), -1), ("b".to_string(), 2)]),
    }
}

fn engine() -> tangle::Result<Tangle> {
    let mut tangle = Tangle::new();
    tangle.register::<Document>()?;
    tangle.register::<Section>()?;
    tangle.register_with::<Settings>(Rc::new(SerdeCodec::<Settings>::new()))?;
    Ok(tangle)
}

fn document() -> Obj {
    let intro = Rc::new(Section {
        heading: "Intro".to_string(),
        words: 120,
    });
    Obj::new(Document {
        title: "Report".to_string(),
        settings: Obj::new(settings()),
        sections: vec![
            Rc::clone(&intro),
            Rc::new(Section {
                heading: "Body".to_string(),
                words: 4_000,
            }),
            intro,
        ],
    })
}

fn check_document(read: &Obj) {
    let doc = read.downcast_ref::<Document>().expect("a document");
    assert_eq!(doc.title, "Report");
    assert_eq!(doc.settings.downcast_ref::<Settings>(), Some(&settings()));
    assert_eq!(doc.sections.len(), 3);
    assert_eq!(doc.sections[1].words, 4_000);
    assert!(Rc::ptr_eq(&doc.sections[0], &doc.sections[2]));
}

// --- TESTS ---

/// Standard file IO through `save` and `load`.
#[test]
fn test_standard_file_io() -> tangle::Result<()> {
    let dir = tempfile::tempdir()?;
    let file_path = dir.path().join("document.tangle");
    let mut tangle = engine()?;

    tangle.save(&file_path, &document())?;
    let loaded = tangle.load(&file_path)?.expect("not null");

    check_document(&loaded);
    Ok(())
}

/// In-memory round trip through `to_bytes` and `from_bytes`.
#[test]
fn test_memory_io() -> tangle::Result<()> {
    let mut writer = engine()?;
    let bytes = writer.to_bytes(&document())?;

    let mut reader = engine()?;
    let read = reader.from_bytes(&bytes)?.expect("not null");
    check_document(&read);
    Ok(())
}

/// Streams: several graphs written back to back into one file.
#[test]
fn test_stream_io() -> tangle::Result<()> {
    let mut tangle = engine()?;
    let file = tempfile::NamedTempFile::new()?;

    tangle.write_to(file.reopen()?, &document())?;
    let read = tangle.read_from(file.reopen()?)?.expect("not null");
    check_document(&read);
    Ok(())
}

#[test]
fn test_serde_payload_copy() -> tangle::Result<()> {
    let mut tangle = engine()?;
    let original = Obj::new(settings());
    let copy = tangle.copy(&original)?;
    assert!(!copy.ptr_eq(&original));
    assert_eq!(copy.downcast_ref::<Settings>(), Some(&settings()));
    Ok(())
}

#[test]
fn test_corrupt_serde_payload() -> tangle::Result<()> {
    let mut tangle = engine()?;
    let mut bytes = tangle.to_bytes(&Obj::new(settings()))?;
    // Header bytes: class, reference, payload length. Claim a shorter payload.
    bytes[2] = 1;
    let err = tangle.from_bytes(&bytes).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Serialization(_)));
    Ok(())
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut tangle = Tangle::new();
    let err = tangle.load(dir.path().join("missing.tangle")).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Io(_)));
    assert_eq!(err.category(), tangle::ErrorCategory::Io);
}

#[test]
fn test_null_top_level_value() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    assert!(tangle.from_bytes(&[0])?.is_none());
    Ok(())
}
