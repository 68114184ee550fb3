#![allow(missing_docs)]

use std::cell::RefCell;
use std::rc::Rc;
use tangle::io::{Input, Output};
use tangle::registry::{CodecFactory, DefaultCodecs, TypeRegistry};
use tangle::{ErrorCategory, ErrorKind, Obj, Structural, Tangle, TangleConfig, TypeInfo, TypeMatcher, ValueCodec};

#[derive(Structural, Debug, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(Structural, Debug, PartialEq)]
struct Label {
    text: String,
}

fn lenient() -> Tangle {
    Tangle::with_config(TangleConfig::default().with_registration_required(false))
}

fn count_occurrences(haystack: &[u8], needle: &str) -> usize {
    haystack
        .windows(needle.len())
        .filter(|window| *window == needle.as_bytes())
        .count()
}

// --- Ids ---

#[test]
fn test_ids_are_assigned_in_order_and_reused() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    assert_eq!(tangle.register::<Point>()?.id(), Some(0));
    assert_eq!(tangle.register::<Label>()?.id(), Some(1));
    assert_eq!(tangle.register::<i64>()?.id(), Some(2));

    let removed = tangle.unregister(1).expect("id 1 is registered");
    assert_eq!(removed.type_info(), TypeInfo::of::<Label>());
    assert!(tangle.registration::<Label>().is_none());

    // The freed id is handed out again before new ones.
    assert_eq!(tangle.register::<String>()?.id(), Some(1));
    assert_eq!(tangle.register::<u8>()?.id(), Some(3));
    Ok(())
}

#[test]
fn test_registering_twice_keeps_the_id() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    tangle.register::<Point>()?;
    let first = tangle.register::<Label>()?;
    let again = tangle.register::<Label>()?;
    assert_eq!(first.id(), again.id());
    assert!(Rc::ptr_eq(&first, &again));
    Ok(())
}

#[test]
fn test_class_header_is_id_plus_two() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    tangle.register_id::<i32>(10)?;
    let bytes = tangle.to_bytes(&Obj::new(-3_i32))?;
    // class header, then the zigzag payload; value types carry no reference header.
    assert_eq!(bytes, vec![12, 5]);

    let read = tangle.from_bytes(&bytes)?.expect("not null");
    assert_eq!(read.downcast_ref::<i32>(), Some(&-3));
    Ok(())
}

#[test]
fn test_explicit_id_displaces_previous_holder() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    tangle.register_id::<Point>(7)?;
    tangle.register_id::<Label>(7)?;

    assert!(tangle.registration::<Point>().is_none());
    let label = tangle.registration::<Label>().expect("registered");
    assert_eq!(label.id(), Some(7));
    assert_eq!(
        tangle.registry().resolve_id(7).map(|r| r.type_info()),
        Some(TypeInfo::of::<Label>())
    );
    Ok(())
}

#[test]
fn test_moving_a_type_frees_its_old_id() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    tangle.register_id::<Point>(3)?;
    tangle.register_id::<Point>(4)?;
    assert!(tangle.registry().resolve_id(3).is_none());
    assert_eq!(tangle.registration::<Point>().and_then(|r| r.id()), Some(4));
    Ok(())
}

#[test]
fn test_freed_id_is_reused_after_a_move() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    assert_eq!(tangle.register::<Point>()?.id(), Some(0));
    assert_eq!(tangle.register::<Label>()?.id(), Some(1));

    tangle.register_id::<Point>(5)?;
    assert!(tangle.registry().resolve_id(0).is_none());

    // The lowest free id is 0 again, then the cursor skips the taken 1.
    assert_eq!(tangle.register::<i64>()?.id(), Some(0));
    assert_eq!(tangle.register::<u8>()?.id(), Some(2));
    Ok(())
}

#[test]
fn test_id_above_maximum_is_rejected() {
    let mut tangle = Tangle::new();
    let err = tangle
        .register_id::<Point>(tangle::constants::MAX_REGISTRATION_ID + 1)
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Config(_)));
}

// --- Strict mode ---

#[test]
fn test_strict_mode_rejects_before_writing() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    let mut output = Output::new(16);
    output.write_byte(0xAA)?;

    let err = tangle
        .write_class_and_object(&mut output, Some(&Obj::new(Point { x: 1, y: 2 })))
        .unwrap_err();

    assert!(matches!(err.kind(), ErrorKind::UnregisteredType(_)));
    assert_eq!(err.category(), ErrorCategory::Resolution);
    assert!(err.to_string().contains("tangle.register::<"));
    assert_eq!(output.as_bytes(), &[0xAA]);
    assert_eq!(tangle.depth(), 0);
    Ok(())
}

#[test]
fn test_unknown_id_on_read() {
    let mut tangle = Tangle::new();
    let err = tangle.from_bytes(&[5, 0]).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnregisteredId(3)));
}

#[test]
fn test_null_class_header() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    let mut output = Output::new(4);
    tangle.write_class_and_object(&mut output, None)?;
    assert_eq!(output.as_bytes(), &[0]);

    let mut input = Input::new(output.into_bytes());
    assert!(tangle.read_class_and_object(&mut input)?.is_none());
    Ok(())
}

// --- By-name types ---

#[test]
fn test_implicit_registration_writes_name_once_per_graph() -> tangle::Result<()> {
    let mut writer = lenient();
    writer.declare::<Point>();
    let points = vec![
        Obj::new(Point { x: 1, y: 2 }),
        Obj::new(Point { x: 3, y: 4 }),
        Obj::new(Point { x: 5, y: 6 }),
    ];
    let bytes = writer.to_bytes(&Obj::new(points))?;

    let name = std::any::type_name::<Point>();
    assert_eq!(count_occurrences(&bytes, name), 1);

    let registration = writer.registration::<Point>().expect("registered implicitly");
    assert!(registration.is_by_name());
    assert_eq!(registration.id(), None);

    let mut reader = lenient();
    reader.declare::<Point>();
    let read = reader.from_bytes(&bytes)?.expect("not null");
    let list = read.downcast_ref::<Vec<Obj>>().expect("a list");
    let xs: Vec<i32> = list
        .iter()
        .map(|p| p.downcast_ref::<Point>().map_or(-1, |p| p.x))
        .collect();
    assert_eq!(xs, vec![1, 3, 5]);
    Ok(())
}

#[test]
fn test_name_ids_restart_with_each_graph() -> tangle::Result<()> {
    let mut tangle = lenient();
    tangle.declare::<Label>();
    let value = Obj::new(Label { text: "a".into() });

    let first = tangle.to_bytes(&value)?;
    assert_eq!(tangle.registry().named_in_graph(), 0);
    let second = tangle.to_bytes(&value)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_unknown_name_on_read() -> tangle::Result<()> {
    let mut writer = lenient();
    writer.declare::<Label>();
    let bytes = writer.to_bytes(&Obj::new(Label { text: "x".into() }))?;

    let mut reader = lenient();
    let err = reader.from_bytes(&bytes).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::TypeNotFound(name) if name == std::any::type_name::<Label>()));
    Ok(())
}

#[test]
fn test_strict_reader_rejects_names_of_unregistered_types() -> tangle::Result<()> {
    let mut writer = lenient();
    writer.declare::<Label>();
    let bytes = writer.to_bytes(&Obj::new(Label { text: "x".into() }))?;

    let mut reader = Tangle::new();
    reader.declare::<Label>();
    let err = reader.from_bytes(&bytes).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnregisteredType(_)));
    Ok(())
}

#[test]
fn test_no_codec_for_undeclared_type() {
    let mut tangle = lenient();
    let err = tangle
        .to_bytes(&Obj::new(Label { text: "x".into() }))
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NoCodec(_)));
}

// --- Default codecs ---

fn tagging(tag: &'static str, log: &Rc<RefCell<Vec<&'static str>>>) -> CodecFactory {
    let log = Rc::clone(log);
    Rc::new(move |_| {
        log.borrow_mut().push(tag);
        Rc::new(ValueCodec::<i32>::new())
    })
}

#[test]
fn test_most_specific_default_wins() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut defaults = DefaultCodecs::empty();
    defaults.add(TypeMatcher::Family("alloc::".into()), tagging("alloc", &log));
    defaults.add(TypeMatcher::Family("alloc::vec::Vec<".into()), tagging("vec", &log));
    defaults.add(TypeMatcher::Family("alloc::vec::".into()), tagging("vec module", &log));
    defaults.add(TypeMatcher::Family("alloc::vec::Vec<".into()), tagging("vec again", &log));
    defaults.set_fallback(Some(tagging("fallback", &log)));

    assert!(defaults.find(&TypeInfo::of::<Vec<u8>>()).is_some());
    assert!(defaults.find(&TypeInfo::of::<String>()).is_some());
    assert!(defaults.find(&TypeInfo::of::<u8>()).is_some());

    defaults.add(TypeMatcher::Exact(TypeInfo::of::<Vec<u8>>()), tagging("exact", &log));
    assert!(defaults.find(&TypeInfo::of::<Vec<u8>>()).is_some());

    assert_eq!(*log.borrow(), vec!["vec", "alloc", "fallback", "exact"]);
}

#[test]
fn test_user_exact_default_beats_builtin() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut defaults = DefaultCodecs::with_builtins();
    defaults.add(TypeMatcher::Exact(TypeInfo::of::<i32>()), tagging("user", &log));
    assert!(defaults.find(&TypeInfo::of::<i32>()).is_some());
    assert_eq!(*log.borrow(), vec!["user"]);
}

#[test]
fn test_empty_defaults_have_no_codec() {
    let defaults = DefaultCodecs::empty();
    let err = defaults.codec_for(&TypeInfo::of::<u8>()).err().expect("expected NoCodec error");
    assert!(matches!(err.kind(), ErrorKind::NoCodec(_)));
}

#[test]
fn test_family_default_serves_implicit_registration() -> tangle::Result<()> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut tangle = lenient();
    tangle.add_default_family("registry_test::", tagging("family", &log));
    tangle.register_with::<Point>(Rc::new(tangle::StructuralCodec::<Point>::new()))?;

    // Registered explicitly: the family is not consulted.
    tangle.to_bytes(&Obj::new(Point { x: 0, y: 0 }))?;
    assert!(log.borrow().is_empty());

    // A value of a type the family matches but that nobody registered.
    let err = tangle.to_bytes(&Obj::new(Label { text: "x".into() })).unwrap_err();
    assert_eq!(*log.borrow(), vec!["family"]);
    // The family's codec is for i32, so the write itself fails.
    assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. }));
    Ok(())
}

// --- Registry API ---

#[test]
fn test_registry_write_and_read_type() -> tangle::Result<()> {
    let mut registry = TypeRegistry::default();
    registry.register(TypeInfo::of::<u64>(), Rc::new(ValueCodec::<u64>::new()))?;

    let mut output = Output::new(8);
    registry.write_type(&mut output, Some(&TypeInfo::of::<u64>()))?;
    registry.write_type(&mut output, None)?;
    assert_eq!(output.as_bytes(), &[2, 0]);

    let mut input = Input::new(output.into_bytes());
    let read = registry.read_type(&mut input)?.expect("a class");
    assert_eq!(read.type_info(), TypeInfo::of::<u64>());
    assert!(registry.read_type(&mut input)?.is_none());

    assert_eq!(registry.registrations().count(), 1);
    registry.unregister_all();
    assert_eq!(registry.registrations().count(), 0);
    Ok(())
}
