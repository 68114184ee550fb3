#![allow(missing_docs)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tangle::instantiator::{DefaultInstantiator, FnInstantiator};
use tangle::rt::Field;
use tangle::{ErrorKind, Obj, Structural, Tangle, TypeInfo};

#[derive(Structural, Debug, PartialEq, Clone)]
struct Primitives {
    flag: bool,
    byte: u8,
    small: i8,
    short: i16,
    unsigned_short: u16,
    int: i32,
    unsigned: u32,
    long: i64,
    unsigned_long: u64,
    size: usize,
    float: f32,
    double: f64,
    letter: char,
    text: String,
}

#[derive(Structural, Debug, PartialEq)]
struct Containers {
    maybe_text: Option<String>,
    maybe_number: Option<i64>,
    numbers: Vec<u32>,
    nested: Vec<Vec<i16>>,
    boxed: Box<String>,
}

#[derive(Structural, Debug, PartialEq)]
struct Wrapper(u32, String);

#[derive(Structural, Debug, PartialEq)]
struct Unit;

#[derive(Structural, Debug, PartialEq)]
struct Cached {
    key: String,
    #[tangle(skip)]
    hits: u64,
}

#[derive(Structural, Debug, PartialEq)]
struct Tagged<T: Field + 'static> {
    tag: String,
    value: T,
}

#[derive(Structural, Debug)]
struct Outer {
    inner: Rc<Inner>,
}

#[derive(Structural, Debug)]
struct Inner {
    value: i32,
}

#[derive(Structural, Debug)]
#[tangle(cyclic)]
struct Counter {
    count: Cell<u32>,
    parent: RefCell<Option<Rc<Counter>>>,
}

fn sample() -> Primitives {
    Primitives {
        flag: true,
        byte: 0xFE,
        small: -128,
        short: -1_234,
        unsigned_short: 65_535,
        int: i32::MIN,
        unsigned: u32::MAX,
        long: i64::MAX,
        unsigned_long: u64::MAX,
        size: 12_345_678,
        float: 1.5,
        double: -0.125,
        letter: 'ß',
        text: "sample".to_string(),
    }
}

fn round_trip<T: Structural + tangle::Codable>(tangle: &mut Tangle, value: T) -> tangle::Result<Rc<T>> {
    let bytes = tangle.to_bytes(&Obj::new(value))?;
    let read = tangle.from_bytes(&bytes)?.expect("not null");
    read.downcast::<T>()
        .ok_or_else(|| tangle::TangleError::mismatch(std::any::type_name::<T>(), read.type_info().name()))
}

#[test]
fn test_primitive_fields() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    tangle.register::<Primitives>()?;
    let read = round_trip(&mut tangle, sample())?;
    assert_eq!(*read, sample());
    Ok(())
}

#[test]
fn test_container_fields() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    tangle.register::<Containers>()?;
    let value = Containers {
        maybe_text: None,
        maybe_number: Some(-9),
        numbers: (0..300).collect(),
        nested: vec![vec![], vec![1, -1], vec![i16::MIN, i16::MAX]],
        boxed: Box::new("boxed".to_string()),
    };
    let expected = Containers {
        maybe_text: None,
        maybe_number: Some(-9),
        numbers: (0..300).collect(),
        nested: vec![vec![], vec![1, -1], vec![i16::MIN, i16::MAX]],
        boxed: Box::new("boxed".to_string()),
    };
    let read = round_trip(&mut tangle, value)?;
    assert_eq!(*read, expected);
    Ok(())
}

#[test]
fn test_tuple_and_unit_structs() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    tangle.register::<Wrapper>()?;
    tangle.register::<Unit>()?;

    let read = round_trip(&mut tangle, Wrapper(7, "seven".into()))?;
    assert_eq!(*read, Wrapper(7, "seven".into()));

    let bytes = tangle.to_bytes(&Obj::new(Unit))?;
    // Class header and reference header only.
    assert_eq!(bytes.len(), 2);
    let read = tangle.from_bytes(&bytes)?.expect("not null");
    assert!(read.is::<Unit>());
    Ok(())
}

#[test]
fn test_skipped_field_is_defaulted() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    tangle.register::<Cached>()?;
    let read = round_trip(
        &mut tangle,
        Cached {
            key: "k".into(),
            hits: 99,
        },
    )?;
    assert_eq!(read.key, "k");
    assert_eq!(read.hits, 0);

    let copy = tangle
        .copy(&Obj::new(Cached {
            key: "c".into(),
            hits: 5,
        }))?
        .downcast::<Cached>()
        .expect("cached");
    assert_eq!(copy.hits, 0);
    Ok(())
}

#[test]
fn test_generic_struct() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    tangle.register::<Tagged<u64>>()?;
    tangle.register::<Tagged<Vec<String>>>()?;

    let read = round_trip(
        &mut tangle,
        Tagged {
            tag: "n".into(),
            value: 42_u64,
        },
    )?;
    assert_eq!(read.value, 42);

    let read = round_trip(
        &mut tangle,
        Tagged {
            tag: "words".into(),
            value: vec!["a".to_string(), "b".to_string()],
        },
    )?;
    assert_eq!(read.value, vec!["a", "b"]);
    Ok(())
}

#[test]
fn test_error_trace_names_the_field() {
    let mut tangle = Tangle::new();
    tangle.register::<Outer>().expect("register");

    let err = tangle
        .to_bytes(&Obj::new(Outer {
            inner: Rc::new(Inner { value: 1 }),
        }))
        .unwrap_err();

    assert!(matches!(err.kind(), ErrorKind::UnregisteredType(name) if name.ends_with("Inner")));
    assert_eq!(err.trace().len(), 2);
    assert_eq!(err.trace()[0], "inner (Rc<Inner>)");
    assert_eq!(err.trace()[1], std::any::type_name::<Outer>());
}

#[test]
fn test_truncated_input_reports_underflow() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    tangle.register::<Primitives>()?;
    let bytes = tangle.to_bytes(&Obj::new(sample()))?;
    let err = tangle.from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::BufferUnderflow { .. }));
    assert!(err.trace().iter().any(|entry| entry == "text (String)"));
    Ok(())
}

// --- In-place types and instantiators ---

#[test]
fn test_cell_fields_in_cyclic_type() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    tangle.register::<Counter>()?;
    let root = Rc::new(Counter {
        count: Cell::new(3),
        parent: RefCell::new(None),
    });
    *root.parent.borrow_mut() = Some(Rc::clone(&root));

    let bytes = tangle.to_bytes(&Obj::from_rc(Rc::clone(&root)))?;
    let read = tangle
        .from_bytes(&bytes)?
        .and_then(|o| o.downcast::<Counter>())
        .expect("a counter");
    assert_eq!(read.count.get(), 3);
    let parent = read.parent.borrow().clone().expect("parent");
    assert!(Rc::ptr_eq(&parent, &read));

    root.parent.borrow_mut().take();
    read.parent.borrow_mut().take();
    Ok(())
}

#[test]
fn test_custom_instantiator_is_used() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    tangle.register::<Counter>()?;
    let created = Rc::new(Cell::new(0));
    let seen = Rc::clone(&created);
    tangle.set_instantiator::<Counter>(Rc::new(FnInstantiator::new(move || {
        seen.set(seen.get() + 1);
        Some(Counter {
            count: Cell::new(0),
            parent: RefCell::new(None),
        })
    })))?;

    let bytes = tangle.to_bytes(&Obj::new(Counter {
        count: Cell::new(8),
        parent: RefCell::new(None),
    }))?;
    let read = tangle.from_bytes(&bytes)?.and_then(|o| o.downcast::<Counter>());
    assert_eq!(read.map(|c| c.count.get()), Some(8));
    assert_eq!(created.get(), 1);
    Ok(())
}

#[test]
fn test_failing_instantiator() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    tangle.register::<Counter>()?;
    tangle.set_instantiator::<Counter>(Rc::new(FnInstantiator::new(|| None::<Counter>)))?;

    let bytes = tangle.to_bytes(&Obj::new(Counter {
        count: Cell::new(1),
        parent: RefCell::new(None),
    }))?;
    let err = tangle.from_bytes(&bytes).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Construction { .. }));
    Ok(())
}

#[test]
fn test_value_codec_has_no_instantiator() -> tangle::Result<()> {
    let mut tangle = Tangle::new();
    tangle.register::<i32>()?;
    let info = TypeInfo::of::<i32>();

    let err = tangle.new_instance(&info).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::Construction { reason, .. } if reason.contains("no-arg constructor")
    ));

    tangle.set_instantiator::<i32>(Rc::new(DefaultInstantiator::<i32>::new()))?;
    let instance = tangle.new_instance(&info)?;
    assert_eq!(instance.downcast_ref::<i32>(), Some(&0));
    Ok(())
}
