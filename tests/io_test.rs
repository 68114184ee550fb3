#![allow(missing_docs)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::{Seek, SeekFrom, Write};
use tangle::io::varint::{var_int_length, var_long_length, zigzag_decode_i32, zigzag_encode_i32};
use tangle::io::{Input, Output};
use tangle::{ErrorCategory, ErrorKind};

// --- Varints ---

#[test]
fn test_var_int_byte_counts() -> tangle::Result<()> {
    let cases: [(i32, bool, usize); 14] = [
        (0, true, 1),
        (127, true, 1),
        (128, true, 2),
        (16_383, true, 2),
        (16_384, true, 3),
        (-1, true, 5),
        (i32::MAX, true, 5),
        (0, false, 1),
        (63, false, 1),
        (64, false, 2),
        (-64, false, 1),
        (-65, false, 2),
        (8191, false, 2),
        (8192, false, 3),
    ];

    for (value, optimize_positive, expected) in cases {
        let mut output = Output::new(16);
        let written = output.write_var_int(value, optimize_positive)?;
        assert_eq!(written, expected, "value {value}, optimize_positive {optimize_positive}");
        assert_eq!(output.position(), expected);
        assert_eq!(var_int_length(value, optimize_positive), expected);

        let mut input = Input::new(output.into_bytes());
        assert_eq!(input.read_var_int(optimize_positive)?, value);
        assert!(input.eof()?);
    }
    Ok(())
}

#[test]
fn test_var_int_extremes() -> tangle::Result<()> {
    let mut output = Output::new(4);
    for value in [i32::MIN, i32::MAX, -1, 1] {
        output.write_var_int(value, false)?;
    }
    assert_eq!(output.position(), 5 + 5 + 1 + 1);

    let mut input = Input::new(output.into_bytes());
    for value in [i32::MIN, i32::MAX, -1, 1] {
        assert_eq!(input.read_var_int(false)?, value);
    }
    Ok(())
}

#[test]
fn test_var_long_extremes() -> tangle::Result<()> {
    let mut output = Output::new(4);
    for value in [0, i64::MIN, i64::MAX, -1] {
        output.write_var_long(value, false)?;
    }
    assert_eq!(output.position(), 1 + 10 + 10 + 1);
    assert_eq!(var_long_length(i64::MAX, true), 9);
    assert_eq!(var_long_length(-1, true), 10);

    let mut input = Input::new(output.into_bytes());
    for value in [0, i64::MIN, i64::MAX, -1] {
        assert_eq!(input.read_var_long(false)?, value);
    }
    Ok(())
}

#[test]
fn test_zigzag_mapping() {
    assert_eq!(zigzag_encode_i32(0), 0);
    assert_eq!(zigzag_encode_i32(-1), 1);
    assert_eq!(zigzag_encode_i32(1), 2);
    assert_eq!(zigzag_encode_i32(-2), 3);
    assert_eq!(zigzag_encode_i32(i32::MIN), u32::MAX);
    assert_eq!(zigzag_decode_i32(u32::MAX), i32::MIN);
}

#[test]
fn test_overlong_var_int_is_a_format_error() {
    let mut input = Input::new(vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
    let err = input.read_var_int(true).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Format(_)));
    assert_eq!(err.category(), ErrorCategory::Structural);
}

#[test]
fn test_random_varints() -> tangle::Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let values: Vec<i64> = (0..2_000).map(|_| rng.r#gen::<i64>() >> rng.gen_range(0..64u32)).collect();

    let mut output = Output::new(32);
    for value in &values {
        output.write_var_long(*value, false)?;
    }
    let mut input = Input::new(output.into_bytes());
    for value in &values {
        assert_eq!(input.read_var_long(false)?, *value);
    }
    assert!(input.eof()?);
    Ok(())
}

// --- Strings ---

#[test]
fn test_strings() -> tangle::Result<()> {
    let samples = [
        Some(""),
        Some("plain ascii"),
        Some("grüße"),
        Some("日本語のテキスト"),
        Some("emoji 🦀 mixed"),
        None,
    ];

    let mut output = Output::new(8);
    for sample in samples {
        output.write_string(sample)?;
    }
    let mut input = Input::new(output.into_bytes());
    for sample in samples {
        assert_eq!(input.read_string()?.as_deref(), sample);
    }
    Ok(())
}

#[test]
fn test_string_framing() -> tangle::Result<()> {
    let mut output = Output::new(8);
    output.write_string(None)?;
    output.write_string(Some(""))?;
    output.write_string(Some("ab"))?;
    // "é" is one char, two bytes; both have the high bit set.
    output.write_string(Some("é"))?;
    assert_eq!(output.as_bytes(), &[0, 1, 3, b'a', b'b', 2, 0xC3, 0xA9]);
    Ok(())
}

#[test]
fn test_invalid_continuation_byte() {
    let mut input = Input::new(vec![2, 0xC3, 0x41]);
    let err = input.read_string().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Format(_)));
}

// --- Buffers ---

#[test]
fn test_growth_preserves_content() -> tangle::Result<()> {
    let mut output = Output::new(1);
    let payload: Vec<u8> = (0..=255).collect();
    output.write_bytes(&payload)?;
    output.write_int(-5)?;
    output.write_double(2.5)?;
    assert!(output.capacity() >= output.position());

    let mut input = Input::new(output.into_bytes());
    assert_eq!(input.read_bytes(256)?, payload);
    assert_eq!(input.read_int()?, -5);
    assert_eq!(input.read_double()?, 2.5);
    Ok(())
}

#[test]
fn test_fixed_width_is_little_endian() -> tangle::Result<()> {
    let mut output = Output::new(8);
    output.write_int(0x0102_0304)?;
    output.write_short(0x0506)?;
    assert_eq!(output.as_bytes(), &[4, 3, 2, 1, 6, 5]);
    Ok(())
}

#[test]
fn test_max_capacity_overflow() -> tangle::Result<()> {
    let mut output = Output::with_max_capacity(4, 8)?;
    output.write_bytes(&[1; 8])?;
    let err = output.write_byte(9).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::BufferOverflow { required: 1, available: 0 }
    ));
    assert_eq!(err.category(), ErrorCategory::Buffer);
    assert_eq!(output.as_bytes(), &[1; 8]);
    Ok(())
}

#[test]
fn test_capacity_above_max_is_rejected() {
    let err = Output::with_max_capacity(16, 8).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Config(_)));
}

#[test]
fn test_underflow() -> tangle::Result<()> {
    let mut input = Input::new(vec![1, 2, 3]);
    assert_eq!(input.read_byte()?, 1);
    let err = input.read_int().unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::BufferUnderflow { required: 4, available: 2 }
    ));
    Ok(())
}

#[test]
fn test_skip_and_set_buffer() -> tangle::Result<()> {
    let mut input = Input::new(vec![0, 0, 0, 42]);
    input.skip(3)?;
    assert_eq!(input.read_byte()?, 42);
    assert_eq!(input.total(), 4);

    input.set_buffer(vec![7]);
    assert_eq!(input.position(), 0);
    assert_eq!(input.read_byte()?, 7);
    Ok(())
}

// --- Streams ---

#[test]
fn test_stream_round_trip_with_small_windows() -> tangle::Result<()> {
    let mut file = tempfile::tempfile()?;
    let text = "window ".repeat(100) + "über alles";

    {
        let mut output = Output::from_writer(file.try_clone()?, 16);
        for i in 0..500 {
            output.write_var_int(i * 37, false)?;
        }
        output.write_string(Some(&text))?;
        output.write_long(i64::MIN)?;
        output.flush()?;
        assert_eq!(output.position(), 0);
        assert!(output.total() > 16);
    }

    file.flush()?;
    file.seek(SeekFrom::Start(0))?;
    let mut input = Input::from_reader(file, 16);
    for i in 0..500 {
        assert_eq!(input.read_var_int(false)?, i * 37);
    }
    assert_eq!(input.read_string()?.as_deref(), Some(text.as_str()));
    assert_eq!(input.read_long()?, i64::MIN);
    assert!(input.eof()?);
    Ok(())
}

#[test]
fn test_stream_underflow_at_end() -> tangle::Result<()> {
    let mut file = tempfile::tempfile()?;
    file.write_all(&[1, 2])?;
    file.seek(SeekFrom::Start(0))?;

    let mut input = Input::from_reader(file, 16);
    assert_eq!(input.read_short()?, 0x0201);
    let err = input.read_byte().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::BufferUnderflow { .. }));
    Ok(())
}
