use super::varint::{
    MAX_VAR_INT_BYTES, MAX_VAR_LONG_BYTES, zigzag_decode_i32, zigzag_decode_i64,
};
use crate::constants::MAX_PREALLOCATION;
use crate::error::{ErrorKind, Result, TangleError};
use std::fmt;
use std::io::{self, Read};

const MIN_WINDOW: usize = 16;

/// A binary reader over an owned byte array or a refillable stream window.
pub struct Input {
    buffer: Vec<u8>,
    position: usize,
    limit: usize,
    total: u64,
    source: Option<Box<dyn Read>>,
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Input")
            .field("position", &self.position)
            .field("limit", &self.limit)
            .field("total", &self.total())
            .field("streaming", &self.source.is_some())
            .finish()
    }
}

impl Input {
    /// Creates a reader over `bytes`.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let buffer = bytes.into();
        Self {
            limit: buffer.len(),
            buffer,
            position: 0,
            total: 0,
            source: None,
        }
    }

    /// Creates a reader that refills a `buffer_size` window from `source`.
    pub fn from_reader<R: Read + 'static>(source: R, buffer_size: usize) -> Self {
        Self {
            buffer: vec![0; buffer_size.max(MIN_WINDOW)],
            position: 0,
            limit: 0,
            total: 0,
            source: Some(Box::new(source)),
        }
    }

    /// Replaces the contents with `bytes` and detaches any source.
    pub fn set_buffer(&mut self, bytes: impl Into<Vec<u8>>) {
        self.buffer = bytes.into();
        self.limit = self.buffer.len();
        self.position = 0;
        self.total = 0;
        self.source = None;
    }

    /// Offset of the cursor inside the current window.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes consumed since creation.
    pub fn total(&self) -> u64 {
        self.total + self.position as u64
    }

    /// Bytes left in the current window, without touching the source.
    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    /// Returns true when no more bytes can be read, refilling from the source to find out.
    pub fn eof(&mut self) -> Result<bool> {
        if self.position < self.limit {
            return Ok(false);
        }
        Ok(self.fill()? == 0)
    }

    /// Reads more bytes from the source into the free tail of the window.
    ///
    /// Returns the number of bytes added, `0` at end of stream.
    fn fill(&mut self) -> Result<usize> {
        if self.source.is_none() {
            return Ok(0);
        }
        if self.limit == self.buffer.len() {
            if self.position == 0 {
                let grown = self.buffer.len() * 2;
                self.buffer.resize(grown, 0);
            } else {
                self.compact();
            }
        }
        let Some(source) = self.source.as_mut() else {
            return Ok(0);
        };
        loop {
            match source.read(&mut self.buffer[self.limit..]) {
                Ok(count) => {
                    self.limit += count;
                    return Ok(count);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Moves unread bytes to the front of the window.
    fn compact(&mut self) {
        self.buffer.copy_within(self.position..self.limit, 0);
        self.total += self.position as u64;
        self.limit -= self.position;
        self.position = 0;
    }

    /// Ensures `required` bytes are in the window.
    fn require(&mut self, required: usize) -> Result<()> {
        let remaining = self.limit - self.position;
        if remaining >= required {
            return Ok(());
        }
        if self.source.is_none() {
            return Err(ErrorKind::BufferUnderflow {
                required,
                available: remaining,
            }
            .into());
        }
        self.compact();
        if self.buffer.len() < required {
            self.buffer.resize(required, 0);
        }
        while self.limit < required {
            if self.fill()? == 0 {
                return Err(ErrorKind::BufferUnderflow {
                    required,
                    available: self.limit,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Skips `count` bytes.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        let mut left = count;
        while left > 0 {
            let step = left.min(self.buffer.len().max(1));
            self.require(step)?;
            self.position += step;
            left -= step;
        }
        Ok(())
    }

    // --- Fixed width ---

    /// Reads one byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        self.require(1)?;
        let value = self.buffer[self.position];
        self.position += 1;
        Ok(value)
    }

    /// Reads exactly `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        if self.source.is_none() {
            self.require(len)?;
            let bytes = self.buffer[self.position..self.position + len].to_vec();
            self.position += len;
            return Ok(bytes);
        }
        let mut bytes = Vec::with_capacity(len.min(MAX_PREALLOCATION));
        while bytes.len() < len {
            if self.position == self.limit && self.fill()? == 0 {
                return Err(ErrorKind::BufferUnderflow {
                    required: len - bytes.len(),
                    available: 0,
                }
                .into());
            }
            let count = (self.limit - self.position).min(len - bytes.len());
            bytes.extend_from_slice(&self.buffer[self.position..self.position + count]);
            self.position += count;
        }
        Ok(bytes)
    }

    fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.require(N)?;
        let mut bytes = [0; N];
        bytes.copy_from_slice(&self.buffer[self.position..self.position + N]);
        self.position += N;
        Ok(bytes)
    }

    /// Reads one byte as a boolean. Any non-zero byte is true.
    pub fn read_boolean(&mut self) -> Result<bool> {
        Ok(self.read_byte()? != 0)
    }

    /// Reads 2 bytes.
    pub fn read_short(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_fixed()?))
    }

    /// Reads 4 bytes.
    pub fn read_int(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_fixed()?))
    }

    /// Reads 8 bytes.
    pub fn read_long(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_fixed()?))
    }

    /// Reads 4 bytes.
    pub fn read_float(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_fixed()?))
    }

    /// Reads 8 bytes.
    pub fn read_double(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_fixed()?))
    }

    // --- Variable length ---

    /// Reads a 1-5 byte int written by [`crate::io::Output::write_var_int`].
    pub fn read_var_int(&mut self, optimize_positive: bool) -> Result<i32> {
        let mut bits: u32 = 0;
        for index in 0..MAX_VAR_INT_BYTES {
            let byte = self.read_byte()?;
            let payload = u32::from(byte & 0x7F);
            if index == MAX_VAR_INT_BYTES - 1 && (byte & 0x80 != 0 || payload > 0x0F) {
                break;
            }
            bits |= payload << (7 * index);
            if byte & 0x80 == 0 {
                return Ok(if optimize_positive {
                    bits as i32
                } else {
                    zigzag_decode_i32(bits)
                });
            }
        }
        Err(TangleError::format("malformed varint: more than 32 bits"))
    }

    /// Reads a 1-10 byte long written by [`crate::io::Output::write_var_long`].
    pub fn read_var_long(&mut self, optimize_positive: bool) -> Result<i64> {
        let mut bits: u64 = 0;
        for index in 0..MAX_VAR_LONG_BYTES {
            let byte = self.read_byte()?;
            let payload = u64::from(byte & 0x7F);
            if index == MAX_VAR_LONG_BYTES - 1 && (byte & 0x80 != 0 || payload > 0x01) {
                break;
            }
            bits |= payload << (7 * index);
            if byte & 0x80 == 0 {
                return Ok(if optimize_positive {
                    bits as i64
                } else {
                    zigzag_decode_i64(bits)
                });
            }
        }
        Err(TangleError::format("malformed varint: more than 64 bits"))
    }

    /// Reads a length written by [`crate::io::Output::write_length`].
    pub fn read_length(&mut self) -> Result<usize> {
        let value = self.read_var_int(true)?;
        usize::try_from(value).map_err(|_| TangleError::format(format!("negative length {value}")))
    }

    /// Reads a string written by [`crate::io::Output::write_string`].
    pub fn read_string(&mut self) -> Result<Option<String>> {
        let header = self.read_var_int(true)?;
        if header == 0 {
            return Ok(None);
        }
        let char_count = usize::try_from(header - 1)
            .map_err(|_| TangleError::format(format!("invalid string length header {header}")))?;
        let mut value = String::with_capacity(char_count.min(MAX_PREALLOCATION));
        let mut read = 0;
        while read < char_count {
            // ASCII run straight out of the window.
            while read < char_count
                && self.position < self.limit
                && self.buffer[self.position] < 0x80
            {
                value.push(char::from(self.buffer[self.position]));
                self.position += 1;
                read += 1;
            }
            if read == char_count {
                break;
            }
            value.push(self.read_multi_byte_char()?);
            read += 1;
        }
        Ok(Some(value))
    }

    fn read_multi_byte_char(&mut self) -> Result<char> {
        let lead = self.read_byte()?;
        let (width, initial) = match lead {
            0x00..=0x7F => return Ok(char::from(lead)),
            0xC0..=0xDF => (2, u32::from(lead & 0x1F)),
            0xE0..=0xEF => (3, u32::from(lead & 0x0F)),
            0xF0..=0xF7 => (4, u32::from(lead & 0x07)),
            _ => {
                return Err(TangleError::format(format!(
                    "invalid string lead byte 0x{lead:02X}"
                )));
            }
        };
        let mut code = initial;
        for _ in 1..width {
            let next = self.read_byte()?;
            if next & 0xC0 != 0x80 {
                return Err(TangleError::format(format!(
                    "invalid string continuation byte 0x{next:02X}"
                )));
            }
            code = (code << 6) | u32::from(next & 0x3F);
        }
        char::from_u32(code)
            .ok_or_else(|| TangleError::format(format!("invalid code point U+{code:04X}")))
    }
}
