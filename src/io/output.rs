use super::varint::{int_bits, long_bits, var_int_length, var_long_length};
use crate::error::{ErrorKind, Result, TangleError};
use std::fmt;
use std::io::Write;

const MIN_GROWTH: usize = 16;

/// A growable binary writer.
///
/// In memory, the backing array doubles whenever a write does not fit, until
/// `max_capacity` is reached. When a sink is attached, the window is flushed to
/// the sink instead and never grows.
pub struct Output {
    buffer: Vec<u8>,
    position: usize,
    max_capacity: Option<usize>,
    total: u64,
    sink: Option<Box<dyn Write>>,
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("capacity", &self.buffer.len())
            .field("position", &self.position)
            .field("max_capacity", &self.max_capacity)
            .field("total", &self.total())
            .field("streaming", &self.sink.is_some())
            .finish()
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_BUFFER_SIZE)
    }
}

impl Output {
    /// Creates an in-memory writer that grows without limit.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            position: 0,
            max_capacity: None,
            total: 0,
            sink: None,
        }
    }

    /// Creates an in-memory writer that never grows beyond `max_capacity` bytes.
    pub fn with_max_capacity(capacity: usize, max_capacity: usize) -> Result<Self> {
        if capacity > max_capacity {
            return Err(ErrorKind::Config(format!(
                "buffer capacity {capacity} exceeds max capacity {max_capacity}"
            ))
            .into());
        }
        let mut output = Self::new(capacity);
        output.max_capacity = Some(max_capacity);
        Ok(output)
    }

    /// Creates a writer that flushes a fixed-size window to `sink`.
    pub fn from_writer<W: Write + 'static>(sink: W, buffer_size: usize) -> Self {
        let size = buffer_size.max(MIN_GROWTH);
        Self {
            buffer: vec![0; size],
            position: 0,
            max_capacity: Some(size),
            total: 0,
            sink: Some(Box::new(sink)),
        }
    }

    /// Bytes currently held in the window.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the write cursor. Bytes past the new position are discarded on the next write.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.buffer.len() {
            return Err(ErrorKind::BufferOverflow {
                required: position,
                available: self.buffer.len(),
            }
            .into());
        }
        self.position = position;
        Ok(())
    }

    /// Total bytes written since creation or the last [`Self::reset`], flushed or not.
    pub fn total(&self) -> u64 {
        self.total + self.position as u64
    }

    /// Size of the backing array.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Configured limit for growth, if any.
    pub fn max_capacity(&self) -> Option<usize> {
        self.max_capacity
    }

    /// Bytes written and not yet flushed.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    /// Copies out the bytes written and not yet flushed.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Consumes the writer, returning the bytes written and not yet flushed.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buffer.truncate(self.position);
        std::mem::take(&mut self.buffer)
    }

    /// Rewinds to the start and zeroes the byte count. Unflushed bytes are dropped.
    pub fn reset(&mut self) {
        self.position = 0;
        self.total = 0;
    }

    /// Writes the window to the sink, if one is attached.
    pub fn flush(&mut self) -> Result<()> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        sink.write_all(&self.buffer[..self.position])?;
        sink.flush()?;
        self.total += self.position as u64;
        self.position = 0;
        Ok(())
    }

    /// Ensures `required` more bytes fit in the window.
    ///
    /// Flushes to the sink first when there is one, then grows by doubling.
    fn require(&mut self, required: usize) -> Result<()> {
        if self.buffer.len() - self.position >= required {
            return Ok(());
        }
        self.flush()?;
        let capacity = self.buffer.len();
        if capacity - self.position >= required {
            return Ok(());
        }

        let needed = self.position.checked_add(required).ok_or_else(|| {
            TangleError::new(ErrorKind::BufferOverflow {
                required,
                available: capacity - self.position,
            })
        })?;
        let mut new_capacity = capacity.saturating_mul(2).max(MIN_GROWTH).max(needed);
        if let Some(max) = self.max_capacity {
            new_capacity = new_capacity.min(max);
        }
        if new_capacity < needed {
            let available = self.max_capacity.unwrap_or(capacity) - self.position;
            return Err(ErrorKind::BufferOverflow {
                required,
                available,
            }
            .into());
        }
        self.buffer.resize(new_capacity, 0);
        Ok(())
    }

    // --- Fixed width ---

    /// Writes one byte.
    pub fn write_byte(&mut self, value: u8) -> Result<()> {
        self.require(1)?;
        self.buffer[self.position] = value;
        self.position += 1;
        Ok(())
    }

    /// Writes raw bytes, flushing or growing as many times as needed.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let mut remaining = bytes;
        let mut count = (self.buffer.len() - self.position).min(remaining.len());
        loop {
            let (chunk, rest) = remaining.split_at(count);
            self.buffer[self.position..self.position + count].copy_from_slice(chunk);
            self.position += count;
            remaining = rest;
            if remaining.is_empty() {
                return Ok(());
            }
            count = self.buffer.len().max(1).min(remaining.len());
            self.require(count)?;
            count = count.min(self.buffer.len() - self.position);
        }
    }

    fn write_fixed<const N: usize>(&mut self, bytes: [u8; N]) -> Result<()> {
        self.require(N)?;
        self.buffer[self.position..self.position + N].copy_from_slice(&bytes);
        self.position += N;
        Ok(())
    }

    /// Writes `1` for true, `0` for false.
    pub fn write_boolean(&mut self, value: bool) -> Result<()> {
        self.write_byte(u8::from(value))
    }

    /// Writes 2 bytes.
    pub fn write_short(&mut self, value: i16) -> Result<()> {
        self.write_fixed(value.to_le_bytes())
    }

    /// Writes 4 bytes.
    pub fn write_int(&mut self, value: i32) -> Result<()> {
        self.write_fixed(value.to_le_bytes())
    }

    /// Writes 8 bytes.
    pub fn write_long(&mut self, value: i64) -> Result<()> {
        self.write_fixed(value.to_le_bytes())
    }

    /// Writes 4 bytes.
    pub fn write_float(&mut self, value: f32) -> Result<()> {
        self.write_fixed(value.to_le_bytes())
    }

    /// Writes 8 bytes.
    pub fn write_double(&mut self, value: f64) -> Result<()> {
        self.write_fixed(value.to_le_bytes())
    }

    // --- Variable length ---

    /// Writes a 1-5 byte int and returns the number of bytes written.
    ///
    /// If `optimize_positive` is false the value is zigzag-mapped first.
    pub fn write_var_int(&mut self, value: i32, optimize_positive: bool) -> Result<usize> {
        let length = var_int_length(value, optimize_positive);
        self.require(length)?;
        let mut bits = int_bits(value, optimize_positive);
        for _ in 1..length {
            self.buffer[self.position] = (bits as u8 & 0x7F) | 0x80;
            self.position += 1;
            bits >>= 7;
        }
        self.buffer[self.position] = bits as u8;
        self.position += 1;
        Ok(length)
    }

    /// Writes a 1-10 byte long and returns the number of bytes written.
    pub fn write_var_long(&mut self, value: i64, optimize_positive: bool) -> Result<usize> {
        let length = var_long_length(value, optimize_positive);
        self.require(length)?;
        let mut bits = long_bits(value, optimize_positive);
        for _ in 1..length {
            self.buffer[self.position] = (bits as u8 & 0x7F) | 0x80;
            self.position += 1;
            bits >>= 7;
        }
        self.buffer[self.position] = bits as u8;
        self.position += 1;
        Ok(length)
    }

    /// Writes a non-negative length as a positive-optimized varint.
    pub fn write_length(&mut self, length: usize) -> Result<usize> {
        let value = i32::try_from(length)
            .map_err(|_| TangleError::format(format!("length {length} does not fit in a varint")))?;
        self.write_var_int(value, true)
    }

    /// Writes a string, or null.
    ///
    /// Framing is `varint(char_count + 1)`, `0` for null, followed by the
    /// characters. ASCII characters take one byte; others take the 2-4 byte
    /// multi-byte form, so every byte of a multi-byte character is `>= 0x80`.
    pub fn write_string(&mut self, value: Option<&str>) -> Result<()> {
        let Some(value) = value else {
            self.write_var_int(0, true)?;
            return Ok(());
        };
        let char_count = if value.is_ascii() {
            value.len()
        } else {
            value.chars().count()
        };
        let header = char_count
            .checked_add(1)
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| TangleError::format(format!("string of {char_count} chars is too long")))?;
        self.write_var_int(header, true)?;
        // str is UTF-8 already: the ASCII fast path and the multi-byte form are both its bytes.
        self.write_bytes(value.as_bytes())
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        if self.sink.is_some() && self.position > 0 {
            log::debug!(
                "Output dropped with {} unflushed bytes for its sink",
                self.position
            );
        }
    }
}
