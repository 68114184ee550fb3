//! Convenience entry points over byte vectors, streams and files.
//!
//! Each call is one top-level graph: the value is written with its class, so the
//! reader needs no type information, and graph-scoped state is reset afterwards
//! when auto-reset is on.

use crate::constants::DEFAULT_BUFFER_SIZE;
use crate::engine::Tangle;
use crate::error::Result;
use crate::io::{Input, Output};
use crate::object::Obj;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

impl Tangle {
    /// Writes `value` and its class into a new byte vector.
    pub fn to_bytes(&mut self, value: &Obj) -> Result<Vec<u8>> {
        let mut output = Output::new(DEFAULT_BUFFER_SIZE);
        self.write_class_and_object(&mut output, Some(value))?;
        Ok(output.into_bytes())
    }

    /// Reads a value written by [`Self::to_bytes`]. `None` means null.
    pub fn from_bytes(&mut self, bytes: &[u8]) -> Result<Option<Obj>> {
        let mut input = Input::new(bytes);
        self.read_class_and_object(&mut input)
    }

    /// Writes `value` and its class to `writer`, flushing at the end.
    pub fn write_to<W: Write + 'static>(&mut self, writer: W, value: &Obj) -> Result<()> {
        let mut output = Output::from_writer(writer, DEFAULT_BUFFER_SIZE);
        self.write_class_and_object(&mut output, Some(value))?;
        output.flush()
    }

    /// Reads one value written by [`Self::write_to`] from `reader`.
    pub fn read_from<R: Read + 'static>(&mut self, reader: R) -> Result<Option<Obj>> {
        let mut input = Input::from_reader(reader, DEFAULT_BUFFER_SIZE);
        self.read_class_and_object(&mut input)
    }

    /// Saves `value` to a file, truncating it.
    pub fn save<P: AsRef<Path>>(&mut self, path: P, value: &Obj) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.write_to(BufWriter::new(file), value)
    }

    /// Loads a value saved with [`Self::save`].
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<Option<Obj>> {
        let file = File::open(path.as_ref())?;
        self.read_from(BufReader::new(file))
    }
}
