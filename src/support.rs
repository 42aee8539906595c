//! Big endian byte stream over an in-memory sample or atom payload.

use std::io::{Cursor, ErrorKind};

use binrw::BinReaderExt;

use crate::QtError;

/// Bounded, big endian reader over a borrowed byte slice.
/// Reading past the end raises an IO error (`UnexpectedEof`).
#[derive(Debug)]
pub(crate) struct ByteStream<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ByteStream<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { cursor: Cursor::new(data) }
    }

    pub(crate) fn pos(&self) -> usize {
        self.cursor.position() as usize
    }

    pub(crate) fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.len().saturating_sub(self.pos())
    }

    pub(crate) fn seek(&mut self, pos: usize) -> Result<(), QtError> {
        if pos > self.len() {
            return Err(eof(pos, self.len()))
        }
        self.cursor.set_position(pos as u64);
        Ok(())
    }

    pub(crate) fn skip(&mut self, n: usize) -> Result<(), QtError> {
        self.seek(self.pos() + n)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, QtError> {
        Ok(self.cursor.read_be::<u8>()?)
    }

    pub(crate) fn i8(&mut self) -> Result<i8, QtError> {
        Ok(self.cursor.read_be::<i8>()?)
    }

    pub(crate) fn u16(&mut self) -> Result<u16, QtError> {
        Ok(self.cursor.read_be::<u16>()?)
    }

    /// 24-bit unsigned value, e.g. `rpza` chunk length.
    pub(crate) fn u24(&mut self) -> Result<u32, QtError> {
        let b = self.cursor.read_be::<[u8; 3]>()?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub(crate) fn u32(&mut self) -> Result<u32, QtError> {
        Ok(self.cursor.read_be::<u32>()?)
    }

    /// Returns next byte without advancing.
    pub(crate) fn peek_u8(&self) -> Option<u8> {
        self.cursor.get_ref().get(self.pos()).copied()
    }

    /// Borrows the next `n` bytes and advances past them.
    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], QtError> {
        let start = self.pos();
        let data: &'a [u8] = *self.cursor.get_ref();
        let slice = data.get(start .. start + n)
            .ok_or_else(|| eof(start + n, data.len()))?;
        self.cursor.set_position((start + n) as u64);
        Ok(slice)
    }
}

fn eof(pos: usize, len: usize) -> QtError {
    QtError::Io(std::io::Error::new(
        ErrorKind::UnexpectedEof,
        format!("tried to read up to byte {pos} in a {len} byte buffer")
    ))
}

/// Counted (Pascal) string, ignoring null bytes.
/// Falls back to the full buffer if the count exceeds it.
pub(crate) fn counted_string(bytes: &[u8]) -> String {
    let text = match bytes.split_first() {
        Some((count, rest)) if (*count as usize) <= rest.len() => &rest[.. *count as usize],
        _ => bytes,
    };
    text.iter()
        .filter_map(|b| if b != &0 {Some(*b as char)} else {None})
        .collect::<String>()
        .trim()
        .to_owned()
}
