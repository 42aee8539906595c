use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use binrw::{BinRead, BinReaderExt, Endian};
use log::warn;

use crate::{AtomData, AtomHeader, FourCC, QtError};

/// Random access reader over a QuickTime movie,
/// or over an in-memory buffer (e.g. an inflated `cmov` payload
/// or a separated resource fork).
#[derive(Debug)]
pub(crate) struct QtReader<R> {
    /// Stream size in bytes.
    pub(crate) len: u64,
    pub(crate) inner: R,
}

impl QtReader<BufReader<File>> {
    /// Creates a `BufReader` over the file at `path`
    /// with default capacity (8KiB) if `capacity` is `None`.
    pub(crate) fn open(path: &Path, capacity: Option<usize>) -> Result<Self, QtError> {
        let file = File::open(path)?;
        let reader = match capacity {
            Some(cap) => BufReader::with_capacity(cap, file),
            None => BufReader::new(file),
        };
        Self::new(reader)
    }
}

impl<R: Read + Seek> QtReader<R> {
    pub(crate) fn new(mut inner: R) -> Result<Self, QtError> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self { len, inner })
    }

    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    pub(crate) fn seek(&mut self, pos: u64) -> Result<u64, QtError> {
        Ok(self.inner.seek(SeekFrom::Start(pos))?)
    }

    fn read_type<T>(&mut self, endian: Endian) -> Result<T, QtError>
    where
        T: BinRead,
        <T as BinRead>::Args<'static>: Sized + Clone + Default,
    {
        Ok(self.inner.read_type::<T>(endian)?)
    }

    /// Reads FourCC at current position.
    pub(crate) fn fourcc(&mut self) -> Result<FourCC, QtError> {
        Ok(FourCC::from_u32(self.read_type::<u32>(Endian::Big)?))
    }

    /// Reads exactly `len` bytes at absolute position `pos`.
    /// Reading past end of stream is an IO error.
    pub(crate) fn read_at(&mut self, pos: u64, len: usize) -> Result<Vec<u8>, QtError> {
        self.seek(pos)?;
        let mut buf = vec![0_u8; len];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Returns the atom header at absolute position `pos`,
    /// for an atom that must end at or before `end`.
    ///
    /// - 32-bit size `1`: 64-bit size follows the FourCC.
    /// - 32-bit size `0`: atom extends to `end`.
    /// - Sizes smaller than the header itself are structural errors.
    /// - Sizes exceeding `end` are clamped to `end`.
    pub(crate) fn header(&mut self, pos: u64, end: u64) -> Result<AtomHeader, QtError> {
        self.seek(pos)?;

        let mut hdr = AtomHeader::default();
        hdr.offset = pos;

        let size32 = self.read_type::<u32>(Endian::Big)?;

        // FourCC may exceed ascii, so read as raw bytes
        hdr.name = self.fourcc()?;

        hdr.atom_size = match size32 {
            0 => {
                hdr.to_end = true;
                end.saturating_sub(pos)
            },
            1 => {
                if pos + 16 > end {
                    return Err(QtError::Structural{
                        offset: pos,
                        reason: format!("no room for 64-bit size of '{}'", hdr.name)
                    })
                }
                hdr.size_64bit = true;
                self.read_type::<u64>(Endian::Big)?
            },
            n => n as u64
        };

        if hdr.atom_size < hdr.header_size() as u64 {
            return Err(QtError::Structural{
                offset: pos,
                reason: format!("'{}' has invalid size {} (32-bit field {})",
                    hdr.name, hdr.atom_size as i64, size32 as i32)
            })
        }

        if pos.saturating_add(hdr.atom_size) > end {
            warn!("'{}' @ {pos} claims {} bytes, clamping to parent end {end}",
                hdr.name, hdr.atom_size);
            hdr.atom_size = end - pos;
        }

        Ok(hdr)
    }

    /// Reads the data load for leaf atom `header`
    /// into an in-memory atom reader.
    pub(crate) fn atom_data(&mut self, header: &AtomHeader) -> Result<AtomData, QtError> {
        let data = self.read_at(header.data_offset(), usize::try_from(header.data_size())
            .map_err(|_| QtError::Structural{
                offset: header.offset,
                reason: format!("'{}' too large to load", header.name)
            })?)?;
        Ok(AtomData::new(header, data))
    }
}
