use std::ops::Range;

use crate::FourCC;

/// Atom header.
/// 8 or 16 bytes, depending on whether
/// 32 or 64-bit sized.
///
/// ```ignore
/// | [X X X X] [Y Y Y Y] [Z Z Z Z Z Z Z Z] |
///    |         |         |
///    |         |         64bit size (optional, only if 32 bit size == 1)
///    |         FourCC
///    32bit size (0 = extends to end of parent range)
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomHeader {
    /// Total atom size in bytes including 8/16 byte header.
    /// Resolved for "to end" sizes and clamped to the parent range.
    pub(crate) atom_size: u64,
    /// FourCC
    pub(crate) name: FourCC,
    /// Absolute byte offset for start of atom,
    /// i.e. byte offset for its header,
    /// starting with 32-bit size.
    pub(crate) offset: u64,
    /// Set to `true` if atom size specified
    /// in 64 bit area, i.e. 32bit size is set to `1`.
    pub(crate) size_64bit: bool,
    /// Set to `true` if 32bit size is `0`,
    /// i.e. the atom extends to the end of its parent range.
    pub(crate) to_end: bool,
}

impl AtomHeader {
    /// Convenience method to check whether atom is
    /// a container or not.
    pub fn is_container(&self) -> bool {
        self.name.is_container()
    }

    pub fn name(&self) -> &FourCC {
        &self.name
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn atom_size(&self) -> u64 {
        self.atom_size
    }

    pub fn end(&self) -> u64 {
        self.offset + self.atom_size
    }

    /// Header size in bytes, 8 or 16.
    pub fn header_size(&self) -> u8 {
        match self.size_64bit {
            true => 16,
            false => 8,
        }
    }

    /// Data load absolute offset,
    /// i.e. position after header
    /// adjusted for optional 64bit size value.
    pub fn data_offset(&self) -> u64 {
        self.offset + self.header_size() as u64
    }

    /// Size of data load (excludes header size).
    pub fn data_size(&self) -> u64 {
        self.atom_size - self.header_size() as u64
    }

    /// Returns start, end offset range for atom.
    pub fn bounds(&self) -> Range<u64> {
        self.offset .. self.end()
    }

    /// Returns `true` if `range` is fully contained
    /// within the data load of this atom.
    pub fn contains_range(&self, range: &Range<u64>) -> bool {
        self.data_offset() <= range.start && range.end <= self.end()
    }
}
