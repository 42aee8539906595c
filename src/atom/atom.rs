//! Atom tree and in-memory leaf atom reader.
//!
//! The tree is built once from atom headers only.
//! Leaf data loads are read on demand via [`AtomData`].

use std::{
    io::{Cursor, Read, Seek},
    ops::Range,
};

use binrw::{BinRead, BinReaderExt};
use log::{debug, trace, warn};

use crate::{
    atom_types::{Cmov, Co64, Mdhd, Stco, Stsc, Stsd, Stsz, Stts, Tkhd},
    consts::{MAX_DEPTH, UDTA_TRAILER},
    reader::QtReader,
    FourCC,
    QtError,
};

use super::AtomHeader;

/// Atom with its (possibly empty) list of child atoms.
/// Only atoms in the container whitelist have children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub(crate) header: AtomHeader,
    pub(crate) children: Vec<Atom>,
}

impl Atom {
    pub fn header(&self) -> &AtomHeader {
        &self.header
    }

    pub fn name(&self) -> &FourCC {
        &self.header.name
    }

    pub fn children(&self) -> &[Atom] {
        &self.children
    }

    pub fn is_container(&self) -> bool {
        self.header.is_container()
    }

    /// Depth-first iterator over this atom and all its descendants.
    pub fn iter(&self) -> AtomIter<'_> {
        AtomIter { stack: vec![self] }
    }

    /// Returns first descendant (or self) with specified FourCC,
    /// depth-first, in file order.
    pub fn find(&self, name: &FourCC) -> Option<&Atom> {
        self.iter().find(|a| a.name() == name)
    }
}

/// Depth-first, pre-order iterator over atoms.
#[derive(Debug)]
pub struct AtomIter<'a> {
    stack: Vec<&'a Atom>,
}

impl<'a> Iterator for AtomIter<'a> {
    type Item = &'a Atom;

    fn next(&mut self) -> Option<Self::Item> {
        let atom = self.stack.pop()?;
        self.stack.extend(atom.children.iter().rev());
        Some(atom)
    }
}

/// Problem encountered while walking the atom tree.
/// Traversal of the affected level stops,
/// but all atoms discovered so far are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralIssue {
    pub offset: u64,
    pub reason: String,
}

/// Top-level atoms for a byte range,
/// together with any structural issues found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomTree {
    pub(crate) atoms: Vec<Atom>,
    pub(crate) issues: Vec<StructuralIssue>,
}

impl AtomTree {
    /// Parses all atoms within `range`.
    ///
    /// Only IO errors (other than truncation, which is recorded
    /// as a structural issue) abort parsing.
    pub(crate) fn parse<R: Read + Seek>(
        reader: &mut QtReader<R>,
        range: Range<u64>
    ) -> Result<Self, QtError> {
        let end = range.end.min(reader.len());
        let mut tree = Self::default();
        tree.atoms = Self::parse_level(reader, range.start, end, 0, &mut tree.issues)?;
        Ok(tree)
    }

    fn parse_level<R: Read + Seek>(
        reader: &mut QtReader<R>,
        start: u64,
        end: u64,
        depth: usize,
        issues: &mut Vec<StructuralIssue>,
    ) -> Result<Vec<Atom>, QtError> {
        let mut atoms: Vec<Atom> = Vec::new();
        let mut pos = start;

        // Fewer than 8 bytes left is trailing padding, not an atom
        while pos + 8 <= end {
            let header = match reader.header(pos, end) {
                Ok(hdr) => hdr,
                Err(QtError::Structural{offset, reason}) => {
                    warn!("Invalid atom @ {offset}: {reason}");
                    issues.push(StructuralIssue{offset, reason});
                    break
                },
                Err(err) => return Err(err),
            };

            trace!("{:>width$}{} @ {} ({} bytes)", "", header.name, header.offset, header.atom_size,
                width = depth * 2);

            let children = match header.is_container() {
                true if depth >= MAX_DEPTH => {
                    let reason = format!("'{}' nested deeper than {MAX_DEPTH} levels", header.name);
                    warn!("Invalid atom @ {pos}: {reason}");
                    issues.push(StructuralIssue{offset: pos, reason});
                    break
                },
                true => {
                    debug!("Container '{}' @ {}", header.name, header.offset);
                    Self::parse_level(reader, header.data_offset(), header.end(), depth + 1, issues)?
                },
                false => Vec::new(),
            };

            // Leaves are skipped by their declared size,
            // regardless of what an extractor later consumes
            pos = header.end();
            if header.name == FourCC::Udta {
                pos += UDTA_TRAILER;
            }

            atoms.push(Atom { header, children });
        }

        Ok(atoms)
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn issues(&self) -> &[StructuralIssue] {
        &self.issues
    }

    /// Depth-first iterator over all atoms in the tree.
    pub fn iter(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.iter().flat_map(|a| a.iter())
    }

    /// Returns first atom with specified FourCC, depth-first.
    pub fn find(&self, name: &FourCC) -> Option<&Atom> {
        self.iter().find(|a| a.name() == name)
    }

    /// Returns all atoms with specified FourCC, depth-first.
    pub fn find_all(&self, name: &FourCC) -> Vec<&Atom> {
        self.iter().filter(|a| a.name() == name).collect()
    }
}

/// In-memory reader over a leaf atom's data load,
/// with typed extractors for the atoms this crate uses.
#[derive(Debug)]
pub struct AtomData {
    pub(crate) header: AtomHeader,
    cursor: Cursor<Vec<u8>>,
}

impl AtomData {
    pub(crate) fn new(header: &AtomHeader, data: Vec<u8>) -> Self {
        Self {
            header: header.to_owned(),
            cursor: Cursor::new(data),
        }
    }

    pub fn header(&self) -> &AtomHeader {
        &self.header
    }

    /// Data load, excluding header.
    pub fn data(&self) -> &[u8] {
        self.cursor.get_ref()
    }

    fn read<T>(&mut self) -> Result<T, QtError>
    where
        T: BinRead,
        <T as BinRead>::Args<'static>: Sized + Clone + Default,
    {
        self.cursor.set_position(0);
        Ok(self.cursor.read_be::<T>()?)
    }

    fn match_name(&self, name: &FourCC) -> Result<(), QtError> {
        if &self.header.name != name {
            return Err(QtError::Structural{
                offset: self.header.offset,
                reason: format!("Atom mismatch. Expected '{name}', got '{}'", self.header.name)
            })
        }
        Ok(())
    }

    pub fn tkhd(&mut self) -> Result<Tkhd, QtError> {
        self.match_name(&FourCC::Tkhd)?;
        self.read::<Tkhd>()
    }

    pub fn mdhd(&mut self) -> Result<Mdhd, QtError> {
        self.match_name(&FourCC::Mdhd)?;
        self.read::<Mdhd>()
    }

    /// Chunk offsets from either `stco` (32-bit)
    /// or `co64` (64-bit), as 64-bit values.
    pub fn chunk_offsets(&mut self) -> Result<Co64, QtError> {
        match self.header.name {
            FourCC::Co64 => self.read::<Co64>(),
            _ => {
                self.match_name(&FourCC::Stco)?;
                Ok(Co64::from(self.read::<Stco>()?))
            }
        }
    }

    pub fn stsz(&mut self) -> Result<Stsz, QtError> {
        self.match_name(&FourCC::Stsz)?;
        self.read::<Stsz>()
    }

    pub fn stsc(&mut self) -> Result<Stsc, QtError> {
        self.match_name(&FourCC::Stsc)?;
        self.read::<Stsc>()
    }

    pub fn stts(&mut self) -> Result<Stts, QtError> {
        self.match_name(&FourCC::Stts)?;
        self.read::<Stts>()
    }

    pub fn stsd(&mut self) -> Result<Stsd, QtError> {
        self.match_name(&FourCC::Stsd)?;
        Stsd::parse(self.data())
    }

    pub fn cmov(&mut self) -> Result<Cmov, QtError> {
        self.match_name(&FourCC::Cmov)?;
        Cmov::parse(self.data())
    }
}
