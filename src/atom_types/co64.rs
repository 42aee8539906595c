//! Chunk to offset atom for file sizes above the 32bit limit (`co64`).
//! The 64-bit equivalent of the `stco` atom.
//!
//! Path: `moov/trak[multiple]/mdia/minf/stbl/co64`

use binrw::{helpers::until_eof, BinRead};

use super::Stco;

/// Chunk to offset atom for file sizes above the 32bit limit (`co64`).
/// The 64-bit equivalent of the `stco` atom.
/// `stco` offsets are converted into this form.
///
/// Path: `moov/trak/mdia/minf/stbl/co64`
#[derive(Debug, Default, BinRead, Clone)]
#[br(big)]
pub struct Co64 {
    _version: u8,
    _flags: [u8; 3],
    no_of_entries: u32,
    #[br(parse_with = until_eof)]
    offsets: Vec<u64>
}

impl Co64 {
    /// Declared number of chunks.
    pub fn no_of_entries(&self) -> u32 {
        self.no_of_entries
    }

    /// Returns number of chunk offsets actually present,
    /// capped at the declared count.
    pub fn len(&self) -> usize {
        self.offsets().len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets().is_empty()
    }

    /// Returns absolute chunk byte offsets.
    /// (each chunk corresponds to one or more samples).
    pub fn offsets(&self) -> &[u64] {
        let n = self.offsets.len().min(self.no_of_entries as usize);
        &self.offsets[.. n]
    }
}

impl From<Stco> for Co64 {
    fn from(value: Stco) -> Self {
        Self {
            _version: value.version,
            _flags: value.flags,
            no_of_entries: value.no_of_entries,
            offsets: value.offsets
                .iter()
                .map(|n| *n as u64)
                .collect()
        }
    }
}

#[cfg(test)]
impl Co64 {
    pub(crate) fn from_offsets(offsets: &[u64]) -> Self {
        Self {
            no_of_entries: offsets.len() as u32,
            offsets: offsets.to_vec(),
            ..Default::default()
        }
    }
}
