//! Chunk offset atom for file sizes below the 32bit limit (`stco`).
//!
//! Location: `moov/trak[multiple]/mdia/minf/stbl/stco`
//!
//! See: <https://developer.apple.com/documentation/quicktime-file-format/chunk_offset_atom>

use binrw::{helpers::until_eof, BinRead};

/// Chunk offset atom for file sizes below the 32bit limit (`stco`).
///
/// Offsets are read until the end of the data load,
/// so a declared entry count that disagrees with the
/// table length does not fail the parse.
///
/// Location: `moov/trak[multiple]/mdia/minf/stbl/stco`
///
/// See: <https://developer.apple.com/documentation/quicktime-file-format/chunk_offset_atom>
#[derive(Debug, Default, BinRead, Clone)]
#[br(big)]
pub struct Stco {
    pub(crate) version: u8,
    pub(crate) flags: [u8; 3],
    pub(crate) no_of_entries: u32,
    /// Chunk offset table consisting of an array of offset values.
    #[br(parse_with = until_eof)]
    pub(crate) offsets: Vec<u32>
}

impl Stco {
    pub fn no_of_entries(&self) -> u32 {
        self.no_of_entries
    }
}
