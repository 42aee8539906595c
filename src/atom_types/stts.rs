//! Time-to-sample atom (`stts`).
//!
//! Location: `moov/trak[multiple]/mdia/minf/stbl/stts`
//!
//! See <https://developer.apple.com/documentation/quicktime-file-format/time-to-sample_atom>

use binrw::BinRead;

#[derive(Debug, Clone, BinRead)]
#[br(big)]
pub struct TimeToSample {
    pub(crate) sample_count: u32,
    pub(crate) sample_duration: u32,
}

/// Time to sample atom (`stts`).
///
/// Path: `moov/trak[multiple]/mdia/minf/stbl/stts`
///
/// See <https://developer.apple.com/documentation/quicktime-file-format/time-to-sample_atom>
#[derive(Debug, Clone, BinRead)]
#[br(big)]
pub struct Stts {
    _version: u8,
    _flags: [u8; 3],
    _no_of_entries: u32,
    #[br(count = _no_of_entries)]
    table: Vec<TimeToSample>
}

impl Stts {
    /// Returns the time to sample table as tuples,
    /// `(SAMPLE_COUNT, SAMPLE_DURATION)`.
    pub fn table(&self) -> Vec<(u32, u32)> {
        self.table.iter()
            .map(|t| (t.sample_count, t.sample_duration))
            .collect()
    }

    /// Unscaled duration of the first entry.
    /// Legacy movies report this value as "frames per second",
    /// only the first entry is consulted.
    pub fn first_duration(&self) -> Option<u32> {
        self.table.first().map(|t| t.sample_duration)
    }
}
