//! Media header atom (`mdhd`).
//!
//! Specifies the characteristics of a media (`mdia`),
//! including time scale and duration.
//!
//! Location: `moov/trak/mdia/mdhd`
//!
//! See: <https://developer.apple.com/documentation/quicktime-file-format/media_header_atom>

use binrw::BinRead;
use time::Duration;

/// Media header atom ('mdhd'). One per track (`trak`).
///
/// Path: `moov/trak/mdia/mdhd`
#[derive(Debug, Default, Clone, BinRead)]
#[br(big)]
pub struct Mdhd {
    _version: u8,
    _flags: [u8; 3],
    _creation_time: u32,
    _modification_time: u32,
    pub(crate) time_scale: u32,
    /// Unscaled duration. I.e. "ticks"
    /// that require dividing by time scale
    /// to derive a value in seconds.
    pub(crate) duration: u32,
}

impl Mdhd {
    pub fn time_scale(&self) -> u32 {
        self.time_scale
    }

    /// Unscaled duration.
    pub fn duration_ticks(&self) -> u32 {
        self.duration
    }

    /// Converts `ticks` in this media's time scale
    /// to a `time::Duration`. Returns `None` for a zero time scale.
    pub fn to_duration(&self, ticks: u32) -> Option<Duration> {
        match self.time_scale {
            0 => None,
            ts => Some(Duration::seconds_f64(ticks as f64 / ts as f64)),
        }
    }

    /// Media duration.
    pub fn duration(&self) -> Option<Duration> {
        self.to_duration(self.duration)
    }
}
