//! Sample description atom (`stsd`).
//!
//! Location: `moov/trak[multiple]/mdia/minf/stbl/stsd`
//!
//! See: <https://developer.apple.com/documentation/quicktime-file-format/video_sample_description>

use std::io::Cursor;

use binrw::BinReaderExt;
use log::warn;

use crate::{support::ByteStream, FourCC, QtError};

use super::Video;

/// Sample description atom (`stsd`).
///
/// Entries are located via their size field.
/// Only the first two entries are of interest: the first
/// describes the primary codec, the second a codec that applies
/// to a number of trailing samples.
#[derive(Debug, Default, Clone)]
pub struct Stsd {
    pub(crate) no_of_entries: u32,
    pub(crate) entries: Vec<SampleEntry>,
}

impl Stsd {
    /// Declared number of sample descriptions.
    pub fn no_of_entries(&self) -> u32 {
        self.no_of_entries
    }

    /// Parses `stsd` data load (excluding atom header).
    /// An entry with an invalid size extends to the end of
    /// the data load and ends parsing.
    pub(crate) fn parse(data: &[u8]) -> Result<Self, QtError> {
        let mut stream = ByteStream::new(data);
        stream.skip(4)?; // version, flags
        let no_of_entries = stream.u32()?;

        let mut entries: Vec<SampleEntry> = Vec::new();
        while entries.len() < no_of_entries as usize && stream.remaining() >= 8 {
            let start = stream.pos();
            let size = stream.u32()? as usize;
            let codec = FourCC::from_slice(stream.take(4)?);
            let end = match size < 8 {
                true => stream.len(),
                false => (start + size).min(stream.len()),
            };
            let data = stream.take(end - stream.pos())?.to_vec();
            entries.push(SampleEntry { size: size as u32, codec, data });
            if size < 8 {
                break
            }
        }

        Ok(Self { no_of_entries, entries })
    }

    pub fn entries(&self) -> &[SampleEntry] {
        &self.entries
    }

    /// Returns the sample description derived from the first entry,
    /// with the second entry's codec (if any) as secondary codec.
    pub fn description(&self) -> Option<SampleDescription> {
        let first = self.entries.first()?;

        let video = first.video()
            .map_err(|err| warn!("Failed to read video sample description for '{}': {err}", first.codec))
            .ok();

        let bits_per_pixel = match first.codec {
            FourCC::Rpza => 8,
            _ => video.as_ref().map(|v| v.depth()).unwrap_or_default(),
        };

        Some(SampleDescription {
            primary_codec: first.codec.to_owned(),
            bits_per_pixel,
            interlaced: video.and_then(|v| v.fields()) == Some(2),
            secondary_codec: self.entries.get(1).map(|e| e.codec.to_owned()),
        })
    }
}

/// Single `stsd` entry.
#[derive(Debug, Clone)]
pub struct SampleEntry {
    pub(crate) size: u32,
    pub(crate) codec: FourCC,
    /// Entry data following size and codec.
    pub(crate) data: Vec<u8>,
}

impl SampleEntry {
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn codec(&self) -> &FourCC {
        &self.codec
    }

    pub fn video(&self) -> Result<Video, QtError> {
        Ok(Cursor::new(&self.data).read_be::<Video>()?)
    }
}

/// Codec and pixel layout for a video track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleDescription {
    pub(crate) primary_codec: FourCC,
    /// Pixel depth. Forced to 8 for `rpza`.
    /// Values of 40 and above denote grayscale.
    pub(crate) bits_per_pixel: i16,
    /// Two fields per frame.
    pub(crate) interlaced: bool,
    /// Codec for the trailing samples that refer
    /// to the second sample description.
    pub(crate) secondary_codec: Option<FourCC>,
}

impl SampleDescription {
    pub fn new(
        primary_codec: FourCC,
        bits_per_pixel: i16,
        interlaced: bool,
        secondary_codec: Option<FourCC>,
    ) -> Self {
        Self { primary_codec, bits_per_pixel, interlaced, secondary_codec }
    }

    pub fn primary_codec(&self) -> &FourCC {
        &self.primary_codec
    }

    pub fn bits_per_pixel(&self) -> i16 {
        self.bits_per_pixel
    }

    pub fn interlaced(&self) -> bool {
        self.interlaced
    }

    pub fn secondary_codec(&self) -> Option<&FourCC> {
        self.secondary_codec.as_ref()
    }

    /// Bytes per pixel: `(bits / 8) % 4`,
    /// i.e. 1 for both 8-bit and 40-bit grayscale.
    pub fn bytes_per_pixel(&self) -> usize {
        ((self.bits_per_pixel.max(0) as usize) / 8) % 4
    }

    /// `true` for grayscale depths (40 and above).
    pub fn is_grayscale(&self) -> bool {
        self.bits_per_pixel >= 40
    }
}
