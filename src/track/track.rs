//! A QuickTime "track", holding the tables needed to
//! locate and decode its samples.

use std::io::{Read, Seek};

use log::{debug, warn};

use crate::{
    reader::QtReader,
    Atom,
    AtomHeader,
    Co64,
    FourCC,
    Mdhd,
    QtError,
    Stsc,
    Stsd,
    Stsz,
    Stts,
    Tkhd,
};

/// Sample tables and headers for a single `trak`.
///
/// For each table the first occurrence within the track wins.
/// A table that fails to parse is logged and ignored.
#[derive(Debug, Default, Clone)]
pub struct Track {
    /// Track contains a video media header (`vmhd`).
    pub(crate) is_video: bool,
    pub(crate) tkhd: Option<Tkhd>,
    pub(crate) mdhd: Option<Mdhd>,
    pub(crate) stsd: Option<Stsd>,
    /// Chunk offsets from `stco` or `co64`.
    pub(crate) chunk_offsets: Option<Co64>,
    pub(crate) stsz: Option<Stsz>,
    pub(crate) stsc: Option<Stsc>,
    pub(crate) stts: Option<Stts>,
}

impl Track {
    /// Reads all relevant leaf atoms below `trak`.
    pub(crate) fn new<R: Read + Seek>(
        reader: &mut QtReader<R>,
        trak: &Atom
    ) -> Result<Self, QtError> {
        let mut track = Self::default();

        for atom in trak.iter().filter(|a| !a.is_container()) {
            let name = atom.name();
            match name {
                FourCC::Vmhd => {
                    track.is_video = true;
                    continue
                },
                FourCC::Tkhd if track.tkhd.is_none() => (),
                FourCC::Mdhd if track.mdhd.is_none() => (),
                FourCC::Stsd if track.stsd.is_none() => (),
                FourCC::Stco | FourCC::Co64 if track.chunk_offsets.is_none() => (),
                FourCC::Stsz if track.stsz.is_none() => (),
                FourCC::Stsc if track.stsc.is_none() => (),
                FourCC::Stts if track.stts.is_none() => (),
                _ => continue,
            }

            let mut data = reader.atom_data(atom.header())?;
            let header = data.header().to_owned();
            match name {
                FourCC::Tkhd => track.tkhd = extract(&header, data.tkhd()),
                FourCC::Mdhd => track.mdhd = extract(&header, data.mdhd()),
                FourCC::Stsd => track.stsd = extract(&header, data.stsd()),
                FourCC::Stsz => track.stsz = extract(&header, data.stsz()),
                FourCC::Stsc => track.stsc = extract(&header, data.stsc()),
                FourCC::Stts => track.stts = extract(&header, data.stts()),
                _ => track.chunk_offsets = extract(&header, data.chunk_offsets()),
            }
        }

        debug!("Track @ {}: video={}, stsd={}, chunk offsets={}, samples={}",
            trak.header().offset(),
            track.is_video,
            track.stsd.is_some(),
            track.chunk_offsets.as_ref().map(|c| c.len()).unwrap_or_default(),
            track.stsz.as_ref().map(|s| s.len()).unwrap_or_default(),
        );

        Ok(track)
    }

    /// `true` if track has both a sample description
    /// and chunk offsets, i.e. samples can be located and decoded.
    pub fn has_samples(&self) -> bool {
        self.stsd.is_some() && self.chunk_offsets.is_some()
    }

    pub fn is_video(&self) -> bool {
        self.is_video
    }

    pub fn tkhd(&self) -> Option<&Tkhd> {
        self.tkhd.as_ref()
    }

    pub fn mdhd(&self) -> Option<&Mdhd> {
        self.mdhd.as_ref()
    }

    pub fn stsd(&self) -> Option<&Stsd> {
        self.stsd.as_ref()
    }

    pub fn chunk_offsets(&self) -> Option<&Co64> {
        self.chunk_offsets.as_ref()
    }

    pub fn stsz(&self) -> Option<&Stsz> {
        self.stsz.as_ref()
    }

    pub fn stsc(&self) -> Option<&Stsc> {
        self.stsc.as_ref()
    }

    pub fn stts(&self) -> Option<&Stts> {
        self.stts.as_ref()
    }
}

/// Logs and discards extractor failures.
fn extract<T>(header: &AtomHeader, result: Result<T, QtError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("Ignoring '{}' @ {}: {err}", header.name(), header.offset());
            None
        }
    }
}

/// Selects the track to decode: the first video track (`vmhd`)
/// with locatable samples, otherwise the first track with locatable samples.
pub(crate) fn select_track(tracks: &[Track]) -> Option<&Track> {
    tracks.iter()
        .find(|t| t.is_video && t.has_samples())
        .or_else(|| tracks.iter().find(|t| t.has_samples()))
}
