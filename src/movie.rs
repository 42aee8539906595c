//! Core movie struct: builds the sample index on open,
//! then decodes frames on request.
//!
//! ```rs
//! use qtplanes::Movie;
//! use std::path::Path;
//!
//! fn main() -> Result<(), qtplanes::QtError> {
//!     let mut movie = Movie::new(Path::new("MOVIE.MOV"))?;
//!
//!     println!("{} frames, {:?} per frame", movie.frame_count(), movie.frame_duration());
//!
//!     // Sequential access lets run-length frames reuse the previous frame
//!     for no in 0 .. movie.frame_count() {
//!         let frame = movie.open_frame(no)?;
//!         println!("{no}: {}x{}", frame.width(), frame.height());
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::{
    fs::File,
    io::{BufReader, Cursor, Read, Seek},
    ops::Range,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, warn};
use time::Duration;

use crate::{
    codec::{self, CodecKind, CodecParams, PreviousPlane},
    fork,
    frame::post_process,
    reader::QtReader,
    track::select_track,
    AtomTree,
    FourCC,
    Frame,
    LegacyDecoder,
    OpenOptions,
    QtError,
    SampleDescription,
    SampleIndex,
    Track,
    TrackGeometry,
};

/// Legacy delegation for the whole movie.
#[derive(Clone)]
struct Legacy {
    path: PathBuf,
    decoder: Arc<dyn LegacyDecoder>,
    frame_count: usize,
}

/// QuickTime movie with a resolved sample index for its video track.
pub struct Movie<R: Read + Seek = BufReader<File>> {
    /// Path to the data fork, if opened from a file.
    path: Option<PathBuf>,
    reader: QtReader<R>,
    options: OpenOptions,
    atoms: AtomTree,
    tracks: Vec<Track>,
    /// Index into `tracks` for the decoded track.
    track: Option<usize>,
    geometry: TrackGeometry,
    description: Option<SampleDescription>,
    index: SampleIndex,
    /// Number of trailing samples using the secondary codec.
    secondary_count: u64,
    frame_duration: Option<Duration>,
    legacy: Option<Legacy>,
    cache: PreviousPlane,
}

impl Movie<BufReader<File>> {
    /// Opens movie at `path` with default options.
    pub fn new(path: &Path) -> Result<Self, QtError> {
        Self::with_options(path, OpenOptions::default())
    }

    pub fn with_options(path: &Path, options: OpenOptions) -> Result<Self, QtError> {
        let reader = QtReader::open(path, options.capacity)?;
        Self::build(reader, Some(path.to_owned()), options)
    }
}

impl<R: Read + Seek> Movie<R> {
    /// Movie over any random access reader, e.g. an in-memory `Cursor`.
    /// Resource fork search and legacy delegation require a path
    /// and are unavailable.
    pub fn from_reader(reader: R, options: OpenOptions) -> Result<Self, QtError> {
        Self::build(QtReader::new(reader)?, None, options)
    }

    fn build(
        mut reader: QtReader<R>,
        path: Option<PathBuf>,
        options: OpenOptions
    ) -> Result<Self, QtError> {
        let len = reader.len();
        let atoms = AtomTree::parse(&mut reader, 0 .. len)?;

        let mut movie = Self {
            path,
            reader,
            options,
            atoms,
            tracks: Vec::new(),
            track: None,
            geometry: TrackGeometry::default(),
            description: None,
            index: SampleIndex::default(),
            secondary_count: 0,
            frame_duration: None,
            legacy: None,
            cache: PreviousPlane::default(),
        };

        if movie.options.force_legacy {
            if let Some(legacy) = movie.legacy_backend()? {
                debug!("Forced legacy decoding, {} frames", legacy.frame_count);
                movie.legacy = Some(legacy);
                return Ok(movie)
            }
            warn!("Legacy decoding forced, but no legacy decoder or path available");
        }

        movie.tracks = movie.read_tracks()?;

        let Some(track) = select_track(&movie.tracks) else {
            return match movie.legacy_backend()? {
                Some(legacy) => {
                    movie.legacy = Some(legacy);
                    Ok(movie)
                },
                None => Err(QtError::NoVideoTrack),
            }
        };

        let description = track.stsd()
            .and_then(|s| s.description())
            .ok_or(QtError::NoVideoTrack)?;

        if !CodecKind::from_fourcc(description.primary_codec()).is_supported() {
            if let Some(legacy) = movie.legacy_backend()? {
                debug!("Delegating '{}' to legacy decoder", description.primary_codec());
                movie.legacy = Some(legacy);
                return Ok(movie)
            }
        }

        movie.geometry = match (track.tkhd(), track.stsd().and_then(|s| s.entries().first())) {
            (Some(tkhd), _) => TrackGeometry::from(tkhd),
            (None, Some(entry)) => {
                warn!("No track header, using sample description size");
                let video = entry.video()?;
                TrackGeometry::new([65536, 0, 0, 0, 65536, 0, 0, 0, 1 << 30], video.width() as i32, video.height() as i32)
            },
            (None, None) => TrackGeometry::default(),
        };

        let pixel_region = movie.atoms.find(&FourCC::Mdat).map(|a| {
            let hdr = a.header();
            hdr.data_offset() .. hdr.end()
        });

        // select_track guarantees chunk offsets
        if let Some(chunk_offsets) = track.chunk_offsets() {
            movie.index = SampleIndex::new(chunk_offsets, track.stsz(), track.stsc(), pixel_region, len);
        }

        movie.secondary_count = match (description.secondary_codec(), track.stsc()) {
            (Some(_), Some(stsc)) => stsc.secondary_sample_count(),
            _ => 0,
        };

        movie.frame_duration = match (track.mdhd(), track.stts().and_then(|s| s.first_duration())) {
            (Some(mdhd), Some(delta)) => mdhd.to_duration(delta),
            _ => None,
        };

        movie.track = movie.tracks.iter().position(|t| std::ptr::eq(t, track));

        debug!("{} frames, {}x{} ({:?}), codec '{}', {} bits, secondary {:?} x {}",
            movie.index.len(),
            movie.geometry.declared_width(),
            movie.geometry.declared_height(),
            movie.geometry.output_size(),
            description.primary_codec(),
            description.bits_per_pixel(),
            description.secondary_codec(),
            movie.secondary_count,
        );

        movie.description = Some(description);

        Ok(movie)
    }

    /// Reads all tracks, from `moov` or an inflated `cmov`,
    /// falling back to a separated resource fork if no track
    /// in the file has a chunk offset table.
    fn read_tracks(&mut self) -> Result<Vec<Track>, QtError> {
        let traks = self.atoms.find_all(&FourCC::Trak);
        let mut tracks = traks.iter()
            .map(|trak| Track::new(&mut self.reader, trak))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(cmov) = self.atoms.find(&FourCC::Cmov) {
            let moov = self.reader.atom_data(cmov.header())?.cmov()?.inflate()?;
            debug!("Inflated compressed movie header to {} bytes", moov.len());
            tracks.extend(tracks_from_bytes(moov, 0)?);
        }

        // Sample tables may live in a separated resource fork,
        // even when the data fork carries a stub 'moov'
        let has_offsets = tracks.iter().any(|t| t.chunk_offsets().is_some());
        if !has_offsets && self.options.search_resource_fork {
            if let Some(path) = &self.path {
                let fork_path = fork::find_resource_fork(path)?;
                debug!("Reading movie header from resource fork {}", fork_path.display());
                let data = std::fs::read(&fork_path)?;
                match fork::moov_offset(&data) {
                    Some(offset) => tracks.extend(tracks_from_bytes(data, offset as u64)?),
                    None => warn!("No 'moov' atom in resource fork {}", fork_path.display()),
                }
            }
        }

        Ok(tracks)
    }

    /// Legacy delegation, if both a legacy decoder and a path are available.
    fn legacy_backend(&self) -> Result<Option<Legacy>, QtError> {
        let (Some(decoder), Some(path)) = (&self.options.legacy, &self.path) else {
            return Ok(None)
        };
        Ok(Some(Legacy {
            path: path.to_owned(),
            decoder: decoder.clone(),
            frame_count: decoder.frame_count(path)?,
        }))
    }

    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        match &self.legacy {
            Some(legacy) => legacy.frame_count,
            None => self.index.len(),
        }
    }

    /// `true` if all frames are decoded by the legacy decoder.
    pub fn is_legacy(&self) -> bool {
        self.legacy.is_some()
    }

    pub fn atoms(&self) -> &AtomTree {
        &self.atoms
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// The decoded (video) track.
    pub fn track(&self) -> Option<&Track> {
        self.tracks.get(self.track?)
    }

    pub fn geometry(&self) -> &TrackGeometry {
        &self.geometry
    }

    pub fn description(&self) -> Option<&SampleDescription> {
        self.description.as_ref()
    }

    pub fn sample_index(&self) -> &SampleIndex {
        &self.index
    }

    pub fn secondary_sample_count(&self) -> u64 {
        self.secondary_count
    }

    /// Duration of a single frame, from the first time-to-sample entry.
    pub fn frame_duration(&self) -> Option<Duration> {
        self.frame_duration
    }

    /// `true` if frame `frame_no` is one of the trailing
    /// samples using the secondary codec.
    fn is_secondary(&self, frame_no: usize) -> bool {
        let count = self.index.len() as u64;
        self.secondary_count > 0
            && self.secondary_count <= count
            && frame_no as u64 >= count - self.secondary_count
    }

    /// Codec for frame `frame_no`.
    pub fn codec_for(&self, frame_no: usize) -> Option<CodecKind> {
        let description = self.description.as_ref()?;
        let fourcc = match self.is_secondary(frame_no) {
            true => description.secondary_codec().unwrap_or(description.primary_codec()),
            false => description.primary_codec(),
        };
        Some(CodecKind::from_fourcc(fourcc))
    }

    fn params(&self, frame_no: usize) -> CodecParams {
        let description = self.description.as_ref();
        CodecParams {
            sample_no: frame_no,
            width: self.geometry.declared_width(),
            height: self.geometry.declared_height(),
            bits_per_pixel: description.map(|d| d.bits_per_pixel()).unwrap_or_default(),
            interlaced: description.map(|d| d.interlaced()).unwrap_or_default(),
            transposed: self.geometry.transposed(),
        }
    }

    /// Size in bytes of post-processed frame `frame_no`,
    /// if known without decoding.
    pub fn frame_len(&self, frame_no: usize) -> Option<usize> {
        if self.legacy.is_some() {
            return None
        }
        let params = self.params(frame_no);
        let bits = params.bits_per_pixel;
        let channels = match self.codec_for(frame_no)? {
            CodecKind::Unsupported(_) => return None,
            CodecKind::Rpza => 3,
            CodecKind::Jpeg | CodecKind::InterlacedJpeg => params.jpeg_components(),
            _ if bits == 32 => 3,
            CodecKind::Rle => codec::effective_bpp(bits),
            CodecKind::Raw => params.raw_bytes_per_pixel(),
        };
        Some(params.width * params.height * channels)
    }

    /// Decodes frame `frame_no`.
    ///
    /// Run-length coded frames only decode fully when requested
    /// in order, since they update the previous frame.
    pub fn open_frame(&mut self, frame_no: usize) -> Result<Frame, QtError> {
        if let Some(legacy) = &self.legacy {
            return legacy.decoder.open_frame(&legacy.path, frame_no)
        }

        let count = self.frame_count();
        if frame_no >= count {
            return Err(QtError::InvalidFrame{no: frame_no, count})
        }

        let kind = self.codec_for(frame_no).ok_or(QtError::NoVideoTrack)?;

        if !kind.is_supported() {
            return match (&self.options.legacy, &self.path) {
                (Some(decoder), Some(path)) => {
                    debug!("Frame {frame_no}: delegating '{}' to legacy decoder", kind.fourcc());
                    decoder.open_frame(path, frame_no)
                },
                _ => Err(QtError::UnsupportedCodec(kind.fourcc())),
            }
        }

        let params = self.params(frame_no);
        let secondary = self.is_secondary(frame_no);

        let reuse = match secondary {
            true => None,
            false => self.cache.same(frame_no, &kind).cloned(),
        };

        let plane = match reuse {
            Some(plane) => plane,
            None => {
                let range = self.index.get(frame_no)
                    .ok_or(QtError::InvalidFrame{no: frame_no, count})?;
                let sample = self.reader.read_at(self.index.absolute(&range), range.len as usize)?;

                let previous = match secondary {
                    true => None,
                    false => self.cache.preceding(frame_no, &kind),
                };
                let mut plane = codec::decode(&sample, &kind, &params, previous, self.options.jpeg.as_ref())?;

                // A shorter previous plane bounds the new one
                if let Some(prev_len) = previous.map(|p| p.len()) {
                    if prev_len < plane.len() {
                        plane.truncate(prev_len);
                    }
                }
                plane
            }
        };

        let bits = params.bits_per_pixel;
        let frame = post_process(&plane, &kind, &self.geometry, bits)?;

        self.cache.store(frame_no, kind, plane);

        Ok(frame)
    }

    /// Decodes frame `frame_no` into `buf`, returning the number of bytes written.
    ///
    /// Fails with [`QtError::BufferSize`] before decoding if `buf`
    /// can not hold the frame.
    pub fn open_frame_into(&mut self, frame_no: usize, buf: &mut [u8]) -> Result<usize, QtError> {
        if let Some(expected) = self.frame_len(frame_no) {
            if buf.len() < expected {
                return Err(QtError::BufferSize{got: buf.len(), expected})
            }
        }

        let frame = self.open_frame(frame_no)?;
        let n = frame.len();
        match buf.get_mut(.. n) {
            Some(dst) => dst.copy_from_slice(frame.pixels()),
            None => return Err(QtError::BufferSize{got: buf.len(), expected: n}),
        }

        Ok(n)
    }

    /// Drops the cached previous frame.
    pub fn reset(&mut self) {
        self.cache.clear()
    }

    /// Path to the data fork, if opened from a file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Size of the data fork in bytes.
    pub fn len(&self) -> u64 {
        self.reader.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reader.len() == 0
    }

    /// Byte range of the pixel data region.
    pub fn pixel_region(&self) -> Range<u64> {
        let start = self.index.pixel_offset();
        start .. start + self.index.pixel_bytes()
    }
}

/// Tracks from an in-memory movie header starting at `offset`.
fn tracks_from_bytes(data: Vec<u8>, offset: u64) -> Result<Vec<Track>, QtError> {
    let mut reader = QtReader::new(Cursor::new(data))?;
    let len = reader.len();
    let tree = AtomTree::parse(&mut reader, offset .. len)?;
    tree.find_all(&FourCC::Trak)
        .iter()
        .map(|trak| Track::new(&mut reader, trak))
        .collect()
}
