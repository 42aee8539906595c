//! Codec registry and native decoders.
//!
//! Supported natively:
//! - `raw `: uncompressed, passed through
//! - `rle `: Apple Animation, delta coded against the previous frame
//! - `rpza`: Apple Video, 4x4 block vector quantization
//! - `jpeg`: Photo JPEG, handed to a [`JpegDecoder`]
//! - `mjpb`: Motion JPEG format B, rebuilt into JFIF per field
//!
//! Anything else maps to [`CodecKind::Unsupported`] and is
//! delegated to a legacy decoder by [`crate::Movie`].

mod jpeg;
mod mjpb;
mod rle;
mod rpza;
mod tables;

pub use jpeg::{ImageJpegDecoder, JpegDecoder};
#[cfg(test)]
pub(crate) use mjpb::stuff_ff;
pub(crate) use rle::effective_bpp;

use log::trace;

use crate::{FourCC, QtError};

/// Closed set of codecs, derived from a sample description FourCC.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CodecKind {
    Raw,
    Rle,
    Rpza,
    Jpeg,
    /// MJPEG-B (`mjpb`), one or two fields per sample.
    InterlacedJpeg,
    Unsupported(FourCC),
}

impl CodecKind {
    /// Pure mapping from FourCC to codec.
    pub fn from_fourcc(fourcc: &FourCC) -> Self {
        match fourcc {
            FourCC::Raw => Self::Raw,
            FourCC::Rle => Self::Rle,
            FourCC::Rpza => Self::Rpza,
            FourCC::Jpeg => Self::Jpeg,
            FourCC::Mjpb => Self::InterlacedJpeg,
            other => Self::Unsupported(other.to_owned()),
        }
    }

    pub fn fourcc(&self) -> FourCC {
        match self {
            Self::Raw => FourCC::Raw,
            Self::Rle => FourCC::Rle,
            Self::Rpza => FourCC::Rpza,
            Self::Jpeg => FourCC::Jpeg,
            Self::InterlacedJpeg => FourCC::Mjpb,
            Self::Unsupported(f) => f.to_owned(),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }

    /// `true` for codecs whose output already has the exact
    /// plane size and polarity (no row padding, no inversion).
    pub fn is_exact(&self) -> bool {
        matches!(self, Self::Rpza | Self::Jpeg | Self::InterlacedJpeg)
    }
}

impl From<&FourCC> for CodecKind {
    fn from(fourcc: &FourCC) -> Self {
        Self::from_fourcc(fourcc)
    }
}

/// Byte layout of a decoded plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneLayout {
    /// Pixel components stored next to each other.
    Interleaved,
    /// One full plane per channel.
    Planar,
}

/// Codec output in its native layout, before post-processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPlane {
    pub(crate) width: usize,
    pub(crate) height: usize,
    /// Bytes per pixel, summed over all channels.
    pub(crate) bytes_per_pixel: usize,
    pub(crate) layout: PlaneLayout,
    pub(crate) bytes: Vec<u8>,
}

impl DecodedPlane {
    pub fn new(
        width: usize,
        height: usize,
        bytes_per_pixel: usize,
        layout: PlaneLayout,
        bytes: Vec<u8>
    ) -> Self {
        Self { width, height, bytes_per_pixel, layout, bytes }
    }

    pub fn interleaved(width: usize, height: usize, bytes_per_pixel: usize, bytes: Vec<u8>) -> Self {
        Self::new(width, height, bytes_per_pixel, PlaneLayout::Interleaved, bytes)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.bytes_per_pixel
    }

    pub fn layout(&self) -> PlaneLayout {
        self.layout
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Expected size in bytes without any row padding.
    pub fn expected_len(&self) -> usize {
        self.width * self.height * self.bytes_per_pixel
    }

    /// Truncates plane data to `len` bytes.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len)
    }
}

/// Per-frame decode parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecParams {
    /// Frame being decoded. Used for error reporting.
    pub sample_no: usize,
    /// Declared (pre-transpose) width.
    pub width: usize,
    /// Declared (pre-transpose) height.
    pub height: usize,
    pub bits_per_pixel: i16,
    pub interlaced: bool,
    pub transposed: bool,
}

impl CodecParams {
    /// Stored bytes per pixel for uncompressed samples.
    /// Depths of 40 and above are grayscale (`bits - 32`).
    pub fn raw_bytes_per_pixel(&self) -> usize {
        let bits = self.bits_per_pixel.max(0) as usize;
        let bytes = match bits < 40 {
            true => bits / 8,
            false => (bits - 32) / 8,
        };
        bytes.max(1)
    }

    /// Number of color components for JPEG output:
    /// 1 for grayscale depths (40 and above), else 3.
    pub fn jpeg_components(&self) -> usize {
        match self.bits_per_pixel >= 40 {
            true => 1,
            false => 3,
        }
    }
}

/// Single slot cache holding the most recently decoded plane.
///
/// Only valid for the immediately following sample decoded
/// with the same codec.
#[derive(Debug, Clone, Default)]
pub struct PreviousPlane {
    pub(crate) sample_no: Option<usize>,
    pub(crate) codec: Option<CodecKind>,
    pub(crate) plane: Option<DecodedPlane>,
}

impl PreviousPlane {
    /// Returns cached plane if it directly precedes `sample_no`
    /// and was decoded with `codec`.
    pub fn preceding(&self, sample_no: usize, codec: &CodecKind) -> Option<&DecodedPlane> {
        match (self.sample_no, &self.codec) {
            (Some(no), Some(c)) if no + 1 == sample_no && c == codec => self.plane.as_ref(),
            _ => None,
        }
    }

    /// Returns cached plane if it is `sample_no` decoded with `codec`.
    pub fn same(&self, sample_no: usize, codec: &CodecKind) -> Option<&DecodedPlane> {
        match (self.sample_no, &self.codec) {
            (Some(no), Some(c)) if no == sample_no && c == codec => self.plane.as_ref(),
            _ => None,
        }
    }

    pub fn sample_no(&self) -> Option<usize> {
        self.sample_no
    }

    /// Replaces cache entry.
    pub fn store(&mut self, sample_no: usize, codec: CodecKind, plane: DecodedPlane) {
        self.sample_no = Some(sample_no);
        self.codec = Some(codec);
        self.plane = Some(plane);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Decodes a single sample.
///
/// `previous` must be the decoded plane for `params.sample_no - 1`
/// (see [`PreviousPlane::preceding`]). It is only consulted by `rle `.
///
/// Fails with [`QtError::UnsupportedCodec`] for codecs outside the native set.
pub fn decode(
    sample: &[u8],
    kind: &CodecKind,
    params: &CodecParams,
    previous: Option<&DecodedPlane>,
    jpeg: &dyn JpegDecoder,
) -> Result<DecodedPlane, QtError> {
    trace!("Decoding sample {} ({} bytes) as {:?}", params.sample_no, sample.len(), kind);

    match kind {
        CodecKind::Raw => Ok(DecodedPlane::interleaved(
            params.width,
            params.height,
            params.raw_bytes_per_pixel(),
            sample.to_vec()
        )),
        CodecKind::Rle => rle::decode(sample, params, previous),
        CodecKind::Rpza => rpza::decode(sample, params),
        CodecKind::Jpeg => jpeg::decode(sample, params, jpeg),
        CodecKind::InterlacedJpeg => mjpb::decode(sample, params, jpeg),
        CodecKind::Unsupported(fourcc) => Err(QtError::UnsupportedCodec(fourcc.to_owned())),
    }
}
