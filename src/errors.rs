//! Various QuickTime read/decode errors.

use std::path::PathBuf;

use crate::FourCC;

/// Various QuickTime read/decode errors.
#[derive(Debug, thiserror::Error)]
pub enum QtError {
    /// IO error, e.g. reading past end of file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Converted `binrw` error, usually a truncated table or sample.
    #[error("{0}")]
    BinRead(#[from] binrw::Error),
    /// Malformed atom length or nesting.
    #[error("Structural error at offset {offset}: {reason}")]
    Structural{offset: u64, reason: String},
    /// Codec outside the natively supported set.
    /// Triggers legacy delegation when a legacy decoder is available.
    #[error("Unsupported codec '{0}'")]
    UnsupportedCodec(FourCC),
    /// Run-length header word with unknown bits set.
    #[error("Unsupported run-length header 0x{0:04x}")]
    UnsupportedHeader(u16),
    /// Delta-coded frame requested without a valid previous plane.
    #[error("Frame {0} depends on the previous frame, which is not cached")]
    MissingPreviousFrame(usize),
    /// Caller supplied output buffer is too small.
    #[error("Buffer too small: got {got} bytes, need {expected} bytes")]
    BufferSize{got: usize, expected: usize},
    /// Frame index out of range.
    #[error("Invalid frame {no}, movie has {count} frames")]
    InvalidFrame{no: usize, count: usize},
    /// No track with a sample description and chunk offsets.
    #[error("No video track with sample tables found")]
    NoVideoTrack,
    /// Decoded plane is shorter than its geometry requires.
    #[error("Decoded plane is {got} bytes, expected at least {expected} bytes")]
    ShortPlane{got: usize, expected: usize},
    /// Sample data that does not match its codec's layout.
    #[error("Corrupt sample: {0}")]
    Corrupt(String),
    /// Failure reported by the JPEG service.
    #[error("JPEG decode error: {0}")]
    Jpeg(String),
    /// Failure reported by the legacy decoder.
    #[error("Legacy decoder error: {0}")]
    Legacy(String),
    /// Compressed movie header (`cmov`) that can not be inflated.
    #[error("Compressed header not supported: {0}")]
    CompressedHeader(String),
    /// Data and resource forks are separated,
    /// but the resource fork could not be located.
    #[error("QuickTime resource fork not found for '{0}'. Flatten the movie and try again.")]
    ResourceForkNotFound(PathBuf),
}

/// Converts QtError to std::io::Error
impl From<QtError> for std::io::Error {
    fn from(err: QtError) -> Self {
        match err {
            QtError::Io(e) => e,
            other => std::io::Error::new(std::io::ErrorKind::Other, other),
        }
    }
}
