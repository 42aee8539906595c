//! Decode video frames from legacy QuickTime movies (MOV).
//!
//! Parses the atom tree once on open, resolves the sample table for the
//! video track, then decodes single frames on request.
//! Natively supported codecs: `raw `, `rle ` (Apple Animation),
//! `rpza` (Apple Video), `jpeg` (Photo JPEG), and `mjpb` (Motion JPEG B).
//! Other codecs are delegated to an optional [`LegacyDecoder`].
//!
//! The implementation was mostly done with help from
//! <https://developer.apple.com/library/archive/documentation/QuickTime/QTFF/QTFFPreface/qtffPreface.html>.
//!
//! ```rs
//! use qtplanes::Movie;
//! use std::path::Path;
//!
//! fn main() -> Result<(), qtplanes::QtError> {
//!     let mut movie = Movie::new(Path::new("MOVIE.MOV"))?;
//!
//!     // Atom tree, including any structural problems found
//!     for atom in movie.atoms().iter() {
//!         println!("{} @ {}", atom.name(), atom.header().offset())
//!     }
//!
//!     // Output size, with axes swapped for transposed tracks
//!     println!("{:?}", movie.geometry().output_size());
//!
//!     let frame = movie.open_frame(0)?;
//!     println!("{} bytes", frame.len());
//!
//!     Ok(())
//! }
//! ```

pub mod atom;
pub mod atom_types;
pub mod codec;
pub mod consts;
pub mod errors;
pub mod fork;
pub mod fourcc;
pub mod frame;
pub mod movie;
pub mod options;
pub mod track;

// Internal reader and byte stream
pub(crate) mod reader;
pub(crate) mod support;

mod tests;

pub use atom::{Atom, AtomData, AtomHeader, AtomIter, AtomTree, StructuralIssue};
pub use atom_types::{
    Cmov,
    Co64,
    Mdhd,
    SampleDescription, // stsd component
    SampleEntry, // stsd component
    SampleToChunk, // stsc component
    Stco,
    Stsc,
    Stsd,
    Stsz,
    Stts,
    TimeToSample, // stts component
    Tkhd,
    Video, // stsd component
};
pub use codec::{CodecKind, CodecParams, DecodedPlane, ImageJpegDecoder, JpegDecoder, PlaneLayout, PreviousPlane};
pub use consts::CONTAINER;
pub use errors::QtError;
pub use fourcc::FourCC;
pub use frame::{post_process, Frame};
pub use movie::Movie;
pub use options::{LegacyDecoder, OpenOptions};
pub use track::{SampleIndex, SampleRange, Track, TrackGeometry};
