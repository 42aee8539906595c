//! Typed leaf atoms used to locate and describe video samples.

mod cmov;
mod co64;
mod mdhd;
mod stco;
mod stsc;
mod stsd;
mod stsz;
mod stts;
mod tkhd;

pub use cmov::Cmov;
pub use co64::Co64;
pub use mdhd::Mdhd;
pub use stco::Stco;
pub use stsc::{SampleToChunk, Stsc};
pub use stsd::{SampleDescription, SampleEntry, Stsd, Video};
pub use stsz::Stsz;
pub use stts::{Stts, TimeToSample};
pub use tkhd::Tkhd;
