mod stsd;
mod video;

pub use stsd::{SampleDescription, SampleEntry, Stsd};
pub use video::Video;
