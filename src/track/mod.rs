mod geometry;
mod offset;
mod track;

pub use geometry::TrackGeometry;
pub use offset::{SampleIndex, SampleRange};
pub use track::Track;
pub(crate) use track::select_track;
