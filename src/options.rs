//! Options for opening a movie.

use std::{fmt, path::Path, sync::Arc};

use crate::{codec::{ImageJpegDecoder, JpegDecoder}, Frame, QtError};

/// Whole-file fallback decoder for codecs outside the native set.
/// Given the path to the movie, not an open stream.
pub trait LegacyDecoder: Send + Sync {
    fn frame_count(&self, path: &Path) -> Result<usize, QtError>;
    fn open_frame(&self, path: &Path, frame_no: usize) -> Result<Frame, QtError>;
}

/// Options for [`crate::Movie::with_options`].
///
/// ```rs
/// use qtplanes::{Movie, OpenOptions};
/// use std::path::Path;
///
/// let options = OpenOptions::default()
///     .capacity(64 * 1024)
///     .search_resource_fork(false);
/// let movie = Movie::with_options(Path::new("MOVIE.MOV"), options)?;
/// ```
#[derive(Clone)]
pub struct OpenOptions {
    /// `BufReader` capacity. `None` uses the default (8KiB).
    pub(crate) capacity: Option<usize>,
    /// Decode every frame with the legacy decoder.
    pub(crate) force_legacy: bool,
    /// Look for a separated resource fork if the file has no movie header.
    pub(crate) search_resource_fork: bool,
    pub(crate) jpeg: Arc<dyn JpegDecoder>,
    pub(crate) legacy: Option<Arc<dyn LegacyDecoder>>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            capacity: None,
            force_legacy: false,
            search_resource_fork: true,
            jpeg: Arc::new(ImageJpegDecoder),
            legacy: None,
        }
    }
}

impl fmt::Debug for OpenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenOptions")
            .field("capacity", &self.capacity)
            .field("force_legacy", &self.force_legacy)
            .field("search_resource_fork", &self.search_resource_fork)
            .field("legacy", &self.legacy.is_some())
            .finish_non_exhaustive()
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Requires a legacy decoder to take effect.
    pub fn force_legacy(mut self, force: bool) -> Self {
        self.force_legacy = force;
        self
    }

    pub fn search_resource_fork(mut self, search: bool) -> Self {
        self.search_resource_fork = search;
        self
    }

    pub fn jpeg_decoder(mut self, decoder: impl JpegDecoder + 'static) -> Self {
        self.jpeg = Arc::new(decoder);
        self
    }

    pub fn legacy_decoder(mut self, decoder: impl LegacyDecoder + 'static) -> Self {
        self.legacy = Some(Arc::new(decoder));
        self
    }
}
