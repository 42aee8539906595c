//! Separated resource forks.
//!
//! Movies copied from classic Mac OS file systems may keep
//! the movie header (`moov`) in a resource fork next to a data fork
//! that only holds pixel data. The resource fork may live in:
//! - `NAME.qtr`
//! - `._NAME` (AppleDouble, e.g. on non-HFS volumes)
//! - `NAME/..namedfork/rsrc` (macOS named fork)

use std::path::{Path, PathBuf};

use log::debug;

use crate::QtError;

/// Candidate resource fork paths for the data fork at `path`, in search order.
pub fn resource_fork_candidates(path: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![path.with_extension("qtr")];

    if let Some(name) = path.file_name() {
        let mut apple_double = std::ffi::OsString::from("._");
        apple_double.push(name);
        candidates.push(path.with_file_name(apple_double));
    }

    candidates.push(path.join("..namedfork").join("rsrc"));

    candidates
}

/// Returns the first existing resource fork for the data fork at `path`.
pub fn find_resource_fork(path: &Path) -> Result<PathBuf, QtError> {
    resource_fork_candidates(path)
        .into_iter()
        .find(|p| {
            debug!("Looking for resource fork at {}", p.display());
            p.is_file()
        })
        .ok_or_else(|| QtError::ResourceForkNotFound(path.to_owned()))
}

/// Position of the `moov` atom in resource fork data,
/// i.e. of its size field, 4 bytes before the `moov` FourCC.
pub fn moov_offset(data: &[u8]) -> Option<usize> {
    data.windows(4)
        .position(|w| w == b"moov")
        .and_then(|pos| pos.checked_sub(4))
}
