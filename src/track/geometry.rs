//! Display geometry for a video track, derived from `tkhd`.

use crate::Tkhd;

/// Display matrix and declared frame size.
/// `transposed` is derived once, on creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackGeometry {
    pub(crate) matrix: [i32; 9],
    pub(crate) declared_width: usize,
    pub(crate) declared_height: usize,
    pub(crate) transposed: bool,
}

impl TrackGeometry {
    pub fn new(matrix: [i32; 9], width: i32, height: i32) -> Self {
        Self {
            matrix,
            declared_width: width.max(0) as usize,
            declared_height: height.max(0) as usize,
            transposed: matrix[0] == 0 && matrix[3] != 0,
        }
    }

    pub fn matrix(&self) -> &[i32; 9] {
        &self.matrix
    }

    /// Width as declared in the track header,
    /// i.e. the width of the decoded plane.
    pub fn declared_width(&self) -> usize {
        self.declared_width
    }

    /// Height as declared in the track header,
    /// i.e. the height of the decoded plane.
    pub fn declared_height(&self) -> usize {
        self.declared_height
    }

    /// `true` if the matrix swaps axes.
    pub fn transposed(&self) -> bool {
        self.transposed
    }

    /// Output `(WIDTH, HEIGHT)` after post-processing,
    /// swapped relative to the declared size when transposed.
    pub fn output_size(&self) -> (usize, usize) {
        match self.transposed {
            true => (self.declared_height, self.declared_width),
            false => (self.declared_width, self.declared_height),
        }
    }
}

impl From<&Tkhd> for TrackGeometry {
    fn from(tkhd: &Tkhd) -> Self {
        Self::new(tkhd.matrix, tkhd.width, tkhd.height)
    }
}
