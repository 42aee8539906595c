//! Track header atom (`tkhd`).
//!
//! Location: `moov/trak[multiple]/tkhd`
//!
//! See: <https://developer.apple.com/documentation/quicktime-file-format/track_header_atom>

use binrw::BinRead;

/// Track header atom (`tkhd`), reduced to
/// the display matrix and declared frame size.
///
/// Legacy movies are read 38 bytes into the data load,
/// two bytes ahead of the nominal matrix position.
/// This places the integer part of the 16.16
/// fixed-point width and height in the low half
/// of the `width` and `height` values.
///
/// Location: `moov/trak[multiple]/tkhd`
///
/// See: <https://developer.apple.com/documentation/quicktime-file-format/track_header_atom>
#[derive(Debug, Clone, BinRead)]
#[br(big)]
pub struct Tkhd {
    /// Matrix coefficients in row-major order.
    #[br(pad_before = 38)]
    pub(crate) matrix: [i32; 9],
    pub(crate) width: i32,
    pub(crate) height: i32,
}

impl Tkhd {
    pub fn matrix(&self) -> &[i32; 9] {
        &self.matrix
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// `true` if the matrix swaps axes rather than
    /// merely scaling, i.e. coefficient (0,0) is zero
    /// and coefficient (1,0) is not.
    pub fn transposed(&self) -> bool {
        self.matrix[0] == 0 && self.matrix[3] != 0
    }
}
