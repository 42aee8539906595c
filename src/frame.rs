//! Decoded frames and post-processing of codec output.

use log::trace;

use crate::{
    codec::{CodecKind, DecodedPlane, PlaneLayout},
    QtError,
    TrackGeometry,
};

/// Final pixel data for a single frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub(crate) width: usize,
    pub(crate) height: usize,
    /// Bytes per pixel, i.e. number of 8-bit channels.
    pub(crate) bytes_per_pixel: usize,
    /// Channels stored as separate planes (`rpza`),
    /// otherwise interleaved.
    pub(crate) planar: bool,
    pub(crate) pixels: Vec<u8>,
}

impl Frame {
    pub fn new(
        width: usize,
        height: usize,
        bytes_per_pixel: usize,
        planar: bool,
        pixels: Vec<u8>
    ) -> Self {
        Self { width, height, bytes_per_pixel, planar, pixels }
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

    pub fn is_planar(&self) -> bool {
        self.planar
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// Turns codec output into a frame:
/// 1. transpose when the geometry swaps axes
/// 2. strip row padding (`raw `/`rle ` only)
/// 3. invert 8 and 40-bit samples (`raw `/`rle ` only)
/// 4. drop the leading alpha byte for 32-bit samples
///
/// Steps 1 and 2 share one addressing pass.
pub fn post_process(
    plane: &DecodedPlane,
    codec: &CodecKind,
    geometry: &TrackGeometry,
    bits_per_pixel: i16,
) -> Result<Frame, QtError> {
    let (w, h) = (plane.width, plane.height);
    let bpp = plane.bytes_per_pixel.max(1);
    let transposed = geometry.transposed();
    let (out_w, out_h) = match transposed {
        true => (h, w),
        false => (w, h),
    };

    if plane.layout == PlaneLayout::Planar {
        let frame_len = w * h;
        let expected = frame_len * bpp;
        if plane.bytes.len() < expected {
            return Err(QtError::ShortPlane{got: plane.bytes.len(), expected})
        }
        let mut pixels = Vec::with_capacity(expected);
        for channel in plane.bytes[.. expected].chunks_exact(frame_len.max(1)) {
            for oy in 0 .. out_h {
                for ox in 0 .. out_w {
                    let (sx, sy) = if transposed {(oy, ox)} else {(ox, oy)};
                    pixels.push(channel[sy * w + sx]);
                }
            }
        }
        return Ok(Frame::new(out_w, out_h, bpp, true, pixels))
    }

    let row_len = w * bpp;
    let expected = row_len * h;
    let len = plane.bytes.len();
    if len < expected {
        return Err(QtError::ShortPlane{got: len, expected})
    }

    let mut pad = match codec.is_exact() || len == expected {
        true => 0,
        false => (4 - w % 4) % 4,
    };
    // Padding that does not fit the data is ignored
    if h > 0 && (h - 1) * (row_len + pad) + row_len > len {
        pad = 0;
    }
    let stride = row_len + pad;

    let invert = matches!(bits_per_pixel, 8 | 40) && !codec.is_exact();
    let strip_alpha = bits_per_pixel == 32 && bpp == 4;
    let (skip, out_bpp) = match strip_alpha {
        true => (1, 3),
        false => (0, bpp),
    };

    trace!("Post-processing {w}x{h}x{bpp}: pad {pad}, transposed {transposed}, invert {invert}, strip alpha {strip_alpha}");

    let mut pixels = Vec::with_capacity(out_w * out_h * out_bpp);
    for oy in 0 .. out_h {
        for ox in 0 .. out_w {
            let (sx, sy) = if transposed {(oy, ox)} else {(ox, oy)};
            let src = sy * stride + sx * bpp;
            let pixel = &plane.bytes[src + skip .. src + bpp];
            match invert {
                true => pixels.extend(pixel.iter().map(|b| 255 - b)),
                false => pixels.extend_from_slice(pixel),
            }
        }
    }

    Ok(Frame::new(out_w, out_h, out_bpp, false, pixels))
}
