//! JPEG service and the Photo JPEG (`jpeg`) codec.

use image::ImageFormat;
use log::trace;

use crate::{consts::JPEG_PREFIX, QtError};

use super::{CodecParams, DecodedPlane};

/// Decodes a complete JFIF stream into an interleaved plane.
///
/// Implement this to plug in a different JPEG decoder
/// (see [`crate::OpenOptions::jpeg_decoder`]).
pub trait JpegDecoder: Send + Sync {
    /// `grayscale` requests a single channel plane,
    /// otherwise three channels (RGB).
    fn decode(&self, jfif: &[u8], grayscale: bool) -> Result<DecodedPlane, QtError>;
}

/// Default JPEG service, backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageJpegDecoder;

impl JpegDecoder for ImageJpegDecoder {
    fn decode(&self, jfif: &[u8], grayscale: bool) -> Result<DecodedPlane, QtError> {
        let img = image::load_from_memory_with_format(jfif, ImageFormat::Jpeg)
            .map_err(|err| QtError::Jpeg(err.to_string()))?;

        let (width, height) = (img.width() as usize, img.height() as usize);
        trace!("Decoded JPEG {width}x{height}, grayscale={grayscale}");

        let plane = match grayscale {
            true => DecodedPlane::interleaved(width, height, 1, img.to_luma8().into_raw()),
            false => DecodedPlane::interleaved(width, height, 3, img.to_rgb8().into_raw()),
        };

        Ok(plane)
    }
}

/// Hands the sample to the JPEG service, skipping the
/// 16 byte prefix some samples carry before the SOI marker.
pub(crate) fn decode(
    sample: &[u8],
    params: &CodecParams,
    jpeg: &dyn JpegDecoder,
) -> Result<DecodedPlane, QtError> {
    let jfif = match sample.starts_with(&[0xFF, 0xD8]) {
        true => sample,
        false => sample.get(JPEG_PREFIX ..).unwrap_or_default(),
    };
    jpeg.decode(jfif, params.jpeg_components() == 1)
}
