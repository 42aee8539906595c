//! Apple Animation (`rle `).
//!
//! Each sample updates a range of rows of the previous frame.
//! Pixels the sample does not touch keep the previous frame's value.

use log::trace;

use crate::{support::ByteStream, QtError};

use super::{CodecParams, DecodedPlane};

/// Partial update flag in the header word.
const PARTIAL: u16 = 0x0008;

/// Effective bytes per pixel for the run-length stream.
/// 8 and 16-bit samples widen to 3.
pub(crate) fn effective_bpp(bits_per_pixel: i16) -> usize {
    let bytes = bits_per_pixel.max(0) as usize / 8;
    match bytes {
        1 | 2 => 3,
        b if b >= 5 => (b % 4).max(1),
        0 => 1,
        b => b,
    }
}

pub(crate) fn decode(
    sample: &[u8],
    params: &CodecParams,
    previous: Option<&DecodedPlane>,
) -> Result<DecodedPlane, QtError> {
    let ebpp = effective_bpp(params.bits_per_pixel);
    let (width, height) = (params.width, params.height);
    let row_len = width * ebpp;

    // Header only, or less: frame unchanged
    if sample.len() < 8 {
        return previous
            .cloned()
            .ok_or(QtError::MissingPreviousFrame(params.sample_no))
    }

    let mut stream = ByteStream::new(sample);
    stream.skip(4)?; // chunk size
    let header = stream.u16()?;

    let (start_row, row_count) = match header {
        0 => (0, height),
        h if h & PARTIAL != 0 => {
            let start = stream.u16()? as usize;
            stream.skip(2)?;
            let count = stream.u16()? as usize;
            stream.skip(2)?;
            (start, count)
        },
        h => return Err(QtError::UnsupportedHeader(h)),
    };

    let end_row = (start_row + row_count).min(height);
    let start_row = start_row.min(end_row);

    trace!("rle: header 0x{header:04x}, rows {start_row}..{end_row} of {height}, ebpp {ebpp}");

    let mut out = vec![0_u8; row_len * height];
    match previous {
        Some(prev) => {
            let n = prev.bytes.len().min(out.len());
            out[.. n].copy_from_slice(&prev.bytes[.. n]);
        },
        None if start_row > 0 || end_row < height => {
            return Err(QtError::MissingPreviousFrame(params.sample_no))
        },
        None => (),
    }

    // A stream ending before the last row is an EOF error
    for row in start_row .. end_row {
        let line = &mut out[row * row_len .. (row + 1) * row_len];
        decode_row(&mut stream, line, ebpp)?;
    }

    Ok(DecodedPlane::interleaved(width, height, ebpp, out))
}

/// Decodes a single row in place. Pixels not written keep
/// the value already in `line`, i.e. the previous frame's.
fn decode_row(stream: &mut ByteStream, line: &mut [u8], ebpp: usize) -> Result<(), QtError> {
    let mut col = (stream.u8()? as usize).saturating_sub(1);

    loop {
        match stream.i8()? {
            0 => {
                let skip = stream.u8()? as usize;
                col += skip.saturating_sub(1);
            },
            -1 => break,
            op if op < -1 => {
                let pixel = stream.take(ebpp)?;
                for _ in 0 .. op.unsigned_abs() {
                    put(line, col, pixel);
                    col += 1;
                }
            },
            op => {
                let run = stream.take(op as usize * ebpp)?;
                for pixel in run.chunks_exact(ebpp) {
                    put(line, col, pixel);
                    col += 1;
                }
            },
        }
    }

    Ok(())
}

/// Writes one pixel at column `col`. Writes past the row end are dropped.
fn put(line: &mut [u8], col: usize, pixel: &[u8]) {
    let start = col * pixel.len();
    if let Some(dst) = line.get_mut(start .. start + pixel.len()) {
        dst.copy_from_slice(pixel)
    }
}
