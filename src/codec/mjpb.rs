//! Motion JPEG format B (`mjpb`).
//!
//! Each field is a marker-less JPEG: a header with offsets to the
//! table segments, followed by entropy coded data without `0xFF`
//! byte stuffing. Fields are rebuilt into baseline JFIF streams,
//! decoded separately, then interleaved line by line.

use std::io::Cursor;

use binrw::{BinRead, BinReaderExt};
use log::{debug, trace};

use crate::{consts::JPEG_PREFIX, QtError};

use super::{
    tables::*,
    CodecParams,
    DecodedPlane,
    JpegDecoder,
};

const TAG: &[u8; 4] = b"mjpg";

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// APP0 JFIF segment: version 1.1, no units, 72x72 density, no thumbnail.
const APP0: [u8; 18] = [
    0xFF, 0xE0, 0x00, 0x10,
    b'J', b'F', b'I', b'F', 0x00,
    0x01, 0x01,
    0x00,
    0x00, 0x48, 0x00, 0x48,
    0x00, 0x00,
];

/// Field header. All offsets are relative to the start of the field.
#[derive(Debug, BinRead)]
#[br(big)]
struct FieldHeader {
    _reserved: u32,
    #[br(magic = b"mjpg")]
    _field_size: u32,
    _padded_size: u32,
    /// `0` if this is the last field.
    next_field: u32,
    quant: u32,
    _huffman: u32,
    sof: u32,
    _sos: u32,
    /// Start of entropy coded data.
    sod: u32,
}

impl FieldHeader {
    fn read(sample: &[u8], field: usize) -> Result<Self, QtError> {
        let data = sample.get(field ..)
            .ok_or_else(|| QtError::Corrupt(format!("mjpb field offset {field} outside sample")))?;
        Ok(Cursor::new(data).read_be::<Self>()?)
    }
}

/// A single field located in the sample.
#[derive(Debug)]
struct Field<'a> {
    header: FieldHeader,
    /// Field start within the sample.
    start: usize,
    /// Entropy coded payload.
    payload: &'a [u8],
}

impl<'a> Field<'a> {
    fn new(sample: &'a [u8], start: usize) -> Result<Self, QtError> {
        let header = FieldHeader::read(sample, start)?;
        let data_start = start + header.sod as usize;
        let data_end = match header.next_field as usize {
            0 => sample.len(),
            n => (start + n).min(sample.len()),
        };
        let payload = sample.get(data_start .. data_end.max(data_start))
            .ok_or_else(|| QtError::Corrupt(format!("mjpb payload offset {data_start} outside sample")))?;
        Ok(Self { header, start, payload })
    }

    /// Marker-less segment body at `offset`, i.e. the length word and its data.
    fn segment<'s>(&self, sample: &'s [u8], offset: u32) -> Option<&'s [u8]> {
        if offset == 0 {
            return None
        }
        let pos = self.start + offset as usize;
        let len = u16::from_be_bytes([*sample.get(pos)?, *sample.get(pos + 1)?]) as usize;
        match len >= 2 {
            true => sample.get(pos .. pos + len),
            false => None,
        }
    }

    /// Embedded 8-bit quantization tables, keyed by table id.
    fn quant_tables(&self, sample: &[u8]) -> [Option<[u8; 64]>; 2] {
        let mut tables = [None, None];
        let Some(segment) = self.segment(sample, self.header.quant) else {
            return tables
        };
        for table in segment[2 ..].chunks_exact(65) {
            let (pq, tq) = (table[0] >> 4, (table[0] & 0x0F) as usize);
            if pq != 0 || tq > 1 {
                trace!("mjpb: skipping quantization table {:02x}", table[0]);
                continue
            }
            let mut values = [0_u8; 64];
            values.copy_from_slice(&table[1 ..]);
            tables[tq] = Some(values);
        }
        tables
    }

    /// Luma sampling factors from the embedded frame header.
    fn luma_sampling(&self, sample: &[u8], components: usize) -> Option<u8> {
        let sof = self.segment(sample, self.header.sof)?;
        // length, precision, height, width, component count, then 3 bytes per component
        let count = *sof.get(7)? as usize;
        match count == components {
            true => sof.get(9).copied().filter(|s| *s != 0),
            false => None,
        }
    }
}

/// Inserts `0x00` after every `0xFF`.
pub(crate) fn stuff_ff(data: &[u8]) -> Vec<u8> {
    let extra = data.iter().filter(|b| **b == 0xFF).count();
    let mut out = Vec::with_capacity(data.len() + extra);
    for byte in data {
        out.push(*byte);
        if *byte == 0xFF {
            out.push(0x00);
        }
    }
    out
}

/// Offset of the first field: `0`, or past the 16 byte prefix.
fn first_field(sample: &[u8]) -> Result<usize, QtError> {
    [0, JPEG_PREFIX].into_iter()
        .find(|base| sample.get(base + 4 .. base + 8) == Some(TAG.as_slice()))
        .ok_or_else(|| QtError::Corrupt("missing 'mjpg' field header".to_owned()))
}

pub(crate) fn decode(
    sample: &[u8],
    params: &CodecParams,
    jpeg: &dyn JpegDecoder,
) -> Result<DecodedPlane, QtError> {
    let base = first_field(sample)?;
    let field1 = Field::new(sample, base)?;

    let field2 = match (params.interlaced, field1.header.next_field) {
        (true, n) if n > 0 => Some(Field::new(sample, base + n as usize)?),
        _ => None,
    };

    let field_height = match field2.is_some() {
        true => params.height.div_ceil(2),
        false => params.height,
    };

    debug!("mjpb: {} field(s), {}x{field_height} per field",
        if field2.is_some() {2} else {1},
        params.width
    );

    let grayscale = params.jpeg_components() == 1;
    let first = jpeg.decode(&build_jfif(sample, &field1, params, field_height), grayscale)?;

    let Some(field2) = field2 else {
        return Ok(first)
    };

    let second = jpeg.decode(&build_jfif(sample, &field2, params, field_height), grayscale)?;

    match params.transposed {
        true => Ok(merge_fields(&second, &first, params.height)),
        false => Ok(merge_fields(&first, &second, params.height)),
    }
}

/// Interleaves two fields. `even` supplies lines 0, 2, 4...
/// The result is cropped to `height` lines.
pub(crate) fn merge_fields(even: &DecodedPlane, odd: &DecodedPlane, height: usize) -> DecodedPlane {
    let bpp = even.bytes_per_pixel;
    let width = even.width;
    let row_len = width * bpp;
    let mut out = vec![0_u8; row_len * height];
    if row_len == 0 {
        return DecodedPlane::interleaved(width, height, bpp, out)
    }

    for (row, dst) in out.chunks_exact_mut(row_len).enumerate() {
        let field = if row % 2 == 0 {even} else {odd};
        let line = row / 2;
        if let Some(src) = field.bytes.get(line * row_len .. (line + 1) * row_len) {
            dst.copy_from_slice(src);
        }
    }

    DecodedPlane::interleaved(width, height, bpp, out)
}

/// Rebuilds a baseline JFIF stream for one field.
fn build_jfif(
    sample: &[u8],
    field: &Field,
    params: &CodecParams,
    field_height: usize,
) -> Vec<u8> {
    let components = params.jpeg_components();
    let payload = stuff_ff(field.payload);

    let mut out = Vec::with_capacity(payload.len() + 1024);
    out.extend_from_slice(&SOI);
    out.extend_from_slice(&APP0);

    // DQT, one segment per table
    let embedded = field.quant_tables(sample);
    let defaults = [zigzag(&LUMA_QUANT), zigzag(&CHROMA_QUANT)];
    for (id, (table, default)) in embedded.iter().zip(defaults.iter()).enumerate() {
        out.extend_from_slice(&[0xFF, 0xDB, 0x00, 67, id as u8]);
        out.extend_from_slice(table.as_ref().unwrap_or(default));
    }

    // SOF0
    let luma = field.luma_sampling(sample, components).unwrap_or(match components {
        1 => 0x11,
        _ => 0x21,
    });
    out.extend_from_slice(&[0xFF, 0xC0]);
    out.extend_from_slice(&(8 + 3 * components as u16).to_be_bytes());
    out.push(8);
    out.extend_from_slice(&(field_height as u16).to_be_bytes());
    out.extend_from_slice(&(params.width as u16).to_be_bytes());
    out.push(components as u8);
    out.extend_from_slice(&[1, luma, 0]);
    if components == 3 {
        out.extend_from_slice(&[2, 0x11, 1, 3, 0x11, 1]);
    }

    // DHT
    let tables: [(u8, &[u8], &[u8]); 4] = [
        (0x00, &LUMA_DC_BITS, &LUMA_DC_VALUES),
        (0x10, &LUMA_AC_BITS, &LUMA_AC_VALUES),
        (0x01, &CHROMA_DC_BITS, &CHROMA_DC_VALUES),
        (0x11, &CHROMA_AC_BITS, &CHROMA_AC_VALUES),
    ];
    let dht_len = 2 + tables.iter().map(|(_, b, v)| 1 + b.len() + v.len()).sum::<usize>();
    out.extend_from_slice(&[0xFF, 0xC4]);
    out.extend_from_slice(&(dht_len as u16).to_be_bytes());
    for (class_id, bits, values) in tables {
        out.push(class_id);
        out.extend_from_slice(bits);
        out.extend_from_slice(values);
    }

    // SOS
    out.extend_from_slice(&[0xFF, 0xDA]);
    out.extend_from_slice(&(6 + 2 * components as u16).to_be_bytes());
    out.push(components as u8);
    out.extend_from_slice(&[1, 0x00]);
    if components == 3 {
        out.extend_from_slice(&[2, 0x11, 3, 0x11]);
    }
    out.extend_from_slice(&[0, 63, 0]);

    out.extend_from_slice(&payload);
    out.extend_from_slice(&EOI);

    out
}

/// Natural order table to DQT (zig-zag) order.
fn zigzag(table: &[u8; 64]) -> [u8; 64] {
    let mut out = [0_u8; 64];
    for (i, natural) in ZIGZAG.iter().enumerate() {
        out[i] = table[*natural];
    }
    out
}
