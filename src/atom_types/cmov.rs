//! Compressed movie atom (`cmov`).
//!
//! Location: `moov/cmov`
//!
//! Contains a data compression atom (`dcom`) naming the
//! compression algorithm, and a compressed movie data atom (`cmvd`)
//! holding the uncompressed size followed by the compressed `moov` atom.
//!
//! See: <https://developer.apple.com/library/archive/documentation/QuickTime/QTFF/QTFFChap2/qtff2.html>

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::{support::ByteStream, FourCC, QtError};

/// Compressed movie atom (`cmov`).
#[derive(Debug, Default, Clone)]
pub struct Cmov {
    /// Compression algorithm from `dcom`, e.g. `zlib`.
    pub(crate) compression: Option<FourCC>,
    /// Uncompressed size as declared in `cmvd`.
    pub(crate) uncompressed_size: u32,
    /// Compressed `moov` atom.
    pub(crate) data: Vec<u8>,
}

impl Cmov {
    /// Parses the `cmov` data load (excluding its own header).
    pub(crate) fn parse(data: &[u8]) -> Result<Self, QtError> {
        let mut stream = ByteStream::new(data);
        let mut cmov = Self::default();

        while stream.remaining() >= 8 {
            let start = stream.pos();
            let size = stream.u32()? as usize;
            let name = FourCC::from_slice(stream.take(4)?);
            let end = match size < 8 {
                true => stream.len(),
                false => (start + size).min(stream.len()),
            };

            match name {
                FourCC::Dcom => cmov.compression = Some(FourCC::from_slice(stream.take(4)?)),
                FourCC::Cmvd => {
                    cmov.uncompressed_size = stream.u32()?;
                    cmov.data = stream.take(end.saturating_sub(stream.pos()))?.to_vec();
                },
                _ => (),
            }

            if size < 8 {
                break
            }
            stream.seek(end)?;
        }

        Ok(cmov)
    }

    /// Inflates the compressed `moov` atom.
    /// Only `zlib` compression is supported.
    pub fn inflate(&self) -> Result<Vec<u8>, QtError> {
        match &self.compression {
            Some(c) if c.to_str() == "zlib" => (),
            Some(c) => return Err(QtError::CompressedHeader(format!("unknown compression '{c}'"))),
            None => return Err(QtError::CompressedHeader("missing 'dcom' atom".to_owned())),
        }
        if self.data.is_empty() {
            return Err(QtError::CompressedHeader("missing 'cmvd' atom".to_owned()))
        }

        // Declared size is only a hint, bounded by the compressed size
        let hint = (self.uncompressed_size as usize).min(self.data.len().saturating_mul(16));
        let mut moov = Vec::with_capacity(hint);
        ZlibDecoder::new(self.data.as_slice())
            .read_to_end(&mut moov)
            .map_err(|err| QtError::CompressedHeader(err.to_string()))?;

        Ok(moov)
    }
}
