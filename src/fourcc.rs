//! QuickTime atom and codec FourCC.
//! See <https://developer.apple.com/library/archive/documentation/QuickTime/QTFF/QTFFChap2/qtff2.html>.
//!
//! Codec identifiers share the same four byte space as atom names,
//! so both are listed here. Note the trailing space in `raw ` and `rle `.

use std::fmt;

/// QuickTime atom or codec Four CC.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FourCC {
    /// Compressed movie atom
    Cmov,
    /// Compressed movie data
    Cmvd,
    /// Chunk offset, 64-bit values
    Co64,
    /// Data compression atom (inside `cmov`)
    Dcom,
    /// Data Information Atoms
    Dinf,
    Edts,
    Imag,
    Imap,
    /// Media data (pixel data region)
    Mdat,
    Mdhd,
    Mdia,
    Mdra,
    Minf,
    /// Movie Atom
    Moov,
    Rmra,
    Stbl,
    /// Chunk offset, 32-bit values
    Stco,
    Stsc,
    Stsd,
    Stsz,
    Stts,
    Tkhd,
    /// Track description
    Trak,
    Tref,
    /// User data
    Udta,
    /// Video media information header
    Vmhd,
    Vnrp,

    // Codecs
    /// Uncompressed (`raw `)
    Raw,
    /// Apple Animation (`rle `)
    Rle,
    /// Apple Video, a.k.a. road pizza
    Rpza,
    /// Photo JPEG, single field
    Jpeg,
    /// Motion JPEG format B, one or two fields
    Mjpb,

    Custom(String)
}

impl FourCC {
    pub fn from_slice(fourcc: &[u8]) -> Self {
        match fourcc {
            // Atoms
            b"cmov" => Self::Cmov,
            b"cmvd" => Self::Cmvd,
            b"co64" => Self::Co64,
            b"dcom" => Self::Dcom,
            b"dinf" => Self::Dinf,
            b"edts" => Self::Edts,
            b"imag" => Self::Imag,
            b"imap" => Self::Imap,
            b"mdat" => Self::Mdat,
            b"mdhd" => Self::Mdhd,
            b"mdia" => Self::Mdia,
            b"mdra" => Self::Mdra,
            b"minf" => Self::Minf,
            b"moov" => Self::Moov,
            b"rmra" => Self::Rmra,
            b"stbl" => Self::Stbl,
            b"stco" => Self::Stco,
            b"stsc" => Self::Stsc,
            b"stsd" => Self::Stsd,
            b"stsz" => Self::Stsz,
            b"stts" => Self::Stts,
            b"tkhd" => Self::Tkhd,
            b"trak" => Self::Trak,
            b"tref" => Self::Tref,
            b"udta" => Self::Udta,
            b"vmhd" => Self::Vmhd,
            b"vnrp" => Self::Vnrp,

            // Codecs
            b"raw " => Self::Raw,
            b"rle " => Self::Rle,
            b"rpza" => Self::Rpza,
            b"jpeg" => Self::Jpeg,
            b"mjpb" => Self::Mjpb,

            _ => Self::Custom(String::from_utf8_lossy(fourcc).to_string()),
        }
    }

    pub fn from_u32(value: u32) -> Self {
        Self::from_slice(&value.to_be_bytes())
    }

    pub fn from_str(fourcc: &str) -> Self {
        Self::from_slice(fourcc.as_bytes())
    }

    pub fn to_str(&self) -> &str {
        match self {
            Self::Cmov => "cmov",
            Self::Cmvd => "cmvd",
            Self::Co64 => "co64",
            Self::Dcom => "dcom",
            Self::Dinf => "dinf",
            Self::Edts => "edts",
            Self::Imag => "imag",
            Self::Imap => "imap",
            Self::Mdat => "mdat",
            Self::Mdhd => "mdhd",
            Self::Mdia => "mdia",
            Self::Mdra => "mdra",
            Self::Minf => "minf",
            Self::Moov => "moov",
            Self::Rmra => "rmra",
            Self::Stbl => "stbl",
            Self::Stco => "stco",
            Self::Stsc => "stsc",
            Self::Stsd => "stsd",
            Self::Stsz => "stsz",
            Self::Stts => "stts",
            Self::Tkhd => "tkhd",
            Self::Trak => "trak",
            Self::Tref => "tref",
            Self::Udta => "udta",
            Self::Vmhd => "vmhd",
            Self::Vnrp => "vnrp",
            Self::Raw => "raw ",
            Self::Rle => "rle ",
            Self::Rpza => "rpza",
            Self::Jpeg => "jpeg",
            Self::Mjpb => "mjpb",
            Self::Custom(s) => s.as_str()
        }
    }

    /// Returns `true` if FourCC is in the container whitelist,
    /// see [`crate::CONTAINER`].
    pub fn is_container(&self) -> bool {
        crate::CONTAINER.contains(&self.to_str())
    }
}

impl Default for FourCC {
    fn default() -> Self {
        Self::Custom("None".to_owned())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}
