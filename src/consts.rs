/// FourCC:s for known "container" atoms.
/// These are nested and contains more atoms,
/// within its specified, total size.
/// All other atoms are treated as leaves.
///
/// - `moov`: movie, offset tables, timing
/// - `trak`: moov.trak (multiple)
/// - `udta`: user data, followed by 4 extra bytes in older movies
/// - `tref`: moov.trak.tref
/// - `imap`: moov.trak.imap, track input map
/// - `mdia`: moov.trak.mdia
/// - `minf`: moov.trak.mdia.minf
/// - `stbl`: moov.trak.mdia.minf.stbl, contains sizes (stsz), offsets (stco)
/// - `edts`: moov.trak.edts
/// - `mdra`: reference movie data
/// - `rmra`: reference movie
/// - `imag`: image media
/// - `vnrp`: video node
/// - `dinf`: moov.trak.mdia.minf.dinf
pub const CONTAINER: [&'static str; 14] = [
    "moov",
    "trak",
    "udta",
    "tref",
    "imap",
    "mdia",
    "minf",
    "stbl",
    "edts",
    "mdra",
    "rmra",
    "imag",
    "vnrp",
    "dinf",
];

/// Max container nesting depth before parsing
/// is considered corrupt.
pub const MAX_DEPTH: usize = 32;

/// Number of bytes skipped after a `udta` container.
pub const UDTA_TRAILER: u64 = 4;

/// Length of the optional prefix in front of
/// `jpeg` and `mjpb` samples.
pub const JPEG_PREFIX: usize = 16;
