use binrw::{helpers::until_eof, BinRead};

use crate::support::counted_string;

/// Video sample description fields,
/// following the 8 byte size and codec FourCC of an `stsd` entry.
///
/// See: <https://developer.apple.com/documentation/quicktime-file-format/video_sample_description>
#[derive(Debug, Clone, BinRead)]
#[br(big)]
pub struct Video {
    _reserved: [u8; 6],
    _data_reference_index: u16,
    /// A 16-bit integer that holds the sample description version.
    _version: u16,
    /// A 16-bit integer.
    _revision_level: u16,
    /// A 32-bit integer that specifies the developer of the compressor that generated the compressed data.
    vendor: u32,
    _temporal_quality: u32,
    _spatial_quality: u32,
    /// A 16-bit integer that specifies the width of the source image in pixels.
    width: u16,
    /// A 16-bit integer that specifies the height of the source image in pixels.
    height: u16,
    _horizontal_resolution: u32,
    _vertical_resolution: u32,
    _data_size: u32,
    /// A 16-bit integer that indicates how many frames of compressed data are stored in each sample.
    _frame_count: u16,
    /// A 32-byte Pascal string containing the name of the compressor that created the image.
    #[br(map = |data: [u8; 32]| counted_string(&data))]
    compressor_name: String,
    /// A 16-bit integer that indicates the pixel depth of the compressed image.
    /// Sample entry offset 82.
    depth: i16,
    /// A 16-bit integer that identifies which color table to use.
    _color_table_id: i16,
    /// Video extension atoms as bytes, starting at sample entry offset 86.
    #[br(parse_with = until_eof)]
    extensions: Vec<u8>
}

impl Video {
    pub fn vendor(&self) -> u32 {
        self.vendor
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn compressor_name(&self) -> &str {
        self.compressor_name.as_str()
    }

    pub fn depth(&self) -> i16 {
        self.depth
    }

    /// Number of fields per frame: first byte of the first
    /// extension atom's data load (usually `fiel`),
    /// i.e. sample entry offset 94. `2` means interlaced.
    pub fn fields(&self) -> Option<u8> {
        self.extensions.get(8).copied()
    }

    pub fn extensions(&self) -> &[u8] {
        self.extensions.as_slice()
    }
}
