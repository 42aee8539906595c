//! Sample size atom (`stsz`).
//!
//! Location: `moov/trak[multiple]/mdia/minf/stbl/stsz`
//!
//! Note that `stsz` lists sample size not chunk size.
//! `stco` or `co64` list chunk offsets, not offsets to individual samples.
//!
//! See: <https://developer.apple.com/documentation/quicktime-file-format/sample_size_atom>

use binrw::BinRead;

/// Sample size atom (`stsz`).
///
/// Location: `moov/trak[multiple]/mdia/minf/stbl/stsz`
///
/// See: <https://developer.apple.com/documentation/quicktime-file-format/sample_size_atom>
#[derive(Debug, Default, Clone, BinRead)]
#[br(big)]
pub struct Stsz {
    _version: u8,
    _flags: [u8; 3],
    /// Sample size.
    /// If 0 `no_of_entries` contains
    /// the number of u32 values that should be read,
    /// else all sample sizes should have this value.
    pub(crate) sample_size: u32,
    /// Authoritative sample count for the track.
    pub(crate) no_of_entries: u32,
    /// Explicit sizes. Empty for uniformly sized samples.
    #[br(count = no_of_entries)]
    #[br(if(sample_size == 0))]
    pub(crate) sizes: Vec<u32>
}

impl Stsz {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.no_of_entries as usize
    }

    pub fn is_empty(&self) -> bool {
        self.no_of_entries == 0
    }

    /// Uniform sample size, or `None` if sizes
    /// are listed per sample.
    pub fn uniform(&self) -> Option<u32> {
        match self.sample_size {
            0 => None,
            n => Some(n),
        }
    }

    /// Returns explicit list of sample sizes in bytes.
    /// Empty if all samples share a uniform size.
    pub fn sizes(&self) -> &[u32] {
        &self.sizes
    }

    /// Returns size for sample at index `sample_no`.
    pub fn size(&self, sample_no: usize) -> Option<u32> {
        match self.uniform() {
            Some(n) if sample_no < self.len() => Some(n),
            Some(_) => None,
            None => self.sizes.get(sample_no).copied(),
        }
    }
}

#[cfg(test)]
impl Stsz {
    pub(crate) fn explicit(sizes: &[u32]) -> Self {
        Self {
            no_of_entries: sizes.len() as u32,
            sizes: sizes.to_vec(),
            ..Default::default()
        }
    }

    pub(crate) fn uniform_size(size: u32, count: u32) -> Self {
        Self {
            sample_size: size,
            no_of_entries: count,
            ..Default::default()
        }
    }
}
