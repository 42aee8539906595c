//! Sample locations, combining chunk offsets (`stco`/`co64`),
//! sample sizes (`stsz`), and samples per chunk (`stsc`).
//!
//! Sample byte ranges are relative to the first chunk offset ("scale"),
//! which corresponds to the start of the pixel data region.

use std::ops::Range;

use log::{debug, warn};
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

use crate::{Co64, Stsc, Stsz};

/// Location of a single sample, relative to the pixel data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRange {
    pub sample_no: usize,
    /// Byte offset relative to the start of the pixel data region.
    pub offset: u64,
    /// Size in bytes. `0` means an empty sample.
    pub len: u64,
}

impl SampleRange {
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }
}

/// Sample index for a track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleIndex {
    /// Absolute offset for each sample.
    pub(crate) offsets: Vec<u64>,
    /// Absolute position of the pixel data region, i.e. `mdat` data load.
    pub(crate) pixel_offset: u64,
    /// Size of the pixel data region in bytes.
    pub(crate) pixel_bytes: u64,
}

impl SampleIndex {
    /// Builds sample offsets for a track.
    ///
    /// The sample count is taken from `stsz` if present,
    /// otherwise from the number of chunks.
    /// - If the number of chunks equals the sample count,
    ///   each chunk is one sample.
    /// - Otherwise chunks are expanded into samples via `stsc`
    ///   and the sample sizes.
    /// - If that does not account for every sample, only the
    ///   first chunk offset is trusted and the remaining offsets
    ///   are extrapolated from the sample sizes (best effort).
    ///
    /// `pixel_region` is the `mdat` data load. Without one,
    /// the pixel data region starts at the first chunk offset
    /// and extends to `stream_len`.
    pub fn new(
        chunk_offsets: &Co64,
        stsz: Option<&Stsz>,
        stsc: Option<&Stsc>,
        pixel_region: Option<Range<u64>>,
        stream_len: u64,
    ) -> Self {
        let offsets = sample_offsets(chunk_offsets, stsz, stsc);

        let (pixel_offset, pixel_bytes) = match pixel_region {
            Some(region) => (region.start, region.end.saturating_sub(region.start)),
            None => {
                let scale = offsets.first().copied().unwrap_or_default();
                (scale, stream_len.saturating_sub(scale))
            }
        };

        Self { offsets, pixel_offset, pixel_bytes }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// First chunk offset. Subtracted from all sample offsets.
    pub fn scale(&self) -> u64 {
        self.offsets.first().copied().unwrap_or_default()
    }

    pub fn pixel_offset(&self) -> u64 {
        self.pixel_offset
    }

    pub fn pixel_bytes(&self) -> u64 {
        self.pixel_bytes
    }

    /// Absolute sample offsets.
    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Returns byte range for sample `sample_no`.
    ///
    /// A sample ends where the next one starts, the last one at the
    /// end of the pixel data region. Bounds that end up reversed
    /// (out-of-order chunk tables) are swapped.
    pub fn get(&self, sample_no: usize) -> Option<SampleRange> {
        let scale = self.scale() as i128;
        let start = *self.offsets.get(sample_no)? as i128 - scale;
        let end = match self.offsets.get(sample_no + 1) {
            Some(next) => *next as i128 - scale,
            None => self.pixel_bytes as i128,
        };

        let (start, end) = match end < start {
            true => (end, start),
            false => (start, end),
        };

        let start = start.max(0) as u64;
        let end = end.max(0) as u64;

        Some(SampleRange {
            sample_no,
            offset: start,
            len: end.saturating_sub(start),
        })
    }

    /// Absolute position for sample range.
    pub fn absolute(&self, range: &SampleRange) -> u64 {
        self.pixel_offset + range.offset
    }

    pub fn iter(&self) -> impl Iterator<Item = SampleRange> + '_ {
        (0 .. self.len()).filter_map(|i| self.get(i))
    }
}

/// Resolves absolute per-sample offsets.
fn sample_offsets(
    chunk_offsets: &Co64,
    stsz: Option<&Stsz>,
    stsc: Option<&Stsc>,
) -> Vec<u64> {
    let chunks = chunk_offsets.offsets();
    let sample_count = match stsz {
        Some(s) if !s.is_empty() => s.len(),
        _ => chunks.len(),
    };

    if chunks.len() == sample_count {
        return chunks.to_vec()
    }

    if let (Some(stsz), Some(stsc)) = (stsz, stsc) {
        if let Some(offsets) = expand_chunks(chunks, stsc, stsz) {
            if offsets.len() == sample_count {
                debug!("Expanded {} chunks into {sample_count} samples", chunks.len());
                return offsets
            }
        }
    }

    warn!("{} chunk offsets for {sample_count} samples, extrapolating from first offset", chunks.len());

    let Some(first) = chunks.first() else {
        return Vec::new()
    };

    let mut offsets: Vec<u64> = Vec::with_capacity(sample_count);
    offsets.push(*first);
    for i in 1 .. sample_count {
        // Explicit size tables may be shorter than the sample count
        let Some(size) = stsz.and_then(|s| s.size(i - 1)) else {
            break
        };
        offsets.push(offsets[i - 1] + size as u64);
    }

    offsets
}

/// Converts chunk offsets to sample offsets by merging
/// `stsc`, `stco`, `stsz`. Returns `None` if a chunk
/// references samples without a known size.
fn expand_chunks(chunks: &[u64], stsc: &Stsc, stsz: &Stsz) -> Option<Vec<u64>> {
    // Number of samples in each chunk.
    // 1-based indexing, i.e. first chunk in stsc's
    // sample-to-chunk table will have index = 1.
    let per_chunk: Vec<usize> = (0 .. chunks.len())
        .map(|i| stsc.no_of_samples(i + 1).unwrap_or_default() as usize)
        .collect();

    // Index of the first sample in each chunk
    let first_sample: Vec<usize> = per_chunk.iter()
        .scan(0, |acc, n| {
            let first = *acc;
            *acc += n;
            Some(first)
        })
        .collect();

    let offsets = chunks
        .par_iter()
        .enumerate()
        .map(|(i, co)| {
            let mut delta = 0_u64;
            (first_sample[i] .. first_sample[i] + per_chunk[i])
                .map(|s| {
                    let offset = co + delta;
                    delta += stsz.size(s)? as u64;
                    Some(offset)
                })
                .collect::<Option<Vec<u64>>>()
        })
        .collect::<Option<Vec<Vec<u64>>>>()?
        .into_iter()
        .flatten()
        .collect();

    Some(offsets)
}
