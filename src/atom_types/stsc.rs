//! Sample to chunk atom (`stsc`)
//!
//! Location: `moov/trak[multiple]/mdia/minf/stbl/stsc`
//!
//! See:
//! - Sample to chunk atom: <https://developer.apple.com/documentation/quicktime-file-format/sample-to-chunk_atom>
//! - Sample to chunk table: <https://developer.apple.com/documentation/quicktime-file-format/sample-to-chunk_atom/sample-to-chunk_table>
//! - <https://github.com/essential61/mp4analyser/wiki/Understanding-The-Sample-Tables:-An-Example>

use binrw::BinRead;

/// Sample to chunk atom (`stsc`)
#[derive(Debug, Default, Clone, BinRead)]
#[br(big)]
pub struct Stsc {
    _version: u8,
    _flags: [u8; 3],
    pub(crate) no_of_entries: u32,
    #[br(count = no_of_entries)]
    pub(crate) sample_to_chunk_table: Vec<SampleToChunk>,
}

impl Stsc {
    pub fn no_of_entries(&self) -> u32 {
        self.no_of_entries
    }

    pub fn table(&self) -> &[SampleToChunk] {
        &self.sample_to_chunk_table
    }

    /// Returns number of samples for specified chunk.
    ///
    /// > Important: The `first_chunk` field in an `stsc`
    /// > atom starts on 1,
    /// > so `chunk_index` is also a 1-based index.
    pub fn no_of_samples(&self, chunk_index: usize) -> Option<u32> {
        // Last entry with first_chunk <= chunk_index applies,
        // the final entry stretches to the end of the track
        self.sample_to_chunk_table.iter()
            .take_while(|s2c| s2c.first_chunk as usize <= chunk_index)
            .last()
            .map(|s2c| s2c.samples_per_chunk)
    }

    /// Number of trailing samples described by the second
    /// sample description (description ID `2`).
    ///
    /// Each entry with ID `2` adds `samples_per_chunk` times
    /// the chunk delta to the previous entry
    /// (the delta for the first entry counts from chunk 0).
    pub fn secondary_sample_count(&self) -> u64 {
        let mut prev_chunk = 0_u64;
        let mut count = 0_u64;
        for s2c in self.sample_to_chunk_table.iter() {
            let chunk = s2c.first_chunk as u64;
            if s2c.sample_description_id == 2 {
                count += s2c.samples_per_chunk as u64 * chunk.saturating_sub(prev_chunk);
            }
            prev_chunk = chunk;
        }
        count
    }
}

#[cfg(test)]
impl Stsc {
    pub(crate) fn from_entries(entries: &[(u32, u32, u32)]) -> Self {
        Self {
            no_of_entries: entries.len() as u32,
            sample_to_chunk_table: entries.iter()
                .map(|(first_chunk, samples_per_chunk, sample_description_id)| SampleToChunk {
                    first_chunk: *first_chunk,
                    samples_per_chunk: *samples_per_chunk,
                    sample_description_id: *sample_description_id,
                })
                .collect(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BinRead)]
#[br(big)]
pub struct SampleToChunk {
    /// 1-based index of first chunk
    /// that contains the number of
    /// samples specified in `samples_per_chunk`.
    /// The following chunks will all contain the
    /// same number of samples until the next
    /// sample to chunk entry.
    pub(crate) first_chunk: u32,
    /// Number of samples for chunk number
    /// specified by `first_chunk` and on,
    /// until the next sample to chunk entry.
    pub(crate) samples_per_chunk: u32,
    /// 1-based index into the sample description (`stsd`) entries.
    pub(crate) sample_description_id: u32,
}
