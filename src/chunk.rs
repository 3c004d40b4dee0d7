//! Sample range planning and the multi-channel output buffer.
//!
//! A query `[i_start, i_stop)` on one entity is turned into a [`ReadPlan`]: the
//! byte ranges of the overlapping blocks, already trimmed at the first and last
//! block, and where each lands in the output. The plan is independent of how
//! bytes are fetched, so in-memory reads and ranged file reads share it.

use crate::{
    Error, Result,
    blocks::SAMPLE_WIDTH,
    parsing::EntityBlockIndex,
};

/// One contiguous piece of payload to copy into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSlice {
    /// File offset of the first sample to copy.
    pub file_offset: u64,
    /// Number of samples to copy.
    pub sample_count: usize,
    /// Position of the first copied sample relative to `i_start`.
    pub output_offset: usize,
}

impl BlockSlice {
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.sample_count * SAMPLE_WIDTH
    }
}

/// The slices needed to answer one single-entity sample range query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPlan {
    pub entity: i64,
    pub i_start: usize,
    pub i_stop: usize,
    pub slices: Vec<BlockSlice>,
}

impl ReadPlan {
    /// Plan the read of samples `[i_start, i_stop)` of one entity.
    ///
    /// Every block in [`EntityBlockIndex::locate`] is clipped to the query, so
    /// a block that is both first and last is trimmed on both sides.
    pub fn new(index: &EntityBlockIndex, i_start: usize, i_stop: usize) -> Self {
        let (start, stop) = (i_start as u64, i_stop as u64);
        let slices = index.blocks()[index.locate(start, stop)]
            .iter()
            .filter_map(|block| {
                let range = block.sample_range();
                let lo = range.start.max(start);
                let hi = range.end.min(stop);
                (hi > lo).then(|| BlockSlice {
                    file_offset: block.payload_offset + (lo - range.start) * SAMPLE_WIDTH as u64,
                    sample_count: (hi - lo) as usize,
                    output_offset: (lo - start) as usize,
                })
            })
            .collect();

        Self {
            entity: index.entity(),
            i_start,
            i_stop,
            slices,
        }
    }

    /// Number of requested samples backed by a block.
    pub fn covered(&self) -> usize {
        self.slices.iter().map(|s| s.sample_count).sum()
    }

    pub fn requested(&self) -> usize {
        self.i_stop - self.i_start
    }

    pub fn is_complete(&self) -> bool {
        self.covered() == self.requested()
    }

    /// Fail with [`Error::DataNotCovered`] unless every sample is backed.
    pub fn require_complete(&self) -> Result<()> {
        if self.is_complete() {
            return Ok(());
        }
        Err(Error::DataNotCovered {
            entity: self.entity,
            start: self.i_start,
            stop: self.i_stop,
            covered: self.covered(),
        })
    }
}

/// One ranged read serving consecutive slices of a [`ReadPlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteRun {
    pub file_offset: u64,
    pub len: u64,
    /// Slices inside this run, in plan order.
    pub slices: Vec<BlockSlice>,
}

impl ReadPlan {
    /// Group the slices into ranged reads.
    ///
    /// A slice joins the previous run when it starts at or after the run's end
    /// with at most `max_gap` bytes in between. Gap bytes (block headers,
    /// other entities' payloads) are fetched and dropped. With `max_gap == 0`
    /// only touching slices are merged. Slices pointing backwards in the file
    /// always start a new run.
    pub fn byte_runs(&self, max_gap: u64) -> Vec<ByteRun> {
        let mut runs: Vec<ByteRun> = Vec::new();
        for slice in &self.slices {
            let start = slice.file_offset;
            let end = start + slice.byte_len() as u64;
            if let Some(run) = runs.last_mut() {
                let run_end = run.file_offset + run.len;
                if start >= run_end && start - run_end <= max_gap {
                    run.len = end - run.file_offset;
                    run.slices.push(*slice);
                    continue;
                }
            }
            runs.push(ByteRun {
                file_offset: start,
                len: end - start,
                slices: vec![*slice],
            });
        }
        runs
    }
}

/// Decode little-endian `i16` samples, widening to `i32`.
///
/// Decodes `min(out.len(), bytes.len() / 2)` samples and returns that count.
pub fn decode_samples(bytes: &[u8], out: &mut [i32]) -> usize {
    let mut n = 0;
    for (dst, src) in out.iter_mut().zip(bytes.chunks_exact(SAMPLE_WIDTH)) {
        *dst = i16::from_le_bytes([src[0], src[1]]) as i32;
        n += 1;
    }
    n
}

/// Resolve optional sample bounds against a signal of `size` samples.
///
/// `i_start` defaults to 0 and `i_stop` to `size`.
pub fn resolve_range(i_start: Option<usize>, i_stop: Option<usize>, size: usize) -> Result<(usize, usize)> {
    let start = i_start.unwrap_or(0);
    let stop = i_stop.unwrap_or(size);
    if start > stop || stop > size {
        return Err(Error::InvalidRange { start, stop, size });
    }
    Ok((start, stop))
}

/// Raw samples of several channels over one sample range.
///
/// Samples are stored row-major as `[sample, channel]` and widened to `i32`.
/// Cells that no data block covers hold `0` and are flagged invalid; use
/// [`SignalChunk::get`] or [`SignalChunk::is_complete`] to tell them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalChunk {
    samples: Vec<i32>,
    valid: Vec<bool>,
    n_samples: usize,
    n_channels: usize,
}

impl SignalChunk {
    /// A zeroed, fully invalid chunk.
    pub fn new(n_samples: usize, n_channels: usize) -> Self {
        Self {
            samples: vec![0; n_samples * n_channels],
            valid: vec![false; n_samples * n_channels],
            n_samples,
            n_channels,
        }
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn n_channels(&self) -> usize {
        self.n_channels
    }

    /// Sample at `(sample, channel)`, or `None` when the cell is not covered
    /// or out of bounds.
    pub fn get(&self, sample: usize, channel: usize) -> Option<i32> {
        if sample >= self.n_samples || channel >= self.n_channels {
            return None;
        }
        let i = sample * self.n_channels + channel;
        self.valid[i].then_some(self.samples[i])
    }

    /// Row-major raw buffer, zero where not covered.
    pub fn as_slice(&self) -> &[i32] {
        &self.samples
    }

    /// Row-major validity mask matching [`SignalChunk::as_slice`].
    pub fn validity(&self) -> &[bool] {
        &self.valid
    }

    pub fn is_complete(&self) -> bool {
        self.valid.iter().all(|&v| v)
    }

    /// Raw column of one channel, zero where not covered.
    pub fn channel(&self, channel: usize) -> Vec<i32> {
        self.samples
            .iter()
            .skip(channel)
            .step_by(self.n_channels.max(1))
            .copied()
            .take(self.n_samples)
            .collect()
    }

    /// Column of one channel with uncovered cells as `None`.
    pub fn channel_values(&self, channel: usize) -> Vec<Option<i32>> {
        (0..self.n_samples).map(|s| self.get(s, channel)).collect()
    }

    pub fn into_raw(self) -> Vec<i32> {
        self.samples
    }

    /// Write decoded samples for `channel` starting at `output_offset` and
    /// mark them valid.
    pub(crate) fn fill(&mut self, channel: usize, output_offset: usize, values: &[i32]) {
        for (k, &v) in values.iter().enumerate() {
            let i = (output_offset + k) * self.n_channels + channel;
            self.samples[i] = v;
            self.valid[i] = true;
        }
    }
}
