//! Portable index for ranged reads.
//!
//! [`MsrdIndex`] holds what a read needs besides the sample bytes: the channel
//! table, each entity's cumulative block index and the segment timing. It is
//! built by scanning headers only, can be stored as JSON, and answers sample
//! range queries through any [`ByteRangeReader`] by requesting just the
//! payload bytes of the blocks a query overlaps.
//!
//! ```no_run
//! use msrd_rs::{FileRangeReader, MsrdIndex, Result};
//!
//! fn first_second() -> Result<Vec<i32>> {
//!     let index = MsrdIndex::from_file("recording.msrd")?;
//!     index.save_to_file("recording.msrd.json")?;
//!
//!     let index = MsrdIndex::load_from_file("recording.msrd.json")?;
//!     let rate = index.channels[0].sampling_rate as usize;
//!     let mut file = FileRangeReader::new("recording.msrd")?;
//!     // Payloads up to 4 KiB apart share one request.
//!     index.read_channel_range_merged(0, 0, rate, 4096, &mut file)
//! }
//! ```

use crate::{
    Error, MsrdReader, Result,
    channel::{ChannelTable, SignalChannel, build_channel_table},
    chunk::{BlockSlice, ReadPlan, SignalChunk, decode_samples, resolve_range},
    parsing::{EntityBlockIndex, MsrdLayout},
    reader::SignalTiming,
};
use log::debug;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};

/// Layout of one recording, detached from its sample bytes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MsrdIndex {
    /// Size of the scanned file in bytes
    pub file_size: u64,
    /// Analog channels in table order
    pub channels: Vec<SignalChannel>,
    /// Entity id of each channel
    pub channel_entities: Vec<i64>,
    /// Block index of every entity found in the chain
    pub entities: BTreeMap<i64, EntityBlockIndex>,
    /// Signal length in samples
    pub signal_size: usize,
    /// Segment start in seconds
    pub t_start: f64,
    /// Segment stop in seconds
    pub t_stop: f64,
}

/// Source of recording bytes addressed by file offset.
///
/// Implemented for local files by [`FileRangeReader`]; a remote store that
/// serves byte ranges can implement it the same way.
pub trait ByteRangeReader {
    type Error;

    /// Return exactly `length` bytes starting at `offset`.
    fn read_range(
        &mut self,
        offset: u64,
        length: u64,
    ) -> core::result::Result<Vec<u8>, Self::Error>;
}

/// Seek-and-read access to a local MSRD file.
pub struct FileRangeReader {
    file: File,
    len: u64,
}

impl FileRangeReader {
    pub fn new(file_path: &str) -> Result<Self> {
        let file = File::open(file_path)?;
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }
}

impl ByteRangeReader for FileRangeReader {
    type Error = Error;

    fn read_range(&mut self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let in_bounds = offset.checked_add(length).is_some_and(|end| end <= self.len);
        if !in_bounds {
            return Err(Error::TooShortBuffer {
                actual: self.len.saturating_sub(offset) as usize,
                expected: length as usize,
                file: file!(),
                line: line!(),
            });
        }
        self.file.seek(SeekFrom::Start(offset))?;
        let mut bytes = vec![0u8; length as usize];
        self.file.read_exact(&mut bytes)?;
        Ok(bytes)
    }
}

impl MsrdIndex {
    /// Scan a file's headers and block chain without loading payloads.
    ///
    /// Block payloads are skipped by seeking from one block header to the next.
    pub fn from_file(file_path: &str) -> Result<Self> {
        let file = File::open(file_path)?;
        let file_size = file.metadata()?.len();
        let layout = MsrdLayout::scan(&mut BufReader::new(file))?;
        let table = build_channel_table(&layout.header.streams)?;
        Ok(Self::from_parts(file_size, table, layout.entities))
    }

    /// Take the index of an already opened reader.
    pub fn from_reader(reader: &MsrdReader) -> Self {
        Self::from_parts(
            reader.file_size(),
            reader.channel_table().clone(),
            reader.layout().entities.clone(),
        )
    }

    fn from_parts(
        file_size: u64,
        table: ChannelTable,
        entities: BTreeMap<i64, EntityBlockIndex>,
    ) -> Self {
        let timing = SignalTiming::derive(&table, &entities);
        debug!(
            "built index: {} channels, {} entities, {} samples",
            table.len(),
            entities.len(),
            timing.signal_size
        );
        Self {
            file_size,
            channels: table.channels,
            channel_entities: table.entities,
            entities,
            signal_size: timing.signal_size,
            t_start: timing.t_start,
            t_stop: timing.t_stop,
        }
    }

    /// Write the index as pretty-printed JSON.
    #[cfg(feature = "serde")]
    pub fn save_to_file(&self, index_path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::IndexSerializationError(format!("encoding index: {e}")))?;
        std::fs::write(index_path, json)?;
        Ok(())
    }

    /// Read an index written by [`MsrdIndex::save_to_file`].
    #[cfg(feature = "serde")]
    pub fn load_from_file(index_path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(index_path)?;
        serde_json::from_str(&json)
            .map_err(|e| Error::IndexSerializationError(format!("decoding {index_path}: {e}")))
    }

    fn plan(&self, channel_index: usize, start: usize, stop: usize) -> Result<ReadPlan> {
        let entity = *self
            .channel_entities
            .get(channel_index)
            .ok_or(Error::InvalidChannelIndex {
                index: channel_index,
                count: self.channels.len(),
            })?;
        Ok(match self.entities.get(&entity) {
            Some(index) => ReadPlan::new(index, start, stop),
            None => ReadPlan {
                entity,
                i_start: start,
                i_stop: stop,
                slices: Vec::new(),
            },
        })
    }

    // Fetch the plan's byte runs and hand each slice's decoded samples to `sink`.
    fn fetch_plan<R: ByteRangeReader<Error = Error>>(
        plan: &ReadPlan,
        max_gap: u64,
        reader: &mut R,
        mut sink: impl FnMut(&BlockSlice, &[i32]),
    ) -> Result<()> {
        let mut samples = Vec::new();
        for run in plan.byte_runs(max_gap) {
            let bytes = reader.read_range(run.file_offset, run.len)?;
            if (bytes.len() as u64) < run.len {
                return Err(Error::TooShortBuffer {
                    actual: bytes.len(),
                    expected: run.len as usize,
                    file: file!(),
                    line: line!(),
                });
            }
            for slice in &run.slices {
                let at = (slice.file_offset - run.file_offset) as usize;
                samples.resize(slice.sample_count, 0);
                decode_samples(&bytes[at..at + slice.byte_len()], &mut samples);
                sink(slice, &samples);
            }
        }
        Ok(())
    }

    /// Read raw samples `[i_start, i_stop)` of one channel through a byte
    /// range reader.
    ///
    /// Each overlapping block payload is one request. A range not fully
    /// backed by blocks is an [`Error::DataNotCovered`].
    pub fn read_channel_range<R: ByteRangeReader<Error = Error>>(
        &self,
        channel_index: usize,
        i_start: usize,
        i_stop: usize,
        reader: &mut R,
    ) -> Result<Vec<i32>> {
        self.read_channel_range_merged(channel_index, i_start, i_stop, 0, reader)
    }

    /// Like [`MsrdIndex::read_channel_range`], but payloads separated by at
    /// most `max_gap` bytes are fetched in a single request.
    ///
    /// Fewer, larger requests pay off on high-latency sources; the gap bytes
    /// are read and discarded.
    pub fn read_channel_range_merged<R: ByteRangeReader<Error = Error>>(
        &self,
        channel_index: usize,
        i_start: usize,
        i_stop: usize,
        max_gap: u64,
        reader: &mut R,
    ) -> Result<Vec<i32>> {
        let (start, stop) = resolve_range(Some(i_start), Some(i_stop), self.signal_size)?;
        let plan = self.plan(channel_index, start, stop)?;
        plan.require_complete()?;

        let mut out = vec![0i32; plan.requested()];
        Self::fetch_plan(&plan, max_gap, reader, |slice, samples| {
            let at = slice.output_offset;
            out[at..at + samples.len()].copy_from_slice(samples);
        })?;
        Ok(out)
    }

    /// Read raw samples of several channels into a [`SignalChunk`].
    ///
    /// Uncovered cells are left zero and invalid, as in
    /// [`MsrdReader::analog_signal_chunk`].
    pub fn read_chunk<R: ByteRangeReader<Error = Error>>(
        &self,
        channel_indexes: &[usize],
        i_start: Option<usize>,
        i_stop: Option<usize>,
        reader: &mut R,
    ) -> Result<SignalChunk> {
        let (start, stop) = resolve_range(i_start, i_stop, self.signal_size)?;
        let mut chunk = SignalChunk::new(stop - start, channel_indexes.len());
        for (column, &channel_index) in channel_indexes.iter().enumerate() {
            let plan = self.plan(channel_index, start, stop)?;
            Self::fetch_plan(&plan, 0, reader, |slice, samples| {
                chunk.fill(column, slice.output_offset, samples);
            })?;
        }
        Ok(chunk)
    }

    /// Position of the first channel with this label.
    pub fn find_channel_by_label(&self, label: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.label == label)
    }

    /// [`MsrdIndex::read_channel_range`] addressed by channel label.
    pub fn read_channel_range_by_label<R: ByteRangeReader<Error = Error>>(
        &self,
        label: &str,
        i_start: usize,
        i_stop: usize,
        reader: &mut R,
    ) -> Result<Vec<i32>> {
        let channel_index = self.find_channel_by_label(label).ok_or_else(|| Error::MissingKey {
            key: label.to_string(),
            section: "channel table",
        })?;
        self.read_channel_range(channel_index, i_start, i_stop, reader)
    }

    pub fn get_channel_info(&self, channel_index: usize) -> Option<&SignalChannel> {
        self.channels.get(channel_index)
    }

    /// `(index, label, entity)` of every channel.
    pub fn list_channels(&self) -> Vec<(usize, &str, i64)> {
        self.channels
            .iter()
            .zip(&self.channel_entities)
            .enumerate()
            .map(|(i, (c, &e))| (i, c.label.as_str(), e))
            .collect()
    }

    /// Byte ranges a query would request, as `(file_offset, length)` pairs.
    ///
    /// `max_gap` merges neighbouring payloads as
    /// [`MsrdIndex::read_channel_range_merged`] does; pass `0` for one range
    /// per block payload.
    pub fn get_byte_ranges(
        &self,
        channel_index: usize,
        i_start: usize,
        i_stop: usize,
        max_gap: u64,
    ) -> Result<Vec<(u64, u64)>> {
        let (start, stop) = resolve_range(Some(i_start), Some(i_stop), self.signal_size)?;
        Ok(self
            .plan(channel_index, start, stop)?
            .byte_runs(max_gap)
            .iter()
            .map(|run| (run.file_offset, run.len))
            .collect())
    }
}
