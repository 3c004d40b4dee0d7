use crate::{
    Error, Result,
    blocks::{DataBlock, RecordingHeader, StreamDescriptor},
    channel::{ChannelTable, EventChannel, SignalChannel, UnitChannel, build_channel_table},
    chunk::{ReadPlan, SignalChunk, decode_samples, resolve_range},
    parsing::{EntityBlockIndex, MsrdFile, MsrdLayout},
};
use log::{debug, warn};
use std::collections::BTreeMap;

/// Signal size and segment timing derived from the block index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SignalTiming {
    pub signal_size: usize,
    pub t_start: f64,
    pub t_stop: f64,
}

impl SignalTiming {
    /// The first channel's entity is the reference: its total sample count is
    /// the signal size and its first block timestamp (microseconds) the start.
    pub(crate) fn derive(
        table: &ChannelTable,
        entities: &BTreeMap<i64, EntityBlockIndex>,
    ) -> Self {
        let Some((channel, entity)) = table.channels.first().zip(table.entities.first()) else {
            return Self {
                signal_size: 0,
                t_start: 0.0,
                t_stop: 0.0,
            };
        };
        let Some(index) = entities.get(entity) else {
            warn!("reference entity {entity} has no data blocks");
            return Self {
                signal_size: 0,
                t_start: 0.0,
                t_stop: 0.0,
            };
        };

        let signal_size = index.total_samples() as usize;
        let t_start = index.first_timestamp().unwrap_or(0) as f64 * 1e-6;
        let t_stop = t_start + signal_size as f64 / channel.sampling_rate;
        Self {
            signal_size,
            t_start,
            t_stop,
        }
    }
}

/// Random-access reader for an MSRD recording.
///
/// Headers and the complete block chain are parsed when the reader is
/// created; afterwards the reader is immutable and sample reads only slice the
/// in-memory file contents, so `&MsrdReader` can be shared across threads.
///
/// The recording is exposed as one block with one segment holding every
/// analog channel.
///
/// # Memory
///
/// [`MsrdReader::from_file`] reads the whole file into a `Vec<u8>`; the crate
/// forbids `unsafe`, so there is no memory map. Recordings larger than
/// available memory should be opened with [`crate::MsrdIndex::from_file`],
/// which scans headers only, and read through a [`crate::FileRangeReader`].
#[derive(Debug)]
pub struct MsrdReader {
    file: MsrdFile,
    table: ChannelTable,
    timing: SignalTiming,
}

impl MsrdReader {
    /// Open and parse an MSRD file from disk, loading it fully into memory.
    ///
    /// # Arguments
    /// * `path` - Path to the `.msrd` file.
    ///
    /// # Returns
    /// A new [`MsrdReader`] on success or [`crate::Error`] on failure.
    pub fn from_file(path: &str) -> Result<Self> {
        Self::from_msrd_file(MsrdFile::parse_from_file(path)?)
    }

    /// Parse an MSRD recording held in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_msrd_file(MsrdFile::parse_from_bytes(data)?)
    }

    fn from_msrd_file(file: MsrdFile) -> Result<Self> {
        let table = build_channel_table(&file.layout.header.streams)?;
        for entity in &table.entities {
            if !file.layout.entities.contains_key(entity) {
                warn!("entity {entity} has a channel but no data blocks");
            }
        }
        let data_len = file.data.len() as u64;
        if let Some(block) = file.layout.blocks.iter().find(|b| b.payload_end() > data_len) {
            warn!(
                "block at {} claims {} payload bytes past end of file",
                block.header_offset,
                block.payload_end() - data_len
            );
        }

        let timing = SignalTiming::derive(&table, &file.layout.entities);
        debug!(
            "opened recording: {} channels, {} samples, t=[{}, {}]",
            table.len(),
            timing.signal_size,
            timing.t_start,
            timing.t_stop
        );
        Ok(Self {
            file,
            table,
            timing,
        })
    }

    /// Access the raw parsed layout (headers, chain and entity index).
    pub fn layout(&self) -> &MsrdLayout {
        &self.file.layout
    }

    /// Size in bytes of the parsed file.
    pub fn file_size(&self) -> u64 {
        self.file.data.len() as u64
    }

    pub fn header(&self) -> &RecordingHeader {
        &self.file.layout.header.header
    }

    pub fn recording_id(&self) -> i64 {
        self.file.layout.header.recording_id
    }

    pub fn streams(&self) -> &[StreamDescriptor] {
        &self.file.layout.header.streams
    }

    /// Data blocks in chain order.
    pub fn blocks(&self) -> &[DataBlock] {
        &self.file.layout.blocks
    }

    pub fn entity_index(&self, entity: i64) -> Option<&EntityBlockIndex> {
        self.file.layout.entities.get(&entity)
    }

    pub fn block_count(&self) -> usize {
        1
    }

    /// Segment count of each block.
    pub fn segment_counts(&self) -> Vec<usize> {
        vec![1]
    }

    pub fn signal_channels(&self) -> &[SignalChannel] {
        &self.table.channels
    }

    pub fn event_channels(&self) -> &[EventChannel] {
        &[]
    }

    pub fn unit_channels(&self) -> &[UnitChannel] {
        &[]
    }

    pub(crate) fn channel_table(&self) -> &ChannelTable {
        &self.table
    }

    /// Entity id owning the given channel.
    pub fn channel_entity(&self, channel_index: usize) -> Result<i64> {
        self.table
            .entities
            .get(channel_index)
            .copied()
            .ok_or(Error::InvalidChannelIndex {
                index: channel_index,
                count: self.table.len(),
            })
    }

    /// Segment start in seconds: the reference entity's first block timestamp.
    pub fn segment_t_start(&self) -> f64 {
        self.timing.t_start
    }

    /// Segment stop in seconds: start plus signal duration.
    pub fn segment_t_stop(&self) -> f64 {
        self.timing.t_stop
    }

    /// Signal length in samples, taken from the first channel's entity.
    pub fn signal_size(&self) -> usize {
        self.timing.signal_size
    }

    pub fn signal_t_start(&self) -> f64 {
        self.timing.t_start
    }

    /// Read raw samples `[i_start, i_stop)` of several channels.
    ///
    /// `channel_indexes` defaults to every channel, `i_start` to 0 and `i_stop`
    /// to [`MsrdReader::signal_size`]. Cells not backed by any block are zero
    /// and invalid in the returned [`SignalChunk`].
    pub fn analog_signal_chunk(
        &self,
        channel_indexes: Option<&[usize]>,
        i_start: Option<usize>,
        i_stop: Option<usize>,
    ) -> Result<SignalChunk> {
        let (start, stop) = resolve_range(i_start, i_stop, self.signal_size())?;
        let all: Vec<usize>;
        let channels = match channel_indexes {
            Some(c) => c,
            None => {
                all = (0..self.table.len()).collect();
                &all
            }
        };

        let mut chunk = SignalChunk::new(stop - start, channels.len());
        let mut buf = Vec::new();
        for (column, &channel_index) in channels.iter().enumerate() {
            let entity = self.channel_entity(channel_index)?;
            let Some(index) = self.entity_index(entity) else {
                continue;
            };
            for slice in ReadPlan::new(index, start, stop).slices {
                let bytes = self.file.payload(slice.file_offset, slice.byte_len())?;
                buf.resize(slice.sample_count, 0);
                decode_samples(bytes, &mut buf);
                chunk.fill(column, slice.output_offset, &buf);
            }
        }
        Ok(chunk)
    }

    /// Read raw samples `[i_start, i_stop)` of one channel.
    ///
    /// Unlike [`MsrdReader::analog_signal_chunk`], a range not fully backed by
    /// the channel's blocks is an [`Error::DataNotCovered`].
    pub fn read_channel(
        &self,
        channel_index: usize,
        i_start: Option<usize>,
        i_stop: Option<usize>,
    ) -> Result<Vec<i32>> {
        let (start, stop) = resolve_range(i_start, i_stop, self.signal_size())?;
        let entity = self.channel_entity(channel_index)?;
        let plan = match self.entity_index(entity) {
            Some(index) => ReadPlan::new(index, start, stop),
            None => ReadPlan {
                entity,
                i_start: start,
                i_stop: stop,
                slices: Vec::new(),
            },
        };
        plan.require_complete()?;

        let mut out = vec![0i32; plan.requested()];
        for slice in &plan.slices {
            let bytes = self.file.payload(slice.file_offset, slice.byte_len())?;
            let at = slice.output_offset;
            decode_samples(bytes, &mut out[at..at + slice.sample_count]);
        }
        Ok(out)
    }

    /// Read a channel and convert to physical units (`raw * gain + offset`).
    pub fn read_channel_physical(
        &self,
        channel_index: usize,
        i_start: Option<usize>,
        i_stop: Option<usize>,
    ) -> Result<Vec<f64>> {
        let raw = self.read_channel(channel_index, i_start, i_stop)?;
        let channel = &self.table.channels[channel_index];
        Ok(raw
            .into_iter()
            .map(|v| v as f64 * channel.gain + channel.offset)
            .collect())
    }
}
