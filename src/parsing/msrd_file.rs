use super::{EntityBlockIndex, ParsedHeader, build_entity_index, parse_header, walk_block_chain};
use crate::{Error, Result, blocks::DataBlock};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, Cursor, Read, Seek};

/// Everything known about a recording before any sample is read.
#[derive(Debug, Clone)]
pub struct MsrdLayout {
    pub header: ParsedHeader,
    /// Data blocks in chain order.
    pub blocks: Vec<DataBlock>,
    /// Per-entity block indexes derived from `blocks`.
    pub entities: BTreeMap<i64, EntityBlockIndex>,
}

impl MsrdLayout {
    /// Scan headers and the whole block chain from a seekable source.
    ///
    /// Only block headers are read; payload bytes are skipped over by seeking.
    pub fn scan<R: BufRead + Seek>(reader: &mut R) -> Result<Self> {
        let header = parse_header(reader)?;
        let blocks = walk_block_chain(reader, header.first_block_offset, header.entity_sizes_offset)?;
        let entities = build_entity_index(&blocks)?;
        Ok(Self {
            header,
            blocks,
            entities,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MsrdFile {
    pub layout: MsrdLayout,
    /// File data buffer. Payload slices are taken from it on every read.
    pub data: Vec<u8>,
}

impl MsrdFile {
    /// Parse an MSRD file from a given file path.
    ///
    /// # Arguments
    /// * `path` - Path to the `.msrd` file on disk.
    ///
    /// # Returns
    /// An [`MsrdFile`] holding the parsed layout and the file contents, or an
    /// [`crate::Error`] if the file could not be read or decoded.
    pub fn parse_from_file(path: &str) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len() as usize;

        // Read entire file into memory
        let mut data = Vec::with_capacity(file_size);
        file.read_to_end(&mut data)?;

        Self::parse_from_bytes(data)
    }

    /// Parse an MSRD file from a byte buffer.
    pub fn parse_from_bytes(data: Vec<u8>) -> Result<Self> {
        let layout = MsrdLayout::scan(&mut Cursor::new(data.as_slice()))?;
        Ok(Self { layout, data })
    }

    /// Payload bytes `[offset, offset + len)` of the file.
    pub fn payload(&self, offset: u64, len: usize) -> Result<&[u8]> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let end = start.saturating_add(len);
        self.data.get(start..end).ok_or(Error::TooShortBuffer {
            actual: self.data.len(),
            expected: end,
            file: file!(),
            line: line!(),
        })
    }
}
