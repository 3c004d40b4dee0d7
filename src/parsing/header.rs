use crate::{
    Error, Result,
    blocks::{
        BANNER_LINES, ENTITY_SIZES_KEY, RecordingHeader, STREAM_DELIMITER, StreamDescriptor,
        parse_int, parse_offset, read_key_value, read_line, split_bytes, split_key_value,
        strip_spaces, text_lines,
    },
};
use log::debug;
use std::io::{BufRead, Read, Seek, SeekFrom};

/// Result of parsing both text header tiers.
#[derive(Debug, Clone)]
pub struct ParsedHeader {
    /// Tier-0 keys merged with the global keys of tier-1.
    pub header: RecordingHeader,
    /// Streams in file order.
    pub streams: Vec<StreamDescriptor>,
    /// Byte length of tier-0, as declared on the third line.
    pub header_size: u64,
    /// Value of the first line after tier-0.
    pub recording_id: i64,
    /// File offset of the first data block header.
    pub first_block_offset: u64,
    /// File offset where entity-size metadata begins (`FPosEntitySizes`).
    pub entity_sizes_offset: u64,
}

/// Parse the tier-0 and tier-1 text headers.
///
/// Tier-0 declares its own length on its third line, so it is read in two
/// passes: the first lines are read to discover the length, then the region
/// is re-read from offset 0. Tier-1 ends where the first data block begins.
///
/// # Arguments
/// * `reader` - Seekable source positioned anywhere; it is rewound first
///
/// # Returns
/// The [`ParsedHeader`] or a fatal parse [`Error`].
pub fn parse_header<R: BufRead + Seek>(reader: &mut R) -> Result<ParsedHeader> {
    reader.seek(SeekFrom::Start(0))?;

    let mut line = Vec::new();
    let mut position = 0u64;
    for _ in 0..BANNER_LINES {
        position += read_line(reader, &mut line)? as u64;
    }

    let (size_key, size_value, _) = read_key_value(reader, position)?;
    let header_size = parse_offset(&size_key, &size_value)?;

    // Second pass over tier-0 now that its length is known.
    reader.seek(SeekFrom::Start(0))?;
    let tier0 = read_region(reader, header_size)?;
    let mut header = RecordingHeader::new();
    for line in tier0.split(|&b| b == b'\n') {
        if let Some((key, value)) = split_key_value(line) {
            header.insert(key, value);
        }
    }

    let (id_key, id_value, consumed) = read_key_value(reader, header_size)?;
    let recording_id = parse_int(&id_key, &id_value)?;
    let (first_key, first_value, _) = read_key_value(reader, header_size + consumed as u64)?;
    let first_block_offset = parse_offset(&first_key, &first_value)?;
    if first_block_offset < header_size {
        return Err(Error::InvalidValue {
            key: first_key,
            value: first_value,
        });
    }

    reader.seek(SeekFrom::Start(header_size))?;
    let tier1 = read_region(reader, first_block_offset - header_size)?;
    let fragments = split_bytes(&tier1, STREAM_DELIMITER);

    for line in text_lines(fragments[0]) {
        if let Some((key, value)) = split_key_value(line) {
            header.insert(key, strip_spaces(&value));
        }
    }
    let entity_sizes_offset = header.require_offset(ENTITY_SIZES_KEY)?;

    let streams = fragments[1..]
        .iter()
        .map(|fragment| StreamDescriptor::from_fragment(fragment))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "parsed header: tier0={} bytes, tier1={} bytes, {} streams, first block at {}",
        header_size,
        tier1.len(),
        streams.len(),
        first_block_offset
    );

    Ok(ParsedHeader {
        header,
        streams,
        header_size,
        recording_id,
        first_block_offset,
        entity_sizes_offset,
    })
}

// Read exactly `len` bytes from the current position.
fn read_region<R: Read>(reader: &mut R, len: u64) -> Result<Vec<u8>> {
    let mut region = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut region)?;
    if (region.len() as u64) < len {
        return Err(Error::TooShortBuffer {
            actual: region.len(),
            expected: len as usize,
            file: file!(),
            line: line!(),
        });
    }
    Ok(region)
}
