use crate::{
    Error, Result,
    blocks::{
        END_OF_CHAIN, ENTITY_KEY, NEXT_KEY, SAMPLE_WIDTH, SIZE_KEY, TIMESTAMP_KEY,
        common::{parse_int, parse_offset, read_key_value},
    },
};
use std::io::{BufRead, Seek, SeekFrom};

/// Header of one data block in the linked chain.
///
/// A data block is a short text header (`key=value` lines, terminated by the
/// `Size=` line) followed directly by `size` bytes of little-endian `i16`
/// samples belonging to a single entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataBlock {
    /// File offset of the block's text header.
    pub header_offset: u64,
    /// File offset of the first payload byte.
    pub payload_offset: u64,
    /// Owning entity id.
    pub entity: i64,
    /// Block timestamp as stored in the header (microseconds).
    pub timestamp: i64,
    /// Payload size in bytes.
    pub size: u64,
    /// Offset of the next block header, or [`END_OF_CHAIN`].
    pub next: i64,
}

impl DataBlock {
    /// Read one block header starting at `offset`.
    ///
    /// Lines are consumed until the `Size=` key; the position right after that
    /// line is the payload offset. `Entity`, `TimeStamp` and `FPosNext` may
    /// appear in any order before it. Every line must be `key=<integer>`.
    /// A payload that would end past `u64::MAX`, or a negative forward pointer
    /// other than [`END_OF_CHAIN`], is an [`Error::InvalidValue`].
    ///
    /// # Arguments
    /// * `reader` - Seekable source holding the recording
    /// * `offset` - File offset of the block header
    ///
    /// # Returns
    /// The parsed [`DataBlock`] or an [`Error`] for malformed or missing keys.
    pub fn read_at<R: BufRead + Seek>(reader: &mut R, offset: u64) -> Result<Self> {
        reader.seek(SeekFrom::Start(offset))?;

        let mut position = offset;
        let mut entity = None;
        let mut timestamp = None;
        let mut next = None;
        let size = loop {
            let (key, value, consumed) = read_key_value(reader, position)?;
            position += consumed as u64;
            match key.as_str() {
                SIZE_KEY => break parse_offset(SIZE_KEY, &value)?,
                ENTITY_KEY => entity = Some(parse_int(ENTITY_KEY, &value)?),
                TIMESTAMP_KEY => timestamp = Some(parse_int(TIMESTAMP_KEY, &value)?),
                NEXT_KEY => next = Some(parse_int(NEXT_KEY, &value)?),
                // Other numeric keys are tolerated but still have to parse.
                _ => {
                    parse_int(&key, &value)?;
                }
            }
        };

        if position.checked_add(size).is_none() {
            return Err(invalid(SIZE_KEY, size));
        }
        let next = next.ok_or_else(|| missing(NEXT_KEY))?;
        if next < 0 && next != END_OF_CHAIN {
            return Err(invalid(NEXT_KEY, next));
        }

        Ok(Self {
            header_offset: offset,
            payload_offset: position,
            entity: entity.ok_or_else(|| missing(ENTITY_KEY))?,
            timestamp: timestamp.ok_or_else(|| missing(TIMESTAMP_KEY))?,
            size,
            next,
        })
    }

    /// Number of whole samples in the payload.
    #[inline]
    pub fn sample_count(&self) -> usize {
        (self.size / SAMPLE_WIDTH as u64) as usize
    }

    /// File offset one past the last payload byte.
    #[inline]
    pub fn payload_end(&self) -> u64 {
        self.payload_offset.saturating_add(self.size)
    }

    /// Whether this block closes the chain for the given stop offset.
    ///
    /// Both the [`END_OF_CHAIN`] sentinel and a forward pointer at or past
    /// `stop_offset` end the chain.
    #[inline]
    pub fn ends_chain(&self, stop_offset: u64) -> bool {
        self.next == END_OF_CHAIN || self.next as u64 >= stop_offset
    }
}

fn invalid(key: &str, value: impl ToString) -> Error {
    Error::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn missing(key: &str) -> Error {
    Error::MissingKey {
        key: key.to_string(),
        section: "data block header",
    }
}
