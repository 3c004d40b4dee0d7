// src/blocks/mod.rs

// ============================================================================
// Format Constants (internal use only)
// ============================================================================
// Delimiters and key names of the MSRD text headers. Tier-1 text and data
// block headers use CRLF line endings; tier-0 is split on LF only.

/// Number of banner lines preceding the tier-0 size declaration.
pub(crate) const BANNER_LINES: usize = 2;

/// Byte sequence introducing a new stream inside tier-1 text.
pub(crate) const STREAM_DELIMITER: &[u8] = b"\r\nStream=";

/// Byte sequence introducing a new channel inside a stream fragment.
pub(crate) const ENTITY_DELIMITER: &[u8] = b"\r\nEntity=";

/// Global key holding the file offset where entity-size metadata begins.
pub(crate) const ENTITY_SIZES_KEY: &str = "FPosEntitySizes";

/// Stream-level key holding the stream kind tag.
pub(crate) const DATA_TYPE_KEY: &str = "DataType";

/// Data block header keys. `Size` always terminates a block header.
pub(crate) const SIZE_KEY: &str = "Size";
pub(crate) const ENTITY_KEY: &str = "Entity";
pub(crate) const TIMESTAMP_KEY: &str = "TimeStamp";
pub(crate) const NEXT_KEY: &str = "FPosNext";

/// Forward pointer value marking the end of the data block chain.
pub const END_OF_CHAIN: i64 = -1;

/// Width in bytes of one stored sample (signed 16-bit little-endian).
pub const SAMPLE_WIDTH: usize = 2;

// ============================================================================
// Submodules
// ============================================================================

mod common;
mod data_block;
mod recording_header;
mod stream_descriptor;

pub use common::split_key_value;
pub(crate) use common::{
    parse_int, parse_offset, read_key_value, read_line, split_bytes, strip_spaces,
    text_lines,
};

pub use data_block::DataBlock;
pub use recording_header::RecordingHeader;
pub use stream_descriptor::{ChannelDescriptor, StreamDescriptor, StreamKind};
