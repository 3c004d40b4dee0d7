#![forbid(unsafe_code)]

//! # msrd-rs
//!
//! A Rust library for random-access reading of MSRD signal recordings.
//!
//! MSRD is a self-describing container for multi-channel analog recordings. A
//! file starts with two text header tiers (`key=value` lines) describing the
//! recording, its streams and their channels, followed by a singly linked
//! chain of data blocks. Each block carries a short text header naming its
//! owning entity, a timestamp, its payload size and the file offset of the
//! next block, followed by raw little-endian `i16` samples. One channel's
//! samples are fragmented across many blocks of unequal size.
//!
//! ## Features
//!
//! - **Header parsing**: Both header tiers, including per-stream channel descriptors
//! - **Block chain walking**: Follows forward pointers with cycle detection
//! - **Range reads**: Any `[i_start, i_stop)` sample range of any channel via a
//!   per-entity cumulative index and binary search
//! - **Explicit gaps**: Uncovered samples are reported, never silently zero
//! - **Indexing**: Save the block layout as JSON and read ranges later without
//!   loading or re-scanning the file
//!
//! ## Supported Encodings
//!
//! Only signed 16-bit integer channels in a single channel group are decoded.
//! Other encodings and multi-group recordings fail when the file is opened.
//! Event streams are recognised but not decoded.
//!
//! ## Quick Start
//!
//! ### Reading samples
//!
//! ```no_run
//! use msrd_rs::{MsrdReader, Result};
//!
//! fn main() -> Result<()> {
//!     let reader = MsrdReader::from_file("recording.msrd")?;
//!
//!     for (i, channel) in reader.signal_channels().iter().enumerate() {
//!         println!("{i}: {} @ {} Hz [{}]", channel.label, channel.sampling_rate, channel.unit);
//!     }
//!
//!     // First second of the first channel, raw ADC codes
//!     let rate = reader.signal_channels()[0].sampling_rate as usize;
//!     let samples = reader.read_channel(0, Some(0), Some(rate))?;
//!     println!("{} samples", samples.len());
//!
//!     // All channels at once, [sample, channel] layout
//!     let chunk = reader.analog_signal_chunk(None, Some(0), Some(100))?;
//!     assert!(chunk.is_complete());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`blocks`] | Header records and data block headers |
//! | [`parsing`] | Header parser, chain walker and entity block index |
//! | [`chunk`] | Read planning and the [`SignalChunk`] output buffer |
//! | [`index`] | Serializable index for ranged partial reads |
//! | [`error`] | Error types and [`Result`] alias |
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`], which is an alias for
//! `std::result::Result<T, Error>`. Malformed headers, unsupported encodings
//! and mixed channel groups abort opening; I/O errors are propagated as-is.
//!
//! ## Logging
//!
//! Diagnostics go through the [`log`] facade; install any logger to see them.

pub mod blocks;
pub mod chunk;
pub mod parsing;

mod channel;
mod reader;

pub mod error;
pub mod index;

// Re-export commonly used types at the crate root
pub use blocks::{DataBlock, RecordingHeader, StreamDescriptor, StreamKind};
pub use channel::{ChannelTable, EventChannel, SampleType, SignalChannel, UnitChannel};
pub use chunk::SignalChunk;
pub use error::{Error, Result};
pub use index::{ByteRangeReader, FileRangeReader, MsrdIndex};
pub use parsing::EntityBlockIndex;
pub use reader::MsrdReader;
