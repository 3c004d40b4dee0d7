//! Error types for MSRD operations.
//!
//! This module defines the [`Error`] enum which represents all possible failures
//! that can occur when opening, indexing, or reading MSRD recordings.
//!
//! # Example
//!
//! ```no_run
//! use msrd_rs::{MsrdReader, Error, Result};
//!
//! fn open(path: &str) -> Result<()> {
//!     match MsrdReader::from_file(path) {
//!         Ok(reader) => {
//!             println!("Loaded {} signal channels", reader.signal_channels().len());
//!             Ok(())
//!         }
//!         Err(Error::UnsupportedEncoding { raw_type, bits }) => {
//!             eprintln!("Cannot decode {raw_type}/{bits} samples");
//!             Err(Error::UnsupportedEncoding { raw_type, bits })
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use core::fmt;

/// Errors that can occur during MSRD file operations.
///
/// Configuration and parse errors are fatal: the file is presumed unreadable
/// beyond the point where they were detected and no partial result is returned.
#[derive(Debug)]
pub enum Error {
    /// Buffer provided for parsing was too small.
    ///
    /// Raised when a header region or a block payload extends past the end of
    /// the available data.
    TooShortBuffer {
        /// Actual number of bytes available
        actual: usize,
        /// Minimum number of bytes required
        expected: usize,
        /// Source file where the error was detected
        file: &'static str,
        /// Line number where the error was detected
        line: u32,
    },

    /// An I/O error occurred while reading the file.
    IOError(std::io::Error),

    /// A mandatory header line did not contain a `=` separator.
    MissingSeparator {
        /// File offset of the offending line
        offset: u64,
        /// The line as found (lossy UTF-8)
        line: String,
    },

    /// A required key was absent from a header region.
    MissingKey {
        /// The key that was looked up
        key: String,
        /// Which header region was searched
        section: &'static str,
    },

    /// A header value could not be parsed into the expected type.
    InvalidValue {
        /// The key the value belongs to
        key: String,
        /// The raw value text
        value: String,
    },

    /// A channel declares a sample encoding other than signed 16-bit integer.
    UnsupportedEncoding {
        /// Declared raw data type (e.g. `Int`, `Float`)
        raw_type: String,
        /// Declared ADC bit width
        bits: String,
    },

    /// Analog channels span more than one group id.
    ///
    /// Only a single channel group per recording is supported.
    MultipleGroups {
        /// Group id of the first analog channel
        expected: i64,
        /// The differing group id that was found
        found: i64,
    },

    /// A forward pointer in the data block chain revisits an earlier header.
    BlockChainCycle {
        /// The header offset that was reached twice
        offset: u64,
    },

    /// A channel index does not address a row of the channel table.
    InvalidChannelIndex {
        /// Requested index
        index: usize,
        /// Number of channels in the table
        count: usize,
    },

    /// A sample range is reversed or extends past the signal size.
    InvalidRange {
        /// Requested first sample
        start: usize,
        /// Requested end sample (exclusive)
        stop: usize,
        /// Signal size in samples
        size: usize,
    },

    /// Part of the requested sample range is not backed by any data block.
    DataNotCovered {
        /// Entity whose blocks were consulted
        entity: i64,
        /// First requested sample
        start: usize,
        /// End of the requested range (exclusive)
        stop: usize,
        /// Number of samples that were actually available in the range
        covered: usize,
    },

    /// Failed to serialize or deserialize an index.
    IndexSerializationError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TooShortBuffer {
                actual,
                expected,
                file,
                line,
            } => write!(
                f,
                "Buffer too small at {file}:{line}: need at least {expected} bytes, got {actual}"
            ),
            Error::IOError(e) => write!(f, "I/O error: {e}"),
            Error::MissingSeparator { offset, line } => {
                write!(f, "Malformed header line at offset {offset}: {line:?} has no '='")
            }
            Error::MissingKey { key, section } => {
                write!(f, "Required key {key:?} missing from {section}")
            }
            Error::InvalidValue { key, value } => {
                write!(f, "Invalid value for {key:?}: {value:?}")
            }
            Error::UnsupportedEncoding { raw_type, bits } => write!(
                f,
                "Unsupported sample encoding {raw_type}/{bits} bits: only 16-bit signed integers are implemented"
            ),
            Error::MultipleGroups { expected, found } => write!(
                f,
                "Only one signal group is supported: found group {found} alongside group {expected}"
            ),
            Error::BlockChainCycle { offset } => {
                write!(f, "Data block chain cycle detected at offset {offset:#x}")
            }
            Error::InvalidChannelIndex { index, count } => {
                write!(f, "Channel index {index} out of range for {count} channels")
            }
            Error::InvalidRange { start, stop, size } => {
                write!(f, "Invalid sample range [{start}, {stop}) for signal of {size} samples")
            }
            Error::DataNotCovered {
                entity,
                start,
                stop,
                covered,
            } => write!(
                f,
                "Entity {entity} covers only {covered} of the samples in [{start}, {stop})"
            ),
            Error::IndexSerializationError(s) => write!(f, "Index serialization error: {s}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IOError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IOError(err)
    }
}

/// A specialized Result type for MSRD operations.
///
/// This is defined as `core::result::Result<T, Error>` for convenience.
pub type Result<T> = core::result::Result<T, Error>;
