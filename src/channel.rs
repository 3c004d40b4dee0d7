use crate::{
    Error, Result,
    blocks::{SAMPLE_WIDTH, StreamDescriptor, StreamKind},
};
use log::{debug, warn};

/// Storage type of raw samples.
///
/// Only signed 16-bit little-endian integers are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleType {
    Int16,
}

impl SampleType {
    /// Map a channel's `RawDataType`/`ADCBits` pair onto a sample type.
    pub fn from_descriptor(raw_type: &str, bits: &str) -> Result<Self> {
        match (raw_type, bits.trim()) {
            ("Int", "16") => Ok(SampleType::Int16),
            _ => Err(Error::UnsupportedEncoding {
                raw_type: raw_type.to_string(),
                bits: bits.to_string(),
            }),
        }
    }

    /// NumPy-style dtype name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleType::Int16 => "int16",
        }
    }

    pub fn byte_width(&self) -> usize {
        match self {
            SampleType::Int16 => SAMPLE_WIDTH,
        }
    }
}

/// One row of the signal channel table.
///
/// `gain` and `offset` convert raw codes to physical values
/// (`physical = raw * gain + offset`); samples are returned unscaled.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalChannel {
    pub label: String,
    pub id: String,
    /// Samples per second.
    pub sampling_rate: f64,
    pub dtype: SampleType,
    pub unit: String,
    pub gain: f64,
    pub offset: f64,
    pub group_id: i64,
}

/// Row of the event channel table. MSRD events are not decoded, so the table
/// is always empty.
#[derive(Debug, Clone, PartialEq)]
pub struct EventChannel {
    pub name: String,
    pub id: String,
}

/// Row of the spike unit table. Always empty for MSRD recordings.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitChannel {
    pub name: String,
    pub id: String,
}

/// The signal channel table and the entity that owns each row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelTable {
    pub channels: Vec<SignalChannel>,
    /// `entities[i]` is the entity id of `channels[i]`.
    pub entities: Vec<i64>,
}

impl ChannelTable {
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Build the signal channel table from the parsed streams.
///
/// Only `Analog` streams contribute rows. `Event` streams are acknowledged and
/// skipped; streams of unknown kind are skipped with a warning.
///
/// # Returns
/// The [`ChannelTable`], [`Error::UnsupportedEncoding`] for a channel that is
/// not 16-bit signed, or [`Error::MultipleGroups`] when analog channels span
/// more than one group id.
pub fn build_channel_table(streams: &[StreamDescriptor]) -> Result<ChannelTable> {
    let mut table = ChannelTable::default();

    for stream in streams {
        match &stream.kind {
            StreamKind::Analog => {}
            StreamKind::Event => continue,
            StreamKind::Other(tag) => {
                warn!("skipping stream {} of unknown kind {:?}", stream.id, tag);
                continue;
            }
        }

        for chan in &stream.channels {
            let dtype = SampleType::from_descriptor(chan.raw_data_type()?, chan.adc_bits()?)?;
            let group_id = chan.group_id()?;
            if let Some(first) = table.channels.first() {
                if first.group_id != group_id {
                    return Err(Error::MultipleGroups {
                        expected: first.group_id,
                        found: group_id,
                    });
                }
            }

            table.channels.push(SignalChannel {
                label: chan.label()?.to_string(),
                id: chan.channel_id()?.to_string(),
                sampling_rate: chan.sampling_rate()?,
                dtype,
                unit: chan.unit()?.to_string(),
                gain: chan.conversion_factor()?,
                offset: 0.0,
                group_id,
            });
            table.entities.push(chan.entity);
        }
    }

    debug!(
        "built channel table: {} analog channels from {} streams",
        table.len(),
        streams.len()
    );
    Ok(table)
}
