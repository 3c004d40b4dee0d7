// src/blocks/stream_descriptor.rs
use crate::{
    Error, Result,
    blocks::{
        DATA_TYPE_KEY, ENTITY_DELIMITER,
        common::{parse_float, parse_int, split_bytes, split_key_value, strip_spaces, text_lines},
    },
};
use std::collections::BTreeMap;

/// Kind tag of a stream (`DataType=` in the stream header).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamKind {
    Analog,
    Event,
    /// Any other tag. Such streams are kept but contribute no channels.
    Other(String),
}

impl StreamKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "Analog" => StreamKind::Analog,
            "Event" => StreamKind::Event,
            other => StreamKind::Other(other.to_string()),
        }
    }
}

/// One stream of the tier-1 header together with its channel descriptors.
#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    /// Text following `Stream=`, normally the stream ordinal.
    pub id: String,
    pub kind: StreamKind,
    /// Stream-level `key=value` pairs with spaces stripped from values.
    pub attributes: BTreeMap<String, String>,
    pub channels: Vec<ChannelDescriptor>,
}

impl StreamDescriptor {
    /// Parse one stream fragment, i.e. the text between two `\r\nStream=`
    /// delimiters.
    ///
    /// The first line is the stream id. Stream-level keys follow until the
    /// first `\r\nEntity=` delimiter; every further fragment is a channel.
    pub fn from_fragment(fragment: &[u8]) -> Result<Self> {
        let parts = split_bytes(fragment, ENTITY_DELIMITER);

        let mut lines = text_lines(parts[0]);
        let id = lines
            .next()
            .map(|l| String::from_utf8_lossy(l).trim().to_string())
            .unwrap_or_default();
        let attributes = collect_attributes(lines);

        let kind = attributes
            .get(DATA_TYPE_KEY)
            .map(|tag| StreamKind::from_tag(tag))
            .ok_or_else(|| Error::MissingKey {
                key: DATA_TYPE_KEY.to_string(),
                section: "stream header",
            })?;

        let channels = parts[1..]
            .iter()
            .map(|chan| ChannelDescriptor::from_fragment(chan))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id,
            kind,
            attributes,
            channels,
        })
    }

    /// Declared number of entities (`Entities=`), if present.
    pub fn entity_count(&self) -> Result<Option<i64>> {
        self.attributes
            .get("Entities")
            .map(|v| parse_int("Entities", v))
            .transpose()
    }

    pub fn is_analog(&self) -> bool {
        self.kind == StreamKind::Analog
    }
}

/// Per-channel descriptor from a stream fragment.
///
/// Keys are kept as text; typed accessors parse on demand so that channels of
/// stream kinds that are never decoded cannot fail parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDescriptor {
    /// Entity id joining this channel to its data blocks.
    pub entity: i64,
    pub attributes: BTreeMap<String, String>,
}

impl ChannelDescriptor {
    /// Parse one channel fragment. The first line is the bare entity id.
    pub fn from_fragment(fragment: &[u8]) -> Result<Self> {
        let mut lines = text_lines(fragment);
        let first = lines.next().unwrap_or_default();
        let entity_text = String::from_utf8_lossy(first).trim().to_string();
        let entity = parse_int("Entity", &entity_text)?;
        Ok(Self {
            entity,
            attributes: collect_attributes(lines),
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| Error::MissingKey {
            key: key.to_string(),
            section: "channel descriptor",
        })
    }

    pub fn label(&self) -> Result<&str> {
        self.require("Label")
    }

    pub fn channel_id(&self) -> Result<&str> {
        self.require("ChID")
    }

    /// Sampling interval in microseconds.
    pub fn tick(&self) -> Result<f64> {
        let tick = parse_float("Tick", self.require("Tick")?)?;
        if tick <= 0.0 || !tick.is_finite() {
            return Err(Error::InvalidValue {
                key: "Tick".to_string(),
                value: tick.to_string(),
            });
        }
        Ok(tick)
    }

    /// Sampling rate in Hz (`1e6 / tick`).
    pub fn sampling_rate(&self) -> Result<f64> {
        Ok(1e6 / self.tick()?)
    }

    pub fn raw_data_type(&self) -> Result<&str> {
        self.require("RawDataType")
    }

    pub fn adc_bits(&self) -> Result<&str> {
        self.require("ADCBits")
    }

    pub fn unit(&self) -> Result<&str> {
        self.require("Unit")
    }

    pub fn conversion_factor(&self) -> Result<f64> {
        parse_float("ConversionFactor", self.require("ConversionFactor")?)
    }

    pub fn group_id(&self) -> Result<i64> {
        parse_int("GroupID", self.require("GroupID")?)
    }
}

// Lines without '=' are ignored; values have embedded spaces removed.
fn collect_attributes<'a>(lines: impl Iterator<Item = &'a [u8]>) -> BTreeMap<String, String> {
    lines
        .filter_map(split_key_value)
        .map(|(k, v)| (k, strip_spaces(&v)))
        .collect()
}
