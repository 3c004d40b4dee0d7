// src/blocks/recording_header.rs
use crate::{
    Error, Result,
    blocks::common::{parse_int, parse_offset},
};
use std::collections::BTreeMap;

/// Global `key=value` pairs of a recording.
///
/// Collects the tier-0 header and the global part of tier-1. Later insertions
/// replace earlier values for the same key, so tier-1 wins over tier-0.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordingHeader {
    entries: BTreeMap<String, String>,
}

impl RecordingHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up a key that must be present.
    ///
    /// # Returns
    /// The value, or [`Error::MissingKey`] naming the header region.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| Error::MissingKey {
            key: key.to_string(),
            section: "recording header",
        })
    }

    /// Look up an optional integer value.
    pub fn get_int(&self, key: &str) -> Result<Option<i64>> {
        self.get(key).map(|v| parse_int(key, v)).transpose()
    }

    /// Look up a required non-negative integer, typically a file offset.
    pub fn require_offset(&self, key: &str) -> Result<u64> {
        parse_offset(key, self.require(key)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
