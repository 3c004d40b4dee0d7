//! Synthetic MSRD file builder shared by the integration tests.
//!
//! All offsets written into headers are fixed-width, so the layout can be
//! computed in a single pass.

#![allow(dead_code)]

/// How the last block of the chain ends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainEnd {
    /// Forward pointer `-1`.
    Sentinel,
    /// Forward pointer equal to the entity-sizes offset.
    StopOffset,
}

#[derive(Debug, Clone)]
pub struct ChannelSpec {
    pub entity: i64,
    pub label: String,
    pub raw_type: String,
    pub bits: String,
    pub group: i64,
    pub tick: u32,
}

impl ChannelSpec {
    pub fn int16(entity: i64) -> Self {
        Self {
            entity,
            label: format!("El {entity}"),
            raw_type: "Int".to_string(),
            bits: "16".to_string(),
            group: 0,
            tick: 50,
        }
    }

    pub fn encoding(mut self, raw_type: &str, bits: &str) -> Self {
        self.raw_type = raw_type.to_string();
        self.bits = bits.to_string();
        self
    }

    pub fn group(mut self, group: i64) -> Self {
        self.group = group;
        self
    }
}

#[derive(Debug, Clone)]
pub struct BlockSpec {
    pub entity: i64,
    pub timestamp: i64,
    pub samples: Vec<i16>,
}

/// Builds the bytes of a recording.
#[derive(Debug, Clone)]
pub struct MsrdBuilder {
    streams: Vec<(String, Vec<ChannelSpec>)>,
    blocks: Vec<BlockSpec>,
    filler: usize,
    reverse_file_order: bool,
    chain_end: ChainEnd,
}

/// A built recording plus the facts needed to check reads against it.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub bytes: Vec<u8>,
    /// Header offsets of the blocks, in chain order.
    pub header_offsets: Vec<u64>,
    /// Payload offsets of the blocks, in chain order.
    pub payload_offsets: Vec<u64>,
    pub blocks: Vec<BlockSpec>,
    pub entity_sizes_offset: u64,
}

impl Fixture {
    /// Samples of one entity in chain order, concatenated from raw bytes.
    pub fn entity_samples(&self, entity: i64) -> Vec<i32> {
        let mut out = Vec::new();
        for (block, &offset) in self.blocks.iter().zip(&self.payload_offsets) {
            if block.entity != entity {
                continue;
            }
            let start = offset as usize;
            let bytes = &self.bytes[start..start + block.samples.len() * 2];
            out.extend(
                bytes
                    .chunks_exact(2)
                    .map(|b| i16::from_le_bytes([b[0], b[1]]) as i32),
            );
        }
        out
    }

    /// Write the recording to a fresh file in the temp directory.
    pub fn write_temp(&self, name: &str) -> std::io::Result<String> {
        let path = std::env::temp_dir().join(name);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        std::fs::write(&path, &self.bytes)?;
        Ok(path.to_string_lossy().to_string())
    }
}

impl Default for MsrdBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MsrdBuilder {
    pub fn new() -> Self {
        Self {
            streams: Vec::new(),
            blocks: Vec::new(),
            filler: 0,
            reverse_file_order: false,
            chain_end: ChainEnd::Sentinel,
        }
    }

    pub fn stream(mut self, kind: &str, channels: Vec<ChannelSpec>) -> Self {
        self.streams.push((kind.to_string(), channels));
        self
    }

    pub fn block(mut self, entity: i64, timestamp: i64, samples: Vec<i16>) -> Self {
        self.blocks.push(BlockSpec {
            entity,
            timestamp,
            samples,
        });
        self
    }

    /// Insert `n` filler bytes before every block so blocks are not contiguous.
    pub fn filler(mut self, n: usize) -> Self {
        self.filler = n;
        self
    }

    /// Keep the first block first but store the rest in reverse chain order,
    /// so forward pointers after the first one point backwards.
    pub fn reverse_file_order(mut self) -> Self {
        self.reverse_file_order = true;
        self
    }

    pub fn chain_end(mut self, end: ChainEnd) -> Self {
        self.chain_end = end;
        self
    }

    pub fn build(&self) -> Fixture {
        let mut tier0 = b"MC_DataTool binary export\nMSRD\nHeaderSize=000000\nVersion=1\nSoftware=builder\n".to_vec();
        let size_line = format!("HeaderSize={:06}", tier0.len());
        let at = tier0.windows(11).position(|w| w == b"HeaderSize=").unwrap();
        tier0[at..at + size_line.len()].copy_from_slice(size_line.as_bytes());
        let header_size = tier0.len();

        let mut streams_text = String::new();
        for (i, (kind, channels)) in self.streams.iter().enumerate() {
            streams_text.push_str(&format!(
                "Stream={i}\r\nDataType={kind}\r\nEntities={}\r\n",
                channels.len()
            ));
            for c in channels {
                streams_text.push_str(&format!(
                    "Entity={}\r\nLabel={}\r\nChID={}\r\nTick={}\r\nRawDataType={}\r\nADCBits={}\r\nUnit=µV\r\nConversionFactor=0.1 \r\nGroupID={}\r\n",
                    c.entity, c.label, c.entity, c.tick, c.raw_type, c.bits, c.group
                ));
            }
        }

        let fixed_lines = "RecordingID=1\r\nFPosFirstDataBlock=0000000000\r\nFPosEntitySizes=0000000000\r\nComment=synthetic recording\r\n".len();
        let first_block = header_size + fixed_lines + streams_text.len();

        // Lay out blocks: header length depends only on entity, timestamp and size.
        let header_text = |b: &BlockSpec, next: i64| {
            format!(
                "Entity={}\r\nTimeStamp={}\r\nFPosNext={:010}\r\nSize={}\r\n",
                b.entity,
                b.timestamp,
                next,
                b.samples.len() * 2
            )
        };
        // The chain always starts at the first block after tier-1.
        let file_order: Vec<usize> = if self.reverse_file_order && !self.blocks.is_empty() {
            std::iter::once(0).chain((1..self.blocks.len()).rev()).collect()
        } else {
            (0..self.blocks.len()).collect()
        };
        let mut header_offsets = vec![0u64; self.blocks.len()];
        let mut payload_offsets = vec![0u64; self.blocks.len()];
        let mut cursor = first_block;
        for (n, &i) in file_order.iter().enumerate() {
            if n > 0 {
                cursor += self.filler;
            }
            let b = &self.blocks[i];
            header_offsets[i] = cursor as u64;
            cursor += header_text(b, 0).len();
            payload_offsets[i] = cursor as u64;
            cursor += b.samples.len() * 2;
        }
        let entity_sizes_offset = if self.blocks.is_empty() {
            first_block as u64
        } else {
            (cursor + 16) as u64
        };

        let mut bytes = tier0;
        bytes.extend_from_slice(
            format!(
                "RecordingID=1\r\nFPosFirstDataBlock={:010}\r\nFPosEntitySizes={:010}\r\nComment=synthetic recording\r\n",
                first_block,
                entity_sizes_offset
            )
            .as_bytes(),
        );
        bytes.extend_from_slice(streams_text.as_bytes());
        assert_eq!(bytes.len(), first_block);

        for (n, &i) in file_order.iter().enumerate() {
            if n > 0 {
                bytes.extend(std::iter::repeat_n(0xAAu8, self.filler));
            }
            let b = &self.blocks[i];
            let next = if i + 1 < self.blocks.len() {
                header_offsets[i + 1] as i64
            } else {
                match self.chain_end {
                    ChainEnd::Sentinel => -1,
                    ChainEnd::StopOffset => entity_sizes_offset as i64,
                }
            };
            assert_eq!(bytes.len() as u64, header_offsets[i]);
            bytes.extend_from_slice(header_text(b, next).as_bytes());
            for s in &b.samples {
                bytes.extend_from_slice(&s.to_le_bytes());
            }
        }
        bytes.extend(std::iter::repeat_n(0u8, entity_sizes_offset as usize - bytes.len()));
        bytes.extend_from_slice(b"EntitySizes=0\r\n");

        Fixture {
            bytes,
            header_offsets,
            payload_offsets,
            blocks: self.blocks.clone(),
            entity_sizes_offset,
        }
    }
}

/// Deterministic sample values: distinct per entity and block position.
pub fn ramp(entity: i64, start: i32, len: usize) -> Vec<i16> {
    (0..len as i32)
        .map(|k| ((entity as i32 * 1000 + start + k) % 30_000 - 15_000) as i16)
        .collect()
}
