//! Per-entity cumulative sample index over the data block chain.
//!
//! Each entity's samples are fragmented across many blocks of unequal size.
//! [`EntityBlockIndex`] keeps that entity's blocks in chain order, annotated
//! with the number of samples stored in all earlier blocks, so a sample range
//! can be mapped onto blocks with two binary searches.

use crate::{
    Error, Result,
    blocks::{DataBlock, SAMPLE_WIDTH},
};
use core::ops::Range;
use log::{debug, warn};
use std::collections::BTreeMap;

/// A data block as seen from its entity's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexedBlock {
    /// File offset of the first payload byte.
    pub payload_offset: u64,
    /// Payload size in bytes.
    pub size: u64,
    /// Block timestamp (microseconds).
    pub timestamp: i64,
    /// Samples stored in all earlier blocks of the same entity.
    pub cumsize: u64,
}

impl IndexedBlock {
    /// Number of whole samples in this block.
    #[inline]
    pub fn sample_count(&self) -> u64 {
        self.size / SAMPLE_WIDTH as u64
    }

    /// Sample index range covered by this block.
    #[inline]
    pub fn sample_range(&self) -> Range<u64> {
        self.cumsize..self.cumsize.saturating_add(self.sample_count())
    }
}

/// Ordered blocks of one entity with cumulative sample offsets.
///
/// Invariants: `blocks[0].cumsize == 0` and
/// `blocks[k].cumsize == blocks[k - 1].cumsize + blocks[k - 1].sample_count()`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityBlockIndex {
    entity: i64,
    blocks: Vec<IndexedBlock>,
    total_samples: u64,
}

impl EntityBlockIndex {
    /// Build the index for `entity` from its blocks in chain order.
    ///
    /// Fails with [`Error::InvalidValue`] when the cumulative sample count
    /// no longer fits in a `u64`.
    pub fn from_blocks<'a>(
        entity: i64,
        blocks: impl IntoIterator<Item = &'a DataBlock>,
    ) -> Result<Self> {
        let mut cumsize = 0u64;
        let mut indexed = Vec::new();
        for block in blocks {
            if block.size % SAMPLE_WIDTH as u64 != 0 {
                warn!(
                    "block at {} of entity {} has odd payload size {}",
                    block.header_offset, entity, block.size
                );
            }
            let entry = IndexedBlock {
                payload_offset: block.payload_offset,
                size: block.size,
                timestamp: block.timestamp,
                cumsize,
            };
            cumsize = cumsize
                .checked_add(entry.sample_count())
                .ok_or_else(|| Error::InvalidValue {
                    key: "Size".to_string(),
                    value: block.size.to_string(),
                })?;
            indexed.push(entry);
        }

        Ok(Self {
            entity,
            blocks: indexed,
            total_samples: cumsize,
        })
    }

    pub fn entity(&self) -> i64 {
        self.entity
    }

    pub fn blocks(&self) -> &[IndexedBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total number of samples stored for this entity.
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    /// Timestamp of the entity's first block.
    pub fn first_timestamp(&self) -> Option<i64> {
        self.blocks.first().map(|b| b.timestamp)
    }

    /// Cumulative sample offsets, one per block.
    pub fn cumsizes(&self) -> impl Iterator<Item = u64> + '_ {
        self.blocks.iter().map(|b| b.cumsize)
    }

    /// Half-open range of block positions overlapping samples `[i_start, i_stop)`.
    ///
    /// The first block is the last one starting at or before `i_start`, so a
    /// query beginning mid-block includes that block. The end is the first
    /// block starting at or after `i_stop`. Both come from binary searches over
    /// the cumulative offsets. The range may hold a single block that is both
    /// first and last, and is empty for an empty query.
    pub fn locate(&self, i_start: u64, i_stop: u64) -> Range<usize> {
        if i_start >= i_stop || i_start >= self.total_samples {
            return 0..0;
        }
        let first = self
            .blocks
            .partition_point(|b| b.cumsize <= i_start)
            .saturating_sub(1);
        let end = self.blocks.partition_point(|b| b.cumsize < i_stop);
        first..end
    }
}

/// Group the flat block chain by entity.
///
/// Blocks keep their chain order within each entity.
pub fn build_entity_index(blocks: &[DataBlock]) -> Result<BTreeMap<i64, EntityBlockIndex>> {
    let mut grouped: BTreeMap<i64, Vec<&DataBlock>> = BTreeMap::new();
    for block in blocks {
        grouped.entry(block.entity).or_default().push(block);
    }

    let index: BTreeMap<i64, EntityBlockIndex> = grouped
        .into_iter()
        .map(|(entity, blocks)| Ok((entity, EntityBlockIndex::from_blocks(entity, blocks)?)))
        .collect::<Result<_>>()?;
    debug!("indexed {} blocks across {} entities", blocks.len(), index.len());
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(entity: i64, payload_offset: u64, size: u64) -> DataBlock {
        DataBlock {
            header_offset: payload_offset.saturating_sub(10),
            payload_offset,
            entity,
            timestamp: payload_offset as i64,
            size,
            next: -1,
        }
    }

    #[test]
    fn test_cumsize_invariants_over_varied_sizes() {
        // Deterministic pseudo-random sizes, including empty blocks.
        let mut state = 0x2545_f491_u64;
        for round in 0..50 {
            let count = 1 + round % 17;
            let blocks: Vec<DataBlock> = (0..count)
                .map(|i| {
                    state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    let samples = (state >> 33) % 300;
                    block(7, 1000 * i as u64, samples * 2)
                })
                .collect();

            let index = EntityBlockIndex::from_blocks(7, &blocks).unwrap();
            let cums: Vec<u64> = index.cumsizes().collect();
            assert_eq!(cums[0], 0);
            for k in 1..cums.len() {
                assert!(cums[k] >= cums[k - 1]);
                assert_eq!(cums[k], cums[k - 1] + blocks[k - 1].size / 2);
            }
            let total: u64 = blocks.iter().map(|b| b.size / 2).sum();
            assert_eq!(index.total_samples(), total);
        }
    }

    #[test]
    fn test_grouping_preserves_chain_order() {
        let blocks = vec![
            block(1, 100, 20),
            block(2, 200, 8),
            block(1, 300, 10),
            block(2, 400, 4),
            block(1, 500, 6),
        ];
        let index = build_entity_index(&blocks).unwrap();
        assert_eq!(index.len(), 2);

        let e1 = &index[&1];
        assert_eq!(
            e1.blocks().iter().map(|b| b.payload_offset).collect::<Vec<_>>(),
            vec![100, 300, 500]
        );
        assert_eq!(e1.cumsizes().collect::<Vec<_>>(), vec![0, 10, 15]);
        assert_eq!(e1.total_samples(), 18);
        assert_eq!(e1.first_timestamp(), Some(100));

        let e2 = &index[&2];
        assert_eq!(e2.cumsizes().collect::<Vec<_>>(), vec![0, 4]);
    }

    #[test]
    fn test_locate() {
        // 100 + 50 + 30 samples
        let blocks = vec![block(1, 0, 200), block(1, 1000, 100), block(1, 2000, 60)];
        let index = EntityBlockIndex::from_blocks(1, &blocks).unwrap();

        assert_eq!(index.locate(0, 180), 0..3);
        assert_eq!(index.locate(90, 120), 0..2);
        assert_eq!(index.locate(10, 20), 0..1);
        assert_eq!(index.locate(100, 150), 1..2);
        assert_eq!(index.locate(99, 100), 0..1);
        assert_eq!(index.locate(149, 151), 1..3);
        assert_eq!(index.locate(50, 50), 0..0);
        assert_eq!(index.locate(180, 200), 0..0);
    }

    #[test]
    fn test_cumsize_overflow_is_an_error() {
        let huge = u64::MAX - 1;
        let blocks = vec![block(1, 0, huge), block(1, 0, huge), block(1, 0, huge)];
        assert!(matches!(
            EntityBlockIndex::from_blocks(1, &blocks),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_locate_skips_empty_blocks() {
        let blocks = vec![block(1, 0, 0), block(1, 100, 20), block(1, 200, 0), block(1, 300, 20)];
        let index = EntityBlockIndex::from_blocks(1, &blocks).unwrap();
        assert_eq!(index.cumsizes().collect::<Vec<_>>(), vec![0, 0, 10, 10]);
        assert_eq!(index.locate(0, 5), 1..2);
        assert_eq!(index.locate(10, 12), 3..4);
    }
}
