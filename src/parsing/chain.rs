use crate::{Error, Result, blocks::DataBlock};
use log::{debug, trace};
use std::collections::HashSet;
use std::io::{BufRead, Seek};

/// Follow the linked list of data block headers.
///
/// Starting at `first_offset`, each block header is read and appended, then
/// the cursor jumps to the block's forward pointer. The chain ends after the
/// current block when its forward pointer is the end-of-chain sentinel or is
/// not below `stop_offset`. A chain that starts at or past `stop_offset` is
/// empty.
///
/// # Arguments
/// * `reader` - Seekable source holding the recording
/// * `first_offset` - File offset of the first block header
/// * `stop_offset` - Offset where entity-size metadata begins
///
/// # Returns
/// The blocks in chain order, or an [`Error`] on a malformed header or when a
/// forward pointer revisits an earlier block ([`Error::BlockChainCycle`]).
pub fn walk_block_chain<R: BufRead + Seek>(
    reader: &mut R,
    first_offset: u64,
    stop_offset: u64,
) -> Result<Vec<DataBlock>> {
    let mut blocks = Vec::new();
    if first_offset >= stop_offset {
        debug!("data block chain is empty: first block {first_offset} >= stop {stop_offset}");
        return Ok(blocks);
    }

    let mut visited = HashSet::new();
    let mut offset = first_offset;
    loop {
        if !visited.insert(offset) {
            return Err(Error::BlockChainCycle { offset });
        }

        let block = DataBlock::read_at(reader, offset)?;
        trace!(
            "block at {}: entity={} timestamp={} size={} next={}",
            block.header_offset, block.entity, block.timestamp, block.size, block.next
        );
        blocks.push(block);

        if block.ends_chain(stop_offset) {
            break;
        }
        offset = block.next as u64;
    }

    debug!("walked {} data blocks", blocks.len());
    Ok(blocks)
}
