mod chain;
mod entity_index;
mod header;
mod msrd_file;

pub use chain::walk_block_chain;
pub use entity_index::{EntityBlockIndex, IndexedBlock, build_entity_index};
pub use header::{ParsedHeader, parse_header};
pub use msrd_file::{MsrdFile, MsrdLayout};
