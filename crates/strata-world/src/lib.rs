//! Blocks, columns and the in-memory world index.
#![forbid(unsafe_code)]

pub mod block;
pub mod column;
pub mod config;
pub mod coords;
pub mod error;
pub mod map;
pub mod meta;

pub use block::{MapBlock, ModState};
pub use column::Column;
pub use config::WorldConfig;
pub use coords::{
    BLOCK_SIZE, BLOCK_VOLUME, BlockPos, MAP_GENERATION_LIMIT, block_over_limit, local_from_index,
    local_index, node_offset_in_block, node_over_limit, node_to_block,
};
pub use error::WorldError;
pub use map::{BlockId, BlockSet, NodeContainer, WorldMap};
pub use meta::{CircuitMeta, FurnaceMeta, NodeMeta, NodeMetaList, SIGN_TEXT_MAX, SignMeta};
