//! World index: every loaded block, grouped into columns.

use std::cell::Cell;
use std::collections::BTreeSet;
use std::sync::Arc;

use hashbrown::HashMap;
use strata_blocks::{ContentRegistry, Node};
use strata_geom::V3;

use crate::block::MapBlock;
use crate::column::Column;
use crate::coords::{BLOCK_SIZE, BlockPos, block_over_limit, node_offset_in_block, node_to_block};
use crate::error::WorldError;
use crate::meta::NodeMeta;

/// Stable handle to a block slot in the arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockId(u32);

/// Ordered set of block positions, used to report side effects of edits.
pub type BlockSet = BTreeSet<BlockPos>;

/// Anything that can be read and written node by node: the live map or a
/// staging buffer. `None` means not loaded.
pub trait NodeContainer {
    fn node_at(&self, p: V3) -> Option<Node>;
    fn put_node(&mut self, p: V3, n: Node) -> bool;
}

pub struct WorldMap {
    reg: Arc<ContentRegistry>,
    generation_limit: i32,
    blocks: Vec<Option<MapBlock>>,
    free_blocks: Vec<u32>,
    columns: Vec<Option<Column>>,
    free_columns: Vec<u32>,
    column_index: HashMap<(i32, i32), u32>,
    // last column looked up by the no-create path
    last_column: Cell<Option<((i32, i32), u32)>>,
}

impl WorldMap {
    pub fn new(reg: Arc<ContentRegistry>, generation_limit: i32) -> Self {
        Self {
            reg,
            generation_limit,
            blocks: Vec::new(),
            free_blocks: Vec::new(),
            columns: Vec::new(),
            free_columns: Vec::new(),
            column_index: HashMap::new(),
            last_column: Cell::new(None),
        }
    }

    #[inline]
    pub fn registry(&self) -> &Arc<ContentRegistry> {
        &self.reg
    }

    #[inline]
    pub fn generation_limit(&self) -> i32 {
        self.generation_limit
    }

    fn column_slot(&self, key: (i32, i32)) -> Option<u32> {
        if let Some((k, slot)) = self.last_column.get() {
            if k == key {
                return Some(slot);
            }
        }
        let slot = *self.column_index.get(&key)?;
        self.last_column.set(Some((key, slot)));
        Some(slot)
    }

    pub fn column(&self, x: i32, z: i32) -> Option<&Column> {
        let slot = self.column_slot((x, z))?;
        self.columns[slot as usize].as_ref()
    }

    pub fn column_count(&self) -> usize {
        self.column_index.len()
    }

    pub fn column_positions(&self) -> Vec<(i32, i32)> {
        self.column_index.keys().copied().collect()
    }

    #[inline]
    pub fn block_id(&self, bp: BlockPos) -> Option<BlockId> {
        self.column(bp.x, bp.z)?.get(bp.y)
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> Option<&MapBlock> {
        self.blocks.get(id.0 as usize)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut MapBlock> {
        self.blocks.get_mut(id.0 as usize)?.as_mut()
    }

    /// No-create lookup.
    pub fn block(&self, bp: BlockPos) -> Option<&MapBlock> {
        let id = self.block_id(bp)?;
        self.get(id)
    }

    pub fn block_mut(&mut self, bp: BlockPos) -> Option<&mut MapBlock> {
        let id = self.block_id(bp)?;
        self.get_mut(id)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len() - self.free_blocks.len()
    }

    pub fn blocks(&self) -> impl Iterator<Item = &MapBlock> {
        self.blocks.iter().flatten()
    }

    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut MapBlock> {
        self.blocks.iter_mut().flatten()
    }

    pub fn block_positions(&self) -> Vec<BlockPos> {
        self.blocks().map(|b| b.pos()).collect()
    }

    fn ensure_column(&mut self, key: (i32, i32)) -> u32 {
        if let Some(slot) = self.column_index.get(&key) {
            return *slot;
        }
        let col = Column::new(key.0, key.1);
        let slot = match self.free_columns.pop() {
            Some(slot) => {
                self.columns[slot as usize] = Some(col);
                slot
            }
            None => {
                self.columns.push(Some(col));
                (self.columns.len() - 1) as u32
            }
        };
        self.column_index.insert(key, slot);
        slot
    }

    fn alloc_block(&mut self, block: MapBlock) -> BlockId {
        match self.free_blocks.pop() {
            Some(slot) => {
                self.blocks[slot as usize] = Some(block);
                BlockId(slot)
            }
            None => {
                self.blocks.push(Some(block));
                BlockId((self.blocks.len() - 1) as u32)
            }
        }
    }

    /// Insert `block`, replacing whatever occupied its position.
    pub fn insert_block(&mut self, block: MapBlock) -> Result<BlockId, WorldError> {
        let bp = block.pos();
        if block_over_limit(bp, self.generation_limit) {
            log::debug!(target: "map", "refusing block {bp} beyond the generation limit");
            return Err(WorldError::OutOfBounds(bp.origin()));
        }
        if let Some(id) = self.block_id(bp) {
            log::trace!(target: "map", "replacing block {bp}");
            self.blocks[id.0 as usize] = Some(block);
            return Ok(id);
        }
        let slot = self.ensure_column(bp.column());
        let id = self.alloc_block(block);
        if let Some(col) = self.columns[slot as usize].as_mut() {
            col.insert(bp.y, id);
        }
        Ok(id)
    }

    /// Create-if-absent. New blocks are dummies until filled.
    pub fn create_block(&mut self, bp: BlockPos) -> Result<&mut MapBlock, WorldError> {
        let id = match self.block_id(bp) {
            Some(id) => id,
            None => self.insert_block(MapBlock::new_dummy(bp))?,
        };
        self.get_mut(id).ok_or(WorldError::NotLoaded(bp))
    }

    /// Drop a block; its column goes too once empty.
    pub fn remove_block(&mut self, bp: BlockPos) -> Option<MapBlock> {
        let key = bp.column();
        let slot = *self.column_index.get(&key)?;
        let col = self.columns[slot as usize].as_mut()?;
        let id = col.remove(bp.y)?;
        if col.is_empty() {
            log::trace!(target: "map", "column ({}, {}) is empty, dropping it", key.0, key.1);
            self.columns[slot as usize] = None;
            self.column_index.remove(&key);
            self.free_columns.push(slot);
            self.last_column.set(None);
        }
        self.free_blocks.push(id.0);
        self.blocks[id.0 as usize].take()
    }

    /// Node at `p`, or the ignore sentinel when its block is not loaded.
    #[inline]
    pub fn node(&self, p: V3) -> Node {
        self.node_at(p).unwrap_or(Node::IGNORE)
    }

    pub fn try_node(&self, p: V3) -> Result<Node, WorldError> {
        let bp = node_to_block(p);
        self.node_at(p).ok_or(WorldError::NotLoaded(bp))
    }

    pub fn set_node(&mut self, p: V3, n: Node) -> Result<(), WorldError> {
        let bp = node_to_block(p);
        let block = self.block_mut(bp).ok_or(WorldError::NotLoaded(bp))?;
        if block.set_node(node_offset_in_block(p), n) {
            Ok(())
        } else {
            Err(WorldError::NotLoaded(bp))
        }
    }

    /// True when the node's block is loaded and not a dummy.
    pub fn is_valid_position(&self, p: V3) -> bool {
        self.block(node_to_block(p)).is_some_and(|b| !b.is_dummy())
    }

    pub fn node_meta(&self, p: V3) -> Option<&NodeMeta> {
        self.block(node_to_block(p))?
            .node_meta(node_offset_in_block(p))
    }

    pub fn node_meta_mut(&mut self, p: V3) -> Option<&mut NodeMeta> {
        self.block_mut(node_to_block(p))?
            .node_meta_mut(node_offset_in_block(p))
    }

    pub fn set_node_meta(&mut self, p: V3, meta: NodeMeta) -> Result<(), WorldError> {
        let bp = node_to_block(p);
        let block = self.block_mut(bp).ok_or(WorldError::NotLoaded(bp))?;
        if block.set_node_meta(node_offset_in_block(p), meta) {
            Ok(())
        } else {
            Err(WorldError::NotLoaded(bp))
        }
    }

    pub fn remove_node_meta(&mut self, p: V3) -> Option<NodeMeta> {
        self.block_mut(node_to_block(p))?
            .remove_node_meta(node_offset_in_block(p))
    }

    /// Highest solid node in the loaded part of column `(x, z)`.
    pub fn find_ground_level(&self, x: i32, z: i32) -> Option<i32> {
        let bp = node_to_block(V3::new(x, 0, z));
        let col = self.column(bp.x, bp.z)?;
        for (by, id) in col.iter().rev() {
            let Some(block) = self.get(id) else { continue };
            if block.is_dummy() {
                continue;
            }
            let rel = node_offset_in_block(V3::new(x, 0, z));
            for ly in (0..BLOCK_SIZE).rev() {
                let Some(n) = block.node(rel.with_y(ly)) else { continue };
                if self.reg.get(n.content).solid {
                    return Some(by * BLOCK_SIZE + ly);
                }
            }
        }
        None
    }
}

impl NodeContainer for WorldMap {
    #[inline]
    fn node_at(&self, p: V3) -> Option<Node> {
        self.block(node_to_block(p))?
            .node(node_offset_in_block(p))
    }

    #[inline]
    fn put_node(&mut self, p: V3, n: Node) -> bool {
        self.set_node(p, n).is_ok()
    }
}
