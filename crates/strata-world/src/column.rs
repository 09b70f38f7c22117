use std::collections::BTreeMap;

use crate::map::BlockId;

/// Vertical stack of blocks sharing one horizontal coordinate. Gaps are
/// blocks that are not loaded.
#[derive(Clone, Debug, Default)]
pub struct Column {
    pub x: i32,
    pub z: i32,
    blocks: BTreeMap<i32, BlockId>,
}

impl Column {
    pub fn new(x: i32, z: i32) -> Self {
        Self {
            x,
            z,
            blocks: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn get(&self, y: i32) -> Option<BlockId> {
        self.blocks.get(&y).copied()
    }

    pub(crate) fn insert(&mut self, y: i32, id: BlockId) -> Option<BlockId> {
        self.blocks.insert(y, id)
    }

    pub(crate) fn remove(&mut self, y: i32) -> Option<BlockId> {
        self.blocks.remove(&y)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Loaded vertical indices, bottom to top.
    pub fn ys(&self) -> impl DoubleEndedIterator<Item = i32> + '_ {
        self.blocks.keys().copied()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (i32, BlockId)> + '_ {
        self.blocks.iter().map(|(y, id)| (*y, *id))
    }

    /// Loaded blocks at or above `y`.
    pub fn above(&self, y: i32) -> impl Iterator<Item = (i32, BlockId)> + '_ {
        self.blocks.range(y..).map(|(y, id)| (*y, *id))
    }

    /// Loaded blocks strictly below `y`, nearest first.
    pub fn below(&self, y: i32) -> impl Iterator<Item = (i32, BlockId)> + '_ {
        self.blocks.range(..y).rev().map(|(y, id)| (*y, *id))
    }

    pub fn top(&self) -> Option<i32> {
        self.blocks.keys().next_back().copied()
    }

    pub fn bottom(&self) -> Option<i32> {
        self.blocks.keys().next().copied()
    }
}
