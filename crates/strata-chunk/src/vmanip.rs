//! Dense staging copy of a region of the world. Callers emerge blocks into
//! it, edit with plain array access, then blit the result back.

use hashbrown::HashMap;
use strata_blocks::Node;
use strata_geom::{Area, V3};
use strata_world::{
    BLOCK_SIZE, BlockPos, BlockSet, NodeContainer, NodeMeta, WorldMap, local_index, node_to_block,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CellState {
    /// Holds a copy of live data or a value written by the caller.
    Loaded,
    /// Inside the buffer but never filled.
    NotLoaded,
    /// Its block does not exist in the world (absent or dummy).
    Inexistent,
}

#[derive(Default)]
pub struct VoxelManip {
    area: Area,
    data: Vec<Node>,
    flags: Vec<CellState>,
    // emerged block -> whether it existed in the world
    loaded_blocks: HashMap<BlockPos, bool>,
}

impl VoxelManip {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn area(&self) -> Area {
        self.area
    }

    pub fn clear(&mut self) {
        self.area = Area::EMPTY;
        self.data.clear();
        self.flags.clear();
        self.loaded_blocks.clear();
    }

    /// Blocks emerged so far, with whether each existed in the world.
    pub fn loaded_blocks(&self) -> impl Iterator<Item = (BlockPos, bool)> + '_ {
        self.loaded_blocks.iter().map(|(bp, e)| (*bp, *e))
    }

    /// Grow the buffer to also cover `a`. New cells start `NotLoaded`.
    pub fn add_area(&mut self, a: &Area) {
        if a.is_empty() || self.area.contains_area(a) {
            return;
        }
        let mut new_area = self.area;
        new_area.add_area(a);
        let vol = new_area.volume();
        let mut data = vec![Node::IGNORE; vol];
        let mut flags = vec![CellState::NotLoaded; vol];
        if !self.area.is_empty() {
            for (i, p) in self.area.iter().enumerate() {
                let j = new_area.index(p);
                data[j] = self.data[i];
                flags[j] = self.flags[i];
            }
        }
        self.area = new_area;
        self.data = data;
        self.flags = flags;
    }

    #[inline]
    pub fn state(&self, p: V3) -> CellState {
        if !self.area.contains(p) {
            return CellState::NotLoaded;
        }
        self.flags[self.area.index(p)]
    }

    /// Node at `p` when it holds data.
    #[inline]
    pub fn get(&self, p: V3) -> Option<Node> {
        if !self.area.contains(p) {
            return None;
        }
        let i = self.area.index(p);
        (self.flags[i] == CellState::Loaded).then(|| self.data[i])
    }

    #[inline]
    pub fn get_or_ignore(&self, p: V3) -> Node {
        self.get(p).unwrap_or(Node::IGNORE)
    }

    /// Unconditional write; grows the buffer if needed. Used by generators.
    pub fn set(&mut self, p: V3, n: Node) {
        if !self.area.contains(p) {
            self.add_area(&Area::single(p));
        }
        let i = self.area.index(p);
        self.data[i] = n;
        self.flags[i] = CellState::Loaded;
    }

    /// Load every block touching `area` that is not already in the buffer.
    pub fn emerge(&mut self, map: &WorldMap, area: Area) {
        if area.is_empty() {
            return;
        }
        self.emerge_blocks(map, node_to_block(area.min), node_to_block(area.max));
    }

    /// Load the blocks `blockmin..=blockmax`.
    pub fn initial_emerge(&mut self, map: &WorldMap, blockmin: BlockPos, blockmax: BlockPos) {
        self.emerge_blocks(map, blockmin, blockmax);
    }

    fn emerge_blocks(&mut self, map: &WorldMap, bmin: BlockPos, bmax: BlockPos) {
        let node_area = Area::new(bmin.area().min, bmax.area().max);
        self.add_area(&node_area);
        let (mut copied, mut missing) = (0, 0);
        for z in bmin.z..=bmax.z {
            for y in bmin.y..=bmax.y {
                for x in bmin.x..=bmax.x {
                    let bp = BlockPos::new(x, y, z);
                    if self.loaded_blocks.contains_key(&bp) {
                        continue;
                    }
                    let existed = self.copy_from_block(map, bp);
                    if existed {
                        copied += 1;
                    } else {
                        missing += 1;
                    }
                    self.loaded_blocks.insert(bp, existed);
                }
            }
        }
        log::trace!(
            target: "map",
            "emerged {bmin}..{bmax}: {copied} blocks copied, {missing} missing"
        );
    }

    fn copy_from_block(&mut self, map: &WorldMap, bp: BlockPos) -> bool {
        let origin = bp.origin();
        let nodes = map.block(bp).and_then(|b| b.nodes());
        for p in bp.area().iter() {
            let i = self.area.index(p);
            match nodes {
                Some(nodes) => {
                    self.data[i] = nodes[local_index(p - origin)];
                    self.flags[i] = CellState::Loaded;
                }
                None => {
                    self.data[i] = Node::IGNORE;
                    self.flags[i] = CellState::Inexistent;
                }
            }
        }
        nodes.is_some()
    }

    /// Write back every loaded cell that differs from the live node. Cells
    /// whose block is gone are skipped. Returns the number of node writes.
    pub fn blit_back(&self, map: &mut WorldMap, modified: &mut BlockSet) -> usize {
        let mut writes = 0;
        for (i, p) in self.area.iter().enumerate() {
            if self.flags[i] != CellState::Loaded {
                continue;
            }
            let n = self.data[i];
            match map.node_at(p) {
                Some(cur) if cur != n => {
                    if map.put_node(p, n) {
                        modified.insert(node_to_block(p));
                        writes += 1;
                    }
                }
                _ => {}
            }
        }
        log::trace!(target: "map", "blit back wrote {writes} nodes");
        writes
    }

    fn block_nodes(&self, bp: BlockPos) -> Option<Vec<Node>> {
        let area = bp.area();
        if !self.area.contains_area(&area) {
            return None;
        }
        let s = BLOCK_SIZE;
        let mut out = Vec::with_capacity((s * s * s) as usize);
        // block-local order matches local_index: x fastest, then y, then z
        for p in area.iter() {
            out.push(self.data[self.area.index(p)]);
        }
        Some(out)
    }

    /// Copy every emerged block that exists in the world back wholesale.
    pub fn blit_back_all(&self, map: &mut WorldMap, modified: &mut BlockSet) {
        for (bp, existed) in self.loaded_blocks() {
            if !existed {
                continue;
            }
            let Some(nodes) = self.block_nodes(bp) else {
                continue;
            };
            let Some(block) = map.block_mut(bp) else {
                continue;
            };
            if block.copy_nodes_from(&nodes) {
                modified.insert(bp);
            }
        }
    }

    /// Like [`VoxelManip::blit_back_all`], then bring each block's metadata
    /// in line with its contents: nodes whose content carries initial
    /// metadata get a fresh record unless one of the same kind is present,
    /// other nodes lose theirs.
    pub fn blit_back_all_with_meta(&self, map: &mut WorldMap, modified: &mut BlockSet) {
        self.blit_back_all(map, modified);
        let reg = map.registry().clone();
        for (bp, existed) in self.loaded_blocks() {
            if !existed {
                continue;
            }
            let Some(block) = map.block_mut(bp) else {
                continue;
            };
            let Some(nodes) = block.nodes().map(|n| n.to_vec()) else {
                continue;
            };
            for (i, n) in nodes.iter().enumerate() {
                let idx = i as u16;
                let want = reg.get(n.content).initial_metadata;
                let have = block.meta.get(idx).map(|m| m.kind());
                match (want, have) {
                    (Some(k), Some(h)) if k == h => {}
                    (Some(k), _) => {
                        block.meta.set(idx, NodeMeta::create(k, ""));
                    }
                    (None, Some(_)) => {
                        block.meta.remove(idx);
                    }
                    (None, None) => {}
                }
            }
        }
    }
}

impl NodeContainer for VoxelManip {
    #[inline]
    fn node_at(&self, p: V3) -> Option<Node> {
        self.get(p)
    }

    /// Only cells that already hold data can be written through the
    /// container interface.
    #[inline]
    fn put_node(&mut self, p: V3, n: Node) -> bool {
        if self.state(p) != CellState::Loaded {
            return false;
        }
        let i = self.area.index(p);
        self.data[i] = n;
        true
    }
}
