//! Hook points for world generation. The store never decides what a block
//! contains; a [`Generator`] fills a staging buffer that is then committed.

use strata_blocks::{ContentRegistry, Node};
use strata_geom::V3;
use strata_world::{BLOCK_SIZE, BlockPos};

use crate::vmanip::VoxelManip;

/// Everything a generator gets to fill one block. The buffer already holds
/// the target block and its emerged neighbours.
pub struct BlockMakeData<'a> {
    pub blockpos: BlockPos,
    pub vmanip: &'a mut VoxelManip,
    pub reg: &'a ContentRegistry,
    pub seed: u64,
}

pub trait Generator: Send + Sync {
    /// Fill `data.blockpos` inside `data.vmanip`.
    fn make_block(&self, data: &mut BlockMakeData<'_>);

    /// Whether sunlight should never be projected into this block.
    fn is_underground(&self, blockpos: BlockPos) -> bool;
}

/// Flat terrain: `fill` below the surface, `top` as the surface layer at
/// `ground_y - 1`, air from `ground_y` up.
#[derive(Clone, Debug)]
pub struct FlatGenerator {
    pub ground_y: i32,
    pub fill: Node,
    pub top: Node,
}

impl FlatGenerator {
    pub fn new(ground_y: i32, fill: Node, top: Node) -> Self {
        Self { ground_y, fill, top }
    }

    /// Stone under grass when the table has them, otherwise the first
    /// solid content it finds.
    pub fn from_registry(reg: &ContentRegistry, ground_y: i32) -> Option<Self> {
        let fill = reg.id_by_name("stone")?;
        let top = reg.id_by_name("grass").unwrap_or(fill);
        Some(Self::new(ground_y, Node::new(fill), Node::new(top)))
    }

    #[inline]
    fn node_for_y(&self, y: i32) -> Node {
        if y < self.ground_y - 1 {
            self.fill
        } else if y == self.ground_y - 1 {
            self.top
        } else {
            Node::AIR
        }
    }
}

impl Generator for FlatGenerator {
    fn make_block(&self, data: &mut BlockMakeData<'_>) {
        let origin = data.blockpos.origin();
        for z in 0..BLOCK_SIZE {
            for y in 0..BLOCK_SIZE {
                for x in 0..BLOCK_SIZE {
                    let p = origin + V3::new(x, y, z);
                    data.vmanip.set(p, self.node_for_y(p.y));
                }
            }
        }
    }

    fn is_underground(&self, blockpos: BlockPos) -> bool {
        blockpos.area().max.y < self.ground_y - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layers_and_underground_flag() {
        let reg = ContentRegistry::builtin();
        let g = FlatGenerator::from_registry(&reg, 0).unwrap();
        let mut vm = VoxelManip::new();
        let mut data = BlockMakeData {
            blockpos: BlockPos::new(0, -1, 0),
            vmanip: &mut vm,
            reg: &reg,
            seed: 0,
        };
        g.make_block(&mut data);
        assert_eq!(vm.get(V3::new(0, -1, 0)), Some(g.top));
        assert_eq!(vm.get(V3::new(5, -2, 5)), Some(g.fill));
        assert!(!g.is_underground(BlockPos::new(0, -1, 0)));
        assert!(g.is_underground(BlockPos::new(0, -2, 0)));
        assert!(!g.is_underground(BlockPos::new(0, 0, 0)));
    }
}
