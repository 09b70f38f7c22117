use serde::{Deserialize, Serialize};
use strata_geom::{Area, V3};

/// Edge length of a block in nodes.
pub const BLOCK_SIZE: i32 = 16;
pub const BLOCK_VOLUME: usize = (BLOCK_SIZE * BLOCK_SIZE * BLOCK_SIZE) as usize;
/// Default absolute node coordinate limit for generation.
pub const MAP_GENERATION_LIMIT: i32 = 31000;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    #[inline]
    pub fn with_y(self, y: i32) -> Self {
        Self { y, ..self }
    }

    /// Horizontal key of the owning column.
    #[inline]
    pub fn column(self) -> (i32, i32) {
        (self.x, self.z)
    }

    /// World position of the block's lowest corner node.
    #[inline]
    pub fn origin(self) -> V3 {
        V3::new(self.x, self.y, self.z) * BLOCK_SIZE
    }

    /// Node area covered by the block.
    #[inline]
    pub fn area(self) -> Area {
        let o = self.origin();
        Area::new(o, o + V3::splat(BLOCK_SIZE - 1))
    }

    #[inline]
    pub fn as_v3(self) -> V3 {
        V3::new(self.x, self.y, self.z)
    }

    /// The six face-adjacent blocks.
    pub fn face_neighbours(self) -> [BlockPos; 6] {
        strata_geom::FACE_DIRS.map(|d| self.offset(d.x, d.y, d.z))
    }
}

impl From<V3> for BlockPos {
    fn from(v: V3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<(i32, i32, i32)> for BlockPos {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl std::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}

#[inline]
pub fn node_to_block(p: V3) -> BlockPos {
    BlockPos::from(p.div_euclid(BLOCK_SIZE))
}

#[inline]
pub fn node_offset_in_block(p: V3) -> V3 {
    p.rem_euclid(BLOCK_SIZE)
}

/// Index of an in-block offset; x fastest, then y, then z.
#[inline]
pub fn local_index(rel: V3) -> usize {
    (rel.z as usize * BLOCK_SIZE as usize + rel.y as usize) * BLOCK_SIZE as usize + rel.x as usize
}

#[inline]
pub fn local_from_index(i: usize) -> V3 {
    let s = BLOCK_SIZE as usize;
    V3::new((i % s) as i32, ((i / s) % s) as i32, (i / (s * s)) as i32)
}

#[inline]
pub fn node_over_limit(p: V3, limit: i32) -> bool {
    p.x.abs() > limit || p.y.abs() > limit || p.z.abs() > limit
}

/// True when any part of the block lies past `limit` nodes from the origin.
#[inline]
pub fn block_over_limit(bp: BlockPos, limit: i32) -> bool {
    let a = bp.area();
    node_over_limit(a.min, limit) || node_over_limit(a.max, limit)
}
