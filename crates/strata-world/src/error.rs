use strata_geom::V3;

use crate::coords::BlockPos;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("block {0} is not loaded")]
    NotLoaded(BlockPos),
    #[error("position ({}, {}, {}) is outside the generation limit", .0.x, .0.y, .0.z)]
    OutOfBounds(V3),
}
