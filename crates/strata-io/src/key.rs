//! Packing block positions into the store's 64-bit keys.

use strata_world::BlockPos;

const RADIX: i64 = 4096;

/// `z * 4096² + y * 4096 + x`.
pub fn block_key(bp: BlockPos) -> i64 {
    i64::from(bp.z) * RADIX * RADIX + i64::from(bp.y) * RADIX + i64::from(bp.x)
}

fn unsigned_to_signed(v: i64, max_positive: i64) -> i64 {
    if v < max_positive { v } else { v - 2 * max_positive }
}

pub fn key_to_block(key: i64) -> BlockPos {
    let mut i = key;
    let x = unsigned_to_signed(i.rem_euclid(RADIX), RADIX / 2);
    i = (i - x) / RADIX;
    let y = unsigned_to_signed(i.rem_euclid(RADIX), RADIX / 2);
    i = (i - y) / RADIX;
    let z = unsigned_to_signed(i.rem_euclid(RADIX), RADIX / 2);
    BlockPos::new(x as i32, y as i32, z as i32)
}
