use strata_blocks::LightBank;
use strata_chunk::VoxelManip;
use strata_world::{BLOCK_SIZE, BLOCK_VOLUME, BlockPos, BlockSet, WorldMap, local_from_index};

use crate::spread::{LightSources, UnlightSeeds, spread_light, unspread_light};
use crate::sunlight::block_propagate_sunlight;

fn on_border(i: usize) -> bool {
    let rel = local_from_index(i);
    let edge = BLOCK_SIZE - 1;
    rel.x == 0 || rel.x == edge || rel.y == 0 || rel.y == edge || rel.z == 0 || rel.z == edge
}

/// Recompute one light bank for `blocks` from scratch. Border nodes seed an
/// unspread so light the blocks used to export is withdrawn first. For the
/// day bank, relighting walks down into lower blocks while sunlight at the
/// shared face disagrees.
pub fn update_lighting_bank(
    map: &mut WorldMap,
    bank: LightBank,
    blocks: &BlockSet,
    modified: &mut BlockSet,
) {
    let reg = map.registry().clone();
    let mut to_update = BlockSet::new();
    let mut light_sources = LightSources::new();
    let mut unlight_from = UnlightSeeds::new();

    // top down, so a block's sunlight is projected after the one above it
    let mut order: Vec<BlockPos> = blocks.iter().copied().collect();
    order.sort_by_key(|bp| std::cmp::Reverse(bp.y));
    for start in order {
        let mut bp = start;
        loop {
            let Some(block) = map.block_mut(bp) else {
                break;
            };
            if block.is_dummy() {
                break;
            }
            // already handled as the lower neighbour of another block
            if !to_update.insert(bp) {
                break;
            }
            modified.insert(bp);
            let origin = bp.origin();
            for i in 0..BLOCK_VOLUME {
                let rel = local_from_index(i);
                let Some(mut n) = block.node(rel) else {
                    continue;
                };
                let old = n.light(bank, &reg);
                n.set_light(bank, 0, &reg);
                block.set_node(rel, n);
                if reg.get(n.content).light_source != 0 {
                    light_sources.insert(origin + rel);
                }
                if on_border(i) {
                    unlight_from.insert(origin + rel, old);
                }
            }
            if bank == LightBank::Night {
                break;
            }
            if block_propagate_sunlight(map, bp, &mut light_sources) {
                break;
            }
            log::trace!(target: "lighting", "sunlight continues below {bp}");
            bp = bp.offset(0, -1, 0);
        }
    }

    let mut vm = VoxelManip::new();
    for &bp in &to_update {
        vm.initial_emerge(map, bp.offset(-1, -1, -1), bp.offset(1, 1, 1));
        if let Some(block) = map.block_mut(bp) {
            block.set_lighting_expired(false);
        }
    }
    let mut scratch = BlockSet::new();
    unspread_light(&mut vm, &reg, bank, unlight_from, &mut light_sources, &mut scratch);
    spread_light(&mut vm, &reg, bank, light_sources, &mut scratch);
    let writes = vm.blit_back(map, modified);
    log::debug!(
        target: "lighting",
        "relit {:?} bank over {} blocks, {} nodes written",
        bank,
        to_update.len(),
        writes
    );
}

/// Both banks, then refresh the day/night difference flag of every block
/// that was touched.
pub fn update_lighting(map: &mut WorldMap, blocks: &BlockSet, modified: &mut BlockSet) {
    for bank in LightBank::BOTH {
        update_lighting_bank(map, bank, blocks, modified);
    }
    update_day_night_diff(map, modified);
}

pub fn update_day_night_diff(map: &mut WorldMap, blocks: &BlockSet) {
    let reg = map.registry().clone();
    for &bp in blocks {
        if let Some(block) = map.block_mut(bp) {
            block.update_day_night_diff(&reg);
        }
    }
}

/// Whether the block or any face neighbour looks different by day and by
/// night, which decides if its appearance depends on the time of day.
pub fn day_night_diffed(map: &WorldMap, bp: BlockPos) -> bool {
    std::iter::once(bp)
        .chain(bp.face_neighbours())
        .filter_map(|p| map.block(p))
        .any(|b| b.day_night_differs())
}
