use strata_blocks::{ContentRegistry, LIGHT_SUN, LightBank, Node, diminish_light};
use strata_geom::V3;
use strata_world::{BLOCK_SIZE, BlockPos, BlockSet, NodeContainer, WorldMap, node_to_block};

use crate::spread::LightSources;

/// Fill full sunlight straight down from `start` until a node stops it or
/// the loaded region ends. Returns the lowest y that was lit, or
/// `start.y + 1` when nothing was.
pub fn propagate_sunlight<C: NodeContainer + ?Sized>(
    c: &mut C,
    reg: &ContentRegistry,
    start: V3,
    modified: &mut BlockSet,
) -> i32 {
    let mut y = start.y;
    loop {
        let pos = start.with_y(y);
        let Some(mut n) = c.node_at(pos) else {
            break;
        };
        if !reg.get(n.content).sunlight_propagates {
            break;
        }
        n.set_light(LightBank::Day, LIGHT_SUN, reg);
        if c.put_node(pos, n) {
            modified.insert(node_to_block(pos));
        }
        y -= 1;
    }
    y + 1
}

/// Project sunlight through one block from whatever sits above it and
/// collect the nodes that can pass light on. Returns false when the light
/// at the bottom face disagrees with the block below, which then needs
/// relighting too.
pub fn block_propagate_sunlight(
    map: &mut WorldMap,
    bp: BlockPos,
    light_sources: &mut LightSources,
) -> bool {
    let reg = map.registry().clone();
    let Some(block) = map.block(bp) else {
        return true;
    };
    if block.is_dummy() {
        return true;
    }
    let underground = block.is_underground();
    let origin = bp.origin();
    let s = BLOCK_SIZE;

    let mut lit_from_above = vec![false; (s * s) as usize];
    for z in 0..s {
        for x in 0..s {
            let above = origin + V3::new(x, s, z);
            let no_sun = match map.node_at(above) {
                Some(n) if n.is_ignore() => underground,
                Some(n) => n.light(LightBank::Day, &reg) != LIGHT_SUN,
                None => {
                    let top = block.node(V3::new(x, s - 1, z)).unwrap_or(Node::IGNORE);
                    underground || !reg.get(top.content).sunlight_propagates
                }
            };
            lit_from_above[(z * s + x) as usize] = !no_sun;
        }
    }

    let mut bottom_is_sun = vec![false; (s * s) as usize];
    let Some(block) = map.block_mut(bp) else {
        return true;
    };
    for z in 0..s {
        for x in 0..s {
            let col = (z * s + x) as usize;
            let mut current = if lit_from_above[col] { LIGHT_SUN } else { 0 };
            for y in (0..s).rev() {
                let rel = V3::new(x, y, z);
                let Some(mut n) = block.node(rel) else {
                    continue;
                };
                let f = reg.get(n.content);
                if current != 0 && (current != LIGHT_SUN || !f.sunlight_propagates) {
                    current = if f.light_propagates { diminish_light(current) } else { 0 };
                }
                if current > n.light(LightBank::Day, &reg) {
                    n.set_light(LightBank::Day, current, &reg);
                    block.set_node(rel, n);
                }
                if diminish_light(current) != 0 {
                    light_sources.insert(origin + rel);
                }
            }
            bottom_is_sun[col] = current == LIGHT_SUN;
        }
    }

    let mut below_valid = true;
    for z in 0..s {
        for x in 0..s {
            let Some(n) = map.node_at(origin + V3::new(x, -1, z)) else {
                continue;
            };
            if !reg.get(n.content).light_propagates {
                continue;
            }
            let below_sun = n.light(LightBank::Day, &reg) == LIGHT_SUN;
            if below_sun != bottom_is_sun[(z * s + x) as usize] {
                below_valid = false;
            }
        }
    }
    below_valid
}
