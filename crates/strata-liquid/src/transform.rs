use strata_blocks::{
    CONTENT_AIR, ContentId, LIQUID_FLOW_DOWN_MASK, LIQUID_LEVEL_MASK, LIQUID_LEVEL_MAX,
    LIQUID_LEVEL_SOURCE, LiquidType, WATER_DROP_BOOST,
};
use strata_geom::{FACE_DIRS, FACE_DOWN, FACE_UP, V3};
use strata_world::{BlockSet, WorldMap, node_to_block};

use crate::queue::LiquidQueue;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Side {
    Upper,
    Lower,
    Level,
}

#[derive(Copy, Clone, Debug)]
struct Neighbour {
    p: V3,
    param2: u8,
    side: Side,
}

/// What one call to [`transform_liquids`] did.
#[derive(Default, Debug)]
pub struct LiquidTick {
    pub modified: BlockSet,
    pub processed: usize,
    /// Positions dropped from the queue for exceeding the reflow limit.
    pub throttled: usize,
}

/// Advance queued liquid by one step. At most three times the queue's
/// starting length is processed, so a flood spreads over several calls.
/// Nodes still moving towards their target level under viscosity are
/// requeued at the end; one that has been requeued more than `max_reflow`
/// times in a row is dropped with a warning.
pub fn transform_liquids(
    map: &mut WorldMap,
    queue: &mut LiquidQueue,
    max_reflow: u32,
) -> LiquidTick {
    let reg = map.registry().clone();
    let mut tick = LiquidTick::default();
    let mut lighting_modified = BlockSet::new();
    let mut must_reflow: Vec<V3> = Vec::new();
    let budget = queue.len() * 3;

    while tick.processed < budget {
        let Some(p0) = queue.pop() else {
            break;
        };
        tick.processed += 1;

        let mut n0 = map.node(p0);
        let f0 = reg.get(n0.content);
        let liquid_type = f0.liquid_type;
        let (liquid_level, mut liquid_kind): (i8, ContentId) = match liquid_type {
            LiquidType::Source => (LIQUID_LEVEL_SOURCE as i8, f0.liquid_alternative_flowing),
            LiquidType::Flowing => ((n0.param2 & LIQUID_LEVEL_MASK) as i8, n0.content),
            LiquidType::None if n0.is_air() => (-1, CONTENT_AIR),
            LiquidType::None => {
                queue.settled(p0);
                continue;
            }
        };

        let mut sources = 0usize;
        let mut flows: Vec<Neighbour> = Vec::with_capacity(6);
        let mut airs: Vec<Neighbour> = Vec::with_capacity(6);
        let mut flowing_down = false;
        for (i, d) in FACE_DIRS.iter().enumerate() {
            let side = match i {
                FACE_UP => Side::Upper,
                FACE_DOWN => Side::Lower,
                _ => Side::Level,
            };
            let p = p0 + *d;
            let n = map.node(p);
            let nb = Neighbour { p, param2: n.param2, side };
            let nf = reg.get(n.content);
            match nf.liquid_type {
                LiquidType::None => {
                    if n.is_air() {
                        if side != Side::Upper && liquid_type != LiquidType::None {
                            queue.push(p);
                        }
                        if side == Side::Lower {
                            flowing_down = true;
                        }
                        airs.push(nb);
                    } else if side == Side::Lower && n.is_ignore() {
                        flowing_down = true;
                    }
                }
                LiquidType::Source => {
                    if liquid_kind == CONTENT_AIR {
                        liquid_kind = nf.liquid_alternative_flowing;
                    }
                    // a source below does not feed this node
                    if nf.liquid_alternative_flowing == liquid_kind && side != Side::Lower {
                        sources += 1;
                    }
                }
                LiquidType::Flowing => {
                    if liquid_kind == CONTENT_AIR {
                        liquid_kind = nf.liquid_alternative_flowing;
                    }
                    if nf.liquid_alternative_flowing == liquid_kind {
                        if side == Side::Lower {
                            flowing_down = true;
                        }
                        flows.push(nb);
                    }
                }
            }
        }

        let kind = reg.get(liquid_kind);
        let mut reflow = false;
        let (new_content, new_level): (ContentId, i8) =
            if sources >= 2 || liquid_type == LiquidType::Source {
                (kind.liquid_alternative_source, LIQUID_LEVEL_SOURCE as i8)
            } else if sources == 1 {
                (liquid_kind, LIQUID_LEVEL_MAX as i8)
            } else {
                let mut max_level: i8 = -1;
                for nb in &flows {
                    let level = (nb.param2 & LIQUID_LEVEL_MASK) as i8;
                    match nb.side {
                        Side::Upper => {
                            let dropped = (level + WATER_DROP_BOOST as i8).min(LIQUID_LEVEL_MAX as i8);
                            max_level = max_level.max(dropped);
                        }
                        Side::Lower => {}
                        Side::Level => {
                            if nb.param2 & LIQUID_FLOW_DOWN_MASK == 0 && level > 0 {
                                max_level = max_level.max(level - 1);
                            }
                        }
                    }
                }
                let viscosity = kind.liquid_viscosity as i8;
                let mut new_level = max_level;
                if viscosity > 1 && max_level != liquid_level {
                    let inc = max_level - liquid_level;
                    new_level = if inc < -viscosity || inc > viscosity {
                        liquid_level + inc / viscosity
                    } else if inc < 0 {
                        liquid_level - 1
                    } else {
                        liquid_level + 1
                    };
                    if new_level != max_level {
                        must_reflow.push(p0);
                        reflow = true;
                    }
                }
                let content = if new_level >= 0 { liquid_kind } else { CONTENT_AIR };
                (content, new_level)
            };

        let unchanged = new_content == n0.content
            && (liquid_type != LiquidType::Flowing
                || ((n0.param2 & LIQUID_LEVEL_MASK) as i8 == new_level
                    && n0.is_flowing_down() == flowing_down));
        if unchanged {
            queue.settled(p0);
            continue;
        }
        if !reflow {
            queue.settled(p0);
        }

        let old_glow = f0.light_source;
        let new_f = reg.get(new_content);
        n0.param2 = if new_f.liquid_type == LiquidType::Flowing {
            let down = if flowing_down { LIQUID_FLOW_DOWN_MASK } else { 0 };
            down | (new_level as u8 & LIQUID_LEVEL_MASK)
        } else {
            n0.param2 & !(LIQUID_LEVEL_MASK | LIQUID_FLOW_DOWN_MASK)
        };
        n0.content = new_content;
        if map.set_node(p0, n0).is_err() {
            continue;
        }
        let bp = node_to_block(p0);
        tick.modified.insert(bp);
        if new_f.light_source != 0 || old_glow != 0 {
            lighting_modified.insert(bp);
        }

        match new_f.liquid_type {
            LiquidType::Source | LiquidType::Flowing => {
                for nb in flows.iter().chain(airs.iter()) {
                    if nb.side != Side::Upper {
                        queue.push(nb.p);
                    }
                }
            }
            LiquidType::None => {
                for nb in &flows {
                    queue.push(nb.p);
                }
            }
        }
    }

    for p in must_reflow {
        if queue.note_reflow(p) > max_reflow {
            log::warn!(
                target: "liquid",
                "liquid at {p:?} still unsettled after {max_reflow} reflows, dropping it"
            );
            queue.settled(p);
            tick.throttled += 1;
            continue;
        }
        queue.push(p);
    }

    if !lighting_modified.is_empty() {
        strata_lighting::update_lighting(map, &lighting_modified, &mut tick.modified);
    }
    log::debug!(
        target: "liquid",
        "processed {} nodes, {} blocks modified, {} queued",
        tick.processed,
        tick.modified.len(),
        queue.len()
    );
    tick
}
