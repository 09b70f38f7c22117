use hashbrown::{HashMap, HashSet};
use strata_blocks::{ContentRegistry, LightBank, diminish_light, undiminish_light};
use strata_geom::{FACE_DIRS, V3};
use strata_world::{BlockSet, NodeContainer, node_to_block};

/// Positions whose light is believed correct and should be spread.
pub type LightSources = HashSet<V3>;
/// Positions that lost light, with the level each one had before.
pub type UnlightSeeds = HashMap<V3, u8>;

/// Remove light that flowed out of `from`. Works one wave at a time: every
/// neighbour dimmer than the seed's previous level is darkened and seeds
/// the next wave; brighter neighbours are collected in `light_sources` so a
/// following [`spread_light`] can refill the hole.
pub fn unspread_light<C: NodeContainer + ?Sized>(
    c: &mut C,
    reg: &ContentRegistry,
    bank: LightBank,
    from: UnlightSeeds,
    light_sources: &mut LightSources,
    modified: &mut BlockSet,
) {
    let mut wave = from;
    while !wave.is_empty() {
        let mut next = UnlightSeeds::new();
        for (pos, oldlight) in wave.drain() {
            if c.node_at(pos).is_none() {
                continue;
            }
            for d in FACE_DIRS {
                let n2pos = pos + d;
                let Some(mut n2) = c.node_at(n2pos) else {
                    continue;
                };
                let level = n2.light(bank, reg);
                let f = reg.get(n2.content);
                if level < oldlight {
                    if f.light_propagates && level != 0 {
                        n2.set_light(bank, 0, reg);
                        if c.put_node(n2pos, n2) {
                            modified.insert(node_to_block(n2pos));
                        }
                        let e = next.entry(n2pos).or_insert(0);
                        *e = (*e).max(level);
                    }
                    // emitters keep shining after their surroundings go dark
                    if f.light_source > 0 {
                        light_sources.insert(n2pos);
                    }
                } else {
                    light_sources.insert(n2pos);
                }
            }
        }
        wave = next;
    }
}

/// Spread light outward from `from` until nothing changes. A neighbour
/// brighter than what this node could have given it joins the next wave,
/// since it may light this node on its own turn.
pub fn spread_light<C: NodeContainer + ?Sized>(
    c: &mut C,
    reg: &ContentRegistry,
    bank: LightBank,
    from: LightSources,
    modified: &mut BlockSet,
) {
    let mut wave = from;
    while !wave.is_empty() {
        let mut next = LightSources::new();
        for pos in wave.drain() {
            let Some(n) = c.node_at(pos) else {
                continue;
            };
            let oldlight = n.light(bank, reg);
            let newlight = diminish_light(oldlight);
            for d in FACE_DIRS {
                let n2pos = pos + d;
                let Some(mut n2) = c.node_at(n2pos) else {
                    continue;
                };
                let level = n2.light(bank, reg);
                if level > undiminish_light(oldlight) {
                    next.insert(n2pos);
                }
                if level < newlight && reg.get(n2.content).light_propagates {
                    n2.set_light(bank, newlight, reg);
                    if c.put_node(n2pos, n2) {
                        modified.insert(node_to_block(n2pos));
                        next.insert(n2pos);
                    }
                }
            }
        }
        wave = next;
    }
}

/// Single-seed unspread followed by a spread from whatever bordered the
/// darkened region.
pub fn unlight_neighbors<C: NodeContainer + ?Sized>(
    c: &mut C,
    reg: &ContentRegistry,
    bank: LightBank,
    pos: V3,
    lightwas: u8,
    light_sources: &mut LightSources,
    modified: &mut BlockSet,
) {
    let mut from = UnlightSeeds::new();
    from.insert(pos, lightwas);
    unspread_light(c, reg, bank, from, light_sources, modified);
}

pub fn light_neighbors<C: NodeContainer + ?Sized>(
    c: &mut C,
    reg: &ContentRegistry,
    bank: LightBank,
    pos: V3,
    modified: &mut BlockSet,
) {
    let mut from = LightSources::new();
    from.insert(pos);
    spread_light(c, reg, bank, from, modified);
}

/// Loaded face neighbour with the highest light; first loaded one on ties.
pub fn brightest_neighbour<C: NodeContainer + ?Sized>(
    c: &C,
    reg: &ContentRegistry,
    bank: LightBank,
    pos: V3,
) -> Option<V3> {
    let mut best: Option<(V3, u8)> = None;
    for d in FACE_DIRS {
        let n2pos = pos + d;
        let Some(n2) = c.node_at(n2pos) else {
            continue;
        };
        let level = n2.light(bank, reg);
        if best.is_none_or(|(_, l)| level > l) {
            best = Some((n2pos, level));
        }
    }
    best.map(|(p, _)| p)
}
