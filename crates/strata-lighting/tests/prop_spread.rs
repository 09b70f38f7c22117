use proptest::prelude::*;
use std::sync::Arc;
use strata_blocks::{ContentRegistry, LightBank, Node, diminish_light};
use strata_geom::{FACE_DIRS, V3};
use strata_lighting::{LightSources, spread_light};
use strata_world::{
    BLOCK_VOLUME, BlockPos, BlockSet, MAP_GENERATION_LIMIT, MapBlock, NodeContainer, WorldMap,
    local_from_index,
};

fn build(cells: &[u8]) -> (WorldMap, LightSources) {
    let reg = Arc::new(ContentRegistry::builtin());
    let mut nodes = Vec::with_capacity(BLOCK_VOLUME);
    let mut torches = LightSources::new();
    for (i, &c) in cells.iter().enumerate() {
        let n = match c {
            0..=11 => Node::new(0),
            39 => {
                torches.insert(local_from_index(i));
                Node::new(4)
            }
            _ => Node::AIR,
        };
        nodes.push(n);
    }
    let mut map = WorldMap::new(reg, MAP_GENERATION_LIMIT);
    let block = MapBlock::from_nodes(BlockPos::new(0, 0, 0), nodes).unwrap();
    map.insert_block(block).unwrap();
    (map, torches)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // after spreading, no transparent node is darker than a neighbour's
    // light minus one step
    #[test]
    fn spread_reaches_a_fixed_point(
        cells in proptest::collection::vec(0u8..40, BLOCK_VOLUME)
    ) {
        let (mut map, torches) = build(&cells);
        let reg = map.registry().clone();
        let mut modified = BlockSet::new();
        spread_light(&mut map, &reg, LightBank::Night, torches, &mut modified);

        for i in 0..BLOCK_VOLUME {
            let p = local_from_index(i);
            let n = map.node_at(p).unwrap();
            if !reg.get(n.content).light_propagates {
                continue;
            }
            let here = n.light(LightBank::Night, &reg);
            for d in FACE_DIRS {
                let Some(m) = map.node_at(p + d) else { continue };
                let there = m.light(LightBank::Night, &reg);
                prop_assert!(here >= diminish_light(there), "{p:?} {here} next to {there}");
            }
        }
    }

    #[test]
    fn day_bank_untouched_by_night_spread(
        cells in proptest::collection::vec(0u8..40, BLOCK_VOLUME)
    ) {
        let (mut map, torches) = build(&cells);
        let reg = map.registry().clone();
        let mut modified = BlockSet::new();
        spread_light(&mut map, &reg, LightBank::Night, torches, &mut modified);
        for i in 0..BLOCK_VOLUME {
            let n = map.node_at(local_from_index(i)).unwrap();
            prop_assert_eq!(n.stored_light(LightBank::Day, &reg), 0);
        }
    }
}
