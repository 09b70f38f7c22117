use std::sync::Arc;

use proptest::prelude::*;
use strata_blocks::{ContentRegistry, Node};
use strata_geom::V3;
use strata_world::{
    BLOCK_SIZE, BlockPos, MAP_GENERATION_LIMIT, MapBlock, WorldMap, local_from_index, local_index,
    node_offset_in_block, node_to_block,
};

fn world_v3() -> impl Strategy<Value = V3> {
    let r = -MAP_GENERATION_LIMIT..=MAP_GENERATION_LIMIT;
    (r.clone(), r.clone(), r).prop_map(|(x, y, z)| V3::new(x, y, z))
}

proptest! {
    // node -> (block, offset) -> node is the identity
    #[test]
    fn block_and_offset_recompose(p in world_v3()) {
        let bp = node_to_block(p);
        let rel = node_offset_in_block(p);
        prop_assert_eq!(bp.origin() + rel, p);
        prop_assert!(bp.area().contains(p));
        prop_assert_eq!(local_from_index(local_index(rel)), rel);
    }

    // Two different nodes in the same block never share a local index
    #[test]
    fn local_index_is_injective(a in 0i32..16, b in 0i32..16, c in 0i32..16, d in 0i32..16) {
        let p = V3::new(a, b, c);
        let q = V3::new(d, b, c);
        prop_assert_eq!(local_index(p) == local_index(q), a == d);
    }

    // Interleaved lookups through the one-entry column cache agree with
    // what was written, including after removals
    #[test]
    fn cached_lookups_agree(ops in prop::collection::vec((-3i32..3, -2i32..2, -3i32..3, any::<bool>()), 1..40)) {
        let mut m = WorldMap::new(Arc::new(ContentRegistry::builtin()), MAP_GENERATION_LIMIT);
        let mut live = std::collections::BTreeSet::new();
        for (x, y, z, insert) in ops {
            let bp = BlockPos::new(x, y, z);
            if insert {
                m.insert_block(MapBlock::new_filled(bp, Node::new((x + 10) as u16))).unwrap();
                live.insert(bp);
            } else {
                prop_assert_eq!(m.remove_block(bp).is_some(), live.remove(&bp));
            }
            for q in &live {
                let b = m.block(*q);
                prop_assert!(b.is_some());
                prop_assert_eq!(b.unwrap().pos(), *q);
                let n = m.node(q.origin() + V3::splat(BLOCK_SIZE / 2));
                prop_assert_eq!(n, Node::new((q.x + 10) as u16));
            }
            prop_assert_eq!(m.block_count(), live.len());
        }
    }
}
