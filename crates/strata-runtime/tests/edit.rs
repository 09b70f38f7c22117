use std::collections::HashMap;
use std::sync::Arc;

use strata_blocks::{ContentRegistry, LIGHT_SUN, LightBank, Node};
use strata_chunk::FlatGenerator;
use strata_geom::V3;
use strata_runtime::{MapEditKind, ServerMap};
use strata_world::{BlockPos, BlockSet, MapBlock, NodeMeta, WorldConfig};

const STONE: u16 = 0;
const GLASS: u16 = 3;
const TORCH: u16 = 4;
const WATER_FLOWING: u16 = 5;
const WATER_SOURCE: u16 = 6;
const SIGN: u16 = 9;
const FURNACE: u16 = 10;
const WIRE: u16 = 11;

/// Two layers of 3x3 air blocks, lit from an open sky.
fn air_world() -> ServerMap {
    let reg = Arc::new(ContentRegistry::builtin());
    let generator = FlatGenerator::from_registry(&reg, 0).unwrap();
    let mut sm = ServerMap::new(reg, WorldConfig::default(), Box::new(generator));
    let mut all = BlockSet::new();
    for bz in -1..=1 {
        for by in -1..=0 {
            for bx in -1..=1 {
                let bp = BlockPos::new(bx, by, bz);
                let mut block = MapBlock::new_filled(bp, Node::AIR);
                block.set_generated(true);
                sm.map_mut().insert_block(block).unwrap();
                all.insert(bp);
            }
        }
    }
    sm.update_lighting(&all);
    sm
}

fn day(sm: &ServerMap, p: V3) -> u8 {
    sm.node(p).light(LightBank::Day, sm.registry())
}

fn night(sm: &ServerMap, p: V3) -> u8 {
    sm.node(p).light(LightBank::Night, sm.registry())
}

#[test]
fn open_sky_is_sunlit() {
    let sm = air_world();
    assert_eq!(day(&sm, V3::new(5, 15, 5)), LIGHT_SUN);
    assert_eq!(day(&sm, V3::new(-7, -16, 9)), LIGHT_SUN);
    assert_eq!(night(&sm, V3::new(5, 15, 5)), 0);
}

#[test]
fn opaque_node_shades_the_column_below() {
    let mut sm = air_world();
    let p = V3::new(5, 10, 5);
    let modified = sm.add_node_and_update(p, Node::new(STONE), "").unwrap();
    assert!(modified.contains(&BlockPos::new(0, 0, 0)));
    assert!(modified.contains(&BlockPos::new(0, -1, 0)));

    assert_eq!(sm.node(p).content, STONE);
    // lit sideways from the sunlit neighbours only
    assert_eq!(day(&sm, V3::new(5, 9, 5)), 13);
    assert_eq!(day(&sm, V3::new(5, -16, 5)), 13);
    assert_eq!(day(&sm, V3::new(5, 11, 5)), LIGHT_SUN);
    assert_eq!(day(&sm, V3::new(6, 9, 5)), LIGHT_SUN);

    sm.remove_node_and_update(p).unwrap();
    assert!(sm.node(p).is_air());
    assert_eq!(day(&sm, p), LIGHT_SUN);
    assert_eq!(day(&sm, V3::new(5, 9, 5)), LIGHT_SUN);
    assert_eq!(day(&sm, V3::new(5, -16, 5)), LIGHT_SUN);
}

#[test]
fn clear_node_replacing_opaque_one_reopens_the_column() {
    let mut sm = air_world();
    let p = V3::new(5, 10, 5);
    sm.add_node_and_update(p, Node::new(STONE), "").unwrap();
    assert_eq!(day(&sm, V3::new(5, 9, 5)), 13);

    let modified = sm.add_node_and_update(p, Node::new(GLASS), "").unwrap();
    assert!(modified.contains(&BlockPos::new(0, -1, 0)));
    assert_eq!(sm.node(p).content, GLASS);
    assert_eq!(day(&sm, p), LIGHT_SUN);
    assert_eq!(day(&sm, V3::new(5, 9, 5)), LIGHT_SUN);
    assert_eq!(day(&sm, V3::new(5, -16, 5)), LIGHT_SUN);
    assert_eq!(day(&sm, V3::new(4, 0, 5)), LIGHT_SUN);
}

#[test]
fn torch_lights_the_night_and_removal_darkens_it() {
    let mut sm = air_world();
    let p = V3::new(0, 5, 0);
    sm.add_node_and_update(p, Node::new(TORCH), "").unwrap();
    assert_eq!(night(&sm, p), 13);
    assert_eq!(night(&sm, V3::new(3, 5, 0)), 10);
    assert_eq!(night(&sm, V3::new(0, 5, -3)), 10);
    assert_eq!(night(&sm, V3::new(0, 5, 13)), 0);
    assert_eq!(day(&sm, V3::new(3, 5, 0)), LIGHT_SUN);
    assert!(sm.day_night_diffed(BlockPos::new(0, 0, 0)));

    sm.remove_node_and_update(p).unwrap();
    assert_eq!(night(&sm, p), 0);
    assert_eq!(night(&sm, V3::new(3, 5, 0)), 0);
    assert_eq!(night(&sm, V3::new(0, 5, -3)), 0);
    assert_eq!(day(&sm, p), LIGHT_SUN);
    assert!(!sm.day_night_diffed(BlockPos::new(0, 0, 0)));
}

#[test]
fn edits_outside_loaded_blocks_fail() {
    let mut sm = air_world();
    assert!(sm.add_node_and_update(V3::new(0, 40, 0), Node::new(STONE), "").is_err());
    assert!(sm.remove_node_and_update(V3::new(0, -40, 0)).is_err());
}

#[test]
fn edit_events_always_go_out() {
    let mut sm = air_world();
    let rx = sm.subscribe();

    assert!(sm.add_node_with_event(V3::new(1, 1, 1), Node::new(STONE), "ann"));
    let ev = rx.try_recv().unwrap();
    assert_eq!(ev.kind, MapEditKind::AddNode);
    assert_eq!(ev.p, V3::new(1, 1, 1));
    assert_eq!(ev.n.content, STONE);
    assert!(ev.modified_blocks.contains(&BlockPos::new(0, 0, 0)));

    assert!(sm.remove_node_with_event(V3::new(1, 1, 1)));
    let ev = rx.try_recv().unwrap();
    assert_eq!(ev.kind, MapEditKind::RemoveNode);
    assert!(!ev.modified_blocks.is_empty());

    assert!(!sm.add_node_with_event(V3::new(0, 100, 0), Node::new(STONE), "ann"));
    let ev = rx.try_recv().unwrap();
    assert_eq!(ev.kind, MapEditKind::AddNode);
    assert!(ev.modified_blocks.is_empty());
    assert!(rx.try_recv().is_err());
    assert!(sm.events().needs_rebuild(BlockPos::new(0, 0, 0)));
}

#[test]
fn placed_nodes_get_their_initial_metadata() {
    let mut sm = air_world();
    let p = V3::new(2, 2, 2);
    sm.add_node_and_update(p, Node::new(SIGN), "ann").unwrap();
    let meta = sm.node_metadata(p).unwrap();
    assert!(matches!(meta, NodeMeta::Sign(_)));
    assert_eq!(meta.owner(), "ann");

    let rx = sm.subscribe();
    let fields = HashMap::from([("text".to_string(), "north".to_string())]);
    assert!(sm.receive_fields(p, &fields).unwrap());
    assert!(!sm.receive_fields(p, &fields).unwrap());
    assert_eq!(sm.node_metadata(p).unwrap().info_text(), "north");
    assert_eq!(rx.try_recv().unwrap().kind, MapEditKind::MetadataChanged);
    assert!(rx.try_recv().is_err());

    sm.remove_node_and_update(p).unwrap();
    assert!(sm.node_metadata(p).is_none());

    // plain content drops a stale record
    sm.add_node_and_update(p, Node::new(SIGN), "bo").unwrap();
    sm.add_node_and_update(p, Node::new(STONE), "bo").unwrap();
    assert!(sm.node_metadata(p).is_none());
}

#[test]
fn furnace_steps_report_changed_blocks() {
    let mut sm = air_world();
    let p = V3::new(-3, 4, 7);
    sm.add_node_and_update(p, Node::new(FURNACE), "").unwrap();
    let fields = HashMap::from([("fuel".to_string(), "4".to_string())]);
    assert!(sm.receive_fields(p, &fields).unwrap());

    let rx = sm.subscribe();
    assert!(sm.node_metadata_step(1.0).is_empty());
    let changed = sm.node_metadata_step(1.0);
    assert_eq!(changed, BlockSet::from([BlockPos::new(-1, 0, 0)]));
    let ev = rx.try_recv().unwrap();
    assert_eq!(ev.kind, MapEditKind::MetadataChanged);
    assert!(ev.modified_blocks.contains(&BlockPos::new(-1, 0, 0)));
    assert_eq!(
        sm.node_metadata(p).unwrap().info_text(),
        "Furnace is active"
    );
}

#[test]
fn wires_take_energy_from_neighbours() {
    let mut sm = air_world();
    let p = V3::new(4, 4, 4);
    sm.add_node_and_update(p, Node::new(WIRE), "").unwrap();
    assert!(sm.energise(p, 9, V3::new(3, 4, 4)).unwrap());
    assert!(!sm.energise(p, 9, V3::new(3, 4, 4)).unwrap());
    assert_eq!(sm.node_metadata(p).unwrap().info_text(), "Energy: 9");
    assert!(!sm.energise(V3::new(5, 4, 4), 9, p).unwrap());
    assert!(sm.energise(V3::new(0, 70, 0), 9, p).is_err());
}

#[test]
fn set_and_remove_metadata_directly() {
    let mut sm = air_world();
    let p = V3::new(1, 1, 1);
    let meta = NodeMeta::create(strata_blocks::MetaKind::Sign, "cy");
    sm.set_node_metadata(p, meta.clone()).unwrap();
    assert_eq!(sm.node_metadata(p), Some(&meta));
    assert_eq!(sm.remove_node_metadata(p), Some(meta));
    assert_eq!(sm.remove_node_metadata(p), None);
    assert!(sm.set_node_metadata(V3::new(0, 99, 0), NodeMeta::create(strata_blocks::MetaKind::Sign, "")).is_err());
}

#[test]
fn placed_water_is_queued_and_flows() {
    let mut sm = air_world();
    let p = V3::new(0, 5, 0);
    sm.add_node_and_update(p, Node::new(WATER_SOURCE), "").unwrap();
    // the source and its six air neighbours
    assert_eq!(sm.liquid_queue_len(), 7);

    let rx = sm.subscribe();
    let tick = sm.transform_liquids();
    assert!(tick.processed > 0);
    assert!(!tick.modified.is_empty());
    assert_eq!(sm.node(V3::new(1, 5, 0)).content, WATER_FLOWING);
    assert_eq!(sm.node(V3::new(1, 5, 0)).liquid_level(), 7);
    assert_eq!(sm.node(p).content, WATER_SOURCE);
    assert_eq!(rx.try_recv().unwrap().kind, MapEditKind::Other);
}

#[test]
fn relight_reports_unloaded_blocks() {
    let mut sm = air_world();
    assert!(sm.relight_block(BlockPos::new(5, 5, 5)).is_err());
    let modified = sm.relight_block(BlockPos::new(0, 0, 0)).unwrap();
    assert!(modified.contains(&BlockPos::new(0, 0, 0)));
    assert_eq!(day(&sm, V3::new(8, 8, 8)), LIGHT_SUN);
}
