use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use strata_blocks::{ContentRegistry, LIGHT_SUN, LightBank, Node};
use strata_chunk::FlatGenerator;
use strata_geom::V3;
use strata_io::FORMAT_VERSION;
use strata_io::format::serialize_block_version;
use strata_runtime::{MapEditKind, ServerMap};
use strata_world::{
    BlockPos, MapBlock, NodeMeta, SIGN_TEXT_MAX, SignMeta, WorldConfig, WorldError,
};

const STONE: u16 = 0;
const GRASS: u16 = 1;
const SIGN: u16 = 9;

fn config(dir: &Path) -> WorldConfig {
    WorldConfig {
        save_dir: dir.to_path_buf(),
        map_size_mb: 16,
        ..WorldConfig::default()
    }
}

fn open(dir: &Path) -> ServerMap {
    let reg = Arc::new(ContentRegistry::builtin());
    let generator = FlatGenerator::from_registry(&reg, 0).unwrap();
    ServerMap::open(reg, config(dir), Box::new(generator))
}

#[test]
fn generate_fills_block_and_prepares_neighbours() {
    let dir = tempfile::tempdir().unwrap();
    let mut sm = open(dir.path());
    let rx = sm.subscribe();

    let bp = BlockPos::new(0, -1, 0);
    let block = sm.emerge_block(bp, true).unwrap().unwrap();
    assert!(block.is_generated());
    assert_eq!(sm.node(V3::new(0, -1, 0)).content, GRASS);
    assert_eq!(sm.node(V3::new(3, -5, 3)).content, STONE);
    assert_eq!(sm.map().block_count(), 27);

    // neighbours exist but hold nothing yet
    let above = sm.map().block(BlockPos::new(0, 0, 0)).unwrap();
    assert!(!above.is_generated());
    assert!(sm.node(V3::new(3, 5, 3)).is_ignore());

    let ev = rx.try_recv().unwrap();
    assert_eq!(ev.kind, MapEditKind::Other);
    assert!(ev.modified_blocks.contains(&bp));

    let up = BlockPos::new(0, 0, 0);
    assert!(sm.emerge_block(up, true).unwrap().unwrap().is_generated());
    assert!(sm.node(V3::new(3, 5, 3)).is_air());
    assert_eq!(
        sm.node(V3::new(3, 5, 3)).light(LightBank::Day, sm.registry()),
        LIGHT_SUN
    );
}

#[test]
fn emerge_refuses_positions_over_the_limit() {
    let dir = tempfile::tempdir().unwrap();
    let mut sm = open(dir.path());
    let far = BlockPos::new(10_000, 0, 0);
    assert!(matches!(
        sm.emerge_block(far, true),
        Err(WorldError::OutOfBounds(_))
    ));
    assert!(sm.emerge_block(BlockPos::new(0, 0, 0), false).unwrap().is_none());
}

#[test]
fn save_writes_only_dirty_blocks_and_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let bp = BlockPos::new(0, -1, 0);
    {
        let mut sm = open(dir.path());
        assert!(sm.persistence_enabled());
        sm.emerge_block(bp, true).unwrap();
        sm.add_node_and_update(V3::new(2, -1, 2), Node::new(STONE), "").unwrap();

        let report = sm.save(true);
        assert_eq!(report.written, 27);
        assert_eq!(report.in_memory, 27);
        assert!(sm.map().blocks().all(|b| !b.is_modified()));
        assert_eq!(sm.save(true).written, 0);
        assert_eq!(sm.save(false).written, 27);

        let mut keys = sm.list_all_loadable_blocks().unwrap();
        keys.sort();
        assert_eq!(keys.len(), 27);
        assert!(keys.contains(&bp));
    }

    let mut sm = open(dir.path());
    let block = sm.emerge_block(bp, false).unwrap().unwrap();
    assert!(block.is_generated());
    assert!(!block.is_modified());
    assert_eq!(sm.node(V3::new(0, -1, 0)).content, GRASS);
    assert_eq!(sm.node(V3::new(2, -1, 2)).content, STONE);
}

#[test]
fn idle_blocks_are_written_then_evicted() {
    let dir = tempfile::tempdir().unwrap();
    let mut sm = open(dir.path());
    let bp = BlockPos::new(0, -1, 0);
    sm.emerge_block(bp, true).unwrap();

    assert!(sm.timer_update(10.0, 30.0).is_empty());
    assert_eq!(sm.map().block_count(), 27);

    let mut evicted = sm.timer_update(25.0, 30.0);
    evicted.sort();
    assert_eq!(evicted.len(), 27);
    assert_eq!(sm.map().block_count(), 0);
    assert_eq!(sm.map().column_count(), 0);
    assert_eq!(sm.list_all_loadable_blocks().unwrap().len(), 27);

    assert!(sm.load_block(bp));
    assert_eq!(sm.node(V3::new(0, -1, 0)).content, GRASS);
    assert_eq!(sm.map().block(bp).unwrap().usage_timer(), 0.0);
}

#[test]
fn emerge_resets_the_usage_timer() {
    let dir = tempfile::tempdir().unwrap();
    let mut sm = open(dir.path());
    let bp = BlockPos::new(0, -1, 0);
    sm.emerge_block(bp, true).unwrap();
    sm.timer_update(20.0, 30.0);
    sm.emerge_block(bp, false).unwrap();
    let evicted = sm.timer_update(20.0, 30.0);
    assert!(!evicted.contains(&bp));
    assert_eq!(evicted.len(), 26);
}

#[test]
fn old_format_is_rewritten_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut sm = open(dir.path());
    let bp = BlockPos::new(4, 2, -3);
    let mut block = MapBlock::new_filled(bp, Node::new(STONE));
    block.set_generated(true);
    let blob = serialize_block_version(&block, 1).unwrap();
    sm.store().unwrap().save_raw(bp, &blob).unwrap();

    assert!(sm.load_block(bp));
    let loaded = sm.map().block(bp).unwrap();
    assert!(!loaded.is_modified());
    assert_eq!(loaded.nodes(), block.nodes());
    let stored = sm.store().unwrap().load_raw(bp).unwrap().unwrap();
    assert_eq!(stored[0], FORMAT_VERSION);
}

#[test]
fn migrate_rewrites_the_whole_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut sm = open(dir.path());
    for x in 0..3 {
        let bp = BlockPos::new(x, 0, 0);
        let block = MapBlock::new_filled(bp, Node::new(STONE));
        let version = if x == 0 { FORMAT_VERSION } else { 1 };
        let blob = serialize_block_version(&block, version).unwrap();
        sm.store().unwrap().save_raw(bp, &blob).unwrap();
    }
    sm.store()
        .unwrap()
        .save_raw(BlockPos::new(9, 0, 0), &[FORMAT_VERSION, 0xff])
        .unwrap();

    let report = sm.migrate_store().unwrap();
    assert_eq!(report.scanned, 4);
    assert_eq!(report.migrated, 2);
    assert_eq!(report.quarantined, 1);
    assert_eq!(sm.list_all_loadable_blocks().unwrap().len(), 3);
    assert_eq!(sm.migrate_store().unwrap().migrated, 0);
    assert_eq!(sm.map().block_count(), 0);
}

#[test]
fn corrupt_blob_is_quarantined_and_regenerated() {
    let dir = tempfile::tempdir().unwrap();
    let mut sm = open(dir.path());
    let bp = BlockPos::new(0, -1, 0);
    sm.store()
        .unwrap()
        .save_raw(bp, &[FORMAT_VERSION, 0x01, 0x02])
        .unwrap();

    assert!(!sm.load_block(bp));
    assert_eq!(sm.store().unwrap().quarantined().unwrap(), vec![bp]);
    assert!(sm.persistence_enabled());

    let block = sm.emerge_block(bp, true).unwrap().unwrap();
    assert!(block.is_generated());
    assert_eq!(sm.node(V3::new(0, -1, 0)).content, GRASS);
}

#[test]
fn unusable_save_dir_leaves_the_world_in_memory() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut sm = open(file.path());
    assert!(!sm.persistence_enabled());

    let bp = BlockPos::new(0, -1, 0);
    sm.emerge_block(bp, true).unwrap();
    let report = sm.save(true);
    assert_eq!(report.written, 0);
    assert_eq!(report.in_memory, 27);
    assert!(sm.list_all_loadable_blocks().unwrap().is_empty());
    assert!(!sm.save_block(bp));

    // nothing can be written, so edited blocks outlive their timeout
    let evicted = sm.timer_update(100.0, 1.0);
    assert!(!evicted.contains(&bp));
    assert_eq!(evicted.len() + sm.map().block_count(), 27);
    assert!(sm.map().blocks().all(|b| b.is_modified()));
    assert_eq!(sm.node(V3::new(0, -1, 0)).content, GRASS);
}

#[test]
fn in_memory_session_keeps_edited_blocks() {
    let reg = Arc::new(ContentRegistry::builtin());
    let generator = FlatGenerator::from_registry(&reg, 0).unwrap();
    let mut sm = ServerMap::new(reg, WorldConfig::default(), Box::new(generator));
    let bp = BlockPos::new(0, 0, 0);
    sm.emerge_block(bp, true).unwrap();
    let p = V3::new(3, 2, 3);
    sm.add_node_and_update(p, Node::new(STONE), "").unwrap();

    let evicted = sm.timer_update(1e6, 30.0);
    assert!(!evicted.contains(&bp));
    assert!(sm.map().block(bp).unwrap().is_modified());
    sm.emerge_block(bp, true).unwrap();
    assert_eq!(sm.node(p).content, STONE);
}

#[test]
fn long_sign_text_survives_eviction() {
    let dir = tempfile::tempdir().unwrap();
    let mut sm = open(dir.path());
    let bp = BlockPos::new(0, 0, 0);
    sm.emerge_block(bp, true).unwrap();
    let p = V3::new(3, 2, 3);
    sm.add_node_and_update(p, Node::new(SIGN), "ann").unwrap();
    let fields = HashMap::from([("text".to_string(), "x".repeat(70_000))]);
    assert!(sm.receive_fields(p, &fields).unwrap());

    let evicted = sm.timer_update(1e6, 30.0);
    assert!(evicted.contains(&bp));
    assert!(sm.persistence_enabled());

    sm.emerge_block(bp, false).unwrap().unwrap();
    assert_eq!(sm.node(p).content, SIGN);
    assert_eq!(
        sm.node_metadata(p).unwrap().info_text(),
        "x".repeat(SIGN_TEXT_MAX)
    );
}

#[test]
fn unwritable_block_is_not_evicted() {
    let dir = tempfile::tempdir().unwrap();
    let mut sm = open(dir.path());
    let bp = BlockPos::new(0, 0, 0);
    sm.emerge_block(bp, true).unwrap();
    let p = V3::new(3, 2, 3);
    // too long for the block format, so serialization fails
    let meta = NodeMeta::Sign(SignMeta {
        text: "x".repeat(70_000),
        owner: "ann".to_string(),
    });
    sm.set_node_metadata(p, meta.clone()).unwrap();

    let evicted = sm.timer_update(1e6, 30.0);
    assert!(!evicted.contains(&bp));
    assert_eq!(evicted.len(), 26);
    assert!(sm.persistence_enabled());
    assert!(sm.map().block(bp).unwrap().is_modified());
    assert_eq!(sm.node_metadata(p), Some(&meta));
}
