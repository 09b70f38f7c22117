use strata_blocks::Node;
use strata_geom::V3;
use strata_io::{BlockStore, LoadOutcome, serialize_block};
use strata_world::{BlockPos, MapBlock};

fn stone_block(bp: BlockPos) -> MapBlock {
    let mut b = MapBlock::new_filled(bp, Node::AIR);
    b.set_node(V3::new(4, 4, 4), Node::new(0));
    b
}

#[test]
fn save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = BlockStore::open(dir.path(), 16).unwrap();
    let bp = BlockPos::new(-3, 2, 9);
    let b = stone_block(bp);
    store.save_block(&b).unwrap();

    match store.load_block(bp).unwrap() {
        LoadOutcome::Loaded { block, version } => {
            assert_eq!(block, b);
            assert_eq!(version, strata_io::FORMAT_VERSION);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        store.load_block(BlockPos::new(0, 0, 0)).unwrap(),
        LoadOutcome::Missing
    ));
}

#[test]
fn batch_save_and_listing() {
    let dir = tempfile::tempdir().unwrap();
    let store = BlockStore::open(dir.path(), 16).unwrap();
    let positions = [
        BlockPos::new(0, 0, 0),
        BlockPos::new(-1, 5, 3),
        BlockPos::new(100, -200, 7),
    ];
    let batch: Vec<_> = positions
        .iter()
        .map(|bp| (*bp, serialize_block(&stone_block(*bp)).unwrap()))
        .collect();
    assert_eq!(store.save_batch(&batch).unwrap(), 3);
    assert_eq!(store.save_batch(&[]).unwrap(), 0);

    let mut listed = store.list_all_keys().unwrap();
    listed.sort();
    let mut expected = positions.to_vec();
    expected.sort();
    assert_eq!(listed, expected);
    assert_eq!(store.len().unwrap(), 3);

    assert!(store.delete(positions[1]).unwrap());
    assert!(!store.delete(positions[1]).unwrap());
    assert_eq!(store.len().unwrap(), 2);
}

#[test]
fn corrupt_blob_is_reported_and_quarantined() {
    let dir = tempfile::tempdir().unwrap();
    let store = BlockStore::open(dir.path(), 16).unwrap();
    let bp = BlockPos::new(1, 1, 1);
    store.save_raw(bp, &[2, 0, 0, 0, 0, 9]).unwrap();

    let LoadOutcome::Corrupt { blob, .. } = store.load_block(bp).unwrap() else {
        panic!("expected corrupt outcome");
    };
    assert_eq!(blob, vec![2, 0, 0, 0, 0, 9]);

    assert!(store.quarantine(bp).unwrap());
    assert!(!store.quarantine(bp).unwrap());
    assert!(matches!(store.load_block(bp).unwrap(), LoadOutcome::Missing));
    assert_eq!(store.quarantined().unwrap(), vec![bp]);
    assert!(store.is_empty().unwrap());
}

#[test]
fn reopening_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let bp = BlockPos::new(7, -7, 0);
    {
        let store = BlockStore::open(dir.path(), 16).unwrap();
        store.save_block(&stone_block(bp)).unwrap();
    }
    let store = BlockStore::open(dir.path(), 16).unwrap();
    assert_eq!(store.list_all_keys().unwrap(), vec![bp]);
}
