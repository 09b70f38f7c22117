use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use strata_blocks::{ContentRegistry, Node};
use strata_geom::V3;
use strata_lighting::update_lighting;
use strata_world::{BlockPos, BlockSet, MAP_GENERATION_LIMIT, MapBlock, WorldMap};

fn hilly_world() -> WorldMap {
    let mut map = WorldMap::new(Arc::new(ContentRegistry::builtin()), MAP_GENERATION_LIMIT);
    for bz in -1..=1 {
        for by in -1..=1 {
            for bx in -1..=1 {
                let bp = BlockPos::new(bx, by, bz);
                map.insert_block(MapBlock::new_filled(bp, Node::AIR)).unwrap();
            }
        }
    }
    for x in -16..32 {
        for z in -16..32 {
            let h = ((x * 7 + z * 13).rem_euclid(11)) - 6;
            for y in -16..=h {
                map.set_node(V3::new(x, y, z), Node::new(0)).unwrap();
            }
        }
    }
    map.set_node(V3::new(4, 8, 4), Node::new(4)).unwrap();
    map
}

fn bench_relight(c: &mut Criterion) {
    let mut group = c.benchmark_group("relight");
    let all: BlockSet = hilly_world().block_positions().into_iter().collect();
    let center: BlockSet = [BlockPos::new(0, 0, 0)].into_iter().collect();
    group.bench_function("relight_27_blocks", |b| {
        let mut map = hilly_world();
        b.iter(|| {
            let mut modified = BlockSet::new();
            update_lighting(&mut map, black_box(&all), &mut modified);
            black_box(modified.len())
        })
    });
    group.bench_function("relight_center_block", |b| {
        let mut map = hilly_world();
        b.iter(|| {
            let mut modified = BlockSet::new();
            update_lighting(&mut map, black_box(&center), &mut modified);
            black_box(modified.len())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_relight);
criterion_main!(benches);
