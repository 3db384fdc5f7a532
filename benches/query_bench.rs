use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rstar::{RTree, RTreeObject};
use spatial_map::SpatialMap;
use std::time::{Duration, Instant};

// Density: 0.4 pop/m^2
const QUERY_POP: u32 = 100_000;
const SIZE: f32 = 500.0;

#[derive(Clone)]
struct TreePoint {
    id: u32,
    pos: [f32; 2],
}

impl RTreeObject for TreePoint {
    type Envelope = rstar::AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        rstar::AABB::from_point(self.pos)
    }
}

fn query_setup(cell_size: f32) -> SpatialMap<u32> {
    let mut map = SpatialMap::new(cell_size).unwrap();
    for id in 0..QUERY_POP {
        let r = rand::random::<[f32; 2]>();
        map.set(id, [SIZE * r[0], SIZE * r[1]]);
    }
    map
}

#[inline(never)]
fn query_5_map(m: &SpatialMap<u32>, iter: u64) -> Duration {
    let map = m.clone();
    let start = Instant::now();

    for _ in 0..iter {
        let pos = [rand::random::<f32>() * SIZE, rand::random::<f32>() * SIZE];
        for k in map.query_around(pos, 5.0).unwrap() {
            black_box(k);
        }
    }

    start.elapsed()
}

#[inline(never)]
fn query_5_rstar(tree: &RTree<TreePoint>, iter: u64) -> Duration {
    let tree = tree.clone();
    let start = Instant::now();

    for _ in 0..iter {
        let pos = [rand::random::<f32>() * SIZE, rand::random::<f32>() * SIZE];
        for p in tree.locate_in_envelope(&rstar::AABB::from_corners(
            [pos[0] - 5.0, pos[1] - 5.0],
            [pos[0] + 5.0, pos[1] + 5.0],
        )) {
            black_box(p.id);
        }
    }

    start.elapsed()
}

fn query(c: &mut Criterion) {
    let mut c = c.benchmark_group("Query");
    let m5 = query_setup(5.0);
    let m10 = query_setup(10.0);
    let m20 = query_setup(20.0);

    let tree = RTree::bulk_load(
        (0..QUERY_POP)
            .map(|id| {
                let r = rand::random::<[f32; 2]>();
                TreePoint {
                    id,
                    pos: [SIZE * r[0], SIZE * r[1]],
                }
            })
            .collect(),
    );

    c.bench_function("query spatialmap05", |b| {
        b.iter_custom(|iter| query_5_map(&m5, iter))
    });
    c.bench_function("query spatialmap10", |b| {
        b.iter_custom(|iter| query_5_map(&m10, iter))
    });
    c.bench_function("query spatialmap20", |b| {
        b.iter_custom(|iter| query_5_map(&m20, iter))
    });
    c.bench_function("query rstar", |b| {
        b.iter_custom(|iter| query_5_rstar(&tree, black_box(iter)))
    });
    c.finish()
}

#[inline(never)]
fn churn_map(cell_size: f32, iter: u64) -> Duration {
    let mut map = SpatialMap::new(cell_size).unwrap();
    for id in 0..iter {
        let r = rand::random::<[f32; 2]>();
        map.set(id, [SIZE * r[0], SIZE * r[1]]);
    }

    let start = Instant::now();
    for id in 0..iter {
        let r = rand::random::<[f32; 2]>();
        map.set(id, [SIZE * r[0], SIZE * r[1]]);
    }
    start.elapsed()
}

fn churn(c: &mut Criterion) {
    let mut c = c.benchmark_group("Churn");
    c.bench_function("move spatialmap10", |b| {
        b.iter_custom(|iter| churn_map(10.0, iter))
    });
    c.finish()
}

criterion_group!(benches, query, churn);
criterion_main!(benches);
