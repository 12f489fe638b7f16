use criterion::{black_box, criterion_group, criterion_main, Criterion};
use railmap_core::generation::budget::IterationBudget;
use railmap_core::generation::connectivity::cheapest_path;
use railmap_core::{generate, run_survey, verify, Coord, GeneratorConfig, Grid, Stage, TileKind};

fn bench_pipeline(c: &mut Criterion) {
    let config = GeneratorConfig::default().with_seed("bench");
    c.bench_function("generate_default_32x20", |b| {
        b.iter(|| generate(black_box(&config)))
    });

    let large = GeneratorConfig {
        width: 64,
        height: 40,
        path_length: 50,
        min_horizontal_distance: 36,
        min_grass_tile_count: 800,
        max_grass_tile_count: 1_700,
        min_wood_count: 40,
        min_iron_count: 30,
        resource_attempts: 120,
        ..GeneratorConfig::default().with_seed("bench-large")
    };
    c.bench_function("generate_64x40", |b| b.iter(|| generate(black_box(&large))));
}

fn bench_verify(c: &mut Criterion) {
    let config = GeneratorConfig::default().with_seed("bench-verify");
    if let Ok(map) = generate(&config) {
        c.bench_function("verify_default", |b| {
            b.iter(|| verify(black_box(&map), black_box(&config)))
        });
    }
}

fn bench_cheapest_path(c: &mut Criterion) {
    let mut grid = Grid::new(64, 40);
    for y in 0..39 {
        grid.set(Coord::new(20, y), TileKind::Mountain);
        grid.set(Coord::new(40, y + 1), TileKind::Mountain);
    }
    c.bench_function("cheapest_path_64x40", |b| {
        b.iter(|| {
            let mut guard = IterationBudget::new(100_000).guard(Stage::Connectivity, "bench");
            cheapest_path(
                black_box(&grid),
                Coord::new(1, 20),
                Coord::new(62, 20),
                |k| Some(u32::from(k == TileKind::Mountain)),
                &mut guard,
            )
        })
    });
}

fn bench_survey(c: &mut Criterion) {
    let config = GeneratorConfig::default().with_seed("bench-survey");
    c.bench_function("survey_16_seeds", |b| {
        b.iter(|| run_survey(black_box(&config), 16))
    });
}

criterion_group!(
    benches,
    bench_pipeline,
    bench_verify,
    bench_cheapest_path,
    bench_survey
);
criterion_main!(benches);
