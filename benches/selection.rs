use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use regsearch::prelude::*;

fn create_sales_data(n_rows: usize, distractors: usize) -> Dataset {
    LinearSpec::housing()
        .with_distractors(distractors)
        .generate(n_rows, 42)
        .unwrap()
}

fn bench_forward_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward_selection");
    let fitter = NormalEquationFitter::new();

    for distractors in [2, 8, 16].iter() {
        let ds = create_sales_data(1000, *distractors);
        let s = split(&ds, 0.3, 42).unwrap();

        group.bench_with_input(
            BenchmarkId::new("predictors", ds.n_predictors()),
            &s,
            |b, s| {
                b.iter(|| {
                    ForwardSelection::new(&fitter)
                        .run(black_box(s), &CancelToken::new())
                        .unwrap()
                })
            },
        );
    }

    group.finish();
}

fn bench_neighbor_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("knn_sweep");
    group.sample_size(10);

    for n_rows in [500, 2000, 5000].iter() {
        let ds = create_sales_data(*n_rows, 2);
        let (scaled, _) = split(&ds, 0.3, 42)
            .unwrap()
            .standardize(ScalingPolicy::TrainStatistics)
            .unwrap();
        let formula = LinearSpec::housing().formula().unwrap();

        group.bench_with_input(BenchmarkId::new("rows", n_rows), &scaled, |b, s| {
            b.iter(|| {
                NeighborSweep::default()
                    .run(black_box(s), &formula, &CancelToken::new())
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);

    for n_rows in [200, 1000].iter() {
        let ds = create_sales_data(*n_rows, 2);
        let pipeline = Pipeline::new(PipelineConfig::default().with_refine_step(0.05));

        group.bench_with_input(BenchmarkId::new("run", n_rows), &ds, |b, ds| {
            b.iter(|| pipeline.run(black_box(ds), &CancelToken::new()).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_forward_selection, bench_neighbor_sweep, bench_pipeline);
criterion_main!(benches);
