use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use gridsurv::dataset::Covariate;
use gridsurv::dataset::synthetic::synthesize_seeded;
use gridsurv::survival::{FitOptions, fit};
use gridsurv::views::{GroupBy, compute_view, group_survival};

const DATASET_SIZES: [usize; 3] = [120, 500, 2_000];

fn bench_fit(c: &mut Criterion) {
    let options = FitOptions::default();
    for size in DATASET_SIZES {
        let dataset = synthesize_seeded(size, 7);
        c.bench_with_input(BenchmarkId::new("cox_fit", size), &dataset, |b, dataset| {
            b.iter(|| fit(black_box(dataset), &options).expect("fit"));
        });
    }
}

fn bench_view(c: &mut Criterion) {
    let dataset = synthesize_seeded(500, 7);
    let model = fit(&dataset, &FitOptions::default()).expect("fit");
    c.bench_function("compute_view/500", |b| {
        b.iter(|| {
            compute_view(&dataset, &model, black_box(250), Some(GroupBy::Category)).expect("view")
        });
    });
    c.bench_function("group_survival/load/500", |b| {
        b.iter(|| group_survival(black_box(&dataset), GroupBy::Covariate(Covariate::Load)));
    });
}

criterion_group!(benches, bench_fit, bench_view);
criterion_main!(benches);
