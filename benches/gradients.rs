//! Throughput of the objective's gradient pass across query shapes and
//! option combinations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use lambdarank::testing::synthetic_ranking;
use lambdarank::{LambdaRankObjective, LambdaRankParams, Parallelism};

fn bench_get_gradient(c: &mut Criterion) {
    let mut group = c.benchmark_group("objective/get_gradient");
    group.sample_size(20);

    for (queries, max_docs) in [(2_000usize, 20usize), (500, 100), (50, 400)] {
        let (data, scores) = synthetic_ranking(queries, max_docs, 42);
        group.throughput(Throughput::Elements(data.num_docs() as u64));

        for parallelism in [Parallelism::Sequential, Parallelism::Parallel] {
            let label = match parallelism {
                Parallelism::Sequential => "sequential",
                Parallelism::Parallel => "parallel",
            };
            group.bench_with_input(
                BenchmarkId::new(label, format!("{queries}q-max{max_docs}")),
                &scores,
                |b, scores| {
                    let mut objective =
                        LambdaRankObjective::new(&data, LambdaRankParams::default(), parallelism)
                            .unwrap();
                    b.iter(|| objective.get_gradient(black_box(scores)).unwrap());
                },
            );
        }
    }
    group.finish();
}

fn bench_option_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("objective/get_gradient/options");
    group.sample_size(20);

    let (data, scores) = synthetic_ranking(500, 100, 42);
    group.throughput(Throughput::Elements(data.num_docs() as u64));

    let variants: [(&str, LambdaRankParams); 3] = [
        ("default", LambdaRankParams::default()),
        (
            "normalized",
            LambdaRankParams {
                normalize_query_lambdas: true,
                ..Default::default()
            },
        ),
        (
            "continuous-cost",
            LambdaRankParams {
                cost_function_param: Some('c'),
                distance_weight_2: true,
                ..Default::default()
            },
        ),
    ];

    for (name, params) in variants {
        group.bench_with_input(BenchmarkId::from_parameter(name), &scores, |b, scores| {
            let mut objective =
                LambdaRankObjective::new(&data, params.clone(), Parallelism::Parallel).unwrap();
            b.iter(|| objective.get_gradient(black_box(scores)).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_get_gradient, bench_option_paths);
criterion_main!(benches);
