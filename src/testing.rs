//! Synthetic ranking data for tests and benchmarks.

use rand::prelude::*;

use crate::data::RankingDataset;

/// Generate a seeded random ranking dataset with label-correlated scores.
///
/// Query sizes are uniform in `[1, max_docs_per_query]`, labels uniform over
/// the default five grades, and each score is `0.25 · label` plus uniform
/// noise in `[-0.5, 0.5]` — ordered enough to be realistic, noisy enough to
/// produce confusable pairs.
pub fn synthetic_ranking(
    num_queries: usize,
    max_docs_per_query: usize,
    seed: u64,
) -> (RankingDataset, Vec<f64>) {
    assert!(max_docs_per_query >= 1);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut boundaries = Vec::with_capacity(num_queries + 1);
    boundaries.push(0usize);
    let mut labels = Vec::new();
    let mut scores = Vec::new();

    for _ in 0..num_queries {
        let docs = rng.gen_range(1..=max_docs_per_query);
        for _ in 0..docs {
            let label = rng.gen_range(0u32..5);
            labels.push(label);
            scores.push(0.25 * label as f64 + rng.gen_range(-0.5..0.5));
        }
        boundaries.push(labels.len());
    }

    let dataset = RankingDataset::new(boundaries, labels)
        .expect("synthetic boundaries are valid by construction");
    (dataset, scores)
}

/// Uniform random scores in `[-1, 1]`.
pub fn random_scores(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}
