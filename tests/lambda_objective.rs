//! End-to-end objective behaviour: gradient directions, symmetry, duplicate
//! suppression and query normalisation.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use lambdarank::testing::{random_scores, synthetic_ranking};
use lambdarank::{
    DocumentPartition, FastNdcgTestForTrainSet, LambdaRankObjective, LambdaRankParams, Parallelism,
    RankingDataset, RegressionTree, SingleNodeReducer,
};

fn objective<'d>(
    data: &'d RankingDataset,
    params: LambdaRankParams,
) -> LambdaRankObjective<'d> {
    LambdaRankObjective::new(data, params, Parallelism::Sequential).unwrap()
}

#[test]
fn two_documents_in_perfect_order() {
    let data = RankingDataset::new(vec![0, 2], vec![2, 0]).unwrap();
    let mut obj = objective(&data, LambdaRankParams::default());

    obj.get_gradient(&[1.0, 0.0]).unwrap();

    let g = obj.gradients();
    assert!(g[0] > 0.0);
    assert!(g[1] < 0.0);
    assert_abs_diff_eq!(g[0] + g[1], 0.0, epsilon = 1e-12);
    assert!(obj.weights().iter().all(|&w| w > 0.0));
}

#[test]
fn wrong_order_pulls_harder_than_right_order() {
    let data = RankingDataset::new(vec![0, 2], vec![2, 0]).unwrap();

    let mut right = objective(&data, LambdaRankParams::default());
    right.get_gradient(&[1.0, 0.0]).unwrap();
    let right_pull = right.gradients()[0];

    let mut wrong = objective(&data, LambdaRankParams::default());
    wrong.get_gradient(&[0.0, 1.0]).unwrap();
    let wrong_pull = wrong.gradients()[0];

    // The sigmoid is evaluated at −1 instead of +1, so |λ| grows.
    assert!(wrong_pull > right_pull);
    assert!(wrong_pull > 0.0);
}

#[test]
fn shifted_ndcg_suppresses_the_second_duplicate() {
    let data = RankingDataset::new(vec![0, 3], vec![3, 3, 0])
        .unwrap()
        .with_dupe_ids(vec![2, 2, 1])
        .unwrap();
    let params = LambdaRankParams {
        use_shifted_ndcg: true,
        ..Default::default()
    };
    let mut obj = objective(&data, params);

    obj.get_gradient(&[0.9, 0.8, 0.0]).unwrap();

    // The suppressed duplicate reads as label 0 and sinks to the tail, so
    // the recorded top labels are those of the shifted ranking.
    assert_eq!(obj.top_labels_per_query(), &[[3, 0, 0]]);

    // Ideal DCG was recomputed from the rewritten labels: a single grade-3
    // document at the top.
    let d0 = 1.0 / 2.0f64.ln();
    assert_relative_eq!(obj.inverse_max_dcg()[0], 1.0 / (7.0 * d0), epsilon = 1e-12);

    // The shifted ranking is ideal, so the training NDCG is exactly 1.
    let ndcg = FastNdcgTestForTrainSet::new().compute(&obj);
    assert_abs_diff_eq!(ndcg[0].value, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(ndcg[1].value, 1.0, epsilon = 1e-12);

    // Suppression keeps the pair accumulation symmetric.
    let sum: f64 = obj.gradients().iter().sum();
    assert_abs_diff_eq!(sum, 0.0, epsilon = 1e-12);
    assert!(obj.gradients()[0] > 0.0);
    assert!(obj.gradients()[1] < 0.0);
}

#[test]
fn query_normalisation_damps_pair_count_imbalance() {
    // Query 0: 1 positive + 10 negatives = 10 dominant pairs.
    // Query 1: 10 positives + 10 negatives = 100 dominant pairs.
    let mut labels = vec![1];
    labels.extend(std::iter::repeat(0).take(10));
    labels.extend(std::iter::repeat(1).take(10));
    labels.extend(std::iter::repeat(0).take(10));
    let data = RankingDataset::new(vec![0, 11, 31], labels).unwrap();
    let scores = vec![0.0; 31];

    let mass = |obj: &LambdaRankObjective<'_>, range: std::ops::Range<usize>| -> f64 {
        obj.gradients()[range].iter().map(|g| g.abs()).sum()
    };

    let mut plain = objective(&data, LambdaRankParams::default());
    plain.get_gradient(&scores).unwrap();
    let (m1, m2) = (mass(&plain, 0..11), mass(&plain, 11..31));

    let params = LambdaRankParams {
        normalize_query_lambdas: true,
        ..Default::default()
    };
    let mut normalised = objective(&data, params);
    normalised.get_gradient(&scores).unwrap();
    let (n1, n2) = (mass(&normalised, 0..11), mass(&normalised, 11..31));

    // With every pair contributing to exactly one positive and one negative
    // document, the unnormalised mass is twice the query's lambda sum; the
    // normalised mass ratio collapses to the ratio of log-compressed sums.
    let (s1, s2) = (m1 / 2.0, m2 / 2.0);
    assert!(m2 / m1 > 2.0);
    assert_relative_eq!(
        n2 / n1,
        (1.0 + s2).ln() / (1.0 + s1).ln(),
        epsilon = 1e-9
    );
    assert!(n2 / n1 < m2 / m1);
}

#[test]
fn per_query_gradient_sums_vanish_on_random_data() {
    let (data, scores) = synthetic_ranking(30, 40, 11);
    let mut obj = objective(&data, LambdaRankParams::default());
    obj.get_gradient(&scores).unwrap();

    for q in 0..data.num_queries() {
        let (begin, end) = data.query_bounds(q);
        let sum: f64 = obj.gradients()[begin..end].iter().sum();
        assert_abs_diff_eq!(sum, 0.0, epsilon = 1e-9);
    }
    assert!(obj.weights().iter().all(|&w| w >= 0.0));
    assert!(obj.gradients().iter().all(|g| g.is_finite()));
}

#[test]
fn inverse_max_dcg_ignores_scores_without_shifted_ndcg() {
    let (data, scores) = synthetic_ranking(12, 25, 5);
    let mut obj = objective(&data, LambdaRankParams::default());

    obj.get_gradient(&scores).unwrap();
    let first = obj.inverse_max_dcg().to_vec();

    obj.get_gradient(&random_scores(data.num_docs(), 99)).unwrap();
    assert_eq!(obj.inverse_max_dcg(), first.as_slice());
}

#[test]
fn positive_score_scaling_preserves_gradient_signs() {
    let data = RankingDataset::new(vec![0, 2], vec![2, 0]).unwrap();

    let mut base = objective(&data, LambdaRankParams::default());
    base.get_gradient(&[0.5, -0.5]).unwrap();

    let mut scaled = objective(&data, LambdaRankParams::default());
    scaled.get_gradient(&[5.0, -5.0]).unwrap();

    // Magnitudes change (the sigmoid sees a larger gap) but directions hold.
    assert!(base.gradients()[0] > 0.0 && scaled.gradients()[0] > 0.0);
    assert!(base.gradients()[1] < 0.0 && scaled.gradients()[1] < 0.0);
    assert!(scaled.gradients()[0] < base.gradients()[0]);
}

#[test]
fn empty_and_singleton_queries_contribute_nothing() {
    let data = RankingDataset::new(vec![0, 0, 1, 3], vec![2, 1, 0]).unwrap();
    let mut obj = objective(&data, LambdaRankParams::default());
    obj.get_gradient(&[0.4, 0.9, 0.1]).unwrap();

    // Query 1 is a singleton: no pairs.
    assert_eq!(obj.gradients()[0], 0.0);
    assert_eq!(obj.weights()[0], 0.0);
    // Query 2 produces the only non-zero entries.
    assert!(obj.gradients()[1] > 0.0);
}

#[test]
fn distance_weighting_changes_only_magnitudes() {
    let (data, scores) = synthetic_ranking(8, 15, 23);

    let mut plain = objective(&data, LambdaRankParams::default());
    plain.get_gradient(&scores).unwrap();

    let params = LambdaRankParams {
        distance_weight_2: true,
        ..Default::default()
    };
    let mut weighted = objective(&data, params);
    weighted.get_gradient(&scores).unwrap();

    for q in 0..data.num_queries() {
        let (begin, end) = data.query_bounds(q);
        let sum: f64 = weighted.gradients()[begin..end].iter().sum();
        assert_abs_diff_eq!(sum, 0.0, epsilon = 1e-9);
    }
    assert!(weighted.weights().iter().all(|&w| w >= 0.0));
    assert_ne!(plain.gradients(), weighted.gradients());
}

#[test]
fn adjust_tree_outputs_applies_line_search_and_clamp() {
    let data = RankingDataset::new(vec![0, 2], vec![2, 0]).unwrap();
    let params = LambdaRankParams {
        max_tree_output: 3.0,
        ..Default::default()
    };
    let mut obj = objective(&data, params);
    obj.get_gradient(&[1.0, 0.0]).unwrap();

    let mut tree = RegressionTree::new(vec![10.0, 0.1]);
    let partition = DocumentPartition::new(vec![vec![0], vec![1]]);
    obj.adjust_tree_outputs(&mut tree, &partition, &SingleNodeReducer);

    // Leaf 0: weights are small, so 10/(2μ) blows past the clamp.
    assert_eq!(tree.leaf_output(0), 3.0);
    // Leaf 1 stays within range but was rescaled.
    assert!(tree.leaf_output(1).abs() <= 3.0);
    assert_ne!(tree.leaf_output(1), 0.1);
}

#[test]
fn parallel_fan_out_is_deterministic() {
    let (data, scores) = synthetic_ranking(50, 30, 77);

    let mut seq = LambdaRankObjective::new(
        &data,
        LambdaRankParams::default(),
        Parallelism::Sequential,
    )
    .unwrap();
    seq.get_gradient(&scores).unwrap();

    let mut par =
        LambdaRankObjective::new(&data, LambdaRankParams::default(), Parallelism::Parallel)
            .unwrap();
    par.get_gradient(&scores).unwrap();
    par.get_gradient(&scores).unwrap();

    assert_eq!(seq.gradients(), par.gradients());
    assert_eq!(seq.weights(), par.weights());
}
