//! NDCG evaluator behaviour across the objective boundary, and the
//! early-stopping wrappers driven by real tests.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use lambdarank::metrics::early_stopping_metric_index;
use lambdarank::testing::synthetic_ranking;
use lambdarank::{
    FastNdcgTest, FastNdcgTestForTrainSet, LabelGains, LambdaRankObjective, LambdaRankParams,
    NdcgTest, Parallelism, RankingDataset, RankingTest, TestHistory, TestWindowWithTolerance,
    TieBreak,
};

fn objective<'d>(
    data: &'d RankingDataset,
    params: LambdaRankParams,
) -> LambdaRankObjective<'d> {
    LambdaRankObjective::new(data, params, Parallelism::Sequential).unwrap()
}

#[test]
fn train_set_test_matches_standard_on_single_positive_queries() {
    // One positively-labelled document per query and at most three documents,
    // so the ideal DCG is the same at every truncation level and the
    // train-set shortcut is exact.
    let data = RankingDataset::new(vec![0, 2, 5], vec![2, 0, 3, 0, 0]).unwrap();
    let scores = [0.3, 0.8, 0.1, 0.9, 0.5];

    let mut obj = objective(&data, LambdaRankParams::default());
    obj.get_gradient(&scores).unwrap();
    let train = FastNdcgTestForTrainSet::new().compute(&obj);

    let mut standard = NdcgTest::new(
        &data,
        LabelGains::default(),
        vec![1, 3],
        TieBreak::Conservative,
    )
    .unwrap();
    let full = standard.compute(&scores);

    assert_abs_diff_eq!(train[0].value, full[0].value, epsilon = 1e-12);
    assert_abs_diff_eq!(train[1].value, full[1].value, epsilon = 1e-12);
}

#[test]
fn train_set_test_tracks_the_last_gradient_pass() {
    let data = RankingDataset::new(vec![0, 2], vec![2, 0]).unwrap();
    let mut obj = objective(&data, LambdaRankParams::default());
    let test = FastNdcgTestForTrainSet::new();

    obj.get_gradient(&[1.0, 0.0]).unwrap();
    assert_abs_diff_eq!(test.compute(&obj)[0].value, 1.0, epsilon = 1e-12);

    // The value follows the scores handed to the objective, not the current
    // ensemble, so it moves only after the next gradient pass.
    obj.get_gradient(&[0.0, 1.0]).unwrap();
    assert!(test.compute(&obj)[0].value < 1.0);
}

#[test]
fn absolute_dcg_mode_reports_unnormalised_values() {
    let data = RankingDataset::new(vec![0, 2], vec![2, 0]).unwrap();
    let params = LambdaRankParams {
        use_dcg: true,
        ..Default::default()
    };
    let mut obj = objective(&data, params);
    obj.get_gradient(&[1.0, 0.0]).unwrap();

    // With the inverses pinned to 1 the "NDCG" is the raw DCG of the top
    // ranks: gain 3 at discount 1/ln 2.
    let values = FastNdcgTestForTrainSet::new().compute(&obj);
    assert_relative_eq!(values[0].value, 3.0 / 2.0f64.ln(), epsilon = 1e-12);
    assert!(values[0].value > 1.0);
}

#[test]
fn fast_test_agrees_with_standard_on_random_data() {
    let (data, scores) = synthetic_ranking(40, 35, 3);

    let mut standard = NdcgTest::with_defaults(&data, LabelGains::default()).unwrap();
    let expected = standard.compute(&scores);
    assert!(expected.iter().all(|v| (0.0..=1.0).contains(&v.value)));

    let mut fast = FastNdcgTest::new(
        &data,
        LabelGains::default(),
        vec![1, 3, 10],
        TieBreak::Conservative,
        Parallelism::Parallel,
    )
    .unwrap();
    assert_eq!(fast.compute(&scores), expected);
}

#[test]
fn reversing_score_signs_reverses_the_ranking() {
    let data = RankingDataset::new(vec![0, 3], vec![2, 1, 0]).unwrap();
    let mut test = NdcgTest::with_defaults(&data, LabelGains::default()).unwrap();

    let scores = [0.9, 0.5, 0.1];
    let reversed: Vec<f64> = scores.iter().map(|s| -s).collect();

    let forward = test.compute(&scores);
    let backward = test.compute(&reversed);

    // Perfect order forward, fully inverted backward.
    assert_abs_diff_eq!(forward[2].value, 1.0, epsilon = 1e-12);
    assert!(backward[2].value < forward[2].value);
    assert_abs_diff_eq!(backward[0].value, 0.0, epsilon = 1e-12);
}

#[test]
fn history_wrapping_a_test_tracks_improvement() {
    let data = RankingDataset::new(vec![0, 3], vec![2, 1, 0]).unwrap();
    let mut test = NdcgTest::with_defaults(&data, LabelGains::default()).unwrap();
    let mut history = TestHistory::new();

    // Successively better orderings.
    let bad = history.run(&mut test, &[0.1, 0.5, 0.9], 2);
    let mid = history.run(&mut test, &[0.5, 0.9, 0.1], 2);
    let good = history.run(&mut test, &[0.9, 0.5, 0.1], 2);

    assert_eq!(bad.name, "ndcg@10");
    assert!(bad.value < mid.value && mid.value < good.value);
    assert_eq!(history.best_iteration(), 2);
    assert_abs_diff_eq!(history.best_value().unwrap(), 1.0, epsilon = 1e-12);
}

#[test]
fn window_wrapping_a_test_stops_on_decay() {
    let data = RankingDataset::new(vec![0, 3], vec![2, 1, 0]).unwrap();
    let mut test = NdcgTest::with_defaults(&data, LabelGains::default()).unwrap();
    let mut window = TestWindowWithTolerance::new(2, 0.01);

    let metric = early_stopping_metric_index(1);
    assert!(!window.run(&mut test, &[0.9, 0.5, 0.1], metric));
    assert!(!window.run(&mut test, &[0.9, 0.5, 0.1], metric));
    // Collapse to the worst ordering; the moving average halves and falls
    // well below the best window.
    assert!(window.run(&mut test, &[0.1, 0.5, 0.9], metric));
    assert_eq!(window.best_iteration(), 0);
}

#[test]
fn shifted_query_scores_perfect_after_suppression() {
    // Scenario: both high-grade documents are duplicates of each other; the
    // standard test (duplicate-unaware) penalises the ranking, while the
    // objective's shifted view is ideal.
    let data = RankingDataset::new(vec![0, 3], vec![3, 3, 0])
        .unwrap()
        .with_dupe_ids(vec![2, 2, 1])
        .unwrap();
    // The second member of the duplicate group ranks below an irrelevant
    // document.
    let scores = [0.9, 0.1, 0.5];

    let params = LambdaRankParams {
        use_shifted_ndcg: true,
        ..Default::default()
    };
    let mut obj = objective(&data, params);
    obj.get_gradient(&scores).unwrap();

    let shifted = FastNdcgTestForTrainSet::new().compute(&obj);
    assert_abs_diff_eq!(shifted[1].value, 1.0, epsilon = 1e-12);

    let mut standard = NdcgTest::with_defaults(&data, LabelGains::default()).unwrap();
    let plain = standard.compute(&scores);
    assert!(plain[1].value < 1.0);
}
