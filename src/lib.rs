//! lambdarank: LambdaRank objective and NDCG evaluation for gradient-boosted
//! ranking.
//!
//! This crate is the numerical core of a learning-to-rank trainer: given a
//! query-grouped dataset of relevance labels and the ensemble's current
//! per-document scores, it produces the per-document pseudo-gradients
//! (lambdas) and Newton weights that drive tree induction, rescales grown
//! leaf outputs along the Newton step, and scores NDCG@k for progress
//! monitoring and early stopping. The boosting outer loop, feature binning
//! and model persistence live elsewhere and talk to this crate through
//! [`LambdaRankObjective`], [`RegressionTree`]/[`DocumentPartition`] and the
//! [`RankingTest`] values.
//!
//! # Key Types
//!
//! - [`LambdaRankObjective`] - per-iteration gradient/weight computation
//! - [`LambdaRankParams`] - configuration (gains, truncation, option flags)
//! - [`RankingDataset`] - query boundaries, labels, duplicate-group ids
//! - [`NdcgTest`] / [`FastNdcgTest`] / [`FastNdcgTestForTrainSet`] - NDCG@k
//! - [`TestHistory`] / [`TestWindowWithTolerance`] - early stopping
//!
//! # Training loop sketch
//!
//! ```ignore
//! let mut objective = LambdaRankObjective::new(&data, params, parallelism)?;
//! let mut window = TestWindowWithTolerance::new(5, 0.01);
//! loop {
//!     objective.get_gradient(&scores)?;
//!     // ... grow a tree from objective.gradients() / objective.weights() ...
//!     objective.adjust_tree_outputs(&mut tree, &partition, &SingleNodeReducer);
//!     // ... add the tree to the ensemble, refresh scores ...
//!     let ndcg = FastNdcgTestForTrainSet::new().compute(&objective);
//!     if window.update_with_value(ndcg[0].value) {
//!         break;
//!     }
//! }
//! ```

// Re-export approx traits for users who want to compare metric values
pub use approx;

pub mod config;
pub mod data;
pub mod dcg;
pub mod dedup;
pub mod metrics;
pub mod objective;
pub mod sigmoid;
pub mod sort;
pub mod testing;
pub mod tree;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use config::{ConfigError, LambdaRankParams, TieBreak};
pub use data::{DatasetError, RankingDataset};
pub use dcg::{DiscountTable, LabelGains};
pub use metrics::{
    FastNdcgTest, FastNdcgTestForTrainSet, MetricValue, NdcgTest, PruningRule, RankingTest,
    TestHistory, TestWindowWithTolerance,
};
pub use objective::{GradientError, LambdaRankObjective};
pub use sigmoid::SigmoidTable;
pub use tree::{DocumentPartition, MeanReducer, RegressionTree, SingleNodeReducer};
pub use utils::{run_with_threads, Parallelism};
