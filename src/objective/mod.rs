//! The LambdaRank objective.
//!
//! [`LambdaRankObjective`] owns the per-iteration gradient/weight buffers and
//! the precomputed tables, and fans the per-query kernel out across worker
//! threads. Each boosting iteration the driver hands in the current scores
//! via [`get_gradient`](LambdaRankObjective::get_gradient) and reads back
//! per-document lambdas (pseudo-gradients) and weights; after growing a tree
//! it calls [`adjust_tree_outputs`](LambdaRankObjective::adjust_tree_outputs)
//! to line-search the leaf values.
//!
//! # Concurrency
//!
//! Queries are data-parallel: the output buffers are split along query
//! boundaries into disjoint mutable slices before the fan-out, each worker
//! reuses a private [`QueryScratch`], and everything else is read-only for
//! the duration of the call. Pair iteration inside a query follows the
//! deterministic sort order, so results are identical across runs and worker
//! counts.

mod kernel;
mod scratch;

use std::mem;

use crate::config::{ConfigError, LambdaRankParams};
use crate::data::RankingDataset;
use crate::dcg::{inverse_max_dcg, DiscountTable, LabelGains};
use crate::dedup::InvalidDupeGroup;
use crate::sigmoid::SigmoidTable;
use crate::tree::{adjust_leaf_outputs, DocumentPartition, MeanReducer, RegressionTree};
use crate::utils::Parallelism;

use kernel::{KernelContext, QueryJob};
use scratch::QueryScratch;

// =============================================================================
// GradientError
// =============================================================================

/// Fatal errors raised while computing gradients.
///
/// These indicate corrupt input, not a numerical edge; training must abort.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GradientError {
    #[error("query {query}: {source}")]
    DuplicateSuppression {
        query: usize,
        #[source]
        source: InvalidDupeGroup,
    },

    #[error("scores length {got} does not match dataset document count {expected}")]
    ScoresLenMismatch { got: usize, expected: usize },
}

// =============================================================================
// LambdaRankObjective
// =============================================================================

/// LambdaRank objective over a query-grouped dataset.
///
/// Construction validates the configuration, builds the gain/discount/sigmoid
/// tables and the per-query ideal-DCG inverses. The per-document gain is also
/// materialised once (`gain_labels`) so the pair loop doesn't chase a label
/// indirection.
#[derive(Debug)]
pub struct LambdaRankObjective<'d> {
    data: &'d RankingDataset,
    params: LambdaRankParams,
    parallelism: Parallelism,

    gains: LabelGains,
    discount: DiscountTable,
    sigmoid: SigmoidTable,
    gain_labels: Vec<f64>,

    gradients: Vec<f64>,
    weights: Vec<f64>,
    inverse_max_dcg: Vec<f64>,
    top_labels: Vec<[u32; 3]>,

    iteration: u64,
    /// Reserved hook for baseline-score blending; reset each iteration and
    /// currently never consumed.
    baseline_alpha: f64,
}

impl<'d> LambdaRankObjective<'d> {
    /// Create the objective for a dataset.
    pub fn new(
        data: &'d RankingDataset,
        params: LambdaRankParams,
        parallelism: Parallelism,
    ) -> Result<Self, ConfigError> {
        params.validate()?;

        let gains = match &params.custom_gains {
            Some(table) => LabelGains::new(table.clone())?,
            None => LabelGains::default(),
        };
        for (doc, &label) in data.labels().iter().enumerate() {
            if label as usize >= gains.num_grades() {
                return Err(ConfigError::LabelOutOfRange {
                    doc,
                    label,
                    grades: gains.num_grades(),
                });
            }
        }

        let positions = data
            .max_docs_per_query()
            .max(params.ndcg_truncation_level);
        let discount = match &params.position_discount_freeform {
            Some(f) => DiscountTable::with_fn(positions, f.as_ref()),
            None => DiscountTable::new(positions),
        };
        let sigmoid = SigmoidTable::new(params.sigmoid());

        let gain_labels: Vec<f64> = data.labels().iter().map(|&l| gains.gain(l)).collect();

        let mut sort_scratch = Vec::new();
        let inverse: Vec<f64> = (0..data.num_queries())
            .map(|q| {
                if params.use_dcg {
                    1.0
                } else {
                    inverse_max_dcg(
                        data.query_labels(q),
                        &gains,
                        &discount,
                        params.ndcg_truncation_level,
                        &mut sort_scratch,
                    )
                }
            })
            .collect();

        let num_docs = data.num_docs();
        let num_queries = data.num_queries();
        Ok(Self {
            data,
            params,
            parallelism,
            gains,
            discount,
            sigmoid,
            gain_labels,
            gradients: vec![0.0; num_docs],
            weights: vec![0.0; num_docs],
            inverse_max_dcg: inverse,
            top_labels: vec![[0; 3]; num_queries],
            iteration: 0,
            baseline_alpha: 0.0,
        })
    }

    /// Compute lambdas and weights for the given ensemble scores.
    ///
    /// Overwrites the buffers returned by [`gradients`](Self::gradients) and
    /// [`weights`](Self::weights). On error no output must be read; the
    /// buffers are partially written.
    pub fn get_gradient(&mut self, scores: &[f64]) -> Result<(), GradientError> {
        if scores.len() != self.data.num_docs() {
            return Err(GradientError::ScoresLenMismatch {
                got: scores.len(),
                expected: self.data.num_docs(),
            });
        }

        self.iteration += 1;
        self.baseline_alpha = 0.0;

        let ctx = KernelContext {
            gains: &self.gains,
            discount: &self.discount,
            sigmoid: &self.sigmoid,
            truncation: self.params.ndcg_truncation_level,
            use_shifted_ndcg: self.params.use_shifted_ndcg,
            continuous_cost: self.params.continuous_cost(),
            distance_weight_2: self.params.distance_weight_2,
            normalize_query_lambdas: self.params.normalize_query_lambdas,
            use_dcg: self.params.use_dcg,
        };

        // Split the output buffers along query boundaries: each job owns its
        // query's slice of every mutable array, so workers never alias.
        let data = self.data;
        let gain_labels = &self.gain_labels;
        let mut jobs = Vec::with_capacity(data.num_queries());
        let mut grad_rest = self.gradients.as_mut_slice();
        let mut weight_rest = self.weights.as_mut_slice();
        let inv_iter = self.inverse_max_dcg.iter_mut();
        let tops_iter = self.top_labels.iter_mut();
        for (q, (inv, tops)) in inv_iter.zip(tops_iter).enumerate() {
            let (begin, end) = data.query_bounds(q);
            let len = end - begin;
            let (grad, rest) = mem::take(&mut grad_rest).split_at_mut(len);
            grad_rest = rest;
            let (weight, rest) = mem::take(&mut weight_rest).split_at_mut(len);
            weight_rest = rest;

            jobs.push(QueryJob {
                query: q,
                labels: data.query_labels(q),
                dupe_ids: data.query_dupe_ids(q),
                gain_labels: &gain_labels[begin..end],
                scores: &scores[begin..end],
                gradients: grad,
                weights: weight,
                inv_max_dcg: inv,
                top_labels: tops,
            });
        }

        let max_docs = data.max_docs_per_query();
        self.parallelism.maybe_par_try_for_each_init(
            jobs,
            || QueryScratch::with_capacity(max_docs),
            |scratch, job| kernel::query_gradient(job, &ctx, scratch),
        )
    }

    /// Line-search rescale of a freshly grown tree's leaf outputs.
    ///
    /// Uses the weights of the most recent [`get_gradient`](Self::get_gradient)
    /// call; `reducer` supplies the (possibly distributed) per-leaf mean.
    pub fn adjust_tree_outputs(
        &self,
        tree: &mut RegressionTree,
        partition: &DocumentPartition,
        reducer: &dyn MeanReducer,
    ) {
        adjust_leaf_outputs(tree, partition, reducer, &self.weights, &self.params);
    }

    /// Per-document lambdas from the last iteration.
    #[inline]
    pub fn gradients(&self) -> &[f64] {
        &self.gradients
    }

    /// Per-document weights from the last iteration.
    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Per-query ideal-DCG inverses (recomputed per query when shifted NDCG
    /// or the continuous cost variant rewrites inputs).
    #[inline]
    pub fn inverse_max_dcg(&self) -> &[f64] {
        &self.inverse_max_dcg
    }

    /// Labels of each query's top three documents after the last score sort.
    #[inline]
    pub fn top_labels_per_query(&self) -> &[[u32; 3]] {
        &self.top_labels
    }

    /// Number of completed gradient iterations.
    #[inline]
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Reserved baseline blending factor; always zero after an iteration.
    #[inline]
    pub fn baseline_alpha(&self) -> f64 {
        self.baseline_alpha
    }

    /// The dataset this objective was built for.
    #[inline]
    pub fn dataset(&self) -> &'d RankingDataset {
        self.data
    }

    /// The active configuration.
    #[inline]
    pub fn params(&self) -> &LambdaRankParams {
        &self.params
    }

    /// The label-gain table in use.
    #[inline]
    pub fn label_gains(&self) -> &LabelGains {
        &self.gains
    }

    /// The position-discount table in use.
    #[inline]
    pub fn discount(&self) -> &DiscountTable {
        &self.discount
    }
}
