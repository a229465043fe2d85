//! NDCG@k tests.
//!
//! Three variants, all scoring current ensemble outputs:
//!
//! - [`NdcgTest`] — full descending sort per query. The reference
//!   implementation, used for whole test sets.
//! - [`FastNdcgTest`] — same values, but queries are processed in parallel
//!   chunks with reusable sort buffers. Meant for the validation set that is
//!   scored every iteration.
//! - [`FastNdcgTestForTrainSet`] — reuses the score sort the objective
//!   already produced during gradient computation, avoiding a second sort.
//!   Its value can lag the true training NDCG by one iteration and is
//!   normalised by the ideal DCG at the objective's truncation level.

use std::ops::Range;

use crate::config::{ConfigError, TieBreak};
use crate::data::RankingDataset;
use crate::dcg::{inverse_max_dcg, DiscountTable, LabelGains};
use crate::objective::LambdaRankObjective;
use crate::sort::{init_permutation, permutation_sort_with};
use crate::utils::Parallelism;

use super::{MetricValue, RankingTest};

/// Truncation levels reported by default.
pub const DEFAULT_TRUNCATIONS: [usize; 3] = [1, 3, 10];

/// Queries per parallel work item in [`FastNdcgTest`].
const QUERY_CHUNK: usize = 256;

// =============================================================================
// Shared core
// =============================================================================

/// Precomputed state shared by the sorting NDCG tests.
struct NdcgCore<'d> {
    data: &'d RankingDataset,
    gains: LabelGains,
    discount: DiscountTable,
    tie_break: TieBreak,
    truncations: Vec<usize>,
    /// `inverse_ideal[t][q]` = 1 / ideal DCG@truncations[t] of query `q`,
    /// 0 for queries with no positive-gain document.
    inverse_ideal: Vec<Vec<f64>>,
}

impl<'d> NdcgCore<'d> {
    fn new(
        data: &'d RankingDataset,
        gains: LabelGains,
        truncations: Vec<usize>,
        tie_break: TieBreak,
    ) -> Result<Self, ConfigError> {
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
            .max(truncations.iter().copied().max().unwrap_or(1));
        let discount = DiscountTable::new(positions);

        let mut sort_scratch = Vec::new();
        let inverse_ideal = truncations
            .iter()
            .map(|&k| {
                (0..data.num_queries())
                    .map(|q| {
                        inverse_max_dcg(
                            data.query_labels(q),
                            &gains,
                            &discount,
                            k,
                            &mut sort_scratch,
                        )
                    })
                    .collect()
            })
            .collect();

        Ok(Self {
            data,
            gains,
            discount,
            tie_break,
            truncations,
            inverse_ideal,
        })
    }

    /// Sort one query and add its NDCG@k contributions to the accumulators.
    fn accumulate_query(
        &self,
        q: usize,
        scores: &[f64],
        perm: &mut Vec<usize>,
        sums: &mut [f64],
        counts: &mut [usize],
    ) {
        let (begin, end) = self.data.query_bounds(q);
        let n = end - begin;
        if n == 0 {
            return;
        }
        let labels = self.data.query_labels(q);

        init_permutation(perm, n);
        permutation_sort_with(perm, &scores[begin..end], labels, 0, self.tie_break);

        for (t, &k) in self.truncations.iter().enumerate() {
            let inv = self.inverse_ideal[t][q];
            if inv <= 0.0 {
                continue;
            }
            let dcg: f64 = perm
                .iter()
                .take(k)
                .enumerate()
                .map(|(pos, &p)| self.gains.gain(labels[p]) * self.discount.get(pos))
                .sum();
            sums[t] += dcg * inv;
            counts[t] += 1;
        }
    }

    fn metric_values(&self, sums: &[f64], counts: &[usize]) -> Vec<MetricValue> {
        self.truncations
            .iter()
            .enumerate()
            .map(|(t, &k)| {
                let value = if counts[t] == 0 {
                    0.0
                } else {
                    sums[t] / counts[t] as f64
                };
                MetricValue::new(format!("ndcg@{k}"), value, true)
            })
            .collect()
    }
}

// =============================================================================
// NdcgTest
// =============================================================================

/// Standard NDCG@k test: full sort of every query, mean over queries.
///
/// Queries whose ideal DCG is zero are excluded from the mean.
pub struct NdcgTest<'d> {
    core: NdcgCore<'d>,
    perm: Vec<usize>,
}

impl<'d> NdcgTest<'d> {
    /// Create the test for the given truncation levels.
    pub fn new(
        data: &'d RankingDataset,
        gains: LabelGains,
        truncations: Vec<usize>,
        tie_break: TieBreak,
    ) -> Result<Self, ConfigError> {
        let core = NdcgCore::new(data, gains, truncations, tie_break)?;
        Ok(Self {
            core,
            perm: Vec::with_capacity(data.max_docs_per_query()),
        })
    }

    /// Create the test with the default truncation levels (1, 3, 10).
    pub fn with_defaults(data: &'d RankingDataset, gains: LabelGains) -> Result<Self, ConfigError> {
        Self::new(data, gains, DEFAULT_TRUNCATIONS.to_vec(), TieBreak::default())
    }

    /// The truncation levels, in output order.
    pub fn truncations(&self) -> &[usize] {
        &self.core.truncations
    }
}

impl RankingTest for NdcgTest<'_> {
    fn compute(&mut self, scores: &[f64]) -> Vec<MetricValue> {
        let t = self.core.truncations.len();
        let mut sums = vec![0.0; t];
        let mut counts = vec![0usize; t];
        for q in 0..self.core.data.num_queries() {
            self.core
                .accumulate_query(q, scores, &mut self.perm, &mut sums, &mut counts);
        }
        self.core.metric_values(&sums, &counts)
    }
}

// =============================================================================
// FastNdcgTest
// =============================================================================

/// NDCG@k with chunked parallel query evaluation.
///
/// Produces exactly the same values as [`NdcgTest`]; chunk partial sums are
/// reduced in query order, so the result is independent of the worker count.
pub struct FastNdcgTest<'d> {
    core: NdcgCore<'d>,
    parallelism: Parallelism,
}

impl<'d> FastNdcgTest<'d> {
    pub fn new(
        data: &'d RankingDataset,
        gains: LabelGains,
        truncations: Vec<usize>,
        tie_break: TieBreak,
        parallelism: Parallelism,
    ) -> Result<Self, ConfigError> {
        let core = NdcgCore::new(data, gains, truncations, tie_break)?;
        Ok(Self { core, parallelism })
    }

    /// The truncation levels, in output order.
    pub fn truncations(&self) -> &[usize] {
        &self.core.truncations
    }
}

impl RankingTest for FastNdcgTest<'_> {
    fn compute(&mut self, scores: &[f64]) -> Vec<MetricValue> {
        let core = &self.core;
        let t = core.truncations.len();
        let num_queries = core.data.num_queries();
        let max_docs = core.data.max_docs_per_query();

        let chunks: Vec<Range<usize>> = (0..num_queries)
            .step_by(QUERY_CHUNK.max(1))
            .map(|start| start..(start + QUERY_CHUNK).min(num_queries))
            .collect();

        let partials = self.parallelism.maybe_par_map(chunks, |range| {
            let mut perm = Vec::with_capacity(max_docs);
            let mut sums = vec![0.0; t];
            let mut counts = vec![0usize; t];
            for q in range {
                core.accumulate_query(q, scores, &mut perm, &mut sums, &mut counts);
            }
            (sums, counts)
        });

        let mut sums = vec![0.0; t];
        let mut counts = vec![0usize; t];
        for (chunk_sums, chunk_counts) in partials {
            for i in 0..t {
                sums[i] += chunk_sums[i];
                counts[i] += chunk_counts[i];
            }
        }
        core.metric_values(&sums, &counts)
    }
}

// =============================================================================
// FastNdcgTestForTrainSet
// =============================================================================

/// Training-set NDCG from the objective's own score sort.
///
/// Reads the top-3 labels and ideal-DCG inverses the objective recorded
/// during its last gradient pass instead of sorting again. Two consequences,
/// both acceptable for a progress metric:
///
/// - the value reflects the scores that went *into* the last
///   [`get_gradient`](LambdaRankObjective::get_gradient) call, so it lags the
///   updated ensemble by one iteration;
/// - normalisation uses the ideal DCG at the objective's truncation level
///   rather than per reported `k`.
///
/// Reports NDCG@1 and NDCG@3.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastNdcgTestForTrainSet;

impl FastNdcgTestForTrainSet {
    pub fn new() -> Self {
        Self
    }

    /// Compute NDCG@1 and NDCG@3 from the objective's last gradient pass.
    pub fn compute(&self, objective: &LambdaRankObjective<'_>) -> Vec<MetricValue> {
        let data = objective.dataset();
        let gains = objective.label_gains();
        let discount = objective.discount();
        let tops = objective.top_labels_per_query();
        let inverse = objective.inverse_max_dcg();

        let mut sums = [0.0f64; 2];
        let mut count = 0usize;
        for q in 0..data.num_queries() {
            let inv = inverse[q];
            if inv <= 0.0 {
                continue;
            }
            let (begin, end) = data.query_bounds(q);
            let n = end - begin;

            let top1 = gains.gain(tops[q][0]) * discount.get(0);
            let top3: f64 = tops[q][..n.min(3)]
                .iter()
                .enumerate()
                .map(|(pos, &label)| gains.gain(label) * discount.get(pos))
                .sum();

            sums[0] += top1 * inv;
            sums[1] += top3 * inv;
            count += 1;
        }

        let mean = |sum: f64| if count == 0 { 0.0 } else { sum / count as f64 };
        vec![
            MetricValue::new("ndcg@1", mean(sums[0]), true),
            MetricValue::new("ndcg@3", mean(sums[1]), true),
        ]
    }
}
