//! Per-query lambda/weight kernel.
//!
//! For one query this computes the LambdaRank pseudo-gradient and Newton
//! weight of every document: sort by score, optionally neutralise duplicates
//! and apply the continuous cost mutation, then accumulate `|λ|·Δndcg` over
//! every label-dominant pair in ranked order. The pair loop is O(n²) in the
//! query size and is the training hot spot; everything it touches is either
//! query-local or a precomputed read-only table.

use crate::dcg::{inverse_max_dcg, DiscountTable, LabelGains};
use crate::dedup::suppress_duplicates;
use crate::sigmoid::SigmoidTable;
use crate::sort::{init_permutation, permutation_sort};

use super::scratch::QueryScratch;
use super::GradientError;

/// Read-only state shared by every query of one `get_gradient` call.
pub(crate) struct KernelContext<'a> {
    pub gains: &'a LabelGains,
    pub discount: &'a DiscountTable,
    pub sigmoid: &'a SigmoidTable,
    pub truncation: usize,
    pub use_shifted_ndcg: bool,
    pub continuous_cost: bool,
    pub distance_weight_2: bool,
    pub normalize_query_lambdas: bool,
    pub use_dcg: bool,
}

/// One query's slice of every per-document array.
///
/// The driver splits the output buffers along query boundaries, so the
/// mutable slices here are disjoint across workers by construction.
pub(crate) struct QueryJob<'a> {
    pub query: usize,
    pub labels: &'a [u32],
    pub dupe_ids: Option<&'a [u32]>,
    pub gain_labels: &'a [f64],
    pub scores: &'a [f64],
    pub gradients: &'a mut [f64],
    pub weights: &'a mut [f64],
    pub inv_max_dcg: &'a mut f64,
    pub top_labels: &'a mut [u32; 3],
}

/// Labels of the first `min(3, n)` ranked documents.
fn record_top_labels(top: &mut [u32; 3], perm: &[usize], labels: &[u32]) {
    for (slot, &p) in top.iter_mut().zip(perm.iter()) {
        *slot = labels[p];
    }
}

/// Compute lambdas and weights for one query.
pub(crate) fn query_gradient(
    mut job: QueryJob<'_>,
    ctx: &KernelContext<'_>,
    scratch: &mut QueryScratch,
) -> Result<(), GradientError> {
    let n = job.labels.len();

    job.gradients.fill(0.0);
    job.weights.fill(0.0);
    *job.top_labels = [0; 3];
    if n == 0 {
        return Ok(());
    }

    let QueryScratch {
        perm,
        labels: labels_buf,
        scores: scores_buf,
        gains: gains_buf,
        sorted_labels,
        group_tops,
    } = scratch;

    init_permutation(perm, n);

    let shifted = ctx.use_shifted_ndcg && job.dupe_ids.is_some();
    let mut num_actual = n;
    let mut inv = *job.inv_max_dcg;

    let (labels_view, scores_view, gain_view): (&[u32], &[f64], &[f64]) =
        if shifted || ctx.continuous_cost {
            // The kernel may rewrite labels and scores, so work on copies.
            labels_buf.clear();
            labels_buf.extend_from_slice(job.labels);
            scores_buf.clear();
            scores_buf.extend_from_slice(job.scores);

            permutation_sort(perm, scores_buf, labels_buf, 0);

            if let Some(dupe_ids) = job.dupe_ids.filter(|_| shifted) {
                suppress_duplicates(perm, labels_buf, scores_buf, dupe_ids, group_tops).map_err(
                    |source| GradientError::DuplicateSuppression {
                        query: job.query,
                        source,
                    },
                )?;
            }

            if ctx.continuous_cost {
                // Demote highly-rated documents a little so gradients don't
                // collapse to zero once the ordering is already correct.
                let demotion = 1.0 / (20.0 * ctx.gains.num_grades() as f64);
                for d in 0..n {
                    if scores_buf[d] == f64::NEG_INFINITY {
                        num_actual -= 1;
                    } else {
                        scores_buf[d] *= 1.0 - labels_buf[d] as f64 * demotion;
                    }
                }
            }

            // Inputs changed: suppressed documents must sink to the tail and
            // the ideal DCG must reflect the rewritten labels.
            permutation_sort(perm, scores_buf, labels_buf, 0);
            inv = if ctx.use_dcg {
                1.0
            } else {
                inverse_max_dcg(
                    labels_buf,
                    ctx.gains,
                    ctx.discount,
                    ctx.truncation,
                    sorted_labels,
                )
            };
            *job.inv_max_dcg = inv;

            gains_buf.clear();
            gains_buf.extend(labels_buf.iter().map(|&l| ctx.gains.gain(l)));

            (labels_buf.as_slice(), scores_buf.as_slice(), gains_buf.as_slice())
        } else {
            permutation_sort(perm, job.scores, job.labels, 0);
            (job.labels, job.scores, job.gain_labels)
        };

    // Capture the top of the final ranking. After suppression this reads the
    // rewritten labels, so the train-set NDCG sees the shifted state.
    record_top_labels(job.top_labels, perm, labels_view);

    // Pair accumulation over ranked positions. Only pairs where the document
    // at position `i` strictly label-dominates the one at `j` contribute;
    // iterating both orders therefore visits each dominant pair exactly once.
    // Suppressed documents carry label 0, so they never appear on the
    // dominant side and the score difference stays finite.
    let mut lambda_sum = 0.0;
    for i in 0..num_actual {
        let high = perm[i];
        let label_high = labels_view[high];
        if label_high == 0 {
            continue;
        }
        for j in 0..num_actual {
            if i == j {
                continue;
            }
            let low = perm[j];
            if label_high <= labels_view[low] {
                continue;
            }

            let lambda = ctx.sigmoid.value(scores_view[high] - scores_view[low]);
            let weight = lambda * (2.0 - lambda);

            let mut delta_ndcg = (gain_view[high] - gain_view[low])
                * (ctx.discount.get(i) - ctx.discount.get(j)).abs()
                * inv;
            if ctx.distance_weight_2 {
                delta_ndcg *= (i as f64 - j as f64).abs();
            }

            job.gradients[high] += lambda * delta_ndcg;
            job.gradients[low] -= lambda * delta_ndcg;
            job.weights[high] += weight * delta_ndcg;
            job.weights[low] += weight * delta_ndcg;
            lambda_sum += lambda * delta_ndcg;
        }
    }

    // Damp the dynamic range across queries with very different numbers of
    // confusable pairs.
    if ctx.normalize_query_lambdas && lambda_sum > 0.0 {
        let norm = 10.0 * (1.0 + lambda_sum).ln() / lambda_sum;
        for d in 0..n {
            job.gradients[d] *= norm;
            job.weights[d] *= norm;
        }
    }

    Ok(())
}
