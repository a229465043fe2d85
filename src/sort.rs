//! Rank-order permutation sort.
//!
//! Sorting is done through an index permutation so the score and label
//! arrays stay untouched and the buffers can be reused across queries.
//! The comparator is a total order: score descending, then label ascending
//! (so on a tie the lower-labelled duplicate ranks first, which keeps NDCG
//! conservative), then raw index ascending. Pair iteration over the sorted
//! permutation is therefore deterministic, which makes gradients
//! bit-reproducible across runs and worker counts.

use std::cmp::Ordering;

use crate::config::TieBreak;

/// Composite comparison of documents `a` and `b` (query-local indices, with
/// `offset` translating into the backing arrays).
#[inline]
pub fn doc_order(scores: &[f64], labels: &[u32], offset: usize, a: usize, b: usize) -> Ordering {
    scores[offset + b]
        .partial_cmp(&scores[offset + a])
        .unwrap_or(Ordering::Equal)
        .then_with(|| labels[offset + a].cmp(&labels[offset + b]))
        .then_with(|| a.cmp(&b))
}

/// Fill `perm` with the identity permutation `0..n`.
#[inline]
pub fn init_permutation(perm: &mut Vec<usize>, n: usize) {
    perm.clear();
    perm.extend(0..n);
}

/// Sort `perm` into rank order over documents `offset..offset + perm.len()`.
pub fn permutation_sort(perm: &mut [usize], scores: &[f64], labels: &[u32], offset: usize) {
    perm.sort_by(|&a, &b| doc_order(scores, labels, offset, a, b));
}

/// [`permutation_sort`] with a selectable tie-break direction.
///
/// Used by the NDCG tests; the gradient kernel always sorts conservatively.
pub fn permutation_sort_with(
    perm: &mut [usize],
    scores: &[f64],
    labels: &[u32],
    offset: usize,
    tie_break: TieBreak,
) {
    match tie_break {
        TieBreak::Conservative => permutation_sort(perm, scores, labels, offset),
        TieBreak::Optimistic => perm.sort_by(|&a, &b| {
            scores[offset + b]
                .partial_cmp(&scores[offset + a])
                .unwrap_or(Ordering::Equal)
                .then_with(|| labels[offset + b].cmp(&labels[offset + a]))
                .then_with(|| a.cmp(&b))
        }),
    }
}
