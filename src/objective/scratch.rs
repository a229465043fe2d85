//! Per-worker scratch buffers for the query kernel.

/// Reusable buffers sized for the largest query.
///
/// One instance exists per worker; the kernel runs one query to completion on
/// one worker, so no buffer is ever shared.
#[derive(Debug, Default)]
pub(crate) struct QueryScratch {
    /// Rank-order permutation.
    pub perm: Vec<usize>,
    /// Working copy of the query's labels (shifted NDCG mutates them).
    pub labels: Vec<u32>,
    /// Working copy of the query's scores (suppression and the continuous
    /// cost variant mutate them).
    pub scores: Vec<f64>,
    /// Gains of the working labels.
    pub gains: Vec<f64>,
    /// Label-sort buffer for ideal-DCG recomputation.
    pub sorted_labels: Vec<u32>,
    /// Top label per duplicate group.
    pub group_tops: Vec<Option<u32>>,
}

impl QueryScratch {
    pub fn with_capacity(max_docs: usize) -> Self {
        Self {
            perm: Vec::with_capacity(max_docs),
            labels: Vec::with_capacity(max_docs),
            scores: Vec::with_capacity(max_docs),
            gains: Vec::with_capacity(max_docs),
            sorted_labels: Vec::with_capacity(max_docs),
            group_tops: Vec::with_capacity(max_docs),
        }
    }
}
