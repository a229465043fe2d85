//! Query-grouped ranking dataset.
//!
//! This is the read-only input to the objective and the NDCG tests: relevance
//! labels partitioned into contiguous queries by a boundary array, plus an
//! optional per-document duplicate-group id column used by shifted NDCG.

// =============================================================================
// Duplicate-id sentinels
// =============================================================================

/// No duplicate information is available for this document.
pub const DUPE_NO_INFO: u32 = 0;
/// The document is known to be unique within its query.
pub const DUPE_UNIQUE: u32 = 1;
/// The document format was not supported by duplicate detection.
pub const DUPE_FORMAT_UNSUPPORTED: u32 = 1_000_000;
/// The document was not found by duplicate detection.
pub const DUPE_NOT_FOUND: u32 = 1_000_001;

/// Returns `true` if a dupe id is one of the reserved sentinel values.
///
/// Any non-sentinel value `>= 2` denotes a duplicate group local to the
/// query, with group index `id - 2`.
#[inline]
pub fn is_dupe_sentinel(id: u32) -> bool {
    matches!(
        id,
        DUPE_NO_INFO | DUPE_UNIQUE | DUPE_FORMAT_UNSUPPORTED | DUPE_NOT_FOUND
    )
}

// =============================================================================
// DatasetError
// =============================================================================

/// Dataset construction/validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DatasetError {
    #[error("query boundaries must start at 0, got {got}")]
    BoundariesStart { got: usize },

    #[error("query boundaries must be non-decreasing: boundaries[{index}] = {value} is less than the previous boundary {previous}")]
    BoundariesNotMonotone {
        index: usize,
        value: usize,
        previous: usize,
    },

    #[error("query boundaries need at least 2 entries, got {got}")]
    BoundariesTooShort { got: usize },

    #[error("last boundary ({last}) does not match number of labels ({labels})")]
    BoundariesLabelMismatch { last: usize, labels: usize },

    #[error("number of dupe ids ({dupe_ids}) does not match number of labels ({labels})")]
    DupeIdLenMismatch { labels: usize, dupe_ids: usize },
}

// =============================================================================
// RankingDataset
// =============================================================================

/// A labelled, query-grouped dataset for learning to rank.
///
/// Query `q` owns the contiguous document range
/// `[boundaries[q], boundaries[q + 1])`. Labels are small non-negative
/// relevance grades that index into a label-gain table
/// (see [`LabelGains`](crate::dcg::LabelGains)).
///
/// The dataset is read-only during training; the objective copies the pieces
/// it needs to mutate (shifted NDCG, continuous cost) into per-worker
/// scratch.
#[derive(Debug, Clone)]
pub struct RankingDataset {
    boundaries: Vec<usize>,
    labels: Vec<u32>,
    dupe_ids: Option<Vec<u32>>,
    max_docs_per_query: usize,
}

impl RankingDataset {
    /// Create a dataset from query boundaries and relevance labels.
    pub fn new(boundaries: Vec<usize>, labels: Vec<u32>) -> Result<Self, DatasetError> {
        if boundaries.len() < 2 {
            return Err(DatasetError::BoundariesTooShort {
                got: boundaries.len(),
            });
        }
        if boundaries[0] != 0 {
            return Err(DatasetError::BoundariesStart { got: boundaries[0] });
        }
        for i in 1..boundaries.len() {
            if boundaries[i] < boundaries[i - 1] {
                return Err(DatasetError::BoundariesNotMonotone {
                    index: i,
                    value: boundaries[i],
                    previous: boundaries[i - 1],
                });
            }
        }
        let last = boundaries[boundaries.len() - 1];
        if last != labels.len() {
            return Err(DatasetError::BoundariesLabelMismatch {
                last,
                labels: labels.len(),
            });
        }

        let max_docs_per_query = boundaries
            .windows(2)
            .map(|w| w[1] - w[0])
            .max()
            .unwrap_or(0);

        Ok(Self {
            boundaries,
            labels,
            dupe_ids: None,
            max_docs_per_query,
        })
    }

    /// Attach per-document duplicate-group ids.
    ///
    /// Sentinel values are listed at the top of this module; any other value
    /// `>= 2` is a query-local duplicate group id. Group-range validity is
    /// checked per query during gradient computation, where the query context
    /// is known.
    pub fn with_dupe_ids(mut self, dupe_ids: Vec<u32>) -> Result<Self, DatasetError> {
        if dupe_ids.len() != self.labels.len() {
            return Err(DatasetError::DupeIdLenMismatch {
                labels: self.labels.len(),
                dupe_ids: dupe_ids.len(),
            });
        }
        self.dupe_ids = Some(dupe_ids);
        Ok(self)
    }

    /// Number of queries.
    #[inline]
    pub fn num_queries(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Total number of documents.
    #[inline]
    pub fn num_docs(&self) -> usize {
        self.labels.len()
    }

    /// Size of the largest query.
    #[inline]
    pub fn max_docs_per_query(&self) -> usize {
        self.max_docs_per_query
    }

    /// Document range `[begin, end)` of query `q`.
    #[inline]
    pub fn query_bounds(&self, q: usize) -> (usize, usize) {
        (self.boundaries[q], self.boundaries[q + 1])
    }

    /// Query boundary array (`num_queries + 1` entries).
    #[inline]
    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    /// All relevance labels.
    #[inline]
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Labels of query `q`.
    #[inline]
    pub fn query_labels(&self, q: usize) -> &[u32] {
        let (begin, end) = self.query_bounds(q);
        &self.labels[begin..end]
    }

    /// Duplicate-group ids, if attached.
    #[inline]
    pub fn dupe_ids(&self) -> Option<&[u32]> {
        self.dupe_ids.as_deref()
    }

    /// Duplicate-group ids of query `q`, if attached.
    #[inline]
    pub fn query_dupe_ids(&self, q: usize) -> Option<&[u32]> {
        let (begin, end) = self.query_bounds(q);
        self.dupe_ids.as_deref().map(|d| &d[begin..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_dataset() {
        let ds = RankingDataset::new(vec![0, 3, 5], vec![2, 0, 1, 3, 1]).unwrap();
        assert_eq!(ds.num_queries(), 2);
        assert_eq!(ds.num_docs(), 5);
        assert_eq!(ds.max_docs_per_query(), 3);
        assert_eq!(ds.query_bounds(1), (3, 5));
        assert_eq!(ds.query_labels(0), &[2, 0, 1]);
    }

    #[test]
    fn empty_query_allowed() {
        let ds = RankingDataset::new(vec![0, 0, 2], vec![1, 0]).unwrap();
        assert_eq!(ds.num_queries(), 2);
        assert_eq!(ds.query_bounds(0), (0, 0));
        assert!(ds.query_labels(0).is_empty());
    }

    #[test]
    fn rejects_bad_boundaries() {
        assert!(matches!(
            RankingDataset::new(vec![1, 3], vec![0, 0, 0]),
            Err(DatasetError::BoundariesStart { got: 1 })
        ));
        assert!(matches!(
            RankingDataset::new(vec![0, 3, 2], vec![0, 0, 0]),
            Err(DatasetError::BoundariesNotMonotone { index: 2, .. })
        ));
        assert!(matches!(
            RankingDataset::new(vec![0, 2], vec![0, 0, 0]),
            Err(DatasetError::BoundariesLabelMismatch { last: 2, labels: 3 })
        ));
        assert!(matches!(
            RankingDataset::new(vec![0], vec![]),
            Err(DatasetError::BoundariesTooShort { got: 1 })
        ));
    }

    #[test]
    fn rejects_dupe_id_len_mismatch() {
        let ds = RankingDataset::new(vec![0, 2], vec![1, 0]).unwrap();
        assert!(matches!(
            ds.with_dupe_ids(vec![2, 2, 1]),
            Err(DatasetError::DupeIdLenMismatch { .. })
        ));
    }

    #[test]
    fn sentinel_classification() {
        assert!(is_dupe_sentinel(DUPE_NO_INFO));
        assert!(is_dupe_sentinel(DUPE_UNIQUE));
        assert!(is_dupe_sentinel(DUPE_FORMAT_UNSUPPORTED));
        assert!(is_dupe_sentinel(DUPE_NOT_FOUND));
        assert!(!is_dupe_sentinel(2));
        assert!(!is_dupe_sentinel(999_999));
    }
}
