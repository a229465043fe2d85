//! Regression-tree leaf surface and line-search output adjustment.
//!
//! The boosting outer loop owns tree induction; this subsystem only touches
//! the grown tree's leaf outputs. [`RegressionTree`] is the minimal leaf
//! container that crosses that boundary, [`DocumentPartition`] records which
//! documents landed in which leaf, and [`MeanReducer`] abstracts the
//! (possibly distributed) per-leaf mean used by the line search.

use crate::config::LambdaRankParams;

/// Epsilon guarding the line-search division.
pub const LINE_SEARCH_EPSILON: f64 = 1.4e-45;

// =============================================================================
// RegressionTree
// =============================================================================

/// Leaf outputs of one grown regression tree.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    leaf_outputs: Vec<f64>,
}

impl RegressionTree {
    /// Wrap raw leaf outputs.
    pub fn new(leaf_outputs: Vec<f64>) -> Self {
        Self { leaf_outputs }
    }

    /// Number of leaves.
    #[inline]
    pub fn n_leaves(&self) -> usize {
        self.leaf_outputs.len()
    }

    /// Output of leaf `leaf`.
    #[inline]
    pub fn leaf_output(&self, leaf: usize) -> f64 {
        self.leaf_outputs[leaf]
    }

    /// Overwrite the output of leaf `leaf`.
    #[inline]
    pub fn set_leaf_output(&mut self, leaf: usize, output: f64) {
        self.leaf_outputs[leaf] = output;
    }

    /// All leaf outputs.
    #[inline]
    pub fn leaf_outputs(&self) -> &[f64] {
        &self.leaf_outputs
    }
}

// =============================================================================
// DocumentPartition
// =============================================================================

/// Assignment of training documents to tree leaves.
#[derive(Debug, Clone)]
pub struct DocumentPartition {
    leaf_docs: Vec<Vec<usize>>,
}

impl DocumentPartition {
    /// Build from explicit per-leaf document lists.
    pub fn new(leaf_docs: Vec<Vec<usize>>) -> Self {
        Self { leaf_docs }
    }

    /// Build from a per-document leaf assignment.
    pub fn from_assignments(assignments: &[usize], n_leaves: usize) -> Self {
        let mut leaf_docs = vec![Vec::new(); n_leaves];
        for (doc, &leaf) in assignments.iter().enumerate() {
            leaf_docs[leaf].push(doc);
        }
        Self { leaf_docs }
    }

    /// Number of leaves.
    #[inline]
    pub fn n_leaves(&self) -> usize {
        self.leaf_docs.len()
    }

    /// Documents assigned to leaf `leaf`.
    #[inline]
    pub fn leaf_documents(&self, leaf: usize) -> &[usize] {
        &self.leaf_docs[leaf]
    }
}

// =============================================================================
// MeanReducer
// =============================================================================

/// Per-leaf mean of document weights over a partitioning.
///
/// The line search divides each leaf output by twice this mean. In
/// distributed training an implementation reduces the sums across workers;
/// [`SingleNodeReducer`] is the in-process version.
pub trait MeanReducer {
    /// Mean weight per leaf.
    ///
    /// When `filter_zero_lambdas` is set, documents whose weight is zero
    /// (untouched by any pair) are excluded from both sum and count. A leaf
    /// with no contributing documents gets mean 0.
    fn global_mean(
        &self,
        partition: &DocumentPartition,
        weights: &[f64],
        filter_zero_lambdas: bool,
    ) -> Vec<f64>;
}

/// In-process [`MeanReducer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleNodeReducer;

impl MeanReducer for SingleNodeReducer {
    fn global_mean(
        &self,
        partition: &DocumentPartition,
        weights: &[f64],
        filter_zero_lambdas: bool,
    ) -> Vec<f64> {
        (0..partition.n_leaves())
            .map(|leaf| {
                let mut sum = 0.0;
                let mut count = 0usize;
                for &doc in partition.leaf_documents(leaf) {
                    let w = weights[doc];
                    if filter_zero_lambdas && w == 0.0 {
                        continue;
                    }
                    sum += w;
                    count += 1;
                }
                if count == 0 {
                    0.0
                } else {
                    sum / count as f64
                }
            })
            .collect()
    }
}

// =============================================================================
// Line search
// =============================================================================

/// Rescale and clamp every leaf output along the Newton-step direction.
///
/// With `best_step_ranking_regression_trees` the grower already produced
/// Newton-optimal outputs and only the clamp applies.
pub(crate) fn adjust_leaf_outputs(
    tree: &mut RegressionTree,
    partition: &DocumentPartition,
    reducer: &dyn MeanReducer,
    weights: &[f64],
    params: &LambdaRankParams,
) {
    let max_output = params.max_tree_output;

    if params.best_step_ranking_regression_trees {
        for leaf in 0..tree.n_leaves() {
            let output = tree.leaf_output(leaf).clamp(-max_output, max_output);
            tree.set_leaf_output(leaf, output);
        }
        return;
    }

    let means = reducer.global_mean(partition, weights, params.filter_zero_lambdas);
    for leaf in 0..tree.n_leaves() {
        let output = (tree.leaf_output(leaf) + LINE_SEARCH_EPSILON)
            / (2.0 * means[leaf] + LINE_SEARCH_EPSILON);
        tree.set_leaf_output(leaf, output.clamp(-max_output, max_output));
    }
}
