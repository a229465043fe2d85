//! LambdaRank training options and their validation.
//!
//! All options are validated up front (before any gradient work starts) by
//! [`LambdaRankParams::validate`]; the objective constructor calls it, so a
//! constructed objective always holds a consistent configuration.

use std::sync::Arc;

// =============================================================================
// ConfigError
// =============================================================================

/// Configuration errors, reported before training begins.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("label gain table needs at least {} entries, got {got}", crate::dcg::MIN_LABEL_GAINS)]
    LabelGainsTooShort { got: usize },

    #[error("ndcg truncation level must be at least 1")]
    InvalidTruncation,

    #[error("learning rate (sigmoid parameter) must be positive, got {got}")]
    InvalidSigmoid { got: f64 },

    #[error("early stopping metric must be 1 (NDCG@1) or 3 (NDCG@3), got {got}")]
    InvalidEarlyStoppingMetric { got: u32 },

    #[error("pruning window size must be at least 1")]
    InvalidPruningWindow,

    #[error("pruning threshold must lie in [0, 1), got {got}")]
    InvalidPruningThreshold { got: f64 },

    #[error("unsupported cost function parameter {got:?} (only 'c' is recognised)")]
    UnsupportedCostFunction { got: char },

    #[error("max tree output must be positive, got {got}")]
    InvalidMaxTreeOutput { got: f64 },

    #[error("label {label} at document {doc} exceeds the gain table ({grades} grades)")]
    LabelOutOfRange {
        doc: usize,
        label: u32,
        grades: usize,
    },
}

// =============================================================================
// TieBreak
// =============================================================================

/// Comparator variant used by the NDCG tests on score ties.
///
/// The objective kernel always sorts conservatively (lower label first on a
/// tie); the tests let the caller pick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// Score descending, label ascending on ties (pessimistic NDCG).
    #[default]
    Conservative,
    /// Score descending, label descending on ties (optimistic NDCG).
    Optimistic,
}

// =============================================================================
// LambdaRankParams
// =============================================================================

/// Type of the user-supplied position-discount function.
pub type DiscountFn = Arc<dyn Fn(usize) -> f64 + Send + Sync>;

/// Parameters for the LambdaRank objective and its NDCG tests.
#[derive(Clone)]
pub struct LambdaRankParams {
    /// Overrides the default `2^l − 1` label-gain table.
    /// Must have at least five entries.
    pub custom_gains: Option<Vec<f64>>,

    /// `k` for DCG@k in ideal-DCG computation and pair weighting.
    pub ndcg_truncation_level: usize,

    /// Optimise absolute DCG: every `inverse_max_dcg` is treated as 1.
    pub use_dcg: bool,

    /// Learning rate. Doubles as the sigmoid parameter `σ` of the pairwise
    /// gradient table.
    pub learning_rate: f64,

    /// Comparator variant used by the NDCG tests.
    pub sorting_algorithm: TieBreak,

    /// NDCG truncation monitored for early stopping: 1 or 3.
    pub early_stopping_metrics: u32,

    /// `'c'` enables the continuous-weighted cost variant, which slightly
    /// demotes highly-rated documents before the pair loop.
    pub cost_function_param: Option<char>,

    /// Multiply each pair's ΔNDCG by the rank distance `|i − j|`.
    pub distance_weight_2: bool,

    /// Rescale each query's lambdas by `10·ln(1 + Σ|λ|)/Σ|λ|`.
    pub normalize_query_lambdas: bool,

    /// Suppress non-best duplicates (shifted NDCG). Requires dupe ids on the
    /// dataset to have any effect.
    pub use_shifted_ndcg: bool,

    /// Documents with zero accumulated lambda are excluded from tree fitting
    /// and from the line-search mean. Honoured by the outer loop and the
    /// [`MeanReducer`](crate::tree::MeanReducer).
    pub filter_zero_lambdas: bool,

    /// Enable early stopping on the monitored NDCG metric.
    pub enable_pruning: bool,

    /// Use the windowed moving-average stopping rule instead of plain
    /// best-so-far tracking.
    pub use_tolerant_pruning: bool,

    /// Window size `W` for tolerant pruning.
    pub pruning_window_size: usize,

    /// Relative tolerance `τ` for tolerant pruning.
    pub pruning_threshold: f64,

    /// Compress the trained ensemble with Lasso after training. Consumed by
    /// the outer loop.
    pub compress_ensemble: bool,

    /// The tree grower already emits Newton-optimal leaf outputs, so
    /// line-search skips the global-mean normalisation and only clamps.
    pub best_step_ranking_regression_trees: bool,

    /// Clamp for line-search adjusted leaf outputs.
    pub max_tree_output: f64,

    /// Overrides the default `1/ln(2 + d)` position discount.
    pub position_discount_freeform: Option<DiscountFn>,
}

impl Default for LambdaRankParams {
    fn default() -> Self {
        Self {
            custom_gains: None,
            ndcg_truncation_level: 10,
            use_dcg: false,
            learning_rate: 0.2,
            sorting_algorithm: TieBreak::Conservative,
            early_stopping_metrics: 1,
            cost_function_param: None,
            distance_weight_2: false,
            normalize_query_lambdas: false,
            use_shifted_ndcg: false,
            filter_zero_lambdas: false,
            enable_pruning: false,
            use_tolerant_pruning: false,
            pruning_window_size: 5,
            pruning_threshold: 0.004,
            compress_ensemble: false,
            best_step_ranking_regression_trees: false,
            max_tree_output: 100.0,
            position_discount_freeform: None,
        }
    }
}

impl std::fmt::Debug for LambdaRankParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LambdaRankParams")
            .field("custom_gains", &self.custom_gains)
            .field("ndcg_truncation_level", &self.ndcg_truncation_level)
            .field("use_dcg", &self.use_dcg)
            .field("learning_rate", &self.learning_rate)
            .field("sorting_algorithm", &self.sorting_algorithm)
            .field("early_stopping_metrics", &self.early_stopping_metrics)
            .field("cost_function_param", &self.cost_function_param)
            .field("distance_weight_2", &self.distance_weight_2)
            .field("normalize_query_lambdas", &self.normalize_query_lambdas)
            .field("use_shifted_ndcg", &self.use_shifted_ndcg)
            .field("filter_zero_lambdas", &self.filter_zero_lambdas)
            .field("enable_pruning", &self.enable_pruning)
            .field("use_tolerant_pruning", &self.use_tolerant_pruning)
            .field("pruning_window_size", &self.pruning_window_size)
            .field("pruning_threshold", &self.pruning_threshold)
            .field("compress_ensemble", &self.compress_ensemble)
            .field(
                "best_step_ranking_regression_trees",
                &self.best_step_ranking_regression_trees,
            )
            .field("max_tree_output", &self.max_tree_output)
            .finish_non_exhaustive()
    }
}

impl LambdaRankParams {
    /// Check option consistency. Called by the objective constructor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(gains) = &self.custom_gains {
            if gains.len() < crate::dcg::MIN_LABEL_GAINS {
                return Err(ConfigError::LabelGainsTooShort { got: gains.len() });
            }
        }
        if self.ndcg_truncation_level == 0 {
            return Err(ConfigError::InvalidTruncation);
        }
        if !(self.learning_rate > 0.0) {
            return Err(ConfigError::InvalidSigmoid {
                got: self.learning_rate,
            });
        }
        if self.enable_pruning && !matches!(self.early_stopping_metrics, 1 | 3) {
            return Err(ConfigError::InvalidEarlyStoppingMetric {
                got: self.early_stopping_metrics,
            });
        }
        if self.use_tolerant_pruning && self.pruning_window_size == 0 {
            return Err(ConfigError::InvalidPruningWindow);
        }
        if self.use_tolerant_pruning && !(0.0..1.0).contains(&self.pruning_threshold) {
            return Err(ConfigError::InvalidPruningThreshold {
                got: self.pruning_threshold,
            });
        }
        if let Some(c) = self.cost_function_param {
            if c != 'c' {
                return Err(ConfigError::UnsupportedCostFunction { got: c });
            }
        }
        if !(self.max_tree_output > 0.0) {
            return Err(ConfigError::InvalidMaxTreeOutput {
                got: self.max_tree_output,
            });
        }
        Ok(())
    }

    /// Whether the continuous-weighted cost variant is active.
    #[inline]
    pub fn continuous_cost(&self) -> bool {
        self.cost_function_param == Some('c')
    }

    /// The sigmoid parameter `σ`.
    #[inline]
    pub fn sigmoid(&self) -> f64 {
        self.learning_rate
    }
}
