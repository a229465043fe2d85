//! Early-stopping wrappers over a ranking test.
//!
//! [`TestHistory`] records per-iteration values and tracks the best-seen
//! iteration; the outer loop uses it to truncate the ensemble back to its
//! best point. [`TestWindowWithTolerance`] adds the tolerant rule: compare
//! the moving average over the last `W` iterations against the best window
//! average seen so far, and stop once it drops below `best · (1 − τ)`.
//!
//! Both accept values directly (`update_with_value`) so any test variant —
//! including the train-set test, which is driven off the objective rather
//! than a score buffer — can feed them.

use super::{MetricValue, RankingTest};

// =============================================================================
// TestHistory
// =============================================================================

/// Per-iteration record of a monitored metric with best-so-far tracking.
///
/// Higher values are treated as better, matching every NDCG variant.
#[derive(Debug, Clone, Default)]
pub struct TestHistory {
    values: Vec<f64>,
    best_iteration: usize,
}

impl TestHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one iteration's value. Returns `true` if it is a new best.
    pub fn update_with_value(&mut self, value: f64) -> bool {
        let improved = match self.best_value() {
            None => true,
            Some(best) => value > best,
        };
        self.values.push(value);
        if improved {
            self.best_iteration = self.values.len() - 1;
        }
        improved
    }

    /// Run `test`, record the selected metric, and return its value.
    pub fn run(&mut self, test: &mut dyn RankingTest, scores: &[f64], metric: usize) -> MetricValue {
        let value = test.compute(scores).swap_remove(metric);
        self.update_with_value(value.value);
        value
    }

    /// Best value recorded so far.
    pub fn best_value(&self) -> Option<f64> {
        self.values.get(self.best_iteration).copied()
    }

    /// Iteration index (0-based) of the best value.
    pub fn best_iteration(&self) -> usize {
        self.best_iteration
    }

    /// Number of recorded iterations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All recorded values, oldest first.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

// =============================================================================
// TestWindowWithTolerance
// =============================================================================

/// Windowed moving-average early stopping with relative tolerance.
///
/// Until `window` values exist the average is taken over everything seen so
/// far.
#[derive(Debug, Clone)]
pub struct TestWindowWithTolerance {
    window: usize,
    tolerance: f64,
    values: Vec<f64>,
    best_average: f64,
    best_iteration: usize,
}

impl TestWindowWithTolerance {
    /// Create the rule with window size `window` and relative tolerance
    /// `tolerance`.
    pub fn new(window: usize, tolerance: f64) -> Self {
        debug_assert!(window >= 1);
        debug_assert!((0.0..1.0).contains(&tolerance));
        Self {
            window,
            tolerance,
            values: Vec::new(),
            best_average: f64::NEG_INFINITY,
            best_iteration: 0,
        }
    }

    /// Record one iteration's value. Returns `true` when training should
    /// stop.
    pub fn update_with_value(&mut self, value: f64) -> bool {
        self.values.push(value);

        let tail = self.values.len().min(self.window);
        let start = self.values.len() - tail;
        let average: f64 = self.values[start..].iter().sum::<f64>() / tail as f64;

        if average > self.best_average {
            self.best_average = average;
            self.best_iteration = self.values.len() - 1;
        }

        average < self.best_average * (1.0 - self.tolerance)
    }

    /// Run `test`, record the selected metric, and return the stop decision.
    pub fn run(&mut self, test: &mut dyn RankingTest, scores: &[f64], metric: usize) -> bool {
        let value = test.compute(scores).swap_remove(metric);
        self.update_with_value(value.value)
    }

    /// Best moving average seen so far.
    pub fn best_average(&self) -> f64 {
        self.best_average
    }

    /// Iteration index (0-based) at which the best average ended.
    pub fn best_iteration(&self) -> usize {
        self.best_iteration
    }

    /// Number of recorded iterations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// =============================================================================
// PruningRule
// =============================================================================

/// The early-stopping rule selected by the pruning options.
///
/// With tolerant pruning the windowed rule decides when to stop; otherwise
/// plain history is kept and the outer loop truncates the ensemble back to
/// [`best_iteration`](Self::best_iteration) after training.
#[derive(Debug, Clone)]
pub enum PruningRule {
    History(TestHistory),
    Window(TestWindowWithTolerance),
}

impl PruningRule {
    /// Build the rule from the pruning options, or `None` when pruning is
    /// disabled.
    pub fn from_params(params: &crate::config::LambdaRankParams) -> Option<Self> {
        if !params.enable_pruning {
            return None;
        }
        Some(if params.use_tolerant_pruning {
            Self::Window(TestWindowWithTolerance::new(
                params.pruning_window_size,
                params.pruning_threshold,
            ))
        } else {
            Self::History(TestHistory::new())
        })
    }

    /// Record one iteration's value; returns `true` when training should
    /// stop.
    pub fn update_with_value(&mut self, value: f64) -> bool {
        match self {
            Self::History(history) => {
                history.update_with_value(value);
                false
            }
            Self::Window(window) => window.update_with_value(value),
        }
    }

    /// Iteration to truncate the ensemble back to.
    pub fn best_iteration(&self) -> usize {
        match self {
            Self::History(history) => history.best_iteration(),
            Self::Window(window) => window.best_iteration(),
        }
    }
}
