//! Precomputed lookup table for the pairwise RankNet gradient magnitude.
//!
//! For a score difference `x = score_high − score_low` the pairwise gradient
//! magnitude is `2 / (1 + exp(2σx))`: close to 2 when the pair is badly
//! mis-ordered, close to 0 when the ordering is already confident. The exact
//! curve is evaluated once over a bounded input range; the hot loop then does
//! a single multiply-and-index per pair.

/// Number of table bins.
pub const SIGMOID_BINS: usize = 1_000_000;

/// Exponent below which `exp(x)` is treated as zero; bounds the table range.
const MIN_EXPONENT: f64 = -50.0;

/// Lookup table approximating `2 / (1 + exp(2σx))` over `[min_score, max_score]`.
///
/// Inputs outside the range saturate to the respective end value.
#[derive(Debug, Clone)]
pub struct SigmoidTable {
    table: Vec<f64>,
    min_score: f64,
    max_score: f64,
    score_to_index_factor: f64,
    /// Value at the low end of the range (`table[0]`, close to 2).
    min_sigmoid: f64,
    /// Value at the high end of the range (last bin, close to 0).
    max_sigmoid: f64,
}

impl SigmoidTable {
    /// Build the table for sigmoid parameter `sigma`.
    pub fn new(sigma: f64) -> Self {
        debug_assert!(sigma > 0.0);

        let min_score = MIN_EXPONENT / (2.0 * sigma);
        let max_score = -min_score;
        let step = (max_score - min_score) / SIGMOID_BINS as f64;

        // Evaluate through the numerically stable branch on each side of 0 so
        // neither exponent overflows.
        let table: Vec<f64> = (0..SIGMOID_BINS)
            .map(|i| {
                let x = min_score + i as f64 * step;
                if x > 0.0 {
                    2.0 - 2.0 / (1.0 + (-2.0 * sigma * x).exp())
                } else {
                    2.0 / (1.0 + (2.0 * sigma * x).exp())
                }
            })
            .collect();

        let min_sigmoid = table[0];
        let max_sigmoid = table[SIGMOID_BINS - 1];

        Self {
            table,
            min_score,
            max_score,
            score_to_index_factor: SIGMOID_BINS as f64 / (max_score - min_score),
            min_sigmoid,
            max_sigmoid,
        }
    }

    /// Gradient magnitude `|λ|` for a score difference.
    #[inline]
    pub fn value(&self, score_diff: f64) -> f64 {
        if score_diff <= self.min_score {
            self.min_sigmoid
        } else if score_diff >= self.max_score {
            self.max_sigmoid
        } else {
            let idx = ((score_diff - self.min_score) * self.score_to_index_factor) as usize;
            self.table[idx.min(SIGMOID_BINS - 1)]
        }
    }

    /// Low end of the representable input range.
    #[inline]
    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    /// High end of the representable input range.
    #[inline]
    pub fn max_score(&self) -> f64 {
        self.max_score
    }
}
