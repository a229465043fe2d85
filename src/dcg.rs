//! DCG tables: per-label gain, per-position discount, ideal-DCG inverses.
//!
//! The gain and discount tables are built once and threaded explicitly into
//! every DCG computation — there is no process-wide gain state. Changing the
//! gain table therefore means rebuilding the objective and any cached
//! `inverse_max_dcg` values, which the constructors enforce by taking the
//! tables by value.

use crate::config::ConfigError;

/// Minimum number of entries a label-gain table must have.
pub const MIN_LABEL_GAINS: usize = 5;

// =============================================================================
// LabelGains
// =============================================================================

/// Maps a relevance label to its DCG gain.
///
/// The default table is `gain[l] = 2^l − 1` over five grades. Custom tables
/// must cover at least [`MIN_LABEL_GAINS`] grades so the standard 0–4
/// relevance scale always has a defined gain.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelGains {
    gains: Vec<f64>,
}

impl Default for LabelGains {
    fn default() -> Self {
        Self {
            gains: (0..MIN_LABEL_GAINS)
                .map(|l| (1u64 << l) as f64 - 1.0)
                .collect(),
        }
    }
}

impl LabelGains {
    /// Create a gain table from explicit per-label gains.
    pub fn new(gains: Vec<f64>) -> Result<Self, ConfigError> {
        if gains.len() < MIN_LABEL_GAINS {
            return Err(ConfigError::LabelGainsTooShort { got: gains.len() });
        }
        Ok(Self { gains })
    }

    /// Gain of a relevance label.
    ///
    /// Labels are validated against the table size when the objective or a
    /// test is constructed, so indexing here is infallible.
    #[inline]
    pub fn gain(&self, label: u32) -> f64 {
        self.gains[label as usize]
    }

    /// Number of relevance grades covered.
    #[inline]
    pub fn num_grades(&self) -> usize {
        self.gains.len()
    }

    /// The raw gain table.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.gains
    }
}

// =============================================================================
// DiscountTable
// =============================================================================

/// Precomputed per-position discount.
///
/// Default is `discount[d] = 1 / ln(2 + d)`; a user-supplied discount
/// function can replace it (the `position_discount_freeform` hook).
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountTable {
    discounts: Vec<f64>,
}

impl DiscountTable {
    /// Build the default `1 / ln(2 + d)` table for positions `0..len`.
    pub fn new(len: usize) -> Self {
        Self::with_fn(len, |d| 1.0 / (2.0 + d as f64).ln())
    }

    /// Build a table from a custom position-discount function.
    pub fn with_fn(len: usize, discount: impl Fn(usize) -> f64) -> Self {
        Self {
            discounts: (0..len).map(discount).collect(),
        }
    }

    /// Discount at rank position `pos`.
    #[inline]
    pub fn get(&self, pos: usize) -> f64 {
        self.discounts[pos]
    }

    /// Number of positions covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.discounts.len()
    }

    /// Returns `true` for a zero-length table.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.discounts.is_empty()
    }

    /// The raw discount table.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.discounts
    }
}

// =============================================================================
// Ideal DCG
// =============================================================================

/// DCG@truncation of the ideal (label-sorted descending) ordering.
///
/// `scratch` is cleared and reused for the label sort so per-query callers
/// don't allocate.
pub fn ideal_dcg(
    labels: &[u32],
    gains: &LabelGains,
    discount: &DiscountTable,
    truncation: usize,
    scratch: &mut Vec<u32>,
) -> f64 {
    scratch.clear();
    scratch.extend_from_slice(labels);
    scratch.sort_unstable_by(|a, b| b.cmp(a));

    scratch
        .iter()
        .take(truncation)
        .enumerate()
        .map(|(pos, &label)| gains.gain(label) * discount.get(pos))
        .sum()
}

/// `1 / ideal_dcg`, or `0.0` for a query whose ideal DCG is zero.
///
/// A zero inverse makes the query contribute zero gradient and excludes it
/// from mean NDCG.
pub fn inverse_max_dcg(
    labels: &[u32],
    gains: &LabelGains,
    discount: &DiscountTable,
    truncation: usize,
    scratch: &mut Vec<u32>,
) -> f64 {
    let dcg = ideal_dcg(labels, gains, discount, truncation, scratch);
    if dcg > 0.0 {
        1.0 / dcg
    } else {
        0.0
    }
}
