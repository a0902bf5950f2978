//! Discretized naive-Bayes scorer.
//!
//! Each clipped marker value is mapped to a bin of its step-function discretization,
//! the class-conditional bin probabilities are looked up, and the log-odds of the
//! "doped" over the "clean" population is accumulated across the seven markers.

use crate::model::{BayesParameters, MarkerBins};
use crate::types::CANONICAL_MARKERS;
use ndarray::ArrayView1;

/// Log-odds magnitude above which the score is flagged as numerically unreliable.
pub const EXTREME_LOG_ODDS: f64 = 100.0;

/// Index of the last threshold the value reaches (`value >= threshold`).
///
/// A value lying exactly on a threshold selects the higher bin. Values below the
/// first threshold fall in bin 0. Returns `None` for a missing (NaN) value.
#[inline]
pub fn bin_index(bins: &MarkerBins, value: f64) -> Option<usize> {
    if value.is_nan() {
        return None;
    }
    // Thresholds are sorted, so the ones the value reaches form a prefix.
    let reached = bins.thresholds.partition_point(|&threshold| value >= threshold);
    Some(reached.saturating_sub(1))
}

/// Naive-Bayes log-odds `ln(prod p_pos / prod p_neg)` for one normalized sample.
///
/// Undefined (NaN) as soon as any marker is missing. The ratio is accumulated as a
/// sum of logarithms so that the products cannot underflow.
pub fn bayes_score(params: &BayesParameters, sample: ArrayView1<f64>) -> f64 {
    let mut log_odds = 0.0;
    for marker in CANONICAL_MARKERS {
        let bins = params.bins(marker);
        let Some(bin) = bin_index(bins, sample[marker.index()]) else {
            return f64::NAN;
        };
        log_odds += bins.positive[bin].ln() - bins.negative[bin].ln();
    }
    log_odds
}

/// Whether a log-odds value is large enough to warrant a reliability warning.
#[inline]
pub fn is_extreme(score: f64) -> bool {
    score.abs() > EXTREME_LOG_ODDS
}
