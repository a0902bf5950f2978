//! Fixed-weight combination of the two classifier outputs into the ABPS.

/// Weight of the standardized naive-Bayes score in the ensemble.
pub const BAYES_WEIGHT: f64 = 6.0;

/// Divisor of the weighted sum. Together with [`BAYES_WEIGHT`] this reproduces the
/// calibrated ensemble average; neither constant is tunable.
pub const ENSEMBLE_DIVISOR: f64 = 4.75;

/// `(6 * bayes / bayes_sd + svm / svm_sd) / 4.75`.
///
/// NaN in either score yields NaN.
#[inline]
pub fn combine(bayes: f64, svm: f64, bayes_sd: f64, svm_sd: f64) -> f64 {
    (BAYES_WEIGHT * bayes / bayes_sd + svm / svm_sd) / ENSEMBLE_DIVISOR
}
