//! The OFF-score: `HGB - 60 * sqrt(RETP)`, with HGB in g/L and RETP in percent.

use crate::types::{OffScoreReport, ScoreWarning};
use ndarray::Array1;
use thiserror::Error;

/// HGB values below this are almost certainly in g/dL rather than g/L.
pub const SUSPECT_HGB_THRESHOLD: f64 = 50.0;

#[derive(Error, Debug, PartialEq)]
pub enum OffScoreError {
    #[error("Got {hgb} HGB value(s) but {retp} RETP value(s). They must pair up one to one.")]
    LengthMismatch { hgb: usize, retp: usize },
}

/// OFF-score of a single measurement pair.
#[inline]
pub fn off_score(hgb: f64, retp: f64) -> f64 {
    hgb - 60.0 * retp.sqrt()
}

/// Element-wise OFF-scores for paired HGB / RETP sequences.
///
/// Emits a single unit-mismatch warning when any HGB value is below 50, however
/// many values are affected.
pub fn off_scores(hgb: &[f64], retp: &[f64]) -> Result<OffScoreReport, OffScoreError> {
    if hgb.len() != retp.len() {
        return Err(OffScoreError::LengthMismatch {
            hgb: hgb.len(),
            retp: retp.len(),
        });
    }

    let scores: Array1<f64> = hgb
        .iter()
        .zip(retp)
        .map(|(&h, &r)| off_score(h, r))
        .collect();

    let mut warnings = Vec::new();
    let suspicious: Vec<f64> = hgb
        .iter()
        .copied()
        .filter(|&h| h < SUSPECT_HGB_THRESHOLD)
        .collect();
    if !suspicious.is_empty() {
        let warning = ScoreWarning::SuspectHaemoglobinUnits {
            lowest: suspicious.iter().copied().fold(f64::INFINITY, f64::min),
            count: suspicious.len(),
        };
        log::warn!("{warning}");
        warnings.push(warning);
    }

    Ok(OffScoreReport { scores, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn matches_the_closed_form() {
        for &(h, r) in &[(146.0, 0.48), (120.0, 0.0), (160.0, 2.25), (0.0, 1.0)] {
            assert_abs_diff_eq!(off_score(h, r), h - 60.0 * f64::sqrt(r), epsilon = 1e-12);
        }
        assert_abs_diff_eq!(off_score(160.0, 2.25), 70.0, epsilon = 1e-12);
    }

    #[test]
    fn reference_pair() {
        let report = off_scores(&[146.0], &[0.48]).unwrap();
        assert_abs_diff_eq!(report.scores[0], 104.43, epsilon = 0.5);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn low_haemoglobin_warns_once_per_call() {
        let report = off_scores(&[14.6, 13.9, 146.0], &[0.48, 0.5, 0.48]).unwrap();
        assert_eq!(report.scores.len(), 3);
        assert_eq!(
            report.warnings,
            vec![ScoreWarning::SuspectHaemoglobinUnits {
                lowest: 13.9,
                count: 2
            }]
        );
    }

    #[test]
    fn mismatched_lengths_are_an_error() {
        assert_eq!(
            off_scores(&[146.0, 150.0], &[0.48]).unwrap_err(),
            OffScoreError::LengthMismatch { hgb: 2, retp: 1 }
        );
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let report = off_scores(&[], &[]).unwrap();
        assert!(report.scores.is_empty());
        assert!(report.warnings.is_empty());
    }
}
