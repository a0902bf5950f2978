// ========================================================================================
//
//                      The ABPS pipeline: normalize, score, combine
//
// ========================================================================================
//
// Data flows strictly forward: caller input -> `SampleBatch` -> `NormalizedBatch` ->
// {naive-Bayes log-odds, SVM decision value} -> ensemble score. Rows are independent,
// so the per-row work is a parallel map whose collected output keeps input order.

use crate::bayes::{self, bayes_score};
use crate::ensemble::combine;
use crate::model::{BayesParameters, ParameterBundle, SvmParameters};
use crate::prepare::{InputError, NormalizedBatch, resolve_input};
use crate::svm::svm_score;
use crate::types::{AbpsInput, AbpsReport, SampleBatch, ScoreWarning};
use ndarray::Array1;
use rayon::prelude::*;

/// The scoring engine. Holds shared references to the frozen parameter sets and
/// can be used concurrently from any number of threads.
#[derive(Debug, Clone, Copy)]
pub struct AbpsScorer<'a> {
    bayes: &'a BayesParameters,
    svm: &'a SvmParameters,
}

impl<'a> AbpsScorer<'a> {
    pub fn new(bundle: &'a ParameterBundle) -> Self {
        Self::from_parts(&bundle.bayes, &bundle.svm)
    }

    pub fn from_parts(bayes: &'a BayesParameters, svm: &'a SvmParameters) -> Self {
        Self { bayes, svm }
    }

    /// Scores any accepted input shape. Structural problems with the input are the
    /// only error; rows with missing markers get NaN scores.
    pub fn score_input(&self, input: AbpsInput) -> Result<AbpsReport, InputError> {
        let batch = resolve_input(input)?;
        Ok(self.score_batch(&batch))
    }

    /// Scores canonical samples. Output index `i` belongs to `batch.samples()[i]`.
    pub fn score_batch(&self, batch: &SampleBatch) -> AbpsReport {
        let normalized = NormalizedBatch::new(batch, self.bayes);
        self.score_normalized(&normalized)
    }

    /// Scores an already clipped batch.
    pub fn score_normalized(&self, normalized: &NormalizedBatch) -> AbpsReport {
        log::debug!("Scoring {} sample(s)", normalized.len());

        let components: Vec<(f64, f64)> = (0..normalized.len())
            .into_par_iter()
            .map(|i| {
                let row = normalized.row(i);
                (bayes_score(self.bayes, row), svm_score(self.svm, row))
            })
            .collect();

        let bayes: Array1<f64> = components.iter().map(|&(b, _)| b).collect();
        let svm: Array1<f64> = components.iter().map(|&(_, s)| s).collect();
        let scores: Array1<f64> = components
            .iter()
            .map(|&(b, s)| combine(b, s, self.bayes.score_sd(), self.svm.score_sd()))
            .collect();

        let mut warnings = Vec::new();
        if let Some(warning) = extreme_bayes_warning(&bayes) {
            log::warn!("{warning}");
            warnings.push(warning);
        }

        AbpsReport {
            bayes,
            svm,
            scores,
            warnings,
        }
    }
}

/// One warning per call covering every row whose log-odds exceed the limit.
fn extreme_bayes_warning(log_odds: &Array1<f64>) -> Option<ScoreWarning> {
    let rows: Vec<usize> = log_odds
        .iter()
        .enumerate()
        .filter(|&(_, &score)| bayes::is_extreme(score))
        .map(|(row, _)| row)
        .collect();
    if rows.is_empty() {
        return None;
    }
    let largest = rows
        .iter()
        .map(|&row| log_odds[row].abs())
        .fold(0.0, f64::max);
    Some(ScoreWarning::ExtremeBayesScore { rows, largest })
}

/// Convenience entry point: scores `input` against `bundle`.
pub fn abps(bundle: &ParameterBundle, input: AbpsInput) -> Result<AbpsReport, InputError> {
    AbpsScorer::new(bundle).score_input(input)
}
