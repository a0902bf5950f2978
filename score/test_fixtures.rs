//! Hand-computable parameter sets shared by the unit tests.
//!
//! Every marker has two bins. The positive table is `[0.25, 0.5]` and the negative
//! table `[0.5, 0.25]`, so each marker contributes `-ln 2` in its lower bin and
//! `+ln 2` in its upper bin. The SVM standardization is centred on
//! [`REFERENCE_VALUES`] with unit spread, so that sample sits at the origin.

use crate::model::{BayesParameters, MarkerBins, MarkerStandardization, ParameterBundle, SvmParameters};
use crate::types::{CANONICAL_MARKERS, Marker, NUM_MARKERS, Sample};
use ndarray::{Array1, Array2};

/// The reference panel in canonical order (RETP, HGB, HCT, RBC, MCV, MCH, MCHC).
pub(crate) const REFERENCE_VALUES: [f64; NUM_MARKERS] = [0.48, 14.6, 43.2, 4.69, 92.1, 31.1, 33.8];

/// `(lower, upper, upper-bin threshold)` per marker in canonical order.
const RANGES: [(f64, f64, f64); NUM_MARKERS] = [
    (0.1, 3.0, 1.0),
    (8.0, 20.0, 15.0),
    (25.0, 60.0, 45.0),
    (3.0, 7.0, 5.0),
    (70.0, 110.0, 90.0),
    (20.0, 40.0, 30.0),
    (28.0, 40.0, 34.0),
];

pub(crate) fn synthetic_marker_bins() -> Vec<MarkerBins> {
    CANONICAL_MARKERS
        .iter()
        .zip(RANGES)
        .map(|(&marker, (lower, upper, split))| MarkerBins {
            marker,
            lower,
            upper,
            thresholds: vec![lower, split],
            positive: vec![0.25, 0.5],
            negative: vec![0.5, 0.25],
        })
        .collect()
}

pub(crate) fn synthetic_bundle() -> ParameterBundle {
    let bayes = BayesParameters::new(synthetic_marker_bins(), 2.0).unwrap();

    let standardization = CANONICAL_MARKERS
        .iter()
        .zip(REFERENCE_VALUES)
        .map(|(&marker, mean)| MarkerStandardization {
            marker,
            mean,
            std: 1.0,
        })
        .collect();
    let mut support_vectors = Array2::zeros((2, NUM_MARKERS));
    support_vectors.row_mut(1).fill(1.0);
    let weights = Array1::from(vec![1.5, -2.0]);
    let svm = SvmParameters::new(standardization, support_vectors, weights, 1.0, 0.25, 1.0).unwrap();

    ParameterBundle::new(bayes, svm)
}

pub(crate) fn reference_sample() -> Sample {
    Sample::complete(REFERENCE_VALUES)
}

/// Bayes log-odds of the reference panel: MCV and MCH sit in their upper bins.
pub(crate) fn reference_bayes() -> f64 {
    -3.0 * std::f64::consts::LN_2
}

/// SVM decision value of the reference panel: distance 0 to the first support
/// vector and squared distance 7 to the second.
pub(crate) fn reference_svm() -> f64 {
    1.5 - 2.0 * (-3.5f64).exp() + 0.25
}

pub(crate) fn reference_abps() -> f64 {
    (6.0 * reference_bayes() / 2.0 + reference_svm()) / 4.75
}

/// Marker lookup helper for building edge-case samples.
pub(crate) fn with_value(sample: Sample, marker: Marker, value: Option<f64>) -> Sample {
    let mut values = *sample.values();
    values[marker.index()] = value;
    Sample::from_canonical(values)
}
