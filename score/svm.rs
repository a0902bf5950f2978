// ========================================================================================
//
//                      The kernel: Gaussian RBF support-vector scoring
//
// ========================================================================================
//
// A sample is standardized with the per-marker statistics of the SVM parameter set,
// then compared against every support vector with a Gaussian radial-basis kernel.
// The decision value is the weighted sum of those similarities plus the bias.
// Missing markers are NaN and propagate into the result; nothing is zero-filled.

use crate::model::SvmParameters;
use crate::types::{CANONICAL_MARKERS, NUM_MARKERS};
use ndarray::{ArrayView1, Zip};

/// Gaussian similarity `exp(-gamma * ||z - s||^2)`.
#[inline]
pub fn rbf_kernel(z: &[f64; NUM_MARKERS], support_vector: ArrayView1<f64>, gamma: f64) -> f64 {
    let squared_distance: f64 = z
        .iter()
        .zip(support_vector.iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum();
    (-gamma * squared_distance).exp()
}

/// Standardizes a normalized sample: `z_j = (x_j - mean_j) / std_j`.
#[inline]
pub fn standardize(params: &SvmParameters, sample: ArrayView1<f64>) -> [f64; NUM_MARKERS] {
    CANONICAL_MARKERS.map(|marker| {
        let stats = params.standardization(marker);
        (sample[marker.index()] - stats.mean) / stats.std
    })
}

/// Raw decision value `sum_i w_i * K(z, s_i) + bias` for one normalized sample.
pub fn svm_score(params: &SvmParameters, sample: ArrayView1<f64>) -> f64 {
    let z = standardize(params, sample);
    if z.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    let gamma = params.gamma();
    let weighted: f64 = Zip::from(params.support_vectors().rows())
        .and(params.weights())
        .fold(0.0, |acc, support_vector, &weight| {
            acc + weight * rbf_kernel(&z, support_vector, gamma)
        });
    weighted + params.bias()
}
