//! # Frozen Model Parameters
//!
//! The two pretrained classifiers behind the ABPS ship as a single, versioned TOML
//! artifact. This module defines its public, human-readable format and guarantees
//! that every parameter set reaching a scorer is internally consistent.
//!
//! - `BayesParameters` and `SvmParameters` can only be obtained through validating
//!   constructors (deserialization goes through the same checks), so the scorers
//!   index their tables without re-checking shapes.
//! - Marker entries may appear in any order in the file; they are stored in the
//!   canonical marker order after loading.

use crate::types::{CANONICAL_MARKERS, Marker, NUM_MARKERS};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// The artifact format this build reads and writes.
pub const FORMAT_VERSION: u32 = 1;

/// Custom error type for loading, saving, and validating model parameters.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read or write parameter file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML parameter file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize parameters to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("Parameter file has format version {found}, but this build only reads version {supported}.")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("The {section} parameters list marker {marker} more than once.")]
    DuplicateMarker { section: &'static str, marker: Marker },
    #[error("The {section} parameters have no entry for marker {marker}.")]
    MissingMarker { section: &'static str, marker: Marker },
    #[error("Clipping bounds for {marker} are invalid: lower {lower}, upper {upper}. Both must be finite with lower < upper.")]
    InvalidBounds { marker: Marker, lower: f64, upper: f64 },
    #[error("Bin thresholds for {marker} must be non-empty, finite, and sorted ascending.")]
    InvalidThresholds { marker: Marker },
    #[error("The {table} probability table for {marker} has {found} entries, but there are {expected} bins.")]
    TableShape {
        marker: Marker,
        table: &'static str,
        found: usize,
        expected: usize,
    },
    #[error("The {table} probability table for {marker} contains {value}. Probabilities must lie in (0, 1].")]
    InvalidProbability {
        marker: Marker,
        table: &'static str,
        value: f64,
    },
    #[error("Standardization for {marker} is invalid: mean {mean}, std {std}. The mean must be finite and the std finite and positive.")]
    InvalidStandardization { marker: Marker, mean: f64, std: f64 },
    #[error("Support vector matrix is {rows}x{cols}, but 7 columns and one row per weight ({weights}) are required.")]
    SupportVectorShape {
        rows: usize,
        cols: usize,
        weights: usize,
    },
    #[error("Parameter '{name}' must be finite and positive, found {value}.")]
    NotPositive { name: &'static str, value: f64 },
    #[error("Parameter '{name}' must be finite, found {value}.")]
    NotFinite { name: &'static str, value: f64 },
}

// ========================================================================================
//                                 Naive Bayes parameters
// ========================================================================================

/// Discretization and likelihood tables for one marker.
///
/// Bin `k` covers values `v` with `thresholds[k] <= v < thresholds[k + 1]`; the last
/// bin is open to the right and values below `thresholds[0]` fall in bin 0. The
/// probability tables have one entry per bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerBins {
    pub marker: Marker,
    /// Lower clipping bound of the training range.
    pub lower: f64,
    /// Upper clipping bound of the training range.
    pub upper: f64,
    pub thresholds: Vec<f64>,
    /// P(bin | doped population).
    pub positive: Vec<f64>,
    /// P(bin | clean population).
    pub negative: Vec<f64>,
}

impl MarkerBins {
    /// Number of bins, equal to the number of thresholds.
    #[inline]
    pub fn num_bins(&self) -> usize {
        self.thresholds.len()
    }

    fn validate(&self) -> Result<(), ModelError> {
        let marker = self.marker;
        if !(self.lower.is_finite() && self.upper.is_finite() && self.lower < self.upper) {
            return Err(ModelError::InvalidBounds {
                marker,
                lower: self.lower,
                upper: self.upper,
            });
        }
        let sorted = self.thresholds.windows(2).all(|pair| pair[0] <= pair[1]);
        if self.thresholds.is_empty() || !sorted || self.thresholds.iter().any(|t| !t.is_finite())
        {
            return Err(ModelError::InvalidThresholds { marker });
        }
        for (table, values) in [("positive", &self.positive), ("negative", &self.negative)] {
            if values.len() != self.num_bins() {
                return Err(ModelError::TableShape {
                    marker,
                    table,
                    found: values.len(),
                    expected: self.num_bins(),
                });
            }
            if let Some(&value) = values
                .iter()
                .find(|p| !(p.is_finite() && **p > 0.0 && **p <= 1.0))
            {
                return Err(ModelError::InvalidProbability {
                    marker,
                    table,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Serialized form of [`BayesParameters`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BayesParametersFile {
    score_sd: f64,
    markers: Vec<MarkerBins>,
}

/// ParameterSet(Bayes): per-marker bounds, bin thresholds, class-conditional bin
/// probabilities, and the standard deviation used to normalise the log-odds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BayesParametersFile", into = "BayesParametersFile")]
pub struct BayesParameters {
    /// Exactly one entry per marker, in canonical order.
    markers: Vec<MarkerBins>,
    score_sd: f64,
}

impl BayesParameters {
    /// Validates the tables and stores them in canonical marker order.
    pub fn new(markers: Vec<MarkerBins>, score_sd: f64) -> Result<Self, ModelError> {
        require_positive("bayes.score_sd", score_sd)?;
        for entry in &markers {
            entry.validate()?;
        }
        let markers = into_canonical_order("bayes", markers, |entry| entry.marker)?;
        Ok(Self { markers, score_sd })
    }

    #[inline]
    pub fn bins(&self, marker: Marker) -> &MarkerBins {
        &self.markers[marker.index()]
    }

    /// Entries in canonical marker order.
    pub fn markers(&self) -> &[MarkerBins] {
        &self.markers
    }

    #[inline]
    pub fn score_sd(&self) -> f64 {
        self.score_sd
    }
}

impl TryFrom<BayesParametersFile> for BayesParameters {
    type Error = ModelError;

    fn try_from(file: BayesParametersFile) -> Result<Self, Self::Error> {
        Self::new(file.markers, file.score_sd)
    }
}

impl From<BayesParameters> for BayesParametersFile {
    fn from(params: BayesParameters) -> Self {
        Self {
            score_sd: params.score_sd,
            markers: params.markers,
        }
    }
}

// ========================================================================================
//                                     SVM parameters
// ========================================================================================

/// Standardization statistics applied to one marker before the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerStandardization {
    pub marker: Marker,
    pub mean: f64,
    pub std: f64,
}

/// Serialized form of [`SvmParameters`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SvmParametersFile {
    kernel_width: f64,
    bias: f64,
    score_sd: f64,
    weights: Array1<f64>,
    support_vectors: Array2<f64>,
    standardization: Vec<MarkerStandardization>,
}

/// ParameterSet(SVM): standardization statistics, the support set of a Gaussian
/// kernel classifier with its weights and bias, and the standard deviation used to
/// normalise the decision value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SvmParametersFile", into = "SvmParametersFile")]
pub struct SvmParameters {
    /// Exactly one entry per marker, in canonical order.
    standardization: Vec<MarkerStandardization>,
    /// Shape `[num_support_vectors, NUM_MARKERS]`, already standardized.
    support_vectors: Array2<f64>,
    weights: Array1<f64>,
    kernel_width: f64,
    bias: f64,
    score_sd: f64,
}

impl SvmParameters {
    pub fn new(
        standardization: Vec<MarkerStandardization>,
        support_vectors: Array2<f64>,
        weights: Array1<f64>,
        kernel_width: f64,
        bias: f64,
        score_sd: f64,
    ) -> Result<Self, ModelError> {
        require_positive("svm.kernel_width", kernel_width)?;
        require_positive("svm.score_sd", score_sd)?;
        if !bias.is_finite() {
            return Err(ModelError::NotFinite {
                name: "svm.bias",
                value: bias,
            });
        }
        if let Some(bad) = standardization
            .iter()
            .find(|s| !(s.mean.is_finite() && s.std.is_finite() && s.std > 0.0))
        {
            return Err(ModelError::InvalidStandardization {
                marker: bad.marker,
                mean: bad.mean,
                std: bad.std,
            });
        }
        if support_vectors.ncols() != NUM_MARKERS || support_vectors.nrows() != weights.len() {
            return Err(ModelError::SupportVectorShape {
                rows: support_vectors.nrows(),
                cols: support_vectors.ncols(),
                weights: weights.len(),
            });
        }
        if let Some(&value) = support_vectors.iter().find(|v| !v.is_finite()) {
            return Err(ModelError::NotFinite {
                name: "svm.support_vectors",
                value,
            });
        }
        if let Some(&value) = weights.iter().find(|w| !w.is_finite()) {
            return Err(ModelError::NotFinite {
                name: "svm.weights",
                value,
            });
        }
        let standardization = into_canonical_order("svm", standardization, |s| s.marker)?;
        Ok(Self {
            standardization,
            support_vectors,
            weights,
            kernel_width,
            bias,
            score_sd,
        })
    }

    #[inline]
    pub fn standardization(&self, marker: Marker) -> &MarkerStandardization {
        &self.standardization[marker.index()]
    }

    pub fn support_vectors(&self) -> &Array2<f64> {
        &self.support_vectors
    }

    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    #[inline]
    pub fn kernel_width(&self) -> f64 {
        self.kernel_width
    }

    /// The RBF precision `0.5 / width^2`.
    #[inline]
    pub fn gamma(&self) -> f64 {
        0.5 / (self.kernel_width * self.kernel_width)
    }

    #[inline]
    pub fn bias(&self) -> f64 {
        self.bias
    }

    #[inline]
    pub fn score_sd(&self) -> f64 {
        self.score_sd
    }
}

impl TryFrom<SvmParametersFile> for SvmParameters {
    type Error = ModelError;

    fn try_from(file: SvmParametersFile) -> Result<Self, Self::Error> {
        Self::new(
            file.standardization,
            file.support_vectors,
            file.weights,
            file.kernel_width,
            file.bias,
            file.score_sd,
        )
    }
}

impl From<SvmParameters> for SvmParametersFile {
    fn from(params: SvmParameters) -> Self {
        Self {
            kernel_width: params.kernel_width,
            bias: params.bias,
            score_sd: params.score_sd,
            weights: params.weights,
            support_vectors: params.support_vectors,
            standardization: params.standardization,
        }
    }
}

// ========================================================================================
//                                  The artifact bundle
// ========================================================================================

/// The top-level, self-contained parameter artifact. Loaded once, then shared
/// read-only by every scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterBundle {
    pub format_version: u32,
    /// Free-form provenance note, e.g. the training cohort or release tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub bayes: BayesParameters,
    pub svm: SvmParameters,
}

impl ParameterBundle {
    pub fn new(bayes: BayesParameters, svm: SvmParameters) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            description: None,
            bayes,
            svm,
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ModelError> {
        let bundle: ParameterBundle = toml::from_str(text)?;
        if bundle.format_version != FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found: bundle.format_version,
                supported: FORMAT_VERSION,
            });
        }
        Ok(bundle)
    }

    /// Saves the parameters to a file in a human-readable TOML format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Loads and validates parameters from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let toml_string = fs::read_to_string(path)?;
        let bundle = Self::from_toml_str(&toml_string)?;
        log::debug!(
            "Loaded ABPS parameters from {} ({} support vectors)",
            path.display(),
            bundle.svm.weights().len()
        );
        Ok(bundle)
    }
}

fn require_positive(name: &'static str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ModelError::NotPositive { name, value })
    }
}

/// Places one entry per marker at that marker's canonical index.
fn into_canonical_order<T>(
    section: &'static str,
    entries: Vec<T>,
    marker_of: impl Fn(&T) -> Marker,
) -> Result<Vec<T>, ModelError> {
    let mut slots: Vec<Option<T>> = (0..NUM_MARKERS).map(|_| None).collect();
    for entry in entries {
        let marker = marker_of(&entry);
        let slot = &mut slots[marker.index()];
        if slot.is_some() {
            return Err(ModelError::DuplicateMarker { section, marker });
        }
        *slot = Some(entry);
    }
    CANONICAL_MARKERS
        .iter()
        .zip(slots)
        .map(|(&marker, slot)| slot.ok_or(ModelError::MissingMarker { section, marker }))
        .collect()
}
