// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

// Types that cross module boundaries: markers, samples, inputs, reports and warnings.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of haematological markers the ABPS models are trained on.
pub const NUM_MARKERS: usize = 7;

/// One of the seven haematological markers consumed by the ABPS models.
///
/// The discriminant of each variant is its column in the canonical order, which
/// is the order every internal matrix, parameter table, and positional input uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Marker {
    /// Reticulocyte percentage.
    Retp = 0,
    /// Haemoglobin concentration.
    Hgb = 1,
    /// Haematocrit.
    Hct = 2,
    /// Red blood cell count.
    Rbc = 3,
    /// Mean corpuscular volume.
    Mcv = 4,
    /// Mean corpuscular haemoglobin.
    Mch = 5,
    /// Mean corpuscular haemoglobin concentration.
    Mchc = 6,
}

/// The canonical marker order: RETP, HGB, HCT, RBC, MCV, MCH, MCHC.
///
/// A positional (unnamed) sample is only accepted if its values follow this order.
pub const CANONICAL_MARKERS: [Marker; NUM_MARKERS] = [
    Marker::Retp,
    Marker::Hgb,
    Marker::Hct,
    Marker::Rbc,
    Marker::Mcv,
    Marker::Mch,
    Marker::Mchc,
];

impl Marker {
    /// Column of this marker in the canonical order.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The conventional upper-case column name of the marker.
    pub fn name(self) -> &'static str {
        match self {
            Marker::Retp => "RETP",
            Marker::Hgb => "HGB",
            Marker::Hct => "HCT",
            Marker::Rbc => "RBC",
            Marker::Mcv => "MCV",
            Marker::Mch => "MCH",
            Marker::Mchc => "MCHC",
        }
    }

    /// Resolves a column label to a marker. Matching ignores ASCII case and
    /// surrounding whitespace; unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Marker> {
        let trimmed = label.trim();
        CANONICAL_MARKERS
            .into_iter()
            .find(|marker| marker.name().eq_ignore_ascii_case(trimmed))
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single blood panel, stored in canonical marker order.
///
/// `None` marks a marker that was not measured. It is never treated as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    values: [Option<f64>; NUM_MARKERS],
}

impl Sample {
    /// Builds a sample from values that are already in canonical order.
    pub fn from_canonical(values: [Option<f64>; NUM_MARKERS]) -> Self {
        Self { values }
    }

    /// Builds a fully measured sample from values in canonical order.
    pub fn complete(values: [f64; NUM_MARKERS]) -> Self {
        Self {
            values: values.map(Some),
        }
    }

    #[inline]
    pub fn get(&self, marker: Marker) -> Option<f64> {
        self.values[marker.index()]
    }

    #[inline]
    pub fn values(&self) -> &[Option<f64>; NUM_MARKERS] {
        &self.values
    }
}

/// An ordered collection of samples. Output scores keep this order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleBatch {
    samples: Vec<Sample>,
}

impl SampleBatch {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
}

impl From<Sample> for SampleBatch {
    fn from(sample: Sample) -> Self {
        Self {
            samples: vec![sample],
        }
    }
}

impl From<Vec<Sample>> for SampleBatch {
    fn from(samples: Vec<Sample>) -> Self {
        Self { samples }
    }
}

/// Every input shape the ABPS entry point accepts.
///
/// All variants converge on a [`SampleBatch`] in `prepare` before any
/// computation begins, so the scorers only ever see canonical records.
#[derive(Debug, Clone)]
pub enum AbpsInput {
    /// One sample given as `(label, value)` pairs, in any order.
    Named(Vec<(String, Option<f64>)>),
    /// One sample given as exactly seven values in canonical order.
    Positional(Vec<Option<f64>>),
    /// A table with a header. Columns are matched by label; extra columns are ignored.
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<Option<f64>>>,
    },
    /// A header-less table whose rows are each seven values in canonical order.
    PositionalTable(Vec<Vec<Option<f64>>>),
    /// Already-canonical samples.
    Batch(SampleBatch),
}

/// Advisory diagnostics. They never abort a computation; each condition is
/// reported at most once per call.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreWarning {
    /// At least one haemoglobin value is below 50, which suggests g/dL was
    /// supplied where g/L is expected.
    SuspectHaemoglobinUnits { lowest: f64, count: usize },
    /// At least one naive-Bayes log-odds value exceeded 100 in magnitude, so the
    /// product of bin probabilities is close to the representable range.
    ExtremeBayesScore { rows: Vec<usize>, largest: f64 },
}

impl fmt::Display for ScoreWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreWarning::SuspectHaemoglobinUnits { lowest, count } => write!(
                f,
                "{count} HGB value(s) below 50 (lowest {lowest}). HGB is expected in g/L; values in g/dL are ten times too small."
            ),
            ScoreWarning::ExtremeBayesScore { rows, largest } => write!(
                f,
                "Naive Bayes log-odds exceed 100 in magnitude for {} row(s) (largest |score| {largest:.2}). The ABPS may be numerically unreliable.",
                rows.len()
            ),
        }
    }
}

/// Result of an OFF-score call: one score per (HGB, RETP) pair.
#[derive(Debug, Clone)]
pub struct OffScoreReport {
    pub scores: Array1<f64>,
    pub warnings: Vec<ScoreWarning>,
}

/// Result of an ABPS call. Index `i` of every array belongs to input row `i`.
/// Undefined entries are NaN.
#[derive(Debug, Clone)]
pub struct AbpsReport {
    /// Naive-Bayes log-odds per row.
    pub bayes: Array1<f64>,
    /// Raw SVM decision value per row.
    pub svm: Array1<f64>,
    /// The combined Abnormal Blood Profile Score per row.
    pub scores: Array1<f64>,
    pub warnings: Vec<ScoreWarning>,
}

/// Reading of an ABPS value. Advisory only; the scorer never enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpretation {
    /// `score <= 0`
    NoIndication,
    /// `0 < score < 1`
    PossibleSuspicion,
    /// `score >= 1`
    DopingLikely,
}

impl Interpretation {
    /// Classifies a score, or `None` when the score is undefined.
    pub fn from_score(score: f64) -> Option<Self> {
        if score.is_nan() {
            None
        } else if score <= 0.0 {
            Some(Interpretation::NoIndication)
        } else if score < 1.0 {
            Some(Interpretation::PossibleSuspicion)
        } else {
            Some(Interpretation::DopingLikely)
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Interpretation::NoIndication => "no_indication",
            Interpretation::PossibleSuspicion => "possible_suspicion",
            Interpretation::DopingLikely => "doping_likely",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_labels_resolve_case_insensitively() {
        assert_eq!(Marker::from_label("RETP"), Some(Marker::Retp));
        assert_eq!(Marker::from_label(" mchc "), Some(Marker::Mchc));
        assert_eq!(Marker::from_label("Hgb"), Some(Marker::Hgb));
        assert_eq!(Marker::from_label("MC"), None);
        assert_eq!(Marker::from_label("ferritin"), None);
    }

    #[test]
    fn canonical_order_matches_marker_indices() {
        for (position, marker) in CANONICAL_MARKERS.iter().enumerate() {
            assert_eq!(marker.index(), position);
        }
        let names: Vec<&str> = CANONICAL_MARKERS.iter().map(|m| m.name()).collect();
        assert_eq!(names, ["RETP", "HGB", "HCT", "RBC", "MCV", "MCH", "MCHC"]);
    }

    #[test]
    fn interpretation_bands_follow_score_thresholds() {
        assert_eq!(
            Interpretation::from_score(-0.54),
            Some(Interpretation::NoIndication)
        );
        assert_eq!(
            Interpretation::from_score(0.0),
            Some(Interpretation::NoIndication)
        );
        assert_eq!(
            Interpretation::from_score(0.3),
            Some(Interpretation::PossibleSuspicion)
        );
        assert_eq!(
            Interpretation::from_score(1.0),
            Some(Interpretation::DopingLikely)
        );
        assert_eq!(Interpretation::from_score(f64::NAN), None);
    }
}
