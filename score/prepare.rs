// ========================================================================================
//
//                      The preparation phase: from caller input to a clean matrix
//
// ========================================================================================
//
// Every accepted input shape is resolved to a `SampleBatch` here, and the batch is then
// compiled into a `NormalizedBatch`: an n x 7 matrix in canonical marker order, with
// every measured value clipped into the model's training range. Structural problems
// (unidentifiable markers, wrong column counts) are the only failures; missing values
// pass through untouched as NaN.

use crate::model::BayesParameters;
use crate::types::{AbpsInput, CANONICAL_MARKERS, Marker, NUM_MARKERS, Sample, SampleBatch};
use ahash::AHashMap;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use thiserror::Error;

/// Structural input errors. Any of these aborts the whole call.
#[derive(Error, Debug, PartialEq)]
pub enum InputError {
    #[error(
        "Required marker(s) {} could not be identified in the input. ABPS needs all of RETP, HGB, HCT, RBC, MCV, MCH, MCHC.",
        format_markers(.missing)
    )]
    MissingVariables { missing: Vec<Marker> },
    #[error(
        "Unnamed input row {row} has {found} values, but exactly 7 are required in the order RETP, HGB, HCT, RBC, MCV, MCH, MCHC."
    )]
    WrongColumnCount { row: usize, found: usize },
    #[error("Table row {row} has {found} values, but the header names {expected} columns.")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("Marker {marker} is given more than once (columns '{first}' and '{second}').")]
    DuplicateVariable {
        marker: Marker,
        first: String,
        second: String,
    },
}

fn format_markers(markers: &[Marker]) -> String {
    markers
        .iter()
        .map(|m| m.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolves any accepted input shape into canonical samples.
pub fn resolve_input(input: AbpsInput) -> Result<SampleBatch, InputError> {
    match input {
        AbpsInput::Named(pairs) => {
            let (labels, values): (Vec<String>, Vec<Option<f64>>) = pairs.into_iter().unzip();
            let layout = ColumnLayout::from_labels(&labels)?;
            Ok(SampleBatch::from(layout.select(&values)))
        }
        AbpsInput::Positional(values) => Ok(SampleBatch::from(positional_sample(0, &values)?)),
        AbpsInput::Table { columns, rows } => {
            let layout = ColumnLayout::from_labels(&columns)?;
            let samples = rows
                .iter()
                .enumerate()
                .map(|(row, values)| {
                    if values.len() != columns.len() {
                        return Err(InputError::RaggedRow {
                            row,
                            found: values.len(),
                            expected: columns.len(),
                        });
                    }
                    Ok(layout.select(values))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(SampleBatch::new(samples))
        }
        AbpsInput::PositionalTable(rows) => {
            let samples = rows
                .iter()
                .enumerate()
                .map(|(row, values)| positional_sample(row, values))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(SampleBatch::new(samples))
        }
        AbpsInput::Batch(batch) => Ok(batch),
    }
}

fn positional_sample(row: usize, values: &[Option<f64>]) -> Result<Sample, InputError> {
    let canonical: [Option<f64>; NUM_MARKERS] =
        values.try_into().map_err(|_| InputError::WrongColumnCount {
            row,
            found: values.len(),
        })?;
    Ok(Sample::from_canonical(canonical))
}

/// Where each canonical marker lives in a labelled row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    positions: [usize; NUM_MARKERS],
}

impl ColumnLayout {
    /// Matches labels to markers (case-insensitively). Unrecognised labels are
    /// ignored; a marker matched by two labels, or not matched at all, is an error.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Result<Self, InputError> {
        let mut found: AHashMap<Marker, usize> = AHashMap::with_capacity(NUM_MARKERS);
        for (position, label) in labels.iter().enumerate() {
            let Some(marker) = Marker::from_label(label.as_ref()) else {
                continue;
            };
            if let Some(&first) = found.get(&marker) {
                return Err(InputError::DuplicateVariable {
                    marker,
                    first: labels[first].as_ref().to_string(),
                    second: label.as_ref().to_string(),
                });
            }
            found.insert(marker, position);
        }

        let missing: Vec<Marker> = CANONICAL_MARKERS
            .into_iter()
            .filter(|marker| !found.contains_key(marker))
            .collect();
        if !missing.is_empty() {
            return Err(InputError::MissingVariables { missing });
        }

        let mut positions = [0usize; NUM_MARKERS];
        for (marker, &position) in found.iter() {
            positions[marker.index()] = position;
        }
        Ok(Self { positions })
    }

    /// Picks the seven marker values out of a labelled row, in canonical order.
    /// The caller guarantees `row` is as wide as the label list.
    pub(crate) fn select(&self, row: &[Option<f64>]) -> Sample {
        Sample::from_canonical(self.positions.map(|position| row[position]))
    }
}

/// A batch ready for scoring: shape `[n_samples, 7]`, canonical column order,
/// values clipped to the training range, NaN where a marker is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch {
    values: Array2<f64>,
}

impl NormalizedBatch {
    /// Clips every measured value into the Bayes parameter set's `[lower, upper]`
    /// bounds. The same clipped values feed both classifiers.
    pub fn new(batch: &SampleBatch, bayes: &BayesParameters) -> Self {
        let mut values = Array2::from_elem((batch.len(), NUM_MARKERS), f64::NAN);
        for (mut out_row, sample) in values.axis_iter_mut(Axis(0)).zip(batch.samples()) {
            for marker in CANONICAL_MARKERS {
                if let Some(raw) = sample.get(marker) {
                    let bins = bayes.bins(marker);
                    out_row[marker.index()] = clip(raw, bins.lower, bins.upper);
                }
            }
        }
        Self { values }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.row(index)
    }
}

/// Saturates a value at the edges of the training range. NaN stays NaN.
#[inline]
fn clip(value: f64, lower: f64, upper: f64) -> f64 {
    if value < lower {
        lower
    } else if value > upper {
        upper
    } else {
        value
    }
}
