use abps::{
    AbpsInput, AbpsScorer, CANONICAL_MARKERS, InputError, Interpretation, Marker, ParameterBundle,
    Sample, SampleBatch, ScoreWarning, abps, off_scores,
};
use approx::assert_abs_diff_eq;
use std::f64::consts::LN_2;

const PARAMS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/synthetic_params.toml");

// --- Helpers: the reference panel and its hand-computed scores ---

const REFERENCE: [(&str, f64); 7] = [
    ("HCT", 43.2),
    ("HGB", 14.6),
    ("MCH", 31.1),
    ("MCHC", 33.8),
    ("MCV", 92.1),
    ("RBC", 4.69),
    ("RETP", 0.48),
];

fn load_params() -> ParameterBundle {
    ParameterBundle::load(PARAMS).expect("synthetic parameters load")
}

fn named_reference() -> Vec<(String, Option<f64>)> {
    REFERENCE
        .iter()
        .map(|&(label, value)| (label.to_string(), Some(value)))
        .collect()
}

fn canonical_reference() -> Vec<Option<f64>> {
    CANONICAL_MARKERS
        .iter()
        .map(|marker| {
            REFERENCE
                .iter()
                .find(|(label, _)| *label == marker.name())
                .map(|&(_, value)| value)
        })
        .collect()
}

fn reference_abps() -> f64 {
    // MCV and MCH fall in their upper bins, the other five in their lower bins.
    let bayes = -3.0 * LN_2;
    // Distance 0 to the first support vector, squared distance 7 to the second.
    let svm = 1.5 - 2.0 * (-3.5f64).exp() + 0.25;
    (6.0 * bayes / 2.0 + svm / 1.0) / 4.75
}

// --- ABPS scoring ---

#[test]
fn every_input_shape_gives_the_same_score() {
    let params = load_params();
    let expected = reference_abps();

    let named = abps(&params, AbpsInput::Named(named_reference())).unwrap();
    let positional = abps(&params, AbpsInput::Positional(canonical_reference())).unwrap();
    let single_row_table = abps(
        &params,
        AbpsInput::Table {
            columns: REFERENCE.iter().map(|(label, _)| label.to_string()).collect(),
            rows: vec![REFERENCE.iter().map(|&(_, v)| Some(v)).collect()],
        },
    )
    .unwrap();
    let single_row_positional =
        abps(&params, AbpsInput::PositionalTable(vec![canonical_reference()])).unwrap();

    for report in [&named, &positional, &single_row_table, &single_row_positional] {
        assert_eq!(report.scores.len(), 1);
        assert_abs_diff_eq!(report.scores[0], expected, epsilon = 1e-10);
        assert!(report.warnings.is_empty());
    }
    assert_eq!(named.scores[0], positional.scores[0]);
    assert_eq!(named.scores[0], single_row_table.scores[0]);
    assert_eq!(
        Interpretation::from_score(named.scores[0]),
        Some(Interpretation::NoIndication)
    );
}

#[test]
fn two_identical_rows_score_identically() {
    let params = load_params();
    let single = abps(&params, AbpsInput::Named(named_reference())).unwrap();
    let batch = abps(
        &params,
        AbpsInput::PositionalTable(vec![canonical_reference(), canonical_reference()]),
    )
    .unwrap();
    assert_eq!(batch.scores.len(), 2);
    assert_eq!(batch.scores[0], batch.scores[1]);
    assert_eq!(batch.scores[0], single.scores[0]);
}

#[test]
fn missing_marker_invalidates_only_its_row() {
    let params = load_params();
    let mut gap = canonical_reference();
    gap[Marker::Mcv.index()] = None;
    let report = abps(
        &params,
        AbpsInput::PositionalTable(vec![canonical_reference(), gap, canonical_reference()]),
    )
    .unwrap();
    assert!(report.scores[0].is_finite());
    assert!(report.scores[1].is_nan());
    assert!(report.scores[2].is_finite());
    assert_eq!(Interpretation::from_score(report.scores[1]), None);
}

#[test]
fn permuting_rows_permutes_scores() {
    let params = load_params();
    let scorer = AbpsScorer::new(&params);
    let base = canonical_reference();
    let rows: Vec<Sample> = [0.3, 1.2, 2.7, 0.9]
        .iter()
        .map(|&retp| {
            let mut values = [None; 7];
            for (slot, value) in values.iter_mut().zip(&base) {
                *slot = *value;
            }
            values[Marker::Retp.index()] = Some(retp);
            values[Marker::Hgb.index()] = Some(12.0 + retp * 2.0);
            Sample::from_canonical(values)
        })
        .collect();

    let forward = scorer.score_batch(&SampleBatch::new(rows.clone()));
    let permutation = [2, 0, 3, 1];
    let permuted_rows: Vec<Sample> = permutation.iter().map(|&i| rows[i]).collect();
    let permuted = scorer.score_batch(&SampleBatch::new(permuted_rows));

    for (position, &original) in permutation.iter().enumerate() {
        assert_eq!(permuted.scores[position], forward.scores[original]);
    }
}

#[test]
fn repeated_calls_are_identical() {
    let params = load_params();
    let first = abps(&params, AbpsInput::Named(named_reference())).unwrap();
    let second = abps(&params, AbpsInput::Named(named_reference())).unwrap();
    assert_eq!(first.scores, second.scores);
    assert_eq!(first.bayes, second.bayes);
    assert_eq!(first.svm, second.svm);
}

#[test]
fn fewer_than_seven_markers_is_fatal() {
    let params = load_params();
    let mut pairs = named_reference();
    pairs.pop();
    assert!(matches!(
        abps(&params, AbpsInput::Named(pairs)),
        Err(InputError::MissingVariables { .. })
    ));

    let mut short = canonical_reference();
    short.pop();
    assert!(matches!(
        abps(&params, AbpsInput::Positional(short)),
        Err(InputError::WrongColumnCount { found: 6, .. })
    ));
}

/// Scores the published reference panel against production parameters. The
/// trained tables are not distributed with the crate, so point `ABPS_PARAMS` at
/// an artifact and run with `cargo test -- --ignored`.
#[test]
#[ignore]
fn production_parameters_reproduce_reference_score() {
    let path = std::env::var("ABPS_PARAMS").expect("ABPS_PARAMS names a parameter artifact");
    let params = ParameterBundle::load(&path).expect("production parameters load");
    let report = abps(&params, AbpsInput::Named(named_reference())).unwrap();
    assert_abs_diff_eq!(report.scores[0], -0.5398784, epsilon = 0.01);
}

// --- OFF-score ---

#[test]
fn off_score_reference_value() {
    let report = off_scores(&[146.0], &[0.48]).unwrap();
    assert_abs_diff_eq!(report.scores[0], 104.40, epsilon = 0.5);
    assert_abs_diff_eq!(report.scores[0], abps::offscore::off_score(146.0, 0.48));
}

#[test]
fn off_score_warns_once_for_many_low_values() {
    let report = off_scores(&[14.6, 15.0, 13.2, 150.0], &[0.48, 0.5, 0.6, 0.4]).unwrap();
    assert_eq!(report.scores.len(), 4);
    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(
        report.warnings[0],
        ScoreWarning::SuspectHaemoglobinUnits { count: 3, .. }
    ));
}
