#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod bayes;
pub mod ensemble;
pub mod io;
pub mod model;
pub mod offscore;
pub mod pipeline;
pub mod prepare;
pub mod svm;
pub mod types;

#[cfg(test)]
mod test_fixtures;

pub use model::{BayesParameters, ModelError, ParameterBundle, SvmParameters};
pub use offscore::{OffScoreError, off_scores};
pub use pipeline::{AbpsScorer, abps};
pub use prepare::InputError;
pub use types::{
    AbpsInput, AbpsReport, CANONICAL_MARKERS, Interpretation, Marker, OffScoreReport, Sample,
    SampleBatch, ScoreWarning,
};
