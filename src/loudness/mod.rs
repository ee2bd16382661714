//! Loudness measurement, corpus references and gain normalization.
//!
//! ```text
//! corpus dir ─▶ Corpus::scan ─▶ LoudnessStatistic (nearest-rank percentile)
//!                                      │
//! SampleBuffer ─▶ normalize(buf, reference) ─▶ apply_gain_db(coefficient loss)
//! ```

pub mod corpus;
pub mod estimator;
pub mod gain;

pub use corpus::Corpus;
pub use estimator::{
    compute_corpus_percentile, compute_median, percentile_of_values, Aggregation, CorpusSource,
    LoudnessStatistic,
};
pub use gain::{apply_gain_db, coefficient_to_db_loss, db_to_gain, normalize, random_coefficient};
