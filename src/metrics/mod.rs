//! Evaluation metrics and their persistent history.

pub mod scorer;
pub mod scores;

pub use scorer::{score, Metrics};
pub use scores::Scores;
