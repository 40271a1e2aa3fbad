use thiserror::Error;

/// Crate-wide error type.
///
/// The four kinds map to how an operation fails: a configuration error is
/// raised before any work starts and is never retried; a data error aborts
/// the operation leaving the registry unchanged; I/O errors wrap the
/// underlying cause; a mixed-models error is raised on the first
/// interrogation of `is_classification` when the component layers disagree.
#[derive(Debug, Error)]
pub enum RfeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error(
        "You are mixing classification and regression algorithms. \
         The feature learners, feature selectors and predictors must \
         either all be classifiers or all be regressors."
    )]
    MixedModels,
}

impl From<std::io::Error> for RfeError {
    fn from(err: std::io::Error) -> Self {
        RfeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RfeError {
    fn from(err: serde_json::Error) -> Self {
        RfeError::Io(err.to_string())
    }
}

impl From<bincode::Error> for RfeError {
    fn from(err: bincode::Error) -> Self {
        RfeError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RfeError>;
