use std::path::Path;
use std::sync::Arc;

use crate::commands::{Fingerprint, PredictorCommand};
use crate::containers::{CategoricalFeatures, Feature, NumericalFeatures};
use crate::dependency::Fingerprinted;
use crate::helpers::Format;
use crate::logging::ProgressLogger;
use crate::predictors::{LinearRegression, LogisticRegression, PredictorImpl, XGBoost};
use crate::{Float, Result};

/// The capability set of a predictor (or feature selector).
pub trait Predictor: Fingerprinted + Send + Sync {
    /// Fits on the given features and target, with an optional validation
    /// set plumbed through. Returns a human-readable fit report.
    #[allow(clippy::too_many_arguments)]
    fn fit(
        &mut self,
        logger: &ProgressLogger,
        x_categorical: &CategoricalFeatures,
        x_numerical: &NumericalFeatures,
        y: &Feature<Float>,
        x_categorical_valid: Option<&CategoricalFeatures>,
        x_numerical_valid: Option<&NumericalFeatures>,
        y_valid: Option<&Feature<Float>>,
    ) -> Result<String>;

    fn predict(
        &self,
        x_categorical: &CategoricalFeatures,
        x_numerical: &NumericalFeatures,
    ) -> Result<Vec<Float>>;

    /// Importances over the compressed feature space, length `n_features`,
    /// summing to 1.
    fn feature_importances(&self, n_features: usize) -> Vec<Float>;

    fn is_classification(&self) -> bool;

    fn silent(&self) -> bool;

    fn save(&self, stem: &Path, format: Format) -> Result<()>;

    fn load(&mut self, stem: &Path, format: Format) -> Result<()>;

    fn type_name(&self) -> &'static str;
}

/// Creates a predictor from its command.
pub fn parse(
    command: &PredictorCommand,
    predictor_impl: Arc<PredictorImpl>,
    dependencies: Vec<Fingerprint>,
) -> Box<dyn Predictor> {
    match command {
        PredictorCommand::LinearRegression(hyperparams) => Box::new(LinearRegression::new(
            hyperparams.clone(),
            predictor_impl,
            dependencies,
        )),
        PredictorCommand::LogisticRegression(hyperparams) => Box::new(LogisticRegression::new(
            hyperparams.clone(),
            predictor_impl,
            dependencies,
        )),
        PredictorCommand::XGBoost(hyperparams) => Box::new(XGBoost::new(
            hyperparams.clone(),
            predictor_impl,
            dependencies,
        )),
    }
}
