use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::commands::{Fingerprint, FingerprintValue, LogisticRegressionHyperparams};
use crate::containers::{CategoricalFeatures, Feature, NumericalFeatures};
use crate::dependency::Fingerprinted;
use crate::helpers::{saver, Format};
use crate::logging::ProgressLogger;
use crate::predictors::glm::{self, GlmWeights};
use crate::predictors::predictor::Predictor;
use crate::predictors::PredictorImpl;
use crate::{Float, Result};

/// Logistic regression on the expanded design matrix. Predictions are
/// probabilities of the positive class.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogisticRegression {
    hyperparams: LogisticRegressionHyperparams,
    #[serde(skip)]
    predictor_impl: Arc<PredictorImpl>,
    #[serde(skip)]
    dependencies: Vec<Fingerprint>,
    fitted: Option<GlmWeights>,
}

impl LogisticRegression {
    pub fn new(
        hyperparams: LogisticRegressionHyperparams,
        predictor_impl: Arc<PredictorImpl>,
        dependencies: Vec<Fingerprint>,
    ) -> Self {
        Self {
            hyperparams,
            predictor_impl,
            dependencies,
            fitted: None,
        }
    }

    fn fitted(&self) -> Result<&GlmWeights> {
        self.fitted.as_ref().ok_or_else(|| {
            crate::RfeError::Data("The LogisticRegression has not been fitted.".to_string())
        })
    }
}

impl Fingerprinted for LogisticRegression {
    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(FingerprintValue::LogisticRegression {
            hyperparams: self.hyperparams.clone(),
            dependencies: self.dependencies.clone(),
            autofeatures: self.predictor_impl.autofeatures().to_vec(),
            categorical_colnames: self.predictor_impl.categorical_colnames().to_vec(),
            numerical_colnames: self.predictor_impl.numerical_colnames().to_vec(),
        })
    }
}

impl Predictor for LogisticRegression {
    fn fit(
        &mut self,
        logger: &ProgressLogger,
        x_categorical: &CategoricalFeatures,
        x_numerical: &NumericalFeatures,
        y: &Feature<Float>,
        _x_categorical_valid: Option<&CategoricalFeatures>,
        _x_numerical_valid: Option<&NumericalFeatures>,
        _y_valid: Option<&Feature<Float>>,
    ) -> Result<String> {
        let rows = self
            .predictor_impl
            .make_design_rows(x_categorical, x_numerical)?;

        self.fitted = Some(glm::fit_gradient_descent(
            &rows,
            y.data(),
            self.hyperparams.learning_rate,
            self.hyperparams.reg_lambda,
            true,
        ));

        logger.progress(100);

        Ok("LogisticRegression: Training finished.".to_string())
    }

    fn predict(
        &self,
        x_categorical: &CategoricalFeatures,
        x_numerical: &NumericalFeatures,
    ) -> Result<Vec<Float>> {
        let fitted = self.fitted()?;
        let rows = self
            .predictor_impl
            .make_design_rows(x_categorical, x_numerical)?;
        Ok(rows
            .iter()
            .map(|row| glm::sigmoid(fitted.linear_response(row)))
            .collect())
    }

    fn feature_importances(&self, n_features: usize) -> Vec<Float> {
        let Ok(fitted) = self.fitted() else {
            return vec![0.0; n_features];
        };
        let expanded = glm::weight_importances(fitted);
        let compressed = self
            .predictor_impl
            .compress_importances(&expanded)
            .unwrap_or_else(|_| vec![0.0; n_features]);

        let mut importances = compressed;
        importances.resize(n_features, 0.0);
        importances
    }

    fn is_classification(&self) -> bool {
        true
    }

    fn silent(&self) -> bool {
        true
    }

    fn save(&self, stem: &Path, format: Format) -> Result<()> {
        saver::save(stem, self, format)
    }

    fn load(&mut self, stem: &Path, format: Format) -> Result<()> {
        let loaded: LogisticRegression = saver::load(stem, format)?;
        self.fitted = loaded.fitted;
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "LogisticRegression"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_predict_probabilities() {
        let imp = PredictorImpl::new(&[], vec![], vec!["x".to_string()]);
        let mut model = LogisticRegression::new(
            LogisticRegressionHyperparams {
                learning_rate: 0.5,
                reg_lambda: 0.0,
            },
            Arc::new(imp),
            vec![],
        );

        let x = vec![Feature::new(
            "x",
            (0..40).map(|i| if i < 20 { -1.0 } else { 1.0 }).collect(),
        )];
        let y = Feature::new(
            "y",
            (0..40).map(|i| if i < 20 { 0.0 } else { 1.0 }).collect(),
        );

        model
            .fit(&ProgressLogger::silent(), &vec![], &x, &y, None, None, None)
            .unwrap();

        let predictions = model.predict(&vec![], &x).unwrap();
        assert!(predictions[0] < 0.5);
        assert!(predictions[39] > 0.5);
        assert!(predictions.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }
}
