use std::sync::Arc;

use crate::featurelearners::FeatureLearner;
use crate::helpers::Schema;
use crate::pipelines::Fingerprints;
use crate::predictors::{Predictor, PredictorImpl};
use crate::preprocessors::Preprocessor;
use crate::{Result, RfeError};

/// A two-dimensional predictor table (targets x definitions) together with
/// the column layout it was fitted on.
#[derive(Clone)]
pub struct Predictors {
    pub predictor_impl: Arc<PredictorImpl>,
    /// Indexed by target, then by predictor definition.
    pub predictors: Vec<Vec<Arc<dyn Predictor>>>,
}

impl Predictors {
    /// Number of targets.
    pub fn size(&self) -> usize {
        self.predictors.len()
    }

    /// Number of predictors fitted for each target.
    pub fn num_predictors_per_set(&self) -> usize {
        self.predictors.first().map(Vec::len).unwrap_or(0)
    }

    /// Number of features in the compressed representation.
    pub fn num_features(&self) -> usize {
        self.predictor_impl.num_features()
    }

    pub fn autofeature_names(&self) -> Vec<String> {
        self.predictor_impl.autofeature_names()
    }

    /// Auto-feature, numerical and categorical feature names.
    pub fn feature_names(&self) -> (Vec<String>, Vec<String>, Vec<String>) {
        (
            self.predictor_impl.autofeature_names(),
            self.predictor_impl.numerical_colnames().to_vec(),
            self.predictor_impl.categorical_colnames().to_vec(),
        )
    }
}

/// The frozen result of a successful fit.
///
/// Owns its algorithmic components exclusively; the handles handed to the
/// trackers and to transform calls are shared-read. Updating a pipeline
/// produces a new `FittedPipeline` sharing the unchanged components.
#[derive(Clone)]
pub struct FittedPipeline {
    pub feature_learners: Vec<Arc<dyn FeatureLearner>>,
    pub feature_selectors: Predictors,
    pub fingerprints: Fingerprints,
    pub modified_peripheral_schema: Vec<Schema>,
    pub modified_population_schema: Schema,
    pub peripheral_schema: Vec<Schema>,
    pub population_schema: Schema,
    pub predictors: Predictors,
    pub preprocessors: Vec<Arc<dyn Preprocessor>>,
    pub creation_time: String,
}

impl FittedPipeline {
    pub fn num_features(&self) -> usize {
        self.predictors.num_features()
    }

    pub fn num_predictors_per_set(&self) -> usize {
        self.predictors.num_predictors_per_set()
    }

    /// The names of the target columns.
    pub fn targets(&self) -> &[String] {
        &self.modified_population_schema.targets
    }

    /// Whether this is a classification pipeline.
    ///
    /// All feature learners, feature selectors and predictors must agree;
    /// a mixed configuration is a fatal error on first interrogation.
    pub fn is_classification(&self) -> Result<bool> {
        let mut votes: Vec<bool> = Vec::new();

        votes.extend(
            self.feature_learners
                .iter()
                .map(|fl| fl.is_classification()),
        );
        for set in &self.feature_selectors.predictors {
            votes.extend(set.iter().map(|p| p.is_classification()));
        }
        for set in &self.predictors.predictors {
            votes.extend(set.iter().map(|p| p.is_classification()));
        }

        let Some(&first) = votes.first() else {
            return Ok(false);
        };

        if votes.iter().any(|&v| v != first) {
            return Err(RfeError::MixedModels);
        }

        Ok(first)
    }
}
