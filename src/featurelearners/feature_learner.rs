use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::commands::{FeatureLearnerCommand, Fingerprint};
use crate::containers::{DataFrame, Encoding, NumericalFeatures};
use crate::dependency::Fingerprinted;
use crate::featurelearners::FastProp;
use crate::helpers::{ColumnDescription, Format, Placeholder, Schema};
use crate::logging::ProgressLogger;
use crate::transpilation::SqlDialectGenerator;
use crate::{Float, Int, Result};

/// Target number signalling that a learner handles all targets at once.
pub const USE_ALL_TARGETS: Int = -1;

/// Everything a learner needs to know at construction time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureLearnerParams {
    pub dependencies: Vec<Fingerprint>,
    /// Names of the staged peripheral tables, in data-frame order.
    pub peripheral: Vec<String>,
    pub peripheral_schema: Vec<Schema>,
    pub placeholder: Placeholder,
    pub population_schema: Schema,
    /// The target this learner is fitted for, or `USE_ALL_TARGETS`.
    pub target_num: Int,
}

pub struct FitParams<'a> {
    pub logger: ProgressLogger,
    pub peripheral_dfs: &'a [DataFrame],
    pub population_df: &'a DataFrame,
    pub prefix: String,
}

pub struct TransformParams<'a> {
    /// The indices of the features to generate, within this learner's bank.
    pub index: &'a [usize],
    pub logger: ProgressLogger,
    pub peripheral_dfs: &'a [DataFrame],
    pub population_df: &'a DataFrame,
    pub prefix: String,
}

/// The capability set of a feature learner.
pub trait FeatureLearner: Fingerprinted + Send + Sync {
    fn fit(&mut self, params: &FitParams<'_>) -> Result<()>;

    fn transform(&self, params: &TransformParams<'_>) -> Result<NumericalFeatures>;

    fn num_features(&self) -> usize;

    fn silent(&self) -> bool;

    fn population_needs_targets(&self) -> bool;

    fn supports_multiple_targets(&self) -> bool;

    fn is_classification(&self) -> bool;

    /// Back-propagates per-feature importances to the raw columns.
    ///
    /// `importance_factors` has length `num_features()`; the result maps
    /// each contributing raw column to the sum of its contributions.
    fn column_importances(
        &self,
        importance_factors: &[Float],
    ) -> BTreeMap<ColumnDescription, Float>;

    fn save(&self, stem: &Path, format: Format) -> Result<()>;

    fn load(&mut self, stem: &Path, format: Format) -> Result<()>;

    fn to_sql(
        &self,
        categories: &Encoding,
        targets: bool,
        full_pipeline: bool,
        dialect: &dyn SqlDialectGenerator,
        prefix: &str,
    ) -> Vec<String>;

    fn type_name(&self) -> &'static str;
}

/// Creates a feature learner from its command.
pub fn parse(
    command: &FeatureLearnerCommand,
    params: FeatureLearnerParams,
) -> Box<dyn FeatureLearner> {
    match command {
        FeatureLearnerCommand::FastProp(hyperparams) => {
            Box::new(FastProp::new(hyperparams.clone(), params))
        }
    }
}
