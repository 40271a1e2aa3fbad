//! Hyperparameter sets for the shipped feature learners and predictors.
//!
//! Every field is required: a command that omits a hyperparameter fails to
//! parse. The engine never invents defaults.

use serde::{Deserialize, Serialize};

use crate::{Float, Int};

/// Aggregations the FastProp feature learner may apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    #[serde(rename = "COUNT")]
    Count,
    #[serde(rename = "COUNT DISTINCT")]
    CountDistinct,
    #[serde(rename = "COUNT MINUS COUNT DISTINCT")]
    CountMinusCountDistinct,
    #[serde(rename = "SUM")]
    Sum,
    #[serde(rename = "AVG")]
    Avg,
    #[serde(rename = "MIN")]
    Min,
    #[serde(rename = "MAX")]
    Max,
    #[serde(rename = "FIRST")]
    First,
    #[serde(rename = "LAST")]
    Last,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Count => "COUNT",
            Aggregation::CountDistinct => "COUNT DISTINCT",
            Aggregation::CountMinusCountDistinct => "COUNT MINUS COUNT DISTINCT",
            Aggregation::Sum => "SUM",
            Aggregation::Avg => "AVG",
            Aggregation::Min => "MIN",
            Aggregation::Max => "MAX",
            Aggregation::First => "FIRST",
            Aggregation::Last => "LAST",
        }
    }
}

/// The loss function a component optimizes. Determines whether the
/// component counts as a classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossFunction {
    CrossEntropyLoss,
    SquareLoss,
}

/// Hyperparameters of the FastProp feature learner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FastPropHyperparams {
    /// The aggregations used to generate features.
    pub aggregations: Vec<Aggregation>,
    /// FastProp is unsupervised; the loss function only decides whether the
    /// learner reports itself as a classifier.
    pub loss_function: LossFunction,
    /// The number of most frequent categories per categorical column from
    /// which conditional count features are generated.
    pub n_most_frequent: usize,
    /// The maximum number of features generated.
    pub num_features: usize,
    /// Worker threads; values <= 0 resolve to half the logical cores.
    pub num_threads: Int,
    /// Whether progress logging is suppressed.
    pub silent: bool,
}

/// Hyperparameters of the linear regression predictor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinearRegressionHyperparams {
    pub learning_rate: Float,
    pub reg_lambda: Float,
}

/// Hyperparameters of the logistic regression predictor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogisticRegressionHyperparams {
    pub learning_rate: Float,
    pub reg_lambda: Float,
}

/// Training objective of the gradient-boosting predictor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum XGBoostObjective {
    #[serde(rename = "reg:squarederror")]
    SquaredError,
    #[serde(rename = "binary:logistic")]
    BinaryLogistic,
}

/// Hyperparameters of the gradient-boosting predictor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct XGBoostHyperparams {
    pub objective: XGBoostObjective,
    pub n_estimators: usize,
    pub learning_rate: Float,
    pub max_depth: usize,
    pub min_child_weights: Float,
    pub reg_lambda: Float,
    pub subsample: Float,
    /// Worker threads; values <= 0 resolve to half the logical cores.
    pub n_jobs: Int,
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_hyperparameter_is_an_error() {
        let json = r#"{"learning_rate": 0.1}"#;
        let result: std::result::Result<LinearRegressionHyperparams, _> =
            serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_aggregation_wire_names() {
        let json = serde_json::to_string(&Aggregation::CountDistinct).unwrap();
        assert_eq!(json, "\"COUNT DISTINCT\"");
        let parsed: Aggregation = serde_json::from_str("\"AVG\"").unwrap();
        assert_eq!(parsed, Aggregation::Avg);
    }
}
