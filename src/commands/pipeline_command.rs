use serde::{Deserialize, Serialize};

use crate::commands::data_model::DataModel;
use crate::commands::hyperparameters::{
    FastPropHyperparams, LinearRegressionHyperparams, LogisticRegressionHyperparams,
    XGBoostHyperparams,
};
use crate::{Float, Result};

/// Command describing one preprocessor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PreprocessorCommand {
    CategoryTrimmer {
        max_num_categories: usize,
        min_freq: usize,
    },
    EMailDomain {},
    Imputation {
        add_dummies: bool,
    },
    Seasonal {},
    Substring {
        begin: usize,
        length: usize,
        unit: String,
    },
    TextFieldSplitter {},
}

impl PreprocessorCommand {
    pub fn type_name(&self) -> &'static str {
        match self {
            PreprocessorCommand::CategoryTrimmer { .. } => "CategoryTrimmer",
            PreprocessorCommand::EMailDomain {} => "EMailDomain",
            PreprocessorCommand::Imputation { .. } => "Imputation",
            PreprocessorCommand::Seasonal {} => "Seasonal",
            PreprocessorCommand::Substring { .. } => "Substring",
            PreprocessorCommand::TextFieldSplitter {} => "TextFieldSplitter",
        }
    }
}

/// Command describing one feature learner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FeatureLearnerCommand {
    FastProp(FastPropHyperparams),
}

/// Command describing one predictor or feature selector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PredictorCommand {
    LinearRegression(LinearRegressionHyperparams),
    LogisticRegression(LogisticRegressionHyperparams),
    XGBoost(XGBoostHyperparams),
}

/// The pipeline definition as sent by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineCommand {
    pub name: String,
    pub data_model: DataModel,
    /// The names of the peripheral placeholders, in the order the
    /// peripheral data frames are passed to fit and transform.
    pub peripheral: Vec<String>,
    pub preprocessors: Vec<PreprocessorCommand>,
    pub feature_learners: Vec<FeatureLearnerCommand>,
    pub feature_selectors: Vec<PredictorCommand>,
    pub predictors: Vec<PredictorCommand>,
    pub include_categorical: bool,
    /// Share of features kept after feature selection; a value <= 0 keeps
    /// everything.
    pub share_selected_features: Float,
    pub allow_http: bool,
    pub tags: Vec<String>,
}

impl PipelineCommand {
    /// Validates the parts that can be checked before any data is seen.
    pub fn validate(&self) -> Result<()> {
        self.data_model.check_lengths()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::hyperparameters::{Aggregation, LossFunction};

    fn fast_prop() -> FastPropHyperparams {
        FastPropHyperparams {
            aggregations: vec![Aggregation::Count, Aggregation::Avg],
            loss_function: LossFunction::SquareLoss,
            n_most_frequent: 0,
            num_features: 20,
            num_threads: 1,
            silent: true,
        }
    }

    #[test]
    fn test_round_trip() {
        let command = PipelineCommand {
            name: "p".to_string(),
            data_model: DataModel::new("population"),
            peripheral: vec!["trans".to_string()],
            preprocessors: vec![PreprocessorCommand::Seasonal {}],
            feature_learners: vec![FeatureLearnerCommand::FastProp(fast_prop())],
            feature_selectors: vec![],
            predictors: vec![PredictorCommand::LinearRegression(
                LinearRegressionHyperparams {
                    learning_rate: 0.1,
                    reg_lambda: 0.0,
                },
            )],
            include_categorical: true,
            share_selected_features: 0.5,
            allow_http: false,
            tags: vec![],
        };
        let json = serde_json::to_string(&command).unwrap();
        let restored: PipelineCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, command);
    }
}
