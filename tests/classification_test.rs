//! Classification pipelines and the mixed-model rule.

mod common;

use common::TestContext;
use rust_rfe::commands::{
    FeatureLearnerCommand, LogisticRegressionHyperparams, LossFunction, PredictorCommand,
};
use rust_rfe::containers::{Column, DataFrame, Role};
use rust_rfe::pipelines::{fit, Pipeline};
use rust_rfe::{Float, RfeError};

fn classification_population() -> DataFrame {
    let base = common::population();

    let mut df = DataFrame::new("population");
    df.add_int_column(base.join_keys()[0].clone(), Role::JoinKey)
        .unwrap();
    df.add_float_column(base.time_stamps()[0].clone(), Role::TimeStamp)
        .unwrap();
    df.add_float_column(base.numericals()[0].clone(), Role::Numerical)
        .unwrap();

    // Binarize the regression target.
    let binary: Vec<Float> = base.targets()[0]
        .iter()
        .map(|&v| if v > 5.0 { 1.0 } else { 0.0 })
        .collect();
    df.add_float_column(Column::new("churn", binary), Role::Target)
        .unwrap();

    df
}

fn logistic_regression() -> PredictorCommand {
    PredictorCommand::LogisticRegression(LogisticRegressionHyperparams {
        learning_rate: 0.3,
        reg_lambda: 0.0,
    })
}

#[test]
fn test_classification_pipeline() {
    let mut command = common::pipeline_command();
    let mut fast_prop = common::fast_prop();
    fast_prop.loss_function = LossFunction::CrossEntropyLoss;
    command.feature_learners = vec![FeatureLearnerCommand::FastProp(fast_prop)];
    command.feature_selectors = vec![logistic_regression()];
    command.predictors = vec![logistic_regression()];

    let pipeline = Pipeline::new(command).unwrap();

    let population = classification_population();
    let peripherals = vec![common::transactions()];
    let context = TestContext::new();

    let (fitted, scores) = fit::fit(
        &pipeline,
        &context.fit_params(&population, &peripherals),
    )
    .unwrap();

    assert!(fitted.is_classification().unwrap());

    let metrics = scores.latest().unwrap();
    assert!(metrics.accuracy.is_some());
    assert!(metrics.auc.is_some());
    assert!(metrics.rmse.is_none());

    let auc = metrics.auc.as_ref().unwrap()[0];
    assert!(auc > 0.9, "auc was {}", auc);
}

#[test]
fn test_mixed_models_are_rejected() {
    // A regression feature learner combined with a classification
    // predictor fails on the first interrogation of is_classification.
    let mut command = common::pipeline_command();
    command.feature_selectors = vec![common::linear_regression()];
    command.predictors = vec![logistic_regression()];

    let pipeline = Pipeline::new(command).unwrap();

    let population = classification_population();
    let peripherals = vec![common::transactions()];
    let context = TestContext::new();

    let result = fit::fit(&pipeline, &context.fit_params(&population, &peripherals));

    assert!(matches!(result, Err(RfeError::MixedModels)));
}
