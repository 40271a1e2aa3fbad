//! Fingerprint identity across predictor replication and the tracker
//! contracts.

mod common;

use std::sync::Arc;

use rust_rfe::commands::FingerprintValue;
use rust_rfe::dependency::Fingerprinted;
use rust_rfe::pipelines::fit::{self, Purpose};
use rust_rfe::predictors::PredictorImpl;

#[test]
fn test_replicated_predictors_differ_only_in_target_number() {
    // Two targets, one logistic-regression definition.
    let mut command = common::pipeline_command();
    command.predictors = vec![rust_rfe::commands::PredictorCommand::LogisticRegression(
        rust_rfe::commands::LogisticRegressionHyperparams {
            learning_rate: 0.1,
            reg_lambda: 0.01,
        },
    )];
    let pipeline = rust_rfe::pipelines::Pipeline::new(command).unwrap();

    let predictor_impl = Arc::new(PredictorImpl::new(&[5], vec![], vec!["age".to_string()]));

    let predictors = fit::init_predictors(&pipeline, Purpose::Predictors, &predictor_impl, &[], 2);

    assert_eq!(predictors.len(), 2);
    assert_eq!(predictors[0].len(), 1);

    let first = predictors[0][0].fingerprint();
    let second = predictors[1][0].fingerprint();

    assert_ne!(first, second);

    // Both are LogisticRegression variants with byte-identical
    // hyperparameter subtrees; only the appended target number differs.
    let extract = |fingerprint: &rust_rfe::commands::Fingerprint| match fingerprint.value() {
        FingerprintValue::LogisticRegression {
            hyperparams,
            dependencies,
            ..
        } => (hyperparams.clone(), dependencies.clone()),
        other => panic!("unexpected variant: {:?}", other),
    };

    let (hyperparams_first, dependencies_first) = extract(&first);
    let (hyperparams_second, dependencies_second) = extract(&second);

    assert_eq!(hyperparams_first, hyperparams_second);

    let target_number = |dependencies: &[rust_rfe::commands::Fingerprint]| {
        match dependencies.last().map(|d| d.value()) {
            Some(FingerprintValue::TargetNumber { target_num }) => *target_num,
            other => panic!("expected a target number, got {:?}", other),
        }
    };

    assert_eq!(target_number(&dependencies_first), 0);
    assert_eq!(target_number(&dependencies_second), 1);
}

#[test]
fn test_data_frame_fingerprint_order() {
    let population = common::population();
    let peripherals = vec![common::transactions()];
    let pipeline = common::pipeline();

    let fingerprints = fit::extract_df_fingerprints(&pipeline, &population, &peripherals);

    assert_eq!(fingerprints.len(), 3);
    assert!(matches!(
        fingerprints[0].value(),
        FingerprintValue::DataModel(_)
    ));
    assert_eq!(fingerprints[1], population.fingerprint());
    assert_eq!(fingerprints[2], peripherals[0].fingerprint());
}

#[test]
fn test_mutating_a_dependency_changes_the_fingerprint() {
    let mut population = common::population();
    let peripherals = vec![common::transactions()];
    let pipeline = common::pipeline();

    let before = fit::extract_df_fingerprints(&pipeline, &population, &peripherals);

    population
        .add_float_column(
            rust_rfe::containers::Column::new("noise", vec![0.0; population.nrows()]),
            rust_rfe::containers::Role::Numerical,
        )
        .unwrap();

    let after = fit::extract_df_fingerprints(&pipeline, &population, &peripherals);

    assert_eq!(before[0], after[0]);
    assert_ne!(before[1], after[1]);
}
