//! Preprocessors inside the full pipeline: fitted columns reappear on
//! transform, and the data-model check caches its warnings.

mod common;

use common::TestContext;
use rust_rfe::commands::PreprocessorCommand;
use rust_rfe::logging::ProgressLogger;
use rust_rfe::pipelines::transform::{self, TransformParams};
use rust_rfe::pipelines::{check, fit, Pipeline};

fn pipeline_with_seasonal() -> Pipeline {
    let mut command = common::pipeline_command();
    command.preprocessors = vec![PreprocessorCommand::Seasonal {}];
    Pipeline::new(command).unwrap()
}

#[test]
fn test_seasonal_columns_survive_into_the_modified_schema() {
    let population = common::population();
    let peripherals = vec![common::transactions()];
    let pipeline = pipeline_with_seasonal();
    let context = TestContext::new();

    let (fitted, _) = fit::fit(
        &pipeline,
        &context.fit_params(&population, &peripherals),
    )
    .unwrap();

    assert_eq!(fitted.preprocessors.len(), 1);
    assert_eq!(fitted.preprocessors[0].type_name(), "Seasonal");

    // The seasonal preprocessor derived at least one categorical column
    // somewhere, and the modified schema is a superset of the original.
    let derived_categoricals = fitted.modified_population_schema.categoricals.len()
        + fitted
            .modified_peripheral_schema
            .iter()
            .map(|schema| schema.categoricals.len())
            .sum::<usize>();
    assert!(derived_categoricals > 0);

    for colname in &fitted.population_schema.numericals {
        assert!(
            fitted.modified_population_schema.numericals.contains(colname)
                || fitted.modified_population_schema.discretes.contains(colname),
            "column {} was dropped by preprocessing",
            colname
        );
    }
}

#[test]
fn test_preprocessor_transform_matches_fit_transform() {
    let population = common::population();
    let peripherals = vec![common::transactions()];
    let pipeline = pipeline_with_seasonal();
    let context = TestContext::new();

    let (fitted, _) = fit::fit(
        &pipeline,
        &context.fit_params(&population, &peripherals),
    )
    .unwrap();

    // Transforming the training data reproduces the training features.
    let output = transform::transform(
        &pipeline,
        &fitted,
        &TransformParams {
            trackers: &context.trackers,
            categories: &context.categories,
            logger: ProgressLogger::silent(),
            population_df: &population,
            peripheral_dfs: &peripherals,
            predict: false,
            score: false,
            table_name: None,
        },
    )
    .unwrap();

    assert_eq!(
        output.numerical_features.len(),
        fitted.predictors.predictor_impl.num_autofeatures()
            + fitted.predictors.predictor_impl.numerical_colnames().len()
    );
}

#[test]
fn test_preprocessor_is_cached_across_fits() {
    let population = common::population();
    let peripherals = vec![common::transactions()];
    let pipeline = pipeline_with_seasonal();
    let context = TestContext::new();

    fit::fit(&pipeline, &context.fit_params(&population, &peripherals)).unwrap();
    let cached = context.trackers.preprocessor_tracker.len();
    assert_eq!(cached, 1);

    fit::fit(&pipeline, &context.fit_params(&population, &peripherals)).unwrap();
    assert_eq!(context.trackers.preprocessor_tracker.len(), cached);
}

#[test]
fn test_check_caches_warnings() {
    let population = common::population();
    let peripherals = vec![common::transactions()];
    let pipeline = common::pipeline();
    let context = TestContext::new();

    let first = check::check(&pipeline, &context.fit_params(&population, &peripherals)).unwrap();

    // The join keys match, so no warnings.
    assert!(first.warnings().is_empty());
    assert_eq!(context.trackers.warning_tracker.len(), 1);

    // Repeating the check hits the warning tracker.
    let second = check::check(&pipeline, &context.fit_params(&population, &peripherals)).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
}

#[test]
fn test_check_warns_on_mismatched_join_keys() {
    let population = common::population();
    let pipeline = common::pipeline();
    let context = TestContext::new();

    // Shift all peripheral join keys out of range.
    let raw = common::transactions();
    let mut mismatched = rust_rfe::containers::DataFrame::new("transactions");
    let shifted: Vec<i64> = raw.join_keys()[0].iter().map(|&k| k + 1000).collect();
    mismatched
        .add_int_column(
            rust_rfe::containers::Column::new("customer_id", shifted),
            rust_rfe::containers::Role::JoinKey,
        )
        .unwrap();
    mismatched
        .add_float_column(raw.time_stamps()[0].clone(), rust_rfe::containers::Role::TimeStamp)
        .unwrap();
    mismatched
        .add_float_column(raw.numericals()[0].clone(), rust_rfe::containers::Role::Numerical)
        .unwrap();

    let peripherals = vec![mismatched];

    let warnings =
        check::check(&pipeline, &context.fit_params(&population, &peripherals)).unwrap();

    assert_eq!(warnings.warnings().len(), 1);
    assert!(warnings.warnings()[0].contains("join keys"));
}
