//! Save/load round trip through the pipeline directory layout.

mod common;

use common::TestContext;
use rust_rfe::dependency::PipelineTrackers;
use rust_rfe::helpers::Format;
use rust_rfe::logging::ProgressLogger;
use rust_rfe::pipelines::save::{save, SaveParams};
use rust_rfe::pipelines::transform::{self, TransformParams};
use rust_rfe::pipelines::{fit, load};

#[test]
fn test_save_load_round_trip() {
    let population = common::population();
    let peripherals = vec![common::transactions()];
    let pipeline = common::pipeline();
    let context = TestContext::new();

    let (fitted, _) = fit::fit(
        &pipeline,
        &context.fit_params(&population, &peripherals),
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();

    save(
        &pipeline,
        &fitted,
        &SaveParams {
            path: dir.path(),
            name: "saved-pipeline",
            format: Format::Json,
            categories: &context.categories,
        },
    )
    .unwrap();

    let saved = dir.path().join("saved-pipeline");
    assert!(saved.join("pipeline.json").exists());
    assert!(saved.join("obj.json").exists());
    assert!(saved.join("scores.json").exists());
    assert!(saved.join("feature-selector-impl.json").exists());
    assert!(saved.join("predictor-impl.json").exists());
    assert!(saved.join("preprocessor-0.json").exists() || fitted.preprocessors.is_empty());
    assert!(saved.join("feature-learner-0.json").exists());
    assert!(saved.join("feature-selector-0-0.json").exists());
    assert!(saved.join("predictor-0-0.json").exists());
    assert!(saved.join("SQL").join("pipeline.sql").exists());

    // Loading registers the components in fresh trackers and never
    // re-fits.
    let fresh_trackers = PipelineTrackers::new();
    let loaded = load::load(&saved, &pipeline, &fresh_trackers).unwrap();

    assert_eq!(loaded.fingerprints, fitted.fingerprints);
    assert_eq!(loaded.targets(), fitted.targets());
    assert_eq!(
        loaded.predictors.num_features(),
        fitted.predictors.num_features()
    );
    assert!(!fresh_trackers.fe_tracker.is_empty());
    assert!(!fresh_trackers.pred_tracker.is_empty());
    assert!(fresh_trackers.preprocessor_tracker.is_empty());

    // The loaded pipeline predicts identically to the original.
    let params = TransformParams {
        trackers: &context.trackers,
        categories: &context.categories,
        logger: ProgressLogger::silent(),
        population_df: &population,
        peripheral_dfs: &peripherals,
        predict: true,
        score: false,
        table_name: None,
    };

    let original = transform::transform(&pipeline, &fitted, &params)
        .unwrap()
        .predictions
        .unwrap();
    let restored = transform::transform(&pipeline, &loaded, &params)
        .unwrap()
        .predictions
        .unwrap();

    assert_eq!(original[0].data(), restored[0].data());
}

#[test]
fn test_save_replaces_previous_version_atomically() {
    let population = common::population();
    let peripherals = vec![common::transactions()];
    let pipeline = common::pipeline();
    let context = TestContext::new();

    let (fitted, _) = fit::fit(
        &pipeline,
        &context.fit_params(&population, &peripherals),
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let params = SaveParams {
        path: dir.path(),
        name: "saved-pipeline",
        format: Format::Json,
        categories: &context.categories,
    };

    save(&pipeline, &fitted, &params).unwrap();
    save(&pipeline, &fitted, &params).unwrap();

    // No temporary directories were left behind.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(".tmp-"))
        .collect();
    assert!(leftovers.is_empty());
}
