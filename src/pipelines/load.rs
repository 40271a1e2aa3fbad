//! Rebuilds a fitted pipeline from disk.
//!
//! Components are reconstructed in topological order - preprocessors,
//! feature learners, feature selectors, predictors - and every one is
//! registered with its tracker so subsequent fits can short-circuit via
//! retrieval. Loading never re-fits anything.

use std::path::Path;
use std::sync::Arc;

use crate::dependency::PipelineTrackers;
use crate::featurelearners::{FeatureLearner, FeatureLearnerParams, USE_ALL_TARGETS};
use crate::helpers::{saver, Format};
use crate::pipelines::fit::{self, Purpose};
use crate::pipelines::fitted_pipeline::{FittedPipeline, Predictors};
use crate::pipelines::save::PipelineJson;
use crate::pipelines::Pipeline;
use crate::predictors::{Predictor, PredictorImpl};
use crate::preprocessors::Preprocessor;
use crate::Result;

/// Loads a saved pipeline directory.
pub fn load(
    path: &Path,
    pipeline: &Pipeline,
    trackers: &PipelineTrackers,
) -> Result<Arc<FittedPipeline>> {
    let format = saver::detect_format(path, "pipeline")?;

    let pipeline_json: PipelineJson = saver::load(&path.join("pipeline"), format)?;

    let (feature_selector_impl, predictor_impl) = load_impls(path, format)?;

    let preprocessors = load_preprocessors(path, format, pipeline, &pipeline_json, trackers)?;

    let feature_learners = load_feature_learners(path, format, pipeline, &pipeline_json, trackers)?;

    let feature_selectors = load_predictors(
        path,
        format,
        pipeline,
        &pipeline_json,
        trackers,
        Purpose::FeatureSelectors,
        feature_selector_impl,
    )?;

    let predictors = load_predictors(
        path,
        format,
        pipeline,
        &pipeline_json,
        trackers,
        Purpose::Predictors,
        predictor_impl,
    )?;

    Ok(Arc::new(FittedPipeline {
        feature_learners,
        feature_selectors,
        fingerprints: pipeline_json.fingerprints,
        modified_peripheral_schema: pipeline_json.modified_peripheral_schema,
        modified_population_schema: pipeline_json.modified_population_schema,
        peripheral_schema: pipeline_json.peripheral_schema,
        population_schema: pipeline_json.population_schema,
        predictors,
        preprocessors,
        creation_time: pipeline_json.creation_time,
    }))
}

fn load_impls(path: &Path, format: Format) -> Result<(Arc<PredictorImpl>, Arc<PredictorImpl>)> {
    let feature_selector_impl: PredictorImpl =
        saver::load(&path.join("feature-selector-impl"), format)?;
    let predictor_impl: PredictorImpl = saver::load(&path.join("predictor-impl"), format)?;
    Ok((Arc::new(feature_selector_impl), Arc::new(predictor_impl)))
}

fn load_preprocessors(
    path: &Path,
    format: Format,
    pipeline: &Pipeline,
    pipeline_json: &PipelineJson,
    trackers: &PipelineTrackers,
) -> Result<Vec<Arc<dyn Preprocessor>>> {
    let preprocessors =
        fit::init_preprocessors(pipeline, &pipeline_json.fingerprints.df_fingerprints);

    let mut loaded = Vec::with_capacity(preprocessors.len());

    for (i, mut preprocessor) in preprocessors.into_iter().enumerate() {
        preprocessor.load(&path.join(format!("preprocessor-{}", i)), format)?;
        let arc: Arc<dyn Preprocessor> = Arc::from(preprocessor);
        trackers.preprocessor_tracker.add(arc.clone());
        loaded.push(arc);
    }

    Ok(loaded)
}

fn load_feature_learners(
    path: &Path,
    format: Format,
    pipeline: &Pipeline,
    pipeline_json: &PipelineJson,
    trackers: &PipelineTrackers,
) -> Result<Vec<Arc<dyn FeatureLearner>>> {
    let (placeholder, _) = pipeline.make_placeholder()?;

    let feature_learner_params = FeatureLearnerParams {
        dependencies: pipeline_json.fingerprints.preprocessor_fingerprints.clone(),
        peripheral: pipeline_json
            .modified_peripheral_schema
            .iter()
            .map(|schema| schema.name.clone())
            .collect(),
        peripheral_schema: pipeline_json.modified_peripheral_schema.clone(),
        placeholder,
        population_schema: pipeline_json.modified_population_schema.clone(),
        target_num: USE_ALL_TARGETS,
    };

    let feature_learners = fit::init_feature_learners(
        pipeline,
        &feature_learner_params,
        pipeline_json.targets.len(),
    )?;

    let mut loaded = Vec::with_capacity(feature_learners.len());

    for (i, mut learner) in feature_learners.into_iter().enumerate() {
        learner.load(&path.join(format!("feature-learner-{}", i)), format)?;
        let arc: Arc<dyn FeatureLearner> = Arc::from(learner);
        trackers.fe_tracker.add(arc.clone());
        loaded.push(arc);
    }

    Ok(loaded)
}

fn load_predictors(
    path: &Path,
    format: Format,
    pipeline: &Pipeline,
    pipeline_json: &PipelineJson,
    trackers: &PipelineTrackers,
    purpose: Purpose,
    predictor_impl: Arc<PredictorImpl>,
) -> Result<Predictors> {
    let (dependencies, stem) = match purpose {
        Purpose::FeatureSelectors => (
            &pipeline_json.fingerprints.fl_fingerprints,
            "feature-selector",
        ),
        Purpose::Predictors => (&pipeline_json.fingerprints.fs_fingerprints, "predictor"),
    };

    let predictors = fit::init_predictors(
        pipeline,
        purpose,
        &predictor_impl,
        dependencies,
        pipeline_json.targets.len(),
    );

    let mut loaded_rows = Vec::with_capacity(predictors.len());

    for (i, row) in predictors.into_iter().enumerate() {
        let mut loaded_row: Vec<Arc<dyn Predictor>> = Vec::with_capacity(row.len());
        for (j, mut predictor) in row.into_iter().enumerate() {
            predictor.load(&path.join(format!("{}-{}-{}", stem, i, j)), format)?;
            let arc: Arc<dyn Predictor> = Arc::from(predictor);
            trackers.pred_tracker.add(arc.clone());
            loaded_row.push(arc);
        }
        loaded_rows.push(loaded_row);
    }

    Ok(Predictors {
        predictor_impl,
        predictors: loaded_rows,
    })
}
