//! The fit state machine.
//!
//! Every step short-circuits on a fingerprint hit: preprocessors, feature
//! learners, feature selectors and predictors are looked up in their
//! trackers before any algorithmic work runs, and inserted only after
//! their fit completes.

use std::sync::Arc;

use rayon::prelude::*;

use crate::commands::{Fingerprint, FingerprintValue};
use crate::containers::{DataFrame, Encoding, Feature, NumericalFeatures};
use crate::dependency::PipelineTrackers;
use crate::featurelearners::{self, FeatureLearner, FeatureLearnerParams, USE_ALL_TARGETS};
use crate::helpers::Schema;
use crate::logging::ProgressLogger;
use crate::metrics::{self, scores::transpose, Scores};
use crate::pipelines::fingerprints::Fingerprints;
use crate::pipelines::fitted_pipeline::{FittedPipeline, Predictors};
use crate::pipelines::score;
use crate::pipelines::transform::{self, MakeFeaturesParams};
use crate::pipelines::Pipeline;
use crate::predictors::{self, Predictor, PredictorImpl};
use crate::preprocessors::{self, Preprocessor, PreprocessorParams, MAPPING};
use crate::{Float, Int, Result, RfeError};

/// Parameters of a fit call.
pub struct FitParams<'a> {
    pub trackers: &'a PipelineTrackers,
    pub categories: &'a Encoding,
    pub logger: ProgressLogger,
    pub population_df: &'a DataFrame,
    pub peripheral_dfs: &'a [DataFrame],
    pub validation_df: Option<&'a DataFrame>,
}

/// Whether predictors are fitted as feature selectors or as the final
/// predictors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Purpose {
    FeatureSelectors,
    Predictors,
}

impl Purpose {
    fn beautified(&self) -> &'static str {
        match self {
            Purpose::FeatureSelectors => "feature selector",
            Purpose::Predictors => "predictor",
        }
    }
}

/// The output of the preprocessor stage.
pub struct Preprocessed {
    pub df_fingerprints: Vec<Fingerprint>,
    pub population_df: DataFrame,
    pub peripheral_dfs: Vec<DataFrame>,
    pub preprocessors: Vec<Arc<dyn Preprocessor>>,
    pub preprocessor_fingerprints: Vec<Fingerprint>,
}

// ----------------------------------------------------------------------

/// The fingerprints of the raw inputs: the data model first, then the
/// population, then every peripheral.
pub fn extract_df_fingerprints(
    pipeline: &Pipeline,
    population_df: &DataFrame,
    peripheral_dfs: &[DataFrame],
) -> Vec<Fingerprint> {
    let mut fingerprints = vec![Fingerprint::new(FingerprintValue::DataModel(Box::new(
        pipeline.command().data_model.clone(),
    )))];
    fingerprints.push(population_df.fingerprint());
    fingerprints.extend(peripheral_dfs.iter().map(DataFrame::fingerprint));
    fingerprints
}

/// The original and (optionally discrete-split) schemata of the tables.
pub fn extract_schemata(
    population_df: &DataFrame,
    peripheral_dfs: &[DataFrame],
    separate_discrete: bool,
) -> (Schema, Vec<Schema>) {
    (
        population_df.to_schema(separate_discrete),
        peripheral_dfs
            .iter()
            .map(|df| df.to_schema(separate_discrete))
            .collect(),
    )
}

// ----------------------------------------------------------------------
// Preprocessors

/// Creates the preprocessors, moves mapping-type ones to the end and
/// threads the fingerprint chain forward so preprocessor i depends on
/// preprocessors 0..i-1.
pub fn init_preprocessors(
    pipeline: &Pipeline,
    dependencies: &[Fingerprint],
) -> Vec<Box<dyn Preprocessor>> {
    let mut parsed: Vec<Box<dyn Preprocessor>> = pipeline
        .command()
        .preprocessors
        .iter()
        .map(|command| preprocessors::parse(command, dependencies))
        .collect();

    parsed.sort_by_key(|p| p.type_name() == MAPPING);

    let mut chained = Vec::with_capacity(parsed.len());
    let mut chain = dependencies.to_vec();

    for preprocessor in parsed {
        let clone = preprocessor.clone_with_dependencies(&chain);
        chain.push(clone.fingerprint());
        chained.push(clone);
    }

    chained
}

fn fit_transform_preprocessors(
    pipeline: &Pipeline,
    params: &FitParams<'_>,
    dependencies: &[Fingerprint],
    population_df: DataFrame,
    peripheral_dfs: Vec<DataFrame>,
) -> Result<(Vec<Arc<dyn Preprocessor>>, Vec<Fingerprint>, DataFrame, Vec<DataFrame>)> {
    let preprocessors = init_preprocessors(pipeline, dependencies);

    if preprocessors.is_empty() {
        return Ok((Vec::new(), dependencies.to_vec(), population_df, peripheral_dfs));
    }

    let (placeholder, peripheral_names) = pipeline.make_placeholder()?;

    params.logger.log("Preprocessing...");

    let mut population = population_df;
    let mut peripherals = peripheral_dfs;

    let total = preprocessors.len();
    let mut fitted: Vec<Arc<dyn Preprocessor>> = Vec::with_capacity(total);

    for (i, mut preprocessor) in preprocessors.into_iter().enumerate() {
        params.logger.progress(i * 100 / total);

        let preprocessor_params = PreprocessorParams {
            categories: params.categories,
            logger: params.logger.clone(),
            logging_begin: i * 100 / total,
            logging_end: (i + 1) * 100 / total,
            peripheral_dfs: &peripherals,
            peripheral_names: &peripheral_names,
            placeholder: &placeholder,
            population_df: &population,
        };

        let fingerprint = preprocessor.fingerprint();

        let arc = match params.trackers.preprocessor_tracker.retrieve(&fingerprint) {
            Some(retrieved) => {
                let (new_population, new_peripherals) =
                    retrieved.transform(&preprocessor_params)?;
                population = new_population;
                peripherals = new_peripherals;
                retrieved
            }
            None => {
                let (new_population, new_peripherals) =
                    preprocessor.fit_transform(&preprocessor_params)?;
                population = new_population;
                peripherals = new_peripherals;
                let arc: Arc<dyn Preprocessor> = Arc::from(preprocessor);
                params.trackers.preprocessor_tracker.add(arc.clone());
                arc
            }
        };

        fitted.push(arc);
    }

    params.logger.progress(100);

    let preprocessor_fingerprints = fitted.iter().map(|p| p.fingerprint()).collect();

    Ok((fitted, preprocessor_fingerprints, population, peripherals))
}

/// Stages the raw tables and fits the preprocessors. Also used by the
/// data-model check.
pub fn fit_preprocessors_only(
    pipeline: &Pipeline,
    params: &FitParams<'_>,
) -> Result<Preprocessed> {
    let df_fingerprints =
        extract_df_fingerprints(pipeline, params.population_df, params.peripheral_dfs);

    let (staged_population, staged_peripherals) = transform::stage_data_frames(
        pipeline,
        params.population_df,
        params.peripheral_dfs,
        &params.logger,
    )?;

    let (preprocessors, preprocessor_fingerprints, population_df, peripheral_dfs) =
        fit_transform_preprocessors(
            pipeline,
            params,
            &df_fingerprints,
            staged_population,
            staged_peripherals,
        )?;

    Ok(Preprocessed {
        df_fingerprints,
        population_df,
        peripheral_dfs,
        preprocessors,
        preprocessor_fingerprints,
    })
}

// ----------------------------------------------------------------------
// Feature learners

/// Creates the feature learners, replicating any learner that cannot
/// handle multiple targets once per target.
pub fn init_feature_learners(
    pipeline: &Pipeline,
    feature_learner_params: &FeatureLearnerParams,
    num_targets: usize,
) -> Result<Vec<Box<dyn FeatureLearner>>> {
    if num_targets == 0 {
        return Err(RfeError::Configuration(
            "You must provide at least one target.".to_string(),
        ));
    }

    let mut feature_learners = Vec::new();

    for command in &pipeline.command().feature_learners {
        let all_targets = featurelearners::parse(
            command,
            FeatureLearnerParams {
                target_num: USE_ALL_TARGETS,
                ..feature_learner_params.clone()
            },
        );

        if all_targets.supports_multiple_targets() {
            feature_learners.push(all_targets);
            continue;
        }

        for target_num in 0..num_targets {
            feature_learners.push(featurelearners::parse(
                command,
                FeatureLearnerParams {
                    target_num: target_num as Int,
                    ..feature_learner_params.clone()
                },
            ));
        }
    }

    Ok(feature_learners)
}

fn fit_feature_learners(
    params: &FitParams<'_>,
    feature_learners: Vec<Box<dyn FeatureLearner>>,
    dependencies: &[Fingerprint],
    population_df: &DataFrame,
    peripheral_dfs: &[DataFrame],
) -> Result<(Vec<Arc<dyn FeatureLearner>>, Vec<Fingerprint>)> {
    if feature_learners.is_empty() {
        return Ok((Vec::new(), dependencies.to_vec()));
    }

    let mut fitted: Vec<Arc<dyn FeatureLearner>> = Vec::with_capacity(feature_learners.len());

    for (i, mut learner) in feature_learners.into_iter().enumerate() {
        let logger = ProgressLogger::new(None, learner.silent());

        let fingerprint = learner.fingerprint();

        if let Some(retrieved) = params.trackers.fe_tracker.retrieve(&fingerprint) {
            logger.log(
                "Retrieving features (because a similar feature learner has already \
                 been fitted)...",
            );
            logger.progress(100);
            fitted.push(retrieved);
            continue;
        }

        learner.fit(&featurelearners::FitParams {
            logger,
            peripheral_dfs,
            population_df,
            prefix: format!("{}_", i + 1),
        })?;

        let arc: Arc<dyn FeatureLearner> = Arc::from(learner);
        params.trackers.fe_tracker.add(arc.clone());
        fitted.push(arc);
    }

    let fingerprints = fitted.iter().map(|fl| fl.fingerprint()).collect();

    Ok((fitted, fingerprints))
}

// ----------------------------------------------------------------------
// Predictor impls

/// The impl used by the feature selectors: every auto-feature of every
/// learner plus all eligible manual columns.
fn make_feature_selector_impl(
    pipeline: &Pipeline,
    feature_learners: &[Arc<dyn FeatureLearner>],
    population_df: &DataFrame,
) -> Result<Arc<PredictorImpl>> {
    let categorical_colnames: Vec<String> = if pipeline.include_categorical() {
        population_df
            .categoricals()
            .iter()
            .filter(|col| transform::is_predictor_input(col.unit(), col.subroles()))
            .map(|col| col.name().to_string())
            .collect()
    } else {
        Vec::new()
    };

    let numerical_colnames: Vec<String> = population_df
        .numericals()
        .iter()
        .filter(|col| transform::is_predictor_input(col.unit(), col.subroles()))
        .filter(|col| col.iter().all(|v| v.is_finite()))
        .map(|col| col.name().to_string())
        .collect();

    let num_autofeatures: Vec<usize> = feature_learners
        .iter()
        .map(|fl| fl.num_features())
        .collect();

    let mut predictor_impl =
        PredictorImpl::new(&num_autofeatures, categorical_colnames, numerical_colnames);

    let categorical_features =
        transform::get_categorical_features(pipeline, population_df, &predictor_impl)?;

    predictor_impl.fit_encodings(&categorical_features);

    Ok(Arc::new(predictor_impl))
}

/// Ranks the global feature positions by the summed importance over all
/// feature selectors of all targets, most important first.
fn calculate_importance_index(feature_selectors: &Predictors) -> Vec<usize> {
    let importances = score::feature_importances(feature_selectors);

    let mut sums = vec![0.0; feature_selectors.num_features()];
    for per_target in &importances {
        for (sum, value) in sums.iter_mut().zip(per_target) {
            *sum += value.abs();
        }
    }

    let mut positions: Vec<usize> = (0..sums.len()).collect();
    positions.sort_by(|&a, &b| {
        sums[b]
            .partial_cmp(&sums[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.cmp(&b))
    });
    positions
}

/// The impl used by the final predictors: the selector impl, pruned to
/// the top share of features when feature selection is enabled.
fn make_predictor_impl(
    pipeline: &Pipeline,
    feature_selectors: &Predictors,
    population_df: &DataFrame,
) -> Result<Arc<PredictorImpl>> {
    let mut predictor_impl = (*feature_selectors.predictor_impl).clone();

    if feature_selectors.size() == 0 || feature_selectors.num_predictors_per_set() == 0 {
        return Ok(Arc::new(predictor_impl));
    }

    let share = pipeline.share_selected_features();
    if share <= 0.0 {
        return Ok(Arc::new(predictor_impl));
    }

    let index = calculate_importance_index(feature_selectors);

    let n_selected = ((index.len() as Float * share) as usize).max(1);

    predictor_impl.select_features(n_selected, &index);

    let categorical_features =
        transform::get_categorical_features(pipeline, population_df, &predictor_impl)?;

    predictor_impl.fit_encodings(&categorical_features);

    Ok(Arc::new(predictor_impl))
}

// ----------------------------------------------------------------------
// Predictors

/// Creates the predictor table, one row per target, appending the target
/// number to each predictor's dependency list.
pub fn init_predictors(
    pipeline: &Pipeline,
    purpose: Purpose,
    predictor_impl: &Arc<PredictorImpl>,
    dependencies: &[Fingerprint],
    num_targets: usize,
) -> Vec<Vec<Box<dyn Predictor>>> {
    let commands = match purpose {
        Purpose::FeatureSelectors => &pipeline.command().feature_selectors,
        Purpose::Predictors => &pipeline.command().predictors,
    };

    (0..num_targets)
        .map(|target_num| {
            let mut target_dependencies = dependencies.to_vec();
            target_dependencies.push(Fingerprint::new(FingerprintValue::TargetNumber {
                target_num,
            }));

            commands
                .iter()
                .map(|command| {
                    predictors::parse(command, predictor_impl.clone(), target_dependencies.clone())
                })
                .collect()
        })
        .collect()
}

/// Looks up every slot in the predictor tracker. The second element is
/// whether all slots hit.
fn retrieve_predictors(
    params: &FitParams<'_>,
    predictors: &[Vec<Box<dyn Predictor>>],
) -> (Vec<Vec<Option<Arc<dyn Predictor>>>>, bool) {
    let mut all_retrieved = true;
    let mut retrieved = Vec::with_capacity(predictors.len());

    for row in predictors {
        let mut retrieved_row = Vec::with_capacity(row.len());
        for predictor in row {
            let hit = params.trackers.pred_tracker.retrieve(&predictor.fingerprint());
            if hit.is_none() {
                all_retrieved = false;
            }
            retrieved_row.push(hit);
        }
        retrieved.push(retrieved_row);
    }

    (retrieved, all_retrieved)
}

fn extract_predictor_fingerprints(
    predictors: &[Vec<Arc<dyn Predictor>>],
    dependencies: &[Fingerprint],
) -> Vec<Fingerprint> {
    if predictors.is_empty() || predictors[0].is_empty() {
        return dependencies.to_vec();
    }
    predictors
        .iter()
        .flat_map(|row| row.iter().map(|p| p.fingerprint()))
        .collect()
}

struct FitPredictorsParams<'a> {
    fit_params: &'a FitParams<'a>,
    pipeline: &'a Pipeline,
    purpose: Purpose,
    dependencies: &'a [Fingerprint],
    feature_learners: &'a [Arc<dyn FeatureLearner>],
    predictor_impl: Arc<PredictorImpl>,
    population_df: &'a DataFrame,
    peripheral_dfs: &'a [DataFrame],
    preprocessors: &'a [Arc<dyn Preprocessor>],
}

/// Builds the validation features when a validation frame was passed.
/// Only the final predictors see validation data.
fn make_features_validation(
    params: &FitPredictorsParams<'_>,
) -> Result<Option<(NumericalFeatures, crate::containers::CategoricalFeatures)>> {
    let Some(validation_df) = params.fit_params.validation_df else {
        return Ok(None);
    };

    if params.purpose == Purpose::FeatureSelectors {
        return Ok(None);
    }

    let (staged_population, staged_peripherals) = transform::stage_data_frames(
        params.pipeline,
        validation_df,
        params.fit_params.peripheral_dfs,
        &params.fit_params.logger,
    )?;

    let (population, peripherals) = transform::apply_preprocessors(
        params.pipeline,
        params.preprocessors,
        params.fit_params.categories,
        &params.fit_params.logger,
        staged_population,
        staged_peripherals,
    )?;

    let make_features_params = MakeFeaturesParams {
        trackers: params.fit_params.trackers,
        categories: params.fit_params.categories,
        logger: params.fit_params.logger.clone(),
        dependencies: params.dependencies,
        original_population_df: validation_df,
        original_peripheral_dfs: params.fit_params.peripheral_dfs,
        population_df: &population,
        peripheral_dfs: &peripherals,
    };

    let (numerical, categorical, _) = transform::make_features(
        &make_features_params,
        params.pipeline,
        params.feature_learners,
        &params.predictor_impl,
    )?;

    Ok(Some((numerical, categorical)))
}

fn fit_predictors(
    params: FitPredictorsParams<'_>,
) -> Result<(Predictors, Vec<Fingerprint>)> {
    let num_targets = params.fit_params.population_df.num_targets();

    let predictors = init_predictors(
        params.pipeline,
        params.purpose,
        &params.predictor_impl,
        params.dependencies,
        num_targets,
    );

    let (retrieved, all_retrieved) = retrieve_predictors(params.fit_params, &predictors);

    if all_retrieved {
        let final_predictors: Vec<Vec<Arc<dyn Predictor>>> = retrieved
            .into_iter()
            .map(|row| row.into_iter().flatten().collect())
            .collect();
        let fingerprints =
            extract_predictor_fingerprints(&final_predictors, params.dependencies);
        return Ok((
            Predictors {
                predictor_impl: params.predictor_impl,
                predictors: final_predictors,
            },
            fingerprints,
        ));
    }

    let make_features_params = MakeFeaturesParams {
        trackers: params.fit_params.trackers,
        categories: params.fit_params.categories,
        logger: params.fit_params.logger.clone(),
        dependencies: params.dependencies,
        original_population_df: params.fit_params.population_df,
        original_peripheral_dfs: params.fit_params.peripheral_dfs,
        population_df: params.population_df,
        peripheral_dfs: params.peripheral_dfs,
    };

    let (numerical_features, categorical_features, _) = transform::make_features(
        &make_features_params,
        params.pipeline,
        params.feature_learners,
        &params.predictor_impl,
    )?;

    let categorical_features = params
        .predictor_impl
        .transform_encodings(&categorical_features)?;

    let validation = make_features_validation(&params)?;
    let validation = match validation {
        Some((numerical, categorical)) => Some((
            numerical,
            params.predictor_impl.transform_encodings(&categorical)?,
        )),
        None => None,
    };

    let targets: Vec<Feature<Float>> = (0..num_targets)
        .map(|t| {
            params
                .fit_params
                .population_df
                .target(t)
                .map(Feature::from_column)
        })
        .collect::<Result<_>>()?;

    let validation_targets: Vec<Option<Feature<Float>>> = (0..num_targets)
        .map(|t| match params.fit_params.validation_df {
            Some(df) if validation.is_some() => df.target(t).map(Feature::from_column).map(Some),
            _ => Ok(None),
        })
        .collect::<Result<_>>()?;

    // Per-target fits are independent and run in parallel; the tracker is
    // add-only and thread-safe, and an indexed collect keeps the target
    // order.
    let work: Vec<_> = predictors
        .into_iter()
        .zip(retrieved)
        .zip(targets.iter().zip(&validation_targets))
        .collect();

    let fitted_rows: Vec<Result<Vec<Arc<dyn Predictor>>>> = work
        .into_par_iter()
        .map(|((row, retrieved_row), (target, validation_target))| {
            let mut fitted_row: Vec<Arc<dyn Predictor>> = Vec::with_capacity(row.len());

            for (mut predictor, hit) in row.into_iter().zip(retrieved_row) {
                if let Some(retrieved_predictor) = hit {
                    params.fit_params.logger.log("Retrieving predictor...");
                    fitted_row.push(retrieved_predictor);
                    continue;
                }

                params.fit_params.logger.log(&format!(
                    "{}: Training as {}...",
                    predictor.type_name(),
                    params.purpose.beautified()
                ));

                predictor.fit(
                    &ProgressLogger::new(None, predictor.silent()),
                    &categorical_features,
                    &numerical_features,
                    target,
                    validation.as_ref().map(|(_, categorical)| categorical),
                    validation.as_ref().map(|(numerical, _)| numerical),
                    validation_target.as_ref(),
                )?;

                let arc: Arc<dyn Predictor> = Arc::from(predictor);
                params.fit_params.trackers.pred_tracker.add(arc.clone());
                fitted_row.push(arc);
            }

            Ok(fitted_row)
        })
        .collect();

    let final_predictors: Vec<Vec<Arc<dyn Predictor>>> =
        fitted_rows.into_iter().collect::<Result<_>>()?;

    let fingerprints = extract_predictor_fingerprints(&final_predictors, params.dependencies);

    Ok((
        Predictors {
            predictor_impl: params.predictor_impl,
            predictors: final_predictors,
        },
        fingerprints,
    ))
}

// ----------------------------------------------------------------------

/// Fits the pipeline and returns the frozen bundle together with the
/// updated scores.
pub fn fit(pipeline: &Pipeline, params: &FitParams<'_>) -> Result<(Arc<FittedPipeline>, Scores)> {
    let preprocessed = fit_preprocessors_only(pipeline, params)?;

    let (population_schema, peripheral_schema) =
        extract_schemata(params.population_df, params.peripheral_dfs, false);

    let (modified_population_schema, modified_peripheral_schema) =
        extract_schemata(&preprocessed.population_df, &preprocessed.peripheral_dfs, true);

    let (placeholder, _) = pipeline.make_placeholder()?;

    let feature_learner_params = FeatureLearnerParams {
        dependencies: preprocessed.preprocessor_fingerprints.clone(),
        peripheral: preprocessed
            .peripheral_dfs
            .iter()
            .map(|df| df.name().to_string())
            .collect(),
        peripheral_schema: modified_peripheral_schema.clone(),
        placeholder,
        population_schema: modified_population_schema.clone(),
        target_num: USE_ALL_TARGETS,
    };

    let num_targets = params.population_df.num_targets();

    let feature_learners =
        init_feature_learners(pipeline, &feature_learner_params, num_targets)?;

    let (feature_learners, fl_fingerprints) = fit_feature_learners(
        params,
        feature_learners,
        &preprocessed.preprocessor_fingerprints,
        &preprocessed.population_df,
        &preprocessed.peripheral_dfs,
    )?;

    let feature_selector_impl =
        make_feature_selector_impl(pipeline, &feature_learners, &preprocessed.population_df)?;

    let (feature_selectors, fs_fingerprints) = fit_predictors(FitPredictorsParams {
        fit_params: params,
        pipeline,
        purpose: Purpose::FeatureSelectors,
        dependencies: &fl_fingerprints,
        feature_learners: &feature_learners,
        predictor_impl: feature_selector_impl,
        population_df: &preprocessed.population_df,
        peripheral_dfs: &preprocessed.peripheral_dfs,
        preprocessors: &preprocessed.preprocessors,
    })?;

    let predictor_impl =
        make_predictor_impl(pipeline, &feature_selectors, &preprocessed.population_df)?;

    let mut predictor_dependencies = fs_fingerprints.clone();
    if let Some(validation_df) = params.validation_df {
        predictor_dependencies.push(validation_df.fingerprint());
    }

    let (fitted_predictors, _) = fit_predictors(FitPredictorsParams {
        fit_params: params,
        pipeline,
        purpose: Purpose::Predictors,
        dependencies: &predictor_dependencies,
        feature_learners: &feature_learners,
        predictor_impl,
        population_df: &preprocessed.population_df,
        peripheral_dfs: &preprocessed.peripheral_dfs,
        preprocessors: &preprocessed.preprocessors,
    })?;

    let fingerprints = Fingerprints {
        df_fingerprints: preprocessed.df_fingerprints.clone(),
        preprocessor_fingerprints: preprocessed.preprocessor_fingerprints.clone(),
        fl_fingerprints,
        fs_fingerprints,
    };

    let fitted = Arc::new(FittedPipeline {
        feature_learners,
        feature_selectors,
        fingerprints,
        modified_peripheral_schema,
        modified_population_schema,
        peripheral_schema,
        population_schema,
        predictors: fitted_predictors,
        preprocessors: preprocessed.preprocessors.clone(),
        creation_time: pipeline.creation_time().to_string(),
    });

    let scores = make_scores(pipeline, params, &preprocessed, &fitted)?;

    Ok((fitted, scores))
}

/// Assembles the scores: column importances, feature importances and the
/// in-sample metrics when at least one predictor was fitted.
fn make_scores(
    pipeline: &Pipeline,
    params: &FitParams<'_>,
    preprocessed: &Preprocessed,
    fitted: &FittedPipeline,
) -> Result<Scores> {
    let mut scores = pipeline.scores().clone();

    let (column_descriptions, column_importances) =
        score::column_importances(pipeline, fitted)?;
    scores.set_column_importances(column_descriptions, transpose(&column_importances));

    let feature_importances = score::feature_importances(&fitted.predictors);
    let (auto_names, numerical_names, categorical_names) = fitted.predictors.feature_names();
    let mut feature_names = auto_names;
    feature_names.extend(numerical_names);
    feature_names.extend(categorical_names);
    scores.set_feature_importances(feature_names, transpose(&feature_importances));

    if fitted.num_predictors_per_set() == 0 {
        return Ok(scores);
    }

    // In-sample scoring on the training set.
    let make_features_params = MakeFeaturesParams {
        trackers: params.trackers,
        categories: params.categories,
        logger: params.logger.clone(),
        dependencies: &fitted.fingerprints.fs_fingerprints,
        original_population_df: params.population_df,
        original_peripheral_dfs: params.peripheral_dfs,
        population_df: &preprocessed.population_df,
        peripheral_dfs: &preprocessed.peripheral_dfs,
    };

    let (numerical_features, categorical_features, _) = transform::make_features(
        &make_features_params,
        pipeline,
        &fitted.feature_learners,
        &fitted.predictors.predictor_impl,
    )?;

    let categorical_features = fitted
        .predictors
        .predictor_impl
        .transform_encodings(&categorical_features)?;

    let predictions =
        transform::generate_predictions(fitted, &categorical_features, &numerical_features)?;

    let targets: Vec<Feature<Float>> = preprocessed
        .population_df
        .targets()
        .iter()
        .map(Feature::from_column)
        .collect();

    let metrics = metrics::score(
        fitted.is_classification()?,
        &predictions,
        &targets,
        params.population_df.name(),
    )?;

    scores.to_history(metrics);

    Ok(scores)
}
