//! The transform path: staging, preprocessor application, auto-feature
//! generation and feature assembly, with the data-frame cache
//! short-circuiting everything when an identical configuration has
//! already produced the features.

use std::sync::Arc;

use crate::commands::Fingerprint;
use crate::containers::{
    CategoricalFeatures, Column, DataFrame, Encoding, Feature, NumericalFeatures, Role,
};
use crate::dependency::PipelineTrackers;
use crate::featurelearners::{self, FeatureLearner};
use crate::helpers::subrole::{self, Subrole};
use crate::logging::ProgressLogger;
use crate::metrics::{self, Metrics};
use crate::pipelines::modify_data_frames;
use crate::pipelines::staging;
use crate::pipelines::{FittedPipeline, Pipeline};
use crate::predictors::PredictorImpl;
use crate::preprocessors::{Preprocessor, PreprocessorParams};
use crate::{Float, Result, RfeError};

/// Parameters of a transform call.
pub struct TransformParams<'a> {
    pub trackers: &'a PipelineTrackers,
    pub categories: &'a Encoding,
    pub logger: ProgressLogger,
    pub population_df: &'a DataFrame,
    pub peripheral_dfs: &'a [DataFrame],
    pub predict: bool,
    pub score: bool,
    /// When set, the generated features are stored in the data-frame
    /// tracker under this name, keyed by the pipeline's fs fingerprints.
    pub table_name: Option<String>,
}

/// The result of a transform call.
pub struct TransformOutput {
    pub numerical_features: NumericalFeatures,
    pub categorical_features: CategoricalFeatures,
    pub predictions: Option<NumericalFeatures>,
    pub metrics: Option<Metrics>,
}

/// Rewrites the raw tables into their canonical staged form.
pub fn stage_data_frames(
    pipeline: &Pipeline,
    population_df: &DataFrame,
    peripheral_dfs: &[DataFrame],
    logger: &ProgressLogger,
) -> Result<(DataFrame, Vec<DataFrame>)> {
    logger.log("Staging...");

    let peripheral_names = pipeline.parse_peripheral();

    if peripheral_names.len() != peripheral_dfs.len() {
        return Err(RfeError::Configuration(format!(
            "There must be one peripheral table for every peripheral placeholder \
             ({} vs. {}).",
            peripheral_dfs.len(),
            peripheral_names.len()
        )));
    }

    let data_model = &pipeline.command().data_model;

    let mut population = population_df.clone();
    let mut peripherals = peripheral_dfs.to_vec();

    // The composite join keys of one staging pass share one encoding.
    let staging_encoding = Encoding::new();

    modify_data_frames::add_time_stamps(
        data_model,
        peripheral_names,
        &mut population,
        &mut peripherals,
    )?;

    modify_data_frames::add_join_keys(
        data_model,
        peripheral_names,
        &mut population,
        &mut peripherals,
        &staging_encoding,
    )?;

    let (placeholder, joined_names) = pipeline.make_placeholder()?;

    let staged = staging::join_tables(
        peripheral_names,
        &placeholder.name,
        &joined_names,
        &population,
        &peripherals,
    )?;

    logger.progress(100);

    Ok(staged)
}

/// Applies the fitted preprocessors in order, without fitting.
pub fn apply_preprocessors(
    pipeline: &Pipeline,
    preprocessors: &[Arc<dyn Preprocessor>],
    categories: &Encoding,
    logger: &ProgressLogger,
    population_df: DataFrame,
    peripheral_dfs: Vec<DataFrame>,
) -> Result<(DataFrame, Vec<DataFrame>)> {
    let (placeholder, peripheral_names) = pipeline.make_placeholder()?;

    let mut population = population_df;
    let mut peripherals = peripheral_dfs;

    if !preprocessors.is_empty() {
        logger.log("Preprocessing...");
    }

    for (i, preprocessor) in preprocessors.iter().enumerate() {
        logger.progress(i * 100 / preprocessors.len());

        let params = PreprocessorParams {
            categories,
            logger: logger.clone(),
            logging_begin: i * 100 / preprocessors.len(),
            logging_end: (i + 1) * 100 / preprocessors.len(),
            peripheral_dfs: &peripherals,
            peripheral_names: &peripheral_names,
            placeholder: &placeholder,
            population_df: &population,
        };

        let (new_population, new_peripherals) = preprocessor.transform(&params)?;
        population = new_population;
        peripherals = new_peripherals;
    }

    if !preprocessors.is_empty() {
        logger.progress(100);
    }

    Ok((population, peripherals))
}

/// The categorical input columns selected by the impl, in layout order.
pub fn get_categorical_features(
    pipeline: &Pipeline,
    population_df: &DataFrame,
    predictor_impl: &PredictorImpl,
) -> Result<CategoricalFeatures> {
    if !pipeline.include_categorical() {
        return Ok(Vec::new());
    }

    predictor_impl
        .categorical_colnames()
        .iter()
        .map(|name| Ok(Feature::from_column(population_df.categorical(name)?)))
        .collect()
}

/// The auto-features followed by the manual numerical columns. A selected
/// numerical column containing NaN or infinity is a data error.
pub fn get_numerical_features(
    autofeatures: &NumericalFeatures,
    population_df: &DataFrame,
    predictor_impl: &PredictorImpl,
) -> Result<NumericalFeatures> {
    let mut numerical_features = autofeatures.clone();

    for name in predictor_impl.numerical_colnames() {
        let column = population_df.numerical(name)?;
        if column.iter().any(|v| !v.is_finite()) {
            return Err(RfeError::Data(format!(
                "Column '{}' contains values that are nan or infinite!",
                name
            )));
        }
        numerical_features.push(Feature::from_column(column));
    }

    Ok(numerical_features)
}

/// Generates the selected auto-features of every learner.
pub fn generate_autofeatures(
    feature_learners: &[Arc<dyn FeatureLearner>],
    predictor_impl: &PredictorImpl,
    logger: &ProgressLogger,
    population_df: &DataFrame,
    peripheral_dfs: &[DataFrame],
) -> Result<NumericalFeatures> {
    let mut autofeatures = Vec::new();

    for (i, learner) in feature_learners.iter().enumerate() {
        let index = &predictor_impl.autofeatures()[i];

        let params = featurelearners::TransformParams {
            index,
            logger: ProgressLogger::new(None, learner.silent()),
            peripheral_dfs,
            population_df,
            prefix: format!("{}_", i + 1),
        };

        autofeatures.extend(learner.transform(&params)?);
    }

    logger.progress(100);

    Ok(autofeatures)
}

/// Unpacks a cached feature frame: numericals prefixed `feature_` are
/// auto-features, the rest are manual inputs.
fn retrieve_features_from_cache(
    df: &DataFrame,
) -> (NumericalFeatures, CategoricalFeatures, NumericalFeatures) {
    let mut autofeatures = Vec::new();
    let mut numerical_features = Vec::new();

    for column in df.numericals() {
        let feature = Feature::from_column(column);
        if column.name().starts_with("feature_") {
            autofeatures.push(feature.clone());
        }
        numerical_features.push(feature);
    }

    let categorical_features = df
        .categoricals()
        .iter()
        .map(Feature::from_column)
        .collect();

    (numerical_features, categorical_features, autofeatures)
}

/// Parameters of the feature-assembly step shared by fit and transform.
pub struct MakeFeaturesParams<'a> {
    pub trackers: &'a PipelineTrackers,
    pub categories: &'a Encoding,
    pub logger: ProgressLogger,
    /// The cache key: fingerprints of the configuration producing the
    /// features.
    pub dependencies: &'a [Fingerprint],
    pub original_population_df: &'a DataFrame,
    pub original_peripheral_dfs: &'a [DataFrame],
    pub population_df: &'a DataFrame,
    pub peripheral_dfs: &'a [DataFrame],
}

/// Makes or retrieves the feature matrix.
///
/// Returns (numerical features, categorical features, auto-features); the
/// categorical features are raw codes, not yet passed through the impl's
/// encodings.
pub fn make_features(
    params: &MakeFeaturesParams<'_>,
    pipeline: &Pipeline,
    feature_learners: &[Arc<dyn FeatureLearner>],
    predictor_impl: &PredictorImpl,
) -> Result<(NumericalFeatures, CategoricalFeatures, NumericalFeatures)> {
    if let Some(cached) = params.trackers.data_frame_tracker.retrieve(
        params.dependencies,
        params.original_population_df,
        params.original_peripheral_dfs,
    ) {
        params
            .logger
            .log("Retrieving features from cached data frame...");
        return Ok(retrieve_features_from_cache(&cached));
    }

    let autofeatures = generate_autofeatures(
        feature_learners,
        predictor_impl,
        &params.logger,
        params.population_df,
        params.peripheral_dfs,
    )?;

    let numerical_features =
        get_numerical_features(&autofeatures, params.population_df, predictor_impl)?;

    let categorical_features =
        get_categorical_features(pipeline, params.population_df, predictor_impl)?;

    Ok((numerical_features, categorical_features, autofeatures))
}

/// Builds a data frame holding the generated features and registers it
/// with the data-frame tracker.
pub fn store_features(
    name: &str,
    numerical_features: &NumericalFeatures,
    categorical_features: &CategoricalFeatures,
    trackers: &PipelineTrackers,
    dependencies: &[Fingerprint],
    original_population_df: &DataFrame,
    original_peripheral_dfs: &[DataFrame],
) -> Result<DataFrame> {
    let mut df = DataFrame::new(name);

    for feature in numerical_features {
        df.add_float_column(
            Column::new(feature.name(), feature.data().to_vec()),
            Role::Numerical,
        )?;
    }

    for feature in categorical_features {
        df.add_int_column(
            Column::new(feature.name(), feature.data().to_vec()),
            Role::Categorical,
        )?;
    }

    trackers.data_frame_tracker.add(
        df.clone(),
        dependencies,
        original_population_df,
        original_peripheral_dfs,
    );

    Ok(df)
}

/// Stages, preprocesses and assembles the features, without touching the
/// predictors. Returns the features and the preprocessed population.
pub fn transform_features_only(
    pipeline: &Pipeline,
    fitted: &FittedPipeline,
    trackers: &PipelineTrackers,
    categories: &Encoding,
    logger: &ProgressLogger,
    population_df: &DataFrame,
    peripheral_dfs: &[DataFrame],
) -> Result<(NumericalFeatures, CategoricalFeatures, DataFrame)> {
    let dependencies = &fitted.fingerprints.fs_fingerprints;

    // The cache is consulted before any staging work happens.
    if let Some(cached) =
        trackers
            .data_frame_tracker
            .retrieve(dependencies, population_df, peripheral_dfs)
    {
        logger.log("Retrieving features from cached data frame...");
        let (numerical_features, categorical_features, _) =
            retrieve_features_from_cache(&cached);
        return Ok((numerical_features, categorical_features, population_df.clone()));
    }

    let (staged_population, staged_peripherals) =
        stage_data_frames(pipeline, population_df, peripheral_dfs, logger)?;

    let (population, peripherals) = apply_preprocessors(
        pipeline,
        &fitted.preprocessors,
        categories,
        logger,
        staged_population,
        staged_peripherals,
    )?;

    let make_features_params = MakeFeaturesParams {
        trackers,
        categories,
        logger: logger.clone(),
        dependencies,
        original_population_df: population_df,
        original_peripheral_dfs: peripheral_dfs,
        population_df: &population,
        peripheral_dfs: &peripherals,
    };

    let (numerical_features, categorical_features, _) = make_features(
        &make_features_params,
        pipeline,
        &fitted.feature_learners,
        &fitted.predictors.predictor_impl,
    )?;

    Ok((numerical_features, categorical_features, population))
}

/// Mean-ensembled predictions, one feature per target.
pub fn generate_predictions(
    fitted: &FittedPipeline,
    categorical_features: &CategoricalFeatures,
    numerical_features: &NumericalFeatures,
) -> Result<NumericalFeatures> {
    let nrows = numerical_features
        .first()
        .map(Feature::len)
        .or_else(|| categorical_features.first().map(Feature::len))
        .ok_or_else(|| RfeError::Data("No features to predict from.".to_string()))?;

    let mut predictions = Vec::with_capacity(fitted.predictors.size());

    for (t, predictors_for_target) in fitted.predictors.predictors.iter().enumerate() {
        let divisor = predictors_for_target.len() as Float;

        let mut mean = vec![0.0; nrows];

        for predictor in predictors_for_target {
            let prediction = predictor.predict(categorical_features, numerical_features)?;

            if prediction.len() != mean.len() {
                return Err(RfeError::Data(
                    "Prediction length does not match the number of rows.".to_string(),
                ));
            }

            for (accumulated, value) in mean.iter_mut().zip(&prediction) {
                *accumulated += value;
            }
        }

        for value in &mut mean {
            *value /= divisor;
        }

        predictions.push(Feature::new(format!("prediction_{}", t + 1), mean));
    }

    Ok(predictions)
}

/// The full transform path of the orchestrator.
pub fn transform(
    pipeline: &Pipeline,
    fitted: &FittedPipeline,
    params: &TransformParams<'_>,
) -> Result<TransformOutput> {
    if (params.score || params.predict) && fitted.num_predictors_per_set() == 0 {
        return Err(RfeError::Configuration(
            "You cannot call .predict(...) or .score(...) on a pipeline that doesn't \
             have any predictors."
                .to_string(),
        ));
    }

    let (numerical_features, categorical_features, population) = transform_features_only(
        pipeline,
        fitted,
        params.trackers,
        params.categories,
        &params.logger,
        params.population_df,
        params.peripheral_dfs,
    )?;

    if let Some(table_name) = &params.table_name {
        store_features(
            table_name,
            &numerical_features,
            &categorical_features,
            params.trackers,
            &fitted.fingerprints.fs_fingerprints,
            params.population_df,
            params.peripheral_dfs,
        )?;
    }

    if !params.score && !params.predict {
        return Ok(TransformOutput {
            numerical_features,
            categorical_features,
            predictions: None,
            metrics: None,
        });
    }

    let encoded = fitted
        .predictors
        .predictor_impl
        .transform_encodings(&categorical_features)?;

    let predictions = generate_predictions(fitted, &encoded, &numerical_features)?;

    let metrics = if params.score {
        let targets: Vec<Feature<Float>> =
            population.targets().iter().map(Feature::from_column).collect();
        Some(metrics::score(
            fitted.is_classification()?,
            &predictions,
            &targets,
            params.population_df.name(),
        )?)
    } else {
        None
    };

    Ok(TransformOutput {
        numerical_features,
        categorical_features,
        predictions: Some(predictions),
        metrics,
    })
}

/// Columns that never enter the predictors.
pub fn predictor_blacklist() -> [Subrole; 3] {
    [
        Subrole::ExcludePredictors,
        Subrole::EmailOnly,
        Subrole::SubstringOnly,
    ]
}

/// Whether a column is eligible as a manual predictor input.
pub fn is_predictor_input(unit: &str, subroles: &[Subrole]) -> bool {
    !unit.contains("comparison only") && !subrole::contains_any(subroles, &predictor_blacklist())
}
