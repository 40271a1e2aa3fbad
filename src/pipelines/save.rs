//! Persists a fitted pipeline to disk.
//!
//! Everything is written into a temporary directory that is renamed into
//! place at the end, so a failure at any point leaves the previous state
//! intact.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::containers::Encoding;
use crate::helpers::{saver, Format, Schema};
use crate::pipelines::to_sql::{self, ToSqlParams};
use crate::pipelines::{Fingerprints, FittedPipeline, Pipeline};
use crate::transpilation::HumanReadableSqlGenerator;
use crate::{Result, RfeError};

/// The pipeline file: everything needed to rebuild the fitted pipeline in
/// topological order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineJson {
    pub fingerprints: Fingerprints,
    pub allow_http: bool,
    pub creation_time: String,
    pub modified_peripheral_schema: Vec<Schema>,
    pub modified_population_schema: Schema,
    pub peripheral_schema: Vec<Schema>,
    pub population_schema: Schema,
    pub targets: Vec<String>,
}

pub struct SaveParams<'a> {
    /// Parent directory the pipeline directory is created in.
    pub path: &'a Path,
    /// Name of the pipeline directory.
    pub name: &'a str,
    pub format: Format,
    pub categories: &'a Encoding,
}

pub fn save(pipeline: &Pipeline, fitted: &FittedPipeline, params: &SaveParams<'_>) -> Result<()> {
    let temp_dir = params
        .path
        .join(format!(".tmp-{}", Uuid::new_v4().simple()));

    fs::create_dir_all(&temp_dir)?;

    let result = save_into(pipeline, fitted, params, &temp_dir);

    if result.is_err() {
        let _ = fs::remove_dir_all(&temp_dir);
        return result;
    }

    let destination = params.path.join(params.name);
    if destination.exists() {
        fs::remove_dir_all(&destination)?;
    }
    fs::rename(&temp_dir, &destination)
        .map_err(|e| RfeError::Io(format!("Could not move the pipeline into place: {}", e)))?;

    Ok(())
}

fn save_into(
    pipeline: &Pipeline,
    fitted: &FittedPipeline,
    params: &SaveParams<'_>,
    dir: &Path,
) -> Result<()> {
    let format = params.format;

    for (i, preprocessor) in fitted.preprocessors.iter().enumerate() {
        preprocessor.save(&dir.join(format!("preprocessor-{}", i)), format)?;
    }

    for (i, learner) in fitted.feature_learners.iter().enumerate() {
        learner.save(&dir.join(format!("feature-learner-{}", i)), format)?;
    }

    let pipeline_json = PipelineJson {
        fingerprints: fitted.fingerprints.clone(),
        allow_http: pipeline.allow_http(),
        creation_time: fitted.creation_time.clone(),
        modified_peripheral_schema: fitted.modified_peripheral_schema.clone(),
        modified_population_schema: fitted.modified_population_schema.clone(),
        peripheral_schema: fitted.peripheral_schema.clone(),
        population_schema: fitted.population_schema.clone(),
        targets: fitted.targets().to_vec(),
    };
    saver::save(&dir.join("pipeline"), &pipeline_json, format)?;

    saver::save(&dir.join("obj"), pipeline.command(), format)?;
    saver::save(&dir.join("scores"), pipeline.scores(), format)?;

    saver::save(
        &dir.join("feature-selector-impl"),
        &*fitted.feature_selectors.predictor_impl,
        format,
    )?;
    saver::save(
        &dir.join("predictor-impl"),
        &*fitted.predictors.predictor_impl,
        format,
    )?;

    for (i, row) in fitted.feature_selectors.predictors.iter().enumerate() {
        for (j, predictor) in row.iter().enumerate() {
            predictor.save(&dir.join(format!("feature-selector-{}-{}", i, j)), format)?;
        }
    }

    for (i, row) in fitted.predictors.predictors.iter().enumerate() {
        for (j, predictor) in row.iter().enumerate() {
            predictor.save(&dir.join(format!("predictor-{}-{}", i, j)), format)?;
        }
    }

    let sql_dir = dir.join("SQL");
    fs::create_dir_all(&sql_dir)?;

    let dialect = HumanReadableSqlGenerator::new();
    let sql = to_sql::to_sql(
        pipeline,
        fitted,
        &ToSqlParams {
            categories: params.categories,
            targets: true,
            full_pipeline: true,
            dialect: &dialect,
            size_threshold: None,
        },
    )?;
    fs::write(sql_dir.join("pipeline.sql"), sql)?;

    Ok(())
}
