//! Transpiles a fitted pipeline into SQL: staging statements, preprocessor
//! statements, one CREATE TABLE per selected feature and a final SELECT
//! joining everything.

use std::collections::HashMap;

use crate::containers::Encoding;
use crate::helpers::marker;
use crate::pipelines::{FittedPipeline, Pipeline};
use crate::transpilation::SqlDialectGenerator;
use crate::Result;

pub struct ToSqlParams<'a> {
    pub categories: &'a Encoding,
    /// Whether the targets appear in the final SELECT.
    pub targets: bool,
    /// Whether the staging and preprocessing statements are included.
    pub full_pipeline: bool,
    pub dialect: &'a dyn SqlDialectGenerator,
    /// Statements longer than this are replaced by a stub.
    pub size_threshold: Option<usize>,
}

fn staging_to_sql(
    pipeline: &Pipeline,
    fitted: &FittedPipeline,
    params: &ToSqlParams<'_>,
) -> Result<Vec<String>> {
    // Text-field tables are created by the splitter statements, not by
    // staging.
    let peripheral_schemata: Vec<_> = fitted
        .modified_peripheral_schema
        .iter()
        .filter(|schema| !schema.name.contains(marker::TEXT_FIELD))
        .cloned()
        .collect();

    // A peripheral needs its targets staged when some edge allows lagged
    // targets on it.
    let (placeholder, _) = pipeline.make_placeholder()?;
    let mut allow_lagged: HashMap<&str, bool> = HashMap::new();
    for (i, child) in placeholder.joined_tables.iter().enumerate() {
        let entry = allow_lagged.entry(child.name.as_str()).or_insert(false);
        *entry = *entry || placeholder.allow_lagged_targets[i];
    }

    let peripheral_needs_targets: Vec<bool> = peripheral_schemata
        .iter()
        .map(|schema| {
            allow_lagged
                .get(schema.name.as_str())
                .copied()
                .unwrap_or(false)
        })
        .collect();

    Ok(params.dialect.make_staging_tables(
        params.targets,
        &peripheral_needs_targets,
        &fitted.modified_population_schema,
        &peripheral_schemata,
    ))
}

fn preprocessors_to_sql(fitted: &FittedPipeline, params: &ToSqlParams<'_>) -> Vec<String> {
    fitted
        .preprocessors
        .iter()
        .flat_map(|preprocessor| preprocessor.to_sql(params.categories, params.dialect))
        .collect()
}

fn overwrite_oversized(statement: String, size_threshold: Option<usize>) -> String {
    match size_threshold {
        Some(threshold) if statement.len() > threshold => {
            "-- Feature omitted: the generated SQL exceeds the size threshold.".to_string()
        }
        _ => statement,
    }
}

fn feature_learners_to_sql(
    fitted: &FittedPipeline,
    params: &ToSqlParams<'_>,
) -> Vec<String> {
    let autofeatures = fitted.predictors.predictor_impl.autofeatures();

    fitted
        .feature_learners
        .iter()
        .enumerate()
        .flat_map(|(i, learner)| {
            let prefix = format!("{}_", i + 1);

            let all = learner.to_sql(
                params.categories,
                params.targets,
                params.full_pipeline,
                params.dialect,
                &prefix,
            );

            // Statements beyond the learner's feature count are
            // subfeatures and always included; the features themselves are
            // filtered down to the selected subset.
            let num_subfeatures = all.len().saturating_sub(learner.num_features());

            let mut selected: Vec<String> = all[..num_subfeatures].to_vec();
            selected.extend(
                autofeatures[i]
                    .iter()
                    .filter_map(|&ix| all.get(num_subfeatures + ix).cloned()),
            );

            selected
                .into_iter()
                .map(|statement| overwrite_oversized(statement, params.size_threshold))
                .collect::<Vec<String>>()
        })
        .collect()
}

/// The full transpilation of a fitted pipeline.
pub fn to_sql(
    pipeline: &Pipeline,
    fitted: &FittedPipeline,
    params: &ToSqlParams<'_>,
) -> Result<String> {
    let mut components = Vec::new();

    if params.full_pipeline {
        components.extend(staging_to_sql(pipeline, fitted, params)?);
        components.extend(preprocessors_to_sql(fitted, params));
    }

    components.extend(feature_learners_to_sql(fitted, params));

    let targets: Vec<String> = if params.targets {
        fitted.targets().to_vec()
    } else {
        Vec::new()
    };

    Ok(params.dialect.make_sql(
        &fitted.modified_population_schema.name,
        &fitted.predictors.autofeature_names(),
        &components,
        &targets,
        fitted.predictors.predictor_impl.categorical_colnames(),
        fitted.predictors.predictor_impl.numerical_colnames(),
    ))
}
