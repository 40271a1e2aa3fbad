//! Plausibility checks on the data model, cached in the warning tracker.

use std::collections::HashSet;
use std::sync::Arc;

use crate::commands::{Fingerprint, FingerprintValue};
use crate::dependency::Fingerprinted;
use crate::featurelearners::USE_ALL_TARGETS;
use crate::featurelearners::FeatureLearnerParams;
use crate::pipelines::fit::{self, FitParams};
use crate::pipelines::Pipeline;
use crate::{Int, Result};

/// The cached result of a data-model check.
pub struct Warnings {
    fingerprint: Fingerprint,
    warnings: Vec<String>,
}

impl Warnings {
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl Fingerprinted for Warnings {
    fn fingerprint(&self) -> Fingerprint {
        self.fingerprint.clone()
    }
}

/// Checks the data model for inconsistencies that would not fail the fit
/// outright but usually mean a misconfiguration.
///
/// The check runs the staging and preprocessor path (cached like any fit)
/// and initializes, without fitting, the feature learners; the warning is
/// cached under a fingerprint covering their configuration, so repeating
/// the check for an unchanged setup is free.
pub fn check(pipeline: &Pipeline, params: &FitParams<'_>) -> Result<Arc<Warnings>> {
    let preprocessed = fit::fit_preprocessors_only(pipeline, params)?;

    let (modified_population_schema, modified_peripheral_schema) = fit::extract_schemata(
        &preprocessed.population_df,
        &preprocessed.peripheral_dfs,
        true,
    );

    let (placeholder, _) = pipeline.make_placeholder()?;

    let feature_learner_params = FeatureLearnerParams {
        dependencies: preprocessed.preprocessor_fingerprints.clone(),
        peripheral: preprocessed
            .peripheral_dfs
            .iter()
            .map(|df| df.name().to_string())
            .collect(),
        peripheral_schema: modified_peripheral_schema,
        placeholder: placeholder.clone(),
        population_schema: modified_population_schema,
        target_num: USE_ALL_TARGETS,
    };

    let num_targets = params.population_df.num_targets().max(1);

    let feature_learners =
        fit::init_feature_learners(pipeline, &feature_learner_params, num_targets)?;

    let fl_fingerprints: Vec<Fingerprint> =
        feature_learners.iter().map(|fl| fl.fingerprint()).collect();

    let warning_fingerprint = Fingerprint::new(FingerprintValue::PipelineBuildHistory {
        dependencies: fl_fingerprints,
        df_fingerprints: preprocessed.df_fingerprints.clone(),
    });

    if let Some(cached) = params.trackers.warning_tracker.retrieve(&warning_fingerprint) {
        return Ok(cached);
    }

    let mut warnings = Vec::new();

    if preprocessed.population_df.nrows() == 0 {
        warnings.push("The population table is empty.".to_string());
    }

    for (i, child) in placeholder.joined_tables.iter().enumerate() {
        let Some(peripheral) = preprocessed
            .peripheral_dfs
            .iter()
            .find(|df| df.name() == child.name)
        else {
            continue;
        };

        if peripheral.nrows() == 0 {
            warnings.push(format!("Table '{}' is empty.", child.name));
            continue;
        }

        let jk_name = &placeholder.join_keys_used[i];
        let other_jk_name = &placeholder.other_join_keys_used[i];
        if jk_name.is_empty() {
            continue;
        }

        let (Ok(population_key), Ok(peripheral_key)) = (
            preprocessed.population_df.join_key(jk_name),
            peripheral.join_key(other_jk_name),
        ) else {
            continue;
        };

        let keys: HashSet<Int> = peripheral_key.iter().copied().filter(|&k| k >= 0).collect();

        let matched = population_key
            .iter()
            .filter(|&&key| key >= 0 && keys.contains(&key))
            .count();

        let share = matched as f64 / population_key.len().max(1) as f64;

        if share < 0.05 {
            warnings.push(format!(
                "Only {:.1}% of the rows in the population table have a match in \
                 '{}'. Did you choose the right join keys?",
                share * 100.0,
                child.name
            ));
        }
    }

    let result = Arc::new(Warnings {
        fingerprint: warning_fingerprint,
        warnings,
    });

    params.trackers.warning_tracker.add(result.clone());

    Ok(result)
}
