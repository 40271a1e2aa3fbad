//! Feature-importance aggregation and the column-importance
//! back-propagation from the predictors to the raw columns.

use crate::helpers::importance_maker::{fill_zeros, ImportanceMaker};
use crate::helpers::column_description::{ColumnDescription, Marker};
use crate::pipelines::fitted_pipeline::{FittedPipeline, Predictors};
use crate::pipelines::Pipeline;
use crate::{Float, Result, RfeError};

/// Per-target feature importances: the unweighted mean over all
/// predictors fitted for the target. Targets without predictors
/// contribute zeros.
pub fn feature_importances(predictors: &Predictors) -> Vec<Vec<Float>> {
    let n_features = predictors.num_features();

    predictors
        .predictors
        .iter()
        .map(|row| {
            let mut summed = vec![0.0; n_features];

            if row.is_empty() {
                return summed;
            }

            for predictor in row {
                let importances = predictor.feature_importances(n_features);
                for (sum, value) in summed.iter_mut().zip(&importances) {
                    *sum += value;
                }
            }

            let divisor = row.len() as Float;
            for value in &mut summed {
                *value /= divisor;
            }

            summed
        })
        .collect()
}

/// Scatters the importances of a learner's selected features back onto
/// its full feature bank.
fn make_importance_factors(
    num_features: usize,
    autofeatures: &[usize],
    importances: &[Float],
) -> Result<Vec<Float>> {
    if autofeatures.len() != importances.len() {
        return Err(RfeError::Data(format!(
            "Expected {} importances for {} selected features.",
            autofeatures.len(),
            importances.len()
        )));
    }

    let mut factors = vec![0.0; num_features];
    for (&ix, &importance) in autofeatures.iter().zip(importances) {
        if ix >= factors.len() {
            return Err(RfeError::Data(format!(
                "Auto-feature index {} out of range for {} features.",
                ix, num_features
            )));
        }
        factors[ix] = importance;
    }

    Ok(factors)
}

/// Back-propagates the predictor importances to the raw columns.
///
/// Returns the shared, lexicographically ordered column descriptions and
/// one importance row per target. After `fill_zeros` every target has the
/// same key set; staging aliases are rewritten to their human-readable
/// form before emitting.
pub fn column_importances(
    pipeline: &Pipeline,
    fitted: &FittedPipeline,
) -> Result<(Vec<ColumnDescription>, Vec<Vec<Float>>)> {
    if fitted.predictors.predictors.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let f_importances = feature_importances(&fitted.predictors);

    let mut makers: Vec<ImportanceMaker> =
        vec![ImportanceMaker::new(); f_importances.len()];

    let autofeatures = fitted.predictors.predictor_impl.autofeatures();

    // Auto-features: hand each learner its slice of the importances and
    // merge what it attributes to the raw columns.
    for (target, f_imp) in f_importances.iter().enumerate() {
        let mut ix_begin = 0;

        for (l, learner) in fitted.feature_learners.iter().enumerate() {
            let ix_end = ix_begin + autofeatures[l].len();

            let factors = make_importance_factors(
                learner.num_features(),
                &autofeatures[l],
                &f_imp[ix_begin..ix_end],
            )?;

            makers[target].merge(learner.column_importances(&factors));

            ix_begin = ix_end;
        }

        // Manual columns: numerical then categorical, directly assigned.
        let population_name = pipeline.parse_population();
        let mut position = fitted.predictors.predictor_impl.num_autofeatures();

        for colname in fitted.predictors.predictor_impl.numerical_colnames() {
            makers[target].add_to_importances(
                ColumnDescription::new(Marker::Population, population_name, colname.clone()),
                f_imp[position],
            );
            position += 1;
        }

        for colname in fitted.predictors.predictor_impl.categorical_colnames() {
            makers[target].add_to_importances(
                ColumnDescription::new(Marker::Population, population_name, colname.clone()),
                f_imp[position],
            );
            position += 1;
        }
    }

    let mut makers: Vec<ImportanceMaker> =
        makers.into_iter().map(ImportanceMaker::humanize).collect();

    fill_zeros(&mut makers);

    let descriptions: Vec<ColumnDescription> = makers
        .first()
        .map(|maker| maker.importances().keys().cloned().collect())
        .unwrap_or_default();

    let importances: Vec<Vec<Float>> = makers
        .iter()
        .map(|maker| maker.importances().values().copied().collect())
        .collect();

    Ok((descriptions, importances))
}

/// Correlation of each feature with each target, stored with the feature
/// stats of a scoring run.
pub fn calculate_feature_correlations(
    features: &[crate::containers::Feature<Float>],
    targets: &[crate::containers::Feature<Float>],
) -> Vec<Vec<Float>> {
    fn correlation(x: &[Float], y: &[Float]) -> Float {
        let n = x.len() as Float;
        if n == 0.0 {
            return 0.0;
        }
        let mean_x = x.iter().sum::<Float>() / n;
        let mean_y = y.iter().sum::<Float>() / n;
        let mut cov = 0.0;
        let mut var_x = 0.0;
        let mut var_y = 0.0;
        for (&a, &b) in x.iter().zip(y) {
            cov += (a - mean_x) * (b - mean_y);
            var_x += (a - mean_x) * (a - mean_x);
            var_y += (b - mean_y) * (b - mean_y);
        }
        if var_x == 0.0 || var_y == 0.0 {
            return 0.0;
        }
        cov / (var_x.sqrt() * var_y.sqrt())
    }

    features
        .iter()
        .map(|feature| {
            targets
                .iter()
                .map(|target| correlation(feature.data(), target.data()))
                .collect()
        })
        .collect()
}
