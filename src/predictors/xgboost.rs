use std::path::Path;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::commands::{Fingerprint, FingerprintValue, XGBoostHyperparams, XGBoostObjective};
use crate::containers::{CategoricalFeatures, Feature, NumericalFeatures};
use crate::dependency::Fingerprinted;
use crate::helpers::{saver, Format};
use crate::logging::ProgressLogger;
use crate::predictors::glm::sigmoid;
use crate::predictors::predictor::Predictor;
use crate::predictors::PredictorImpl;
use crate::{Float, Result, RfeError};

const MIN_GAIN: Float = 1.0e-12;
const MAX_CANDIDATES: usize = 32;

/// Gradient-boosted trees over the expanded design matrix.
///
/// Depth-wise greedy splits on first-order gradients, with the gain
/// formulation and leaf shrinkage of the XGBoost objective restricted to
/// unit hessians. Row subsampling is driven by a seeded generator so
/// identical hyperparameters produce identical models.
#[derive(Debug, Serialize, Deserialize)]
pub struct XGBoost {
    hyperparams: XGBoostHyperparams,
    #[serde(skip)]
    predictor_impl: Arc<PredictorImpl>,
    #[serde(skip)]
    dependencies: Vec<Fingerprint>,
    fitted: Option<BoostedModel>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct BoostedModel {
    base: Float,
    trees: Vec<Node>,
    /// Accumulated split gain per design column.
    gains: Vec<Float>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: Float,
    },
    Split {
        feature: usize,
        threshold: Float,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, row: &[Float]) -> Float {
        match self {
            Node::Leaf { value } => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] <= *threshold {
                    left.predict(row)
                } else {
                    right.predict(row)
                }
            }
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: Float,
    gain: Float,
}

impl XGBoost {
    pub fn new(
        hyperparams: XGBoostHyperparams,
        predictor_impl: Arc<PredictorImpl>,
        dependencies: Vec<Fingerprint>,
    ) -> Self {
        Self {
            hyperparams,
            predictor_impl,
            dependencies,
            fitted: None,
        }
    }

    fn num_threads(&self) -> usize {
        if self.hyperparams.n_jobs <= 0 {
            (num_cpus::get() / 2).max(2)
        } else {
            self.hyperparams.n_jobs as usize
        }
    }

    fn is_logistic(&self) -> bool {
        self.hyperparams.objective == XGBoostObjective::BinaryLogistic
    }

    fn score(&self, sum: Float, count: Float) -> Float {
        -(sum * sum) / (count + self.hyperparams.reg_lambda)
    }

    fn leaf_value(&self, sum: Float, count: Float) -> Float {
        sum / (count + self.hyperparams.reg_lambda)
    }

    fn best_split_for_feature(
        &self,
        feature: usize,
        rows: &[usize],
        design: &[Vec<Float>],
        gradients: &[Float],
    ) -> Option<SplitCandidate> {
        let mut values: Vec<(Float, Float)> = rows
            .iter()
            .map(|&r| (design[r][feature], gradients[r]))
            .collect();
        values.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let total_sum: Float = values.iter().map(|(_, g)| g).sum();
        let total_count = values.len() as Float;
        let parent_score = self.score(total_sum, total_count);

        let step = (values.len() / MAX_CANDIDATES).max(1);

        let mut best: Option<SplitCandidate> = None;
        let mut left_sum = 0.0;

        for (i, (value, gradient)) in values.iter().enumerate() {
            left_sum += gradient;

            if (i + 1) % step != 0 {
                continue;
            }
            if i + 1 >= values.len() || *value == values[i + 1].0 {
                continue;
            }

            let left_count = (i + 1) as Float;
            let right_count = total_count - left_count;
            let min_weight = self.hyperparams.min_child_weights;
            if left_count < min_weight || right_count < min_weight {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let gain = parent_score
                - self.score(left_sum, left_count)
                - self.score(right_sum, right_count);

            if gain > best.as_ref().map(|b| b.gain).unwrap_or(MIN_GAIN) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: (*value + values[i + 1].0) / 2.0,
                    gain,
                });
            }
        }

        best
    }

    fn build_tree(
        &self,
        rows: Vec<usize>,
        design: &[Vec<Float>],
        gradients: &[Float],
        depth: usize,
        gains: &mut [Float],
    ) -> Node {
        let sum: Float = rows.iter().map(|&r| gradients[r]).sum();
        let count = rows.len() as Float;

        if depth >= self.hyperparams.max_depth || rows.len() < 2 {
            return Node::Leaf {
                value: self.leaf_value(sum, count),
            };
        }

        let ncols = design.first().map(Vec::len).unwrap_or(0);

        let best = (0..ncols)
            .into_par_iter()
            .filter_map(|feature| self.best_split_for_feature(feature, &rows, design, gradients))
            .max_by(|a, b| {
                a.gain
                    .partial_cmp(&b.gain)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.feature.cmp(&a.feature))
            });

        let Some(split) = best else {
            return Node::Leaf {
                value: self.leaf_value(sum, count),
            };
        };

        gains[split.feature] += split.gain;

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| design[r][split.feature] <= split.threshold);

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.build_tree(left_rows, design, gradients, depth + 1, gains)),
            right: Box::new(self.build_tree(right_rows, design, gradients, depth + 1, gains)),
        }
    }

    fn fitted(&self) -> Result<&BoostedModel> {
        self.fitted
            .as_ref()
            .ok_or_else(|| RfeError::Data("The XGBoost predictor has not been fitted.".to_string()))
    }

    fn raw_predictions(&self, model: &BoostedModel, design: &[Vec<Float>]) -> Vec<Float> {
        design
            .iter()
            .map(|row| {
                model.base
                    + self.hyperparams.learning_rate
                        * model.trees.iter().map(|tree| tree.predict(row)).sum::<Float>()
            })
            .collect()
    }
}

impl Fingerprinted for XGBoost {
    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(FingerprintValue::XGBoost {
            hyperparams: self.hyperparams.clone(),
            dependencies: self.dependencies.clone(),
            autofeatures: self.predictor_impl.autofeatures().to_vec(),
            categorical_colnames: self.predictor_impl.categorical_colnames().to_vec(),
            numerical_colnames: self.predictor_impl.numerical_colnames().to_vec(),
        })
    }
}

impl Predictor for XGBoost {
    fn fit(
        &mut self,
        logger: &ProgressLogger,
        x_categorical: &CategoricalFeatures,
        x_numerical: &NumericalFeatures,
        y: &Feature<Float>,
        _x_categorical_valid: Option<&CategoricalFeatures>,
        _x_numerical_valid: Option<&NumericalFeatures>,
        _y_valid: Option<&Feature<Float>>,
    ) -> Result<String> {
        let design = self
            .predictor_impl
            .make_design_rows(x_categorical, x_numerical)?;

        let nrows = design.len();
        let ncols = design.first().map(Vec::len).unwrap_or(0);

        let base = if self.is_logistic() {
            let mean = (y.iter().sum::<Float>() / nrows.max(1) as Float).clamp(1.0e-6, 1.0 - 1.0e-6);
            (mean / (1.0 - mean)).ln()
        } else {
            y.iter().sum::<Float>() / nrows.max(1) as Float
        };

        let mut predictions = vec![base; nrows];
        let mut trees = Vec::with_capacity(self.hyperparams.n_estimators);
        let mut gains = vec![0.0; ncols];

        let mut rng = ChaCha8Rng::seed_from_u64(self.hyperparams.seed);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads())
            .build()
            .map_err(|e| RfeError::Configuration(e.to_string()))?;

        pool.install(|| {
            for round in 0..self.hyperparams.n_estimators {
                let gradients: Vec<Float> = if self.is_logistic() {
                    y.iter()
                        .zip(&predictions)
                        .map(|(&target, &raw)| target - sigmoid(raw))
                        .collect()
                } else {
                    y.iter()
                        .zip(&predictions)
                        .map(|(&target, &raw)| target - raw)
                        .collect()
                };

                let mut rows: Vec<usize> = (0..nrows).collect();
                if self.hyperparams.subsample < 1.0 {
                    let keep =
                        ((nrows as Float) * self.hyperparams.subsample).ceil() as usize;
                    rows.shuffle(&mut rng);
                    rows.truncate(keep.max(1));
                    rows.sort_unstable();
                }

                let tree = self.build_tree(rows, &design, &gradients, 0, &mut gains);

                for (prediction, row) in predictions.iter_mut().zip(&design) {
                    *prediction += self.hyperparams.learning_rate * tree.predict(row);
                }

                trees.push(tree);

                if round % 10 == 0 {
                    logger.progress(round * 100 / self.hyperparams.n_estimators.max(1));
                }
            }
        });

        self.fitted = Some(BoostedModel { base, trees, gains });

        logger.progress(100);

        Ok(format!(
            "XGBoost: Trained {} trees.",
            self.hyperparams.n_estimators
        ))
    }

    fn predict(
        &self,
        x_categorical: &CategoricalFeatures,
        x_numerical: &NumericalFeatures,
    ) -> Result<Vec<Float>> {
        let model = self.fitted()?;
        let design = self
            .predictor_impl
            .make_design_rows(x_categorical, x_numerical)?;

        let raw = self.raw_predictions(model, &design);

        if self.is_logistic() {
            Ok(raw.into_iter().map(sigmoid).collect())
        } else {
            Ok(raw)
        }
    }

    fn feature_importances(&self, n_features: usize) -> Vec<Float> {
        let Ok(model) = self.fitted() else {
            return vec![0.0; n_features];
        };

        let total: Float = model.gains.iter().sum();
        let normalized: Vec<Float> = if total == 0.0 {
            let n = model.gains.len().max(1) as Float;
            vec![1.0 / n; model.gains.len()]
        } else {
            model.gains.iter().map(|g| g / total).collect()
        };

        let compressed = self
            .predictor_impl
            .compress_importances(&normalized)
            .unwrap_or_else(|_| vec![0.0; n_features]);

        let mut importances = compressed;
        importances.resize(n_features, 0.0);
        importances
    }

    fn is_classification(&self) -> bool {
        self.is_logistic()
    }

    fn silent(&self) -> bool {
        true
    }

    fn save(&self, stem: &Path, format: Format) -> Result<()> {
        saver::save(stem, self, format)
    }

    fn load(&mut self, stem: &Path, format: Format) -> Result<()> {
        let loaded: XGBoost = saver::load(stem, format)?;
        self.fitted = loaded.fitted;
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "XGBoost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hyperparams() -> XGBoostHyperparams {
        XGBoostHyperparams {
            objective: XGBoostObjective::SquaredError,
            n_estimators: 30,
            learning_rate: 0.3,
            max_depth: 3,
            min_child_weights: 1.0,
            reg_lambda: 1.0,
            subsample: 1.0,
            n_jobs: 1,
            seed: 42,
        }
    }

    fn data() -> (NumericalFeatures, Feature<Float>) {
        let x: Vec<Float> = (0..60).map(|i| i as Float / 10.0).collect();
        let y: Vec<Float> = x.iter().map(|&v| if v < 3.0 { 1.0 } else { 5.0 }).collect();
        (vec![Feature::new("x", x)], Feature::new("y", y))
    }

    #[test]
    fn test_fits_step_function() {
        let imp = PredictorImpl::new(&[], vec![], vec!["x".to_string()]);
        let mut model = XGBoost::new(hyperparams(), Arc::new(imp), vec![]);
        let (x, y) = data();

        model
            .fit(&ProgressLogger::silent(), &vec![], &x, &y, None, None, None)
            .unwrap();

        let predictions = model.predict(&vec![], &x).unwrap();
        assert!((predictions[0] - 1.0).abs() < 0.5);
        assert!((predictions[59] - 5.0).abs() < 0.5);
    }

    #[test]
    fn test_deterministic_for_same_seed() {
        let (x, y) = data();

        let run = || {
            let imp = PredictorImpl::new(&[], vec![], vec!["x".to_string()]);
            let mut model = XGBoost::new(
                XGBoostHyperparams {
                    subsample: 0.8,
                    ..hyperparams()
                },
                Arc::new(imp),
                vec![],
            );
            model
                .fit(&ProgressLogger::silent(), &vec![], &x, &y, None, None, None)
                .unwrap();
            model.predict(&vec![], &x).unwrap()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_importances_sum_to_one() {
        let imp = PredictorImpl::new(&[], vec![], vec!["x".to_string()]);
        let mut model = XGBoost::new(hyperparams(), Arc::new(imp), vec![]);
        let (x, y) = data();
        model
            .fit(&ProgressLogger::silent(), &vec![], &x, &y, None, None, None)
            .unwrap();

        let importances = model.feature_importances(1);
        assert!((importances.iter().sum::<Float>() - 1.0).abs() < 1e-9);
    }
}
