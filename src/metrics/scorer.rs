use serde::{Deserialize, Serialize};

use crate::containers::Feature;
use crate::{Float, Result, RfeError};

/// One evaluation of a pipeline on one data set. Every metric holds one
/// value per target.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub set_used: String,
    pub accuracy: Option<Vec<Float>>,
    pub auc: Option<Vec<Float>>,
    pub cross_entropy: Option<Vec<Float>>,
    pub mae: Option<Vec<Float>>,
    pub rmse: Option<Vec<Float>>,
    pub rsquared: Option<Vec<Float>>,
}

/// Scores predictions against targets.
///
/// Classification pipelines are scored with accuracy, AUC and cross
/// entropy; regression pipelines with MAE, RMSE and R squared. Prediction
/// and target shapes must match exactly.
pub fn score(
    is_classification: bool,
    yhat: &[Feature<Float>],
    y: &[Feature<Float>],
    set_used: &str,
) -> Result<Metrics> {
    if yhat.len() != y.len() {
        return Err(RfeError::Data(format!(
            "Number of columns in predictions and targets do not match! \
             Number of columns in predictions: {}. Number of columns in targets: {}.",
            yhat.len(),
            y.len()
        )));
    }

    for (predicted, actual) in yhat.iter().zip(y) {
        if predicted.len() != actual.len() {
            return Err(RfeError::Data(format!(
                "Number of rows in predictions and targets do not match! \
                 Number of rows in predictions: {}. Number of rows in targets: {}.",
                predicted.len(),
                actual.len()
            )));
        }
    }

    let mut metrics = Metrics {
        set_used: set_used.to_string(),
        ..Default::default()
    };

    if is_classification {
        metrics.accuracy = Some(apply(yhat, y, accuracy));
        metrics.auc = Some(apply(yhat, y, auc));
        metrics.cross_entropy = Some(apply(yhat, y, cross_entropy));
    } else {
        metrics.mae = Some(apply(yhat, y, mae));
        metrics.rmse = Some(apply(yhat, y, rmse));
        metrics.rsquared = Some(apply(yhat, y, rsquared));
    }

    Ok(metrics)
}

fn apply(
    yhat: &[Feature<Float>],
    y: &[Feature<Float>],
    metric: fn(&[Float], &[Float]) -> Float,
) -> Vec<Float> {
    yhat.iter()
        .zip(y)
        .map(|(predicted, actual)| metric(predicted.data(), actual.data()))
        .collect()
}

fn accuracy(yhat: &[Float], y: &[Float]) -> Float {
    if yhat.is_empty() {
        return 0.0;
    }
    let correct = yhat
        .iter()
        .zip(y)
        .filter(|(&p, &a)| (p >= 0.5) == (a >= 0.5))
        .count();
    correct as Float / yhat.len() as Float
}

/// Rank-based AUC with tie correction.
fn auc(yhat: &[Float], y: &[Float]) -> Float {
    let num_positive = y.iter().filter(|&&v| v >= 0.5).count();
    let num_negative = y.len() - num_positive;

    if num_positive == 0 || num_negative == 0 {
        return 0.5;
    }

    let mut indexed: Vec<(Float, bool)> = yhat
        .iter()
        .zip(y)
        .map(|(&p, &a)| (p, a >= 0.5))
        .collect();
    indexed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < indexed.len() {
        let mut j = i;
        while j < indexed.len() && indexed[j].0 == indexed[i].0 {
            j += 1;
        }
        let mean_rank = ((i + 1 + j) as Float) / 2.0;
        for item in &indexed[i..j] {
            if item.1 {
                rank_sum += mean_rank;
            }
        }
        i = j;
    }

    let num_positive = num_positive as Float;
    let num_negative = num_negative as Float;

    (rank_sum - num_positive * (num_positive + 1.0) / 2.0) / (num_positive * num_negative)
}

fn cross_entropy(yhat: &[Float], y: &[Float]) -> Float {
    if yhat.is_empty() {
        return 0.0;
    }
    let eps = 1.0e-15;
    let sum: Float = yhat
        .iter()
        .zip(y)
        .map(|(&p, &a)| {
            let p = p.clamp(eps, 1.0 - eps);
            -(a * p.ln() + (1.0 - a) * (1.0 - p).ln())
        })
        .sum();
    sum / yhat.len() as Float
}

fn mae(yhat: &[Float], y: &[Float]) -> Float {
    if yhat.is_empty() {
        return 0.0;
    }
    let sum: Float = yhat.iter().zip(y).map(|(&p, &a)| (p - a).abs()).sum();
    sum / yhat.len() as Float
}

fn rmse(yhat: &[Float], y: &[Float]) -> Float {
    if yhat.is_empty() {
        return 0.0;
    }
    let sum: Float = yhat.iter().zip(y).map(|(&p, &a)| (p - a) * (p - a)).sum();
    (sum / yhat.len() as Float).sqrt()
}

fn rsquared(yhat: &[Float], y: &[Float]) -> Float {
    if y.is_empty() {
        return 0.0;
    }
    let mean = y.iter().sum::<Float>() / y.len() as Float;
    let total: Float = y.iter().map(|&a| (a - mean) * (a - mean)).sum();
    if total == 0.0 {
        return 0.0;
    }
    let residual: Float = yhat.iter().zip(y).map(|(&p, &a)| (a - p) * (a - p)).sum();
    1.0 - residual / total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regression_metrics() {
        let yhat = vec![Feature::new("p", vec![1.0, 2.0, 3.0])];
        let y = vec![Feature::new("y", vec![1.0, 2.0, 5.0])];
        let metrics = score(false, &yhat, &y, "train").unwrap();
        let mae = metrics.mae.unwrap()[0];
        assert!((mae - 2.0 / 3.0).abs() < 1e-12);
        assert!(metrics.accuracy.is_none());
    }

    #[test]
    fn test_classification_metrics() {
        let yhat = vec![Feature::new("p", vec![0.9, 0.8, 0.2, 0.1])];
        let y = vec![Feature::new("y", vec![1.0, 1.0, 0.0, 0.0])];
        let metrics = score(true, &yhat, &y, "train").unwrap();
        assert!((metrics.accuracy.unwrap()[0] - 1.0).abs() < 1e-12);
        assert!((metrics.auc.unwrap()[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_shape_mismatch() {
        let yhat = vec![Feature::new("p", vec![1.0])];
        let y = vec![
            Feature::new("y1", vec![1.0]),
            Feature::new("y2", vec![1.0]),
        ];
        assert!(score(false, &yhat, &y, "train").is_err());
    }

    #[test]
    fn test_auc_handles_ties() {
        let yhat = vec![Feature::new("p", vec![0.5, 0.5, 0.5, 0.5])];
        let y = vec![Feature::new("y", vec![1.0, 0.0, 1.0, 0.0])];
        let metrics = score(true, &yhat, &y, "train").unwrap();
        assert!((metrics.auc.unwrap()[0] - 0.5).abs() < 1e-12);
    }
}
