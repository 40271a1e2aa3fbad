//! Shared gradient-descent core of the linear models.

use serde::{Deserialize, Serialize};

use crate::Float;

const EPOCHS: usize = 500;

/// Per-column standardization learned during fit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub means: Vec<Float>,
    pub stds: Vec<Float>,
}

impl Scaler {
    pub fn fit(rows: &[Vec<Float>], ncols: usize) -> Self {
        let nrows = rows.len().max(1) as Float;

        let mut means = vec![0.0; ncols];
        for row in rows {
            for (j, &v) in row.iter().enumerate() {
                means[j] += v;
            }
        }
        for mean in &mut means {
            *mean /= nrows;
        }

        let mut stds = vec![0.0; ncols];
        for row in rows {
            for (j, &v) in row.iter().enumerate() {
                stds[j] += (v - means[j]) * (v - means[j]);
            }
        }
        for std in &mut stds {
            *std = (*std / nrows).sqrt();
            if *std == 0.0 {
                *std = 1.0;
            }
        }

        Self { means, stds }
    }

    pub fn scale(&self, row: &[Float]) -> Vec<Float> {
        row.iter()
            .enumerate()
            .map(|(j, &v)| (v - self.means[j]) / self.stds[j])
            .collect()
    }
}

/// The fitted state of a linear model: standardization plus weights and
/// intercept in scaled space.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GlmWeights {
    pub scaler: Scaler,
    pub weights: Vec<Float>,
    pub bias: Float,
}

impl GlmWeights {
    pub fn linear_response(&self, row: &[Float]) -> Float {
        let scaled = self.scaler.scale(row);
        self.bias
            + self
                .weights
                .iter()
                .zip(&scaled)
                .map(|(w, x)| w * x)
                .sum::<Float>()
    }
}

pub fn sigmoid(z: Float) -> Float {
    1.0 / (1.0 + (-z).exp())
}

/// Full-batch gradient descent with a ridge penalty.
///
/// With `logistic` set, the response goes through a sigmoid and the
/// gradient is the cross-entropy one; otherwise plain least squares.
pub fn fit_gradient_descent(
    rows: &[Vec<Float>],
    y: &[Float],
    learning_rate: Float,
    reg_lambda: Float,
    logistic: bool,
) -> GlmWeights {
    let ncols = rows.first().map(Vec::len).unwrap_or(0);
    let nrows = rows.len().max(1) as Float;

    let scaler = Scaler::fit(rows, ncols);
    let scaled: Vec<Vec<Float>> = rows.iter().map(|row| scaler.scale(row)).collect();

    let mut weights = vec![0.0; ncols];
    let mut bias = 0.0;

    for _ in 0..EPOCHS {
        let mut weight_grads = vec![0.0; ncols];
        let mut bias_grad = 0.0;

        for (row, &target) in scaled.iter().zip(y) {
            let response = bias
                + weights
                    .iter()
                    .zip(row)
                    .map(|(w, x)| w * x)
                    .sum::<Float>();
            let prediction = if logistic { sigmoid(response) } else { response };
            let error = prediction - target;

            for (grad, &x) in weight_grads.iter_mut().zip(row) {
                *grad += error * x;
            }
            bias_grad += error;
        }

        for (weight, grad) in weights.iter_mut().zip(&weight_grads) {
            *weight -= learning_rate * (grad / nrows + reg_lambda * *weight);
        }
        bias -= learning_rate * bias_grad / nrows;
    }

    GlmWeights {
        scaler,
        weights,
        bias,
    }
}

/// Importance of each design column: |weight|, normalized to sum 1 before
/// compression. Falls back to uniform when all weights vanish.
pub fn weight_importances(weights: &GlmWeights) -> Vec<Float> {
    let absolute: Vec<Float> = weights.weights.iter().map(|w| w.abs()).collect();
    let total: Float = absolute.iter().sum();
    if total == 0.0 {
        let n = absolute.len().max(1) as Float;
        return vec![1.0 / n; absolute.len()];
    }
    absolute.into_iter().map(|v| v / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_linear_relationship() {
        let rows: Vec<Vec<Float>> = (0..50).map(|i| vec![i as Float]).collect();
        let y: Vec<Float> = rows.iter().map(|row| 2.0 * row[0] + 1.0).collect();

        let fitted = fit_gradient_descent(&rows, &y, 0.1, 0.0, false);

        for (row, &target) in rows.iter().zip(&y) {
            assert!((fitted.linear_response(row) - target).abs() < 1.0);
        }
    }

    #[test]
    fn test_logistic_separates() {
        let rows: Vec<Vec<Float>> = (0..40)
            .map(|i| vec![if i < 20 { -1.0 } else { 1.0 } + (i % 5) as Float * 0.01])
            .collect();
        let y: Vec<Float> = (0..40).map(|i| if i < 20 { 0.0 } else { 1.0 }).collect();

        let fitted = fit_gradient_descent(&rows, &y, 0.5, 0.0, true);

        assert!(sigmoid(fitted.linear_response(&[-1.0])) < 0.5);
        assert!(sigmoid(fitted.linear_response(&[1.0])) > 0.5);
    }
}
