//! Logistic Regression
//!
//! Binary probabilistic model over sparse tf-idf vectors. L2-regularized
//! with inverse strength C, optional class-balanced sample weights, trained
//! by full-batch gradient descent. Deterministic for fixed inputs.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::{ModelError, SparseVector};

/// Training hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// Inverse regularization strength; larger = weaker penalty
    pub c: f32,
    /// Gradient-descent iteration cap
    pub max_iter: usize,
    /// Stop when the gradient infinity-norm falls below this
    pub tol: f32,
    /// Reweight samples inversely to class frequency
    pub balanced: bool,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-4,
            balanced: true,
        }
    }
}

impl LogisticConfig {
    pub fn with_c(c: f32) -> Self {
        Self {
            c,
            ..Default::default()
        }
    }
}

/// Fitted weight vector + intercept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub weights: Vec<f32>,
    pub bias: f32,
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z.clamp(-30.0, 30.0)).exp())
}

impl LogisticModel {
    /// Fit on sparse rows `x` with labels `y` (0 or 1).
    pub fn fit(
        x: &[SparseVector],
        y: &[u8],
        n_features: usize,
        config: &LogisticConfig,
    ) -> Result<Self, ModelError> {
        let n = x.len();
        let positives = y.iter().filter(|&&label| label == 1).count();
        let negatives = n - positives;
        if positives == 0 || negatives == 0 {
            return Err(ModelError::SingleClass);
        }

        // Balanced weights average to 1 across the set.
        let (w_pos, w_neg) = if config.balanced {
            (
                n as f32 / (2.0 * positives as f32),
                n as f32 / (2.0 * negatives as f32),
            )
        } else {
            (1.0, 1.0)
        };
        let max_weight = w_pos.max(w_neg);

        // Rows are L2-normalized, so the loss Hessian is bounded by
        // 0.25 * max sample weight; keep the step inside that bound.
        let learning_rate = (4.0 / max_weight).min(1.0);
        let lambda = 1.0 / config.c;

        let mut weights = Array1::<f32>::zeros(n_features);
        let mut bias = 0.0f32;

        for iteration in 0..config.max_iter {
            let mut grad = &weights * (lambda / n as f32);
            let mut grad_bias = 0.0f32;

            for (row, &label) in x.iter().zip(y.iter()) {
                let margin = row
                    .iter()
                    .map(|&(index, value)| weights[index] * value)
                    .sum::<f32>()
                    + bias;
                let sample_weight = if label == 1 { w_pos } else { w_neg };
                let residual = sample_weight * (sigmoid(margin) - label as f32) / n as f32;
                for &(index, value) in row {
                    grad[index] += residual * value;
                }
                grad_bias += residual;
            }

            weights.scaled_add(-learning_rate, &grad);
            bias -= learning_rate * grad_bias;

            let grad_norm = grad
                .iter()
                .fold(grad_bias.abs(), |acc, g| acc.max(g.abs()));
            if grad_norm < config.tol {
                log::debug!("logistic fit converged after {} iterations", iteration + 1);
                break;
            }
        }

        Ok(Self {
            weights: weights.to_vec(),
            bias,
        })
    }

    /// Raw decision value `w . x + b`.
    pub fn decision(&self, x: &SparseVector) -> Result<f32, ModelError> {
        let mut z = self.bias;
        for &(index, value) in x {
            let weight = self
                .weights
                .get(index)
                .ok_or(ModelError::DimensionMismatch {
                    model: self.weights.len(),
                    input: index + 1,
                })?;
            z += weight * value;
        }
        Ok(z)
    }

    /// P(label = 1 | x).
    pub fn predict_proba(&self, x: &SparseVector) -> Result<f32, ModelError> {
        Ok(sigmoid(self.decision(x)?))
    }

    /// Hard label at the 0.5 operating point.
    pub fn predict(&self, x: &SparseVector) -> Result<u8, ModelError> {
        Ok(u8::from(self.predict_proba(x)? >= 0.5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two-feature toy set: feature 0 marks class 0, feature 1 marks class 1.
    fn toy() -> (Vec<SparseVector>, Vec<u8>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for _ in 0..20 {
            x.push(vec![(0, 1.0)]);
            y.push(0);
            x.push(vec![(1, 1.0)]);
            y.push(1);
        }
        (x, y)
    }

    #[test]
    fn test_learns_separable_data() {
        let (x, y) = toy();
        let model = LogisticModel::fit(&x, &y, 2, &LogisticConfig::default()).unwrap();
        assert!(model.predict_proba(&vec![(0, 1.0)]).unwrap() < 0.5);
        assert!(model.predict_proba(&vec![(1, 1.0)]).unwrap() > 0.5);
    }

    #[test]
    fn test_stronger_regularization_shrinks_weights() {
        let (x, y) = toy();
        let strong = LogisticModel::fit(&x, &y, 2, &LogisticConfig::with_c(0.01)).unwrap();
        let weak = LogisticModel::fit(&x, &y, 2, &LogisticConfig::with_c(10.0)).unwrap();
        let norm = |m: &LogisticModel| m.weights.iter().map(|w| w * w).sum::<f32>();
        assert!(norm(&strong) < norm(&weak));
    }

    #[test]
    fn test_single_class_rejected() {
        let x = vec![vec![(0, 1.0)], vec![(0, 0.5)]];
        let y = vec![1, 1];
        assert!(matches!(
            LogisticModel::fit(&x, &y, 1, &LogisticConfig::default()),
            Err(ModelError::SingleClass)
        ));
    }

    #[test]
    fn test_deterministic_fit() {
        let (x, y) = toy();
        let a = LogisticModel::fit(&x, &y, 2, &LogisticConfig::default()).unwrap();
        let b = LogisticModel::fit(&x, &y, 2, &LogisticConfig::default()).unwrap();
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.bias, b.bias);
    }

    #[test]
    fn test_out_of_range_feature_is_error() {
        let (x, y) = toy();
        let model = LogisticModel::fit(&x, &y, 2, &LogisticConfig::default()).unwrap();
        assert!(matches!(
            model.decision(&vec![(7, 1.0)]),
            Err(ModelError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_vector_uses_bias_only() {
        let (x, y) = toy();
        let model = LogisticModel::fit(&x, &y, 2, &LogisticConfig::default()).unwrap();
        let p = model.predict_proba(&Vec::new()).unwrap();
        // Balanced classes: the intercept alone should sit near 0.5.
        assert!(p > 0.2 && p < 0.8);
    }
}
