//! Linear model implementations

use super::models::Classifier;
use super::params::{check_known, f64_param, usize_param, Params};
use crate::error::{AttritionError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Gradient descent settings for [`LogisticRegression`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// Regularization strength (L2)
    pub alpha: f64,
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    pub learning_rate: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
        }
    }
}

impl LogisticConfig {
    pub const KNOBS: &'static [&'static str] = &["alpha", "max_iter", "tol", "learning_rate"];

    pub fn from_params(params: &Params) -> Result<Self> {
        check_known(params, Self::KNOBS)?;
        let d = Self::default();
        Ok(Self {
            alpha: f64_param(params, "alpha", d.alpha, |v| v >= 0.0, "expected a non-negative number")?,
            max_iter: usize_param(params, "max_iter", d.max_iter, 1)?,
            tol: f64_param(params, "tol", d.tol, |v| v > 0.0, "expected a positive number")?,
            learning_rate: f64_param(params, "learning_rate", d.learning_rate, |v| v > 0.0, "expected a positive number")?,
        })
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }
}

/// Logistic regression for binary classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    config: LogisticConfig,
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(LogisticConfig::default())
    }
}

impl LogisticRegression {
    pub fn new(config: LogisticConfig) -> Self {
        Self {
            config,
            coefficients: None,
            intercept: 0.0,
        }
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }
}

impl Classifier for LogisticRegression {
    /// Fit with batch gradient descent
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(AttritionError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(AttritionError::FitFailure("empty training set".to_string()));
        }

        self.coefficients = None;
        let mut weights: Array1<f64> = Array1::zeros(n_features);
        let mut bias = 0.0;

        let lr = self.config.learning_rate;
        let alpha = self.config.alpha;

        for iter in 0..self.config.max_iter {
            let linear = x.dot(&weights) + bias;
            let predictions = Self::sigmoid(&linear);

            let errors = &predictions - y;
            let dw = (x.t().dot(&errors) / n_samples as f64) + (alpha * &weights);
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if !grad_norm.is_finite() {
                return Err(AttritionError::FitFailure(format!(
                    "gradient diverged at iteration {}",
                    iter + 1
                )));
            }
            if grad_norm < self.config.tol {
                break;
            }

            weights = weights - lr * dw;
            bias -= lr * db;
        }

        if weights.iter().any(|w| !w.is_finite()) || !bias.is_finite() {
            return Err(AttritionError::FitFailure("non-finite coefficients".to_string()));
        }

        self.coefficients = Some(weights);
        self.intercept = bias;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(AttritionError::ModelNotFitted)?;
        if x.ncols() != coefficients.len() {
            return Err(AttritionError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let linear = x.dot(coefficients) + self.intercept;
        Ok(Self::sigmoid(&linear))
    }

    /// Absolute coefficient magnitudes, normalized to sum to one
    fn feature_importances(&self) -> Option<Array1<f64>> {
        let coefficients = self.coefficients.as_ref()?;
        let abs = coefficients.mapv(f64::abs);
        let total = abs.sum();
        if total > 0.0 {
            Some(abs / total)
        } else {
            Some(abs)
        }
    }

    fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }
}
