//! Classifier contract and the model families the search can build

use super::boosting::{BoostedTreesClassifier, BoostingConfig};
use super::linear_models::{LogisticConfig, LogisticRegression};
use super::params::{ParamValue, Params};
use crate::error::{AttritionError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Binary classifier contract. Labels are `0.0` / `1.0`.
pub trait Classifier: Send + Sync {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Probability of the positive class for each row
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Hard labels, thresholded at 0.5
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }

    fn is_fitted(&self) -> bool;
}

/// Available model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    GradientBoosting,
    LogisticRegression,
}

impl ModelFamily {
    /// Instantiate an unfitted model from one parameter configuration
    pub fn build(&self, params: &Params, seed: u64) -> Result<Model> {
        match self {
            ModelFamily::GradientBoosting => {
                let config = BoostingConfig::from_params(params, Some(seed))?;
                Ok(Model::GradientBoosting(BoostedTreesClassifier::new(config)))
            }
            ModelFamily::LogisticRegression => {
                let config = LogisticConfig::from_params(params)?;
                Ok(Model::LogisticRegression(LogisticRegression::new(config)))
            }
        }
    }

    /// Knob names the family accepts
    pub fn knobs(&self) -> &'static [&'static str] {
        match self {
            ModelFamily::GradientBoosting => BoostingConfig::KNOBS,
            ModelFamily::LogisticRegression => LogisticConfig::KNOBS,
        }
    }

    /// Search space used when none is configured
    pub fn default_grid(&self) -> BTreeMap<String, Vec<ParamValue>> {
        let mut grid = BTreeMap::new();
        match self {
            ModelFamily::GradientBoosting => {
                grid.insert("n_estimators".to_string(), vec![100usize.into(), 200usize.into()]);
                grid.insert(
                    "max_depth".to_string(),
                    vec![3usize.into(), 5usize.into(), 7usize.into()],
                );
                grid.insert("learning_rate".to_string(), vec![0.05.into(), 0.1.into()]);
                grid.insert("subsample".to_string(), vec![0.7.into(), 0.9.into()]);
            }
            ModelFamily::LogisticRegression => {
                grid.insert("alpha".to_string(), vec![0.001.into(), 0.01.into(), 0.1.into()]);
                grid.insert("learning_rate".to_string(), vec![0.1.into()]);
            }
        }
        grid
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::GradientBoosting => write!(f, "gradient_boosting"),
            ModelFamily::LogisticRegression => write!(f, "logistic_regression"),
        }
    }
}

impl FromStr for ModelFamily {
    type Err = AttritionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "gradient_boosting" | "xgboost" | "boosting" => Ok(ModelFamily::GradientBoosting),
            "logistic_regression" | "logistic" => Ok(ModelFamily::LogisticRegression),
            other => Err(AttritionError::ConfigError(format!("unknown model family '{}'", other))),
        }
    }
}

/// A model of any family, serializable as part of a trained pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Model {
    GradientBoosting(BoostedTreesClassifier),
    LogisticRegression(LogisticRegression),
}

impl Model {
    pub fn family(&self) -> ModelFamily {
        match self {
            Model::GradientBoosting(_) => ModelFamily::GradientBoosting,
            Model::LogisticRegression(_) => ModelFamily::LogisticRegression,
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            Model::GradientBoosting(m) => m,
            Model::LogisticRegression(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            Model::GradientBoosting(m) => m,
            Model::LogisticRegression(m) => m,
        }
    }
}

impl Classifier for Model {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict_proba(x)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.inner().feature_importances()
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }
}
