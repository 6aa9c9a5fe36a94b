//! Model training module
//!
//! Provides the binary classifier contract used by the search and the
//! model families it can build:
//! - Gradient boosted trees (second-order, XGBoost-style)
//! - L2-regularized logistic regression

pub mod boosting;
pub mod linear_models;
pub mod models;
pub mod params;

pub use boosting::{BoostedTreesClassifier, BoostingConfig};
pub use linear_models::{LogisticConfig, LogisticRegression};
pub use models::{Classifier, Model, ModelFamily};
pub use params::{describe, ParamValue, Params};
