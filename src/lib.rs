//! Attrition ML - Employee attrition training pipeline
//!
//! This crate trains a binary classifier estimating how likely an employee
//! is to leave, from HR records spread across several related tables:
//! - Multi-table merge keyed by employee id
//! - Label derivation and engineered features
//! - Leakage-safe preprocessing (imputation, scaling, one-hot encoding)
//! - Cross-validated grid search over boosted trees or logistic regression
//! - Held-out evaluation and a single deployable pipeline artifact
//!
//! # Modules
//!
//! ## Data
//! - [`store`] - Read-only table stores (CSV/JSON directory, in-memory)
//! - [`data`] - Left join of augmentation tables onto the anchor table
//! - [`features`] - Labels, day counts, ratios and interactions
//!
//! ## Modelling
//! - [`preprocessing`] - Fit-once stage list producing the model matrix
//! - [`training`] - Classifier contract and model families
//! - [`selection`] - Stratified splits, K-fold CV and grid search
//! - [`evaluation`] - Metrics and the classification report
//!
//! ## Delivery
//! - [`artifact`] - Trained pipeline, artifact file format, scoring handle
//! - [`pipeline`] - End-to-end training run
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use attrition_ml::prelude::*;
//!
//! let config = PipelineConfig::default();
//! let store = config.table_store();
//! let outcome = TrainingRun::new(config).run(&store)?;
//! println!("{}", outcome.report);
//! # Ok::<(), attrition_ml::error::AttritionError>(())
//! ```

pub mod error;

pub mod config;
pub mod store;
pub mod data;
pub mod features;

pub mod preprocessing;
pub mod training;
pub mod selection;
pub mod evaluation;

pub mod artifact;
pub mod pipeline;
pub mod cli;

/// Commonly used types
pub mod prelude {
    pub use crate::artifact::{ArtifactStore, PipelineHandle, RiskAssessment, RiskLevel, TrainedPipeline};
    pub use crate::config::PipelineConfig;
    pub use crate::data::{DataMerger, MergeConfig, MergedDataset};
    pub use crate::error::{AttritionError, Result};
    pub use crate::evaluation::{EvaluationReport, Evaluator, Scoring};
    pub use crate::features::{FeatureConfig, FeatureEngineer, FeatureFrame, FeatureSet, FeatureVector};
    pub use crate::pipeline::{TrainingOutcome, TrainingRun};
    pub use crate::preprocessing::Preprocessor;
    pub use crate::selection::{HyperparameterGrid, ModelSelector, SearchConfig};
    pub use crate::store::{CsvTableStore, InMemoryTableStore, TableStore};
    pub use crate::training::{Classifier, ModelFamily, ParamValue, Params};
}
