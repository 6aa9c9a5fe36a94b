//! Data preprocessing module
//!
//! Leakage-safe preprocessing of engineered features:
//! - Median imputation of numeric features
//! - Sentinel imputation of categorical features
//! - Standard scaling
//! - One-hot encoding with unseen categories mapped to all zeros
//!
//! Statistics are learned by one `fit` on training rows and reused
//! verbatim by every later `transform`.

mod pipeline;
mod stages;

pub use pipeline::Preprocessor;
pub use stages::{
    median, ColumnKind, ConstantImputer, ImputationRecord, MedianImputer, OneHotEncoder, Stage,
    StandardScaler, Transform,
};
