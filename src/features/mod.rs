//! Feature engineering
//!
//! Derives the attrition label and the engineered signals (tenure, days
//! since appraisal and hike, compensation ratio, interaction terms) from a
//! merged dataset, and resolves the declared feature contract against the
//! columns that actually exist.

mod config;
mod engineer;
mod frame;

pub use config::{DateFeature, FeatureConfig};
pub use engineer::{
    days_between, derive_label, ordinal_codes, parse_date, FeatureEngineer, FeatureSet,
    COMPENSATION_RATIO, LATENESS_X_OVERTIME, SATISFACTION_X_COMPENSATION,
};
pub use frame::{FeatureFrame, FeatureValue, FeatureVector};
