//! Error types for the attrition training pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, AttritionError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum AttritionError {
    /// The table store cannot be opened or read. Fatal for a training run.
    #[error("Table store unavailable: {0}")]
    StoreUnavailable(String),

    /// The anchor table or the merged dataset lacks required columns. Fatal.
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    /// Stages of a preprocessor were fitted by different `fit` calls.
    #[error("Stale preprocessor state: stage '{stage}' was fitted by a different fit call")]
    StalePreprocessor { stage: String },

    #[error("Training error: {0}")]
    TrainingError(String),

    /// A single model fit diverged (non-finite values, degenerate input).
    #[error("Fit failure: {0}")]
    FitFailure(String),

    #[error("Convergence failed after {iterations} iterations")]
    ConvergenceError { iterations: usize },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    /// A stored pipeline cannot be decoded. Serving layers treat this as
    /// "no model available".
    #[error("Artifact corrupt: {0}")]
    ArtifactCorrupt(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl AttritionError {
    /// Whether the error is local to one model fit and must not abort a search.
    pub fn is_fit_failure(&self) -> bool {
        matches!(
            self,
            AttritionError::FitFailure(_)
                | AttritionError::ConvergenceError { .. }
                | AttritionError::InvalidParameter { .. }
        )
    }

    /// Whether the error must abort a training run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AttritionError::StoreUnavailable(_) | AttritionError::Schema(_)
        )
    }
}

impl From<polars::error::PolarsError> for AttritionError {
    fn from(err: polars::error::PolarsError) -> Self {
        AttritionError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for AttritionError {
    fn from(err: serde_json::Error) -> Self {
        AttritionError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for AttritionError {
    fn from(err: bincode::Error) -> Self {
        AttritionError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for AttritionError {
    fn from(err: ndarray::ShapeError) -> Self {
        AttritionError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AttritionError::Schema("anchor table 'employees' missing".to_string());
        assert_eq!(err.to_string(), "Schema error: anchor table 'employees' missing");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AttritionError = io_err.into();
        assert!(matches!(err, AttritionError::IoError(_)));
    }

    #[test]
    fn test_fit_failure_classification() {
        assert!(AttritionError::FitFailure("nan".into()).is_fit_failure());
        assert!(AttritionError::ConvergenceError { iterations: 10 }.is_fit_failure());
        assert!(!AttritionError::ModelNotFitted.is_fit_failure());
        assert!(AttritionError::Schema("x".into()).is_fatal());
        assert!(!AttritionError::ArtifactCorrupt("x".into()).is_fatal());
    }
}
