//! Held-out evaluation
//!
//! Provides the search metrics and the final classification report.

mod metrics;
mod report;

pub use metrics::{roc_auc, threshold, ConfusionCounts, Scoring};
pub use report::{ClassMetrics, EvaluationReport};

use crate::artifact::TrainedPipeline;
use crate::error::Result;
use crate::features::FeatureFrame;
use ndarray::Array1;
use tracing::info;

/// Scores a trained pipeline on rows it never saw during fitting
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    /// Transform with the fitted preprocessor (no refit), predict and report
    pub fn evaluate(&self, pipeline: &TrainedPipeline, frame: &FeatureFrame, labels: &Array1<f64>) -> Result<EvaluationReport> {
        let proba = pipeline.predict_proba(frame)?;
        let report = EvaluationReport::from_predictions(labels, &proba)?;
        info!(
            rows = report.n_samples,
            accuracy = report.accuracy,
            f1_departed = report.positive_class().f1_score,
            roc_auc = report.roc_auc.unwrap_or(f64::NAN),
            "Evaluated on held-out partition"
        );
        Ok(report)
    }
}
