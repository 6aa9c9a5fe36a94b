//! Explicit handle to the pipeline used for scoring

use super::pipeline::TrainedPipeline;
use super::store;
use crate::error::Result;
use crate::features::FeatureVector;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Probability above which an employee is high risk
pub const HIGH_RISK_THRESHOLD: f64 = 0.65;
/// Probability above which an employee is medium risk
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability > HIGH_RISK_THRESHOLD {
            RiskLevel::High
        } else if probability > MEDIUM_RISK_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

/// Model output for one employee
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub probability: f64,
    pub level: RiskLevel,
}

/// Shared, swappable reference to the loaded pipeline.
///
/// Empty until a pipeline is loaded; an unreadable artifact leaves it empty.
#[derive(Debug, Default, Clone)]
pub struct PipelineHandle {
    inner: Arc<RwLock<Option<Arc<TrainedPipeline>>>>,
}

impl PipelineHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pipeline(pipeline: TrainedPipeline) -> Self {
        let handle = Self::new();
        handle.replace(pipeline);
        handle
    }

    /// Load an artifact; returns whether a pipeline is now available
    pub fn load(&self, path: &Path) -> bool {
        match store::load(path) {
            Ok(pipeline) => {
                info!(path = %path.display(), family = %pipeline.metadata().family, "Pipeline loaded");
                *self.inner.write() = Some(Arc::new(pipeline));
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "No pipeline available");
                *self.inner.write() = None;
                false
            }
        }
    }

    pub fn unload(&self) {
        *self.inner.write() = None;
    }

    /// Swap in a new pipeline, returning the previous one
    pub fn replace(&self, pipeline: TrainedPipeline) -> Option<Arc<TrainedPipeline>> {
        self.inner.write().replace(Arc::new(pipeline))
    }

    pub fn current(&self) -> Option<Arc<TrainedPipeline>> {
        self.inner.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.read().is_some()
    }

    /// Score one employee; `None` when no pipeline is loaded
    pub fn assess(&self, features: &FeatureVector) -> Result<Option<RiskAssessment>> {
        let Some(pipeline) = self.current() else {
            return Ok(None);
        };
        let probability = pipeline.predict_one(features)?;
        Ok(Some(RiskAssessment {
            probability,
            level: RiskLevel::from_probability(probability),
        }))
    }
}
