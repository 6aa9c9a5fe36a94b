//! Trained pipeline artifacts
//!
//! [`TrainedPipeline`] couples a fitted preprocessor with a fitted model,
//! [`ArtifactStore`] persists it as one file and [`PipelineHandle`] holds
//! the pipeline a scoring caller works with.

mod handle;
mod pipeline;
mod store;

pub use handle::{PipelineHandle, RiskAssessment, RiskLevel, HIGH_RISK_THRESHOLD, MEDIUM_RISK_THRESHOLD};
pub use pipeline::{PipelineMetadata, TrainedPipeline};
pub use store::{load, save, ArtifactStore, ARTIFACT_MAGIC, FORMAT_VERSION};
