//! End-to-end training run: store → merge → features → search → evaluate → save

use crate::artifact::{ArtifactStore, RiskAssessment, RiskLevel, TrainedPipeline};
use crate::config::PipelineConfig;
use crate::data::{DataMerger, MergeWarning};
use crate::error::Result;
use crate::evaluation::{EvaluationReport, Evaluator};
use crate::features::FeatureEngineer;
use crate::preprocessing::Preprocessor;
use crate::selection::{CandidateResult, ModelSelector};
use crate::store::TableStore;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// What a training run produced
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub pipeline: TrainedPipeline,
    pub report: EvaluationReport,
    pub candidates: Vec<CandidateResult>,
    pub best_index: usize,
    pub merge_warnings: Vec<MergeWarning>,
    /// Rows after the merge
    pub n_rows: usize,
    /// (still employed, departed) over all rows
    pub class_counts: (usize, usize),
    /// Where the artifact was written, if it was
    pub artifact_path: Option<PathBuf>,
}

impl TrainingOutcome {
    pub fn best(&self) -> &CandidateResult {
        &self.candidates[self.best_index]
    }
}

/// One batch training job
#[derive(Debug, Clone)]
pub struct TrainingRun {
    config: PipelineConfig,
}

impl TrainingRun {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Train, evaluate and persist the artifact at the configured path
    pub fn run(&self, store: &dyn TableStore) -> Result<TrainingOutcome> {
        let mut outcome = self.train(store, Utc::now())?;
        let artifacts = ArtifactStore::new(&self.config.artifact_path);
        artifacts.save(&outcome.pipeline)?;
        outcome.artifact_path = Some(artifacts.path().to_path_buf());
        Ok(outcome)
    }

    /// Train and evaluate without writing anything; `now` anchors day counts
    pub fn train(&self, store: &dyn TableStore, now: DateTime<Utc>) -> Result<TrainingOutcome> {
        self.config.validate()?;
        let start = Instant::now();

        let tables = store.snapshot()?;
        info!(tables = tables.len(), "Loaded table snapshot");

        let merged = DataMerger::new(self.config.merge.clone()).merge(&tables)?;
        let features = FeatureEngineer::new(self.config.features.clone()).engineer(&merged, now)?;
        let class_counts = features.class_counts();
        info!(
            rows = features.n_rows(),
            numerical = features.numerical.len(),
            categorical = features.categorical.len(),
            retained = class_counts.0,
            departed = class_counts.1,
            "Features engineered"
        );

        let template = Preprocessor::with_categorical_fill(
            features.numerical.clone(),
            features.categorical.clone(),
            &self.config.features.categorical_fill,
        );
        let selection = ModelSelector::new(self.config.search.clone()).select(&features, &template)?;

        for record in selection.pipeline.preprocessor().applied_imputations() {
            info!(
                column = %record.column,
                kind = ?record.kind,
                nulls = record.null_count,
                fill = %record.fill_value,
                "Imputation applied"
            );
        }

        let report = Evaluator::new().evaluate(&selection.pipeline, &selection.test_frame, &selection.test_labels)?;
        info!(elapsed_ms = start.elapsed().as_millis() as u64, "Training run complete");

        Ok(TrainingOutcome {
            pipeline: selection.pipeline,
            report,
            candidates: selection.outcome.candidates,
            best_index: selection.outcome.best_index,
            merge_warnings: merged.warnings().to_vec(),
            n_rows: features.n_rows(),
            class_counts,
            artifact_path: None,
        })
    }
}

/// Risk assessment of one employee
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeRisk {
    pub employee_id: String,
    pub assessment: RiskAssessment,
}

/// Score every employee of the anchor table with a trained pipeline.
///
/// Current staff carry no resignation reason, so the label column is not
/// required here. Lateness codes use the scale stored with the pipeline.
pub fn score_employees(
    config: &PipelineConfig,
    store: &dyn TableStore,
    pipeline: &TrainedPipeline,
    now: DateTime<Utc>,
) -> Result<Vec<EmployeeRisk>> {
    let tables = store.snapshot()?;
    let merge = config.merge.clone().without_required_column(&config.features.label_column);
    let merged = DataMerger::new(merge).merge(&tables)?;
    let features = config
        .features
        .clone()
        .with_frequency_levels(pipeline.metadata().frequency_levels.clone());
    let frame = FeatureEngineer::new(features).engineer_unlabeled(&merged, now)?;
    let proba = pipeline.predict_proba(&frame)?;

    let scored: Vec<EmployeeRisk> = frame
        .ids()
        .iter()
        .zip(proba.iter())
        .map(|(id, &probability)| EmployeeRisk {
            employee_id: id.clone(),
            assessment: RiskAssessment {
                probability,
                level: RiskLevel::from_probability(probability),
            },
        })
        .collect();
    info!(
        employees = scored.len(),
        high = scored.iter().filter(|r| r.assessment.level == RiskLevel::High).count(),
        "Scored employees"
    );
    Ok(scored)
}
