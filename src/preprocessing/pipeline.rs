//! Ordered stage list turning a feature frame into a model matrix

use super::stages::{
    ConstantImputer, ImputationRecord, MedianImputer, OneHotEncoder, Stage, StandardScaler, Transform,
};
use crate::error::{AttritionError, Result};
use crate::features::FeatureFrame;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Fit-once preprocessing pipeline over a fixed feature contract.
///
/// Output columns: numerical features in declared order, then every
/// categorical feature's indicators in vocabulary order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    numerical: Vec<String>,
    categorical: Vec<String>,
    stages: Vec<Stage>,
    fit_id: Option<Uuid>,
    feature_names: Vec<String>,
}

impl Preprocessor {
    /// Default stages: median impute, sentinel impute, standardize, one-hot
    pub fn new(numerical: Vec<String>, categorical: Vec<String>) -> Self {
        Self::with_categorical_fill(numerical, categorical, "Unknown")
    }

    pub fn with_categorical_fill(numerical: Vec<String>, categorical: Vec<String>, fill: &str) -> Self {
        let stages = vec![
            Stage::MedianImputer(MedianImputer::new()),
            Stage::ConstantImputer(ConstantImputer::new(fill)),
            Stage::StandardScaler(StandardScaler::new()),
            Stage::OneHotEncoder(OneHotEncoder::new()),
        ];
        Self::with_stages(numerical, categorical, stages)
    }

    /// Unfitted preprocessor with an explicit stage list
    pub fn with_stages(numerical: Vec<String>, categorical: Vec<String>, stages: Vec<Stage>) -> Self {
        Self {
            numerical,
            categorical,
            stages,
            fit_id: None,
            feature_names: Vec::new(),
        }
    }

    /// Reassemble a preprocessor from already fitted stages. The fit id is
    /// taken from the first stage; `transform` rejects stages from other fits.
    pub fn from_stages(numerical: Vec<String>, categorical: Vec<String>, stages: Vec<Stage>, feature_names: Vec<String>) -> Self {
        let fit_id = stages.first().and_then(Stage::fit_id);
        Self {
            numerical,
            categorical,
            stages,
            fit_id,
            feature_names,
        }
    }

    /// Fresh unfitted copy with the same contract and stage kinds
    pub fn template(&self) -> Self {
        let stages = self
            .stages
            .iter()
            .map(|s| match s {
                Stage::MedianImputer(_) => Stage::MedianImputer(MedianImputer::new()),
                Stage::ConstantImputer(c) => Stage::ConstantImputer(ConstantImputer::new(c.fill_value())),
                Stage::StandardScaler(_) => Stage::StandardScaler(StandardScaler::new()),
                Stage::OneHotEncoder(_) => Stage::OneHotEncoder(OneHotEncoder::new()),
            })
            .collect();
        Self::with_stages(self.numerical.clone(), self.categorical.clone(), stages)
    }

    pub fn is_fitted(&self) -> bool {
        self.fit_id.is_some()
    }

    pub fn fit_id(&self) -> Option<Uuid> {
        self.fit_id
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn numerical(&self) -> &[String] {
        &self.numerical
    }

    pub fn categorical(&self) -> &[String] {
        &self.categorical
    }

    /// Output column names; empty until fitted
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Learn every stage's statistics from `frame`. Allowed once.
    pub fn fit(&mut self, frame: &FeatureFrame) -> Result<()> {
        if self.fit_id.is_some() {
            return Err(AttritionError::PreprocessingError(
                "preprocessor is already fitted; build a fresh one from the template".to_string(),
            ));
        }
        if frame.n_rows() == 0 {
            return Err(AttritionError::PreprocessingError("cannot fit on zero rows".to_string()));
        }

        let start = Instant::now();
        let fit_id = Uuid::new_v4();
        let mut current = frame.select(&self.numerical, &self.categorical)?;

        for stage in &mut self.stages {
            stage.fit(&current)?;
            stage.stamp(fit_id);
            current = stage.transform(current)?;
        }

        if !current.categorical_names().is_empty() {
            return Err(AttritionError::PreprocessingError(
                "categorical columns remain after the last stage; add an encoder".to_string(),
            ));
        }

        self.feature_names = current.numeric_names();
        self.fit_id = Some(fit_id);
        debug!(
            rows = frame.n_rows(),
            outputs = self.feature_names.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Preprocessor fitted"
        );
        Ok(())
    }

    /// Apply the fitted stages; never refits.
    pub fn transform(&self, frame: &FeatureFrame) -> Result<Array2<f64>> {
        let fit_id = self.fit_id.ok_or(AttritionError::ModelNotFitted)?;
        for stage in &self.stages {
            if stage.fit_id() != Some(fit_id) {
                return Err(AttritionError::StalePreprocessor {
                    stage: stage.name().to_string(),
                });
            }
        }

        let mut current = frame.select(&self.numerical, &self.categorical)?;
        for stage in &self.stages {
            current = stage.transform(current)?;
        }

        let columns = current.numeric_columns();
        let names: Vec<&String> = columns.iter().map(|(n, _)| n).collect();
        if names.len() != self.feature_names.len() || names.iter().zip(&self.feature_names).any(|(a, b)| *a != b) {
            return Err(AttritionError::ShapeError {
                expected: format!("{} output columns", self.feature_names.len()),
                actual: format!("{} output columns", names.len()),
            });
        }

        let n_rows = current.n_rows();
        let mut matrix = Array2::zeros((n_rows, columns.len()));
        for (j, (name, values)) in columns.iter().enumerate() {
            for (i, value) in values.iter().enumerate() {
                matrix[[i, j]] = value.ok_or_else(|| {
                    AttritionError::PreprocessingError(format!("null value left in column '{}'", name))
                })?;
            }
        }
        Ok(matrix)
    }

    /// Fit on `frame` and return its transformed matrix
    pub fn fit_transform(&mut self, frame: &FeatureFrame) -> Result<Array2<f64>> {
        self.fit(frame)?;
        self.transform(frame)
    }

    /// Fill values applied per column, with training null counts
    pub fn imputations(&self) -> Vec<ImputationRecord> {
        self.stages.iter().flat_map(Stage::imputations).collect()
    }

    /// Fitted numeric medians by column
    pub fn medians(&self) -> BTreeMap<String, f64> {
        self.stages
            .iter()
            .flat_map(|s| match s {
                Stage::MedianImputer(m) => m.medians().to_vec(),
                _ => Vec::new(),
            })
            .collect()
    }

    /// Fitted category vocabularies by column
    pub fn vocabularies(&self) -> BTreeMap<String, Vec<String>> {
        self.stages
            .iter()
            .flat_map(|s| match s {
                Stage::OneHotEncoder(e) => e.vocabularies().to_vec(),
                _ => Vec::new(),
            })
            .collect()
    }

    /// Records of columns where training nulls were actually filled
    pub fn applied_imputations(&self) -> Vec<ImputationRecord> {
        self.imputations().into_iter().filter(|r| r.null_count > 0).collect()
    }
}
