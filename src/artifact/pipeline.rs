//! The fitted preprocessor and model as one unit

use crate::error::Result;
use crate::evaluation::Scoring;
use crate::features::{FeatureFrame, FeatureVector};
use crate::preprocessing::Preprocessor;
use crate::training::{Classifier, Model, ModelFamily, Params};
use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::warn;

/// Provenance of a trained pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    pub crate_version: String,
    pub created_at: DateTime<Utc>,
    pub family: ModelFamily,
    pub best_params: Params,
    pub scoring: Scoring,
    /// Mean cross-validated score of the winning configuration
    pub cv_score: f64,
    pub cv_std: f64,
    pub n_train: usize,
    pub random_state: u64,
    /// Frequency scale the engineered lateness codes were built with
    pub frequency_levels: Vec<String>,
}

/// A fitted `Preprocessor` and a fitted `Model`, inseparable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedPipeline {
    preprocessor: Preprocessor,
    model: Model,
    metadata: PipelineMetadata,
}

impl TrainedPipeline {
    pub fn new(preprocessor: Preprocessor, model: Model, metadata: PipelineMetadata) -> Self {
        Self {
            preprocessor,
            model,
            metadata,
        }
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn metadata(&self) -> &PipelineMetadata {
        &self.metadata
    }

    pub fn numerical(&self) -> &[String] {
        self.preprocessor.numerical()
    }

    pub fn categorical(&self) -> &[String] {
        self.preprocessor.categorical()
    }

    /// Departure probability per row
    pub fn predict_proba(&self, frame: &FeatureFrame) -> Result<Array1<f64>> {
        let frame = self.align(frame)?;
        let x = self.preprocessor.transform(&frame)?;
        self.model.predict_proba(&x)
    }

    /// Hard labels (1 = departed)
    pub fn predict(&self, frame: &FeatureFrame) -> Result<Array1<f64>> {
        let frame = self.align(frame)?;
        let x = self.preprocessor.transform(&frame)?;
        self.model.predict(&x)
    }

    /// Departure probability of a single employee
    pub fn predict_one(&self, features: &FeatureVector) -> Result<f64> {
        let frame = FeatureFrame::from_vectors(
            std::slice::from_ref(features),
            self.preprocessor.numerical(),
            self.preprocessor.categorical(),
        )?;
        let x = self.preprocessor.transform(&frame)?;
        let proba = self.model.predict_proba(&x)?;
        Ok(proba[0])
    }

    /// Model importances paired with the preprocessor's output column names,
    /// highest first
    pub fn feature_importances(&self) -> Option<Vec<(String, f64)>> {
        let importances = self.model.feature_importances()?;
        let mut named: Vec<(String, f64)> = self
            .preprocessor
            .feature_names()
            .iter()
            .cloned()
            .zip(importances.iter().copied())
            .collect();
        named.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Some(named)
    }

    /// Declared features absent from `frame` are added as all-null columns and
    /// left to the imputers.
    fn align<'a>(&self, frame: &'a FeatureFrame) -> Result<Cow<'a, FeatureFrame>> {
        let missing_num: Vec<&String> = self
            .numerical()
            .iter()
            .filter(|c| frame.numeric(c).is_none())
            .collect();
        let missing_cat: Vec<&String> = self
            .categorical()
            .iter()
            .filter(|c| frame.categorical(c).is_none())
            .collect();
        if missing_num.is_empty() && missing_cat.is_empty() {
            return Ok(Cow::Borrowed(frame));
        }

        warn!(
            numerical = ?missing_num,
            categorical = ?missing_cat,
            "Input lacks declared features, imputing them"
        );
        let n = frame.n_rows();
        let mut aligned = frame.clone();
        for name in missing_num {
            aligned.push_numeric(name.clone(), vec![None; n])?;
        }
        for name in missing_cat {
            aligned.push_categorical(name.clone(), vec![None; n])?;
        }
        Ok(Cow::Owned(aligned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn fitted() -> TrainedPipeline {
        let ids = (0..8).map(|i| i.to_string()).collect();
        let mut frame = FeatureFrame::new(ids);
        frame
            .push_numeric("age", (0..8).map(|i| Some(20.0 + i as f64)).collect())
            .unwrap();
        frame
            .push_categorical(
                "dept",
                (0..8).map(|i| Some(if i < 4 { "Sales" } else { "IT" }.to_string())).collect(),
            )
            .unwrap();
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];

        let mut preprocessor = Preprocessor::new(vec!["age".to_string()], vec!["dept".to_string()]);
        let x = preprocessor.fit_transform(&frame).unwrap();
        let mut model = ModelFamily::LogisticRegression.build(&Params::new(), 42).unwrap();
        model.fit(&x, &y).unwrap();

        let metadata = PipelineMetadata {
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            family: ModelFamily::LogisticRegression,
            best_params: Params::new(),
            scoring: Scoring::Accuracy,
            cv_score: 1.0,
            cv_std: 0.0,
            n_train: 8,
            random_state: 42,
            frequency_levels: Vec::new(),
        };
        TrainedPipeline::new(preprocessor, model, metadata)
    }

    #[test]
    fn test_predict_one_matches_batch() {
        let pipeline = fitted();
        let vector = FeatureVector::new()
            .with_numeric("age", 26.0)
            .with_categorical("dept", Some("IT"));
        let one = pipeline.predict_one(&vector).unwrap();

        let mut frame = FeatureFrame::new(vec!["x".to_string()]);
        frame.push_numeric("age", vec![Some(26.0)]).unwrap();
        frame.push_categorical("dept", vec![Some("IT".to_string())]).unwrap();
        let batch = pipeline.predict_proba(&frame).unwrap();

        assert!((one - batch[0]).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&one));
    }

    #[test]
    fn test_non_finite_input_is_imputed() {
        let pipeline = fitted();
        let nan = FeatureVector::new()
            .with_numeric("age", f64::NAN)
            .with_categorical("dept", Some("IT"));
        let null = FeatureVector::new()
            .with_numeric("age", None::<f64>)
            .with_categorical("dept", Some("IT"));
        let p = pipeline.predict_one(&nan).unwrap();
        assert!((0.0..=1.0).contains(&p));
        assert_eq!(p, pipeline.predict_one(&null).unwrap());
    }

    #[test]
    fn test_missing_declared_column_is_imputed() {
        let pipeline = fitted();
        let mut frame = FeatureFrame::new(vec!["x".to_string()]);
        frame.push_numeric("age", vec![Some(30.0)]).unwrap();
        let proba = pipeline.predict_proba(&frame).unwrap();
        assert_eq!(proba.len(), 1);
    }

    #[test]
    fn test_named_importances() {
        let names: Vec<String> = fitted()
            .feature_importances()
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"dept_IT".to_string()));
    }
}
