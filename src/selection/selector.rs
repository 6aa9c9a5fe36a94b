//! Cross-validated grid search over one model family

use super::config::SearchConfig;
use super::cross_validation::{stratified_train_test_split, CVSplit, StratifiedKFold};
use crate::artifact::{PipelineMetadata, TrainedPipeline};
use crate::error::{AttritionError, Result};
use crate::features::{FeatureFrame, FeatureSet};
use crate::preprocessing::Preprocessor;
use crate::training::{describe, Classifier, Params};
use chrono::Utc;
use ndarray::{Array1, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fold scores of one configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub params: Params,
    /// `-inf` for folds whose fit failed
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
    /// False when any fold failed to fit
    pub eligible: bool,
}

/// Outcome of the cross-validated search on the training rows
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub candidates: Vec<CandidateResult>,
    pub best_index: usize,
}

impl SearchOutcome {
    pub fn best(&self) -> &CandidateResult {
        &self.candidates[self.best_index]
    }
}

/// Everything the search produced: the refit winner and the untouched test rows
#[derive(Debug, Clone)]
pub struct Selection {
    pub pipeline: TrainedPipeline,
    pub outcome: SearchOutcome,
    pub split: CVSplit,
    pub test_frame: FeatureFrame,
    pub test_labels: Array1<f64>,
}

/// One unit of search work: a configuration scored on one fold
struct WorkItem<'a> {
    config_idx: usize,
    params: &'a Params,
    fold: &'a CVSplit,
}

#[derive(Debug, Clone)]
pub struct ModelSelector {
    config: SearchConfig,
}

impl ModelSelector {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Split, search, pick the winner and refit it on the whole training partition
    pub fn select(&self, features: &FeatureSet, template: &Preprocessor) -> Result<Selection> {
        self.config.validate()?;
        let split = stratified_train_test_split(&features.labels, self.config.test_size, self.config.random_state)?;

        let train_frame = features.frame.take(&split.train_indices);
        let train_labels = features.labels.select(Axis(0), &split.train_indices);
        let test_frame = features.frame.take(&split.test_indices);
        let test_labels = features.labels.select(Axis(0), &split.test_indices);
        info!(
            train = split.train_indices.len(),
            test = split.test_indices.len(),
            seed = self.config.random_state,
            "Stratified train/test split"
        );

        let outcome = self.search(&train_frame, &train_labels, template)?;
        let best = outcome.best();

        let start = Instant::now();
        let mut preprocessor = template.template();
        let x_train = preprocessor.fit_transform(&train_frame)?;
        let mut model = self.config.family.build(&best.params, self.config.random_state)?;
        model.fit(&x_train, &train_labels)?;
        info!(
            params = %describe(&best.params),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Refit winner on full training partition"
        );

        let metadata = PipelineMetadata {
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            family: self.config.family,
            best_params: best.params.clone(),
            scoring: self.config.scoring,
            cv_score: best.mean_score,
            cv_std: best.std_score,
            n_train: split.train_indices.len(),
            random_state: self.config.random_state,
            frequency_levels: features.frequency_levels.clone(),
        };
        let pipeline = TrainedPipeline::new(preprocessor, model, metadata);

        Ok(Selection {
            pipeline,
            outcome,
            split,
            test_frame,
            test_labels,
        })
    }

    /// Cross-validated search on training rows only
    pub fn search(&self, frame: &FeatureFrame, labels: &Array1<f64>, template: &Preprocessor) -> Result<SearchOutcome> {
        self.config.validate()?;
        if frame.n_rows() != labels.len() {
            return Err(AttritionError::ShapeError {
                expected: format!("{} labels", frame.n_rows()),
                actual: format!("{} labels", labels.len()),
            });
        }
        let positives = labels.iter().filter(|&&y| y >= 0.5).count();
        if positives == 0 || positives == labels.len() {
            return Err(AttritionError::TrainingError(
                "training labels contain a single class".to_string(),
            ));
        }

        let configs = self.config.effective_grid().configurations();
        let folds = StratifiedKFold::new(self.config.cv_folds)
            .with_shuffle(self.config.shuffle_folds, self.config.random_state)
            .split(labels)?;

        let items: Vec<WorkItem> = configs
            .iter()
            .enumerate()
            .flat_map(|(config_idx, params)| {
                folds.iter().map(move |fold| WorkItem { config_idx, params, fold })
            })
            .collect();

        info!(
            family = %self.config.family,
            configurations = configs.len(),
            folds = folds.len(),
            fits = items.len(),
            scoring = %self.config.scoring,
            "Starting model search"
        );
        let start = Instant::now();

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n_jobs) = self.config.n_jobs {
            builder = builder.num_threads(n_jobs);
        }
        let pool = builder
            .build()
            .map_err(|e| AttritionError::TrainingError(format!("Thread pool error: {}", e)))?;

        let results: Vec<Result<f64>> = pool.install(|| {
            items
                .par_iter()
                .map(|item| self.score_item(item, frame, labels, template))
                .collect()
        });

        let mut fold_scores: Vec<Vec<f64>> = vec![Vec::with_capacity(folds.len()); configs.len()];
        let mut failed = vec![false; configs.len()];
        for (item, result) in items.iter().zip(results) {
            match result {
                Ok(score) => fold_scores[item.config_idx].push(score),
                Err(e) if e.is_fit_failure() => {
                    warn!(
                        params = %describe(item.params),
                        fold = item.fold.fold_idx,
                        error = %e,
                        "Fit failed, configuration ineligible"
                    );
                    fold_scores[item.config_idx].push(f64::NEG_INFINITY);
                    failed[item.config_idx] = true;
                }
                Err(e) => return Err(e),
            }
        }

        let candidates: Vec<CandidateResult> = configs
            .into_iter()
            .zip(fold_scores)
            .zip(failed)
            .map(|((params, scores), failed)| {
                let (mean_score, std_score) = if failed {
                    (f64::NEG_INFINITY, f64::NAN)
                } else {
                    mean_std(&scores)
                };
                debug!(params = %describe(&params), mean = mean_score, std = std_score, "Candidate scored");
                CandidateResult {
                    params,
                    fold_scores: scores,
                    mean_score,
                    std_score,
                    eligible: !failed,
                }
            })
            .collect();

        // Strictly greater keeps the earliest configuration on ties
        let mut best_index: Option<usize> = None;
        for (i, c) in candidates.iter().enumerate() {
            if !c.eligible {
                continue;
            }
            match best_index {
                Some(b) if c.mean_score <= candidates[b].mean_score => {}
                _ => best_index = Some(i),
            }
        }
        let best_index = best_index.ok_or_else(|| {
            AttritionError::TrainingError(format!(
                "no eligible configuration: all {} fits failed",
                candidates.len()
            ))
        })?;

        let best = &candidates[best_index];
        info!(
            params = %describe(&best.params),
            score = best.mean_score,
            std = best.std_score,
            eligible = candidates.iter().filter(|c| c.eligible).count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model search complete"
        );

        Ok(SearchOutcome {
            candidates,
            best_index,
        })
    }

    fn score_item(&self, item: &WorkItem, frame: &FeatureFrame, labels: &Array1<f64>, template: &Preprocessor) -> Result<f64> {
        let train = frame.take(&item.fold.train_indices);
        let valid = frame.take(&item.fold.test_indices);
        let y_train = labels.select(Axis(0), &item.fold.train_indices);
        let y_valid = labels.select(Axis(0), &item.fold.test_indices);

        let mut preprocessor = template.template();
        let x_train = preprocessor.fit_transform(&train)?;
        let x_valid = preprocessor.transform(&valid)?;

        let mut model = self.config.family.build(item.params, self.config.random_state)?;
        model.fit(&x_train, &y_train)?;
        let proba = model.predict_proba(&x_valid)?;
        if proba.iter().any(|p| !p.is_finite()) {
            return Err(AttritionError::FitFailure("non-finite probabilities".to_string()));
        }
        Ok(self.config.scoring.score(&y_valid, &proba))
    }
}

/// Mean and population standard deviation
fn mean_std(scores: &[f64]) -> (f64, f64) {
    if scores.is_empty() {
        return (f64::NEG_INFINITY, f64::NAN);
    }
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let var = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::HyperparameterGrid;
    use crate::training::ModelFamily;

    fn features(n: usize) -> FeatureSet {
        let ids = (0..n).map(|i| format!("e{}", i)).collect();
        let mut frame = FeatureFrame::new(ids);
        let salary: Vec<Option<f64>> = (0..n).map(|i| Some((i % 10) as f64)).collect();
        let overtime: Vec<Option<String>> = (0..n)
            .map(|i| Some(if i % 10 >= 5 { "Often" } else { "Rarely" }.to_string()))
            .collect();
        frame.push_numeric("salary", salary).unwrap();
        frame.push_categorical("overtime", overtime).unwrap();
        let labels = (0..n).map(|i| if i % 10 >= 5 { 1.0 } else { 0.0 }).collect();
        FeatureSet {
            frame,
            labels,
            numerical: vec!["salary".to_string()],
            categorical: vec!["overtime".to_string()],
            frequency_levels: Vec::new(),
        }
    }

    fn template() -> Preprocessor {
        Preprocessor::new(vec!["salary".to_string()], vec!["overtime".to_string()])
    }

    #[test]
    fn test_mean_std() {
        let (m, s) = mean_std(&[1.0, 3.0]);
        assert_eq!(m, 2.0);
        assert_eq!(s, 1.0);
    }

    #[test]
    fn test_tie_keeps_first_configuration() {
        // Perfectly separable data: every configuration scores 1.0
        let grid = HyperparameterGrid::new()
            .with_knob("n_estimators", vec![5usize.into(), 10usize.into()])
            .unwrap();
        let selector = ModelSelector::new(SearchConfig::default().with_grid(grid).with_n_jobs(2));
        let set = features(60);
        let outcome = selector.search(&set.frame, &set.labels, &template()).unwrap();
        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.best_index, 0);
        assert_eq!(outcome.best().mean_score, 1.0);
    }

    #[test]
    fn test_select_keeps_test_rows_out() {
        let grid = HyperparameterGrid::new()
            .with_knob("n_estimators", vec![5usize.into()])
            .unwrap();
        let selector = ModelSelector::new(SearchConfig::default().with_grid(grid));
        let selection = selector.select(&features(40), &template()).unwrap();
        assert_eq!(selection.split.test_indices.len(), 10);
        assert_eq!(selection.test_frame.n_rows(), 10);
        assert_eq!(selection.pipeline.metadata().n_train, 30);
        assert_eq!(selection.pipeline.metadata().family, ModelFamily::GradientBoosting);
    }

    #[test]
    fn test_single_class_rejected() {
        let mut set = features(30);
        set.labels.fill(0.0);
        let selector = ModelSelector::new(SearchConfig::default());
        assert!(matches!(
            selector.search(&set.frame, &set.labels, &template()),
            Err(AttritionError::TrainingError(_))
        ));
    }
}
