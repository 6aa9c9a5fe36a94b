//! Search configuration

use super::grid::HyperparameterGrid;
use crate::error::{AttritionError, Result};
use crate::evaluation::Scoring;
use crate::training::ModelFamily;
use serde::{Deserialize, Serialize};

/// How the model search splits, enumerates and scores
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub family: ModelFamily,
    /// Search space; `None` uses the family's default grid
    pub grid: Option<HyperparameterGrid>,
    pub cv_folds: usize,
    /// Shuffle within classes before dealing folds
    pub shuffle_folds: bool,
    /// Fraction of rows held out for the final evaluation
    pub test_size: f64,
    /// Seed for the split, the folds and the models
    pub random_state: u64,
    pub scoring: Scoring,
    /// Worker threads for the search; `None` uses every core
    pub n_jobs: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            family: ModelFamily::GradientBoosting,
            grid: None,
            cv_folds: 3,
            shuffle_folds: false,
            test_size: 0.25,
            random_state: 42,
            scoring: Scoring::Accuracy,
            n_jobs: None,
        }
    }
}

impl SearchConfig {
    pub fn with_family(mut self, family: ModelFamily) -> Self {
        self.family = family;
        self
    }

    pub fn with_grid(mut self, grid: HyperparameterGrid) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_shuffle_folds(mut self, shuffle: bool) -> Self {
        self.shuffle_folds = shuffle;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    /// The grid actually searched
    pub fn effective_grid(&self) -> HyperparameterGrid {
        match &self.grid {
            Some(grid) => grid.clone(),
            // Default grids only use non-empty candidate lists
            None => HyperparameterGrid::from_map(self.family.default_grid()).unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cv_folds < 2 {
            return Err(AttritionError::ConfigError(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(AttritionError::ConfigError(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.n_jobs == Some(0) {
            return Err(AttritionError::ConfigError("n_jobs must be at least 1".to_string()));
        }
        Ok(())
    }
}
