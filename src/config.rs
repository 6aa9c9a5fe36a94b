//! Training run configuration
//!
//! Defaults come from the environment with built-in fallbacks:
//!
//! | Variable               | Default                          |
//! |------------------------|----------------------------------|
//! | `ATTRITION_DATA_DIR`   | `./data`                         |
//! | `ATTRITION_MODEL_PATH` | `models/attrition_pipeline.bin`  |
//! | `ATTRITION_CV_FOLDS`   | `3`                              |
//! | `ATTRITION_SEED`       | `42`                             |
//! | `ATTRITION_N_JOBS`     | all cores                        |
//! | `ATTRITION_SCORING`    | `accuracy`                       |

use crate::data::MergeConfig;
use crate::error::{AttritionError, Result};
use crate::features::FeatureConfig;
use crate::selection::SearchConfig;
use crate::store::CsvTableStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ARTIFACT_PATH: &str = "models/attrition_pipeline.bin";

/// Everything a training run needs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the exported tables
    pub data_dir: PathBuf,
    pub artifact_path: PathBuf,
    pub merge: MergeConfig,
    pub features: FeatureConfig,
    pub search: SearchConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let mut search = SearchConfig::default();
        if let Some(folds) = env_parse("ATTRITION_CV_FOLDS") {
            search.cv_folds = folds;
        }
        if let Some(seed) = env_parse("ATTRITION_SEED") {
            search.random_state = seed;
        }
        if let Some(n_jobs) = env_parse("ATTRITION_N_JOBS") {
            search.n_jobs = Some(n_jobs);
        }
        if let Some(scoring) = env_parse("ATTRITION_SCORING") {
            search.scoring = scoring;
        }

        Self {
            data_dir: std::env::var("ATTRITION_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            artifact_path: std::env::var("ATTRITION_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_ARTIFACT_PATH)),
            merge: MergeConfig::default(),
            features: FeatureConfig::default(),
            search,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl PipelineConfig {
    /// Read a JSON config file; absent fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AttritionError::ConfigError(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            AttritionError::ConfigError(format!("Failed to parse config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_artifact_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_path = path.into();
        self
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Directory store over `data_dir`, normalizing the merge's id column
    pub fn table_store(&self) -> CsvTableStore {
        CsvTableStore::new(&self.data_dir).with_id_column(self.merge.id_column.clone())
    }

    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        if self.features.numerical.is_empty() && self.features.categorical.is_empty() {
            return Err(AttritionError::ConfigError("no features declared".to_string()));
        }
        if self.merge.anchor_table.trim().is_empty() {
            return Err(AttritionError::ConfigError("anchor table name is empty".to_string()));
        }
        if self.artifact_path.as_os_str().is_empty() {
            return Err(AttritionError::ConfigError("artifact path is empty".to_string()));
        }
        Ok(())
    }
}
