//! Multi-table merge into one per-employee dataset

mod config;
mod merge;

pub use config::MergeConfig;
pub use merge::{DataMerger, MergeWarning, MergedDataset};
