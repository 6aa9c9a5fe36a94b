//! Model selection
//!
//! Stratified train/test partitioning, stratified K-fold cross-validation
//! and an exhaustive grid search over one model family. Grid enumeration
//! and fold generation are pure steps; their product is an explicit work
//! list scored in parallel.

mod config;
mod cross_validation;
mod grid;
mod selector;

pub use config::SearchConfig;
pub use cross_validation::{stratified_train_test_split, CVSplit, StratifiedKFold};
pub use grid::HyperparameterGrid;
pub use selector::{CandidateResult, ModelSelector, SearchOutcome, Selection};
