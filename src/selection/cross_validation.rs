//! Stratified splitting: one train/test split and K folds within the training rows

use crate::error::{AttritionError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// A single train/test split (indices into the split's input)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

fn class_indices(y: &Array1<f64>) -> BTreeMap<i64, Vec<usize>> {
    let mut classes: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &val) in y.iter().enumerate() {
        classes.entry(val.round() as i64).or_default().push(idx);
    }
    classes
}

/// Stratified K-fold splitter
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
    shuffle: bool,
    random_state: u64,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: 42,
        }
    }

    /// Shuffle within each class before assigning folds
    pub fn with_shuffle(mut self, shuffle: bool, random_state: u64) -> Self {
        self.shuffle = shuffle;
        self.random_state = random_state;
        self
    }

    /// Fold assignment keeping each class's share roughly equal per fold
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        let n_splits = self.n_splits;
        if n_splits < 2 {
            return Err(AttritionError::ValidationError("n_splits must be at least 2".to_string()));
        }
        if y.len() < n_splits {
            return Err(AttritionError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                y.len(),
                n_splits
            )));
        }

        let mut classes = class_indices(y);
        if let Some(smallest) = classes.values().map(Vec::len).min() {
            if smallest < n_splits {
                warn!(smallest, n_splits, "Least populated class has fewer members than folds");
            }
        }

        if self.shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
            for indices in classes.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        // Deal class members round-robin; the offset carries across classes
        // so fold sizes differ by at most one.
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        let mut offset = 0;
        for indices in classes.values() {
            for (i, &idx) in indices.iter().enumerate() {
                folds[(offset + i) % n_splits].push(idx);
            }
            offset += indices.len();
        }

        let mut splits = Vec::with_capacity(n_splits);
        for fold_idx in 0..n_splits {
            let mut test_indices = folds[fold_idx].clone();
            test_indices.sort_unstable();
            let mut train_indices: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != fold_idx)
                .flat_map(|(_, f)| f.iter().copied())
                .collect();
            train_indices.sort_unstable();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
        }

        Ok(splits)
    }
}

/// Stratified, seeded train/test split. `test_size` is the test fraction.
pub fn stratified_train_test_split(y: &Array1<f64>, test_size: f64, random_state: u64) -> Result<CVSplit> {
    let n = y.len();
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(AttritionError::ValidationError(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    let n_test = (n as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(AttritionError::ValidationError(format!(
            "cannot split {} rows with test_size {}",
            n, test_size
        )));
    }

    let mut classes = class_indices(y);
    let mut rng = ChaCha8Rng::seed_from_u64(random_state);
    for indices in classes.values_mut() {
        indices.shuffle(&mut rng);
    }

    // Proportional allocation; leftover test slots go to the largest remainders
    let mut allocation: Vec<(i64, usize, f64)> = classes
        .iter()
        .map(|(&class, idx)| {
            let exact = idx.len() as f64 * n_test as f64 / n as f64;
            (class, exact.floor() as usize, exact - exact.floor())
        })
        .collect();
    let mut leftover = n_test - allocation.iter().map(|a| a.1).sum::<usize>();
    let mut by_remainder: Vec<usize> = (0..allocation.len()).collect();
    by_remainder.sort_by(|&a, &b| allocation[b].2.total_cmp(&allocation[a].2).then(a.cmp(&b)));
    for i in by_remainder {
        if leftover == 0 {
            break;
        }
        let class_size = classes[&allocation[i].0].len();
        if allocation[i].1 < class_size {
            allocation[i].1 += 1;
            leftover -= 1;
        }
    }

    let mut test_indices = Vec::with_capacity(n_test);
    let mut train_indices = Vec::with_capacity(n - n_test);
    for (class, take, _) in &allocation {
        let indices = &classes[class];
        test_indices.extend_from_slice(&indices[..*take]);
        train_indices.extend_from_slice(&indices[*take..]);
    }
    test_indices.sort_unstable();
    train_indices.sort_unstable();

    Ok(CVSplit {
        train_indices,
        test_indices,
        fold_idx: 0,
    })
}
