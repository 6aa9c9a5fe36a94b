//! XGBoost-style gradient boosted trees for binary classification
//!
//! - Logistic loss with second-order approximation (gradient and hessian)
//! - Regularized leaf weights: w* = -G / (H + lambda)
//! - Gain-based split scoring: Gain = 0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - (GL+GR)²/(HL+HR+λ)] - γ
//! - Histogram split finding over quantile bins computed once per fit
//! - Row subsampling and per-tree column subsampling

use super::models::Classifier;
use super::params::{check_known, f64_param, usize_param, Params};
use crate::error::{AttritionError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// Minimum loss reduction to make a split
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    /// Maximum number of histogram bins per feature
    pub max_bins: usize,
    pub random_state: Option<u64>,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            max_bins: 256,
            random_state: Some(42),
        }
    }
}

impl BoostingConfig {
    /// Knobs accepted by [`BoostingConfig::from_params`]
    pub const KNOBS: &'static [&'static str] = &[
        "n_estimators",
        "learning_rate",
        "max_depth",
        "min_child_weight",
        "reg_lambda",
        "gamma",
        "subsample",
        "colsample_bytree",
        "max_bins",
    ];

    /// Build a configuration from search parameters, defaults for absent knobs
    pub fn from_params(params: &Params, random_state: Option<u64>) -> Result<Self> {
        check_known(params, Self::KNOBS)?;
        let d = Self::default();
        let fraction = |v: f64| v > 0.0 && v <= 1.0;
        let max_bins = usize_param(params, "max_bins", d.max_bins, 2)?;
        if max_bins > MAX_BINS {
            return Err(AttritionError::InvalidParameter {
                name: "max_bins".to_string(),
                value: max_bins.to_string(),
                reason: format!("expected at most {}", MAX_BINS),
            });
        }
        Ok(Self {
            n_estimators: usize_param(params, "n_estimators", d.n_estimators, 1)?,
            learning_rate: f64_param(params, "learning_rate", d.learning_rate, |v| v > 0.0, "expected a positive number")?,
            max_depth: usize_param(params, "max_depth", d.max_depth, 1)?,
            min_child_weight: f64_param(params, "min_child_weight", d.min_child_weight, |v| v >= 0.0, "expected a non-negative number")?,
            reg_lambda: f64_param(params, "reg_lambda", d.reg_lambda, |v| v >= 0.0, "expected a non-negative number")?,
            gamma: f64_param(params, "gamma", d.gamma, |v| v >= 0.0, "expected a non-negative number")?,
            subsample: f64_param(params, "subsample", d.subsample, fraction, "expected a fraction in (0, 1]")?,
            colsample_bytree: f64_param(params, "colsample_bytree", d.colsample_bytree, fraction, "expected a fraction in (0, 1]")?,
            max_bins,
            random_state,
        })
    }
}

/// A single node of a boosted tree
#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf { weight: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        match self {
            TreeNode::Leaf { weight } => *weight,
            TreeNode::Split { feature, threshold, left, right } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }

    fn count_splits(&self, counts: &mut [f64]) {
        if let TreeNode::Split { feature, left, right, .. } = self {
            if *feature < counts.len() {
                counts[*feature] += 1.0;
            }
            left.count_splits(counts);
            right.count_splits(counts);
        }
    }
}

/// Bin indices are stored as `u16`
const MAX_BINS: usize = u16::MAX as usize + 1;

/// Quantile bins for every feature. A value `v` falls into bin `b` iff
/// `cuts[b - 1] < v <= cuts[b]`; the last cut of each feature is +inf.
struct FeatureBins {
    bins: Array2<u16>,
    cuts: Vec<Vec<f64>>,
}

impl FeatureBins {
    fn build(x: &Array2<f64>, max_bins: usize) -> Self {
        let max_bins = max_bins.min(MAX_BINS);
        let n_features = x.ncols();
        let cuts: Vec<Vec<f64>> = (0..n_features)
            .into_par_iter()
            .map(|f| feature_cuts(x.column(f), max_bins))
            .collect();

        let bins = Array2::from_shape_fn((x.nrows(), n_features), |(r, f)| {
            let v = x[[r, f]];
            cuts[f].partition_point(|&c| c < v) as u16
        });

        Self { bins, cuts }
    }
}

fn feature_cuts(column: ArrayView1<f64>, max_bins: usize) -> Vec<f64> {
    let mut distinct: Vec<f64> = column.iter().copied().collect();
    distinct.sort_by(|a, b| a.total_cmp(b));
    distinct.dedup();

    let m = distinct.len();
    let mut cuts = Vec::with_capacity(m.min(max_bins));
    if m <= max_bins {
        for w in distinct.windows(2) {
            cuts.push((w[0] + w[1]) / 2.0);
        }
    } else {
        for k in 1..max_bins {
            let idx = k * m / max_bins;
            let cut = (distinct[idx - 1] + distinct[idx]) / 2.0;
            if cuts.last().map_or(true, |&last| cut > last) {
                cuts.push(cut);
            }
        }
    }
    cuts.push(f64::INFINITY);
    cuts
}

struct SplitCandidate {
    feature: usize,
    bin: usize,
    gain: f64,
}

struct TreeBuilder<'a> {
    bins: &'a FeatureBins,
    grad: &'a Array1<f64>,
    hess: &'a Array1<f64>,
    config: &'a BoostingConfig,
}

impl<'a> TreeBuilder<'a> {
    fn build(&self, indices: &[usize], features: &[usize], depth: usize) -> TreeNode {
        let g_sum: f64 = indices.iter().map(|&i| self.grad[i]).sum();
        let h_sum: f64 = indices.iter().map(|&i| self.hess[i]).sum();
        let weight = -g_sum / (h_sum + self.config.reg_lambda);

        if depth >= self.config.max_depth || indices.len() < 2 || h_sum < self.config.min_child_weight {
            return TreeNode::Leaf { weight };
        }

        let best = features
            .par_iter()
            .filter_map(|&f| self.best_split_for_feature(indices, f, g_sum, h_sum))
            .max_by(|a, b| {
                a.gain
                    .total_cmp(&b.gain)
                    // Lower feature index wins ties
                    .then_with(|| b.feature.cmp(&a.feature))
            });

        match best {
            Some(split) if split.gain > self.config.gamma && split.gain > 0.0 => {
                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| (self.bins.bins[[i, split.feature]] as usize) <= split.bin);

                if left_idx.is_empty() || right_idx.is_empty() {
                    return TreeNode::Leaf { weight };
                }

                let left = self.build(&left_idx, features, depth + 1);
                let right = self.build(&right_idx, features, depth + 1);

                TreeNode::Split {
                    feature: split.feature,
                    threshold: self.bins.cuts[split.feature][split.bin],
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            _ => TreeNode::Leaf { weight },
        }
    }

    fn best_split_for_feature(
        &self,
        indices: &[usize],
        feature: usize,
        g_total: f64,
        h_total: f64,
    ) -> Option<SplitCandidate> {
        let n_bins = self.bins.cuts[feature].len();
        if n_bins < 2 {
            return None;
        }

        let mut g_hist = vec![0.0f64; n_bins];
        let mut h_hist = vec![0.0f64; n_bins];
        for &i in indices {
            let b = self.bins.bins[[i, feature]] as usize;
            g_hist[b] += self.grad[i];
            h_hist[b] += self.hess[i];
        }

        let lambda = self.config.reg_lambda;
        let parent = (g_total * g_total) / (h_total + lambda);
        let mut g_left = 0.0;
        let mut h_left = 0.0;
        let mut best: Option<SplitCandidate> = None;

        // The last bin is the +inf sentinel and is never a split point
        for b in 0..n_bins - 1 {
            g_left += g_hist[b];
            h_left += h_hist[b];
            let g_right = g_total - g_left;
            let h_right = h_total - h_left;

            if h_left < self.config.min_child_weight || h_right < self.config.min_child_weight {
                continue;
            }
            if h_hist[b] == 0.0 && b > 0 {
                // Empty bin: same partition as the previous candidate
                continue;
            }

            let gain = 0.5
                * ((g_left * g_left) / (h_left + lambda) + (g_right * g_right) / (h_right + lambda) - parent);

            if best.as_ref().map_or(true, |s| gain > s.gain) {
                best = Some(SplitCandidate { feature, bin: b, gain });
            }
        }

        best
    }
}

/// Gradient boosted trees classifier (logistic loss)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostedTreesClassifier {
    config: BoostingConfig,
    trees: Vec<TreeNode>,
    base_score: f64,
    n_features: usize,
    is_fitted: bool,
}

impl BoostedTreesClassifier {
    pub fn new(config: BoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
            n_features: 0,
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &BoostingConfig {
        &self.config
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    fn raw_margin(&self, sample: ArrayView1<f64>) -> f64 {
        self.trees
            .iter()
            .fold(self.base_score, |acc, tree| acc + self.config.learning_rate * tree.predict(sample))
    }
}

impl Classifier for BoostedTreesClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(AttritionError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(AttritionError::FitFailure("empty training set".to_string()));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(AttritionError::FitFailure("non-finite value in feature matrix".to_string()));
        }

        self.n_features = n_features;
        self.trees.clear();

        // Base score in log-odds space
        let p = y.mean().unwrap_or(0.5).clamp(1e-7, 1.0 - 1e-7);
        self.base_score = (p / (1.0 - p)).ln();
        let mut raw_preds = Array1::from_elem(n_samples, self.base_score);

        let bins = FeatureBins::build(x, self.config.max_bins);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        for round in 0..self.config.n_estimators {
            // Logistic loss: grad = p - y, hess = p * (1 - p)
            let probs: Array1<f64> = raw_preds.mapv(Self::sigmoid);
            let grad: Array1<f64> = &probs - y;
            let hess: Array1<f64> = probs.mapv(|p| (p * (1.0 - p)).max(1e-7));

            let row_indices = subsample(&mut rng, n_samples, self.config.subsample);
            let col_indices = subsample(&mut rng, n_features, self.config.colsample_bytree);

            let builder = TreeBuilder {
                bins: &bins,
                grad: &grad,
                hess: &hess,
                config: &self.config,
            };
            let tree = builder.build(&row_indices, &col_indices, 0);

            for (i, row) in x.outer_iter().enumerate() {
                raw_preds[i] += self.config.learning_rate * tree.predict(row);
            }

            if raw_preds.iter().any(|v| !v.is_finite()) {
                self.is_fitted = false;
                return Err(AttritionError::FitFailure(format!(
                    "non-finite margin after boosting round {}",
                    round + 1
                )));
            }

            self.trees.push(tree);
        }

        self.is_fitted = true;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(AttritionError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(AttritionError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let raw: Vec<f64> = x
            .outer_iter()
            .into_par_iter()
            .map(|row| self.raw_margin(row))
            .collect();
        Ok(Array1::from_vec(raw).mapv(Self::sigmoid))
    }

    /// Split-count importances, normalized to sum to one
    fn feature_importances(&self) -> Option<Array1<f64>> {
        if self.n_features == 0 {
            return None;
        }
        let mut counts = vec![0.0f64; self.n_features];
        for tree in &self.trees {
            tree.count_splits(&mut counts);
        }
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            for c in counts.iter_mut() {
                *c /= total;
            }
        }
        Some(Array1::from_vec(counts))
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = (((n as f64) * ratio).ceil() as usize).max(1);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort_unstable();
    indices
}
