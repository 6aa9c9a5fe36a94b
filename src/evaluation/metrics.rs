//! Binary classification metrics

use crate::error::AttritionError;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Metric used to rank configurations during the search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    #[default]
    Accuracy,
    F1,
    Precision,
    Recall,
    RocAuc,
}

impl Scoring {
    /// Score positive-class probabilities against 0/1 labels
    pub fn score(&self, y_true: &Array1<f64>, proba: &Array1<f64>) -> f64 {
        let y_pred = threshold(proba);
        let counts = ConfusionCounts::from_labels(y_true, &y_pred);
        match self {
            Scoring::Accuracy => counts.accuracy(),
            Scoring::F1 => counts.f1(),
            Scoring::Precision => counts.precision(),
            Scoring::Recall => counts.recall(),
            // Undefined with a single class present; score as chance
            Scoring::RocAuc => roc_auc(y_true, proba).unwrap_or(0.5),
        }
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scoring::Accuracy => "accuracy",
            Scoring::F1 => "f1",
            Scoring::Precision => "precision",
            Scoring::Recall => "recall",
            Scoring::RocAuc => "roc_auc",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Scoring {
    type Err = AttritionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "accuracy" => Ok(Scoring::Accuracy),
            "f1" | "f1_score" => Ok(Scoring::F1),
            "precision" => Ok(Scoring::Precision),
            "recall" => Ok(Scoring::Recall),
            "roc_auc" | "auc" => Ok(Scoring::RocAuc),
            other => Err(AttritionError::ConfigError(format!("unknown scoring metric '{}'", other))),
        }
    }
}

/// Hard labels from probabilities at the 0.5 threshold
pub fn threshold(proba: &Array1<f64>) -> Array1<f64> {
    proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 })
}

/// Confusion counts with class 1 as the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl ConfusionCounts {
    pub fn from_labels(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut c = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t >= 0.5, p >= 0.5) {
                (true, true) => c.tp += 1,
                (false, true) => c.fp += 1,
                (false, false) => c.tn += 1,
                (true, false) => c.fn_ += 1,
            }
        }
        c
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        f1(self.precision(), self.recall())
    }

    /// Same counts with the classes swapped
    pub fn flipped(&self) -> Self {
        Self {
            tp: self.tn,
            fp: self.fn_,
            tn: self.tp,
            fn_: self.fp,
        }
    }
}

pub(crate) fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

pub(crate) fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

/// Area under the ROC curve via the rank-sum statistic, ties averaged.
/// `None` when only one class is present.
pub fn roc_auc(y_true: &Array1<f64>, scores: &Array1<f64>) -> Option<f64> {
    let n_pos = y_true.iter().filter(|&&y| y >= 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // 1-based ranks i+1..=j+1 share their average
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = avg;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(y, _)| **y >= 0.5)
        .map(|(_, r)| r)
        .sum();
    let u = pos_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Some(u / (n_pos * n_neg) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_confusion_counts() {
        let y = array![1.0, 1.0, 0.0, 0.0, 1.0];
        let p = array![1.0, 0.0, 0.0, 1.0, 1.0];
        let c = ConfusionCounts::from_labels(&y, &p);
        assert_eq!(c, ConfusionCounts { tp: 2, fp: 1, tn: 1, fn_: 1 });
        assert!((c.accuracy() - 0.6).abs() < 1e-12);
        assert!((c.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((c.recall() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        assert_eq!(roc_auc(&y, &array![0.1, 0.4, 0.35, 0.8]), Some(0.75));
        assert_eq!(roc_auc(&y, &array![0.5, 0.5, 0.5, 0.5]), Some(0.5));
        assert_eq!(roc_auc(&array![1.0, 1.0], &array![0.2, 0.9]), None);
    }

    #[test]
    fn test_scoring_parse() {
        assert_eq!("ROC_AUC".parse::<Scoring>().unwrap(), Scoring::RocAuc);
        assert!("logloss".parse::<Scoring>().is_err());
        assert_eq!(Scoring::default().to_string(), "accuracy");
    }

    #[test]
    fn test_scoring_thresholds_probabilities() {
        let y = array![0.0, 1.0, 1.0];
        let proba = array![0.2, 0.7, 0.4];
        assert!((Scoring::Accuracy.score(&y, &proba) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(Scoring::Precision.score(&y, &proba), 1.0);
        assert_eq!(Scoring::Recall.score(&y, &proba), 0.5);
    }
}
