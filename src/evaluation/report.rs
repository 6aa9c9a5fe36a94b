//! Held-out classification report

use super::metrics::{ratio, roc_auc, threshold, ConfusionCounts};
use crate::error::{AttritionError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Precision, recall and F1 of one class (or an average over classes)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Evaluation of a fitted pipeline on the held-out partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    /// Class 0 (still employed) then class 1 (departed)
    pub classes: Vec<ClassMetrics>,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    /// Rows are true classes, columns predicted classes
    pub confusion_matrix: [[usize; 2]; 2],
    /// `None` when the partition holds a single class
    pub roc_auc: Option<f64>,
    pub n_samples: usize,
}

impl EvaluationReport {
    /// Build the report from 0/1 labels and positive-class probabilities
    pub fn from_predictions(y_true: &Array1<f64>, proba: &Array1<f64>) -> Result<Self> {
        if y_true.len() != proba.len() {
            return Err(AttritionError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", proba.len()),
            });
        }
        if y_true.is_empty() {
            return Err(AttritionError::ValidationError("cannot evaluate zero rows".to_string()));
        }

        let y_pred = threshold(proba);
        let positive = ConfusionCounts::from_labels(y_true, &y_pred);
        let negative = positive.flipped();

        let class = |label: &str, c: &ConfusionCounts| ClassMetrics {
            label: label.to_string(),
            precision: c.precision(),
            recall: c.recall(),
            f1_score: c.f1(),
            support: c.tp + c.fn_,
        };
        let classes = vec![class("0", &negative), class("1", &positive)];

        let n = y_true.len();
        let macro_avg = ClassMetrics {
            label: "macro avg".to_string(),
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / 2.0,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / 2.0,
            f1_score: classes.iter().map(|c| c.f1_score).sum::<f64>() / 2.0,
            support: n,
        };
        let weight = |c: &ClassMetrics| ratio(c.support, n);
        let weighted_avg = ClassMetrics {
            label: "weighted avg".to_string(),
            precision: classes.iter().map(|c| c.precision * weight(c)).sum(),
            recall: classes.iter().map(|c| c.recall * weight(c)).sum(),
            f1_score: classes.iter().map(|c| c.f1_score * weight(c)).sum(),
            support: n,
        };

        Ok(Self {
            accuracy: positive.accuracy(),
            classes,
            macro_avg,
            weighted_avg,
            confusion_matrix: [[positive.tn, positive.fp], [positive.fn_, positive.tp]],
            roc_auc: roc_auc(y_true, proba),
            n_samples: n,
        })
    }

    pub fn positive_class(&self) -> &ClassMetrics {
        &self.classes[1]
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label, c.precision, c.recall, c.f1_score, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:>12} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, self.n_samples)?;
        for c in [&self.macro_avg, &self.weighted_avg] {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label, c.precision, c.recall, c.f1_score, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "confusion matrix (rows = true, cols = predicted)")?;
        writeln!(f, "{:>12} {:>9} {:>9}", "", "0", "1")?;
        for (label, row) in ["0", "1"].iter().zip(&self.confusion_matrix) {
            writeln!(f, "{:>12} {:>9} {:>9}", label, row[0], row[1])?;
        }
        match self.roc_auc {
            Some(auc) => write!(f, "\nroc auc: {:.4}", auc),
            None => write!(f, "\nroc auc: undefined (single class)"),
        }
    }
}
