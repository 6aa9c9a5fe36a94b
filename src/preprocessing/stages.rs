//! Fit/transform stages of the preprocessor

use crate::error::{AttritionError, Result};
use crate::features::FeatureFrame;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;
use uuid::Uuid;

/// Shared contract of every preprocessing stage.
///
/// `fit` learns statistics from a (training) frame; `transform` applies
/// them to any frame without looking at its contents for statistics.
/// A stage counts as fitted once a preprocessor fit has stamped it.
pub trait Transform {
    fn name(&self) -> &'static str;
    fn fit(&mut self, frame: &FeatureFrame) -> Result<()>;
    fn transform(&self, frame: FeatureFrame) -> Result<FeatureFrame>;
    fn is_fitted(&self) -> bool;
}

/// Which part of the frame a fill value applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Numerical,
    Categorical,
}

/// A missing-value fill learned at fit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationRecord {
    pub column: String,
    pub kind: ColumnKind,
    /// Nulls seen in the training rows
    pub null_count: usize,
    pub fill_value: String,
}

/// Replaces numeric nulls with the training median
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedianImputer {
    medians: Vec<(String, f64)>,
    null_counts: Vec<usize>,
    fit_id: Option<Uuid>,
}

impl MedianImputer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn medians(&self) -> &[(String, f64)] {
        &self.medians
    }
}

/// Median of the non-null values; the mean of the two middle values for
/// an even count.
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.total_cmp(b));
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Some((present[mid - 1] + present[mid]) / 2.0)
    } else {
        Some(present[mid])
    }
}

impl Transform for MedianImputer {
    fn name(&self) -> &'static str {
        "median_imputer"
    }

    fn fit(&mut self, frame: &FeatureFrame) -> Result<()> {
        self.medians.clear();
        self.null_counts.clear();
        for (name, values) in frame.numeric_columns() {
            let fill = median(values).unwrap_or_else(|| {
                warn!(column = %name, "No training values for median, filling with 0");
                0.0
            });
            self.medians.push((name.clone(), fill));
            self.null_counts.push(values.iter().filter(|v| v.is_none()).count());
        }
        Ok(())
    }

    fn transform(&self, mut frame: FeatureFrame) -> Result<FeatureFrame> {
        for (name, fill) in &self.medians {
            let column = frame
                .numeric_columns_mut()
                .iter_mut()
                .find(|(n, _)| n == name)
                .ok_or_else(|| AttritionError::FeatureNotFound(name.clone()))?;
            for value in column.1.iter_mut() {
                if value.is_none() {
                    *value = Some(*fill);
                }
            }
        }
        Ok(frame)
    }

    fn is_fitted(&self) -> bool {
        self.fit_id.is_some()
    }
}

/// Replaces categorical nulls with a constant sentinel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantImputer {
    fill_value: String,
    columns: Vec<String>,
    null_counts: Vec<usize>,
    fit_id: Option<Uuid>,
}

impl ConstantImputer {
    pub fn new(fill_value: impl Into<String>) -> Self {
        Self {
            fill_value: fill_value.into(),
            columns: Vec::new(),
            null_counts: Vec::new(),
            fit_id: None,
        }
    }

    pub fn fill_value(&self) -> &str {
        &self.fill_value
    }
}

impl Transform for ConstantImputer {
    fn name(&self) -> &'static str {
        "constant_imputer"
    }

    fn fit(&mut self, frame: &FeatureFrame) -> Result<()> {
        self.columns = frame.categorical_names();
        self.null_counts = frame
            .categorical_columns()
            .iter()
            .map(|(_, values)| values.iter().filter(|v| v.is_none()).count())
            .collect();
        Ok(())
    }

    fn transform(&self, mut frame: FeatureFrame) -> Result<FeatureFrame> {
        for name in &self.columns {
            let column = frame
                .categorical_columns_mut()
                .iter_mut()
                .find(|(n, _)| n == name)
                .ok_or_else(|| AttritionError::FeatureNotFound(name.clone()))?;
            for value in column.1.iter_mut() {
                if value.is_none() {
                    *value = Some(self.fill_value.clone());
                }
            }
        }
        Ok(frame)
    }

    fn is_fitted(&self) -> bool {
        self.fit_id.is_some()
    }
}

/// Standardizes numeric columns: (x - mean) / std, population std,
/// zero std replaced by 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<(String, f64, f64)>,
    fit_id: Option<Uuid>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// (column, mean, std) per fitted column
    pub fn params(&self) -> &[(String, f64, f64)] {
        &self.params
    }
}

impl Transform for StandardScaler {
    fn name(&self) -> &'static str {
        "standard_scaler"
    }

    fn fit(&mut self, frame: &FeatureFrame) -> Result<()> {
        self.params.clear();
        for (name, values) in frame.numeric_columns() {
            let present: Vec<f64> = values.iter().flatten().copied().collect();
            let (mean, std) = if present.is_empty() {
                (0.0, 1.0)
            } else {
                let n = present.len() as f64;
                let mean = present.iter().sum::<f64>() / n;
                let var = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                (mean, if std == 0.0 || !std.is_finite() { 1.0 } else { std })
            };
            self.params.push((name.clone(), mean, std));
        }
        Ok(())
    }

    fn transform(&self, mut frame: FeatureFrame) -> Result<FeatureFrame> {
        for (name, mean, std) in &self.params {
            let column = frame
                .numeric_columns_mut()
                .iter_mut()
                .find(|(n, _)| n == name)
                .ok_or_else(|| AttritionError::FeatureNotFound(name.clone()))?;
            for value in column.1.iter_mut().flatten() {
                *value = (*value - mean) / std;
            }
        }
        Ok(frame)
    }

    fn is_fitted(&self) -> bool {
        self.fit_id.is_some()
    }
}

/// One indicator column per training category; unseen values encode as
/// all zeros.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    vocabularies: Vec<(String, Vec<String>)>,
    fit_id: Option<Uuid>,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vocabularies(&self) -> &[(String, Vec<String>)] {
        &self.vocabularies
    }

    fn indicator_name(column: &str, value: &str) -> String {
        format!("{}_{}", column, value)
    }
}

impl Transform for OneHotEncoder {
    fn name(&self) -> &'static str {
        "one_hot_encoder"
    }

    fn fit(&mut self, frame: &FeatureFrame) -> Result<()> {
        self.vocabularies = frame
            .categorical_columns()
            .iter()
            .map(|(name, values)| {
                let vocab: BTreeSet<String> = values.iter().flatten().cloned().collect();
                (name.clone(), vocab.into_iter().collect())
            })
            .collect();
        Ok(())
    }

    fn transform(&self, mut frame: FeatureFrame) -> Result<FeatureFrame> {
        let categorical: BTreeMap<String, Vec<Option<String>>> = frame.take_categorical().into_iter().collect();

        for (name, vocab) in &self.vocabularies {
            let values = categorical
                .get(name)
                .ok_or_else(|| AttritionError::FeatureNotFound(name.clone()))?;
            for category in vocab {
                let indicator: Vec<Option<f64>> = values
                    .iter()
                    .map(|v| Some(if v.as_deref() == Some(category.as_str()) { 1.0 } else { 0.0 }))
                    .collect();
                frame.push_numeric(Self::indicator_name(name, category), indicator)?;
            }
        }
        Ok(frame)
    }

    fn is_fitted(&self) -> bool {
        self.fit_id.is_some()
    }
}

/// A serializable preprocessing stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stage {
    MedianImputer(MedianImputer),
    ConstantImputer(ConstantImputer),
    StandardScaler(StandardScaler),
    OneHotEncoder(OneHotEncoder),
}

impl Stage {
    fn inner(&self) -> &dyn Transform {
        match self {
            Stage::MedianImputer(s) => s,
            Stage::ConstantImputer(s) => s,
            Stage::StandardScaler(s) => s,
            Stage::OneHotEncoder(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Transform {
        match self {
            Stage::MedianImputer(s) => s,
            Stage::ConstantImputer(s) => s,
            Stage::StandardScaler(s) => s,
            Stage::OneHotEncoder(s) => s,
        }
    }

    /// Id of the preprocessor fit that produced this stage's statistics
    pub fn fit_id(&self) -> Option<Uuid> {
        match self {
            Stage::MedianImputer(s) => s.fit_id,
            Stage::ConstantImputer(s) => s.fit_id,
            Stage::StandardScaler(s) => s.fit_id,
            Stage::OneHotEncoder(s) => s.fit_id,
        }
    }

    pub(crate) fn stamp(&mut self, id: Uuid) {
        let slot = match self {
            Stage::MedianImputer(s) => &mut s.fit_id,
            Stage::ConstantImputer(s) => &mut s.fit_id,
            Stage::StandardScaler(s) => &mut s.fit_id,
            Stage::OneHotEncoder(s) => &mut s.fit_id,
        };
        *slot = Some(id);
    }

    /// Fill values recorded by imputing stages
    pub fn imputations(&self) -> Vec<ImputationRecord> {
        match self {
            Stage::MedianImputer(s) => s
                .medians
                .iter()
                .zip(&s.null_counts)
                .map(|((column, fill), &null_count)| ImputationRecord {
                    column: column.clone(),
                    kind: ColumnKind::Numerical,
                    null_count,
                    fill_value: fill.to_string(),
                })
                .collect(),
            Stage::ConstantImputer(s) => s
                .columns
                .iter()
                .zip(&s.null_counts)
                .map(|(column, &null_count)| ImputationRecord {
                    column: column.clone(),
                    kind: ColumnKind::Categorical,
                    null_count,
                    fill_value: s.fill_value.clone(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Transform for Stage {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn fit(&mut self, frame: &FeatureFrame) -> Result<()> {
        self.inner_mut().fit(frame)
    }

    fn transform(&self, frame: FeatureFrame) -> Result<FeatureFrame> {
        self.inner().transform(frame)
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(salaries: Vec<Option<f64>>, cities: Vec<Option<&str>>) -> FeatureFrame {
        let ids = (0..salaries.len()).map(|i| i.to_string()).collect();
        let mut f = FeatureFrame::new(ids);
        f.push_numeric("salary", salaries).unwrap();
        f.push_categorical("city", cities.into_iter().map(|c| c.map(String::from)).collect())
            .unwrap();
        f
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[Some(3.0), None, Some(1.0), Some(2.0)]), Some(2.0));
        assert_eq!(median(&[Some(4.0), Some(1.0), Some(2.0), Some(3.0)]), Some(2.5));
        assert_eq!(median(&[None, None]), None);
    }

    #[test]
    fn test_median_imputer() {
        let train = frame(vec![Some(1.0), None, Some(5.0)], vec![Some("a"), None, Some("b")]);
        let mut imputer = MedianImputer::new();
        imputer.fit(&train).unwrap();
        let out = imputer.transform(train).unwrap();
        assert_eq!(out.numeric("salary").unwrap(), &[Some(1.0), Some(3.0), Some(5.0)]);
        assert_eq!(imputer.medians(), &[("salary".to_string(), 3.0)]);
    }

    #[test]
    fn test_constant_imputer() {
        let train = frame(vec![Some(1.0), None], vec![None, Some("b")]);
        let mut imputer = ConstantImputer::new("Unknown");
        imputer.fit(&train).unwrap();
        let out = imputer.transform(train).unwrap();
        assert_eq!(out.categorical("city").unwrap()[0].as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_standard_scaler_population_std() {
        let train = frame(vec![Some(1.0), Some(3.0)], vec![None, None]);
        let mut scaler = StandardScaler::new();
        scaler.fit(&train).unwrap();
        assert_eq!(scaler.params(), &[("salary".to_string(), 2.0, 1.0)]);
        let out = scaler.transform(train).unwrap();
        assert_eq!(out.numeric("salary").unwrap(), &[Some(-1.0), Some(1.0)]);
    }

    #[test]
    fn test_constant_column_scales_to_zero() {
        let train = frame(vec![Some(7.0), Some(7.0)], vec![None, None]);
        let mut scaler = StandardScaler::new();
        scaler.fit(&train).unwrap();
        let out = scaler.transform(train).unwrap();
        assert_eq!(out.numeric("salary").unwrap(), &[Some(0.0), Some(0.0)]);
    }

    #[test]
    fn test_one_hot_unseen_category() {
        let train = frame(vec![Some(1.0), Some(2.0)], vec![Some("Pune"), Some("Delhi")]);
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&train).unwrap();
        assert_eq!(
            encoder.vocabularies(),
            &[("city".to_string(), vec!["Delhi".to_string(), "Pune".to_string()])]
        );

        let test = frame(vec![Some(1.0)], vec![Some("Mumbai")]);
        let out = encoder.transform(test).unwrap();
        assert!(out.categorical_names().is_empty());
        assert_eq!(out.numeric_names(), vec!["salary", "city_Delhi", "city_Pune"]);
        assert_eq!(out.numeric("city_Delhi").unwrap(), &[Some(0.0)]);
        assert_eq!(out.numeric("city_Pune").unwrap(), &[Some(0.0)]);
    }
}
