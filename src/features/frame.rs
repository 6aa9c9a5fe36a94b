//! Columnar container for engineered features

use crate::error::{AttritionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One feature value of one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureValue {
    Numeric(Option<f64>),
    Categorical(Option<String>),
}

/// The declared features of a single employee record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: BTreeMap<String, FeatureValue>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_numeric(mut self, name: impl Into<String>, value: impl Into<Option<f64>>) -> Self {
        self.values.insert(name.into(), FeatureValue::Numeric(value.into()));
        self
    }

    pub fn with_categorical<S: Into<String>>(mut self, name: impl Into<String>, value: Option<S>) -> Self {
        self.values
            .insert(name.into(), FeatureValue::Categorical(value.map(Into::into)));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FeatureValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FeatureValue)> {
        self.values.iter()
    }
}

/// Engineered features in column order, one row per employee.
///
/// Numeric columns come first in declaration order, then categorical ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFrame {
    ids: Vec<String>,
    numeric: Vec<(String, Vec<Option<f64>>)>,
    categorical: Vec<(String, Vec<Option<String>>)>,
}

impl FeatureFrame {
    /// Empty frame over the given row ids
    pub fn new(ids: Vec<String>) -> Self {
        Self {
            ids,
            numeric: Vec::new(),
            categorical: Vec::new(),
        }
    }

    /// Frame from individual records; features absent from a record and
    /// non-finite numbers are null
    pub fn from_vectors(vectors: &[FeatureVector], numerical: &[String], categorical: &[String]) -> Result<Self> {
        let ids = (0..vectors.len()).map(|i| format!("row-{}", i)).collect();
        let mut frame = Self::new(ids);

        for name in numerical {
            let values = vectors
                .iter()
                .map(|v| match v.get(name) {
                    None | Some(FeatureValue::Numeric(None)) => Ok(None),
                    Some(FeatureValue::Numeric(Some(x))) => Ok(Some(*x).filter(|x| x.is_finite())),
                    Some(FeatureValue::Categorical(_)) => Err(AttritionError::ValidationError(format!(
                        "feature '{}' must be numeric",
                        name
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;
            frame.push_numeric(name.clone(), values)?;
        }

        for name in categorical {
            let values = vectors
                .iter()
                .map(|v| match v.get(name) {
                    None | Some(FeatureValue::Categorical(None)) => Ok(None),
                    Some(FeatureValue::Categorical(Some(s))) => Ok(Some(s.clone())),
                    // Categorical columns may hold numeric codes
                    Some(FeatureValue::Numeric(x)) => Ok(x.filter(|x| x.is_finite()).map(|x| x.to_string())),
                })
                .collect::<Result<Vec<_>>>()?;
            frame.push_categorical(name.clone(), values)?;
        }

        Ok(frame)
    }

    pub fn n_rows(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn push_numeric(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Result<()> {
        let name = name.into();
        self.check_len(&name, values.len())?;
        self.numeric.retain(|(n, _)| n != &name);
        self.numeric.push((name, values));
        Ok(())
    }

    pub fn push_categorical(&mut self, name: impl Into<String>, values: Vec<Option<String>>) -> Result<()> {
        let name = name.into();
        self.check_len(&name, values.len())?;
        self.categorical.retain(|(n, _)| n != &name);
        self.categorical.push((name, values));
        Ok(())
    }

    fn check_len(&self, name: &str, len: usize) -> Result<()> {
        if len != self.ids.len() {
            return Err(AttritionError::ShapeError {
                expected: format!("{} rows", self.ids.len()),
                actual: format!("{} rows in column '{}'", len, name),
            });
        }
        Ok(())
    }

    pub fn numeric_names(&self) -> Vec<String> {
        self.numeric.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn categorical_names(&self) -> Vec<String> {
        self.categorical.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn numeric(&self, name: &str) -> Option<&[Option<f64>]> {
        self.numeric
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn categorical(&self, name: &str) -> Option<&[Option<String>]> {
        self.categorical
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    pub fn numeric_columns(&self) -> &[(String, Vec<Option<f64>>)] {
        &self.numeric
    }

    pub fn categorical_columns(&self) -> &[(String, Vec<Option<String>>)] {
        &self.categorical
    }

    pub(crate) fn numeric_columns_mut(&mut self) -> &mut Vec<(String, Vec<Option<f64>>)> {
        &mut self.numeric
    }

    pub(crate) fn categorical_columns_mut(&mut self) -> &mut Vec<(String, Vec<Option<String>>)> {
        &mut self.categorical
    }

    /// Drop every categorical column, returning them
    pub(crate) fn take_categorical(&mut self) -> Vec<(String, Vec<Option<String>>)> {
        std::mem::take(&mut self.categorical)
    }

    /// Rows at `indices`, in that order
    pub fn take(&self, indices: &[usize]) -> FeatureFrame {
        FeatureFrame {
            ids: indices.iter().map(|&i| self.ids[i].clone()).collect(),
            numeric: self
                .numeric
                .iter()
                .map(|(n, v)| (n.clone(), indices.iter().map(|&i| v[i]).collect()))
                .collect(),
            categorical: self
                .categorical
                .iter()
                .map(|(n, v)| (n.clone(), indices.iter().map(|&i| v[i].clone()).collect()))
                .collect(),
        }
    }

    /// Keep only the named columns, in the given order
    pub fn select(&self, numerical: &[String], categorical: &[String]) -> Result<FeatureFrame> {
        let mut out = FeatureFrame::new(self.ids.clone());
        for name in numerical {
            let values = self
                .numeric(name)
                .ok_or_else(|| AttritionError::FeatureNotFound(name.clone()))?;
            out.numeric.push((name.clone(), values.to_vec()));
        }
        for name in categorical {
            let values = self
                .categorical(name)
                .ok_or_else(|| AttritionError::FeatureNotFound(name.clone()))?;
            out.categorical.push((name.clone(), values.to_vec()));
        }
        Ok(out)
    }

    /// One record as a feature vector
    pub fn row(&self, index: usize) -> Option<FeatureVector> {
        if index >= self.n_rows() {
            return None;
        }
        let mut vector = FeatureVector::new();
        for (name, values) in &self.numeric {
            vector.insert(name.clone(), FeatureValue::Numeric(values[index]));
        }
        for (name, values) in &self.categorical {
            vector.insert(name.clone(), FeatureValue::Categorical(values[index].clone()));
        }
        Some(vector)
    }
}
