//! Hyperparameter search space

use crate::error::{AttritionError, Result};
use crate::training::{ParamValue, Params};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Candidate values per knob; the search space is their Cartesian product.
///
/// Enumeration order: knobs sorted by name, the last knob varies fastest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterGrid {
    knobs: BTreeMap<String, Vec<ParamValue>>,
}

impl HyperparameterGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(knobs: BTreeMap<String, Vec<ParamValue>>) -> Result<Self> {
        let mut grid = Self::new();
        for (name, values) in knobs {
            grid = grid.with_knob(name, values)?;
        }
        Ok(grid)
    }

    /// Add a knob; an empty candidate list is rejected
    pub fn with_knob(mut self, name: impl Into<String>, values: Vec<ParamValue>) -> Result<Self> {
        let name = name.into();
        if values.is_empty() {
            return Err(AttritionError::ConfigError(format!("knob '{}' has no candidate values", name)));
        }
        self.knobs.insert(name, values);
        Ok(self)
    }

    pub fn knobs(&self) -> &BTreeMap<String, Vec<ParamValue>> {
        &self.knobs
    }

    pub fn is_empty(&self) -> bool {
        self.knobs.is_empty()
    }

    /// Number of configurations; an empty grid has one (all defaults)
    pub fn size(&self) -> usize {
        self.knobs.values().map(Vec::len).product()
    }

    /// Every configuration in enumeration order
    pub fn configurations(&self) -> Vec<Params> {
        let mut configs = vec![Params::new()];
        for (name, values) in &self.knobs {
            configs = configs
                .into_iter()
                .flat_map(|base| {
                    values.iter().map(move |v| {
                        let mut next = base.clone();
                        next.insert(name.clone(), v.clone());
                        next
                    })
                })
                .collect();
        }
        configs
    }
}
