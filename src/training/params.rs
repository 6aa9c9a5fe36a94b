//! Hyperparameter values and typed lookups

use crate::error::{AttritionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

/// One point of a hyperparameter search space, keyed by knob name
pub type Params = BTreeMap<String, ParamValue>;

impl ParamValue {
    /// Numeric view of the value (integers widen to f64)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Text(_) => None,
        }
    }

    /// Non-negative integer view; floats are accepted only when integral
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Some(*v as usize),
            ParamValue::Float(v) if *v >= 0.0 && v.fract() == 0.0 && v.is_finite() => {
                Some(*v as usize)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

/// Render a configuration as `a=1, b=0.1`
pub fn describe(params: &Params) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reject knobs that the model family does not understand
pub(crate) fn check_known(params: &Params, known: &[&str]) -> Result<()> {
    for name in params.keys() {
        if !known.contains(&name.as_str()) {
            return Err(AttritionError::InvalidParameter {
                name: name.clone(),
                value: params[name].to_string(),
                reason: format!("unknown knob, expected one of {:?}", known),
            });
        }
    }
    Ok(())
}

pub(crate) fn usize_param(params: &Params, name: &str, default: usize, min: usize) -> Result<usize> {
    match params.get(name) {
        None => Ok(default),
        Some(value) => match value.as_usize() {
            Some(v) if v >= min => Ok(v),
            _ => Err(AttritionError::InvalidParameter {
                name: name.to_string(),
                value: value.to_string(),
                reason: format!("expected an integer >= {}", min),
            }),
        },
    }
}

/// Float knob; `valid` decides whether the value is acceptable
pub(crate) fn f64_param(
    params: &Params,
    name: &str,
    default: f64,
    valid: impl Fn(f64) -> bool,
    expectation: &str,
) -> Result<f64> {
    match params.get(name) {
        None => Ok(default),
        Some(value) => match value.as_f64() {
            Some(v) if valid(v) => Ok(v),
            _ => Err(AttritionError::InvalidParameter {
                name: name.to_string(),
                value: value.to_string(),
                reason: expectation.to_string(),
            }),
        },
    }
}
