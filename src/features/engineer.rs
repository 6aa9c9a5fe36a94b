//! Label derivation and engineered signals

use super::config::FeatureConfig;
use super::frame::FeatureFrame;
use crate::data::MergedDataset;
use crate::error::{AttritionError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const COMPENSATION_RATIO: &str = "compensation_ratio";
pub const SATISFACTION_X_COMPENSATION: &str = "satisfaction_x_compensation_ratio";
pub const LATENESS_X_OVERTIME: &str = "lateness_x_overtime";

const SECONDS_PER_DAY: i64 = 86_400;

/// Engineered features plus labels for a labeled dataset
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub frame: FeatureFrame,
    /// 1.0 = departed, 0.0 = still employed
    pub labels: Array1<f64>,
    /// Numerical features that survived the merge, in declared order
    pub numerical: Vec<String>,
    /// Categorical features that survived the merge, in declared order
    pub categorical: Vec<String>,
    /// Frequency scale the lateness and overtime codes were taken from
    pub frequency_levels: Vec<String>,
}

impl FeatureSet {
    pub fn n_rows(&self) -> usize {
        self.frame.n_rows()
    }

    /// Number of (negative, positive) labels
    pub fn class_counts(&self) -> (usize, usize) {
        let positives = self.labels.iter().filter(|&&y| y >= 0.5).count();
        (self.labels.len() - positives, positives)
    }
}

/// Turns a merged dataset into the declared feature contract
#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer {
    config: FeatureConfig,
}

impl FeatureEngineer {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Engineer features and labels. `now` anchors every day count.
    pub fn engineer(&self, dataset: &MergedDataset, now: DateTime<Utc>) -> Result<FeatureSet> {
        let df = dataset.frame();
        let reasons = text_values(df, &self.config.label_column)?.ok_or_else(|| {
            AttritionError::Schema(format!(
                "label column '{}' missing from merged dataset",
                self.config.label_column
            ))
        })?;

        let labels: Array1<f64> = reasons
            .iter()
            .map(|r| derive_label(r.as_deref(), &self.config.retained_marker))
            .collect();

        let (frame, numerical, categorical) = self.build(dataset, now)?;

        let positives = labels.iter().filter(|&&y| y >= 0.5).count();
        info!(
            rows = frame.n_rows(),
            numerical = numerical.len(),
            categorical = categorical.len(),
            departed = positives,
            "Engineered features"
        );

        Ok(FeatureSet {
            frame,
            labels,
            numerical,
            categorical,
            frequency_levels: self.config.frequency_levels.clone(),
        })
    }

    /// Engineer features for records without a resignation reason
    pub fn engineer_unlabeled(&self, dataset: &MergedDataset, now: DateTime<Utc>) -> Result<FeatureFrame> {
        let (frame, numerical, categorical) = self.build(dataset, now)?;
        debug!(
            rows = frame.n_rows(),
            numerical = numerical.len(),
            categorical = categorical.len(),
            "Engineered unlabeled features"
        );
        Ok(frame)
    }

    fn build(&self, dataset: &MergedDataset, now: DateTime<Utc>) -> Result<(FeatureFrame, Vec<String>, Vec<String>)> {
        let df = dataset.frame();
        let n = df.height();
        let derived = self.derived_columns(df, now.naive_utc())?;

        let mut frame = FeatureFrame::new(dataset.ids()?);
        let mut numerical = Vec::with_capacity(self.config.numerical.len());
        let mut categorical = Vec::with_capacity(self.config.categorical.len());

        for name in &self.config.numerical {
            let values = match derived.get(name) {
                Some(values) => Some(values.clone()),
                None => numeric_values(df, name)?,
            };
            match values {
                Some(values) => {
                    debug_assert_eq!(values.len(), n);
                    frame.push_numeric(name.clone(), values)?;
                    numerical.push(name.clone());
                }
                None => warn!(feature = %name, kind = "numerical", "Declared feature absent after merge, dropped"),
            }
        }

        for name in &self.config.categorical {
            match text_values(df, name)? {
                Some(values) => {
                    frame.push_categorical(name.clone(), values)?;
                    categorical.push(name.clone());
                }
                None => warn!(feature = %name, kind = "categorical", "Declared feature absent after merge, dropped"),
            }
        }

        if numerical.is_empty() && categorical.is_empty() {
            return Err(AttritionError::Schema(
                "none of the declared features is present in the merged dataset".to_string(),
            ));
        }

        Ok((frame, numerical, categorical))
    }

    fn derived_columns(&self, df: &DataFrame, now: NaiveDateTime) -> Result<BTreeMap<String, Vec<Option<f64>>>> {
        let n = df.height();
        let mut derived = BTreeMap::new();

        for date in &self.config.date_features {
            let values = match text_values(df, &date.source)? {
                Some(raw) => {
                    let days: Vec<Option<f64>> = raw
                        .iter()
                        .map(|s| s.as_deref().and_then(parse_date).map(|d| days_between(now, d) as f64))
                        .collect();
                    let unparsed = raw
                        .iter()
                        .zip(&days)
                        .filter(|(r, d)| r.is_some() && d.is_none())
                        .count();
                    if unparsed > 0 {
                        warn!(column = %date.source, count = unparsed, "Unparseable dates set to null");
                    }
                    days
                }
                None => {
                    warn!(feature = %date.name, source = %date.source, "Date column absent, feature is all null");
                    vec![None; n]
                }
            };
            derived.insert(date.name.clone(), values);
        }

        let salary = self.numeric_or_null(df, "monthlysalary", COMPENSATION_RATIO)?;
        let benchmark = self.numeric_or_null(df, "industrybenchmarksalary", COMPENSATION_RATIO)?;
        let ratio: Vec<Option<f64>> = salary.iter().zip(&benchmark).map(|(&a, &b)| divide(a, b)).collect();

        let satisfaction = self.numeric_or_null(df, "compensationsatisfaction", SATISFACTION_X_COMPENSATION)?;
        let interaction: Vec<Option<f64>> = satisfaction.iter().zip(&ratio).map(|(&a, &b)| multiply(a, b)).collect();

        let lateness = self.codes_or_null(df, "latearrivalfrequency", LATENESS_X_OVERTIME)?;
        let overtime = self.codes_or_null(df, "overtimefrequency", LATENESS_X_OVERTIME)?;
        let lateness_x_overtime: Vec<Option<f64>> = lateness.iter().zip(&overtime).map(|(&a, &b)| multiply(a, b)).collect();

        derived.insert(COMPENSATION_RATIO.to_string(), ratio);
        derived.insert(SATISFACTION_X_COMPENSATION.to_string(), interaction);
        derived.insert(LATENESS_X_OVERTIME.to_string(), lateness_x_overtime);
        Ok(derived)
    }

    fn numeric_or_null(&self, df: &DataFrame, column: &str, feature: &str) -> Result<Vec<Option<f64>>> {
        Ok(numeric_values(df, column)?.unwrap_or_else(|| {
            warn!(feature = %feature, missing = %column, "Constituent column absent, feature is all null");
            vec![None; df.height()]
        }))
    }

    fn codes_or_null(&self, df: &DataFrame, column: &str, feature: &str) -> Result<Vec<Option<f64>>> {
        Ok(match text_values(df, column)? {
            Some(values) => {
                let codes = ordinal_codes(&values, &self.config.frequency_levels);
                let off_scale = values.iter().zip(&codes).filter(|(v, c)| v.is_some() && c.is_none()).count();
                if off_scale > 0 {
                    warn!(column = %column, count = off_scale, "Values off the frequency scale set to null");
                }
                codes
            }
            None => {
                warn!(feature = %feature, missing = %column, "Constituent column absent, feature is all null");
                vec![None; df.height()]
            }
        })
    }
}

/// 0.0 when the reason is null, blank or the retained marker; 1.0 otherwise
pub fn derive_label(reason: Option<&str>, retained_marker: &str) -> f64 {
    match reason.map(|r| r.trim().to_lowercase()) {
        None => 0.0,
        Some(r) if r.is_empty() || r == retained_marker.trim().to_lowercase() => 0.0,
        Some(_) => 1.0,
    }
}

/// Parse a date in one of the accepted layouts
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for layout in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(dt);
        }
    }
    for layout in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, layout) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Whole days from `then` to `now`, floored
pub fn days_between(now: NaiveDateTime, then: NaiveDateTime) -> i64 {
    (now - then).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Position of each value on an ordered scale, compared trimmed and
/// lowercase. Depends on the value alone, never on the rest of the batch.
pub fn ordinal_codes(values: &[Option<String>], levels: &[String]) -> Vec<Option<f64>> {
    let index: BTreeMap<String, usize> = levels
        .iter()
        .enumerate()
        .map(|(i, level)| (level.trim().to_lowercase(), i))
        .collect();
    values
        .iter()
        .map(|v| {
            v.as_deref()
                .and_then(|v| index.get(&v.trim().to_lowercase()))
                .map(|&i| i as f64)
        })
        .collect()
}

fn divide(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) if b != 0.0 => Some(a / b).filter(|r| r.is_finite()),
        _ => None,
    }
}

fn multiply(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a * b).filter(|r| r.is_finite()),
        _ => None,
    }
}

/// Numeric view of a merged column; text is parsed, absent column is `None`
fn numeric_values(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<f64>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let series = column.as_materialized_series();
    let values = match series.dtype() {
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok()).filter(|x| x.is_finite()))
            .collect(),
        _ => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect(),
    };
    Ok(Some(values))
}

/// Text view of a merged column; absent column is `None`
fn text_values(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<String>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let series = column.as_materialized_series();
    let values = match series.dtype() {
        DataType::Float64 => series
            .f64()?
            .into_iter()
            .map(|v| v.map(|x| x.to_string()))
            .collect(),
        _ => series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect(),
    };
    Ok(Some(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataMerger;
    use chrono::TimeZone;

    #[test]
    fn test_derive_label() {
        assert_eq!(derive_label(None, "still working"), 0.0);
        assert_eq!(derive_label(Some("  "), "still working"), 0.0);
        assert_eq!(derive_label(Some(" Still Working "), "still working"), 0.0);
        assert_eq!(derive_label(Some("Better opportunity"), "still working"), 1.0);
        assert_eq!(derive_label(Some("still working remotely"), "still working"), 1.0);
    }

    #[test]
    fn test_parse_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(parse_date("2021-03-04"), Some(expected));
        assert_eq!(parse_date("2021/03/04"), Some(expected));
        assert_eq!(parse_date("03/04/2021"), Some(expected));
        assert_eq!(parse_date("04-03-2021"), Some(expected));
        assert_eq!(parse_date("2021-03-04T00:00:00Z"), Some(expected));
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn test_days_between_floors() {
        let then = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
        let now = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap().and_hms_opt(6, 0, 0).unwrap();
        assert_eq!(days_between(now, then), 9);
        assert_eq!(days_between(then, now), -10);
    }

    #[test]
    fn test_ordinal_codes() {
        let levels: Vec<String> = ["Never", "Rarely", "Often"].iter().map(|s| s.to_string()).collect();
        let values = vec![Some(" often".to_string()), None, Some("Rarely".to_string()), Some("Weekly".to_string())];
        assert_eq!(ordinal_codes(&values, &levels), vec![Some(2.0), None, Some(1.0), None]);
    }

    fn employee_tables(rows: &[(&str, &str, &str)]) -> BTreeMap<String, DataFrame> {
        let ids: Vec<&str> = rows.iter().map(|r| r.0).collect();
        let lateness: Vec<&str> = rows.iter().map(|r| r.1).collect();
        let overtime: Vec<&str> = rows.iter().map(|r| r.2).collect();
        let n = rows.len();
        let mut tables = BTreeMap::new();
        tables.insert(
            "employees".to_string(),
            df!(
                "employeeid" => ids,
                "jobrole" => vec!["Engineer"; n],
                "dateofjoining" => vec!["2020-01-01"; n],
                "monthlysalary" => vec![5000.0; n],
                "reasonforresignation" => vec!["Still working"; n],
                "latearrivalfrequency" => lateness,
                "overtimefrequency" => overtime,
            )
            .unwrap(),
        );
        tables
    }

    #[test]
    fn test_lateness_code_ignores_batch_peers() {
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let engineer = FeatureEngineer::default();

        let alone = DataMerger::default()
            .merge(&employee_tables(&[("1", "Rarely", "Rarely")]))
            .unwrap();
        let with_peer = DataMerger::default()
            .merge(&employee_tables(&[("1", "Rarely", "Rarely"), ("2", "Often", "Often")]))
            .unwrap();

        let solo = engineer.engineer_unlabeled(&alone, now).unwrap();
        let batch = engineer.engineer_unlabeled(&with_peer, now).unwrap();
        assert_eq!(solo.numeric(LATENESS_X_OVERTIME).unwrap()[0], Some(1.0));
        assert_eq!(batch.numeric(LATENESS_X_OVERTIME).unwrap()[0], Some(1.0));
        assert_eq!(batch.numeric(LATENESS_X_OVERTIME).unwrap()[1], Some(9.0));
    }

    #[test]
    fn test_engineer_derived_signals() {
        let mut tables = BTreeMap::new();
        tables.insert(
            "employees".to_string(),
            df!(
                "employeeid" => &["1", "2"],
                "jobrole" => &["Engineer", "Analyst"],
                "dateofjoining" => &["2024-01-01", "garbage"],
                "monthlysalary" => &[5000.0, 4000.0],
                "reasonforresignation" => &[Some("Still working"), Some("Relocation")],
                "latearrivalfrequency" => &["Often", "Rarely"],
                "overtimefrequency" => &["Rarely", "Often"],
            )
            .unwrap(),
        );
        tables.insert(
            "external_market_data".to_string(),
            df!(
                "employeeid" => &["1", "2"],
                "industrybenchmarksalary" => &[4000.0, 0.0],
                "compensationsatisfaction" => &[2.0, 3.0],
            )
            .unwrap(),
        );
        let merged = DataMerger::default().merge(&tables).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();

        let set = FeatureEngineer::default().engineer(&merged, now).unwrap();
        assert_eq!(set.labels.to_vec(), vec![0.0, 1.0]);
        assert_eq!(set.frame.numeric("tenure_in_days").unwrap(), &[Some(30.0), None]);
        assert_eq!(set.frame.numeric(COMPENSATION_RATIO).unwrap(), &[Some(1.25), None]);
        assert_eq!(set.frame.numeric(SATISFACTION_X_COMPENSATION).unwrap(), &[Some(2.5), None]);
        // Rarely = 1, Often = 3 on the default scale
        assert_eq!(set.frame.numeric(LATENESS_X_OVERTIME).unwrap(), &[Some(3.0), Some(3.0)]);
        assert_eq!(set.frequency_levels, FeatureConfig::default().frequency_levels);

        assert!(set.numerical.contains(&"monthlysalary".to_string()));
        assert!(!set.numerical.contains(&"bonusamount".to_string()));
        assert_eq!(set.categorical, vec!["jobrole".to_string(), "overtimefrequency".to_string()]);
        assert_eq!(set.class_counts(), (1, 1));
    }

    #[test]
    fn test_no_declared_feature_is_schema_error() {
        let mut tables = BTreeMap::new();
        tables.insert(
            "employees".to_string(),
            df!(
                "employeeid" => &["1"],
                "reasonforresignation" => &["Still working"],
            )
            .unwrap(),
        );
        let merged = DataMerger::new(
            crate::data::MergeConfig::default().with_required_columns(vec!["employeeid".to_string()]),
        )
        .merge(&tables)
        .unwrap();
        let engineer = FeatureEngineer::new(
            FeatureConfig::default()
                .with_numerical(vec!["bonusamount".to_string()])
                .with_categorical(vec!["city".to_string()]),
        );
        let err = engineer.engineer(&merged, Utc::now()).unwrap_err();
        assert!(matches!(err, AttritionError::Schema(_)));
    }
}
