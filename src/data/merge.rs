//! Left-join of every HR table onto the anchor table

use super::config::MergeConfig;
use crate::error::{AttritionError, Result};
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tracing::{info, warn};

/// Recoverable data-quality conditions met while merging
#[derive(Debug, Clone, PartialEq)]
pub enum MergeWarning {
    /// An augmentation table could not be joined and was left out
    JoinSkipped { table: String, reason: String },
    /// An augmentation table repeats ids; the first row per id was used
    DuplicateKeys { table: String, duplicates: usize },
    /// A column clashed with an existing merged column and was renamed
    ColumnRenamed { table: String, column: String, renamed: String },
    /// Anchor rows without an id; they keep nulls for every joined column
    NullAnchorKeys { count: usize },
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeWarning::JoinSkipped { table, reason } => {
                write!(f, "skipped table '{}': {}", table, reason)
            }
            MergeWarning::DuplicateKeys { table, duplicates } => {
                write!(f, "table '{}' has {} duplicate ids, first occurrence kept", table, duplicates)
            }
            MergeWarning::ColumnRenamed { table, column, renamed } => {
                write!(f, "column '{}' from '{}' renamed to '{}'", column, table, renamed)
            }
            MergeWarning::NullAnchorKeys { count } => {
                write!(f, "{} anchor rows have no id", count)
            }
        }
    }
}

/// One row per anchor employee with every joinable column attached
#[derive(Debug, Clone)]
pub struct MergedDataset {
    frame: DataFrame,
    id_column: String,
    warnings: Vec<MergeWarning>,
}

impl MergedDataset {
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    pub fn warnings(&self) -> &[MergeWarning] {
        &self.warnings
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    /// Employee ids in row order; rows without an id get `row-<index>`
    pub fn ids(&self) -> Result<Vec<String>> {
        let ids = self.frame.column(&self.id_column)?.as_materialized_series().cast(&DataType::String)?;
        Ok(ids
            .str()?
            .into_iter()
            .enumerate()
            .map(|(i, id)| id.map(str::to_string).unwrap_or_else(|| format!("row-{}", i)))
            .collect())
    }
}

/// Builds the merged dataset from a snapshot of tables
#[derive(Debug, Clone, Default)]
pub struct DataMerger {
    config: MergeConfig,
}

impl DataMerger {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Left-join every non-anchor table onto the anchor. Row count and
    /// order always equal the anchor's; the input tables are not modified.
    pub fn merge(&self, tables: &BTreeMap<String, DataFrame>) -> Result<MergedDataset> {
        let id = self.config.id_column.as_str();
        let anchor_name = self.config.anchor_table.as_str();

        let anchor = tables.get(anchor_name).ok_or_else(|| {
            AttritionError::Schema(format!("anchor table '{}' not found", anchor_name))
        })?;

        if anchor.column(id).is_err() {
            return Err(AttritionError::Schema(format!(
                "anchor table '{}' lacks the id column '{}'",
                anchor_name, id
            )));
        }
        let missing: Vec<&str> = self
            .config
            .required_columns
            .iter()
            .map(String::as_str)
            .filter(|c| anchor.column(c).is_err())
            .collect();
        if !missing.is_empty() {
            return Err(AttritionError::Schema(format!(
                "anchor table '{}' lacks required columns: {}",
                anchor_name,
                missing.join(", ")
            )));
        }

        let mut warnings = Vec::new();
        let anchor_keys = key_column(anchor, id)?;

        let null_keys = anchor_keys.iter().filter(|k| k.is_none()).count();
        if null_keys > 0 {
            let w = MergeWarning::NullAnchorKeys { count: null_keys };
            warn!(table = %anchor_name, count = null_keys, "Anchor rows without id");
            warnings.push(w);
        }

        let mut seen = HashSet::with_capacity(anchor_keys.len());
        for key in anchor_keys.iter().flatten() {
            if !seen.insert(key.as_str()) {
                return Err(AttritionError::Schema(format!(
                    "anchor table '{}' repeats id '{}'",
                    anchor_name, key
                )));
            }
        }

        let mut merged = anchor.clone();
        let mut present: HashSet<String> = merged
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        for (table_name, table) in tables {
            if table_name == anchor_name {
                continue;
            }

            if table.column(id).is_err() {
                let reason = format!("no '{}' column", id);
                warn!(table = %table_name, reason = %reason, "Join skipped");
                warnings.push(MergeWarning::JoinSkipped {
                    table: table_name.clone(),
                    reason,
                });
                continue;
            }

            let (row_of, duplicates) = first_row_index(table, id)?;
            if duplicates > 0 {
                warn!(table = %table_name, duplicates, "Duplicate ids in augmentation table, keeping first");
                warnings.push(MergeWarning::DuplicateKeys {
                    table: table_name.clone(),
                    duplicates,
                });
            }

            let take: Vec<Option<usize>> = anchor_keys
                .iter()
                .map(|k| k.as_ref().and_then(|k| row_of.get(k).copied()))
                .collect();
            let matched = take.iter().filter(|t| t.is_some()).count();

            let mut added = 0usize;
            for column in table.get_columns() {
                let name = column.name().to_string();
                if name == id || self.config.is_excluded(&name) {
                    continue;
                }

                let target = if present.contains(&name) {
                    let renamed = unique_name(&present, &name, table_name);
                    warn!(table = %table_name, column = %name, renamed = %renamed, "Column name collision");
                    warnings.push(MergeWarning::ColumnRenamed {
                        table: table_name.clone(),
                        column: name.clone(),
                        renamed: renamed.clone(),
                    });
                    renamed
                } else {
                    name
                };

                let gathered = gather(column.as_materialized_series(), &take, &target)?;
                merged.with_column(gathered)?;
                present.insert(target);
                added += 1;
            }

            info!(
                table = %table_name,
                matched,
                rows = anchor_keys.len(),
                columns = added,
                "Joined table"
            );
        }

        Ok(MergedDataset {
            frame: merged,
            id_column: id.to_string(),
            warnings,
        })
    }
}

fn key_column(df: &DataFrame, id: &str) -> Result<Vec<Option<String>>> {
    let keys = df.column(id)?.as_materialized_series().cast(&DataType::String)?;
    Ok(keys.str()?.into_iter().map(|k| k.map(str::to_string)).collect())
}

/// Map each id to its first row; also counts the repeated rows
fn first_row_index(df: &DataFrame, id: &str) -> Result<(HashMap<String, usize>, usize)> {
    let mut index = HashMap::with_capacity(df.height());
    let mut duplicates = 0;
    for (row, key) in key_column(df, id)?.into_iter().enumerate() {
        let Some(key) = key else { continue };
        if index.contains_key(&key) {
            duplicates += 1;
        } else {
            index.insert(key, row);
        }
    }
    Ok((index, duplicates))
}

fn unique_name(present: &HashSet<String>, name: &str, table: &str) -> String {
    let base = format!("{}_{}", name, table);
    let mut candidate = base.clone();
    let mut n = 2;
    while present.contains(&candidate) {
        candidate = format!("{}_{}", base, n);
        n += 1;
    }
    candidate
}

/// Pick rows of `series` by optional index; `None` becomes null
fn gather(series: &Series, take: &[Option<usize>], name: &str) -> Result<Series> {
    let gathered = match series.dtype() {
        DataType::Float64 => {
            let ca = series.f64()?;
            let values: Vec<Option<f64>> = take.iter().map(|t| t.and_then(|i| ca.get(i))).collect();
            Series::new(name.into(), values)
        }
        DataType::String => {
            let ca = series.str()?;
            let values: Vec<Option<&str>> = take.iter().map(|t| t.and_then(|i| ca.get(i))).collect();
            Series::new(name.into(), values)
        }
        _ => {
            let as_text = series.cast(&DataType::String)?;
            return gather(&as_text, take, name);
        }
    };
    Ok(gathered)
}
