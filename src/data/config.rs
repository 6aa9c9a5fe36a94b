//! Merge configuration

use crate::store::DEFAULT_ID_COLUMN;
use serde::{Deserialize, Serialize};

/// Which table anchors the merge and which columns it must carry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Table whose rows define the merged dataset
    pub anchor_table: String,
    /// Join key present in every table
    pub id_column: String,
    /// Columns never brought in from augmentation tables
    pub excluded_columns: Vec<String>,
    /// Columns the anchor table must provide
    pub required_columns: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            anchor_table: "employees".to_string(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            excluded_columns: vec!["source".to_string(), "frequency".to_string()],
            required_columns: vec![
                DEFAULT_ID_COLUMN.to_string(),
                "jobrole".to_string(),
                "dateofjoining".to_string(),
                "monthlysalary".to_string(),
                "reasonforresignation".to_string(),
            ],
        }
    }
}

impl MergeConfig {
    pub fn with_anchor_table(mut self, table: impl Into<String>) -> Self {
        self.anchor_table = table.into();
        self
    }

    /// Rename the join key; a required entry for the old key follows it
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        for required in &mut self.required_columns {
            if *required == self.id_column {
                *required = column.clone();
            }
        }
        self.id_column = column;
        self
    }

    pub fn with_excluded_columns(mut self, columns: Vec<String>) -> Self {
        self.excluded_columns = columns;
        self
    }

    pub fn with_required_columns(mut self, columns: Vec<String>) -> Self {
        self.required_columns = columns;
        self
    }

    pub fn without_required_column(mut self, column: &str) -> Self {
        self.required_columns.retain(|c| c != column);
        self
    }

    pub(crate) fn is_excluded(&self, column: &str) -> bool {
        self.excluded_columns.iter().any(|c| c == column)
    }
}
