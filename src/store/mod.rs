//! Read-only access to the HR tables
//!
//! Every store hands out frames in one normalized shape: column names are
//! trimmed, lowercased and snake-cased, the employee id is a `String`
//! column, numeric and boolean columns are `Float64`, everything else is
//! `String`.

mod directory;
mod memory;

pub use self::directory::CsvTableStore;
pub use self::memory::InMemoryTableStore;

use crate::error::{AttritionError, Result};
use polars::prelude::*;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Default name of the employee id column after normalization
pub const DEFAULT_ID_COLUMN: &str = "employeeid";

/// A read-only source of named tables keyed by employee id
pub trait TableStore: Send + Sync {
    /// Names of the tables available in the store
    fn table_names(&self) -> Result<Vec<String>>;

    /// Read one table, normalized
    fn read_table(&self, name: &str) -> Result<DataFrame>;

    /// Read every table at once, keyed by name
    fn snapshot(&self) -> Result<BTreeMap<String, DataFrame>> {
        let mut tables = BTreeMap::new();
        for name in self.table_names()? {
            let frame = self.read_table(&name)?;
            debug!(table = %name, rows = frame.height(), columns = frame.width(), "Read table");
            tables.insert(name, frame);
        }
        Ok(tables)
    }
}

/// Normalize a raw column header: trim, lowercase, spaces to `_`, and
/// `employee_id` to `employeeid`.
pub fn normalize_column_name(raw: &str) -> String {
    let name = raw.trim().to_lowercase().replace(' ', "_");
    if name == "employee_id" {
        "employeeid".to_string()
    } else {
        name
    }
}

/// Canonical table name for a file stem. The raw HR export names map to
/// their short table names; anything else is normalized like a column.
pub fn canonical_table_name(stem: &str) -> String {
    let key = stem.trim().to_lowercase();
    let mapped = match key.as_str() {
        "employee data" => "employees",
        "emplyee engagement data" | "employee engagement data" => "engagement",
        "employee compensation and benifit data" | "employee compensation and benefit data" => {
            "compensation"
        }
        "employee team and relationship data" => "team_and_relationship",
        "employee work pattern and behevioral data" | "employee work pattern and behavioral data" => {
            "work_patterns"
        }
        "employee carrer development data" | "employee career development data" => {
            "career_development"
        }
        "risk score" => "risk_scores",
        "external market data" => "external_market_data",
        "action table for retention" => "retention_actions",
        _ => return normalize_column_name(&key),
    };
    mapped.to_string()
}

/// Bring a freshly read frame into the normalized shape.
pub(crate) fn normalize_frame(table: &str, df: DataFrame, id_column: &str) -> Result<DataFrame> {
    let mut seen = HashSet::new();
    let mut columns: Vec<Column> = Vec::with_capacity(df.width());

    for column in df.get_columns() {
        let name = normalize_column_name(column.name().as_str());
        if !seen.insert(name.clone()) {
            warn!(table = %table, column = %name, "Duplicate column after normalization, keeping the first");
            continue;
        }

        let series = column.as_materialized_series();
        let target = if name == id_column {
            DataType::String
        } else {
            match series.dtype() {
                DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 |
                DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 |
                DataType::Float32 | DataType::Float64 | DataType::Boolean => DataType::Float64,
                _ => DataType::String,
            }
        };

        let normalized = series
            .cast(&target)
            .map_err(|e| AttritionError::DataError(format!("table '{}', column '{}': {}", table, name, e)))?
            .with_name(name.as_str().into());
        columns.push(Column::from(normalized));
    }

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name(" Employee ID "), "employeeid");
        assert_eq!(normalize_column_name("Monthly Salary"), "monthly_salary");
        assert_eq!(normalize_column_name("JobRole"), "jobrole");
    }

    #[test]
    fn test_canonical_table_name() {
        assert_eq!(canonical_table_name("Employee Data"), "employees");
        assert_eq!(canonical_table_name("Emplyee Engagement Data"), "engagement");
        assert_eq!(canonical_table_name("Risk Score"), "risk_scores");
        assert_eq!(canonical_table_name("bonus history"), "bonus_history");
    }

    #[test]
    fn test_normalize_frame_types() {
        let df = df! {
            "Employee ID" => &[101i64, 102, 103],
            "Monthly Salary" => &[5000i64, 6200, 7100],
            "Remote" => &[true, false, true],
            "Job Role" => &["Engineer", "Analyst", "Engineer"],
        }
        .unwrap();

        let normalized = normalize_frame("employees", df, DEFAULT_ID_COLUMN).unwrap();
        let names: Vec<String> = normalized.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["employeeid", "monthly_salary", "remote", "job_role"]);

        let ids = normalized.column("employeeid").unwrap().as_materialized_series().clone();
        assert_eq!(ids.dtype(), &DataType::String);
        assert_eq!(ids.str().unwrap().get(0), Some("101"));

        let salary = normalized.column("monthly_salary").unwrap().as_materialized_series().clone();
        assert_eq!(salary.dtype(), &DataType::Float64);
        assert_eq!(
            normalized.column("remote").unwrap().as_materialized_series().f64().unwrap().get(1),
            Some(0.0)
        );
    }
}
