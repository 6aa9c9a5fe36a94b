//! Directory of CSV / JSON table exports

use super::{canonical_table_name, normalize_frame, TableStore, DEFAULT_ID_COLUMN};
use crate::error::{AttritionError, Result};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Reads every `*.csv`, `*.json` and `*.jsonl` file of a directory as a
/// table named after its (canonicalized) file stem.
#[derive(Debug, Clone)]
pub struct CsvTableStore {
    root: PathBuf,
    id_column: String,
    infer_schema_length: usize,
}

impl CsvTableStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            infer_schema_length: 1000,
        }
    }

    /// Set the normalized name of the employee id column
    pub fn with_id_column(mut self, id_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self
    }

    /// Number of rows used for CSV schema inference
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entries(&self) -> Result<BTreeMap<String, PathBuf>> {
        let dir = std::fs::read_dir(&self.root).map_err(|e| {
            AttritionError::StoreUnavailable(format!("cannot read {}: {}", self.root.display(), e))
        })?;

        let mut entries: BTreeMap<String, PathBuf> = BTreeMap::new();
        for entry in dir {
            let path = entry
                .map_err(|e| AttritionError::StoreUnavailable(format!("{}: {}", self.root.display(), e)))?
                .path();
            if !path.is_file() || TableFormat::of(&path).is_none() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let name = canonical_table_name(stem);
            if let Some(previous) = entries.get(&name) {
                warn!(
                    table = %name,
                    kept = %previous.display(),
                    ignored = %path.display(),
                    "Two files map to the same table name"
                );
                continue;
            }
            entries.insert(name, path);
        }
        Ok(entries)
    }

    fn load(&self, path: &Path) -> Result<DataFrame> {
        let unavailable = |e: PolarsError| {
            AttritionError::StoreUnavailable(format!("cannot read {}: {}", path.display(), e))
        };

        match TableFormat::of(path) {
            Some(TableFormat::Csv) => CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(Some(self.infer_schema_length))
                .try_into_reader_with_file_path(Some(path.to_path_buf()))
                .map_err(unavailable)?
                .finish()
                .map_err(unavailable),
            Some(format) => {
                let file = File::open(path).map_err(|e| {
                    AttritionError::StoreUnavailable(format!("cannot open {}: {}", path.display(), e))
                })?;
                let json_format = if format == TableFormat::JsonLines {
                    JsonFormat::JsonLines
                } else {
                    JsonFormat::Json
                };
                JsonReader::new(file)
                    .with_json_format(json_format)
                    .finish()
                    .map_err(unavailable)
            }
            None => Err(AttritionError::StoreUnavailable(format!(
                "unsupported table file {}",
                path.display()
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableFormat {
    Csv,
    Json,
    JsonLines,
}

impl TableFormat {
    fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(TableFormat::Csv),
            "json" => Some(TableFormat::Json),
            "jsonl" | "ndjson" => Some(TableFormat::JsonLines),
            _ => None,
        }
    }
}

impl TableStore for CsvTableStore {
    fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.entries()?.into_keys().collect())
    }

    fn read_table(&self, name: &str) -> Result<DataFrame> {
        let entries = self.entries()?;
        let path = entries.get(name).ok_or_else(|| {
            AttritionError::StoreUnavailable(format!(
                "table '{}' not found in {}",
                name,
                self.root.display()
            ))
        })?;

        let raw = self.load(path)?;
        debug!(table = %name, path = %path.display(), rows = raw.height(), "Loaded table file");
        normalize_frame(name, raw, &self.id_column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &Path, file: &str, contents: &str) {
        let mut f = File::create(dir.join(file)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn test_reads_and_normalizes_directory() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "Employee Data.csv",
            "Employee_ID,Job Role,Monthly Salary\n1,Engineer,5000\n2,Analyst,4200\n",
        );
        write(dir.path(), "Risk Score.csv", "EmployeeID,RiskScore\n1,0.4\n");
        write(dir.path(), "notes.txt", "ignored");

        let store = CsvTableStore::new(dir.path());
        assert_eq!(store.table_names().unwrap(), vec!["employees", "risk_scores"]);

        let employees = store.read_table("employees").unwrap();
        assert_eq!(employees.height(), 2);
        let ids = employees.column("employeeid").unwrap().as_materialized_series().clone();
        assert_eq!(ids.str().unwrap().get(1), Some("2"));
        assert!(employees.column("job_role").is_ok());

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_files_mapping_to_one_table_keep_one() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Employee Data.csv", "EmployeeID,JobRole\n1,Engineer\n");
        write(dir.path(), "employees.csv", "EmployeeID,JobRole\n2,Analyst\n");

        let store = CsvTableStore::new(dir.path());
        assert_eq!(store.table_names().unwrap(), vec!["employees"]);
        assert_eq!(store.read_table("employees").unwrap().height(), 1);
    }

    #[test]
    fn test_missing_directory_is_unavailable() {
        let store = CsvTableStore::new("/definitely/not/here");
        let err = store.table_names().unwrap_err();
        assert!(matches!(err, AttritionError::StoreUnavailable(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unknown_table_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let store = CsvTableStore::new(dir.path());
        assert!(matches!(
            store.read_table("employees"),
            Err(AttritionError::StoreUnavailable(_))
        ));
    }
}
