use super::{normalize_frame, TableStore, DEFAULT_ID_COLUMN};
use crate::error::{AttritionError, Result};
use polars::prelude::*;
use std::collections::BTreeMap;

/// Tables held in memory. Frames are normalized on read like any other store.
#[derive(Debug, Clone)]
pub struct InMemoryTableStore {
    tables: BTreeMap<String, DataFrame>,
    id_column: String,
}

impl Default for InMemoryTableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
        }
    }

    pub fn with_id_column(mut self, id_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self
    }

    pub fn with_table(mut self, name: impl Into<String>, frame: DataFrame) -> Self {
        self.insert(name, frame);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, frame: DataFrame) {
        self.tables.insert(name.into(), frame);
    }
}

impl TableStore for InMemoryTableStore {
    fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    fn read_table(&self, name: &str) -> Result<DataFrame> {
        let frame = self
            .tables
            .get(name)
            .ok_or_else(|| AttritionError::StoreUnavailable(format!("table '{}' not found", name)))?;
        normalize_frame(name, frame.clone(), &self.id_column)
    }
}
