//! # Tabular Dataset
//!
//! An immutable, columnar, in-memory table: an ordered column list, a
//! declared type per column, and equal-length cell vectors. Datasets are
//! materialized by an external loader and never mutated by this crate;
//! every operation that "changes" rows builds a fresh dataset.
//!
//! The access surface is deliberately narrow: ordered column names, a typed
//! per-column accessor, row count, and boolean-mask row selection. The query
//! executor dispatches on the declared [`DataType`] tag, never on the runtime
//! shape of individual cells.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::{DataType, Value};

/// Dataset construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatasetError {
    /// Two columns share a name
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    /// Column lengths disagree
    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },
}

/// Result type for dataset construction
pub type DatasetResult<T> = Result<T, DatasetError>;

/// A single named, typed column with its cells
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    #[serde(skip)]
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType, values: Vec<Value>) -> Self {
        Column {
            name: name.into(),
            data_type,
            values,
        }
    }
}

/// An immutable in-memory table of named, typed columns
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Column names in declared order
    columns: Vec<String>,
    /// Declared type per column
    types: HashMap<String, DataType>,
    /// Cell storage, one equal-length vector per column
    cells: HashMap<String, Vec<Value>>,
    row_count: usize,
}

impl Dataset {
    /// Create an empty dataset (zero rows, zero columns)
    pub fn new() -> Self {
        Dataset::default()
    }

    /// Build a dataset from columns, validating shape.
    ///
    /// Fails on duplicate column names or columns of unequal length; the
    /// first column fixes the expected row count.
    pub fn from_columns(columns: Vec<Column>) -> DatasetResult<Self> {
        let mut dataset = Dataset::new();
        let mut expected: Option<usize> = None;

        for column in columns {
            if dataset.types.contains_key(&column.name) {
                return Err(DatasetError::DuplicateColumn(column.name));
            }
            let len = column.values.len();
            match expected {
                None => expected = Some(len),
                Some(n) if n != len => {
                    return Err(DatasetError::RaggedColumn {
                        column: column.name,
                        expected: n,
                        actual: len,
                    });
                }
                Some(_) => {}
            }
            dataset.columns.push(column.name.clone());
            dataset.types.insert(column.name.clone(), column.data_type);
            dataset.cells.insert(column.name, column.values);
        }

        dataset.row_count = expected.unwrap_or(0);
        Ok(dataset)
    }

    /// Column names in declared order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Declared type of a column
    pub fn column_type(&self, name: &str) -> Option<DataType> {
        self.types.get(name).copied()
    }

    /// Cell vector of a column
    pub fn values(&self, name: &str) -> Option<&[Value]> {
        self.cells.get(name).map(Vec::as_slice)
    }

    /// Single cell lookup
    pub fn value_at(&self, name: &str, row: usize) -> Option<&Value> {
        self.cells.get(name).and_then(|v| v.get(row))
    }

    /// Column names whose declared type is numeric, in declared order
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| self.types.get(*c).is_some_and(DataType::is_numeric))
            .cloned()
            .collect()
    }

    /// Column names whose declared type is string, in declared order
    pub fn string_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| self.types.get(*c) == Some(&DataType::String))
            .cloned()
            .collect()
    }

    /// Select rows where the mask is true, producing a fresh dataset.
    ///
    /// A mask shorter than the table treats missing entries as false.
    pub fn select(&self, mask: &[bool]) -> Dataset {
        let mut cells = HashMap::with_capacity(self.cells.len());
        let mut selected = 0;

        for (name, column) in &self.cells {
            let filtered: Vec<Value> = column
                .iter()
                .zip(mask.iter().chain(std::iter::repeat(&false)))
                .filter_map(|(v, keep)| keep.then(|| v.clone()))
                .collect();
            selected = filtered.len();
            cells.insert(name.clone(), filtered);
        }

        Dataset {
            columns: self.columns.clone(),
            types: self.types.clone(),
            cells,
            row_count: if self.columns.is_empty() { 0 } else { selected },
        }
    }

    /// Project one row into a JSON object, columns in declared order.
    ///
    /// Cells are normalized through [`Value::to_json`], so nulls and
    /// non-finite floats serialize as JSON null.
    pub fn row_json(&self, row: usize) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::with_capacity(self.columns.len());
        for name in &self.columns {
            let cell = self
                .value_at(name, row)
                .map_or(serde_json::Value::Null, Value::to_json);
            map.insert(name.clone(), cell);
        }
        map
    }

    /// Count of null cells in a column
    pub fn null_count(&self, name: &str) -> usize {
        self.values(name)
            .map_or(0, |vs| vs.iter().filter(|v| v.is_null()).count())
    }
}
