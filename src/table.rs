//! The per-user feature table.
//!
//! A [`FeatureTable`] is never edited in place. Metric columns are merged in
//! with [`FeatureTable::left_join`], which consumes the table and returns the
//! widened one, so every stage hands a finished table to the next.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::types::graph_query::GraphQuery;
use crate::types::{Corpus, UserId};

/// A single metric cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(u64),
    Float(f64),
}

impl Value {
    /// JSON rendering; non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(value) => serde_json::Value::from(*value),
            Value::Float(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{}", value),
        }
    }
}

/// One named metric keyed by user id, ready to be joined into a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricColumn {
    pub name: String,
    pub values: FxHashMap<UserId, Value>,
}

impl MetricColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: FxHashMap::default(),
        }
    }

    /// Builds a column from a per-vertex vector computed on `graph`.
    ///
    /// # Arguments
    ///
    /// * `name` - Column name, already prefixed if it is corpus-owned
    /// * `graph` - The graph the values were computed on; resolves vertex
    ///   indexes to user ids
    /// * `values` - One entry per vertex; `None` leaves the cell null
    pub fn from_vertex_values<G, T>(name: impl Into<String>, graph: &G, values: Vec<Option<T>>) -> Self
    where
        G: GraphQuery,
        T: Into<Value>,
    {
        let mut column = Self::new(name);
        for (vertex, value) in graph.vertex_list().into_iter().zip(values) {
            if let Some(value) = value {
                column.values.insert(graph.user_id(vertex).to_string(), value.into());
            }
        }
        column
    }

    pub fn insert(&mut self, user_id: impl Into<UserId>, value: impl Into<Value>) {
        self.values.insert(user_id.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Where a projected column takes its values from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSource {
    /// Column name in the projected table
    pub output: String,
    /// Column of the source table, or `None` for an all-null column
    pub source: Option<String>,
}

/// Borrowed view of one table row.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    pub user_id: &'a str,
    pub corpus: Corpus,
    pub cells: &'a [Option<Value>],
}

/// Per-user feature table with an ordered schema.
///
/// Rows are keyed by user id and keep insertion order; each row carries the
/// user's corpus and one optional cell per column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    columns: Vec<String>,
    row_ids: Vec<UserId>,
    row_corpus: Vec<Corpus>,
    cells: Vec<Vec<Option<Value>>>,
    row_index: FxHashMap<UserId, usize>,
}

impl FeatureTable {
    /// Creates a table with no columns over the given rows. A repeated user
    /// id keeps its first occurrence.
    pub fn from_rows(rows: impl IntoIterator<Item = (UserId, Corpus)>) -> Self {
        let mut table = FeatureTable::default();
        for (user_id, corpus) in rows {
            if table.row_index.contains_key(&user_id) {
                continue;
            }
            table.row_index.insert(user_id.clone(), table.row_ids.len());
            table.row_ids.push(user_id);
            table.row_corpus.push(corpus);
            table.cells.push(Vec::new());
        }
        table
    }

    /// Appends `column` to the schema. Rows without a value in `column` get a
    /// null cell, and values for users that are not rows are dropped.
    ///
    /// # Errors
    ///
    /// [`PipelineError::DuplicateColumn`] if the table already has a column
    /// with that name.
    pub fn left_join(mut self, column: &MetricColumn) -> Result<FeatureTable> {
        if self.column_index(&column.name).is_some() {
            return Err(PipelineError::DuplicateColumn(column.name.clone()));
        }
        self.columns.push(column.name.clone());
        for (user_id, row) in self.row_ids.iter().zip(self.cells.iter_mut()) {
            row.push(column.values.get(user_id).copied());
        }
        Ok(self)
    }

    /// Selects rows accepted by `keep_row` and builds the columns listed in
    /// `columns`, renaming them on the way.
    pub fn project<F>(&self, keep_row: F, columns: &[ColumnSource]) -> FeatureTable
    where
        F: Fn(Corpus) -> bool,
    {
        let sources: Vec<Option<usize>> = columns
            .iter()
            .map(|column| column.source.as_deref().and_then(|name| self.column_index(name)))
            .collect();

        let mut projected = FeatureTable::from_rows(
            self.rows()
                .filter(|row| keep_row(row.corpus))
                .map(|row| (row.user_id.to_string(), row.corpus)),
        );
        projected.columns = columns.iter().map(|column| column.output.clone()).collect();
        for (user_id, cells) in projected.row_ids.iter().zip(projected.cells.iter_mut()) {
            let source_row = &self.cells[self.row_index[user_id]];
            *cells = sources
                .iter()
                .map(|source| source.and_then(|index| source_row[index]))
                .collect();
        }
        projected
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn len(&self) -> usize {
        self.row_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    pub fn contains_row(&self, user_id: &str) -> bool {
        self.row_index.contains_key(user_id)
    }

    pub fn row_ids(&self) -> &[UserId] {
        &self.row_ids
    }

    /// Cell of `user_id` in `column`; `None` when the row, the column or the
    /// value is missing.
    pub fn get(&self, user_id: &str, column: &str) -> Option<Value> {
        let row = *self.row_index.get(user_id)?;
        let column = self.column_index(column)?;
        self.cells[row][column]
    }

    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> + '_ {
        self.row_ids
            .iter()
            .zip(self.row_corpus.iter())
            .zip(self.cells.iter())
            .map(|((user_id, corpus), cells)| RowView {
                user_id,
                corpus: *corpus,
                cells,
            })
    }

    /// Rows as JSON objects: `id`, then every column in schema order, null for
    /// missing cells.
    pub fn to_json_records(&self) -> serde_json::Value {
        let records = self
            .rows()
            .map(|row| {
                let mut record = serde_json::Map::new();
                record.insert("id".to_string(), serde_json::Value::from(row.user_id));
                for (name, cell) in self.columns.iter().zip(row.cells) {
                    let value = cell.map(|v| v.to_json()).unwrap_or(serde_json::Value::Null);
                    record.insert(name.clone(), value);
                }
                serde_json::Value::Object(record)
            })
            .collect();
        serde_json::Value::Array(records)
    }
}
