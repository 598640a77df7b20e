//! In-memory tabular dataset: a fixed, ordered set of declared columns and
//! rows holding exactly one [`CellValue`] per column.
//!
//! Column presence is checked explicitly through [`Dataset::require_column`]
//! so a misspelled key or mapping column surfaces as a schema error instead of
//! silently reading empty cells.

use std::collections::HashMap;

use anyhow::{Result, ensure};

use crate::{
    data::{CellValue, ColumnType},
    error::{MergeError, MergeResult},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    name: String,
    columns: Vec<String>,
    column_types: Vec<ColumnType>,
    lookup: HashMap<String, usize>,
    rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        let lookup = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| (column.clone(), idx))
            .collect();
        Dataset {
            name: name.into(),
            column_types: vec![ColumnType::Any; columns.len()],
            columns,
            lookup,
            rows: Vec::new(),
        }
    }

    /// Builds a dataset from adapter text; every cell goes through
    /// [`CellValue::from_raw`].
    pub fn from_records<S: AsRef<str>>(
        name: impl Into<String>,
        headers: &[S],
        records: &[Vec<S>],
    ) -> Result<Self> {
        let columns = headers
            .iter()
            .map(|h| h.as_ref().to_string())
            .collect::<Vec<_>>();
        let mut dataset = Dataset::new(name, columns);
        for record in records {
            let cells = record
                .iter()
                .map(|raw| CellValue::from_raw(raw.as_ref()))
                .collect();
            dataset.push_row(cells)?;
        }
        Ok(dataset)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, cells: Vec<CellValue>) -> Result<()> {
        ensure!(
            cells.len() == self.columns.len(),
            "Row {} of '{}' has {} cell(s) but {} column(s) are declared",
            self.rows.len(),
            self.name,
            cells.len(),
            self.columns.len()
        );
        self.rows.push(cells);
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    pub fn require_column(&self, name: &str) -> MergeResult<usize> {
        self.column_index(name)
            .ok_or_else(|| MergeError::schema(&self.name, name))
    }

    pub fn column_type(&self, column: usize) -> ColumnType {
        self.column_types.get(column).copied().unwrap_or_default()
    }

    pub fn set_column_type(&mut self, name: &str, column_type: ColumnType) -> MergeResult<()> {
        let idx = self.require_column(name)?;
        self.column_types[idx] = column_type;
        Ok(())
    }

    /// Appends a column filled with empty cells and returns its position.
    /// An existing column of the same name is reused.
    pub fn add_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index(name) {
            return idx;
        }
        let idx = self.columns.len();
        self.columns.push(name.to_string());
        self.column_types.push(ColumnType::Any);
        self.lookup.insert(name.to_string(), idx);
        for row in &mut self.rows {
            row.push(CellValue::Empty);
        }
        idx
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|cells| cells.get(column))
    }

    /// Value of the named column, or `Empty` when the column or row is absent.
    pub fn value(&self, row: usize, column: &str) -> CellValue {
        self.column_index(column)
            .and_then(|idx| self.cell(row, idx))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_cell(&mut self, row: usize, column: usize, value: CellValue) -> Result<()> {
        let row_count = self.rows.len();
        let cell = self
            .rows
            .get_mut(row)
            .and_then(|cells| cells.get_mut(column))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Cell ({row}, {column}) is outside '{}' ({row_count} row(s))",
                    self.name
                )
            })?;
        *cell = value;
        Ok(())
    }

    /// Rows rendered as display strings, for writers and previews.
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(CellValue::as_display).collect())
            .collect()
    }
}
