use crate::core::Value;
use crate::error::{Error, Result};

/// A named, column-ordered table of rows.
///
/// Every row holds exactly one cell per column; [`Table::push_row`] rejects
/// anything else so downstream stages can index cells without checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Borrowed view of one row together with its column names.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Record<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns.iter().position(|c| c == column).map(|i| &self.values[i])
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self { name: name.into(), columns, rows: Vec::new() }
    }

    /// Builds a table from column names given as string slices.
    pub fn with_columns(name: impl Into<String>, columns: &[&str]) -> Self {
        Self::new(name, columns.iter().map(|c| (*c).to_string()).collect())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Direct row access for builders that construct rows of the right width.
    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<Value>> {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::Schema(format!(
                "{}: row {} has {} cells but the table has {} columns",
                self.name,
                self.rows.len(),
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn require_column(&self, column: &str) -> Result<usize> {
        self.column_index(column).ok_or_else(|| Error::MissingColumn {
            table: self.name.clone(),
            column: column.to_string(),
        })
    }

    pub fn require_columns(&self, columns: &[&str]) -> Result<()> {
        for column in columns {
            self.require_column(column)?;
        }
        Ok(())
    }

    /// Values of a single column in row order.
    pub fn column_values(&self, column: &str) -> Result<impl Iterator<Item = &Value> + '_> {
        let idx = self.require_column(column)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |values| Record { columns: &self.columns, values })
    }

    /// Inserts a column at `position`, one value per existing row.
    pub fn insert_column(
        &mut self,
        position: usize,
        name: impl Into<String>,
        values: Vec<Value>,
    ) -> Result<()> {
        let name = name.into();
        if values.len() != self.rows.len() {
            return Err(Error::Schema(format!(
                "{}: column '{}' has {} values for {} rows",
                self.name,
                name,
                values.len(),
                self.rows.len()
            )));
        }
        if self.column_index(&name).is_some() {
            return Err(Error::Schema(format!("{}: column '{}' already exists", self.name, name)));
        }
        let position = position.min(self.columns.len());
        self.columns.insert(position, name);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.insert(position, value);
        }
        Ok(())
    }

    /// Removes the named columns. Every name must exist.
    pub fn drop_columns(&mut self, names: &[&str]) -> Result<()> {
        let mut indices = names.iter().map(|n| self.require_column(n)).collect::<Result<Vec<_>>>()?;
        indices.sort_unstable();
        indices.dedup();
        for idx in indices.into_iter().rev() {
            self.columns.remove(idx);
            for row in &mut self.rows {
                row.remove(idx);
            }
        }
        Ok(())
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
