use crate::core::{Table, Value};
use crate::error::{Error, Result};
use crate::sources::table_source::TableSource;
use csv::ReaderBuilder;
use std::io::Read;
use std::path::PathBuf;

/// Reads a delimited file whose first row names the columns.
pub struct CsvSource {
    path: PathBuf,
    name: String,
    delimiter: u8,
    text_columns: Vec<String>,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>, delimiter: u8) -> Self {
        CsvSource { path: path.into(), name: name.into(), delimiter, text_columns: Vec::new() }
    }

    /// Keeps the named columns as text instead of inferring a type, so
    /// natural keys such as `007` survive unchanged.
    pub fn with_text_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

impl TableSource for CsvSource {
    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }

    fn extract(&self) -> Result<Table> {
        if !self.path.exists() {
            return Err(Error::Source(format!("file {} does not exist", self.path.display())));
        }
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .trim(csv::Trim::Headers)
            .from_path(&self.path)?;
        read_csv(&self.name, reader, &self.text_columns)
    }
}

/// Drains a CSV reader into a table, inferring a type for every cell outside
/// `text_columns`. Blank cells are null in every column.
pub fn read_csv<R: Read>(name: &str, mut reader: csv::Reader<R>, text_columns: &[String]) -> Result<Table> {
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let as_text: Vec<bool> = columns.iter().map(|c| text_columns.contains(c)).collect();
    let mut table = Table::new(name, columns);
    for record in reader.records() {
        let record = record?;
        let row = record
            .iter()
            .zip(&as_text)
            .map(|(cell, &text)| {
                if text && !cell.trim().is_empty() {
                    Value::Text(cell.to_string())
                } else {
                    Value::infer(cell)
                }
            })
            .collect();
        table.push_row(row)?;
    }
    Ok(table)
}
