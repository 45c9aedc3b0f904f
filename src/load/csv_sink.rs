use crate::core::Table;
use crate::error::Result;
use crate::load::TableSink;
use crate::sources::sqlite_adapter::quoted_identifier;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes each staged table to `<directory>/<target>.csv`.
pub struct CsvSink {
    directory: PathBuf,
    delimiter: u8,
}

impl CsvSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        CsvSink { directory: directory.into(), delimiter: b',' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path_for(&self, target: &str) -> PathBuf {
        self.directory.join(format!("{}.csv", target))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl TableSink for CsvSink {
    fn describe(&self) -> String {
        format!("csv:{}", self.directory.display())
    }

    fn load(&mut self, table: &Table, target: &str, _ddl: Option<&str>) -> Result<()> {
        quoted_identifier(target)?;
        fs::create_dir_all(&self.directory)?;
        let mut writer = csv::WriterBuilder::new().delimiter(self.delimiter).from_path(self.path_for(target))?;
        writer.write_record(table.columns())?;
        for row in table.rows() {
            writer.write_record(row.iter().map(ToString::to_string))?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::sources::{CsvSource, TableSource};

    #[test]
    fn test_written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = Table::with_columns("Product", &["ProductId", "ProductName", "ProductVendor"]);
        table.push_row(vec![0i64.into(), "Product1".into(), Value::Null]).unwrap();
        table.push_row(vec![1i64.into(), "Product, Two".into(), "Amazon".into()]).unwrap();

        let mut sink = CsvSink::new(dir.path().join("staging"));
        sink.load(&table, "Product", None).unwrap();

        let back = CsvSource::new(sink.path_for("Product"), "Product", b',').extract().unwrap();
        assert_eq!(back.rows(), table.rows());
    }

    #[test]
    fn test_target_must_be_plain_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path());
        let table = Table::with_columns("x", &["a"]);
        assert!(sink.load(&table, "../escape", None).is_err());
    }
}
