use crate::core::Table;
use crate::error::Result;
use crate::load::TableSink;
use crate::sources::sqlite_adapter::quoted_identifier;
use serde_json::{Map, Value as Json};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Writes each table to `<directory>/<target>.jsonl`, one object per row with
/// keys in column order. This is the document-store export layout.
pub struct JsonLinesSink {
    directory: PathBuf,
}

impl JsonLinesSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        JsonLinesSink { directory: directory.into() }
    }

    pub fn path_for(&self, target: &str) -> PathBuf {
        self.directory.join(format!("{}.jsonl", target))
    }
}

impl TableSink for JsonLinesSink {
    fn describe(&self) -> String {
        format!("jsonl:{}", self.directory.display())
    }

    fn load(&mut self, table: &Table, target: &str, _ddl: Option<&str>) -> Result<()> {
        quoted_identifier(target)?;
        fs::create_dir_all(&self.directory)?;
        let mut out = BufWriter::new(File::create(self.path_for(target))?);
        for record in table.records() {
            let mut doc = Map::new();
            for (column, value) in table.columns().iter().zip(record.values()) {
                doc.insert(column.clone(), serde_json::to_value(value)?);
            }
            serde_json::to_writer(&mut out, &Json::Object(doc))?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::sources::{DocumentSource, TableSource};
    use chrono::NaiveDate;

    #[test]
    fn test_documents_read_back_in_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2018, 2, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let mut table = Table::with_columns("Budget", &["BudgetDate", "BudgetAmt", "Product", "Location"]);
        table.push_row(vec![date.into(), 5000i64.into(), "Product1".into(), "USA".into()]).unwrap();

        let mut sink = JsonLinesSink::new(dir.path());
        sink.load(&table, "BudgetCollection", None).unwrap();

        let text = fs::read_to_string(sink.path_for("BudgetCollection")).unwrap();
        assert_eq!(
            text,
            "{\"BudgetDate\":\"2018-02-01 00:00:00\",\"BudgetAmt\":5000,\"Product\":\"Product1\",\"Location\":\"USA\"}\n"
        );

        let back = DocumentSource::new(sink.path_for("BudgetCollection"), "Budget").extract().unwrap();
        assert_eq!(back.columns(), table.columns());
        assert_eq!(back.get(0, "BudgetAmt"), Some(&Value::Integer(5000)));
    }
}
