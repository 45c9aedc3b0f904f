use crate::core::value::TIMESTAMP_FORMAT;
use crate::core::{Table, Value};
use crate::error::{Error, Result};
use crate::load::TableSink;
use crate::sources::sqlite_adapter::{quoted_column, quoted_identifier};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, Transaction};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stages tables into a SQLite database.
///
/// Each load runs in its own transaction: the target is dropped, recreated
/// from the DDL script (or from the data when there is none) and filled.
/// A failed load leaves the previous contents in place.
pub struct SqliteLoader {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteLoader {
    /// Opens or creates the database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(SqliteLoader { conn: Connection::open(path)?, path: Some(path.to_path_buf()) })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(SqliteLoader { conn: Connection::open_in_memory()?, path: None })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl TableSink for SqliteLoader {
    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("sqlite:{}", path.display()),
            None => "sqlite::memory:".to_string(),
        }
    }

    fn load(&mut self, table: &Table, target: &str, ddl: Option<&str>) -> Result<()> {
        let quoted = quoted_identifier(target)?;
        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", quoted))?;
        match ddl {
            Some(script) => {
                tx.execute_batch(script)?;
                add_missing_columns(&tx, target, table)?;
            }
            None if table.columns().is_empty() => {
                return Err(Error::Load(format!("cannot infer a schema for '{}' without columns", target)));
            }
            None => tx.execute_batch(&create_statement(&quoted, table))?,
        }
        insert_rows(&tx, &quoted, table)?;
        tx.commit()?;
        debug!(target, rows = table.len(), "table staged");
        Ok(())
    }
}

fn insert_rows(tx: &Transaction<'_>, quoted: &str, table: &Table) -> Result<()> {
    if table.is_empty() {
        return Ok(());
    }
    let columns: Vec<String> = table.columns().iter().map(|c| quoted_column(c)).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!("INSERT INTO {} ({}) VALUES ({})", quoted, columns.join(", "), placeholders);
    let mut stmt = tx.prepare(&sql)?;
    for row in table.rows() {
        stmt.execute(params_from_iter(row.iter()))?;
    }
    Ok(())
}

/// Columns of `target` as SQLite reports them; empty when the table is absent.
fn existing_columns(tx: &Transaction<'_>, target: &str) -> Result<Vec<String>> {
    let mut stmt = tx.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let names = stmt.query_map([target], |row| row.get::<_, String>(0))?;
    Ok(names.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Extends a DDL-created table with columns the data carries but the script
/// does not declare.
fn add_missing_columns(tx: &Transaction<'_>, target: &str, table: &Table) -> Result<()> {
    let existing = existing_columns(tx, target)?;
    if existing.is_empty() {
        return Err(Error::Load(format!("DDL script did not create table '{}'", target)));
    }
    let quoted = quoted_identifier(target)?;
    for (idx, column) in table.columns().iter().enumerate() {
        if existing.iter().any(|c| c.eq_ignore_ascii_case(column)) {
            continue;
        }
        let affinity = column_affinity(table, idx);
        debug!(target, column = %column, affinity, "adding column not declared by DDL");
        tx.execute_batch(&format!("ALTER TABLE {} ADD COLUMN {} {}", quoted, quoted_column(column), affinity))?;
    }
    Ok(())
}

fn create_statement(quoted: &str, table: &Table) -> String {
    let columns: Vec<String> = (0..table.columns().len())
        .map(|idx| format!("{} {}", quoted_column(&table.columns()[idx]), column_affinity(table, idx)))
        .collect();
    format!("CREATE TABLE {} ({})", quoted, columns.join(", "))
}

/// Affinity that fits every non-null value in the column.
fn column_affinity(table: &Table, idx: usize) -> &'static str {
    let mut affinity = None;
    for row in table.rows() {
        let next = match &row[idx] {
            Value::Null => continue,
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) | Value::Timestamp(_) => "TEXT",
        };
        affinity = Some(match (affinity, next) {
            (None, n) => n,
            (Some(a), n) if a == n => a,
            (Some("INTEGER" | "REAL"), "INTEGER" | "REAL") => "REAL",
            _ => "TEXT",
        });
    }
    affinity.unwrap_or("TEXT")
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Timestamp(ts) => {
                ToSqlOutput::Owned(SqlValue::Text(ts.format(TIMESTAMP_FORMAT).to_string()))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::sqlite_adapter::read_table;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn location_table() -> Table {
        let mut t = Table::with_columns("Location", &["LocationId", "Country", "Capital", "Latitude", "Longitude"]);
        t.push_row(vec![0i64.into(), "india".into(), "New Delhi".into(), 20.0.into(), 77.0.into()]).unwrap();
        t.push_row(vec![1i64.into(), "uk".into(), "London".into(), 54.0.into(), (-2.0).into()]).unwrap();
        t
    }

    #[test]
    fn test_load_without_ddl_infers_affinity() {
        let mut loader = SqliteLoader::in_memory().unwrap();
        loader.load(&location_table(), "Location", None).unwrap();

        let sql: String = loader
            .connection()
            .query_row("SELECT sql FROM sqlite_master WHERE name = 'Location'", [], |r| r.get(0))
            .unwrap();
        assert!(sql.contains("\"Latitude\" REAL"));
        assert!(sql.contains("\"LocationId\" INTEGER"));

        let back = read_table(loader.connection(), "Location").unwrap();
        assert_eq!(back.rows(), location_table().rows());
    }

    #[test]
    fn test_reload_replaces_previous_rows() {
        let mut loader = SqliteLoader::in_memory().unwrap();
        let ddl = "CREATE TABLE IF NOT EXISTS Location (LocationId INTEGER PRIMARY KEY, Country TEXT, Capital TEXT, Latitude REAL, Longitude REAL);";
        loader.load(&location_table(), "Location", Some(ddl)).unwrap();
        loader.load(&location_table(), "Location", Some(ddl)).unwrap();

        let count: i64 =
            loader.connection().query_row("SELECT COUNT(*) FROM Location", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_failed_load_rolls_back() {
        let mut loader = SqliteLoader::in_memory().unwrap();
        let ddl = "CREATE TABLE IF NOT EXISTS Location (LocationId INTEGER PRIMARY KEY, Country TEXT, Capital TEXT, Latitude REAL, Longitude REAL);";
        loader.load(&location_table(), "Location", Some(ddl)).unwrap();

        let mut duplicate = location_table();
        duplicate.push_row(vec![0i64.into(), "usa".into(), "Washington".into(), 38.0.into(), (-97.0).into()]).unwrap();
        assert!(matches!(loader.load(&duplicate, "Location", Some(ddl)), Err(Error::Sqlite(_))));

        let count: i64 =
            loader.connection().query_row("SELECT COUNT(*) FROM Location", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_extra_columns_are_added_to_ddl_table() {
        let mut loader = SqliteLoader::in_memory().unwrap();
        let mut table = Table::with_columns("Product", &["ProductId", "ProductName", "Weight"]);
        table.push_row(vec![0i64.into(), "Product1".into(), 1.5.into()]).unwrap();
        loader
            .load(&table, "Product", Some("CREATE TABLE Product (ProductId INTEGER PRIMARY KEY, ProductName TEXT);"))
            .unwrap();

        let weight: f64 = loader.connection().query_row("SELECT Weight FROM Product", [], |r| r.get(0)).unwrap();
        assert!((weight - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ddl_for_another_table_is_rejected() {
        let mut loader = SqliteLoader::in_memory().unwrap();
        let err = loader.load(&location_table(), "Location", Some("CREATE TABLE Other (x INTEGER);")).unwrap_err();
        assert!(matches!(err, Error::Load(_)));
    }

    #[test]
    fn test_timestamps_stored_as_text() {
        let mut loader = SqliteLoader::in_memory().unwrap();
        let mut table = Table::with_columns("DateDim", &["DateId"]);
        let ts = NaiveDate::from_ymd_opt(2018, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
        table.push_row(vec![ts.into()]).unwrap();
        loader.load(&table, "DateDim", None).unwrap();

        let stored: String = loader.connection().query_row("SELECT DateId FROM DateDim", [], |r| r.get(0)).unwrap();
        assert_eq!(stored, "2018-01-02 00:00:00");
    }
}
