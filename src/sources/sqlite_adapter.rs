use crate::core::{Table, Value};
use crate::error::{Error, Result};
use crate::sources::table_source::TableSource;
use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Reads a whole table from a SQLite database.
pub struct SqliteSource {
    database: PathBuf,
    table: String,
}

impl SqliteSource {
    pub fn new(database: impl Into<PathBuf>, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        quoted_identifier(&table)?;
        Ok(SqliteSource { database: database.into(), table })
    }

    pub fn database(&self) -> &Path {
        &self.database
    }
}

impl TableSource for SqliteSource {
    fn describe(&self) -> String {
        format!("sqlite:{}/{}", self.database.display(), self.table)
    }

    fn extract(&self) -> Result<Table> {
        if !self.database.exists() {
            return Err(Error::Source(format!("database {} does not exist", self.database.display())));
        }
        let conn = Connection::open_with_flags(
            &self.database,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        read_table(&conn, &self.table)
    }
}

/// Runs `SELECT *` over `table` on an open connection.
pub fn read_table(conn: &Connection, table: &str) -> Result<Table> {
    let sql = format!("SELECT * FROM {}", quoted_identifier(table)?);
    let mut stmt = conn.prepare(&sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();
    let mut out = Table::new(table, columns);

    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let values =
            (0..width).map(|i| row.get_ref(i).map(Value::from)).collect::<rusqlite::Result<Vec<_>>>()?;
        out.push_row(values)?;
    }
    Ok(out)
}

fn identifier_pattern() -> &'static Regex {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
}

/// Validates a table name and returns it double-quoted for SQL.
pub(crate) fn quoted_identifier(name: &str) -> Result<String> {
    if identifier_pattern().is_match(name) {
        Ok(format!("\"{}\"", name))
    } else {
        Err(Error::Config(format!("'{}' is not a valid table name", name)))
    }
}

/// Double-quotes an arbitrary column name, doubling embedded quotes.
pub(crate) fn quoted_column(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                Value::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}
