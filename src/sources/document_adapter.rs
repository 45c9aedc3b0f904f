//! Reader for document-store exports.
//!
//! Budget documents arrive as either a JSON array of objects or JSON lines
//! (one object per line, as `mongoexport` writes them). Extended-JSON type
//! wrappers are unwrapped to plain values.

use crate::core::{Table, Value};
use crate::dimension::parse_date;
use crate::error::{Error, Result};
use crate::sources::table_source::TableSource;
use serde_json::{Map, Value as Json};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

/// Field every stored document carries; not part of the data.
pub const DOCUMENT_ID: &str = "_id";

pub struct DocumentSource {
    path: PathBuf,
    name: String,
}

impl DocumentSource {
    /// `name` becomes the table name of the extracted rows.
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        DocumentSource { path: path.into(), name: name.into() }
    }
}

impl TableSource for DocumentSource {
    fn describe(&self) -> String {
        format!("documents:{}", self.path.display())
    }

    fn extract(&self) -> Result<Table> {
        let text = fs::read_to_string(&self.path).map_err(|e| {
            Error::Source(format!("cannot read documents {}: {}", self.path.display(), e))
        })?;
        documents_to_table(&self.name, &parse_documents(&text)?)
    }
}

/// Parses a JSON array of objects or newline-delimited objects.
pub fn parse_documents(text: &str) -> Result<Vec<Map<String, Json>>> {
    if text.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(text)?);
    }
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line)
                .map_err(|e| Error::Source(format!("document on line {} is not a JSON object: {}", n + 1, e)))
        })
        .collect()
}

/// Flattens documents into a table whose columns are the union of keys in
/// first-seen order, without `_id`. Absent keys become null.
pub fn documents_to_table(name: &str, documents: &[Map<String, Json>]) -> Result<Table> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for key in documents.iter().flat_map(Map::keys) {
        if key != DOCUMENT_ID && seen.insert(key.as_str()) {
            columns.push(key.clone());
        }
    }

    let mut table = Table::new(name, columns);
    for doc in documents {
        let row = table.columns().iter().map(|c| doc.get(c).map_or(Value::Null, json_to_value)).collect();
        table.push_row(row)?;
    }
    Ok(table)
}

pub fn json_to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Integer(i64::from(*b)),
        Json::Number(n) => n.as_i64().map_or_else(|| Value::Real(n.as_f64().unwrap_or(f64::NAN)), Value::Integer),
        Json::String(s) => Value::Text(s.clone()),
        Json::Object(obj) => unwrap_extended(obj).unwrap_or_else(|| Value::Text(json.to_string())),
        Json::Array(_) => Value::Text(json.to_string()),
    }
}

fn unwrap_extended(obj: &Map<String, Json>) -> Option<Value> {
    if obj.len() != 1 {
        return None;
    }
    let (key, inner) = obj.iter().next()?;
    match (key.as_str(), inner) {
        ("$date", Json::String(s)) => Some(parse_date(s).map_or_else(|_| Value::Text(s.clone()), Value::Timestamp)),
        ("$date", Json::Object(_)) => unwrap_extended(inner.as_object()?).map(|v| match v {
            Value::Integer(ms) => from_millis(ms),
            other => other,
        }),
        ("$date", Json::Number(n)) => n.as_i64().map(from_millis),
        ("$numberLong" | "$numberInt", Json::String(s)) => s.parse().ok().map(Value::Integer),
        ("$numberDouble", Json::String(s)) => s.parse().ok().map(Value::Real),
        ("$oid", Json::String(s)) => Some(Value::Text(s.clone())),
        _ => None,
    }
}

fn from_millis(ms: i64) -> Value {
    chrono::DateTime::from_timestamp_millis(ms).map_or(Value::Integer(ms), |dt| Value::Timestamp(dt.naive_utc()))
}
