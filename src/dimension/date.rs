//! Date dimension and the lenient date parser behind it.

use crate::core::{Table, Value};
use crate::dimension::DATE_ID;
use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%Y%m%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%B %d %Y",
];

/// Whether the date dimension keeps one row per fact row or one per date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRows {
    /// One row per sales fact row, repeated dates included
    #[default]
    PerFact,
    /// First occurrence of each date only
    Distinct,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateEntry {
    /// The parsed date itself, used as the key
    pub date_id: NaiveDateTime,
    pub day: u32,
    pub month: u32,
    /// Short month name, `Jan`..`Dec`
    pub month_name: String,
    pub year: i32,
}

impl DateEntry {
    pub fn from_datetime(date_id: NaiveDateTime) -> Self {
        Self {
            date_id,
            day: date_id.day(),
            month: date_id.month(),
            month_name: date_id.format("%b").to_string(),
            year: date_id.year(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateDim {
    entries: Vec<DateEntry>,
}

impl DateDim {
    pub const TABLE: &'static str = "DateDim";

    pub fn entries(&self) -> &[DateEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::with_columns(Self::TABLE, &[DATE_ID, "Day", "Month", "MonthName", "Year"]);
        table.rows_mut().extend(self.entries.iter().map(|e| {
            vec![
                Value::Timestamp(e.date_id),
                Value::Integer(i64::from(e.day)),
                Value::Integer(i64::from(e.month)),
                Value::Text(e.month_name.clone()),
                Value::Integer(i64::from(e.year)),
            ]
        }));
        table
    }
}

/// Decomposes each raw sales date into day, month, month name and year.
///
/// Fails on the first value that cannot be parsed; nothing is skipped.
pub fn build_date_dimension<'a, I>(sales_dates: I, rows: DateRows) -> Result<DateDim>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for raw in sales_dates {
        let parsed = parse_date_value(raw)?;
        if rows == DateRows::Distinct && !seen.insert(parsed) {
            continue;
        }
        entries.push(DateEntry::from_datetime(parsed));
    }
    Ok(DateDim { entries })
}

pub fn parse_date_value(value: &Value) -> Result<NaiveDateTime> {
    match value {
        Value::Timestamp(ts) => Ok(*ts),
        Value::Text(s) => parse_date(s),
        Value::Integer(i) => parse_date(&i.to_string()),
        other => Err(Error::DateParse(format!("{} ({})", other, other.type_name()))),
    }
}

fn ordinal_suffix() -> &'static Regex {
    static ORDINAL: OnceLock<Regex> = OnceLock::new();
    ORDINAL.get_or_init(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("valid ordinal regex"))
}

/// Parses a raw date or date-time string.
///
/// Date-only inputs get midnight. Offsets are dropped after parsing, keeping
/// the wall-clock time as written.
pub fn parse_date(raw: &str) -> Result<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::DateParse(raw.to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_local());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt);
        }
    }

    let normalized = ordinal_suffix().replace_all(trimmed, "$1").replace(',', " ");
    let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&normalized, fmt) {
            return Ok(date.and_time(chrono::NaiveTime::MIN));
        }
    }

    Err(Error::DateParse(raw.to_string()))
}
