use crate::error::Result;
use crate::fact::Rejection;
use crate::load::StagingTable;
use crate::pipeline::StarSchema;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What a finished run staged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub sales_rows: usize,
    pub budget_rows: usize,
    pub product_rows: usize,
    pub location_rows: usize,
    pub date_rows: usize,
    pub rejected: usize,
    /// Set when a rejection report was written
    pub rejections_path: Option<PathBuf>,
    pub elapsed_ms: u128,
}

impl RunSummary {
    pub fn from_schema(schema: &StarSchema, elapsed: Duration) -> Self {
        RunSummary {
            sales_rows: schema.row_count(StagingTable::Sales),
            budget_rows: schema.row_count(StagingTable::Budget),
            product_rows: schema.row_count(StagingTable::Product),
            location_rows: schema.row_count(StagingTable::Location),
            date_rows: schema.row_count(StagingTable::Date),
            rejected: schema.rejections.len(),
            rejections_path: None,
            elapsed_ms: elapsed.as_millis(),
        }
    }
}

/// Writes the rejections as a pretty-printed JSON array.
pub fn write_rejections(path: &Path, rejections: &[Rejection]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, rejections)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}
