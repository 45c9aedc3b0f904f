//! Sinks that stage the star schema, plus the DDL scripts that shape it.

pub mod csv_sink;
pub mod ddl;
pub mod json_sink;
pub mod sqlite_loader;

pub use csv_sink::CsvSink;
pub use ddl::{DdlCatalog, StagingTable, SOURCE_SALES_SCRIPT};
pub use json_sink::JsonLinesSink;
pub use sqlite_loader::SqliteLoader;

use crate::core::Table;
use crate::error::Result;

/// Destination for staged tables.
///
/// `load` replaces whatever `target` held before. Sinks without a schema
/// ignore `ddl`.
pub trait TableSink: Send {
    fn describe(&self) -> String;

    fn load(&mut self, table: &Table, target: &str, ddl: Option<&str>) -> Result<()>;
}
