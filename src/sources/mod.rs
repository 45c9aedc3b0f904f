//! Readers for the three source systems.
//!
//! Each reader extracts one whole table; the pipeline checks the required
//! columns before the transform stage runs.

pub mod csv_adapter;
pub mod document_adapter;
pub mod sqlite_adapter;
pub mod table_source;

pub use csv_adapter::CsvSource;
pub use document_adapter::DocumentSource;
pub use sqlite_adapter::SqliteSource;
pub use table_source::{TableSource, BUDGET_COLUMNS, PRODUCT_COLUMNS, SALES_COLUMNS};
