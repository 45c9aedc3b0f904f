//! # salesmart
//!
//! salesmart stages sales and budget records from three heterogeneous sources
//! (a SQLite database, a document-store export and a CSV file) into a star
//! schema: two fact tables (`Sales`, `Budget`) that reference three dimension
//! tables (`Location`, `Product`, `DateDim`) through surrogate keys.
//!
//! The interesting part is the transform stage:
//!
//! - [`dimension`] builds the dimensions and assigns surrogate keys
//! - [`fact`] resolves natural keys in fact rows to those surrogate keys
//! - [`geo`] enriches locations through an external country lookup
//!
//! Extraction and loading live in [`sources`] and [`load`], and
//! [`pipeline::EtlPipeline`] runs the phases in order.
//!
//! ## Example
//!
//! ```rust
//! use salesmart::dimension::build_product_dimension;
//! use salesmart::{Table, Value};
//!
//! fn example() -> salesmart::Result<()> {
//!     let mut products = Table::new("Products", vec!["ProductName".to_string()]);
//!     products.push_row(vec![Value::from("Product1")])?;
//!     let dim = build_product_dimension(products)?;
//!     assert_eq!(dim.table().columns()[0], "ProductId");
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]

/// Configuration structures and layered loading
pub mod config;

/// Cell values and in-memory tables
pub mod core;

/// Dimension tables and their builders
pub mod dimension;

/// Fact normalization against the dimensions
pub mod fact;

/// Country lookup capability and its implementations
pub mod geo;

/// Sinks for staged tables and the bundled DDL scripts
pub mod load;

/// Phase orchestration for a full run
pub mod pipeline;

/// Sample source data generation
pub mod render;

/// Readers for the three source systems
pub mod sources;

pub mod error {
    //! Error types and result definitions

    use crate::geo::GeoError;
    use thiserror::Error;

    /// Result type alias for salesmart operations
    pub type Result<T> = std::result::Result<T, Error>;

    /// Main error type for salesmart
    #[derive(Debug, Error)]
    pub enum Error {
        /// The country service has no record for the name
        #[error("location '{0}' was not found by the country lookup")]
        LookupNotFound(String),

        /// The country service could not be reached or answered badly
        #[error("country lookup unavailable for '{name}': {reason}")]
        LookupUnavailable { name: String, reason: String },

        /// A raw date cell that no known format accepts
        #[error("cannot parse date '{0}'")]
        DateParse(String),

        /// A fact row whose location is not in the location dimension
        #[error("{table} row {row}: location '{value}' has no match in the location dimension")]
        UnresolvedLocation { table: String, row: usize, value: String },

        /// A fact row whose product is not in the product dimension
        #[error("{table} row {row}: product '{value}' has no match in the product dimension")]
        UnresolvedProduct { table: String, row: usize, value: String },

        /// Two rows share a natural key that must be unique
        #[error("{table}: duplicate {column} '{value}'")]
        DuplicateNaturalKey { table: String, column: String, value: String },

        /// A source table lacks a column the pipeline reads
        #[error("{table}: missing required column '{column}'")]
        MissingColumn { table: String, column: String },

        /// Row/column shape mismatch
        #[error("Schema error: {0}")]
        Schema(String),

        /// Configuration error
        #[error("Configuration error: {0}")]
        Config(String),

        /// Source extraction error
        #[error("Source error: {0}")]
        Source(String),

        /// Loader error
        #[error("Load error: {0}")]
        Load(String),

        /// The run was cancelled before it finished
        #[error("run cancelled")]
        Cancelled,

        /// IO error
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        /// SQLite error
        #[error("SQLite error: {0}")]
        Sqlite(#[from] rusqlite::Error),

        /// CSV error
        #[error("CSV error: {0}")]
        Csv(#[from] csv::Error),

        /// JSON error
        #[error("JSON error: {0}")]
        Json(#[from] serde_json::Error),
    }

    impl From<GeoError> for Error {
        fn from(err: GeoError) -> Self {
            match err {
                GeoError::NotFound(name) => Error::LookupNotFound(name),
                GeoError::Unavailable { name, reason } => Error::LookupUnavailable { name, reason },
            }
        }
    }
}

// Re-export commonly used types
pub use crate::core::{Table, Value};
pub use error::{Error, Result};
