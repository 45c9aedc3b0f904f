//! Fact tables and their normalization against the dimensions.

pub mod normalizer;

pub use normalizer::FactNormalizer;

use crate::core::Table;
use crate::dimension::PRODUCT_VENDOR;
use serde::{Deserialize, Serialize};

pub const SALES_DATE: &str = "SalesDate";
pub const SALES_AMT: &str = "SalesAmt";
pub const BUDGET_DATE: &str = "BudgetDate";
pub const BUDGET_AMT: &str = "BudgetAmt";
pub const LOCATION: &str = "Location";
pub const PRODUCT: &str = "Product";

/// What to do with a row whose natural key cannot be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Abort the run on the first unresolved key
    #[default]
    FailFast,
    /// Leave the row out and record a [`Rejection`]
    Collect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    LookupNotFound,
    UnresolvedLocation,
    UnresolvedProduct,
}

/// A row (or dimension member) left out under [`ErrorPolicy::Collect`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub table: String,
    /// 0-based source row; `None` for dimension members
    pub row: Option<usize>,
    pub reason: RejectionReason,
    pub value: String,
}

/// Which columns of a fact table hold natural keys and which to discard.
#[derive(Debug, Clone, PartialEq)]
pub struct FactLayout {
    /// Name of the normalized output table
    pub table: String,
    pub location_column: String,
    pub product_column: String,
    /// Extra columns removed from the output
    pub drop_columns: Vec<String>,
}

impl FactLayout {
    pub fn sales() -> Self {
        Self {
            table: "Sales".to_string(),
            location_column: LOCATION.to_string(),
            product_column: PRODUCT.to_string(),
            drop_columns: Vec::new(),
        }
    }

    /// Budget rows also carry the vendor, which the product dimension already holds.
    pub fn budget() -> Self {
        Self {
            table: "Budget".to_string(),
            location_column: LOCATION.to_string(),
            product_column: PRODUCT.to_string(),
            drop_columns: vec![PRODUCT_VENDOR.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFact {
    pub table: Table,
    pub rejections: Vec<Rejection>,
}
