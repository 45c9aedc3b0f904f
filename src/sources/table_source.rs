use crate::core::Table;
use crate::error::Result;

/// A source system that yields one table per extraction.
pub trait TableSource: Send + Sync {
    /// Short human-readable description for logs, e.g. `sqlite:SalesDatabase.db/Sales`.
    fn describe(&self) -> String;

    /// Reads the whole table.
    fn extract(&self) -> Result<Table>;
}

/// Columns each source must provide.
pub const SALES_COLUMNS: &[&str] = &["SalesDate", "SalesAmt", "Product", "Location"];
pub const BUDGET_COLUMNS: &[&str] = &["BudgetDate", "BudgetAmt", "Product", "ProductVendor", "Location"];
pub const PRODUCT_COLUMNS: &[&str] = &["ProductName", "ProductVendor", "ProductCategory"];
