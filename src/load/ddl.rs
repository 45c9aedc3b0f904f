//! DDL scripts for the staging tables.
//!
//! Scripts ship inside the binary. A directory of `<script>.sql` files can
//! override any of them by name.

use crate::error::{Error, Result};
use std::fs;
use std::path::PathBuf;

/// Creates the `Sales` table in the source database.
pub const SOURCE_SALES_SCRIPT: &str = "create_sales_table";

const BUNDLED: &[(&str, &str)] = &[
    ("create_sales_fact", include_str!("../../sql/create_sales_fact.sql")),
    ("create_budget_fact", include_str!("../../sql/create_budget_fact.sql")),
    ("create_product_dim", include_str!("../../sql/create_product_dim.sql")),
    ("create_location_dim", include_str!("../../sql/create_location_dim.sql")),
    ("create_date_dim", include_str!("../../sql/create_date_dim.sql")),
    (SOURCE_SALES_SCRIPT, include_str!("../../sql/create_sales_table.sql")),
];

/// The five tables of the staged star schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StagingTable {
    Sales,
    Budget,
    Product,
    Location,
    Date,
}

impl StagingTable {
    /// Facts first, then dimensions.
    pub const LOAD_ORDER: [StagingTable; 5] = [
        StagingTable::Sales,
        StagingTable::Budget,
        StagingTable::Product,
        StagingTable::Location,
        StagingTable::Date,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            StagingTable::Sales => "Sales",
            StagingTable::Budget => "Budget",
            StagingTable::Product => "Product",
            StagingTable::Location => "Location",
            StagingTable::Date => "DateDim",
        }
    }

    pub fn script_name(self) -> &'static str {
        match self {
            StagingTable::Sales => "create_sales_fact",
            StagingTable::Budget => "create_budget_fact",
            StagingTable::Product => "create_product_dim",
            StagingTable::Location => "create_location_dim",
            StagingTable::Date => "create_date_dim",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DdlCatalog {
    override_dir: Option<PathBuf>,
}

impl DdlCatalog {
    pub fn bundled() -> Self {
        Self::default()
    }

    pub fn with_override_dir(dir: impl Into<PathBuf>) -> Self {
        DdlCatalog { override_dir: Some(dir.into()) }
    }

    /// Returns the script called `name`, preferring the override directory.
    pub fn script(&self, name: &str) -> Result<String> {
        if let Some(dir) = &self.override_dir {
            let path = dir.join(format!("{}.sql", name));
            if path.is_file() {
                return Ok(fs::read_to_string(&path)?);
            }
        }
        BUNDLED
            .iter()
            .find(|(bundled, _)| *bundled == name)
            .map(|(_, sql)| (*sql).to_string())
            .ok_or_else(|| Error::Config(format!("no DDL script named '{}'", name)))
    }

    pub fn for_table(&self, table: StagingTable) -> Result<String> {
        self.script(table.script_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::{SqliteLoader, TableSink};
    use crate::Table;

    #[test]
    fn test_bundled_scripts_create_their_tables() {
        let catalog = DdlCatalog::bundled();
        let mut loader = SqliteLoader::in_memory().unwrap();
        for table in StagingTable::LOAD_ORDER {
            let script = catalog.for_table(table).unwrap();
            assert!(script.contains(table.table_name()), "{}", table.script_name());
            loader.load(&Table::with_columns(table.table_name(), &[]), table.table_name(), Some(&script)).unwrap();
        }
        let tables: i64 = loader
            .connection()
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(tables, 5);
    }

    #[test]
    fn test_override_directory_wins() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("create_date_dim.sql"), "CREATE TABLE DateDim (DateId TEXT);").unwrap();
        let catalog = DdlCatalog::with_override_dir(dir.path());

        assert_eq!(catalog.for_table(StagingTable::Date).unwrap(), "CREATE TABLE DateDim (DateId TEXT);");
        assert!(catalog.for_table(StagingTable::Sales).unwrap().contains("SalesAmt"));
    }

    #[test]
    fn test_unknown_script() {
        assert!(matches!(DdlCatalog::bundled().script("create_nothing"), Err(Error::Config(_))));
    }
}
