use crate::core::{Table, Value};
use crate::error::{Error, Result};
use crate::load::{CsvSink, DdlCatalog, JsonLinesSink, SqliteLoader, TableSink, SOURCE_SALES_SCRIPT};
use chrono::{Days, Months, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::info;

pub const LOCATIONS: [&str; 10] =
    ["USA", "UK", "Canada", "Australia", "Austria", "Argentina", "India", "China", "Brazil", "Turkey"];

/// Vendor and category of `Product1`..`Product10`, in that order.
pub const PRODUCTS: [(&str, &str); 10] = [
    ("Sony", "Technology"),
    ("Amazon", "E-Commerce"),
    ("Samsung", "Technology"),
    ("Apple", "Technology"),
    ("Tesla", "Vehicle"),
    ("Shopify", "E-Commerce"),
    ("Spotify", "Social Media"),
    ("Uber", "Vehicle"),
    ("Microsoft", "Technology"),
    ("Facebook", "Social Media"),
];

pub const SALES_DATABASE: &str = "SalesDatabase.db";
pub const BUDGET_COLLECTION: &str = "BudgetCollection";
pub const PRODUCTS_FILE: &str = "Products";

#[derive(Debug, Clone)]
pub struct SampleDataConfig {
    pub start: NaiveDateTime,
    /// One sales row per product per day
    pub days: u32,
    /// One budget row per product per month
    pub months: u32,
    pub sales_amount: RangeInclusive<i64>,
    pub budget_amount: RangeInclusive<i64>,
    /// Fixed seed for reproducible output
    pub seed: Option<u64>,
}

impl Default for SampleDataConfig {
    fn default() -> Self {
        SampleDataConfig {
            start: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default().and_time(chrono::NaiveTime::MIN),
            days: 730,
            months: 24,
            sales_amount: 100..=10_000,
            budget_amount: 1_000..=100_000,
            seed: None,
        }
    }
}

/// Rendered contents of the three source systems.
#[derive(Debug, Clone)]
pub struct SampleData {
    pub sales: Table,
    pub budget: Table,
    pub products: Table,
}

/// Where [`write_sources`] put each source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePaths {
    pub sales_database: PathBuf,
    pub budget_documents: PathBuf,
    pub products_csv: PathBuf,
}

pub fn render(config: &SampleDataConfig) -> Result<SampleData> {
    if config.sales_amount.is_empty() || config.budget_amount.is_empty() {
        return Err(Error::Config("amount ranges must not be empty".to_string()));
    }
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    Ok(SampleData {
        sales: render_sales(config, &mut rng)?,
        budget: render_budget(config, &mut rng)?,
        products: render_products()?,
    })
}

fn product_name(index: usize) -> String {
    format!("Product{}", index + 1)
}

fn pick_location(rng: &mut StdRng) -> Value {
    Value::from(*LOCATIONS.choose(rng).unwrap_or(&LOCATIONS[0]))
}

fn render_sales(config: &SampleDataConfig, rng: &mut StdRng) -> Result<Table> {
    let mut table = Table::with_columns("Sales", &["SalesDate", "SalesAmt", "Product", "Location"]);
    for index in 0..PRODUCTS.len() {
        for day in 0..config.days {
            let date = config
                .start
                .checked_add_days(Days::new(u64::from(day)))
                .ok_or_else(|| Error::Config(format!("sales date out of range after {} days", day)))?;
            table.push_row(vec![
                date.into(),
                rng.gen_range(config.sales_amount.clone()).into(),
                product_name(index).into(),
                pick_location(rng),
            ])?;
        }
    }
    Ok(table)
}

fn render_budget(config: &SampleDataConfig, rng: &mut StdRng) -> Result<Table> {
    let mut table =
        Table::with_columns("Budget", &["BudgetDate", "BudgetAmt", "Product", "ProductVendor", "Location"]);
    for (index, (vendor, _)) in PRODUCTS.iter().enumerate() {
        for month in 0..config.months {
            let date = config
                .start
                .checked_add_months(Months::new(month))
                .ok_or_else(|| Error::Config(format!("budget date out of range after {} months", month)))?;
            table.push_row(vec![
                date.into(),
                rng.gen_range(config.budget_amount.clone()).into(),
                product_name(index).into(),
                (*vendor).into(),
                pick_location(rng),
            ])?;
        }
    }
    Ok(table)
}

fn render_products() -> Result<Table> {
    let mut table = Table::with_columns("Products", &["ProductName", "ProductVendor", "ProductCategory"]);
    for (index, (vendor, category)) in PRODUCTS.iter().enumerate() {
        table.push_row(vec![product_name(index).into(), (*vendor).into(), (*category).into()])?;
    }
    Ok(table)
}

/// Writes sales to SQLite, budget as JSON lines and products as CSV, all in `dir`.
pub fn write_sources(data: &SampleData, dir: &Path) -> Result<SourcePaths> {
    let sales_database = dir.join(SALES_DATABASE);
    let ddl = DdlCatalog::bundled().script(SOURCE_SALES_SCRIPT)?;
    SqliteLoader::open(&sales_database)?.load(&data.sales, "Sales", Some(&ddl))?;
    info!(rows = data.sales.len(), path = %sales_database.display(), "sales written");

    let mut documents = JsonLinesSink::new(dir);
    documents.load(&data.budget, BUDGET_COLLECTION, None)?;
    let budget_documents = documents.path_for(BUDGET_COLLECTION);
    info!(rows = data.budget.len(), path = %budget_documents.display(), "budget written");

    let mut csv = CsvSink::new(dir);
    csv.load(&data.products, PRODUCTS_FILE, None)?;
    let products_csv = csv.path_for(PRODUCTS_FILE);
    info!(rows = data.products.len(), path = %products_csv.display(), "products written");

    Ok(SourcePaths { sales_database, budget_documents, products_csv })
}
