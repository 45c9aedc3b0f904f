//! Fact normalization tests
//!
//! Runs the normalizer against dimensions built the same way the pipeline
//! builds them.

use pretty_assertions::assert_eq;
use salesmart::dimension::{build_location_dimension, build_product_dimension, LocationDim, LocationOptions, ProductDim};
use salesmart::fact::{ErrorPolicy, FactLayout, FactNormalizer, RejectionReason};
use salesmart::geo::{GeoInfo, StaticGeoLookup};
use salesmart::{Error, Table, Value};
use tokio_util::sync::CancellationToken;

async fn dimensions() -> (LocationDim, ProductDim) {
    let lookup = StaticGeoLookup::uniform(GeoInfo::new("Capital", 1.0, 2.0));
    let location = build_location_dimension(
        ["USA", "uk"],
        ["UK", "India"],
        &lookup,
        &LocationOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap()
    .dimension;

    let mut products = Table::with_columns("Products", &["ProductName", "ProductVendor", "ProductCategory"]);
    products.push_row(vec!["Product1".into(), "Sony".into(), "Technology".into()]).unwrap();
    products.push_row(vec!["Product2".into(), "Amazon".into(), "E-Commerce".into()]).unwrap();
    (location, build_product_dimension(products).unwrap())
}

fn budget_row(location: &str, product: &str, amount: i64) -> Table {
    let mut budget = Table::with_columns("Budget", &["Location", "Product", "ProductVendor", "BudgetAmt"]);
    budget.push_row(vec![location.into(), product.into(), "Sony".into(), amount.into()]).unwrap();
    budget
}

#[tokio::test]
async fn test_budget_row_loses_natural_keys_and_vendor() {
    let (location, product) = dimensions().await;
    let normalizer = FactNormalizer::new(&location, &product, ErrorPolicy::FailFast);

    let out = normalizer.normalize(&budget_row("USA", "Product1", 500), &FactLayout::budget()).unwrap();

    let usa = location.find("usa").unwrap().location_id;
    assert_eq!(out.table.name(), "Budget");
    assert_eq!(out.table.columns(), &["BudgetAmt", "LocationId", "ProductId"]);
    assert_eq!(out.table.rows()[0], vec![Value::Integer(500), Value::Integer(usa), Value::Integer(0)]);
}

#[tokio::test]
async fn test_sales_keys_match_dimension_rows() {
    let (location, product) = dimensions().await;
    let normalizer = FactNormalizer::new(&location, &product, ErrorPolicy::FailFast);

    let mut sales = Table::with_columns("Sales", &["SalesDate", "SalesAmt", "Product", "Location"]);
    for (product_name, location_name) in [("Product2", "uK"), ("Product1", "INDIA"), ("Product2", "usa")] {
        sales.push_row(vec!["2018-01-01".into(), 10i64.into(), product_name.into(), location_name.into()]).unwrap();
    }
    let out = normalizer.normalize(&sales, &FactLayout::sales()).unwrap();

    assert_eq!(out.table.len(), 3);
    for (row, source) in out.table.records().zip(sales.records()) {
        let country = source.get("Location").unwrap().as_str().unwrap();
        let name = source.get("Product").unwrap();
        assert_eq!(row.get("LocationId").unwrap().as_i64(), location.find(country).map(|e| e.location_id));
        assert_eq!(row.get("ProductId").unwrap().as_i64(), product.key_index().resolve(name.as_str().unwrap()));
    }
}

#[tokio::test]
async fn test_unknown_location_fails_fast() {
    let (location, product) = dimensions().await;
    let normalizer = FactNormalizer::new(&location, &product, ErrorPolicy::FailFast);

    let err = normalizer.normalize(&budget_row("France", "Product1", 1), &FactLayout::budget()).unwrap_err();
    assert!(matches!(
        err,
        Error::UnresolvedLocation { ref table, row: 0, ref value } if table == "Budget" && value == "France"
    ));
    assert!(err.to_string().contains("France"));
}

#[tokio::test]
async fn test_collect_policy_reports_every_bad_key() {
    let (location, product) = dimensions().await;
    let normalizer = FactNormalizer::new(&location, &product, ErrorPolicy::Collect);

    let mut budget = budget_row("USA", "Product1", 1);
    budget.push_row(vec!["France".into(), "Product1".into(), "Sony".into(), 2i64.into()]).unwrap();
    budget.push_row(vec!["uk".into(), "Product3".into(), "Sony".into(), 3i64.into()]).unwrap();
    let out = normalizer.normalize(&budget, &FactLayout::budget()).unwrap();

    assert_eq!(out.table.len(), 1);
    let rejected: Vec<_> = out.rejections.iter().map(|r| (r.row, r.reason, r.value.as_str())).collect();
    assert_eq!(
        rejected,
        vec![
            (Some(1), RejectionReason::UnresolvedLocation, "France"),
            (Some(2), RejectionReason::UnresolvedProduct, "Product3"),
        ]
    );
}
