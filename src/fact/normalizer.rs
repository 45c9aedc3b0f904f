use crate::core::{Table, Value};
use crate::dimension::{KeyIndex, LocationDim, ProductDim, LOCATION_ID, PRODUCT_ID};
use crate::error::{Error, Result};
use crate::fact::{ErrorPolicy, FactLayout, NormalizedFact, Rejection, RejectionReason};
use tracing::{debug, warn};

/// Replaces location and product names in fact rows with surrogate keys.
///
/// Both indexes are built once in [`FactNormalizer::new`]; the dimensions
/// themselves are only read.
pub struct FactNormalizer {
    locations: KeyIndex,
    products: KeyIndex,
    policy: ErrorPolicy,
}

impl FactNormalizer {
    pub fn new(locations: &LocationDim, products: &ProductDim, policy: ErrorPolicy) -> Self {
        Self { locations: locations.key_index(), products: products.key_index(), policy }
    }

    /// Normalizes `fact` according to `layout`.
    ///
    /// Output columns are the fact's columns minus the natural keys and
    /// `layout.drop_columns`, followed by `LocationId` and `ProductId`.
    /// Locations match case-insensitively, products exactly.
    pub fn normalize(&self, fact: &Table, layout: &FactLayout) -> Result<NormalizedFact> {
        let location_idx = fact.require_column(&layout.location_column)?;
        let product_idx = fact.require_column(&layout.product_column)?;
        let mut dropped = vec![location_idx, product_idx];
        for column in &layout.drop_columns {
            dropped.push(fact.require_column(column)?);
        }

        let kept: Vec<usize> = (0..fact.columns().len()).filter(|i| !dropped.contains(i)).collect();
        let mut columns: Vec<String> = kept.iter().map(|&i| fact.columns()[i].clone()).collect();
        columns.push(LOCATION_ID.to_string());
        columns.push(PRODUCT_ID.to_string());

        let mut table = Table::new(layout.table.clone(), columns);
        let mut rejections = Vec::new();

        for (row_no, row) in fact.rows().iter().enumerate() {
            let location = &row[location_idx];
            let product = &row[product_idx];
            let location_id = self.resolve_location(location);
            let product_id = self.resolve_product(product);

            if location_id.is_none() {
                let value = location.to_string();
                if self.policy == ErrorPolicy::FailFast {
                    return Err(Error::UnresolvedLocation { table: layout.table.clone(), row: row_no, value });
                }
                rejections.push(self.reject(layout, row_no, RejectionReason::UnresolvedLocation, value));
            }
            if product_id.is_none() {
                let value = product.to_string();
                if self.policy == ErrorPolicy::FailFast {
                    return Err(Error::UnresolvedProduct { table: layout.table.clone(), row: row_no, value });
                }
                rejections.push(self.reject(layout, row_no, RejectionReason::UnresolvedProduct, value));
            }

            if let (Some(location_id), Some(product_id)) = (location_id, product_id) {
                let mut out: Vec<Value> = kept.iter().map(|&i| row[i].clone()).collect();
                out.push(Value::Integer(location_id));
                out.push(Value::Integer(product_id));
                table.push_row(out)?;
            }
        }

        debug!(table = %layout.table, rows = table.len(), rejected = rejections.len(), "fact normalized");
        Ok(NormalizedFact { table, rejections })
    }

    fn resolve_location(&self, value: &Value) -> Option<i64> {
        let name = value.key_text()?;
        self.locations.resolve(&name.to_lowercase())
    }

    fn resolve_product(&self, value: &Value) -> Option<i64> {
        self.products.resolve(&value.key_text()?)
    }

    fn reject(&self, layout: &FactLayout, row: usize, reason: RejectionReason, value: String) -> Rejection {
        warn!(table = %layout.table, row, ?reason, value = %value, "fact row rejected");
        Rejection { table: layout.table.clone(), row: Some(row), reason, value }
    }
}
