use crate::core::{Table, Value};
use crate::dimension::{KeyIndex, PRODUCT_ID, PRODUCT_NAME};
use crate::error::{Error, Result};
use std::collections::HashSet;

/// Product dimension: the source product list with a `ProductId` first column.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDim {
    table: Table,
}

impl ProductDim {
    pub const TABLE: &'static str = "Product";

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// ProductName → ProductId. Rows without a name are not indexed.
    pub fn key_index(&self) -> KeyIndex {
        let id_idx = 0;
        let Some(name_idx) = self.table.column_index(PRODUCT_NAME) else {
            return KeyIndex::default();
        };
        KeyIndex::from_pairs(self.table.rows().iter().filter_map(|row| {
            let name = row[name_idx].key_text()?;
            let id = row[id_idx].as_i64()?;
            Some((name, id))
        }))
    }
}

/// Assigns `ProductId` = 0-based source row position and keeps every other
/// column unchanged.
///
/// ProductName must be present and unique: fact rows join on it, and a
/// duplicate would silently bind every matching fact to the first product.
pub fn build_product_dimension(products: Table) -> Result<ProductDim> {
    let name_idx = products.require_column(PRODUCT_NAME)?;

    let mut seen = HashSet::with_capacity(products.len());
    for row in products.rows() {
        if let Some(name) = row[name_idx].key_text() {
            if !seen.insert(name.clone()) {
                return Err(Error::DuplicateNaturalKey {
                    table: products.name().to_string(),
                    column: PRODUCT_NAME.to_string(),
                    value: name,
                });
            }
        }
    }

    let ids = (0..products.len()).map(|i| Value::Integer(i as i64)).collect();
    let mut table = products.renamed(ProductDim::TABLE);
    table.insert_column(0, PRODUCT_ID, ids)?;
    Ok(ProductDim { table })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn products(names: &[&str]) -> Table {
        let mut t = Table::with_columns("Products", &["ProductName", "ProductVendor"]);
        for name in names {
            t.push_row(vec![Value::from(*name), Value::from("Sony")]).unwrap();
        }
        t
    }

    #[test]
    fn test_ids_follow_source_order() {
        let dim = build_product_dimension(products(&["Product2", "Product1"])).unwrap();
        let index = dim.key_index();
        assert_eq!(index.resolve("Product2"), Some(0));
        assert_eq!(index.resolve("Product1"), Some(1));
        assert_eq!(dim.table().name(), "Product");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = build_product_dimension(products(&["A", "B", "A"])).unwrap_err();
        assert!(matches!(err, Error::DuplicateNaturalKey { ref value, .. } if value == "A"));
    }

    #[test]
    fn test_missing_name_column() {
        let t = Table::with_columns("Products", &["Vendor"]);
        assert!(matches!(build_product_dimension(t), Err(Error::MissingColumn { .. })));
    }
}
