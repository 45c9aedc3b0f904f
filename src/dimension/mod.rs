//! Dimension tables of the star schema and their builders.
//!
//! Each dimension is built once per run and is read-only afterwards. Fact
//! normalization reads them through [`KeyIndex`]es.

pub mod date;
pub mod location;
pub mod product;

pub use date::{build_date_dimension, parse_date, DateDim, DateEntry, DateRows};
pub use location::{build_location_dimension, LocationBuild, LocationOptions, LocationOrder};
pub use product::{build_product_dimension, ProductDim};

use crate::core::{Table, Value};
use std::collections::HashMap;

pub const LOCATION_ID: &str = "LocationId";
pub const COUNTRY: &str = "Country";
pub const CAPITAL: &str = "Capital";
pub const LATITUDE: &str = "Latitude";
pub const LONGITUDE: &str = "Longitude";

pub const PRODUCT_ID: &str = "ProductId";
pub const PRODUCT_NAME: &str = "ProductName";
pub const PRODUCT_VENDOR: &str = "ProductVendor";
pub const PRODUCT_CATEGORY: &str = "ProductCategory";

pub const DATE_ID: &str = "DateId";

/// One row of the location dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationEntry {
    pub location_id: i64,
    /// Case-folded country name, unique within the dimension
    pub country: String,
    pub capital: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationDim {
    entries: Vec<LocationEntry>,
}

impl LocationDim {
    pub const TABLE: &'static str = "Location";

    pub(crate) fn from_entries(entries: Vec<LocationEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[LocationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, country: &str) -> Option<&LocationEntry> {
        let folded = country.to_lowercase();
        self.entries.iter().find(|e| e.country == folded)
    }

    /// Country → LocationId.
    pub fn key_index(&self) -> KeyIndex {
        KeyIndex::from_pairs(self.entries.iter().map(|e| (e.country.clone(), e.location_id)))
    }

    pub fn to_table(&self) -> Table {
        let mut table =
            Table::with_columns(Self::TABLE, &[LOCATION_ID, COUNTRY, CAPITAL, LATITUDE, LONGITUDE]);
        table.rows_mut().extend(self.entries.iter().map(|e| {
            vec![
                Value::Integer(e.location_id),
                Value::Text(e.country.clone()),
                Value::Text(e.capital.clone()),
                Value::Real(e.latitude),
                Value::Real(e.longitude),
            ]
        }));
        table
    }
}

/// Natural key → surrogate key, built once per dimension.
///
/// When a key appears more than once the first surrogate wins, matching a
/// scan of the dimension in table order.
#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    keys: HashMap<String, i64>,
}

impl KeyIndex {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, i64)>) -> Self {
        let mut keys = HashMap::new();
        for (key, id) in pairs {
            keys.entry(key).or_insert(id);
        }
        Self { keys }
    }

    pub fn resolve(&self, key: &str) -> Option<i64> {
        self.keys.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_index_first_match_wins() {
        let index = KeyIndex::from_pairs(vec![
            ("uk".to_string(), 0),
            ("usa".to_string(), 1),
            ("uk".to_string(), 2),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.resolve("uk"), Some(0));
        assert_eq!(index.resolve("UK"), None);
    }

    #[test]
    fn test_location_table_layout() {
        let dim = LocationDim::from_entries(vec![LocationEntry {
            location_id: 0,
            country: "uk".into(),
            capital: "London".into(),
            latitude: 54.0,
            longitude: -2.0,
        }]);
        let table = dim.to_table();
        assert_eq!(table.name(), "Location");
        assert_eq!(table.columns(), &["LocationId", "Country", "Capital", "Latitude", "Longitude"]);
        assert_eq!(table.get(0, "Capital"), Some(&Value::from("London")));
        assert_eq!(dim.find("UK").map(|e| e.location_id), Some(0));
    }
}
