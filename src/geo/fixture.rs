use crate::error::{Error, Result};
use crate::geo::{GeoError, GeoInfo, GeoLookup};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Country lookup backed by an in-memory table keyed by case-folded name.
///
/// Used for offline runs (`geo.fixtures` in the config) and as the deterministic
/// stand-in for the network service in tests. An optional fallback answers any
/// name not in the table.
#[derive(Debug, Clone, Default)]
pub struct StaticGeoLookup {
    entries: HashMap<String, GeoInfo>,
    fallback: Option<GeoInfo>,
}

impl StaticGeoLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every name with the same record.
    pub fn uniform(info: GeoInfo) -> Self {
        Self { entries: HashMap::new(), fallback: Some(info) }
    }

    pub fn with_entry(mut self, name: &str, info: GeoInfo) -> Self {
        self.entries.insert(name.to_lowercase(), info);
        self
    }

    /// Reads a JSON object mapping country names to `{capital, latitude, longitude}`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read geo fixtures {}: {}", path.display(), e))
        })?;
        let raw: HashMap<String, GeoInfo> = serde_json::from_str(&text)?;
        let entries = raw.into_iter().map(|(name, info)| (name.to_lowercase(), info)).collect();
        Ok(Self { entries, fallback: None })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl GeoLookup for StaticGeoLookup {
    async fn resolve(&self, place_name: &str) -> std::result::Result<GeoInfo, GeoError> {
        self.entries
            .get(&place_name.to_lowercase())
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| GeoError::NotFound(place_name.to_string()))
    }
}
