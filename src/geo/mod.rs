//! Country lookup used to enrich the location dimension.
//!
//! The transform stage only sees the [`GeoLookup`] capability. The CLI wires a
//! [`RestCountriesClient`] behind retry, timeout and caching layers, or a
//! [`StaticGeoLookup`] table for offline runs and tests.

pub mod fixture;
pub mod resilient;
pub mod rest_countries;

pub use fixture::StaticGeoLookup;
pub use resilient::{CachedLookup, ResilientLookup, RetryPolicy};
pub use rest_countries::RestCountriesClient;

use crate::config::GeoConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Enrichment attributes for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub capital: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoInfo {
    pub fn new(capital: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self { capital: capital.into(), latitude, longitude }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// The service answered but has no record for the name.
    #[error("no country record for '{0}'")]
    NotFound(String),
    /// Network failure, timeout, bad status or malformed payload.
    #[error("lookup of '{name}' failed: {reason}")]
    Unavailable { name: String, reason: String },
}

impl GeoError {
    pub fn unavailable(name: &str, reason: impl Into<String>) -> Self {
        GeoError::Unavailable { name: name.to_string(), reason: reason.into() }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, GeoError::Unavailable { .. })
    }
}

#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// Resolve a place name to its capital and coordinates.
    async fn resolve(&self, place_name: &str) -> Result<GeoInfo, GeoError>;
}

#[async_trait]
impl<L: GeoLookup + ?Sized> GeoLookup for Arc<L> {
    async fn resolve(&self, place_name: &str) -> Result<GeoInfo, GeoError> {
        (**self).resolve(place_name).await
    }
}

/// Builds the lookup stack described by `config`.
///
/// A fixture file takes precedence over the network client.
pub fn from_config(config: &GeoConfig) -> crate::Result<Arc<dyn GeoLookup>> {
    if let Some(path) = &config.fixtures {
        tracing::info!(path = %path.display(), "using static country fixtures");
        return Ok(Arc::new(StaticGeoLookup::from_json_file(path)?));
    }

    let client = RestCountriesClient::new(&config.base_url)?.with_full_text(config.full_text);
    let policy = RetryPolicy {
        max_retries: config.max_retries,
        initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        max_backoff: Duration::from_millis(config.max_backoff_ms),
        timeout: Duration::from_secs(config.timeout_secs),
    };
    let resilient = ResilientLookup::new(client, policy);
    if config.cache {
        Ok(Arc::new(CachedLookup::new(resilient)))
    } else {
        Ok(Arc::new(resilient))
    }
}
