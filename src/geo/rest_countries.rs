//! HTTP client for a REST Countries compatible service.
//!
//! `GET {base_url}/name/{name}?fullText=true` answers with a JSON list of
//! country records. Only `capital` and the first two `latlng` values are used.

use crate::error::{Error, Result};
use crate::geo::{GeoError, GeoInfo, GeoLookup};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://restcountries.com/v3.1";

/// v2 of the service returns `capital` as a string, v3 as a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Capital {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct CountryRecord {
    #[serde(default)]
    capital: Option<Capital>,
    #[serde(default)]
    latlng: Vec<f64>,
}

pub struct RestCountriesClient {
    client: Client,
    base_url: Url,
    full_text: bool,
}

impl RestCountriesClient {
    /// Creates a client for the given base URL, e.g. `https://restcountries.com/v3.1`.
    ///
    /// Timeouts are applied per call by [`super::ResilientLookup`], not here.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| Error::Config(format!("invalid geo base_url '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("geo base_url '{}' cannot be a base", base_url)));
        }
        let client = Client::builder()
            .user_agent(concat!("salesmart/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client, base_url, full_text: true })
    }

    /// Whether to ask the service for an exact full-name match.
    pub fn with_full_text(mut self, full_text: bool) -> Self {
        self.full_text = full_text;
        self
    }

    fn url_for(&self, place_name: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("name").push(place_name);
        }
        if self.full_text {
            url.query_pairs_mut().append_pair("fullText", "true");
        }
        url
    }
}

#[async_trait]
impl GeoLookup for RestCountriesClient {
    async fn resolve(&self, place_name: &str) -> std::result::Result<GeoInfo, GeoError> {
        let url = self.url_for(place_name);
        debug!(%url, "querying country service");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GeoError::unavailable(place_name, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GeoError::NotFound(place_name.to_string()));
        }
        if !status.is_success() {
            return Err(GeoError::unavailable(place_name, format!("service returned {}", status)));
        }

        let records: Vec<CountryRecord> = response
            .json()
            .await
            .map_err(|e| GeoError::unavailable(place_name, format!("malformed response: {}", e)))?;

        let record =
            records.into_iter().next().ok_or_else(|| GeoError::NotFound(place_name.to_string()))?;
        parse_record(place_name, record)
    }
}

fn parse_record(place_name: &str, record: CountryRecord) -> std::result::Result<GeoInfo, GeoError> {
    let capital = match record.capital {
        Some(Capital::One(c)) => c,
        Some(Capital::Many(list)) => list.into_iter().next().unwrap_or_default(),
        None => String::new(),
    };
    match record.latlng.as_slice() {
        [lat, lng, ..] => Ok(GeoInfo::new(capital, *lat, *lng)),
        _ => Err(GeoError::unavailable(place_name, "malformed response: latlng has fewer than two values")),
    }
}
