//! Run configuration.
//!
//! Values are layered: built-in defaults, then a TOML file, then `SALESMART_`
//! environment variables (`__` separates nested keys, e.g.
//! `SALESMART_GEO__CONCURRENCY=4`). The CLI applies its flags on top.

use crate::dimension::{DateRows, LocationOrder};
use crate::error::{Error, Result};
use crate::fact::ErrorPolicy;
use crate::geo::rest_countries::DEFAULT_BASE_URL;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "salesmart.toml";
pub const ENV_PREFIX: &str = "SALESMART_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesSourceConfig {
    pub database: PathBuf,
    pub table: String,
}

impl Default for SalesSourceConfig {
    fn default() -> Self {
        Self { database: PathBuf::from("SalesDatabase.db"), table: "Sales".to_string() }
    }
}

/// Budget documents exported from the document store (JSON array or JSON lines).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetSourceConfig {
    pub path: PathBuf,
}

impl Default for BudgetSourceConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("BudgetCollection.jsonl") }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductsSourceConfig {
    pub path: PathBuf,
    pub delimiter: char,
}

impl Default for ProductsSourceConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("Products.csv"), delimiter: ',' }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagingKind {
    Sqlite,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    pub kind: StagingKind,
    /// SQLite staging database, used when `kind = "sqlite"`
    pub database: PathBuf,
    /// Output directory, used when `kind = "csv"`
    pub directory: PathBuf,
    /// Directory whose `create_*.sql` files override the bundled DDL
    pub ddl_dir: Option<PathBuf>,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            kind: StagingKind::Sqlite,
            database: PathBuf::from("StagingDatabase.db"),
            directory: PathBuf::from("staging"),
            ddl_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    pub base_url: String,
    pub full_text: bool,
    /// JSON fixture table used instead of the network service
    pub fixtures: Option<PathBuf>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Lookups in flight at once
    pub concurrency: usize,
    pub cache: bool,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            full_text: true,
            fixtures: None,
            timeout_secs: 10,
            max_retries: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 5_000,
            concurrency: 8,
            cache: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub location_order: LocationOrder,
    pub error_policy: ErrorPolicy,
    pub date_rows: DateRows,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sales: SalesSourceConfig,
    pub budget: BudgetSourceConfig,
    pub products: ProductsSourceConfig,
    pub staging: StagingConfig,
    pub geo: GeoConfig,
    pub transform: TransformConfig,
    /// Where to write rejected rows as JSON, if any were collected
    pub rejections_path: Option<PathBuf>,
}

impl PipelineConfig {
    /// Loads the layered configuration.
    ///
    /// An explicit `path` must exist; without one, `salesmart.toml` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(PipelineConfig::default()));
        match path {
            Some(p) if !p.exists() => {
                return Err(Error::Config(format!("config file {} does not exist", p.display())));
            }
            Some(p) => figment = figment.merge(Toml::file(p)),
            None => figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE)),
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: PipelineConfig =
            figment.extract().map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.geo.concurrency == 0 {
            return Err(Error::Config("geo.concurrency must be at least 1".to_string()));
        }
        if self.geo.timeout_secs == 0 {
            return Err(Error::Config("geo.timeout_secs must be at least 1".to_string()));
        }
        if self.geo.initial_backoff_ms > self.geo.max_backoff_ms {
            return Err(Error::Config(
                "geo.initial_backoff_ms must not exceed geo.max_backoff_ms".to_string(),
            ));
        }
        if !self.products.delimiter.is_ascii() {
            return Err(Error::Config("products.delimiter must be an ASCII character".to_string()));
        }
        Ok(())
    }
}
