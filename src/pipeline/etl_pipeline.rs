use crate::config::{PipelineConfig, StagingKind};
use crate::core::{Table, Value};
use crate::dimension::{
    build_date_dimension, build_location_dimension, build_product_dimension, DateDim, DateRows,
    LocationDim, LocationOptions, LocationOrder, ProductDim, PRODUCT_NAME,
};
use crate::error::{Error, Result};
use crate::fact::{ErrorPolicy, FactLayout, FactNormalizer, Rejection, LOCATION, SALES_DATE};
use crate::geo::{self, GeoLookup};
use crate::load::{CsvSink, DdlCatalog, SqliteLoader, StagingTable, TableSink};
use crate::pipeline::summary::{write_rejections, RunSummary};
use crate::sources::{
    CsvSource, DocumentSource, SqliteSource, TableSource, BUDGET_COLUMNS, PRODUCT_COLUMNS, SALES_COLUMNS,
};
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Knobs of the transform stage.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOptions {
    pub location_order: LocationOrder,
    /// Country lookups in flight at once
    pub concurrency: usize,
    pub error_policy: ErrorPolicy,
    pub date_rows: DateRows,
}

impl Default for TransformOptions {
    fn default() -> Self {
        TransformOptions {
            location_order: LocationOrder::Sorted,
            concurrency: 8,
            error_policy: ErrorPolicy::FailFast,
            date_rows: DateRows::PerFact,
        }
    }
}

impl From<&PipelineConfig> for TransformOptions {
    fn from(config: &PipelineConfig) -> Self {
        TransformOptions {
            location_order: config.transform.location_order,
            concurrency: config.geo.concurrency,
            error_policy: config.transform.error_policy,
            date_rows: config.transform.date_rows,
        }
    }
}

/// The transformed star schema, ready to load.
#[derive(Debug, Clone)]
pub struct StarSchema {
    pub sales: Table,
    pub budget: Table,
    pub product: ProductDim,
    pub location: LocationDim,
    pub date: DateDim,
    /// Everything left out under [`ErrorPolicy::Collect`], dimension members first
    pub rejections: Vec<Rejection>,
}

impl StarSchema {
    /// The table staged as `table`, named after its staging target.
    pub fn staged(&self, table: StagingTable) -> Cow<'_, Table> {
        match table {
            StagingTable::Sales => Cow::Borrowed(&self.sales),
            StagingTable::Budget => Cow::Borrowed(&self.budget),
            StagingTable::Product => Cow::Borrowed(self.product.table()),
            StagingTable::Location => Cow::Owned(self.location.to_table()),
            StagingTable::Date => Cow::Owned(self.date.to_table()),
        }
    }

    pub fn row_count(&self, table: StagingTable) -> usize {
        match table {
            StagingTable::Sales => self.sales.len(),
            StagingTable::Budget => self.budget.len(),
            StagingTable::Product => self.product.len(),
            StagingTable::Location => self.location.len(),
            StagingTable::Date => self.date.len(),
        }
    }
}

/// Builds the star schema from extracted tables.
///
/// Phases run strictly in order: location dimension, product dimension,
/// sales and budget normalization, then the date dimension from the
/// surviving sales rows. Nothing is written anywhere.
pub async fn transform(
    sales: &Table,
    budget: &Table,
    products: Table,
    lookup: &dyn GeoLookup,
    options: &TransformOptions,
    cancel: &CancellationToken,
) -> Result<StarSchema> {
    let location_options = LocationOptions {
        order: options.location_order,
        concurrency: options.concurrency,
        policy: options.error_policy,
    };
    let location_build = build_location_dimension(
        sales.column_values(LOCATION)?.filter_map(Value::key_text),
        budget.column_values(LOCATION)?.filter_map(Value::key_text),
        lookup,
        &location_options,
        cancel,
    )
    .await?;
    let location = location_build.dimension;
    let mut rejections = location_build.rejections;
    info!(rows = location.len(), rejected = rejections.len(), "location dimension built");
    check_cancelled(cancel)?;

    let product = build_product_dimension(products)?;
    info!(rows = product.len(), "product dimension built");

    let normalizer = FactNormalizer::new(&location, &product, options.error_policy);
    let sales = normalizer.normalize(sales, &FactLayout::sales())?;
    let budget = normalizer.normalize(budget, &FactLayout::budget())?;
    info!(sales = sales.table.len(), budget = budget.table.len(), "facts normalized");
    rejections.extend(sales.rejections);
    rejections.extend(budget.rejections);
    check_cancelled(cancel)?;

    let date = build_date_dimension(sales.table.column_values(SALES_DATE)?, options.date_rows)?;
    info!(rows = date.len(), "date dimension built");

    Ok(StarSchema { sales: sales.table, budget: budget.table, product, location, date, rejections })
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// Extract, transform and load in one run.
pub struct EtlPipeline {
    sales: Box<dyn TableSource>,
    budget: Box<dyn TableSource>,
    products: Box<dyn TableSource>,
    lookup: Arc<dyn GeoLookup>,
    sink: Box<dyn TableSink>,
    ddl: DdlCatalog,
    options: TransformOptions,
    rejections_path: Option<PathBuf>,
    cancel: CancellationToken,
}

impl EtlPipeline {
    pub fn new(
        sales: Box<dyn TableSource>,
        budget: Box<dyn TableSource>,
        products: Box<dyn TableSource>,
        lookup: Arc<dyn GeoLookup>,
        sink: Box<dyn TableSink>,
    ) -> Self {
        EtlPipeline {
            sales,
            budget,
            products,
            lookup,
            sink,
            ddl: DdlCatalog::bundled(),
            options: TransformOptions::default(),
            rejections_path: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Wires sources, lookup stack and sink as `config` describes.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let delimiter = u8::try_from(config.products.delimiter)
            .map_err(|_| Error::Config("products.delimiter must be a single byte".to_string()))?;
        let sales = SqliteSource::new(&config.sales.database, &config.sales.table)?;
        let budget = DocumentSource::new(&config.budget.path, "Budget");
        let products =
            CsvSource::new(&config.products.path, "Products", delimiter).with_text_columns([PRODUCT_NAME]);
        let sink: Box<dyn TableSink> = match config.staging.kind {
            StagingKind::Sqlite => Box::new(SqliteLoader::open(&config.staging.database)?),
            StagingKind::Csv => Box::new(CsvSink::new(&config.staging.directory)),
        };
        let ddl = config.staging.ddl_dir.as_ref().map_or_else(DdlCatalog::bundled, DdlCatalog::with_override_dir);

        Ok(EtlPipeline::new(Box::new(sales), Box::new(budget), Box::new(products), geo::from_config(&config.geo)?, sink)
            .with_options(TransformOptions::from(config))
            .with_ddl(ddl)
            .with_rejections_path(config.rejections_path.clone()))
    }

    pub fn with_options(mut self, options: TransformOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_ddl(mut self, ddl: DdlCatalog) -> Self {
        self.ddl = ddl;
        self
    }

    pub fn with_rejections_path(mut self, path: Option<PathBuf>) -> Self {
        self.rejections_path = path;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle that cancels this pipeline's run.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(&mut self) -> Result<RunSummary> {
        let started = Instant::now();

        let (sales, budget, products) = self.extract()?;
        check_cancelled(&self.cancel)?;

        let schema =
            transform(&sales, &budget, products, self.lookup.as_ref(), &self.options, &self.cancel).await?;
        check_cancelled(&self.cancel)?;

        self.load(&schema)?;

        let mut summary = RunSummary::from_schema(&schema, started.elapsed());
        if let Some(path) = &self.rejections_path {
            if !schema.rejections.is_empty() {
                write_rejections(path, &schema.rejections)?;
                info!(path = %path.display(), count = schema.rejections.len(), "rejection report written");
                summary.rejections_path = Some(path.clone());
            }
        }
        info!(elapsed_ms = summary.elapsed_ms as u64, "run finished");
        Ok(summary)
    }

    fn extract(&self) -> Result<(Table, Table, Table)> {
        let sales = extract_checked(self.sales.as_ref(), SALES_COLUMNS)?;
        let budget = extract_checked(self.budget.as_ref(), BUDGET_COLUMNS)?;
        let products = extract_checked(self.products.as_ref(), PRODUCT_COLUMNS)?;
        Ok((sales, budget, products))
    }

    fn load(&mut self, schema: &StarSchema) -> Result<()> {
        info!(sink = %self.sink.describe(), "loading star schema");
        for table in StagingTable::LOAD_ORDER {
            let ddl = self.ddl.for_table(table)?;
            self.sink.load(&schema.staged(table), table.table_name(), Some(&ddl))?;
            info!(table = table.table_name(), rows = schema.row_count(table), "table loaded");
        }
        Ok(())
    }
}

fn extract_checked(source: &dyn TableSource, required: &[&str]) -> Result<Table> {
    let table = source.extract()?;
    table.require_columns(required)?;
    info!(source = %source.describe(), rows = table.len(), "extracted");
    Ok(table)
}
