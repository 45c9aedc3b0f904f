//! salesmart - stage sales and budget sources into a star schema
//!
//! Usage:
//!   salesmart
//!   salesmart --config salesmart.toml --error-policy collect
//!   salesmart --geo-fixtures countries.json --staging-db out/StagingDatabase.db

use clap::{Parser, ValueEnum};
use salesmart::config::PipelineConfig;
use salesmart::dimension::LocationOrder;
use salesmart::fact::ErrorPolicy;
use salesmart::pipeline::EtlPipeline;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    FailFast,
    Collect,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrderArg {
    Sorted,
    FirstSeen,
}

#[derive(Parser, Debug)]
#[command(name = "salesmart")]
#[command(about = "Stage sales, budget and product sources into a star schema")]
struct Args {
    /// TOML configuration file (defaults to ./salesmart.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite staging database
    #[arg(long)]
    staging_db: Option<PathBuf>,

    /// JSON table of country records used instead of the REST service
    #[arg(long)]
    geo_fixtures: Option<PathBuf>,

    /// What to do with rows whose keys cannot be resolved
    #[arg(long, value_enum)]
    error_policy: Option<PolicyArg>,

    /// Order in which locations receive their ids
    #[arg(long, value_enum)]
    location_order: Option<OrderArg>,

    /// Where to write rejected rows as JSON
    #[arg(long)]
    rejections: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(db) = self.staging_db {
            config.staging.database = db;
        }
        if let Some(fixtures) = self.geo_fixtures {
            config.geo.fixtures = Some(fixtures);
        }
        if let Some(policy) = self.error_policy {
            config.transform.error_policy = match policy {
                PolicyArg::FailFast => ErrorPolicy::FailFast,
                PolicyArg::Collect => ErrorPolicy::Collect,
            };
        }
        if let Some(order) = self.location_order {
            config.transform.location_order = match order {
                OrderArg::Sorted => LocationOrder::Sorted,
                OrderArg::FirstSeen => LocationOrder::FirstSeen,
            };
        }
        if let Some(path) = self.rejections {
            config.rejections_path = Some(path);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("run failed: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> salesmart::Result<()> {
    let mut config = PipelineConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    let mut pipeline = EtlPipeline::from_config(&config)?;
    let cancel = pipeline.cancellation_token();
    ctrlc::set_handler(move || {
        eprintln!("\nReceived Ctrl+C, cancelling run...");
        cancel.cancel();
    })
    .map_err(|e| salesmart::Error::Config(format!("cannot install Ctrl+C handler: {}", e)))?;

    let summary = pipeline.run().await?;
    info!(
        sales = summary.sales_rows,
        budget = summary.budget_rows,
        products = summary.product_rows,
        locations = summary.location_rows,
        dates = summary.date_rows,
        rejected = summary.rejected,
        "star schema staged"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
