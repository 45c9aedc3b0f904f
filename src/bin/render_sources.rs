//! render-sources - write sample source data for a local run
//!
//! Usage:
//!   render-sources --output-dir data
//!   render-sources --output-dir data --days 30 --months 3 --seed 7

use chrono::NaiveDate;
use clap::Parser;
use salesmart::render::{render, write_sources, SampleDataConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "render-sources")]
#[command(about = "Render sample sales, budget and product sources")]
struct Args {
    /// Directory receiving SalesDatabase.db, BudgetCollection.jsonl and Products.csv
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// First sales and budget date (YYYY-MM-DD)
    #[arg(long, default_value = "2018-01-01")]
    start_date: NaiveDate,

    /// Days of sales per product
    #[arg(long, default_value = "730")]
    days: u32,

    /// Months of budget per product
    #[arg(long, default_value = "24")]
    months: u32,

    /// RNG seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = SampleDataConfig {
        start: args.start_date.and_time(chrono::NaiveTime::MIN),
        days: args.days,
        months: args.months,
        seed: args.seed,
        ..SampleDataConfig::default()
    };

    let written = render(&config).and_then(|data| write_sources(&data, &args.output_dir));
    match written {
        Ok(paths) => {
            info!(
                sales = %paths.sales_database.display(),
                budget = %paths.budget_documents.display(),
                products = %paths.products_csv.display(),
                "sources rendered"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("rendering failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
