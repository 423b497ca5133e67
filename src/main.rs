//! # Inria PhD Jobs
//!
//! Scrapes PhD offers from the Inria careers site, stores them in a local
//! SQLite file and exports a timestamped spreadsheet snapshot.
//!
//! ## Usage
//!
//! ```sh
//! inria_phd_jobs
//! ```
//!
//! ## Architecture
//!
//! The application runs one straight pipeline:
//! 1. **Reset**: empty the store and recreate the schema
//! 2. **Listing**: locate job cards on the offers page, keep PhD offers
//! 3. **Details**: enrich each offer from its detail page, one request at a time
//! 4. **Persist**: upsert the offers keyed by `job_id`
//! 5. **Export**: write the stored offers to `inria_phd_positions_<timestamp>.xlsx`

use clap::Parser;
use std::error::Error;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod fetch;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod store;
mod text;
mod utils;

use cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "inria_phd_jobs starting up");

    let config = Cli::parse().into_config();
    info!(
        listing_url = %config.listing_url,
        db = %config.db_path.display(),
        output_dir = %config.output_dir.display(),
        "Loaded configuration"
    );

    let summary = match pipeline::run(&config).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Run failed");
            return Err(e);
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        fetched = summary.fetched,
        inserted = summary.inserted,
        export = ?summary.export_path,
        "Execution complete"
    );
    Ok(())
}
