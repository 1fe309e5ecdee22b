//! Download the ecoregion boundary and the gridded biogeochemistry subset.
//!
//! Archive credentials are read from `COPERNICUSMARINE_SERVICE_USERNAME`
//! and `COPERNICUSMARINE_SERVICE_PASSWORD` (a `.env` file works too).

use std::time::Duration;

use acquisition::{run_acquisition, FeatureServiceClient, HttpSubsetService};
use anyhow::{Context, Result};
use clap::Parser;
use pipeline_config::PathResolver;
use stages::CommonArgs;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "download-data")]
#[command(about = "Fetch the boundary shapefile and the gridded archive subset")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = stages::bootstrap(&args.common)?;
    let resolver = PathResolver::new(&config);

    let settings = config.acquisition()?;
    let timeout = settings.request_timeout_secs.map(Duration::from_secs);

    let features = FeatureServiceClient::new(timeout)?;
    let archive =
        HttpSubsetService::from_env(config.source_url(&settings.gridded.source)?, timeout)?;

    info!("Starting data acquisition");
    let report = run_acquisition(&config, &resolver, &features, &archive)
        .await
        .inspect_err(|e| error!(category = ?e.category(), error = %e, "Acquisition stage failed"))
        .context("Data acquisition failed")?;

    info!(
        shapefile = %report.boundary.path.display(),
        subset = %report.gridded.path.display(),
        size_mb = report.gridded.size_bytes as f64 / 1_048_576.0,
        "Download complete"
    );
    Ok(())
}
