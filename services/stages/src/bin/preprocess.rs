//! Clean the raw table and write the processed table.

use analysis::run_preprocess;
use anyhow::{Context, Result};
use clap::Parser;
use pipeline_config::PathResolver;
use stages::CommonArgs;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "preprocess")]
#[command(about = "Load, clean and save the raw table")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = stages::bootstrap(&args.common)?;
    let resolver = PathResolver::new(&config);

    let report = run_preprocess(&config, &resolver)
        .inspect_err(|e| error!(category = ?e.category(), error = %e, "Preprocess stage failed"))
        .context("Preprocessing failed")?;

    info!(
        output = %report.output.display(),
        rows_dropped = report.rows_in.saturating_sub(report.rows_out),
        "Preprocessing complete"
    );
    Ok(())
}
