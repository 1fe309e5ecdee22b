//! Render the configured figures from the processed table.

use anyhow::{Context, Result};
use clap::Parser;
use figures::run_figures;
use pipeline_config::PathResolver;
use stages::CommonArgs;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "generate-figures")]
#[command(about = "Render line plots and histograms to PNG")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = stages::bootstrap(&args.common)?;
    let resolver = PathResolver::new(&config);

    let report = run_figures(&config, &resolver)
        .inspect_err(|e| error!(category = ?e.category(), error = %e, "Figure stage failed"))
        .context("Figure generation failed")?;

    info!(
        rendered = report.rendered,
        saved = report.saved.len(),
        "Figure generation complete"
    );
    Ok(())
}
