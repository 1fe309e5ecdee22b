//! Summary statistics and the configured two-group comparison.

use analysis::run_analysis;
use anyhow::{Context, Result};
use clap::Parser;
use pipeline_config::PathResolver;
use stages::CommonArgs;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "analyze")]
#[command(about = "Summarise the processed table and compare groups")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = stages::bootstrap(&args.common)?;
    let resolver = PathResolver::new(&config);

    let report = run_analysis(&config, &resolver)
        .inspect_err(|e| error!(category = ?e.category(), error = %e, "Analysis stage failed"))
        .context("Analysis failed")?;

    if let Some(result) = &report.comparison {
        info!(
            test = %result.test,
            statistic = result.statistic,
            pvalue = result.pvalue,
            "Comparison"
        );
    }
    info!(
        summary = %report.summary_path.display(),
        results = %report.results_path.display(),
        "Analysis complete"
    );
    Ok(())
}
