//! Convert every notebook to a static HTML page.

use anyhow::{Context, Result};
use clap::Parser;
use pipeline_config::PathResolver;
use stages::{publish_notebooks, CommonArgs, JupyterConverter};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "generate-html")]
#[command(about = "Convert notebooks to HTML for static hosting")]
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

    let settings = config.publish()?;
    let notebooks_dir = resolver.resolve(&settings.notebooks_dir);
    let output_dir = resolver.resolve(&settings.output_dir);
    let converter = JupyterConverter::new(&settings.converter);

    let report = publish_notebooks(&notebooks_dir, &output_dir, &converter)
        .await
        .inspect_err(|e| error!(category = ?e.category(), error = %e, "Publish stage failed"))
        .context("Notebook publishing failed")?;

    info!(
        output_dir = %output_dir.display(),
        failed = report.failures.len(),
        "{}",
        report.summary()
    );
    Ok(())
}
