//! Command-line flags and process setup shared by the stage binaries.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use pipeline_common::{PipelineError, PipelineResult};
use pipeline_config::{Config, LoggingConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Flags accepted by every stage program.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Pipeline configuration file
    #[arg(long, env = "PIPELINE_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Log level (overrides logging.level)
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log output format (overrides logging.format)
    #[arg(long, env = "LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Pretty,
    /// One JSON object per event
    Json,
}

/// Effective logging settings after flags and configuration are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: Level,
    pub format: LogFormat,
}

impl LogSettings {
    /// Flags win over the `logging` section.
    pub fn resolve(args: &CommonArgs, logging: &LoggingConfig) -> PipelineResult<Self> {
        let level = args.log_level.as_deref().unwrap_or(&logging.level);
        let format = match args.log_format {
            Some(format) => format,
            None => LogFormat::from_str(&logging.format, true)
                .map_err(|_| PipelineError::unsupported("logging.format", &logging.format))?,
        };

        Ok(Self {
            level: parse_level(level),
            format,
        })
    }
}

/// Map a level name to a tracing level. Unknown names mean `info`.
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global subscriber.
pub fn init_logging(settings: &LogSettings) -> Result<()> {
    match settings.format {
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(settings.level)
                .with_target(true)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Pretty => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(settings.level)
                .with_target(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

/// Load the configuration named by the flags and start logging.
pub fn bootstrap(args: &CommonArgs) -> Result<Config> {
    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;

    let settings = LogSettings::resolve(args, &config.logging()?)?;
    init_logging(&settings)?;

    info!(config = %args.config.display(), level = %settings.level, "Configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        common: CommonArgs,
    }

    fn logging(level: &str, format: &str) -> LoggingConfig {
        LoggingConfig {
            level: level.to_string(),
            format: format.to_string(),
        }
    }

    #[test]
    fn test_defaults_need_no_arguments() {
        let cli = TestCli::try_parse_from(["preprocess"]).unwrap();
        assert_eq!(cli.common.config, PathBuf::from("config.yaml"));
        assert!(cli.common.log_format.is_none());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = TestCli::try_parse_from([
            "analyze",
            "--config",
            "other.yaml",
            "--log-level",
            "debug",
            "--log-format",
            "json",
        ])
        .unwrap();

        let settings = LogSettings::resolve(&cli.common, &logging("warn", "pretty")).unwrap();
        assert_eq!(settings.level, Level::DEBUG);
        assert_eq!(settings.format, LogFormat::Json);
    }

    #[test]
    fn test_config_used_when_flags_absent() {
        let cli = TestCli::try_parse_from(["analyze"]).unwrap();

        let settings = LogSettings::resolve(&cli.common, &logging("error", "JSON")).unwrap();
        assert_eq!(settings.level, Level::ERROR);
        assert_eq!(settings.format, LogFormat::Json);

        assert!(matches!(
            LogSettings::resolve(&cli.common, &logging("info", "xml")),
            Err(PipelineError::UnsupportedOption { .. })
        ));
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("TRACE"), Level::TRACE);
        assert_eq!(parse_level("warning"), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }
}
