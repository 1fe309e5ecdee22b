//! Preprocessing and analysis stages.

use std::path::PathBuf;

use pipeline_common::{PipelineError, PipelineResult};
use pipeline_config::{ComparisonConfig, Config, PathResolver};
use tracing::info;

use crate::clean::{Cleaner, StandardCleaner};
use crate::compare::{statistical_test, ComparisonResult};
use crate::stats::{basic_analysis, summarize, summary_table};
use crate::table::{select_format, Table, TableSink, TableSource};

/// Summary statistics file in the processed area.
pub const SUMMARY_FILE: &str = "summary_statistics.csv";

/// Analysis results file in the processed area.
pub const RESULTS_FILE: &str = "analysis_results.csv";

#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rows_in: usize,
    pub rows_out: usize,
}

/// Load the raw table, clean it and save the processed table.
pub fn run_preprocess(
    config: &Config,
    resolver: &PathResolver<'_>,
) -> PipelineResult<PreprocessReport> {
    let settings = config.preprocess()?;
    let format = select_format(settings.format.as_deref())?;
    let cleaner = StandardCleaner::new(settings.cleaning.clone());

    let input = resolver.raw_dir()?.join(&settings.input);
    info!(path = %input.display(), format = format.name(), "Loading raw table");
    let raw = format.load(&input)?;
    let rows_in = raw.n_rows();

    let cleaned = cleaner.clean(raw)?;
    let rows_out = cleaned.n_rows();

    let output = resolver.ensure_processed_dir()?.join(&settings.output);
    format.save(&cleaned, &output)?;

    info!(path = %output.display(), rows_in, rows_out, "Saved processed table");

    Ok(PreprocessReport {
        input,
        output,
        rows_in,
        rows_out,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub summary_path: PathBuf,
    pub results_path: PathBuf,
    pub columns: Vec<String>,
    pub comparison: Option<ComparisonResult>,
}

/// Summarise the processed table and run the configured comparison.
///
/// Writes the summary table and a long-format results table with columns
/// `analysis,column,metric,value`.
pub fn run_analysis(
    config: &Config,
    resolver: &PathResolver<'_>,
) -> PipelineResult<AnalysisReport> {
    let settings = config.analysis()?;
    let format = select_format(config.table_format()?.as_deref())?;
    let processed = resolver.processed_dir()?;
    let input = processed.join(&settings.input);

    info!(path = %input.display(), format = format.name(), "Loading processed table");
    let table = format.load(&input)?;

    let summaries = summarize(&table, settings.columns.as_deref())?;
    let columns: Vec<String> = summaries.iter().map(|s| s.column.clone()).collect();

    let mut results = Table::new(["analysis", "column", "metric", "value"]);
    for column in &columns {
        let basic = basic_analysis(&table.numeric_values(column, "analysis.columns")?)?;
        for (metric, value) in [("mean", basic.mean), ("std", basic.std)] {
            results.push_row(vec![
                "basic".into(),
                column.as_str().into(),
                metric.into(),
                value.into(),
            ])?;
        }
    }

    let comparison = match &settings.comparison {
        Some(spec) => {
            let result = compare_groups(&table, spec)?;
            info!(
                test = %result.test,
                statistic = result.statistic,
                pvalue = result.pvalue,
                groups = ?spec.groups,
                "Comparison complete"
            );
            for (metric, value) in [("statistic", result.statistic), ("pvalue", result.pvalue)] {
                results.push_row(vec![
                    result.test.as_str().into(),
                    spec.value_column.as_str().into(),
                    metric.into(),
                    value.into(),
                ])?;
            }
            Some(result)
        }
        None => None,
    };

    let out_dir = resolver.ensure_processed_dir()?;
    let summary_path = out_dir.join(SUMMARY_FILE);
    let results_path = out_dir.join(RESULTS_FILE);
    format.save(&summary_table(&summaries)?, &summary_path)?;
    format.save(&results, &results_path)?;

    info!(
        summary = %summary_path.display(),
        results = %results_path.display(),
        columns = columns.len(),
        "Analysis complete"
    );

    Ok(AnalysisReport {
        summary_path,
        results_path,
        columns,
        comparison,
    })
}

/// Split `value_column` by the two labels in `group_column` and compare.
pub fn compare_groups(table: &Table, spec: &ComparisonConfig) -> PipelineResult<ComparisonResult> {
    let key = "analysis.comparison";
    let group_idx = table.column_index(&spec.group_column).ok_or_else(|| {
        PipelineError::invalid_value(key, format!("no column named '{}'", spec.group_column))
    })?;
    let value_idx = table.column_index(&spec.value_column).ok_or_else(|| {
        PipelineError::invalid_value(key, format!("no column named '{}'", spec.value_column))
    })?;
    if !table.is_numeric_column(value_idx) {
        return Err(PipelineError::invalid_value(
            key,
            format!("column '{}' is not numeric", spec.value_column),
        ));
    }

    let sample = |label: &str| -> Vec<f64> {
        table
            .rows()
            .iter()
            .filter(|row| row[group_idx].to_string() == label)
            .filter_map(|row| row[value_idx].as_number())
            .collect()
    };

    let a = sample(&spec.groups[0]);
    let b = sample(&spec.groups[1]);
    if a.is_empty() || b.is_empty() {
        return Err(PipelineError::invalid_value(
            key,
            format!(
                "groups '{}' ({} values) and '{}' ({} values) must both be present",
                spec.groups[0],
                a.len(),
                spec.groups[1],
                b.len()
            ),
        ));
    }

    statistical_test(&a, &b, &spec.test)
}
