//! Saving figures and the figure-generation stage.

use std::fs;
use std::path::{Path, PathBuf};

use analysis::{select_format, Table, TableSource};
use pipeline_common::{PipelineError, PipelineResult};
use pipeline_config::{ensure_dir, Config, FigureSpec, PathResolver};
use tracing::{debug, info};

use crate::figure::{render, Figure, Series};
use crate::png::encode_png;
use crate::style::PlotStyle;

/// Bins used when a histogram does not set `bins`.
pub const DEFAULT_BINS: usize = 10;

const SUPPORTED_FORMATS: &[&str] = &["png"];

/// Render `figure` and write it to `<dir>/<name>.<format>`.
///
/// `dir` is created when missing. Only `png` output is supported.
pub fn save_figure(
    figure: &Figure,
    name: &str,
    style: &PlotStyle,
    format: &str,
    dir: &Path,
) -> PipelineResult<PathBuf> {
    let format = format.to_ascii_lowercase();
    if !SUPPORTED_FORMATS.contains(&format.as_str()) {
        return Err(PipelineError::unsupported("plotting.format", format));
    }

    let rendered = render(figure, style)?;
    let bytes = encode_png(
        &rendered.pixels,
        rendered.width as usize,
        rendered.height as usize,
        &figure.metadata(style),
    )
    .map_err(PipelineError::Render)?;

    let dir = ensure_dir(dir.to_path_buf())?;
    let path = dir.join(format!("{}.{}", name, format));
    fs::write(&path, &bytes)?;

    debug!(path = %path.display(), bytes = bytes.len(), "Figure written");
    Ok(path)
}

fn numeric_column(table: &Table, name: &str, key: &str) -> PipelineResult<usize> {
    let idx = table
        .column_index(name)
        .ok_or_else(|| PipelineError::invalid_value(key, format!("no column named '{}'", name)))?;
    if !table.is_numeric_column(idx) {
        return Err(PipelineError::invalid_value(
            key,
            format!("column '{}' is not numeric", name),
        ));
    }
    Ok(idx)
}

/// Row-aligned values of a numeric column; missing cells become NaN.
fn aligned_values(table: &Table, idx: usize) -> Vec<f64> {
    table
        .column(idx)
        .map(|cell| cell.as_number().unwrap_or(f64::NAN))
        .collect()
}

/// Turn one configured plot into a figure over `table`.
pub fn build_figure(table: &Table, spec: &FigureSpec) -> PipelineResult<Figure> {
    let key = "figures.plots";
    if spec.columns.is_empty() {
        return Err(PipelineError::invalid_value(
            key,
            format!("plot '{}' names no columns", spec.name),
        ));
    }

    let mut figure = match spec.kind.as_str() {
        "line" => {
            let x = match &spec.x {
                Some(name) => aligned_values(table, numeric_column(table, name, key)?),
                None => (0..table.n_rows()).map(|i| i as f64).collect(),
            };
            let series = spec
                .columns
                .iter()
                .map(|name| {
                    let idx = numeric_column(table, name, key)?;
                    Ok(Series::new(name.clone(), aligned_values(table, idx)))
                })
                .collect::<PipelineResult<Vec<_>>>()?;
            Figure::line(x, series)
        }
        "histogram" => {
            let series = spec
                .columns
                .iter()
                .map(|name| Ok(Series::new(name.clone(), table.numeric_values(name, key)?)))
                .collect::<PipelineResult<Vec<_>>>()?;
            Figure::histogram(series, spec.bins.unwrap_or(DEFAULT_BINS))
        }
        other => return Err(PipelineError::unsupported("figures.plots.kind", other)),
    };

    figure.title = spec.title.clone();
    figure.x_label = spec.x_label.clone().or_else(|| spec.x.clone());
    figure.y_label = spec.y_label.clone();
    Ok(figure)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FiguresReport {
    /// Plots rendered, whether or not they were saved.
    pub rendered: usize,
    pub saved: Vec<PathBuf>,
}

/// Render every configured plot from the processed table and save them
/// when `plotting.save_figures` is set.
pub fn run_figures(config: &Config, resolver: &PathResolver<'_>) -> PipelineResult<FiguresReport> {
    let plotting = config.plotting()?;
    let settings = config.figures()?;
    let style = PlotStyle::from_config(&plotting)?;

    if settings.plots.is_empty() {
        info!("No figures configured");
        return Ok(FiguresReport::default());
    }

    let format = select_format(config.table_format()?.as_deref())?;
    let input = resolver.processed_dir()?.join(&settings.input);
    info!(path = %input.display(), plots = settings.plots.len(), "Loading processed table");
    let table = format.load(&input)?;

    let out_dir = if plotting.save_figures {
        Some(resolver.ensure_figures_dir()?)
    } else {
        info!("plotting.save_figures is false, figures will not be written");
        None
    };

    let mut report = FiguresReport::default();
    for spec in &settings.plots {
        let figure = build_figure(&table, spec)?;
        match &out_dir {
            Some(dir) => {
                let path = save_figure(&figure, &spec.name, &style, &plotting.format, dir)?;
                info!(name = %spec.name, path = %path.display(), "Saved figure");
                report.saved.push(path);
            }
            None => {
                render(&figure, &style)?;
                debug!(name = %spec.name, "Rendered figure");
            }
        }
        report.rendered += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis::Cell;

    fn spec(kind: &str, columns: &[&str]) -> FigureSpec {
        FigureSpec {
            name: "figure_01".to_string(),
            kind: kind.to_string(),
            x: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            bins: None,
            title: Some("Chlorophyll".to_string()),
            x_label: None,
            y_label: None,
        }
    }

    fn table() -> Table {
        let mut t = Table::new(["station", "chl"]);
        t.push_row(vec![Cell::from("A"), Cell::from(1.2)]).unwrap();
        t.push_row(vec![Cell::from("B"), Cell::Missing]).unwrap();
        t.push_row(vec![Cell::from("C"), Cell::from(0.7)]).unwrap();
        t
    }

    #[test]
    fn test_line_keeps_rows_aligned() {
        let figure = build_figure(&table(), &spec("line", &["chl"])).unwrap();
        match figure.kind {
            crate::figure::PlotKind::Line { x, series } => {
                assert_eq!(x, vec![0.0, 1.0, 2.0]);
                assert_eq!(series[0].values[0], 1.2);
                assert!(series[0].values[1].is_nan());
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(figure.title.as_deref(), Some("Chlorophyll"));
    }

    #[test]
    fn test_histogram_drops_missing() {
        let mut s = spec("histogram", &["chl"]);
        s.bins = Some(4);
        let figure = build_figure(&table(), &s).unwrap();
        assert_eq!(
            figure.kind,
            crate::figure::PlotKind::Histogram {
                series: vec![Series::new("chl", vec![1.2, 0.7])],
                bins: 4,
            }
        );
    }

    #[test]
    fn test_build_rejects_bad_specs() {
        assert!(matches!(
            build_figure(&table(), &spec("violin", &["chl"])),
            Err(PipelineError::UnsupportedOption { .. })
        ));
        assert!(matches!(
            build_figure(&table(), &spec("line", &["station"])),
            Err(PipelineError::InvalidValue { .. })
        ));
        assert!(matches!(
            build_figure(&table(), &spec("line", &[])),
            Err(PipelineError::InvalidValue { .. })
        ));
    }
}
