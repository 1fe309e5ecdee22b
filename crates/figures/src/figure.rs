//! Figure description and rasterisation.
//!
//! Figures are drawn into a tiny-skia pixmap using the subplot geometry of
//! a single-axes matplotlib figure. Text is not rasterised; the title and
//! axis labels travel with the file as PNG text entries.

use pipeline_common::{PipelineError, PipelineResult};
use tiny_skia::{
    FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform,
};

use crate::png::PngMetadata;
use crate::style::{PlotStyle, Rgba};

/// Axes placement as fractions of the figure: left, right, bottom, top.
const SUBPLOT: (f32, f32, f32, f32) = (0.125, 0.9, 0.11, 0.88);

/// Fraction of the data range added on each side of the axes.
const MARGIN: f64 = 0.05;

/// Target number of grid lines per axis.
const TICK_TARGET: usize = 6;

/// Bar opacity when several histograms overlap.
const OVERLAP_ALPHA: u8 = 153;

/// One named sequence of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(label: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            values,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlotKind {
    /// Every series is drawn against `x`; NaN values break the line.
    Line { x: Vec<f64>, series: Vec<Series> },
    /// Each series is binned over the shared range of all series.
    Histogram { series: Vec<Series>, bins: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub kind: PlotKind,
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
}

impl Figure {
    pub fn line(x: Vec<f64>, series: Vec<Series>) -> Self {
        Self::with_kind(PlotKind::Line { x, series })
    }

    pub fn histogram(series: Vec<Series>, bins: usize) -> Self {
        Self::with_kind(PlotKind::Histogram { series, bins })
    }

    fn with_kind(kind: PlotKind) -> Self {
        Self {
            kind,
            title: None,
            x_label: None,
            y_label: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn labels(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x_label = Some(x.into());
        self.y_label = Some(y.into());
        self
    }

    pub fn series(&self) -> &[Series] {
        match &self.kind {
            PlotKind::Line { series, .. } | PlotKind::Histogram { series, .. } => series,
        }
    }

    /// PNG metadata for this figure: resolution, text and series names.
    pub fn metadata(&self, style: &PlotStyle) -> PngMetadata {
        let mut meta = PngMetadata::with_dpi(style.dpi);
        if let Some(title) = &self.title {
            meta.push_text("Title", title);
        }
        if let Some(x) = &self.x_label {
            meta.push_text("XLabel", x);
        }
        if let Some(y) = &self.y_label {
            meta.push_text("YLabel", y);
        }
        let legend: Vec<&str> = self.series().iter().map(|s| s.label.as_str()).collect();
        if !legend.is_empty() {
            meta.push_text("Legend", legend.join(", "));
        }
        meta.push_text("Software", concat!("bgc-pipeline ", env!("CARGO_PKG_VERSION")));
        meta
    }
}

/// Straight (non-premultiplied) RGBA pixels of a rendered figure.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFigure {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RenderedFigure {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }
}

/// Equal-width bin counts of `values` over `[lo, hi]`. The top edge is
/// inclusive. Non-finite values are ignored.
pub fn bin_counts(values: &[f64], lo: f64, hi: f64, bins: usize) -> Vec<usize> {
    if bins == 0 {
        return Vec::new();
    }
    let mut counts = vec![0usize; bins];
    let width = (hi - lo) / bins as f64;
    for &v in values.iter().filter(|v| v.is_finite()) {
        if v < lo || v > hi {
            continue;
        }
        let idx = if width > 0.0 {
            (((v - lo) / width) as usize).min(bins - 1)
        } else {
            0
        };
        counts[idx] += 1;
    }
    counts
}

/// Roughly `target` round tick positions covering `[lo, hi]`.
pub fn nice_ticks(lo: f64, hi: f64, target: usize) -> Vec<f64> {
    let span = hi - lo;
    if !(span.is_finite() && span > 0.0) || target == 0 {
        return Vec::new();
    }
    let raw = span / target as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 2.5, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude);

    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}

fn finite_range<'a>(values: impl Iterator<Item = &'a f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn padded((lo, hi): (f64, f64)) -> (f64, f64) {
    if hi > lo {
        let pad = (hi - lo) * MARGIN;
        (lo - pad, hi + pad)
    } else {
        (lo - 0.5, hi + 0.5)
    }
}

/// Maps data coordinates onto the axes rectangle in pixel space.
struct Axes {
    left: f32,
    top: f32,
    width: f32,
    height: f32,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl Axes {
    fn new(style: &PlotStyle, x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        let (l, r, b, t) = SUBPLOT;
        let w = style.width_px as f32;
        let h = style.height_px as f32;
        Self {
            left: (l * w).floor(),
            top: ((1.0 - t) * h).floor(),
            width: ((r - l) * w).round().max(1.0),
            height: ((t - b) * h).round().max(1.0),
            x_range,
            y_range,
        }
    }

    fn x(&self, v: f64) -> f32 {
        let (lo, hi) = self.x_range;
        self.left + ((v - lo) / (hi - lo)) as f32 * self.width
    }

    fn y(&self, v: f64) -> f32 {
        let (lo, hi) = self.y_range;
        self.top + (1.0 - ((v - lo) / (hi - lo)) as f32) * self.height
    }

    fn rect(&self) -> Option<Rect> {
        Rect::from_xywh(self.left, self.top, self.width, self.height)
    }
}

fn solid(color: Rgba, anti_alias: bool) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = anti_alias;
    paint
}

fn draw_grid_and_frame(pixmap: &mut Pixmap, axes: &Axes, style: &PlotStyle) {
    if let Some(rect) = axes.rect() {
        pixmap.fill_rect(
            rect,
            &solid(style.theme.axes_background, false),
            Transform::identity(),
            None,
        );
    }

    let line_px = style.points_to_px(0.8).max(1.0);

    if let Some(grid) = style.theme.grid {
        let paint = solid(grid, false);
        let stroke = Stroke {
            width: line_px,
            ..Stroke::default()
        };
        let mut pb = PathBuilder::new();
        for t in nice_ticks(axes.x_range.0, axes.x_range.1, TICK_TARGET) {
            let x = axes.x(t);
            pb.move_to(x, axes.top);
            pb.line_to(x, axes.top + axes.height);
        }
        for t in nice_ticks(axes.y_range.0, axes.y_range.1, TICK_TARGET) {
            let y = axes.y(t);
            pb.move_to(axes.left, y);
            pb.line_to(axes.left + axes.width, y);
        }
        if let Some(path) = pb.finish() {
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }

    if let (Some(frame), Some(rect)) = (style.theme.frame, axes.rect()) {
        let stroke = Stroke {
            width: line_px,
            ..Stroke::default()
        };
        let path = PathBuilder::from_rect(rect);
        pixmap.stroke_path(&path, &solid(frame, false), &stroke, Transform::identity(), None);
    }
}

fn draw_lines(pixmap: &mut Pixmap, axes: &Axes, style: &PlotStyle, x: &[f64], series: &[Series]) {
    let stroke = Stroke {
        width: style.line_width(),
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };

    for (i, s) in series.iter().enumerate() {
        let paint = solid(style.series_color(i), true);
        let mut pb = PathBuilder::new();
        let mut pen_down = false;

        for (&xv, &yv) in x.iter().zip(&s.values) {
            if !(xv.is_finite() && yv.is_finite()) {
                pen_down = false;
                continue;
            }
            let (px, py) = (axes.x(xv), axes.y(yv));
            if pen_down {
                pb.line_to(px, py);
            } else {
                pb.move_to(px, py);
                pen_down = true;
            }
        }

        if let Some(path) = pb.finish() {
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }
}

fn draw_bars(
    pixmap: &mut Pixmap,
    axes: &Axes,
    style: &PlotStyle,
    edges: (f64, f64),
    counts: &[Vec<usize>],
) {
    let bins = counts.first().map_or(0, Vec::len);
    let width = (edges.1 - edges.0) / bins.max(1) as f64;
    let alpha = if counts.len() > 1 { OVERLAP_ALPHA } else { 255 };

    for (i, series_counts) in counts.iter().enumerate() {
        let paint = solid(style.series_color(i).with_alpha(alpha), false);
        let mut pb = PathBuilder::new();
        for (b, &count) in series_counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let x0 = axes.x(edges.0 + b as f64 * width);
            let x1 = axes.x(edges.0 + (b + 1) as f64 * width);
            let y0 = axes.y(count as f64);
            let y1 = axes.y(0.0);
            if let Some(rect) = Rect::from_ltrb(x0, y0, x1, y1) {
                pb.push_rect(rect);
            }
        }
        if let Some(path) = pb.finish() {
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }
}

/// Rasterise `figure` with `style`.
pub fn render(figure: &Figure, style: &PlotStyle) -> PipelineResult<RenderedFigure> {
    let mut pixmap = Pixmap::new(style.width_px, style.height_px).ok_or_else(|| {
        PipelineError::invalid_value(
            "plotting.figsize",
            format!("cannot allocate {}x{} canvas", style.width_px, style.height_px),
        )
    })?;
    pixmap.fill(style.theme.figure_background.to_skia());

    let no_data = || PipelineError::DataRead("figure has no finite values to plot".to_string());

    match &figure.kind {
        PlotKind::Line { x, series } => {
            let x_range = finite_range(x.iter()).ok_or_else(no_data)?;
            let y_range =
                finite_range(series.iter().flat_map(|s| s.values.iter())).ok_or_else(no_data)?;
            let axes = Axes::new(style, padded(x_range), padded(y_range));
            draw_grid_and_frame(&mut pixmap, &axes, style);
            draw_lines(&mut pixmap, &axes, style, x, series);
        }
        PlotKind::Histogram { series, bins } => {
            if *bins == 0 {
                return Err(PipelineError::invalid_value("figures.plots.bins", "must be positive"));
            }
            let (lo, hi) =
                finite_range(series.iter().flat_map(|s| s.values.iter())).ok_or_else(no_data)?;
            let edges = if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) };
            let counts: Vec<Vec<usize>> = series
                .iter()
                .map(|s| bin_counts(&s.values, edges.0, edges.1, *bins))
                .collect();
            let peak = counts.iter().flatten().copied().max().unwrap_or(0).max(1);

            let axes = Axes::new(style, padded(edges), (0.0, peak as f64 * (1.0 + MARGIN)));
            draw_grid_and_frame(&mut pixmap, &axes, style);
            draw_bars(&mut pixmap, &axes, style, edges, &counts);
        }
    }

    let pixels = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();

    Ok(RenderedFigure {
        width: style.width_px,
        height: style.height_px,
        pixels,
    })
}
