//! Figure rendering for the pipeline.
//!
//! Plots are drawn with tiny-skia and written as PNG files whose text
//! chunks carry the title and axis labels. All appearance settings travel
//! in an explicit [`PlotStyle`].

pub mod figure;
pub mod png;
pub mod stage;
pub mod style;

pub use figure::{bin_counts, render, Figure, PlotKind, RenderedFigure, Series};
pub use png::{encode_png, read_text_chunks, PngMetadata};
pub use stage::{build_figure, run_figures, save_figure, FiguresReport, DEFAULT_BINS};
pub use style::{named_palette, PlotStyle, Rgba, Theme};
