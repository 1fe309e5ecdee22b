//! Plot styling.
//!
//! A [`PlotStyle`] is built once from the `plotting` section and passed to
//! every render and save call. Nothing about the style is global.

use pipeline_common::{PipelineError, PipelineResult};
use pipeline_config::PlottingConfig;
use tracing::warn;

/// Largest edge, in pixels, a figure may have.
const MAX_EDGE_PX: f64 = 20_000.0;

/// An opaque-or-translucent RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (the `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();

        match hex.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
                a: channel(6)?,
            }),
            _ => None,
        }
    }

    pub(crate) fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}

const SET2: &[&str] = &[
    "#66c2a5", "#fc8d62", "#8da0cb", "#e78ac3", "#a6d854", "#ffd92f", "#e5c494", "#b3b3b3",
];
const SET1: &[&str] = &[
    "#e41a1c", "#377eb8", "#4daf4a", "#984ea3", "#ff7f00", "#ffff33", "#a65628", "#f781bf",
    "#999999",
];
const DARK2: &[&str] = &[
    "#1b9e77", "#d95f02", "#7570b3", "#e7298a", "#66a61e", "#e6ab02", "#a6761d", "#666666",
];
const PASTEL1: &[&str] = &[
    "#fbb4ae", "#b3cde3", "#ccebc5", "#decbe4", "#fed9a6", "#ffffcc", "#e5d8bd", "#fddaec",
    "#f2f2f2",
];
const TAB10: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];
const DEEP: &[&str] = &[
    "#4c72b0", "#dd8452", "#55a868", "#c44e52", "#8172b3", "#937860", "#da8bc3", "#8c8c8c",
    "#ccb974", "#64b5cd",
];

/// Resolve a palette name, or a comma-separated list of hex colours.
pub fn named_palette(name: &str) -> Option<Vec<Rgba>> {
    let hexes: Vec<&str> = match name {
        "Set2" => SET2.to_vec(),
        "Set1" => SET1.to_vec(),
        "Dark2" => DARK2.to_vec(),
        "Pastel1" => PASTEL1.to_vec(),
        "tab10" => TAB10.to_vec(),
        "deep" => DEEP.to_vec(),
        custom if custom.contains('#') => custom.split(',').collect(),
        _ => return None,
    };

    hexes.into_iter().map(Rgba::from_hex).collect()
}

/// Colours of the axes area for a named style sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub figure_background: Rgba,
    pub axes_background: Rgba,
    pub grid: Option<Rgba>,
    pub frame: Option<Rgba>,
}

impl Theme {
    /// Plain white axes with a black frame and no grid.
    pub const DEFAULT: Theme = Theme {
        figure_background: Rgba::WHITE,
        axes_background: Rgba::WHITE,
        grid: None,
        frame: Some(Rgba::BLACK),
    };

    pub fn named(name: &str) -> Option<Theme> {
        match name {
            "default" | "classic" => Some(Self::DEFAULT),
            "seaborn-v0_8-darkgrid" | "darkgrid" => Some(Theme {
                figure_background: Rgba::WHITE,
                axes_background: Rgba::rgb(0xea, 0xea, 0xf2),
                grid: Some(Rgba::WHITE),
                frame: None,
            }),
            "seaborn-v0_8-whitegrid" | "whitegrid" => Some(Theme {
                figure_background: Rgba::WHITE,
                axes_background: Rgba::WHITE,
                grid: Some(Rgba::rgb(0xcc, 0xcc, 0xcc)),
                frame: Some(Rgba::rgb(0xcc, 0xcc, 0xcc)),
            }),
            "ggplot" => Some(Theme {
                figure_background: Rgba::WHITE,
                axes_background: Rgba::rgb(0xe5, 0xe5, 0xe5),
                grid: Some(Rgba::WHITE),
                frame: None,
            }),
            _ => None,
        }
    }
}

/// Everything a render call needs to know about appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotStyle {
    pub theme_name: String,
    pub theme: Theme,
    pub palette: Vec<Rgba>,
    pub width_px: u32,
    pub height_px: u32,
    pub dpi: u32,
}

impl PlotStyle {
    /// Build the style from the `plotting` section.
    ///
    /// An unknown style sheet falls back to the plain default with a warning;
    /// an unknown palette is an error.
    pub fn from_config(plotting: &PlottingConfig) -> PipelineResult<Self> {
        let theme = match Theme::named(&plotting.style) {
            Some(theme) => theme,
            None => {
                warn!(style = %plotting.style, "Unknown plot style, using default");
                Theme::DEFAULT
            }
        };

        let palette = named_palette(&plotting.palette)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| PipelineError::unsupported("plotting.palette", &plotting.palette))?;

        if plotting.dpi == 0 {
            return Err(PipelineError::invalid_value("plotting.dpi", "must be positive"));
        }

        let [w_in, h_in] = plotting.figsize;
        let edge = |inches: f64| -> PipelineResult<u32> {
            let px = (inches * plotting.dpi as f64).round();
            if !(1.0..=MAX_EDGE_PX).contains(&px) {
                return Err(PipelineError::invalid_value(
                    "plotting.figsize",
                    format!("{} in at {} dpi gives {} px", inches, plotting.dpi, px),
                ));
            }
            Ok(px as u32)
        };

        Ok(Self {
            theme_name: plotting.style.clone(),
            theme,
            palette,
            width_px: edge(w_in)?,
            height_px: edge(h_in)?,
            dpi: plotting.dpi,
        })
    }

    /// Colour for the `i`th series, cycling through the palette.
    pub fn series_color(&self, i: usize) -> Rgba {
        self.palette[i % self.palette.len()]
    }

    /// Convert typographic points to pixels at this resolution.
    pub fn points_to_px(&self, points: f32) -> f32 {
        points * self.dpi as f32 / 72.0
    }

    /// Line width for data series: 1.5 pt.
    pub fn line_width(&self) -> f32 {
        self.points_to_px(1.5).max(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plotting() -> PlottingConfig {
        PlottingConfig {
            style: "seaborn-v0_8-darkgrid".to_string(),
            palette: "Set2".to_string(),
            format: "png".to_string(),
            dpi: 100,
            figsize: [10.0, 6.0],
            save_figures: true,
        }
    }

    #[test]
    fn test_from_hex() {
        assert_eq!(Rgba::from_hex("#FF0000"), Some(Rgba::rgb(255, 0, 0)));
        assert_eq!(Rgba::from_hex("00ff0080"), Some(Rgba::rgb(0, 255, 0).with_alpha(128)));
        assert_eq!(Rgba::from_hex("#GGGGGG"), None);
        assert_eq!(Rgba::from_hex("#FFF"), None);
    }

    #[test]
    fn test_named_palettes() {
        assert_eq!(named_palette("Set2").unwrap().len(), 8);
        assert_eq!(named_palette("tab10").unwrap()[0], Rgba::rgb(0x1f, 0x77, 0xb4));
        assert_eq!(named_palette("#000000,#ffffff").unwrap().len(), 2);
        assert!(named_palette("viridis").is_none());
    }

    #[test]
    fn test_style_from_config() {
        let style = PlotStyle::from_config(&plotting()).unwrap();
        assert_eq!((style.width_px, style.height_px), (1000, 600));
        assert_eq!(style.theme.grid, Some(Rgba::WHITE));
        assert_eq!(style.series_color(8), style.series_color(0));
    }

    #[test]
    fn test_unknown_style_falls_back() {
        let mut cfg = plotting();
        cfg.style = "solarized".to_string();
        let style = PlotStyle::from_config(&cfg).unwrap();
        assert_eq!(style.theme, Theme::DEFAULT);
    }

    #[test]
    fn test_unknown_palette_rejected() {
        let mut cfg = plotting();
        cfg.palette = "viridis".to_string();
        assert!(matches!(
            PlotStyle::from_config(&cfg),
            Err(PipelineError::UnsupportedOption { .. })
        ));
    }

    #[test]
    fn test_degenerate_size_rejected() {
        let mut cfg = plotting();
        cfg.figsize = [0.0, 6.0];
        assert!(matches!(
            PlotStyle::from_config(&cfg),
            Err(PipelineError::InvalidValue { .. })
        ));
    }
}
