//! Typed views over the configuration sections each stage reads.
//!
//! Defaults here are the ad hoc per-call defaults of each stage; nothing is
//! merged back into the document.

use pipeline_common::{DateRange, PipelineError, PipelineResult};
use serde::Deserialize;

use crate::loader::Config;

// ============================================================================
// Plotting (plotting)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlottingConfig {
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default = "default_palette")]
    pub palette: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default = "default_figsize")]
    pub figsize: [f64; 2],
    pub save_figures: bool,
}

fn default_style() -> String {
    "seaborn-v0_8-darkgrid".to_string()
}

fn default_palette() -> String {
    "Set2".to_string()
}

fn default_format() -> String {
    "png".to_string()
}

fn default_dpi() -> u32 {
    300
}

fn default_figsize() -> [f64; 2] {
    [10.0, 6.0]
}

// ============================================================================
// Acquisition (acquisition.*)
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcquisitionConfig {
    #[serde(default)]
    pub boundary: BoundaryConfig,
    #[serde(default)]
    pub gridded: GriddedConfig,
    /// Per-request timeout; requests wait indefinitely when unset.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// WFS query selecting the ecoregion boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct BoundaryConfig {
    /// Name of the `data.sources` entry holding the WFS endpoint.
    #[serde(default = "default_boundary_source")]
    pub source: String,
    #[serde(default = "default_type_name")]
    pub type_name: String,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default = "default_region_id")]
    pub region_id: u32,
    /// Base name of the persisted shapefile set.
    #[serde(default = "default_layer_name")]
    pub layer_name: String,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            source: default_boundary_source(),
            type_name: default_type_name(),
            id_field: default_id_field(),
            region_id: default_region_id(),
            layer_name: default_layer_name(),
        }
    }
}

impl BoundaryConfig {
    /// CQL filter selecting exactly one region.
    pub fn cql_filter(&self) -> String {
        format!("{}={}", self.id_field, self.region_id)
    }
}

fn default_boundary_source() -> String {
    "marine_regions".to_string()
}

fn default_type_name() -> String {
    "MarineRegions:lme".to_string()
}

fn default_id_field() -> String {
    "lme_number".to_string()
}

fn default_region_id() -> u32 {
    3 // California Current
}

fn default_layer_name() -> String {
    "california_current_lme".to_string()
}

/// Remote archive subset request.
#[derive(Debug, Clone, Deserialize)]
pub struct GriddedConfig {
    /// Name of the `data.sources` entry holding the subsetting endpoint.
    #[serde(default = "default_gridded_source")]
    pub source: String,
    #[serde(default = "default_dataset_id")]
    pub dataset_id: String,
    #[serde(default = "default_variables")]
    pub variables: Vec<String>,
    #[serde(default = "default_start_date")]
    pub start_date: String,
    #[serde(default = "default_end_date")]
    pub end_date: String,
}

impl Default for GriddedConfig {
    fn default() -> Self {
        Self {
            source: default_gridded_source(),
            dataset_id: default_dataset_id(),
            variables: default_variables(),
            start_date: default_start_date(),
            end_date: default_end_date(),
        }
    }
}

impl GriddedConfig {
    pub fn date_range(&self) -> PipelineResult<DateRange> {
        DateRange::parse(&self.start_date, &self.end_date)
    }
}

fn default_gridded_source() -> String {
    "copernicus".to_string()
}

fn default_dataset_id() -> String {
    "cmems_mod_glo_bgc_my_0.25deg_P1M-m".to_string()
}

fn default_variables() -> Vec<String> {
    ["chl", "no3", "po4", "si", "o2", "nppv"]
        .iter()
        .map(|v| v.to_string())
        .collect()
}

fn default_start_date() -> String {
    "2005-01-01".to_string()
}

fn default_end_date() -> String {
    "2024-12-31".to_string()
}

// ============================================================================
// Preprocessing (preprocess)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PreprocessConfig {
    /// Raw table, relative to the raw data area.
    pub input: String,
    /// Processed table, relative to the processed data area.
    #[serde(default = "default_processed_file")]
    pub output: String,
    /// Table format; the stage refuses to guess when this is absent.
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub cleaning: CleaningConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CleaningConfig {
    #[serde(default = "default_true")]
    pub drop_duplicates: bool,
    #[serde(default = "default_true")]
    pub drop_missing: bool,
    #[serde(default = "default_true")]
    pub coerce_numeric: bool,
    /// Rows with any numeric cell further than this many standard
    /// deviations from its column mean are dropped.
    #[serde(default)]
    pub outlier_zscore: Option<f64>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            drop_duplicates: true,
            drop_missing: true,
            coerce_numeric: true,
            outlier_zscore: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_processed_file() -> String {
    "processed_data.csv".to_string()
}

// ============================================================================
// Analysis (analysis)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Processed table, relative to the processed data area.
    #[serde(default = "default_processed_file")]
    pub input: String,
    /// Columns to summarise; all numeric columns when absent.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub comparison: Option<ComparisonConfig>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input: default_processed_file(),
            columns: None,
            comparison: None,
        }
    }
}

/// Two-group comparison on one value column.
#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonConfig {
    #[serde(default = "default_test_kind")]
    pub test: String,
    pub group_column: String,
    pub value_column: String,
    pub groups: [String; 2],
}

fn default_test_kind() -> String {
    "ttest".to_string()
}

// ============================================================================
// Figures (figures)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct FiguresConfig {
    /// Processed table, relative to the processed data area.
    #[serde(default = "default_processed_file")]
    pub input: String,
    #[serde(default)]
    pub plots: Vec<FigureSpec>,
}

impl Default for FiguresConfig {
    fn default() -> Self {
        Self {
            input: default_processed_file(),
            plots: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FigureSpec {
    /// Output file stem, e.g. `figure_01`.
    pub name: String,
    /// `line` or `histogram`.
    pub kind: String,
    /// X column for line plots; row index when absent.
    #[serde(default)]
    pub x: Option<String>,
    /// Columns to draw.
    pub columns: Vec<String>,
    #[serde(default)]
    pub bins: Option<usize>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub x_label: Option<String>,
    #[serde(default)]
    pub y_label: Option<String>,
}

// ============================================================================
// Notebook publishing (publish)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "default_notebooks_dir")]
    pub notebooks_dir: String,
    #[serde(default = "default_docs_dir")]
    pub output_dir: String,
    /// Program invoked as `<program> nbconvert --to html ...`.
    #[serde(default = "default_converter")]
    pub converter: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            notebooks_dir: default_notebooks_dir(),
            output_dir: default_docs_dir(),
            converter: default_converter(),
        }
    }
}

fn default_notebooks_dir() -> String {
    "notebooks".to_string()
}

fn default_docs_dir() -> String {
    "docs".to_string()
}

fn default_converter() -> String {
    "jupyter".to_string()
}

// ============================================================================
// Logging (logging)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// ============================================================================
// Section accessors
// ============================================================================

impl Config {
    /// The `plotting` section. `plotting.save_figures` has no default.
    pub fn plotting(&self) -> PipelineResult<PlottingConfig> {
        self.require("plotting.save_figures")?;
        self.section("plotting")
    }

    pub fn acquisition(&self) -> PipelineResult<AcquisitionConfig> {
        self.section_or_default("acquisition")
    }

    /// The `preprocess` section. `preprocess.input` has no default.
    pub fn preprocess(&self) -> PipelineResult<PreprocessConfig> {
        self.require("preprocess.input")?;
        self.section("preprocess")
    }

    /// `preprocess.format`, the table format every tabular stage reads and
    /// writes. Unlike [`Config::preprocess`] this does not need
    /// `preprocess.input`.
    pub fn table_format(&self) -> PipelineResult<Option<String>> {
        let key = "preprocess.format";
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| PipelineError::invalid_value(key, "expected a string")),
        }
    }

    pub fn analysis(&self) -> PipelineResult<AnalysisConfig> {
        self.section_or_default("analysis")
    }

    pub fn figures(&self) -> PipelineResult<FiguresConfig> {
        self.section_or_default("figures")
    }

    pub fn publish(&self) -> PipelineResult<PublishConfig> {
        self.section_or_default("publish")
    }

    pub fn logging(&self) -> PipelineResult<LoggingConfig> {
        self.section_or_default("logging")
    }
}
