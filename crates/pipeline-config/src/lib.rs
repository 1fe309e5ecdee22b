//! Configuration for the pipeline stages.
//!
//! - [`loader`]: the YAML document and dotted-key access
//! - [`sections`]: typed views of the sections each stage reads
//! - [`paths`]: data-area directories derived from `data.paths`

pub mod loader;
pub mod paths;
pub mod sections;

pub use loader::Config;
pub use paths::{ensure_dir, PathResolver, SHAPEFILE_AREA, SUBSET_AREA};
pub use sections::{
    AcquisitionConfig, AnalysisConfig, BoundaryConfig, CleaningConfig, ComparisonConfig,
    FigureSpec, FiguresConfig, GriddedConfig, LoggingConfig, PlottingConfig, PreprocessConfig,
    PublishConfig,
};
