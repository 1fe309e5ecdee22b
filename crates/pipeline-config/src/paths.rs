//! Data-area path resolution.
//!
//! Directory roots come from `data.paths`. Relative roots are resolved
//! against the working directory, or against an explicit root when one is
//! supplied. Only the `ensure_*` methods touch the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use pipeline_common::PipelineResult;
use tracing::debug;

use crate::loader::Config;

/// Raw sub-area holding vector boundary files.
pub const SHAPEFILE_AREA: &str = "shapefiles";

/// Raw sub-area holding gridded archive subsets.
pub const SUBSET_AREA: &str = "copernicus";

/// Resolves the data areas named in a configuration.
#[derive(Debug, Clone)]
pub struct PathResolver<'a> {
    config: &'a Config,
    root: Option<PathBuf>,
}

impl<'a> PathResolver<'a> {
    /// Resolve relative paths against the working directory.
    pub fn new(config: &'a Config) -> Self {
        Self { config, root: None }
    }

    /// Resolve relative paths against `root`.
    pub fn with_root(config: &'a Config, root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            root: Some(root.into()),
        }
    }

    /// Apply the root to a configured path. Absolute paths pass through.
    pub fn resolve(&self, configured: impl AsRef<Path>) -> PathBuf {
        let configured = configured.as_ref();
        match &self.root {
            Some(root) if configured.is_relative() => root.join(configured),
            _ => configured.to_path_buf(),
        }
    }

    fn area(&self, name: &str) -> PipelineResult<PathBuf> {
        let configured = self.config.require_str(&format!("data.paths.{}", name))?;
        Ok(self.resolve(configured))
    }

    pub fn raw_dir(&self) -> PipelineResult<PathBuf> {
        self.area("raw")
    }

    pub fn processed_dir(&self) -> PipelineResult<PathBuf> {
        self.area("processed")
    }

    pub fn figures_dir(&self) -> PipelineResult<PathBuf> {
        self.area("figures")
    }

    pub fn shapefile_dir(&self) -> PipelineResult<PathBuf> {
        Ok(self.raw_dir()?.join(SHAPEFILE_AREA))
    }

    pub fn subset_dir(&self) -> PipelineResult<PathBuf> {
        Ok(self.raw_dir()?.join(SUBSET_AREA))
    }

    pub fn ensure_raw_dir(&self) -> PipelineResult<PathBuf> {
        ensure_dir(self.raw_dir()?)
    }

    pub fn ensure_processed_dir(&self) -> PipelineResult<PathBuf> {
        ensure_dir(self.processed_dir()?)
    }

    pub fn ensure_figures_dir(&self) -> PipelineResult<PathBuf> {
        ensure_dir(self.figures_dir()?)
    }

    pub fn ensure_shapefile_dir(&self) -> PipelineResult<PathBuf> {
        ensure_dir(self.shapefile_dir()?)
    }

    pub fn ensure_subset_dir(&self) -> PipelineResult<PathBuf> {
        ensure_dir(self.subset_dir()?)
    }
}

/// Create a directory and its parents if absent. Idempotent.
pub fn ensure_dir(dir: PathBuf) -> PipelineResult<PathBuf> {
    if !dir.is_dir() {
        fs::create_dir_all(&dir)?;
        debug!(path = %dir.display(), "Created directory");
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_join_root() {
        let config = Config::from_yaml_str("data:\n  paths:\n    raw: data/raw\n").unwrap();
        let resolver = PathResolver::with_root(&config, "/work");
        assert_eq!(resolver.raw_dir().unwrap(), PathBuf::from("/work/data/raw"));
        assert_eq!(
            resolver.shapefile_dir().unwrap(),
            PathBuf::from("/work/data/raw/shapefiles")
        );
        assert_eq!(
            resolver.subset_dir().unwrap(),
            PathBuf::from("/work/data/raw/copernicus")
        );
    }

    #[test]
    fn test_absolute_paths_pass_through() {
        let config = Config::from_yaml_str("data:\n  paths:\n    raw: /srv/raw\n").unwrap();
        let resolver = PathResolver::with_root(&config, "/work");
        assert_eq!(resolver.raw_dir().unwrap(), PathBuf::from("/srv/raw"));
    }

    #[test]
    fn test_without_root_stays_relative() {
        let config = Config::from_yaml_str("data:\n  paths:\n    figures: figures\n").unwrap();
        let resolver = PathResolver::new(&config);
        assert_eq!(resolver.figures_dir().unwrap(), PathBuf::from("figures"));
    }

    #[test]
    fn test_missing_area() {
        let config = Config::from_yaml_str("data:\n  paths:\n    raw: data/raw\n").unwrap();
        let resolver = PathResolver::new(&config);
        assert!(resolver.processed_dir().is_err());
    }
}
