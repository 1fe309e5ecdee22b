//! The `config.yaml` at the repository root loads and drives every stage.

use std::path::{Path, PathBuf};

use pipeline_config::{Config, PathResolver};

const SHIPPED_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config.yaml");

#[test]
fn test_shipped_config_loads_with_defaults() {
    std::env::remove_var("VAR");
    std::env::remove_var("COPERNICUS_SUBSET_URL");
    std::env::remove_var("LOG_LEVEL");

    let config = Config::load(SHIPPED_CONFIG).unwrap();
    assert_eq!(config.source(), Some(Path::new(SHIPPED_CONFIG)));

    let plotting = config.plotting().unwrap();
    assert!(plotting.save_figures);
    assert_eq!(plotting.dpi, 300);
    assert_eq!(plotting.format, "png");

    let resolver = PathResolver::with_root(&config, "/srv/pipeline");
    assert_eq!(resolver.raw_dir().unwrap(), PathBuf::from("/srv/pipeline/data/raw"));
    assert_eq!(
        resolver.processed_dir().unwrap(),
        PathBuf::from("/srv/pipeline/data/processed")
    );
    assert_eq!(resolver.figures_dir().unwrap(), PathBuf::from("/srv/pipeline/figures"));

    assert!(config.source_url("marine_regions").unwrap().ends_with("/wfs"));
    assert_eq!(
        config.source_url("copernicus").unwrap(),
        "https://nrt.cmems-du.eu/subset"
    );

    let acquisition = config.acquisition().unwrap();
    assert_eq!(acquisition.boundary.region_id, 3);
    assert_eq!(acquisition.boundary.cql_filter(), "lme_number=3");
    assert!(acquisition.gridded.date_range().is_ok());

    let preprocess = config.preprocess().unwrap();
    assert_eq!(preprocess.input, "observations.csv");
    assert_eq!(preprocess.format.as_deref(), Some("csv"));
    assert_eq!(config.table_format().unwrap().as_deref(), Some("csv"));

    assert_eq!(config.analysis().unwrap().input, "processed_data.csv");
    assert!(config.figures().unwrap().plots.is_empty());
    assert_eq!(config.publish().unwrap().converter, "jupyter");
    assert_eq!(config.logging().unwrap().level, "info");
}
