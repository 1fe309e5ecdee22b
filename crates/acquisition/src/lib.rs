//! Acquisition of the raw inputs: the ecoregion boundary from a WFS feature
//! service and a gridded biogeochemistry subset from the remote archive.
//!
//! Each remote call is a single request with no retry. Both artifacts land
//! under the raw data area.

pub mod boundary;
pub mod client;
pub mod gridded;
pub mod stage;
pub mod vector;

pub use boundary::{
    fetch_boundary, parse_feature_collection, BoundaryArtifact, BoundaryQuery,
    FeatureServiceClient,
};
pub use client::build_client;
pub use gridded::{
    artifact_file_name, fetch_gridded, GriddedArtifact, HttpSubsetService, SubsetRequest,
    SubsetService,
};
pub use stage::{run_acquisition, AcquisitionReport};
pub use vector::{read_extent, read_polygons, write_feature_collection};
