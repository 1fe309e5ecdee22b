//! The acquisition stage: boundary first, then the gridded subset it bounds.

use pipeline_common::PipelineResult;
use pipeline_config::{Config, PathResolver};
use tracing::info;

use crate::boundary::{fetch_boundary, BoundaryArtifact, BoundaryQuery, FeatureServiceClient};
use crate::gridded::{fetch_gridded, GriddedArtifact, SubsetService};

/// What the stage left on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionReport {
    pub boundary: BoundaryArtifact,
    pub gridded: GriddedArtifact,
}

/// Run both acquisition steps in order.
///
/// The date range is validated before any request is made. The gridded
/// request reads its bounding box from the shapefile the boundary step
/// just wrote.
pub async fn run_acquisition(
    config: &Config,
    resolver: &PathResolver<'_>,
    features: &FeatureServiceClient,
    archive: &dyn SubsetService,
) -> PipelineResult<AcquisitionReport> {
    let settings = config.acquisition()?;
    let dates = settings.gridded.date_range()?;
    let endpoint = config.source_url(&settings.boundary.source)?;

    let shapefile_dir = resolver.ensure_shapefile_dir()?;
    let subset_dir = resolver.ensure_subset_dir()?;

    let query = BoundaryQuery::from_config(endpoint, &settings.boundary);
    let shapefile_path = shapefile_dir.join(format!("{}.shp", settings.boundary.layer_name));
    let boundary = fetch_boundary(features, &query, &shapefile_path).await?;

    let gridded = fetch_gridded(
        archive,
        &subset_dir,
        &dates,
        &boundary.path,
        &settings.gridded.variables,
        &settings.gridded.dataset_id,
    )
    .await?;

    info!(
        boundary = %boundary.path.display(),
        features = boundary.feature_count,
        subset = %gridded.path.display(),
        size_bytes = gridded.size_bytes,
        "Acquisition complete"
    );

    Ok(AcquisitionReport { boundary, gridded })
}
