//! Gridded biogeochemistry subsets from the remote archive.
//!
//! The archive is reached through the [`SubsetService`] trait so the stage
//! can run against any subsetting backend. [`HttpSubsetService`] is the
//! bundled one: it sends the request as query parameters and streams the
//! NetCDF answer straight to disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use pipeline_common::{BoundingBox, DateRange, PipelineError, PipelineResult};
use reqwest::Client;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::client::{build_client, transport_error};
use crate::vector;

/// Environment variable holding the archive user name.
pub const USERNAME_ENV: &str = "COPERNICUSMARINE_SERVICE_USERNAME";

/// Environment variable holding the archive password.
pub const PASSWORD_ENV: &str = "COPERNICUSMARINE_SERVICE_PASSWORD";

/// Log progress every this many bytes.
const PROGRESS_INTERVAL: u64 = 8 * 1024 * 1024;

/// One subset: which variables, over which box and dates, saved where.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetRequest {
    pub dataset_id: String,
    pub variables: Vec<String>,
    pub bbox: BoundingBox,
    pub dates: DateRange,
    pub output_path: PathBuf,
}

impl SubsetRequest {
    /// Query string parameters, in request order.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("dataset_id", self.dataset_id.clone()),
            ("variables", self.variables.join(",")),
            ("minimum_longitude", self.bbox.min_lon.to_string()),
            ("maximum_longitude", self.bbox.max_lon.to_string()),
            ("minimum_latitude", self.bbox.min_lat.to_string()),
            ("maximum_latitude", self.bbox.max_lat.to_string()),
            ("start_datetime", self.dates.window_start_iso()),
            ("end_datetime", self.dates.window_end_iso()),
        ]
    }
}

/// The persisted subset.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Deterministic file name for a date range.
pub fn artifact_file_name(dates: &DateRange) -> String {
    format!("copernicus_bgc_{}.nc", dates.file_fragment())
}

/// A backend that can materialise a subset at `request.output_path`.
#[async_trait]
pub trait SubsetService: Send + Sync {
    async fn subset(&self, request: &SubsetRequest) -> PipelineResult<()>;
}

/// Subsetting over plain HTTP with optional basic authentication.
pub struct HttpSubsetService {
    client: Client,
    endpoint: String,
    credentials: Option<(String, String)>,
}

impl HttpSubsetService {
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> PipelineResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.into(),
            credentials: None,
        })
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Like [`HttpSubsetService::new`], picking up credentials from the
    /// environment when both variables are set.
    pub fn from_env(
        endpoint: impl Into<String>,
        timeout: Option<Duration>,
    ) -> PipelineResult<Self> {
        let service = Self::new(endpoint, timeout)?;
        match (std::env::var(USERNAME_ENV), std::env::var(PASSWORD_ENV)) {
            (Ok(user), Ok(pass)) => Ok(service.with_credentials(user, pass)),
            _ => {
                debug!("No archive credentials in environment, requesting anonymously");
                Ok(service)
            }
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SubsetService for HttpSubsetService {
    #[instrument(skip(self, request), fields(dataset = %request.dataset_id))]
    async fn subset(&self, request: &SubsetRequest) -> PipelineResult<()> {
        let mut builder = self
            .client
            .get(&self.endpoint)
            .query(&request.query_params());
        if let Some((user, pass)) = &self.credentials {
            builder = builder.basic_auth(user, Some(pass));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(&self.endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::HttpStatus {
                url: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        // A failed stream leaves the partial file in place.
        let written = stream_to_file(&self.endpoint, response, &request.output_path).await?;

        debug!(bytes = written, "Subset stream complete");
        Ok(())
    }
}

/// Stream a response body into `path`, returning the bytes written.
async fn stream_to_file(
    url: &str,
    response: reqwest::Response,
    path: &Path,
) -> PipelineResult<u64> {
    let mut file = File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    let mut since_update = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| transport_error(url, e))?;
        file.write_all(&chunk).await?;

        written += chunk.len() as u64;
        since_update += chunk.len() as u64;
        if since_update >= PROGRESS_INTERVAL {
            debug!(downloaded = written, "Subset download progress");
            since_update = 0;
        }
    }

    file.flush().await?;
    file.sync_all().await?;

    Ok(written)
}

/// Request a subset covering the extent of the persisted boundary.
///
/// The spatial box is read back from `boundary_path` so the request always
/// matches what is on disk. An existing file for the same date range is
/// overwritten.
pub async fn fetch_gridded(
    service: &dyn SubsetService,
    output_dir: &Path,
    dates: &DateRange,
    boundary_path: &Path,
    variables: &[String],
    dataset_id: &str,
) -> PipelineResult<GriddedArtifact> {
    if variables.is_empty() {
        return Err(PipelineError::invalid_value(
            "acquisition.gridded.variables",
            "at least one variable is required",
        ));
    }

    let bbox = vector::read_extent(boundary_path)?;
    let output_path = output_dir.join(artifact_file_name(dates));

    if output_path.exists() {
        warn!(path = %output_path.display(), "Overwriting existing subset");
    }

    let request = SubsetRequest {
        dataset_id: dataset_id.to_string(),
        variables: variables.to_vec(),
        bbox,
        dates: *dates,
        output_path: output_path.clone(),
    };

    info!(
        dataset = %request.dataset_id,
        variables = %request.variables.join(","),
        min_lon = bbox.min_lon,
        min_lat = bbox.min_lat,
        max_lon = bbox.max_lon,
        max_lat = bbox.max_lat,
        width_deg = bbox.width(),
        height_deg = bbox.height(),
        start = %request.dates.window_start_iso(),
        end = %request.dates.window_end_iso(),
        "Requesting gridded subset"
    );

    service.subset(&request).await?;

    let size_bytes = fs::metadata(&output_path)
        .await
        .map_err(|e| {
            PipelineError::DataRead(format!(
                "subset service reported success but {} is missing: {}",
                output_path.display(),
                e
            ))
        })?
        .len();

    info!(path = %output_path.display(), size_bytes, "Saved gridded subset");

    Ok(GriddedArtifact {
        path: output_path,
        size_bytes,
    })
}
