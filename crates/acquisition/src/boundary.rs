//! Ecoregion boundary retrieval from a WFS feature service.
//!
//! One `GetFeature` request selects a single region by numeric id; the
//! GeoJSON answer is written to disk as a shapefile set.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use geojson::{FeatureCollection, GeoJson};
use pipeline_common::{CrsCode, PipelineError, PipelineResult};
use pipeline_config::BoundaryConfig;
use reqwest::Client;
use tracing::{debug, info, instrument};

use crate::client::{build_client, transport_error};
use crate::vector;

/// A WFS 2.0.0 `GetFeature` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryQuery {
    pub endpoint: String,
    pub type_name: String,
    pub cql_filter: String,
}

impl BoundaryQuery {
    pub fn new(
        endpoint: impl Into<String>,
        type_name: impl Into<String>,
        cql_filter: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            type_name: type_name.into(),
            cql_filter: cql_filter.into(),
        }
    }

    pub fn from_config(endpoint: impl Into<String>, config: &BoundaryConfig) -> Self {
        Self::new(endpoint, config.type_name.clone(), config.cql_filter())
    }

    /// Query string parameters, in request order.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("service", "WFS".to_string()),
            ("version", "2.0.0".to_string()),
            ("request", "GetFeature".to_string()),
            ("typeName", self.type_name.clone()),
            ("outputFormat", "application/json".to_string()),
            ("cql_filter", self.cql_filter.clone()),
        ]
    }
}

/// The persisted boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryArtifact {
    /// Path of the `.shp` member of the shapefile set.
    pub path: PathBuf,
    pub feature_count: usize,
}

/// Client for the feature service.
pub struct FeatureServiceClient {
    client: Client,
}

impl FeatureServiceClient {
    pub fn new(timeout: Option<Duration>) -> PipelineResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }

    /// Issue the query and parse the response as a feature collection.
    ///
    /// Any non-success status is an error; there is no retry.
    #[instrument(skip(self), fields(endpoint = %query.endpoint, filter = %query.cql_filter))]
    pub async fn fetch(&self, query: &BoundaryQuery) -> PipelineResult<FeatureCollection> {
        let response = self
            .client
            .get(&query.endpoint)
            .query(&query.query_params())
            .send()
            .await
            .map_err(|e| transport_error(&query.endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::HttpStatus {
                url: query.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&query.endpoint, e))?;
        debug!(bytes = body.len(), "Received feature service response");

        parse_feature_collection(&query.endpoint, &body)
    }
}

/// Parse a GeoJSON body that must be a FeatureCollection in WGS84.
///
/// GeoJSON is WGS84 unless a legacy `crs` member says otherwise; any
/// declared CRS must name EPSG:4326 or CRS84.
pub fn parse_feature_collection(url: &str, body: &str) -> PipelineResult<FeatureCollection> {
    let invalid = |message: String| PipelineError::InvalidResponse {
        url: url.to_string(),
        message,
    };

    let geojson = GeoJson::from_str(body).map_err(|e| invalid(format!("not GeoJSON: {}", e)))?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(_) => {
            return Err(invalid("expected a FeatureCollection, got a Feature".into()))
        }
        GeoJson::Geometry(_) => {
            return Err(invalid("expected a FeatureCollection, got a Geometry".into()))
        }
    };

    if let Some(name) = declared_crs(&collection) {
        CrsCode::parse(&name)
            .map_err(|e| invalid(format!("boundary must be geographic WGS84: {}", e)))?;
    }

    Ok(collection)
}

fn declared_crs(collection: &FeatureCollection) -> Option<String> {
    collection
        .foreign_members
        .as_ref()?
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

/// Fetch the boundary and persist it at `shapefile_path`.
///
/// An empty collection is rejected before anything is written.
pub async fn fetch_boundary(
    client: &FeatureServiceClient,
    query: &BoundaryQuery,
    shapefile_path: &Path,
) -> PipelineResult<BoundaryArtifact> {
    info!(
        endpoint = %query.endpoint,
        type_name = %query.type_name,
        filter = %query.cql_filter,
        "Fetching ecoregion boundary"
    );

    let collection = client.fetch(query).await?;

    if collection.features.is_empty() {
        return Err(PipelineError::EmptyFeatureCollection(format!(
            "{} returned no features for {}",
            query.endpoint, query.cql_filter
        )));
    }

    let feature_count = vector::write_feature_collection(shapefile_path, &collection)?;

    info!(
        path = %shapefile_path.display(),
        features = feature_count,
        "Saved boundary shapefile"
    );

    Ok(BoundaryArtifact {
        path: shapefile_path.to_path_buf(),
        feature_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params() {
        let query = BoundaryQuery::new("http://wfs", "MarineRegions:lme", "lme_number=3");
        let params = query.query_params();

        assert_eq!(params.len(), 6);
        assert_eq!(params[0], ("service", "WFS".to_string()));
        assert_eq!(params[1], ("version", "2.0.0".to_string()));
        assert_eq!(params[2], ("request", "GetFeature".to_string()));
        assert_eq!(params[3], ("typeName", "MarineRegions:lme".to_string()));
        assert_eq!(params[4], ("outputFormat", "application/json".to_string()));
        assert_eq!(params[5], ("cql_filter", "lme_number=3".to_string()));
    }

    #[test]
    fn test_query_from_config() {
        let query = BoundaryQuery::from_config("http://wfs", &BoundaryConfig::default());
        assert_eq!(query.type_name, "MarineRegions:lme");
        assert_eq!(query.cql_filter, "lme_number=3");
    }

    #[test]
    fn test_parse_rejects_bare_geometry() {
        let body = r#"{"type": "Point", "coordinates": [0.0, 0.0]}"#;
        assert!(matches!(
            parse_feature_collection("http://wfs", body),
            Err(PipelineError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_html() {
        let body = "<html><body>Service Exception</body></html>";
        assert!(matches!(
            parse_feature_collection("http://wfs", body),
            Err(PipelineError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_parse_accepts_undeclared_crs() {
        let body = r#"{"type": "FeatureCollection", "features": []}"#;
        let fc = parse_feature_collection("http://wfs", body).unwrap();
        assert!(fc.features.is_empty());
    }
}
