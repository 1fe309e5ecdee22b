//! Coordinate Reference System identification.
//!
//! Everything the pipeline persists is geographic WGS84, so this module only
//! needs to recognise the ways a service may name that CRS and to produce the
//! matching `.prj` text for shapefiles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ESRI WKT for WGS84, written next to every shapefile.
pub const WGS84_ESRI_WKT: &str = concat!(
    "GEOGCS[\"GCS_WGS_1984\",",
    "DATUM[\"D_WGS_1984\",SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],",
    "PRIMEM[\"Greenwich\",0.0],",
    "UNIT[\"Degree\",0.0174532925199433]]",
);

/// CRS codes the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 Geographic (lat/lon in degrees)
    Epsg4326,
}

impl CrsCode {
    /// Parse a CRS name as found in GeoJSON `crs` members and WFS responses.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326"
    /// - "urn:ogc:def:crs:EPSG::4326"
    /// - "urn:ogc:def:crs:OGC:1.3:CRS84"
    /// - "http://www.opengis.net/def/crs/EPSG/0/4326"
    pub fn parse(s: &str) -> Result<Self, CrsParseError> {
        let normalized = s.trim().to_uppercase();

        let is_4326 = normalized == "EPSG:4326"
            || normalized == "CRS:84"
            || normalized.ends_with("CRS84")
            || normalized.ends_with("EPSG::4326")
            || normalized.ends_with("/EPSG/0/4326");

        if is_4326 {
            Ok(CrsCode::Epsg4326)
        } else {
            Err(CrsParseError::UnsupportedCrs(s.to_string()))
        }
    }

    /// ESRI WKT suitable for a `.prj` sidecar.
    pub fn esri_wkt(&self) -> &'static str {
        match self {
            CrsCode::Epsg4326 => WGS84_ESRI_WKT,
        }
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326)
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            CrsCode::Epsg4326 => "EPSG:4326",
        };
        write!(f, "{}", code)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}
