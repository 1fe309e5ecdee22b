//! Common test fixtures for pipeline tests.
//!
//! This module provides pre-defined documents that represent the
//! responses and files the stages see in practice.

/// GeoJSON bodies a WFS `GetFeature` request may return.
pub mod geojson {
    /// One feature: the square (0,0)-(1,1).
    pub const UNIT_SQUARE: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "id": "lme.3",
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
      },
      "properties": {"lme_number": 3, "lme_name": "California Current"}
    }
  ],
  "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::4326"}}
}"#;

    /// A valid collection with no features.
    pub const EMPTY: &str = r#"{"type": "FeatureCollection", "features": []}"#;

    /// Two-part region with a hole in the first part.
    pub const MULTIPOLYGON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "geometry": {
        "type": "MultiPolygon",
        "coordinates": [
          [
            [[-130.0, 30.0], [-120.0, 30.0], [-120.0, 40.0], [-130.0, 40.0], [-130.0, 30.0]],
            [[-126.0, 34.0], [-124.0, 34.0], [-124.0, 36.0], [-126.0, 36.0], [-126.0, 34.0]]
          ],
          [
            [[-125.0, 42.0], [-122.0, 42.0], [-122.0, 48.5], [-125.0, 48.5], [-125.0, 42.0]]
          ]
        ]
      },
      "properties": {"lme_number": 3, "lme_name": "California Current", "area_km2": 2214327.5}
    }
  ]
}"#;

    /// A feature declared in Web Mercator.
    pub const WEB_MERCATOR: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[0.0, 0.0], [100000.0, 0.0], [100000.0, 100000.0], [0.0, 0.0]]]
      },
      "properties": {}
    }
  ],
  "crs": {"type": "name", "properties": {"name": "EPSG:3857"}}
}"#;

    /// A point feature; boundaries must be polygonal.
    pub const POINT: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "geometry": {"type": "Point", "coordinates": [-122.0, 37.0]},
      "properties": {"name": "station"}
    }
  ]
}"#;
}

/// Tabular fixtures.
pub mod tables {
    /// Station observations with a duplicate row, a missing value, a
    /// numeric column stored with stray whitespace, and one outlier.
    pub const STATIONS_CSV: &str = "\
station,season,chl,temp
A,upwelling,1.2,11.5
B,upwelling,1.4,11.9
C,upwelling,1.1, 12.1
C,upwelling,1.1, 12.1
D,relaxation,0.6,14.2
E,relaxation,,14.8
F,relaxation,0.5,15.1
G,relaxation,0.7,14.9
";

    /// Two clean numeric columns.
    pub const SIMPLE_CSV: &str = "\
x,y
1,2
2,4
3,6
4,8
5,10
";
}

/// Configuration documents.
pub mod config {
    /// Configuration with every data area rooted at relative paths.
    ///
    /// `feature_url` and `archive_url` become `data.sources.marine_regions`
    /// and `data.sources.copernicus`.
    pub fn pipeline_yaml(feature_url: &str, archive_url: &str) -> String {
        format!(
            r#"
data:
  sources:
    marine_regions: "{feature_url}"
    copernicus: "{archive_url}"
  paths:
    raw: data/raw
    processed: data/processed
    figures: figures

plotting:
  style: seaborn-v0_8-darkgrid
  palette: Set2
  format: png
  dpi: 20
  figsize: [10, 6]
  save_figures: true
"#
        )
    }
}
