//! Shapefile persistence for boundary polygons.
//!
//! Writes a GeoJSON feature collection as an ESRI shapefile set (`.shp`,
//! `.shx`, `.dbf`) plus a `.prj` holding WGS84 WKT and a `.cpg` declaring
//! UTF-8 attributes. Reading back yields the total extent of the polygons.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use geo::{BoundingRect, Coord, LineString, MultiPolygon};
use geojson::{Feature, FeatureCollection, Value as GeometryValue};
use pipeline_common::{BoundingBox, CrsCode, PipelineError, PipelineResult};
use serde_json::Value as JsonValue;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing, Shape};
use tracing::debug;

/// dBase field names are limited to 10 bytes.
const MAX_FIELD_NAME_LEN: usize = 10;

/// Width of every character attribute column.
const CHARACTER_FIELD_LEN: u8 = 254;

/// Numeric feature index written for every record.
const FEATURE_ID_FIELD: &str = "FID";

fn shapefile_error(err: shapefile::Error) -> PipelineError {
    PipelineError::Geometry(format!("shapefile: {}", err))
}

/// Write `collection` to `path` (the `.shp` member). Returns the number of
/// features written.
pub fn write_feature_collection(
    path: &Path,
    collection: &FeatureCollection,
) -> PipelineResult<usize> {
    let polygons = collection
        .features
        .iter()
        .enumerate()
        .map(|(index, feature)| feature_polygon(index, feature))
        .collect::<PipelineResult<Vec<_>>>()?;

    let fields = attribute_fields(collection);

    let mut table =
        TableWriterBuilder::new().add_numeric_field(field_name(FEATURE_ID_FIELD)?, 10, 0);
    for (_, dbf_name) in &fields {
        table = table.add_character_field(field_name(dbf_name)?, CHARACTER_FIELD_LEN);
    }

    {
        let mut writer = shapefile::Writer::from_path(path, table).map_err(shapefile_error)?;

        for (index, (feature, polygon)) in collection.features.iter().zip(&polygons).enumerate() {
            let mut record = Record::default();
            record.insert(
                FEATURE_ID_FIELD.to_string(),
                FieldValue::Numeric(Some(index as f64)),
            );
            for (property, dbf_name) in &fields {
                let value = feature
                    .properties
                    .as_ref()
                    .and_then(|props| props.get(property))
                    .and_then(scalar_to_string);
                record.insert(dbf_name.clone(), FieldValue::Character(value));
            }

            writer
                .write_shape_and_record(polygon, &record)
                .map_err(shapefile_error)?;
        }
    }

    fs::write(path.with_extension("prj"), CrsCode::Epsg4326.esri_wkt())?;
    fs::write(path.with_extension("cpg"), "UTF-8")?;

    debug!(
        path = %path.display(),
        features = polygons.len(),
        attributes = fields.len(),
        "Wrote shapefile set"
    );

    Ok(polygons.len())
}

/// Convert one feature's geometry into a shapefile polygon.
///
/// Polygon and MultiPolygon geometries are accepted; each part's first ring
/// is an outer ring and the rest are holes.
fn feature_polygon(index: usize, feature: &Feature) -> PipelineResult<Polygon> {
    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| PipelineError::Geometry(format!("feature {} has no geometry", index)))?;

    let parts: Vec<&Vec<Vec<Vec<f64>>>> = match &geometry.value {
        GeometryValue::Polygon(rings) => vec![rings],
        GeometryValue::MultiPolygon(polygons) => polygons.iter().collect(),
        other => {
            return Err(PipelineError::Geometry(format!(
                "feature {} is a {}, expected a Polygon or MultiPolygon",
                index,
                other.type_name()
            )))
        }
    };

    let mut rings = Vec::new();
    for part in parts {
        for (ring_index, ring) in part.iter().enumerate() {
            let points = ring
                .iter()
                .map(|position| position_to_point(index, position))
                .collect::<PipelineResult<Vec<_>>>()?;
            if points.len() < 3 {
                return Err(PipelineError::Geometry(format!(
                    "feature {} has a ring with {} positions",
                    index,
                    points.len()
                )));
            }
            rings.push(if ring_index == 0 {
                PolygonRing::Outer(points)
            } else {
                PolygonRing::Inner(points)
            });
        }
    }

    if rings.is_empty() {
        return Err(PipelineError::Geometry(format!(
            "feature {} has an empty polygon",
            index
        )));
    }

    Ok(Polygon::with_rings(rings))
}

fn position_to_point(index: usize, position: &[f64]) -> PipelineResult<Point> {
    match position {
        [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Point::new(*x, *y)),
        _ => Err(PipelineError::Geometry(format!(
            "feature {} has an invalid position {:?}",
            index, position
        ))),
    }
}

/// Scalar property names across all features, paired with the dBase column
/// they are written to. Names that collide after truncation keep the first.
fn attribute_fields(collection: &FeatureCollection) -> Vec<(String, String)> {
    let names: BTreeSet<&String> = collection
        .features
        .iter()
        .filter_map(|f| f.properties.as_ref())
        .flat_map(|props| {
            props
                .iter()
                .filter(|(_, v)| scalar_to_string(v).is_some())
                .map(|(k, _)| k)
        })
        .collect();

    let mut taken = BTreeSet::new();
    taken.insert(FEATURE_ID_FIELD.to_string());

    let mut fields = Vec::new();
    for name in names {
        let truncated: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .take(MAX_FIELD_NAME_LEN)
            .collect();
        if truncated.is_empty() || !taken.insert(truncated.clone()) {
            debug!(property = %name, "Skipping attribute without a usable dBase name");
            continue;
        }
        fields.push((name.clone(), truncated));
    }
    fields
}

fn field_name(name: &str) -> PipelineResult<FieldName> {
    FieldName::try_from(name)
        .map_err(|e| PipelineError::Geometry(format!("invalid attribute name {}: {:?}", name, e)))
}

fn scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Polygons stored in a shapefile, as `geo` geometry.
pub fn read_polygons(path: &Path) -> PipelineResult<MultiPolygon<f64>> {
    let mut reader = shapefile::Reader::from_path(path).map_err(shapefile_error)?;
    let mut polygons = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, _record) = result.map_err(shapefile_error)?;

        match shape {
            Shape::Polygon(polygon) => polygons.extend(to_geo_polygons(&polygon)),
            Shape::NullShape => {}
            _ => {
                return Err(PipelineError::Geometry(format!(
                    "{} contains a non-polygon shape",
                    path.display()
                )))
            }
        }
    }

    Ok(MultiPolygon::new(polygons))
}

/// Total extent of the polygons stored in a shapefile.
pub fn read_extent(path: &Path) -> PipelineResult<BoundingBox> {
    let polygons = read_polygons(path)?;

    let rect = polygons.bounding_rect().ok_or_else(|| {
        PipelineError::EmptyFeatureCollection(format!("{} has no polygons", path.display()))
    })?;

    Ok(BoundingBox::new(
        rect.min().x,
        rect.min().y,
        rect.max().x,
        rect.max().y,
    ))
}

fn to_geo_polygons(polygon: &Polygon) -> Vec<geo::Polygon<f64>> {
    let mut result: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();

    for ring in polygon.rings() {
        match ring {
            PolygonRing::Outer(points) => result.push((to_line_string(points), Vec::new())),
            PolygonRing::Inner(points) => {
                if let Some((_, holes)) = result.last_mut() {
                    holes.push(to_line_string(points));
                }
            }
        }
    }

    result
        .into_iter()
        .map(|(exterior, holes)| geo::Polygon::new(exterior, holes))
        .collect()
}

fn to_line_string(points: &[Point]) -> LineString<f64> {
    LineString::new(points.iter().map(|p| Coord { x: p.x, y: p.y }).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn collection(json: &str) -> FeatureCollection {
        FeatureCollection::from_str(json).unwrap()
    }

    #[test]
    fn test_attribute_fields_truncate_and_dedupe() {
        let fc = collection(
            r#"{"type":"FeatureCollection","features":[{"type":"Feature",
                "geometry":null,
                "properties":{"lme_number":3,"lme_name":"CC","description_long":"x",
                    "description_short":"y","nested":{"a":1}}}]}"#,
        );
        let fields = attribute_fields(&fc);
        let dbf: Vec<&str> = fields.iter().map(|(_, d)| d.as_str()).collect();

        assert_eq!(dbf, vec!["descriptio", "lme_name", "lme_number"]);
    }

    #[test]
    fn test_point_geometry_rejected() {
        let fc = collection(test_utils::fixtures::geojson::POINT);
        assert!(matches!(
            feature_polygon(0, &fc.features[0]),
            Err(PipelineError::Geometry(_))
        ));
    }

    #[test]
    fn test_multipolygon_rings() {
        let fc = collection(test_utils::fixtures::geojson::MULTIPOLYGON);
        let polygon = feature_polygon(0, &fc.features[0]).unwrap();

        let outer = polygon
            .rings()
            .iter()
            .filter(|r| matches!(r, PolygonRing::Outer(_)))
            .count();
        let inner = polygon.rings().len() - outer;
        assert_eq!(outer, 2);
        assert_eq!(inner, 1);
    }

    #[test]
    fn test_write_then_extent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("region.shp");
        let fc = collection(test_utils::fixtures::geojson::MULTIPOLYGON);

        assert_eq!(write_feature_collection(&path, &fc).unwrap(), 1);

        let bbox = read_extent(&path).unwrap();
        assert_eq!(bbox, BoundingBox::new(-130.0, 30.0, -120.0, 48.5));
    }
}
