//! Data loading from JSON and GeoJSON files

use crate::classifier::{Measurement, ParameterRange};
use crate::region::{Polygon, Position, Region};
use crate::{QualityColor, QualityError, Result};
use chrono::{DateTime, Utc};
use geojson::{FeatureCollection, GeoJson};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

/// Raw parameter row from JSON
#[derive(Debug, Deserialize)]
struct RawParameter {
    id: u32,
    name: String,
    unit: Option<String>,
    min: Option<f64>,
    max: Option<f64>,
}

/// Raw measurement row nested under a strip
#[derive(Debug, Deserialize)]
struct RawMeasurement {
    parameter_id: u32,
    value: f64,
}

/// Raw strip record from JSON
#[derive(Debug, Deserialize)]
struct RawSample {
    id: u64,
    taken_at: DateTime<Utc>,
    latitude: Option<String>,
    longitude: Option<String>,
    quality_color: Option<String>,
    #[serde(default)]
    measurements: Vec<RawMeasurement>,
}

/// A strip as supplied by the storage layer
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub id: u64,
    pub taken_at: DateTime<Utc>,
    /// DMS latitude text
    pub latitude: Option<String>,
    /// DMS longitude text
    pub longitude: Option<String>,
    /// Previously stored color, if any
    pub quality_color: Option<QualityColor>,
    pub measurements: Vec<Measurement>,
}

/// Load parameter ranges keyed by parameter id.
///
/// Rows with an invalid range are skipped.
pub fn load_parameter_ranges(path: impl AsRef<Path>) -> Result<HashMap<u32, ParameterRange>> {
    let path = path.as_ref();
    info!("Loading parameter ranges from {:?}", path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let rows: Vec<RawParameter> = serde_json::from_reader(reader)?;

    let mut ranges = HashMap::new();
    let mut skipped = 0;

    for row in rows {
        match ParameterRange::new(row.id, row.name, row.unit, row.min, row.max) {
            Ok(range) => {
                ranges.insert(range.parameter_id(), range);
            }
            Err(e) => {
                warn!("Skipping parameter: {}", e);
                skipped += 1;
            }
        }
    }

    info!(
        "Loaded {} parameter ranges ({} skipped as invalid)",
        ranges.len(),
        skipped
    );

    Ok(ranges)
}

/// Load strip records.
///
/// An unrecognized stored color is dropped (logged) rather than failing the
/// whole file.
pub fn load_samples(path: impl AsRef<Path>) -> Result<Vec<SampleRecord>> {
    let path = path.as_ref();
    info!("Loading strips from {:?}", path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let rows: Vec<RawSample> = serde_json::from_reader(reader)?;

    let samples: Vec<SampleRecord> = rows
        .into_iter()
        .map(|row| {
            let quality_color = row.quality_color.as_deref().and_then(|hex| {
                QualityColor::from_hex(hex)
                    .map_err(|e| warn!("Strip {}: {}", row.id, e))
                    .ok()
            });
            let measurements = row
                .measurements
                .iter()
                .map(|m| Measurement {
                    sample_id: row.id,
                    parameter_id: m.parameter_id,
                    value: m.value,
                })
                .collect();

            SampleRecord {
                id: row.id,
                taken_at: row.taken_at,
                latitude: row.latitude,
                longitude: row.longitude,
                quality_color,
                measurements,
            }
        })
        .collect();

    info!("Loaded {} strips", samples.len());

    Ok(samples)
}

/// Load region boundaries from a GeoJSON FeatureCollection, in feature order.
///
/// Each feature's name is read from `name_property`. Features without a
/// name, or with geometry other than Polygon / MultiPolygon, are skipped.
pub fn load_regions(path: impl AsRef<Path>, name_property: &str) -> Result<Vec<Region>> {
    let path = path.as_ref();
    info!("Loading region boundaries from {:?}", path);

    let text = std::fs::read_to_string(path)?;
    parse_regions(&text, name_property)
}

/// Parse region boundaries from GeoJSON text
pub fn parse_regions(text: &str, name_property: &str) -> Result<Vec<Region>> {
    let geojson: GeoJson = text.parse()?;
    let collection = FeatureCollection::try_from(geojson)?;

    let mut regions = Vec::new();
    let mut skipped = 0;

    for (i, feature) in collection.features.into_iter().enumerate() {
        let Some(name) = feature
            .property(name_property)
            .and_then(|v| v.as_str())
            .map(str::to_string)
        else {
            warn!("Feature {} has no {:?} property, skipping", i, name_property);
            skipped += 1;
            continue;
        };

        let polygons = match feature.geometry.map(|g| g.value) {
            Some(geojson::Value::Polygon(rings)) => vec![to_polygon(&name, rings)?],
            Some(geojson::Value::MultiPolygon(parts)) => parts
                .into_iter()
                .map(|rings| to_polygon(&name, rings))
                .collect::<Result<Vec<_>>>()?,
            _ => {
                warn!("Region {:?} is not a polygon, skipping", name);
                skipped += 1;
                continue;
            }
        };

        regions.push(Region::new(name, polygons)?);
    }

    info!(
        "Loaded {} regions ({} features skipped)",
        regions.len(),
        skipped
    );

    Ok(regions)
}

/// Convert GeoJSON rings (first exterior, rest holes) into a polygon
fn to_polygon(name: &str, rings: Vec<Vec<Vec<f64>>>) -> Result<Polygon> {
    let mut rings = rings.into_iter().map(|ring| {
        ring.into_iter()
            .map(|position| match position.as_slice() {
                [lon, lat, ..] => Ok([*lon, *lat]),
                _ => Err(QualityError::InvalidRegion {
                    name: name.to_string(),
                    reason: "position has fewer than two coordinates".to_string(),
                }),
            })
            .collect::<Result<Vec<Position>>>()
    });

    let exterior = rings.next().ok_or_else(|| QualityError::InvalidRegion {
        name: name.to_string(),
        reason: "polygon has no rings".to_string(),
    })??;
    let holes = rings.collect::<Result<Vec<_>>>()?;

    Ok(Polygon::with_holes(exterior, holes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::GeoPoint;
    use crate::region::RegionLocator;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_parameter_ranges() {
        let json = r#"[
            {"id": 1, "name": "pH", "min": 6.5, "max": 8.5},
            {"id": 2, "name": "Chlorine", "unit": "mg/L", "min": 0.0, "max": 4.0},
            {"id": 3, "name": "Backwards", "min": 9.0, "max": 1.0}
        ]"#;
        let file = temp_file(json);

        let ranges = load_parameter_ranges(file.path()).unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[&2].unit(), Some("mg/L"));
        assert!(!ranges.contains_key(&3));
    }

    #[test]
    fn test_load_samples() {
        let json = r##"[
            {
                "id": 10,
                "taken_at": "2026-10-03T08:15:00Z",
                "latitude": "18°47'46.1\"N",
                "longitude": "98°59'13.3\"E",
                "quality_color": "#ffff00",
                "measurements": [
                    {"parameter_id": 1, "value": 7.0},
                    {"parameter_id": 2, "value": 5.0}
                ]
            },
            {"id": 11, "taken_at": "2026-09-30T23:00:00Z", "quality_color": "#abcdef"}
        ]"##;
        let file = temp_file(json);

        let samples = load_samples(file.path()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].quality_color, Some(QualityColor::Caution));
        assert_eq!(samples[0].measurements.len(), 2);
        assert_eq!(samples[0].measurements[1].sample_id, 10);
        assert_eq!(samples[1].quality_color, None);
        assert!(samples[1].measurements.is_empty());
        assert!(samples[1].latitude.is_none());
    }

    #[test]
    fn test_load_samples_rejects_bad_json() {
        let file = temp_file("{not json");
        assert!(matches!(load_samples(file.path()), Err(QualityError::Json(_))));
    }

    #[test]
    fn test_load_regions() {
        let geojson = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"NAME_1": "Square"},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]],
                                        [[4,4],[6,4],[6,6],[4,6],[4,4]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {"NAME_1": "Islands"},
                    "geometry": {
                        "type": "MultiPolygon",
                        "coordinates": [
                            [[[20,0],[21,0],[21,1],[20,1],[20,0]]],
                            [[[30,0],[31,0],[31,1],[30,1],[30,0]]]
                        ]
                    }
                },
                {
                    "type": "Feature",
                    "properties": {"NAME_1": "Marker"},
                    "geometry": {"type": "Point", "coordinates": [1, 1]}
                },
                {
                    "type": "Feature",
                    "properties": {"other": "Nameless"},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]
                    }
                }
            ]
        }"#;
        let file = temp_file(geojson);

        let regions = load_regions(file.path(), "NAME_1").unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].name(), "Square");
        assert_eq!(regions[0].polygons()[0].holes.len(), 1);
        assert_eq!(regions[1].polygons().len(), 2);

        let locator = RegionLocator::new(&regions);
        assert_eq!(locator.locate(GeoPoint::new(2.0, 2.0)), Some("Square"));
        assert_eq!(locator.locate(GeoPoint::new(5.0, 5.0)), None);
        assert_eq!(locator.locate(GeoPoint::new(0.5, 30.5)), Some("Islands"));
    }

    #[test]
    fn test_parse_regions_rejects_non_collection() {
        let point = r#"{"type": "Point", "coordinates": [1, 1]}"#;
        assert!(matches!(
            parse_regions(point, "NAME_1"),
            Err(QualityError::GeoJson(_))
        ));
    }
}
