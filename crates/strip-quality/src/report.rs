//! Region color reports for the map layer

use crate::region::{Polygon, Region};
use crate::{QualityColor, RegionStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One shaded region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionReport {
    pub region: String,
    pub color: QualityColor,
    pub status: RegionStatus,
}

/// Colored regions in dataset order; regions without a color are omitted
pub fn region_report(
    regions: &[Region],
    colors: &HashMap<String, QualityColor>,
) -> Vec<RegionReport> {
    regions
        .iter()
        .filter_map(|region| {
            colors.get(region.name()).map(|&color| RegionReport {
                region: region.name().to_string(),
                color,
                status: color.status(),
            })
        })
        .collect()
}

fn polygon_coordinates(polygon: &Polygon) -> serde_json::Value {
    let rings: Vec<&Vec<[f64; 2]>> = std::iter::once(&polygon.exterior)
        .chain(polygon.holes.iter())
        .collect();
    serde_json::json!(rings)
}

/// Export colored regions as a GeoJSON FeatureCollection with a `fill`
/// property per feature
pub fn to_geojson(regions: &[Region], colors: &HashMap<String, QualityColor>) -> serde_json::Value {
    let features: Vec<serde_json::Value> = regions
        .iter()
        .filter_map(|region| colors.get(region.name()).map(|color| (region, color)))
        .map(|(region, color)| {
            let geometry = match region.polygons() {
                [single] => serde_json::json!({
                    "type": "Polygon",
                    "coordinates": polygon_coordinates(single)
                }),
                many => serde_json::json!({
                    "type": "MultiPolygon",
                    "coordinates": many.iter().map(polygon_coordinates).collect::<Vec<_>>()
                }),
            };

            serde_json::json!({
                "type": "Feature",
                "geometry": geometry,
                "properties": {
                    "name": region.name(),
                    "fill": color.hex(),
                    "status": color.status()
                }
            })
        })
        .collect();

    serde_json::json!({
        "type": "FeatureCollection",
        "features": features
    })
}
