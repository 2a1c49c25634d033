//! Region boundaries and point-in-region lookup
//!
//! Regions are named polygons or multi-polygons in planar (longitude,
//! latitude) degree space. Containment uses even-odd ray casting; a polygon
//! covers its exterior ring minus its holes.
//!
//! Lookup walks the regions in dataset order and returns the first match,
//! so overlapping regions resolve to whichever comes first.

use crate::coords::GeoPoint;
use crate::{QualityError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A ring position as `[longitude, latitude]`, matching GeoJSON order
pub type Position = [f64; 2];

/// Axis-aligned bounds of a region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    fn around(positions: impl Iterator<Item = Position>) -> Self {
        let mut bbox = BoundingBox {
            min_lon: f64::INFINITY,
            min_lat: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            max_lat: f64::NEG_INFINITY,
        };
        for [lon, lat] in positions {
            bbox.min_lon = bbox.min_lon.min(lon);
            bbox.min_lat = bbox.min_lat.min(lat);
            bbox.max_lon = bbox.max_lon.max(lon);
            bbox.max_lat = bbox.max_lat.max(lat);
        }
        bbox
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.latitude)
            && (self.min_lon..=self.max_lon).contains(&point.longitude)
    }
}

/// One polygon: an exterior ring and zero or more holes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub exterior: Vec<Position>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Vec<Position>>,
}

impl Polygon {
    pub fn new(exterior: Vec<Position>) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    pub fn with_holes(exterior: Vec<Position>, holes: Vec<Vec<Position>>) -> Self {
        Self { exterior, holes }
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        ring_contains(&self.exterior, point)
            && !self.holes.iter().any(|hole| ring_contains(hole, point))
    }

    fn rings(&self) -> impl Iterator<Item = &Vec<Position>> {
        std::iter::once(&self.exterior).chain(self.holes.iter())
    }
}

/// Even-odd ray cast toward +longitude.
///
/// Rings may be open or closed; a closing edge repeating the first
/// position has zero height and never toggles the result.
fn ring_contains(ring: &[Position], point: GeoPoint) -> bool {
    let (x, y) = (point.longitude, point.latitude);
    let mut inside = false;
    let mut j = ring.len().wrapping_sub(1);

    for (i, &[xi, yi]) in ring.iter().enumerate() {
        let [xj, yj] = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// A named area used to bucket strips on the map.
///
/// The bounding box is derived from the polygons in [`Region::new`]; a
/// deserialized region is rebuilt through it and any stored bbox ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRegion")]
pub struct Region {
    name: String,
    polygons: Vec<Polygon>,
    bbox: BoundingBox,
}

#[derive(Deserialize)]
struct RawRegion {
    name: String,
    polygons: Vec<Polygon>,
}

impl TryFrom<RawRegion> for Region {
    type Error = QualityError;

    fn try_from(raw: RawRegion) -> Result<Self> {
        Region::new(raw.name, raw.polygons)
    }
}

impl Region {
    /// Build a region, rejecting rings with fewer than three positions or
    /// non-finite coordinates.
    pub fn new(name: impl Into<String>, polygons: Vec<Polygon>) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: &str| QualityError::InvalidRegion {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if polygons.is_empty() {
            return Err(invalid("no polygons"));
        }
        for ring in polygons.iter().flat_map(Polygon::rings) {
            if ring.len() < 3 {
                return Err(invalid("ring has fewer than three positions"));
            }
            if ring.iter().flatten().any(|c| !c.is_finite()) {
                return Err(invalid("ring has non-finite coordinates"));
            }
        }

        let bbox = BoundingBox::around(polygons.iter().flat_map(|p| p.exterior.iter().copied()));

        Ok(Self {
            name,
            polygons,
            bbox,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        self.bbox.contains(point) && self.polygons.iter().any(|p| p.contains(point))
    }
}

/// Looks points up in a borrowed, read-only region dataset
#[derive(Debug, Clone, Copy)]
pub struct RegionLocator<'a> {
    regions: &'a [Region],
}

impl<'a> RegionLocator<'a> {
    pub fn new(regions: &'a [Region]) -> Self {
        Self { regions }
    }

    /// Name of the first region containing `point`, or `None` when the
    /// point lies outside every region.
    pub fn locate(&self, point: GeoPoint) -> Option<&'a str> {
        let found = self
            .regions
            .iter()
            .find(|region| region.contains(point))
            .map(|region| region.name.as_str());

        debug!(
            "Located ({:.6}, {:.6}) in {:?}",
            point.latitude, point.longitude, found
        );

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Axis-aligned rectangle, closed ring
    fn rect(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Vec<Position> {
        vec![
            [min_lon, min_lat],
            [max_lon, min_lat],
            [max_lon, max_lat],
            [min_lon, max_lat],
            [min_lon, min_lat],
        ]
    }

    fn rect_region(name: &str, min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Region {
        Region::new(name, vec![Polygon::new(rect(min_lon, min_lat, max_lon, max_lat))]).unwrap()
    }

    #[test]
    fn test_locate_inside_and_outside() {
        let regions = vec![
            rect_region("Chiang Mai", 98.0, 17.5, 99.5, 20.0),
            rect_region("Bangkok", 100.3, 13.5, 100.9, 14.0),
        ];
        let locator = RegionLocator::new(&regions);

        assert_eq!(locator.locate(GeoPoint::new(18.7883, 98.9853)), Some("Chiang Mai"));
        assert_eq!(locator.locate(GeoPoint::new(13.7563, 100.5018)), Some("Bangkok"));
        // Gulf of Thailand
        assert_eq!(locator.locate(GeoPoint::new(11.0, 101.0)), None);
    }

    #[test]
    fn test_triangle() {
        let triangle = Region::new(
            "Tri",
            vec![Polygon::new(vec![[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]])],
        )
        .unwrap();
        assert!(triangle.contains(GeoPoint::new(2.0, 2.0)));
        // Inside the bounding box but across the hypotenuse
        assert!(!triangle.contains(GeoPoint::new(8.0, 8.0)));
    }

    #[test]
    fn test_concave_polygon() {
        // U shape opening to the north
        let u = Region::new(
            "U",
            vec![Polygon::new(vec![
                [0.0, 0.0],
                [6.0, 0.0],
                [6.0, 6.0],
                [4.0, 6.0],
                [4.0, 2.0],
                [2.0, 2.0],
                [2.0, 6.0],
                [0.0, 6.0],
            ])],
        )
        .unwrap();
        assert!(u.contains(GeoPoint::new(4.0, 1.0)));
        assert!(u.contains(GeoPoint::new(5.0, 5.0)));
        assert!(!u.contains(GeoPoint::new(3.0, 3.0)));
    }

    #[test]
    fn test_hole_excluded() {
        let donut = Region::new(
            "Donut",
            vec![Polygon::with_holes(
                rect(0.0, 0.0, 10.0, 10.0),
                vec![rect(4.0, 4.0, 6.0, 6.0)],
            )],
        )
        .unwrap();
        assert!(donut.contains(GeoPoint::new(2.0, 2.0)));
        assert!(!donut.contains(GeoPoint::new(5.0, 5.0)));
    }

    #[test]
    fn test_multipolygon() {
        let islands = Region::new(
            "Islands",
            vec![
                Polygon::new(rect(0.0, 0.0, 1.0, 1.0)),
                Polygon::new(rect(5.0, 5.0, 6.0, 6.0)),
            ],
        )
        .unwrap();
        let regions = vec![islands];
        let locator = RegionLocator::new(&regions);

        assert_eq!(locator.locate(GeoPoint::new(0.5, 0.5)), Some("Islands"));
        assert_eq!(locator.locate(GeoPoint::new(5.5, 5.5)), Some("Islands"));
        // Between the islands, inside the combined bounding box
        assert_eq!(locator.locate(GeoPoint::new(3.0, 3.0)), None);
    }

    #[test]
    fn test_overlap_first_match_wins() {
        let regions = vec![
            rect_region("First", 0.0, 0.0, 10.0, 10.0),
            rect_region("Second", 5.0, 5.0, 15.0, 15.0),
        ];
        let locator = RegionLocator::new(&regions);
        assert_eq!(locator.locate(GeoPoint::new(7.0, 7.0)), Some("First"));
        assert_eq!(locator.locate(GeoPoint::new(12.0, 12.0)), Some("Second"));

        let reversed: Vec<Region> = regions.into_iter().rev().collect();
        let locator = RegionLocator::new(&reversed);
        assert_eq!(locator.locate(GeoPoint::new(7.0, 7.0)), Some("Second"));
    }

    #[test]
    fn test_open_ring() {
        let open = Region::new(
            "Open",
            vec![Polygon::new(vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]])],
        )
        .unwrap();
        assert!(open.contains(GeoPoint::new(2.0, 2.0)));
        assert!(!open.contains(GeoPoint::new(2.0, 5.0)));
    }

    #[test]
    fn test_invalid_regions() {
        assert!(Region::new("Empty", vec![]).is_err());
        assert!(Region::new("Line", vec![Polygon::new(vec![[0.0, 0.0], [1.0, 1.0]])]).is_err());
        assert!(Region::new(
            "NaN",
            vec![Polygon::new(vec![[0.0, 0.0], [f64::NAN, 1.0], [1.0, 0.0]])]
        )
        .is_err());
    }

    #[test]
    fn test_deserialize_recomputes_bbox() {
        let json = r#"{
            "name": "Square",
            "polygons": [{"exterior": [[0,0],[10,0],[10,10],[0,10],[0,0]]}],
            "bbox": {"min_lon": 0, "min_lat": 0, "max_lon": 0, "max_lat": 0}
        }"#;
        let regions = vec![serde_json::from_str::<Region>(json).unwrap()];
        assert_eq!(regions[0].bbox(), rect_region("Ref", 0.0, 0.0, 10.0, 10.0).bbox());

        let locator = RegionLocator::new(&regions);
        assert_eq!(locator.locate(GeoPoint::new(5.0, 5.0)), Some("Square"));
    }

    #[test]
    fn test_deserialize_rejects_invalid_region() {
        let json = r#"{"name": "Line", "polygons": [{"exterior": [[0,0],[1,1]]}]}"#;
        assert!(serde_json::from_str::<Region>(json).is_err());
    }

    #[test]
    fn test_serde_roundtrip_keeps_lookup() {
        let islands = Region::new(
            "Islands",
            vec![
                Polygon::new(rect(0.0, 0.0, 1.0, 1.0)),
                Polygon::new(rect(5.0, 5.0, 6.0, 6.0)),
            ],
        )
        .unwrap();
        let text = serde_json::to_string(&islands).unwrap();
        let regions = vec![serde_json::from_str::<Region>(&text).unwrap()];
        assert_eq!(regions[0], islands);

        let locator = RegionLocator::new(&regions);
        assert_eq!(locator.locate(GeoPoint::new(5.5, 5.5)), Some("Islands"));
    }

    #[test]
    fn test_bbox() {
        let region = rect_region("Box", -2.0, -1.0, 3.0, 4.0);
        assert_eq!(
            region.bbox(),
            BoundingBox {
                min_lon: -2.0,
                min_lat: -1.0,
                max_lon: 3.0,
                max_lat: 4.0
            }
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(2000))]

        // Strictly interior points of a rectangle are found, exterior ones are not
        #[test]
        fn fuzz_rectangle_containment(
            min_lon in -180.0f64..170.0,
            min_lat in -90.0f64..80.0,
            width in 0.5f64..10.0,
            height in 0.5f64..10.0,
            fx in 0.01f64..0.99,
            fy in 0.01f64..0.99,
        ) {
            let max_lon = min_lon + width;
            let max_lat = min_lat + height;
            let region = Region::new("R", vec![Polygon::new(vec![
                [min_lon, min_lat],
                [max_lon, min_lat],
                [max_lon, max_lat],
                [min_lon, max_lat],
            ])]).unwrap();
            let regions = [region];
            let locator = RegionLocator::new(&regions);

            let inside = GeoPoint::new(min_lat + fy * height, min_lon + fx * width);
            prop_assert_eq!(locator.locate(inside), Some("R"));

            let outside = GeoPoint::new(max_lat + fy, min_lon + fx * width);
            prop_assert_eq!(locator.locate(outside), None);
        }
    }
}
