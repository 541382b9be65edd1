// wx_extract - Forecast API client and GRIB area extraction tools
//
// Copyright 2026 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use geo::{BoundingRect, Contains, CoordsIter, LineString, MultiPolygon, Point, Polygon};
use serde::Deserialize;
use std::error;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug)]
pub enum RegionError {
    Io(io::Error),
    Parse(serde_json::Error),
    Empty,
    InvalidGeometry(String),
    OutOfRange { lon: f64, lat: f64 },
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "unable to read region: {}", e),
            Self::Parse(e) => write!(f, "unable to parse region: {}", e),
            Self::Empty => write!(f, "region has no polygon features"),
            Self::InvalidGeometry(msg) => write!(f, "invalid region geometry: {}", msg),
            Self::OutOfRange { lon, lat } => {
                write!(f, "region vertex ({}, {}) outside [-180, 180] x [-90, 90]", lon, lat)
            }
        }
    }
}

impl error::Error for RegionError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RegionError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for RegionError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

/// Axis aligned extent of a `Region` in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Inclusive on all edges.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    fn union(self, other: BoundingBox) -> BoundingBox {
        BoundingBox {
            min_lon: self.min_lon.min(other.min_lon),
            max_lon: self.max_lon.max(other.max_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }
}

/// Polygonal area made of one or more features, each feature a polygon or a set of
/// polygons (islands, exclaves). Vertices are (longitude, latitude) in [-180, 180] x [-90, 90].
///
/// The bounding box is computed once on construction. A region is read-only after
/// that so the cached value never goes stale.
#[derive(Debug, Clone)]
pub struct Region {
    features: Vec<MultiPolygon<f64>>,
    bbox: Option<BoundingBox>,
}

impl Region {
    pub fn new(features: Vec<MultiPolygon<f64>>) -> Result<Self, RegionError> {
        for feature in features.iter() {
            for c in feature.coords_iter() {
                if !(-180.0..=180.0).contains(&c.x) || !(-90.0..=90.0).contains(&c.y) {
                    return Err(RegionError::OutOfRange { lon: c.x, lat: c.y });
                }
            }
        }

        let bbox = features
            .iter()
            .filter_map(|f| f.bounding_rect())
            .map(|r| BoundingBox {
                min_lon: r.min().x,
                max_lon: r.max().x,
                min_lat: r.min().y,
                max_lat: r.max().y,
            })
            .reduce(BoundingBox::union);

        Ok(Region { features, bbox })
    }

    /// Build a region from a single closed ring of (longitude, latitude) vertices.
    pub fn from_ring(vertices: Vec<(f64, f64)>) -> Result<Self, RegionError> {
        if vertices.len() < 3 {
            return Err(RegionError::InvalidGeometry(format!(
                "ring needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }

        let polygon = Polygon::new(LineString::from(vertices), vec![]);
        Self::new(vec![MultiPolygon::new(vec![polygon])])
    }

    /// Parse GeoJSON text into a region. See `load_region` for what is accepted.
    pub fn from_geojson_str(text: &str) -> Result<Self, RegionError> {
        let doc: GeoJson = serde_json::from_str(text)?;
        let geometries = match doc {
            GeoJson::FeatureCollection { features } => features.into_iter().filter_map(|f| f.geometry).collect(),
            GeoJson::Feature { geometry } => geometry.into_iter().collect(),
            GeoJson::Polygon { coordinates } => vec![Geometry::Polygon { coordinates }],
            GeoJson::MultiPolygon { coordinates } => vec![Geometry::MultiPolygon { coordinates }],
            GeoJson::Unsupported => vec![],
        };

        let mut features = Vec::with_capacity(geometries.len());
        for geometry in geometries {
            match geometry {
                Geometry::Polygon { coordinates } => {
                    features.push(MultiPolygon::new(vec![to_polygon(coordinates)?]));
                }
                Geometry::MultiPolygon { coordinates } => {
                    let polygons = coordinates
                        .into_iter()
                        .map(to_polygon)
                        .collect::<Result<Vec<_>, _>>()?;
                    features.push(MultiPolygon::new(polygons));
                }
                Geometry::Unsupported => {
                    tracing::debug!(message = "skipping non-polygon region feature");
                }
            }
        }

        if features.is_empty() {
            return Err(RegionError::Empty);
        }

        Self::new(features)
    }

    /// Bounding box over every vertex of every feature, `None` for a region without features.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bbox
    }

    pub fn features(&self) -> &[MultiPolygon<f64>] {
        &self.features
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// True if the point is strictly inside any feature. Points exactly on a feature
    /// boundary are not contained.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let point = Point::new(lon, lat);
        self.features.iter().any(|f| f.contains(&point))
    }
}

/// Load a region from a GeoJSON file.
///
/// Accepts a `FeatureCollection`, a single `Feature`, or a bare `Polygon` or
/// `MultiPolygon` geometry. Each polygon geometry becomes one feature of the region,
/// other geometry types are skipped. A source without any polygon is an error.
pub fn load_region<P: AsRef<Path>>(path: P) -> Result<Region, RegionError> {
    let path = path.as_ref();
    tracing::debug!(message = "loading region", path = %path.display());

    let text = fs::read_to_string(path)?;
    Region::from_geojson_str(&text)
}

type Ring = Vec<Vec<f64>>;

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
enum GeoJson {
    FeatureCollection {
        features: Vec<Feature>,
    },
    Feature {
        geometry: Option<Geometry>,
    },
    Polygon {
        coordinates: Vec<Ring>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Ring>>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Deserialize, Debug)]
struct Feature {
    geometry: Option<Geometry>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
enum Geometry {
    Polygon {
        coordinates: Vec<Ring>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Ring>>,
    },
    #[serde(other)]
    Unsupported,
}

fn to_ring(ring: Ring) -> Result<LineString<f64>, RegionError> {
    if ring.len() < 3 {
        return Err(RegionError::InvalidGeometry(format!(
            "ring needs at least 3 positions, got {}",
            ring.len()
        )));
    }

    ring.into_iter()
        .map(|pos| match pos.as_slice() {
            [lon, lat, ..] => Ok((*lon, *lat)),
            _ => Err(RegionError::InvalidGeometry(format!(
                "position needs 2 coordinates, got {}",
                pos.len()
            ))),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::from)
}

fn to_polygon(rings: Vec<Ring>) -> Result<Polygon<f64>, RegionError> {
    let mut rings = rings.into_iter();
    let exterior = rings
        .next()
        .ok_or_else(|| RegionError::InvalidGeometry("polygon without exterior ring".to_owned()))?;

    let interiors = rings.map(to_ring).collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(to_ring(exterior)?, interiors))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ISLANDS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"name": "west"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0], [0.0, 0.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": {"name": "marker"},
                "geometry": {"type": "Point", "coordinates": [50.0, 50.0]}
            },
            {
                "type": "Feature",
                "properties": {"name": "east"},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[10.0, -1.0], [12.0, -1.0], [12.0, 1.0], [10.0, 1.0], [10.0, -1.0]]]]
                }
            }
        ]
    }"#;

    #[test]
    fn test_from_geojson_feature_collection() {
        let region = Region::from_geojson_str(TWO_ISLANDS).unwrap();
        assert_eq!(2, region.features().len());
        assert_eq!(
            Some(BoundingBox {
                min_lon: 0.0,
                max_lon: 12.0,
                min_lat: -1.0,
                max_lat: 2.0,
            }),
            region.bounding_box()
        );
    }

    #[test]
    fn test_contains_any_feature() {
        let region = Region::from_geojson_str(TWO_ISLANDS).unwrap();
        assert!(region.contains(1.0, 1.0));
        assert!(region.contains(0.0, 11.0));
        // Inside the bounding box but between the islands
        assert!(!region.contains(1.0, 6.0));
    }

    #[test]
    fn test_contains_excludes_boundary() {
        let region = Region::from_ring(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]).unwrap();
        assert!(region.contains(1.0, 1.0));
        assert!(!region.contains(0.0, 1.0));
        assert!(!region.contains(2.0, 2.0));
    }

    #[test]
    fn test_polygon_with_hole() {
        let text = r#"{
            "type": "Polygon",
            "coordinates": [
                [[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]],
                [[4, 4], [6, 4], [6, 6], [4, 6], [4, 4]]
            ]
        }"#;
        let region = Region::from_geojson_str(text).unwrap();
        assert!(region.contains(2.0, 2.0));
        assert!(!region.contains(5.0, 5.0));
    }

    #[test]
    fn test_empty_sources_rejected() {
        let only_points = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1, 2]}},
            {"type": "Feature", "geometry": null}
        ]}"#;
        assert!(matches!(Region::from_geojson_str(only_points), Err(RegionError::Empty)));
        assert!(matches!(
            Region::from_geojson_str(r#"{"type": "LineString", "coordinates": []}"#),
            Err(RegionError::Empty)
        ));
    }

    #[test]
    fn test_unparsable_source_rejected() {
        assert!(matches!(Region::from_geojson_str("not json"), Err(RegionError::Parse(_))));
        assert!(matches!(
            Region::from_geojson_str(r#"{"type": "Polygon", "coordinates": [[[0, 0], [1]]]}"#),
            Err(RegionError::InvalidGeometry(_))
        ));
        assert!(matches!(
            Region::from_geojson_str(r#"{"type": "Polygon", "coordinates": []}"#),
            Err(RegionError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_zero_to_360_vertices_rejected() {
        let res = Region::from_ring(vec![(190.0, 0.0), (200.0, 0.0), (200.0, 10.0)]);
        assert!(matches!(res, Err(RegionError::OutOfRange { .. })));
    }

    #[test]
    fn test_region_without_features() {
        let region = Region::new(vec![]).unwrap();
        assert!(region.is_empty());
        assert_eq!(None, region.bounding_box());
        assert!(!region.contains(0.0, 0.0));
    }

    #[test]
    fn test_load_region_missing_file() {
        assert!(matches!(
            load_region("/nonexistent/region.geojson"),
            Err(RegionError::Io(_))
        ));
    }
}
