//! Planar geometry helpers on longitude/latitude polygons
//!
//! Areas are computed directly in degrees without any projection. Ratios of such
//! areas are what the coverage selection works with, so the distortion is accepted.

use crate::types::{EnumError, EnumResult};
use geo::{Area, BooleanOps, BoundingRect, Coord, LineString, MultiPolygon, Polygon};
use rstar::AABB;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// GeoJSON-style polygon coordinates: exterior ring followed by holes
pub type PolygonCoords = Vec<Vec<[f64; 2]>>;

/// Relative area below which a difference is considered empty
pub const AREA_TOLERANCE: f64 = 1e-9;

pub fn polygon_from_coords(rings: &[Vec<[f64; 2]>]) -> EnumResult<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| {
        LineString::from(
            ring.iter()
                .map(|&[x, y]| Coord { x, y })
                .collect::<Vec<_>>(),
        )
    });

    let exterior = rings.next().ok_or_else(|| {
        EnumError::InvalidInput("Polygon has no exterior ring".to_string())
    })?;
    if exterior.0.len() < 3 {
        return Err(EnumError::InvalidInput(format!(
            "Polygon exterior ring needs at least 3 coordinates, got {}",
            exterior.0.len()
        )));
    }

    Ok(Polygon::new(exterior, rings.collect()))
}

pub fn polygon_to_coords(polygon: &Polygon<f64>) -> PolygonCoords {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.coords().map(|c| [c.x, c.y]).collect())
        .collect()
}

pub fn multipolygon_from_coords(polygons: &[PolygonCoords]) -> EnumResult<MultiPolygon<f64>> {
    polygons
        .iter()
        .map(|rings| polygon_from_coords(rings))
        .collect::<EnumResult<Vec<_>>>()
        .map(MultiPolygon::new)
}

pub fn multipolygon_to_coords(multi: &MultiPolygon<f64>) -> Vec<PolygonCoords> {
    multi.iter().map(polygon_to_coords).collect()
}

/// Serde adapter storing a `Polygon` as coordinate rings
pub mod polygon_coords {
    use super::*;

    pub fn serialize<S: Serializer>(polygon: &Polygon<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        polygon_to_coords(polygon).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Polygon<f64>, D::Error> {
        let rings = PolygonCoords::deserialize(deserializer)?;
        polygon_from_coords(&rings).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter storing a `MultiPolygon` as a list of polygon coordinate rings
pub mod multipolygon_coords {
    use super::*;

    pub fn serialize<S: Serializer>(multi: &MultiPolygon<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        multipolygon_to_coords(multi).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MultiPolygon<f64>, D::Error> {
        let polygons = Vec::<PolygonCoords>::deserialize(deserializer)?;
        multipolygon_from_coords(&polygons).map_err(serde::de::Error::custom)
    }
}

pub fn serialize_opt_multipolygon<S: Serializer>(
    multi: &Option<MultiPolygon<f64>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    multi.as_ref().map(multipolygon_to_coords).serialize(serializer)
}

pub fn to_multi(polygon: &Polygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon.clone()])
}

pub fn intersection(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    if a.0.is_empty() || b.0.is_empty() {
        return MultiPolygon::new(Vec::new());
    }
    a.intersection(b)
}

pub fn union(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    if a.0.is_empty() {
        return b.clone();
    }
    if b.0.is_empty() {
        return a.clone();
    }
    a.union(b)
}

pub fn difference(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    if a.0.is_empty() || b.0.is_empty() {
        return a.clone();
    }
    a.difference(b)
}

/// Dissolve a sequence of polygons into one (valid) multipolygon
pub fn union_all<'a, I>(polygons: I) -> MultiPolygon<f64>
where
    I: IntoIterator<Item = &'a Polygon<f64>>,
{
    polygons
        .into_iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, polygon| {
            union(&acc, &to_multi(polygon))
        })
}

pub fn intersection_area(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> f64 {
    intersection(a, b).unsigned_area()
}

/// `true` when `inner` lies inside `container` up to `AREA_TOLERANCE`
pub fn covers(container: &MultiPolygon<f64>, inner: &MultiPolygon<f64>) -> bool {
    let inner_area = inner.unsigned_area();
    if inner_area == 0.0 {
        return true;
    }
    difference(inner, container).unsigned_area() <= AREA_TOLERANCE * inner_area
}

/// Bounding box of a geometry in the form used by the R-tree indexes
pub fn envelope<G>(geometry: &G) -> Option<AABB<[f64; 2]>>
where
    G: BoundingRect<f64, Output = Option<geo::Rect<f64>>>,
{
    geometry.bounding_rect().map(|rect| {
        let (min, max) = (rect.min(), rect.max());
        AABB::from_corners([min.x, min.y], [max.x, max.y])
    })
}
