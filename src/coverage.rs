//! Estimates the mobile coverage footprint from performance tile centres.
//!
//! Every tile centre is buffered by the tile's ground size at the country's
//! latitude, the buffers are merged, and the result is clipped to the country.

use geo::{
    BooleanOps, BoundingRect, ChamberlainDuquetteArea, HaversineDestination, LineString, MultiPolygon,
    Point, Polygon,
};
use log::{debug, info};

use crate::country::CountryBoundary;

/// Edge length in metres of a zoom-16 tile at the equator.
pub const TILE_SIZE_AT_EQUATOR_M: f64 = 610.8;

pub const DEFAULT_SEGMENTS: usize = 64;

pub fn tile_size_at_latitude(latitude: f64) -> f64 {
    TILE_SIZE_AT_EQUATOR_M * latitude.to_radians().cos()
}

/// A disc of `radius_m` metres around `point`, traced with great-circle
/// destinations so it needs no projection.
pub fn buffer_point(point: &Point, radius_m: f64, segments: usize) -> Polygon {
    let segments = segments.max(3);
    let mut coords: Vec<_> = (0..segments)
        .map(|i| {
            let bearing = 360.0 * i as f64 / segments as f64;
            point.haversine_destination(bearing, radius_m).0
        })
        .collect();
    coords.push(coords[0]);
    Polygon::new(LineString::new(coords), vec![])
}

/// Cascaded union: merges neighbours pairwise so each round halves the
/// number of pieces.
pub fn union_all(mut pieces: Vec<MultiPolygon>) -> MultiPolygon {
    if pieces.is_empty() {
        return MultiPolygon::new(vec![]);
    }
    while pieces.len() > 1 {
        debug!("Union round over {} pieces", pieces.len());
        pieces = pieces
            .chunks(2)
            .map(|pair| pair[1..].iter().fold(pair[0].clone(), |acc, next| acc.union(next)))
            .collect();
    }
    pieces.pop().unwrap_or_else(|| MultiPolygon::new(vec![]))
}

pub fn coverage_area(points: &[Point], radius_m: f64) -> MultiPolygon {
    let buffers = points
        .iter()
        .map(|point| MultiPolygon::new(vec![buffer_point(point, radius_m, DEFAULT_SEGMENTS)]))
        .collect();
    let coverage = union_all(buffers);
    info!(
        "Buffered {} tiles by {radius_m:.1} m into {} areas",
        points.len(),
        coverage.0.len()
    );
    coverage
}

pub fn clip_coverage(coverage: &MultiPolygon, boundary: &CountryBoundary) -> MultiPolygon {
    if coverage.0.is_empty() {
        return coverage.clone();
    }
    let clipped = coverage.intersection(&boundary.geometry);
    info!(
        "Clipped coverage to {}: {} areas, {:.0} km²",
        boundary.name,
        clipped.0.len(),
        area_km2(&clipped)
    );
    clipped
}

/// One polygon per disjoint covered area.
pub fn disjoint_areas(coverage: &MultiPolygon) -> Vec<Polygon> {
    coverage
        .0
        .iter()
        .filter(|polygon| polygon.bounding_rect().is_some())
        .cloned()
        .collect()
}

pub fn area_km2(coverage: &MultiPolygon) -> f64 {
    coverage.chamberlain_duquette_unsigned_area() / 1.0e6
}
