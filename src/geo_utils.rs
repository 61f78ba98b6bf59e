//! # Geographic Utilities
//!
//! Geographic computations on decoded activity routes.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`polyline_length`] | Total length of a GPS track in meters |
//! | [`compute_bounds`] | Bounding box of a GPS track |
//! | [`compute_center`] | Arithmetic mean of a GPS track's coordinates |
//!
//! ## Example
//!
//! ```rust
//! use ride_map::{GpsPoint, geo_utils};
//!
//! let track = vec![
//!     GpsPoint::new(45.0, -122.0),
//!     GpsPoint::new(45.01, -122.01),
//! ];
//!
//! let center = geo_utils::compute_center(&track).unwrap();
//! assert!((center.latitude - 45.005).abs() < 1e-9);
//!
//! let bounds = geo_utils::compute_bounds(&track).unwrap();
//! assert_eq!(bounds.max_lat, 45.01);
//! ```
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees).

use geo::{BoundingRect, Coord, Distance, Haversine, LineString, Point};

use crate::{Bounds, GpsPoint};

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two GPS points in meters.
///
/// Assumes a spherical Earth with radius 6,371 km.
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Calculate the total length of a polyline (GPS track) in meters.
///
/// Empty or single-point tracks return 0.0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a GPS track.
///
/// Returns `None` for an empty track.
pub fn compute_bounds(points: &[GpsPoint]) -> Option<Bounds> {
    let line: LineString<f64> = points
        .iter()
        .map(|p| Coord { x: p.longitude, y: p.latitude })
        .collect();

    line.bounding_rect().map(|rect| Bounds {
        min_lat: rect.min().y,
        max_lat: rect.max().y,
        min_lng: rect.min().x,
        max_lng: rect.max().x,
    })
}

// =============================================================================
// Center Functions
// =============================================================================

/// Compute the center of a GPS track as the arithmetic mean of all latitude
/// and longitude values.
///
/// This is a map-centering heuristic, not a true geometric centroid: dense
/// parts of the track pull the center towards them. Returns `None` for an
/// empty track.
pub fn compute_center(points: &[GpsPoint]) -> Option<GpsPoint> {
    if points.is_empty() {
        return None;
    }

    let sum_lat: f64 = points.iter().map(|p| p.latitude).sum();
    let sum_lng: f64 = points.iter().map(|p| p.longitude).sum();
    let n = points.len() as f64;

    Some(GpsPoint::new(sum_lat / n, sum_lng / n))
}

// =============================================================================
// Unit Tests
// =============================================================================
