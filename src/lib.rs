//! # Ride Map
//!
//! Fetch a Strava athlete's recent activities, tidy them into a table and
//! render one ride's route on an interactive map.
//!
//! This library provides:
//! - A Strava client that exchanges a refresh token and fetches one page of activities
//! - A flat activity table built from the nested JSON records
//! - Cleaning and derived columns (date/time split, speed units, decoded routes)
//! - Ride selection (most recent or longest) and Leaflet HTML rendering
//!
//! ## Features
//!
//! - **`http`** (default) - Enable the HTTP client and the `ride-map` binary
//!
//! ## Quick Start
//!
//! ```rust
//! use ride_map::{ActivityTable, RideOptions, pipeline};
//! use serde_json::json;
//!
//! let records = vec![json!({
//!     "name": "Morning Ride",
//!     "type": "Ride",
//!     "distance": 24000.0,
//!     "average_speed": 6.5,
//!     "start_date_local": "2024-05-01T07:12:33Z",
//!     "map": { "summary_polyline": "_p~iF~ps|U_ulLnnqC_mqNvxq`@" },
//! })];
//!
//! let table = ActivityTable::from_records(&records).unwrap();
//! let rides = pipeline::prepare_rides(table, &RideOptions::default()).unwrap();
//! assert_eq!(rides.len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod geo_utils;
pub mod pipeline;
pub mod polyline;
pub mod render;
pub mod select;
pub mod table;
pub mod transform;

// HTTP module for authentication and activity fetching
#[cfg(feature = "http")]
pub mod http;

pub use config::{Config, Credentials, Endpoints, RideOptions};
pub use error::{Error, Result};
pub use render::RideMap;
pub use select::{RideSelection, SelectedActivity};
pub use table::{ActivityTable, Cell};
pub use transform::DropPolicy;

#[cfg(feature = "http")]
pub use http::{AccessToken, StravaClient};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use ride_map::GpsPoint;
/// let point = GpsPoint::new(45.5152, -122.6784); // Portland
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// `[lat, lng]` pair, the order Leaflet expects.
    pub fn to_lat_lng(self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

/// Bounding box for a route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        geo_utils::compute_bounds(points)
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// South-west corner.
    pub fn south_west(&self) -> GpsPoint {
        GpsPoint::new(self.min_lat, self.min_lng)
    }

    /// North-east corner.
    pub fn north_east(&self) -> GpsPoint {
        GpsPoint::new(self.max_lat, self.max_lng)
    }
}

// ============================================================================
// Tests
// ============================================================================
