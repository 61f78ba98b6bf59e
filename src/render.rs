//! Leaflet map of a single route, written as a standalone HTML page.
//!
//! The page pulls Leaflet and OpenStreetMap tiles from their public CDNs;
//! everything specific to the route is inlined.

use std::fs;
use std::path::Path;

use log::info;
use serde_json::json;

use crate::error::{Error, Result};
use crate::geo_utils::{compute_bounds, compute_center};
use crate::select::SelectedActivity;
use crate::{Bounds, GpsPoint};

pub const DEFAULT_ZOOM: u8 = 10;
pub const DEFAULT_COLOR: &str = "red";
/// Pixel padding around the route when fitting the viewport.
pub const DEFAULT_PADDING: (u32, u32) = (20, 20);

const LEAFLET_VERSION: &str = "1.9.4";
const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const TILE_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

/// A map centered on a route, with the route drawn as a line and the
/// viewport fitted to its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct RideMap {
    center: GpsPoint,
    bounds: Bounds,
    zoom_start: u8,
    path: Vec<GpsPoint>,
    color: String,
    padding: (u32, u32),
    title: String,
}

impl RideMap {
    /// Build a map for a route. The center is the mean of the route's
    /// coordinates.
    ///
    /// Fails with [`Error::EmptyPath`] if the route has no points.
    pub fn from_path(path: &[GpsPoint]) -> Result<Self> {
        let center = compute_center(path).ok_or(Error::EmptyPath)?;
        let bounds = compute_bounds(path).ok_or(Error::EmptyPath)?;

        Ok(Self {
            center,
            bounds,
            zoom_start: DEFAULT_ZOOM,
            path: path.to_vec(),
            color: DEFAULT_COLOR.to_string(),
            padding: DEFAULT_PADDING,
            title: "Ride map".to_string(),
        })
    }

    /// Map of a selected activity, titled with its name and date.
    pub fn for_activity(activity: &SelectedActivity) -> Result<Self> {
        let title = match &activity.name {
            Some(name) => format!("{name} ({})", activity.start_date),
            None => activity.start_date.to_string(),
        };
        Ok(Self::from_path(&activity.path)?.with_title(title))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn center(&self) -> GpsPoint {
        self.center
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn zoom_start(&self) -> u8 {
        self.zoom_start
    }

    pub fn padding(&self) -> (u32, u32) {
        self.padding
    }

    pub fn path(&self) -> &[GpsPoint] {
        &self.path
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Render the complete HTML document.
    pub fn to_html(&self) -> String {
        let latlngs: Vec<[f64; 2]> = self.path.iter().map(|p| p.to_lat_lng()).collect();
        let fit = [
            self.bounds.south_west().to_lat_lng(),
            self.bounds.north_east().to_lat_lng(),
        ];
        let line_options = json!({ "color": self.color });

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>{title}</title>
    <link rel="stylesheet" href="https://unpkg.com/leaflet@{version}/dist/leaflet.css" />
    <script src="https://unpkg.com/leaflet@{version}/dist/leaflet.js"></script>
    <style>
        html, body {{ width: 100%; height: 100%; margin: 0; padding: 0; }}
        #ride-map {{ position: absolute; top: 0; bottom: 0; right: 0; left: 0; }}
    </style>
</head>
<body>
    <div id="ride-map"></div>
    <script>
        var rideMap = L.map("ride-map", {{ center: {center}, zoom: {zoom} }});
        L.tileLayer("{tiles}", {{ maxZoom: 19, attribution: {attribution} }}).addTo(rideMap);
        var route = L.polyline({latlngs}, {line_options}).addTo(rideMap);
        rideMap.fitBounds({fit}, {{ padding: [{pad_x}, {pad_y}] }});
    </script>
</body>
</html>
"#,
            title = html_escape::encode_text(&self.title),
            version = LEAFLET_VERSION,
            center = json!(self.center.to_lat_lng()),
            zoom = self.zoom_start,
            tiles = TILE_URL,
            attribution = json!(TILE_ATTRIBUTION),
            latlngs = json!(latlngs),
            line_options = line_options,
            fit = json!(fit),
            pad_x = self.padding.0,
            pad_y = self.padding.1,
        )
    }

    /// Write the map to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let html = self.to_html();
        fs::write(path, &html)?;
        info!(
            "[Render] Saved {} points to {} ({:.1}KB)",
            self.path.len(),
            path.display(),
            html.len() as f64 / 1024.0
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_points() -> Vec<GpsPoint> {
        vec![GpsPoint::new(45.0, -122.0), GpsPoint::new(45.01, -122.01)]
    }

    #[test]
    fn test_center_is_coordinate_mean() {
        let map = RideMap::from_path(&two_points()).unwrap();
        assert!((map.center().latitude - 45.005).abs() < 1e-9);
        assert!((map.center().longitude - (-122.005)).abs() < 1e-9);
        assert_eq!(map.zoom_start(), 10);
        assert_eq!(map.padding(), (20, 20));
    }

    #[test]
    fn test_bounds_cover_route() {
        let map = RideMap::from_path(&two_points()).unwrap();
        let bounds = map.bounds();
        assert_eq!(bounds.min_lat, 45.0);
        assert_eq!(bounds.max_lat, 45.01);
        assert_eq!(bounds.min_lng, -122.01);
        assert_eq!(bounds.max_lng, -122.0);
    }

    #[test]
    fn test_empty_path_fails() {
        assert!(matches!(RideMap::from_path(&[]), Err(Error::EmptyPath)));
    }

    #[test]
    fn test_html_contents() {
        let html = RideMap::from_path(&two_points())
            .unwrap()
            .with_title("Tom & Jerry <ride>")
            .to_html();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Tom &amp; Jerry &lt;ride&gt;</title>"));
        assert!(html.contains("L.polyline([[45.0,-122.0],[45.01,-122.01]], {\"color\":\"red\"})"));
        assert!(html.contains("rideMap.fitBounds([[45.0,-122.01],[45.01,-122.0]], { padding: [20, 20] })"));
        assert!(html.contains("zoom: 10"));
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("ride_map.html");
        std::fs::write(&out, "stale").unwrap();

        RideMap::from_path(&two_points()).unwrap().save(&out).unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.contains("L.polyline"));
        assert!(!written.contains("stale"));
    }
}
