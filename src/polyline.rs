//! # Encoded Polylines
//!
//! Strava's `map.summary_polyline` uses the [encoded polyline algorithm
//! format] at precision 5 (1e-5 degrees, roughly 1.1 m). Encoding and
//! decoding go through the georust `polyline` crate, which works on
//! `geo::LineString` with x = longitude and y = latitude.
//!
//! ## Example
//!
//! ```rust
//! use ride_map::{GpsPoint, polyline};
//!
//! let points = polyline::decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
//! assert_eq!(points[0], GpsPoint::new(38.5, -120.2));
//! assert_eq!(polyline::encode(&points).unwrap(), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
//! ```
//!
//! [encoded polyline algorithm format]: https://developers.google.com/maps/documentation/utilities/polylinealgorithm

use geo::LineString;
use thiserror::Error;

use crate::GpsPoint;

/// Decimal places kept by Strava polylines.
pub const PRECISION: u32 = 5;

const ASCII_OFFSET: u8 = 63;
const ASCII_MAX: u8 = 126;
/// First byte value carrying the continuation bit.
const CONTINUATION: u8 = ASCII_OFFSET + 0x20;
/// Chunks per value. 35 bits covers any delta between valid coordinates at
/// precision 5, so summing deltas cannot overflow.
const MAX_CHUNKS: usize = 7;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolylineError {
    #[error("invalid character {ch:?} at byte {index}")]
    InvalidCharacter { ch: char, index: usize },

    #[error("polyline ends in the middle of a value at byte {index}")]
    Truncated { index: usize },

    #[error("value starting at byte {index} is too large for a coordinate")]
    Overflow { index: usize },

    #[error("point {index} ({latitude}, {longitude}) is outside valid coordinates")]
    OutOfRange {
        index: usize,
        latitude: f64,
        longitude: f64,
    },

    #[error("malformed polyline: {0}")]
    Decode(String),

    #[error("cannot encode path: {0}")]
    Encode(String),
}

/// Reject bytes the decoder cannot consume.
///
/// Every byte must be printable polyline ASCII, no value may be longer than
/// [`MAX_CHUNKS`] and the string may not end on a continuation chunk.
fn scan(bytes: &[u8]) -> Result<(), PolylineError> {
    let mut value_start = 0;
    for (index, &byte) in bytes.iter().enumerate() {
        if !(ASCII_OFFSET..=ASCII_MAX).contains(&byte) {
            return Err(PolylineError::InvalidCharacter { ch: byte as char, index });
        }
        if index - value_start >= MAX_CHUNKS {
            return Err(PolylineError::Overflow { index: value_start });
        }
        if byte < CONTINUATION {
            value_start = index + 1;
        }
    }
    if value_start < bytes.len() {
        return Err(PolylineError::Truncated { index: bytes.len() });
    }
    Ok(())
}

/// Decode an encoded polyline into an ordered list of points.
///
/// An empty string decodes to an empty path. Every decoded point must be a
/// valid coordinate.
pub fn decode(encoded: &str) -> Result<Vec<GpsPoint>, PolylineError> {
    if encoded.is_empty() {
        return Ok(Vec::new());
    }
    scan(encoded.as_bytes())?;

    let line = ::polyline::decode_polyline(encoded, PRECISION)
        .map_err(|e| PolylineError::Decode(e.to_string()))?;

    let points: Vec<GpsPoint> = line
        .coords()
        .map(|c| GpsPoint::new(c.y, c.x))
        .collect();

    if let Some((index, p)) = points.iter().enumerate().find(|(_, p)| !p.is_valid()) {
        return Err(PolylineError::OutOfRange {
            index,
            latitude: p.latitude,
            longitude: p.longitude,
        });
    }
    Ok(points)
}

/// Encode points into a polyline string at precision 5.
pub fn encode(points: &[GpsPoint]) -> Result<String, PolylineError> {
    let line: LineString<f64> = points.iter().map(|p| (p.longitude, p.latitude)).collect();
    ::polyline::encode_coordinates(line, PRECISION).map_err(|e| PolylineError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference example from the algorithm documentation
    const REFERENCE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_decode_reference() {
        let points = decode(REFERENCE).unwrap();
        assert_eq!(points.len(), 3);
        assert!(approx_eq(points[0].latitude, 38.5));
        assert!(approx_eq(points[0].longitude, -120.2));
        assert!(approx_eq(points[1].latitude, 40.7));
        assert!(approx_eq(points[1].longitude, -120.95));
        assert!(approx_eq(points[2].latitude, 43.252));
        assert!(approx_eq(points[2].longitude, -126.453));
    }

    #[test]
    fn test_encode_reference() {
        let points = vec![
            GpsPoint::new(38.5, -120.2),
            GpsPoint::new(40.7, -120.95),
            GpsPoint::new(43.252, -126.453),
        ];
        assert_eq!(encode(&points).unwrap(), REFERENCE);
    }

    #[test]
    fn test_round_trip_reproduces_input() {
        let samples = [REFERENCE, "??", "_ibE_seK_seK_seK", "gfo}EtohhUxD@bAxJmGF"];
        for encoded in samples {
            let decoded = decode(encoded).unwrap();
            assert_eq!(encode(&decoded).unwrap(), encoded, "round trip of {encoded}");
        }
    }

    #[test]
    fn test_empty() {
        assert!(decode("").unwrap().is_empty());
        assert_eq!(encode(&[]).unwrap(), "");
    }

    #[test]
    fn test_truncated_chunk() {
        // Continuation chunk with nothing after it
        assert_eq!(decode("_").unwrap_err(), PolylineError::Truncated { index: 1 });
        assert_eq!(decode("_p~iF~").unwrap_err(), PolylineError::Truncated { index: 6 });
    }

    #[test]
    fn test_latitude_without_longitude() {
        assert!(decode("_p~iF").is_err());
    }

    #[test]
    fn test_invalid_character() {
        let err = decode("_p~iF ps|U").unwrap_err();
        assert_eq!(err, PolylineError::InvalidCharacter { ch: ' ', index: 5 });
    }

    #[test]
    fn test_overlong_value() {
        let encoded = "~".repeat(20);
        assert_eq!(decode(&encoded).unwrap_err(), PolylineError::Overflow { index: 0 });
    }

    #[test]
    fn test_huge_deltas_fail_without_panicking() {
        // Two latitude deltas of 2^62 each; summing them would overflow i64
        let encoded = "____________G?____________G?";
        assert_eq!(decode(encoded).unwrap_err(), PolylineError::Overflow { index: 0 });
    }

    #[test]
    fn test_latitude_beyond_pole_rejected() {
        // (91.0, 0.0)
        assert!(decode("_mljP?").is_err());
    }

    #[test]
    fn test_encode_rejects_invalid_point() {
        assert!(encode(&[GpsPoint::new(0.0, 200.0)]).is_err());
    }
}
