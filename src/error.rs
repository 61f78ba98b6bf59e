//! Error type shared by every stage of the pipeline.

use thiserror::Error;

use crate::polyline::PolylineError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed with status {status}: {body}")]
    Auth { status: u16, body: String },

    #[error("Activity fetch failed with status {status}: {body}")]
    Fetch { status: u16, body: String },

    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    #[error("API returned no activities")]
    EmptyResponse,

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid value in field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Polyline decoding error: {0}")]
    Polyline(#[from] PolylineError),

    #[error("No activities of type {activity_type:?} to select from")]
    NoActivities { activity_type: String },

    #[error("Selected activity has an empty route")]
    EmptyPath,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid_field(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
