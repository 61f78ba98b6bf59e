//! Run configuration, read from the environment.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `STRAVA_CLIENT_ID` | OAuth client id | required |
//! | `STRAVA_CLIENT_SECRET` | OAuth client secret | required |
//! | `STRAVA_REFRESH_TOKEN` | Long-lived refresh token | required |
//! | `STRAVA_AUTH_URL` | Token endpoint | Strava |
//! | `STRAVA_ACTIVITIES_URL` | Activity listing endpoint | Strava |
//! | `RIDE_MAP_WHICH_RIDE` | `last` or `longest` | `last` |
//! | `RIDE_MAP_ACTIVITY_TYPE` | Activity type to keep | `Ride` |
//! | `RIDE_MAP_OUTPUT` | HTML output path | `ride_map.html` |
//! | `RIDE_MAP_STRICT_COLUMNS` | Fail if a dropped column is absent | `false` |
//! | `RIDE_MAP_TIMEOUT_SECS` | Per-request timeout | none |

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;

use crate::error::{Error, Result};
use crate::select::RideSelection;
use crate::transform::DropPolicy;

pub const DEFAULT_AUTH_URL: &str = "https://www.strava.com/oauth/token";
pub const DEFAULT_ACTIVITIES_URL: &str = "https://www.strava.com/api/v3/athlete/activities";
pub const DEFAULT_ACTIVITY_TYPE: &str = "Ride";
pub const DEFAULT_OUTPUT: &str = "ride_map.html";
/// Activities requested in the single page fetched.
pub const PER_PAGE: u32 = 500;

/// OAuth client credentials and the refresh token exchanged for an access token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

// Secrets stay out of logs and panic messages
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Where to send the two API requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub auth_url: String,
    pub activities_url: String,
    pub per_page: u32,
    pub page: u32,
    pub timeout: Option<Duration>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            activities_url: DEFAULT_ACTIVITIES_URL.to_string(),
            per_page: PER_PAGE,
            page: 1,
            timeout: None,
        }
    }
}

/// How the fetched activities are reduced to one map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RideOptions {
    pub which_ride: RideSelection,
    pub activity_type: String,
    pub output: PathBuf,
    pub drop_policy: DropPolicy,
}

impl Default for RideOptions {
    fn default() -> Self {
        Self {
            which_ride: RideSelection::default(),
            activity_type: DEFAULT_ACTIVITY_TYPE.to_string(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            drop_policy: DropPolicy::default(),
        }
    }
}

/// Everything a run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub credentials: Credentials,
    pub endpoints: Endpoints,
    pub options: RideOptions,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| Error::Config(format!("{key} must be set")))
        };

        let credentials = Credentials {
            client_id: require("STRAVA_CLIENT_ID")?,
            client_secret: require("STRAVA_CLIENT_SECRET")?,
            refresh_token: require("STRAVA_REFRESH_TOKEN")?,
        };

        let defaults = Endpoints::default();
        let timeout = get("RIDE_MAP_TIMEOUT_SECS")
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| Error::Config(format!("invalid RIDE_MAP_TIMEOUT_SECS {raw:?}: {e}")))
            })
            .transpose()?;
        let endpoints = Endpoints {
            auth_url: get("STRAVA_AUTH_URL").unwrap_or(defaults.auth_url),
            activities_url: get("STRAVA_ACTIVITIES_URL").unwrap_or(defaults.activities_url),
            timeout,
            ..defaults
        };

        let which_ride = get("RIDE_MAP_WHICH_RIDE")
            .map(|raw| raw.parse::<RideSelection>())
            .transpose()?
            .unwrap_or_default();
        let strict = get("RIDE_MAP_STRICT_COLUMNS")
            .map(|raw| parse_bool("RIDE_MAP_STRICT_COLUMNS", &raw))
            .transpose()?
            .unwrap_or(false);

        let options = RideOptions {
            which_ride,
            activity_type: get("RIDE_MAP_ACTIVITY_TYPE")
                .unwrap_or_else(|| DEFAULT_ACTIVITY_TYPE.to_string()),
            output: get("RIDE_MAP_OUTPUT").map_or_else(|| PathBuf::from(DEFAULT_OUTPUT), PathBuf::from),
            drop_policy: if strict { DropPolicy::Strict } else { DropPolicy::Lenient },
        };

        debug!("Loaded configuration: {credentials:?}, {endpoints:?}, {options:?}");

        Ok(Self {
            credentials,
            endpoints,
            options,
        })
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("invalid boolean for {key}: {other:?}"))),
    }
}

/// Load a `.env` file into the process environment.
///
/// Runs before logging is set up so that `RUST_LOG` can come from the file;
/// returns the path that was loaded for the caller to report. With no
/// explicit path, a missing `.env` in the working directory is fine. An
/// explicit path that cannot be read, or a `.env` that does not parse, is an
/// error.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| {
                Error::Config(format!("failed to load {}: {e}", path.display()))
            })?;
            Ok(Some(path.to_path_buf()))
        }
        None => match dotenvy::dotenv() {
            Ok(found) => Ok(Some(found)),
            Err(e) if e.not_found() => Ok(None),
            Err(e) => Err(Error::Config(format!("failed to load .env file: {e}"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const CREDS: [(&str, &str); 3] = [
        ("STRAVA_CLIENT_ID", "12345"),
        ("STRAVA_CLIENT_SECRET", "shh"),
        ("STRAVA_REFRESH_TOKEN", "refresh-me"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&CREDS)).unwrap();
        assert_eq!(config.credentials.client_id, "12345");
        assert_eq!(config.endpoints, Endpoints::default());
        assert_eq!(config.endpoints.per_page, 500);
        assert_eq!(config.endpoints.page, 1);
        assert_eq!(config.options, RideOptions::default());
        assert_eq!(config.options.output, PathBuf::from("ride_map.html"));
    }

    #[test]
    fn test_overrides() {
        let mut pairs = CREDS.to_vec();
        pairs.extend([
            ("STRAVA_AUTH_URL", "http://localhost:9000/oauth/token"),
            ("RIDE_MAP_WHICH_RIDE", "longest"),
            ("RIDE_MAP_ACTIVITY_TYPE", "Run"),
            ("RIDE_MAP_OUTPUT", "out/run.html"),
            ("RIDE_MAP_STRICT_COLUMNS", "yes"),
            ("RIDE_MAP_TIMEOUT_SECS", "15"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(config.endpoints.auth_url, "http://localhost:9000/oauth/token");
        assert_eq!(config.endpoints.activities_url, DEFAULT_ACTIVITIES_URL);
        assert_eq!(config.endpoints.timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.options.which_ride, RideSelection::Longest);
        assert_eq!(config.options.activity_type, "Run");
        assert_eq!(config.options.output, PathBuf::from("out/run.html"));
        assert_eq!(config.options.drop_policy, DropPolicy::Strict);
    }

    #[test]
    fn test_missing_credential() {
        let err = Config::from_lookup(lookup(&CREDS[..2])).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("STRAVA_REFRESH_TOKEN")));
    }

    #[test]
    fn test_blank_credential_is_missing() {
        let mut pairs = CREDS.to_vec();
        pairs[0] = ("STRAVA_CLIENT_ID", "  ");
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("RIDE_MAP_WHICH_RIDE", "first"),
            ("RIDE_MAP_STRICT_COLUMNS", "maybe"),
            ("RIDE_MAP_TIMEOUT_SECS", "soon"),
        ] {
            let mut pairs = CREDS.to_vec();
            pairs.push((key, value));
            let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{key}={value}");
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::from_lookup(lookup(&CREDS)).unwrap();
        let printed = format!("{:?}", config.credentials);
        assert!(printed.contains("12345"));
        assert!(!printed.contains("shh"));
        assert!(!printed.contains("refresh-me"));
    }

    #[test]
    fn test_load_missing_explicit_env_file() {
        let err = load_env_file(Some(Path::new("/definitely/not/here/.env"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_explicit_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("ride.env");
        std::fs::write(&file, "RIDE_MAP_ENV_FILE_TEST_LEVEL=debug\n").unwrap();

        let loaded = load_env_file(Some(&file)).unwrap();
        assert_eq!(loaded.as_deref(), Some(file.as_path()));
        assert_eq!(env::var("RIDE_MAP_ENV_FILE_TEST_LEVEL").unwrap(), "debug");
    }
}
