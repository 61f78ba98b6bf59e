//! HTTP client for the Strava API.
//!
//! Two requests, made once each and in order:
//! - exchange the refresh token for a short-lived access token
//! - fetch one page of the athlete's activities with that token
//!
//! There is no retry and no token refresh on expiry: any failure ends the run.

use std::fmt;
use std::time::Instant;

use log::{debug, info};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;

use crate::config::{Credentials, Endpoints};
use crate::error::{Error, Result};

/// Bearer token returned by the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    /// Unix timestamp, when the endpoint reports one
    pub expires_at: Option<i64>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn secret(&self) -> &str {
        &self.token
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token endpoint response. Only `access_token` is required.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_at: Option<i64>,
    athlete: Option<TokenAthlete>,
}

#[derive(Debug, Deserialize)]
struct TokenAthlete {
    id: Option<u64>,
    firstname: Option<String>,
}

/// Strava API client
pub struct StravaClient {
    client: Client,
    endpoints: Endpoints,
}

impl StravaClient {
    /// Create a client for the given endpoints.
    pub fn new(endpoints: Endpoints) -> Result<Self> {
        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = endpoints.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self { client, endpoints })
    }

    /// Exchange the refresh token for an access token.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken> {
        info!("[Auth] Requesting access token from {}", self.endpoints.auth_url);
        let start = Instant::now();

        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", credentials.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
            ("f", "json"),
        ];

        let response = self
            .client
            .post(&self.endpoints.auth_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Auth {
                status: status.as_u16(),
                body: body_text(response).await,
            });
        }

        let bytes = response.bytes().await?;
        let data: TokenResponse = serde_json::from_slice(&bytes)
            .map_err(|e| Error::MalformedResponse(format!("token response: {e}")))?;
        let token = data
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::MalformedResponse("token response has no access_token".to_string()))?;

        if let Some(athlete) = &data.athlete {
            debug!(
                "[Auth] Token issued for athlete {:?} ({})",
                athlete.id,
                athlete.firstname.as_deref().unwrap_or("unnamed")
            );
        }
        info!("[Auth] Got access token in {:?}", start.elapsed());

        Ok(AccessToken {
            token,
            expires_at: data.expires_at,
        })
    }

    /// Fetch one page of activities as raw JSON objects, most recent first.
    pub async fn fetch_activities(&self, token: &AccessToken) -> Result<Vec<Value>> {
        let Endpoints {
            activities_url,
            per_page,
            page,
            ..
        } = &self.endpoints;
        info!("[Fetch] Requesting page {page} ({per_page} per page) from {activities_url}");

        let req_start = Instant::now();
        let response = self
            .client
            .get(activities_url)
            .header(reqwest::header::AUTHORIZATION, token.bearer())
            .query(&[("per_page", per_page), ("page", page)])
            .send()
            .await?;
        let headers_elapsed = req_start.elapsed();

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch {
                status: status.as_u16(),
                body: body_text(response).await,
            });
        }

        let body_start = Instant::now();
        let bytes = response.bytes().await?;
        let body_elapsed = body_start.elapsed();

        let json_start = Instant::now();
        let data: Value = serde_json::from_slice(&bytes)
            .map_err(|e| Error::MalformedResponse(format!("activity list: {e}")))?;
        let Value::Array(activities) = data else {
            return Err(Error::MalformedResponse(
                "activity list is not a JSON array".to_string(),
            ));
        };
        let json_elapsed = json_start.elapsed();

        info!(
            "[Fetch] headers={:?} body={:?}({:.1}KB) json={:?} activities={}",
            headers_elapsed,
            body_elapsed,
            bytes.len() as f64 / 1024.0,
            json_elapsed,
            activities.len()
        );

        if activities.is_empty() {
            return Err(Error::EmptyResponse);
        }
        Ok(activities)
    }
}

/// Response body for error messages; an unreadable body becomes empty.
async fn body_text(response: Response) -> String {
    response.text().await.unwrap_or_default()
}
