//! PABX HTTP Client
//!
//! Thin wrapper over `reqwest` for the four management endpoints the
//! exporter needs. Every call is a single attempt: retry policy belongs to
//! the polling engine.

use super::types::{ActiveCallsPage, LoginRequest, LoginResponse, RefreshedToken, SystemSnapshot};
use crate::error::ApiError;
use anyhow::Context;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const LOGIN_PATH: &str = "/webclient/api/Login/GetAccessToken";
const TOKEN_PATH: &str = "/connect/token";
const ACTIVE_CALLS_PATH: &str = "/xapi/v1/ActiveCalls";
const SYSTEM_STATUS_PATH: &str = "/xapi/v1/SystemStatus";

const REFRESH_GRANT_BODY: &str = "client_id=Webclient&grant_type=refresh_token";

/// HTTP client for one PABX server
#[derive(Debug, Clone)]
pub struct PabxClient {
    http: reqwest::Client,
    base_url: String,
}

impl PabxClient {
    /// Create a client with a bounded per-request timeout
    pub fn new(base_url: &str, request_timeout: Duration) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build PABX HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Server base URL, without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Exchange credentials for an access/refresh token pair
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = LoginRequest {
            re_captcha_response: None,
            security_code: "",
            username,
            password,
        };

        let request = self.http.post(self.url(LOGIN_PATH)).json(&body);
        send_json("login", request).await
    }

    /// Refresh-token grant; the refresh token travels as a cookie
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshedToken, ApiError> {
        let request = self
            .http
            .post(self.url(TOKEN_PATH))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(COOKIE, format!("RefreshTokenCookie={}", refresh_token))
            .body(REFRESH_GRANT_BODY);

        send_json("token_refresh", request).await
    }

    /// First page of active calls, with the server-side total count
    pub async fn active_calls(&self, access_token: &str, top: u32) -> Result<ActiveCallsPage, ApiError> {
        let top = top.to_string();
        let request = self
            .http
            .get(self.url(ACTIVE_CALLS_PATH))
            .query(&[("$top", top.as_str()), ("$skip", "0"), ("$count", "true")])
            .bearer_auth(access_token);

        send_json("active_calls", request).await
    }

    /// System health snapshot
    pub async fn system_status(&self, access_token: &str) -> Result<SystemSnapshot, ApiError> {
        let request = self
            .http
            .get(self.url(SYSTEM_STATUS_PATH))
            .bearer_auth(access_token);

        send_json("system_status", request).await
    }
}

/// Send a request and decode a `200 OK` JSON body; any other status is an error
async fn send_json<T: DeserializeOwned>(
    endpoint: &'static str,
    request: RequestBuilder,
) -> Result<T, ApiError> {
    let response = request
        .send()
        .await
        .map_err(|source| ApiError::Transport { endpoint, source })?;

    let status = response.status();
    debug!(endpoint, status = %status, "PABX response received");

    if status != StatusCode::OK {
        return Err(ApiError::Status { endpoint, status });
    }

    response
        .json::<T>()
        .await
        .map_err(|source| ApiError::Decode { endpoint, source })
}
