//! Session Manager

use super::Session;
use crate::error::AuthError;
use crate::pabx::PabxClient;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Performs login and token refresh against the PABX
///
/// Neither operation retries; the polling engine owns the retry policy.
#[derive(Debug, Clone)]
pub struct SessionManager {
    client: PabxClient,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(client: PabxClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for a fresh session
    pub async fn login(&self, username: &str, password: &str, now: Instant) -> Result<Session, AuthError> {
        debug!(username = %username, "Requesting access token");

        let response = self
            .client
            .login(username, password)
            .await
            .map_err(AuthError::Login)?;

        let token = response.token.ok_or(AuthError::IncompleteToken("Token"))?;
        let access_token = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::IncompleteToken("access_token"))?;
        let refresh_token = token
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::IncompleteToken("refresh_token"))?;

        info!(username = %username, status = ?response.status, "PABX session established");
        Ok(Session::authenticated(access_token, refresh_token, now))
    }

    /// Refresh-token grant. On failure the caller keeps `session` untouched.
    pub async fn refresh(&self, session: &Session, now: Instant) -> Result<Session, AuthError> {
        let refresh_token = session.refresh_token().ok_or(AuthError::MissingRefreshToken)?;

        let refreshed = self
            .client
            .refresh_token(refresh_token)
            .await
            .map_err(AuthError::Refresh)?;

        let access_token = refreshed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::IncompleteToken("access_token"))?;
        let rotated = refreshed.refresh_token.filter(|t| !t.is_empty());

        debug!(rotated = rotated.is_some(), "Access token refreshed");
        Ok(session.renewed(access_token, rotated, now))
    }

    /// See [`Session::is_renewal_due`]
    pub fn is_renewal_due(session: &Session, now: Instant, interval: Duration) -> bool {
        session.is_renewal_due(now, interval)
    }
}
