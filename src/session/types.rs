//! Session Types

use std::fmt;
use std::time::{Duration, Instant};

/// Authenticated state held against the PABX
///
/// A `Session` is a value: login and refresh produce a new one, nothing
/// mutates it in place. An absent access token means "not yet
/// authenticated" and blocks polling.
#[derive(Clone)]
pub struct Session {
    access_token: Option<String>,
    refresh_token: Option<String>,
    last_renewal: Instant,
}

impl Session {
    /// Session with no tokens yet
    pub fn unauthenticated(now: Instant) -> Self {
        Self {
            access_token: None,
            refresh_token: None,
            last_renewal: now,
        }
    }

    /// Only built from a successful authentication response
    pub(crate) fn authenticated(access_token: String, refresh_token: String, now: Instant) -> Self {
        Self {
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
            last_renewal: now,
        }
    }

    /// Session after a successful refresh; keeps the prior refresh token
    /// when the server did not rotate it
    pub(crate) fn renewed(&self, access_token: String, refresh_token: Option<String>, now: Instant) -> Self {
        Self {
            access_token: Some(access_token),
            refresh_token: refresh_token.or_else(|| self.refresh_token.clone()),
            last_renewal: now,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Instant of the last login or successful refresh
    pub fn last_renewal(&self) -> Instant {
        self.last_renewal
    }

    /// Whether `interval` has elapsed since the last renewal. Pure: the
    /// caller supplies `now`.
    pub fn is_renewal_due(&self, now: Instant, interval: Duration) -> bool {
        now.saturating_duration_since(self.last_renewal) >= interval
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("last_renewal", &self.last_renewal)
            .finish()
    }
}
