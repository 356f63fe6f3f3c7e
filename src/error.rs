//! Error Types
//!
//! Typed failures raised by the session, fetch and classification paths.
//! None of these escape a polling tick: the engine logs them and either
//! retries next tick or restarts after a backoff.

use reqwest::StatusCode;
use thiserror::Error;

/// A failed exchange with the PABX API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection refused, timeout, TLS failure...
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Any status other than 200 OK
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },

    /// Body was not the JSON we expected
    #[error("failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    /// True when the server rejected the bearer token
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }
}

/// Login or token refresh failed
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("login failed: {0}")]
    Login(#[source] ApiError),

    #[error("token refresh failed: {0}")]
    Refresh(#[source] ApiError),

    #[error("authentication response carried no {0}")]
    IncompleteToken(&'static str),

    #[error("session holds no refresh token")]
    MissingRefreshToken,
}

/// Active-calls or system-status request failed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("session is not authenticated")]
    Unauthenticated,

    #[error("active calls fetch failed: {0}")]
    ActiveCalls(#[source] ApiError),

    #[error("system status fetch failed: {0}")]
    SystemStatus(#[source] ApiError),
}

impl FetchError {
    /// True when the PABX rejected the access token
    pub fn is_unauthorized(&self) -> bool {
        match self {
            FetchError::Unauthenticated => true,
            FetchError::ActiveCalls(e) | FetchError::SystemStatus(e) => e.is_unauthorized(),
        }
    }
}

/// A caller/callee string that does not look like an extension
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unrecognised extension string {raw:?}")]
    Extension { raw: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_detection() {
        let unauthorized = ApiError::Status {
            endpoint: "active_calls",
            status: StatusCode::UNAUTHORIZED,
        };
        assert!(unauthorized.is_unauthorized());
        assert!(FetchError::ActiveCalls(unauthorized).is_unauthorized());

        let server_error = ApiError::Status {
            endpoint: "system_status",
            status: StatusCode::INTERNAL_SERVER_ERROR,
        };
        assert!(!server_error.is_unauthorized());
        assert!(FetchError::Unauthenticated.is_unauthorized());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = AuthError::Login(ApiError::Status {
            endpoint: "login",
            status: StatusCode::FORBIDDEN,
        });
        assert_eq!(err.to_string(), "login failed: login returned HTTP 403 Forbidden");

        let parse = ParseError::Extension { raw: "garbage".to_string() };
        assert_eq!(parse.to_string(), "unrecognised extension string \"garbage\"");
    }
}
