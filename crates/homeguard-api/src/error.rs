use thiserror::Error;

use crate::transport::HttpResponse;

/// Top-level error type for the `homeguard-api` crate.
///
/// Covers every failure mode of the installation API:
/// authentication, transport, request construction, and rejected calls.
/// `homeguard-core` maps these into bridge-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected, or the login response carried no usable token.
    #[error("Authentication failed: {message}")]
    Authentication {
        message: String,
        /// HTTP status of the login response, if one was received.
        status: Option<u16>,
        /// Raw response body, kept for diagnostics.
        body: String,
    },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Base URL parsed but is not usable as an API root.
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Request failed a transport precondition before being sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Session ─────────────────────────────────────────────────────
    /// Authenticated call answered with a non-success status, or with a
    /// body that could not be decoded. Carries the raw response.
    #[error("{message} (HTTP {})", .response.status)]
    Response {
        message: String,
        response: HttpResponse,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// An enumerated id (arm status, lock status) was not recognized.
    #[error("Unknown {kind}: {value}")]
    UnknownStatus { kind: &'static str, value: String },
}

impl Error {
    /// Returns `true` if this error indicates the session is no longer
    /// valid and a fresh login might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        match self {
            Self::Authentication { .. } => true,
            Self::Response { response, .. } => matches!(response.status, 401 | 403),
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying on the
    /// next scheduled tick.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } => *status,
            Self::Response { response, .. } => Some(response.status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
