// ── Core error types ──
//
// User-facing errors from homeguard-core. Consumers never match on raw
// HTTP plumbing: the `From<homeguard_api::Error>` impl folds transport
// and session failures into the bridge taxonomy.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach installation API: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Session errors ───────────────────────────────────────────────
    #[error("Request rejected: {message}")]
    SessionResponse {
        message: String,
        /// HTTP status of the rejected call.
        status: u16,
    },

    // ── Command errors ───────────────────────────────────────────────
    #[error("Malformed command on {channel}: {payload:?}")]
    MalformedCommand { channel: String, payload: String },

    #[error("No PIN given and no default PIN configured")]
    MissingPin,

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Bridge is {state}")]
    InvalidState { state: &'static str },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Observer errors ──────────────────────────────────────────────
    #[error("Observer {key} failed: {message}")]
    Observer { key: String, message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the bridge should report this as a configuration problem
    /// rather than a communication problem.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::MissingPin)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<homeguard_api::Error> for CoreError {
    fn from(err: homeguard_api::Error) -> Self {
        use homeguard_api::Error as Api;

        match err {
            Api::Authentication { message, status, .. } => CoreError::AuthenticationFailed {
                message: match status {
                    Some(status) => format!("{message} (HTTP {status})"),
                    None => message,
                },
            },
            Api::Transport(ref e) => CoreError::ConnectionFailed {
                reason: match e.url() {
                    Some(url) => format!("{} ({e})", url.host_str().unwrap_or("<unknown>")),
                    None => e.to_string(),
                },
            },
            Api::Tls(msg) => CoreError::ConnectionFailed {
                reason: format!("TLS error: {msg}"),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::InvalidBaseUrl { url, reason } => CoreError::Config {
                message: format!("Invalid base URL '{url}': {reason}"),
            },
            Api::Response { message, response } => CoreError::SessionResponse {
                message,
                status: response.status,
            },
            Api::UnknownStatus { kind, value } => CoreError::MalformedCommand {
                channel: kind.to_owned(),
                payload: value,
            },
            Api::InvalidRequest(message) => CoreError::Internal(message),
        }
    }
}
