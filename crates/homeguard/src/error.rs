//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use homeguard_config::ConfigError;
use homeguard_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONFIG: i32 = 4;
    pub const COMMAND: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the installation API: {reason}")]
    #[diagnostic(
        code(homeguard::connection_failed),
        help(
            "Check network access and the base URL of your profile.\n\
             Behind an intercepting proxy, try --insecure (-k) or set ca_cert."
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(homeguard::auth_failed),
        help(
            "Verify the username and password.\n\
             Store the password with: homeguard config set-secret password"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(homeguard::no_credentials),
        help(
            "Set HOMEGUARD_PASSWORD, or store the password with:\n\
             homeguard config set-secret password --profile {profile}"
        )
    )]
    NoCredentials { profile: String },

    // ── Commands ─────────────────────────────────────────────────────
    #[error("Command rejected: {message}")]
    #[diagnostic(
        code(homeguard::command_rejected),
        help("A wrong PIN is the most common cause. Check the PIN and try again.")
    )]
    CommandRejected { message: String },

    #[error("No PIN available for this command")]
    #[diagnostic(
        code(homeguard::missing_pin),
        help("Pass --pin, set HOMEGUARD_PIN, or store one with: homeguard config set-secret pin")
    )]
    MissingPin,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(homeguard::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(homeguard::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: homeguard config set-profile"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No installation configured")]
    #[diagnostic(
        code(homeguard::no_config),
        help(
            "Create a profile with: homeguard config set-profile <name> --url <base-url> --giid <id>\n\
             Or pass --base-url and --installation.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(homeguard::config))]
    Config { message: String },

    // ── Internal / IO ────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(homeguard::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render TOML: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::CommandRejected { .. } => exit_code::COMMAND,
            Self::Validation { .. } => exit_code::USAGE,
            Self::MissingPin
            | Self::ProfileNotFound { .. }
            | Self::NoConfig { .. }
            | Self::Config { .. } => exit_code::CONFIG,
            Self::Internal(_) | Self::Io(_) | Self::Toml(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::SessionResponse { message, status } => CliError::CommandRejected {
                message: format!("{message} (HTTP {status})"),
            },
            CoreError::MalformedCommand { channel, payload } => CliError::Validation {
                field: channel,
                reason: format!("cannot interpret {payload:?}"),
            },
            CoreError::MissingPin => CliError::MissingPin,
            CoreError::Config { message } => CliError::Config { message },
            other @ (CoreError::InvalidState { .. }
            | CoreError::Observer { .. }
            | CoreError::Internal(_)) => CliError::Internal(other.to_string()),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: "(none)".into(),
            },
            ConfigError::Validation { field, reason } => CliError::Config {
                message: format!("invalid {field}: {reason}"),
            },
            ConfigError::Bridge(inner) => inner.into(),
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let cases = [
            (CoreError::ConnectionFailed { reason: "down".into() }, exit_code::CONNECTION),
            (CoreError::AuthenticationFailed { message: "no".into() }, exit_code::AUTH),
            (
                CoreError::SessionResponse {
                    message: "rejected".into(),
                    status: 400,
                },
                exit_code::COMMAND,
            ),
            (CoreError::MissingPin, exit_code::CONFIG),
            (CoreError::Config { message: "x".into() }, exit_code::CONFIG),
        ];

        for (core, expected) in cases {
            let label = core.to_string();
            assert_eq!(CliError::from(core).exit_code(), expected, "{label}");
        }
    }

    #[test]
    fn wrapped_bridge_errors_keep_their_kind() {
        let err = ConfigError::Bridge(CoreError::Config {
            message: "refresh interval must be positive".into(),
        });
        assert!(matches!(CliError::from(err), CliError::Config { .. }));
    }
}
