// ── Runtime bridge configuration ──
//
// Describes *how* to reach one installation: endpoint, credentials,
// polling cadence. Never touches disk -- the CLI (or any other host)
// builds a `BridgeConfig` and hands it to `Bridge::new`.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use homeguard_api::transport::{TlsMode, TransportConfig};
use homeguard_api::{ARM_STATE_ALREADY_SET, Endpoints, LOCK_STATE_ALREADY_SET};

use crate::error::CoreError;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (intercepting proxies, test servers).
    DangerAcceptInvalid,
}

impl TlsVerification {
    pub(crate) fn to_transport(&self) -> TlsMode {
        match self {
            Self::SystemDefaults => TlsMode::System,
            Self::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            Self::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Delays used by the bridge scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timings {
    /// One-shot refresh after a refresh request, an arm or plug command,
    /// or an observer registration.
    pub refresh_delay: Duration,
    /// One-shot refresh after a door lock command. Locks report late.
    pub lock_settle_delay: Duration,
    /// First forced re-login after start.
    pub renewal_offset: Duration,
    /// Forced re-login period after the first one.
    pub renewal_period: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            refresh_delay: Duration::from_secs(1),
            lock_settle_delay: Duration::from_secs(3),
            renewal_offset: Duration::from_secs(60 * 60),
            renewal_period: Duration::from_secs(12 * 60 * 60),
        }
    }
}

/// Configuration for one installation bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// API root, e.g. `https://e-api01.example.com/xbn/2`.
    pub base_url: String,
    /// Installation id (giid).
    pub installation: String,
    pub username: String,
    pub password: SecretString,
    /// Default PIN for arm and lock commands that carry none.
    pub pin: Option<SecretString>,
    /// Fixed delay between state refreshes (seconds). Must be positive.
    pub refresh_interval_secs: u64,
    /// Request timeout enforced by the transport.
    pub timeout: Duration,
    pub tls: TlsVerification,
    /// Vendor error codes meaning "the target state already holds".
    pub already_set_codes: Vec<String>,
    pub timings: Timings,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            installation: String::new(),
            username: String::new(),
            password: SecretString::from(String::new()),
            pin: None,
            refresh_interval_secs: 600,
            timeout: Duration::from_secs(30),
            tls: TlsVerification::default(),
            already_set_codes: vec![
                ARM_STATE_ALREADY_SET.to_owned(),
                LOCK_STATE_ALREADY_SET.to_owned(),
            ],
            timings: Timings::default(),
        }
    }
}

impl BridgeConfig {
    /// Check that the bridge can be started with this configuration.
    ///
    /// Returns the parsed endpoints so callers do not validate twice.
    pub fn validate(&self) -> Result<Endpoints, CoreError> {
        if self.base_url.trim().is_empty() {
            return Err(config_error("base URL is empty"));
        }
        if self.installation.trim().is_empty() {
            return Err(config_error("installation id is empty"));
        }
        if self.username.trim().is_empty() {
            return Err(config_error("username is empty"));
        }
        if self.password.expose_secret().is_empty() {
            return Err(config_error("password is empty"));
        }
        if self.refresh_interval_secs == 0 {
            return Err(config_error("refresh interval must be positive"));
        }

        Endpoints::new(&self.base_url).map_err(|e| config_error(&e.to_string()))
    }

    /// The configured default PIN, if a non-blank one was given.
    pub(crate) fn default_pin(&self) -> Option<&str> {
        self.pin
            .as_ref()
            .map(|pin| pin.expose_secret())
            .filter(|pin| !pin.trim().is_empty())
    }

    pub(crate) fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.to_transport(),
            timeout: self.timeout,
        }
    }
}

fn config_error(message: &str) -> CoreError {
    CoreError::Config {
        message: message.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn valid() -> BridgeConfig {
        BridgeConfig {
            base_url: "https://e-api01.example.com/xbn/2".into(),
            installation: "112233".into(),
            username: "someone@example.com".into(),
            password: SecretString::from("hunter2".to_owned()),
            ..BridgeConfig::default()
        }
    }

    #[test]
    fn valid_config_yields_endpoints() {
        let endpoints = valid().validate().unwrap();
        assert_eq!(endpoints.overview("112233").path(), "/xbn/2/installation/112233/overview");
    }

    #[test]
    fn rejects_missing_fields() {
        let cases: [fn(&mut BridgeConfig); 6] = [
            |c| c.base_url.clear(),
            |c| c.installation = "  ".into(),
            |c| c.username.clear(),
            |c| c.password = SecretString::from(String::new()),
            |c| c.refresh_interval_secs = 0,
            |c| c.base_url = "https://e-api01.example.com/xbn/2?x=1".into(),
        ];

        for mutate in cases {
            let mut config = valid();
            mutate(&mut config);
            assert!(
                matches!(config.validate(), Err(CoreError::Config { .. })),
                "expected configuration error for {config:?}"
            );
        }
    }

    #[test]
    fn blank_pin_counts_as_absent() {
        let mut config = valid();
        assert_eq!(config.default_pin(), None);

        config.pin = Some(SecretString::from("   ".to_owned()));
        assert_eq!(config.default_pin(), None);

        config.pin = Some(SecretString::from("1234".to_owned()));
        assert_eq!(config.default_pin(), Some("1234"));
    }
}
