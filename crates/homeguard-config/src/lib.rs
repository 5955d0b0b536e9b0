//! Shared configuration for homeguard hosts.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `homeguard_core::BridgeConfig`. The CLI layers its
//! flag overrides on top of what this crate produces.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use homeguard_core::{BridgeConfig, CoreError, TlsVerification};

/// Keyring service name; entries are `<profile>/<field>`.
pub const KEYRING_SERVICE: &str = "homeguard";

/// Environment variable consulted for the password when a profile names none.
pub const PASSWORD_ENV: &str = "HOMEGUARD_PASSWORD";

/// Environment variable consulted for the default PIN.
pub const PIN_ENV: &str = "HOMEGUARD_PIN";

/// Environment variable consulted for the username.
pub const USERNAME_ENV: &str = "HOMEGUARD_USERNAME";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error(transparent)]
    Bridge(#[from] CoreError),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<ConfigError> for CoreError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Bridge(inner) => inner,
            other => CoreError::Config {
                message: other.to_string(),
            },
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is selected explicitly.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named installation profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// The profile selected by `name`, or by `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(name, profile)| (name.as_str(), profile))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.to_owned(),
            })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Refresh interval (seconds).
    #[serde(default = "default_refresh")]
    pub refresh: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            refresh: default_refresh(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_refresh() -> u64 {
    600
}

/// A named installation profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// API root (e.g., "https://e-api01.example.com/xbn/2").
    pub base_url: String,

    /// Installation id (giid).
    pub installation: String,

    /// Account username (usually an email address).
    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Default PIN for arm and lock commands (plaintext -- prefer keyring).
    pub pin: Option<String>,

    /// Environment variable name containing the PIN.
    pub pin_env: Option<String>,

    /// Override refresh interval (seconds).
    pub refresh: Option<u64>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Vendor error codes treated as "already in the requested state".
    pub already_set_codes: Option<Vec<String>>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "homeguard", "homeguard").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("homeguard");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
///
/// A missing file is not an error; the defaults apply. Environment
/// variables prefixed `HOMEGUARD_` override file values, with `__`
/// separating nested keys (`HOMEGUARD_PROFILES__HOME__REFRESH=60`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("HOMEGUARD_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

/// Serialize config to TOML and write it to `path`, creating parents.
pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Secret sources ──────────────────────────────────────────────────

/// Where credentials come from, besides the profile itself.
pub trait SecretStore {
    fn env(&self, name: &str) -> Option<String>;

    /// Look up `<profile>/<field>` in the keyring.
    fn keyring(&self, profile: &str, field: &str) -> Option<String>;
}

/// Process environment and the platform keyring.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSecrets;

impl SecretStore for SystemSecrets {
    fn env(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn keyring(&self, profile: &str, field: &str) -> Option<String> {
        keyring::Entry::new(KEYRING_SERVICE, &format!("{profile}/{field}"))
            .and_then(|entry| entry.get_password())
            .ok()
    }
}

/// Store a secret under `<profile>/<field>` in the platform keyring.
pub fn store_secret(profile: &str, field: &str, value: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile}/{field}"))?;
    entry.set_password(value)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve the username: profile, then `HOMEGUARD_USERNAME`.
pub fn resolve_username(
    profile: &Profile,
    profile_name: &str,
    secrets: &dyn SecretStore,
) -> Result<String, ConfigError> {
    profile
        .username
        .clone()
        .filter(|u| !u.trim().is_empty())
        .or_else(|| secrets.env(USERNAME_ENV))
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// Resolve the password without CLI flags.
///
/// Order: the profile's `password_env` variable, `HOMEGUARD_PASSWORD`,
/// the keyring, then plaintext in the profile.
pub fn resolve_password(
    profile: &Profile,
    profile_name: &str,
    secrets: &dyn SecretStore,
) -> Result<SecretString, ConfigError> {
    resolve_secret(
        profile.password_env.as_deref(),
        PASSWORD_ENV,
        "password",
        profile.password.as_deref(),
        profile_name,
        secrets,
    )
    .map(SecretString::from)
    .ok_or_else(|| ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Resolve the default PIN, if any. Same order as the password.
pub fn resolve_pin(
    profile: &Profile,
    profile_name: &str,
    secrets: &dyn SecretStore,
) -> Option<SecretString> {
    resolve_secret(
        profile.pin_env.as_deref(),
        PIN_ENV,
        "pin",
        profile.pin.as_deref(),
        profile_name,
        secrets,
    )
    .map(SecretString::from)
}

fn resolve_secret(
    profile_env: Option<&str>,
    fallback_env: &str,
    field: &str,
    plaintext: Option<&str>,
    profile_name: &str,
    secrets: &dyn SecretStore,
) -> Option<String> {
    profile_env
        .and_then(|name| secrets.env(name))
        .or_else(|| secrets.env(fallback_env))
        .or_else(|| secrets.keyring(profile_name, field))
        .or_else(|| plaintext.map(str::to_owned))
        .filter(|value| !value.is_empty())
}

/// Build a `BridgeConfig` from a profile -- no CLI flag overrides.
pub fn profile_to_bridge_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    secrets: &dyn SecretStore,
) -> Result<BridgeConfig, ConfigError> {
    if profile.base_url.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("profile '{profile_name}' has no base_url"),
        });
    }
    if profile.installation.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "installation".into(),
            reason: format!("profile '{profile_name}' has no installation id"),
        });
    }

    let username = resolve_username(profile, profile_name, secrets)?;
    let password = resolve_password(profile, profile_name, secrets)?;
    let pin = resolve_pin(profile, profile_name, secrets);

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut config = BridgeConfig {
        base_url: profile.base_url.trim().to_owned(),
        installation: profile.installation.trim().to_owned(),
        username,
        password,
        pin,
        refresh_interval_secs: profile.refresh.unwrap_or(defaults.refresh),
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        tls,
        ..BridgeConfig::default()
    };
    if let Some(ref codes) = profile.already_set_codes {
        config.already_set_codes.clone_from(codes);
    }

    config.validate()?;
    Ok(config)
}
