//! Profile selection and CLI flag overrides on top of `homeguard-config`.

use secrecy::SecretString;

use homeguard_config::{Config, Profile, SecretStore};
use homeguard_core::BridgeConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Placeholder id for commands that never touch a specific installation.
const ANY_INSTALLATION: &str = "-";

/// Name of the profile selected by `--profile` or the config default.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `BridgeConfig` from the config file, profile, and CLI overrides.
///
/// With `needs_installation == false` a missing installation id is
/// tolerated (listing installations needs none).
pub fn build_bridge_config(
    global: &GlobalOpts,
    cfg: &Config,
    secrets: &dyn SecretStore,
    needs_installation: bool,
) -> Result<BridgeConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        // An explicitly named profile must exist.
        None if global.profile.is_some() => {
            let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
            names.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            });
        }
        None if global.base_url.is_some() => Profile::default(),
        None => {
            return Err(CliError::NoConfig {
                path: homeguard_config::config_path().display().to_string(),
            });
        }
    };

    apply_overrides(&mut profile, global);
    if !needs_installation && profile.installation.trim().is_empty() {
        ANY_INSTALLATION.clone_into(&mut profile.installation);
    }

    let mut config = homeguard_config::profile_to_bridge_config(
        &profile,
        &profile_name,
        &cfg.defaults,
        secrets,
    )?;
    if let Some(ref pin) = global.pin {
        config.pin = Some(SecretString::from(pin.clone()));
    }

    tracing::debug!(
        profile = %profile_name,
        base_url = %config.base_url,
        installation = %config.installation,
        "bridge configuration resolved"
    );
    Ok(config)
}

fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref url) = global.base_url {
        profile.base_url.clone_from(url);
    }
    if let Some(ref installation) = global.installation {
        profile.installation.clone_from(installation);
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    if global.refresh.is_some() {
        profile.refresh = global.refresh;
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
}
