//! `homeguard config ...`: local configuration, no network.

use std::io::{self, BufRead};

use homeguard_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, SetProfileArgs, SetSecretArgs};
use crate::config::active_profile_name;
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&homeguard_config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
        ConfigCommand::Show => {
            let mut cfg = homeguard_config::load_config()?;
            redact(&mut cfg);
            let rendered = toml::to_string_pretty(&cfg)?;
            output::print_output(rendered.trim_end(), global.quiet);
            Ok(())
        }
        ConfigCommand::Profiles => {
            let cfg = homeguard_config::load_config()?;
            output::print_output(&list_profiles(&cfg), global.quiet);
            Ok(())
        }
        ConfigCommand::SetProfile(args) => set_profile(args, global),
        ConfigCommand::SetSecret(args) => set_secret(args, global),
    }
}

fn redact(cfg: &mut Config) {
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(REDACTED.into());
        }
        if profile.pin.is_some() {
            profile.pin = Some(REDACTED.into());
        }
    }
}

/// One profile per line, the default marked with `*`.
fn list_profiles(cfg: &Config) -> String {
    let mut names: Vec<&String> = cfg.profiles.keys().collect();
    names.sort();
    names
        .into_iter()
        .map(|name| {
            let marker = if cfg.default_profile.as_ref() == Some(name) { "*" } else { " " };
            format!("{marker} {name}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn set_profile(args: SetProfileArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = homeguard_config::load_config_or_default();
    let mut profile = cfg.profiles.remove(&args.name).unwrap_or_default();
    apply_profile_args(&mut profile, &args);
    cfg.profiles.insert(args.name.clone(), profile);
    if args.default || cfg.profiles.len() == 1 {
        cfg.default_profile = Some(args.name.clone());
    }

    homeguard_config::save_config(&cfg)?;
    if !global.quiet {
        eprintln!("Profile '{}' saved", args.name);
    }
    Ok(())
}

/// Replace connection fields, keeping secrets and tuning already set.
fn apply_profile_args(profile: &mut Profile, args: &SetProfileArgs) {
    profile.base_url.clone_from(&args.url);
    profile.installation.clone_from(&args.giid);
    if args.user.is_some() {
        profile.username.clone_from(&args.user);
    }
}

fn set_secret(args: SetSecretArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = homeguard_config::load_config_or_default();
    let profile = active_profile_name(global, &cfg);

    let mut value = String::new();
    io::stdin().lock().read_line(&mut value)?;
    let value = value.trim_end_matches(['\r', '\n']);
    if value.is_empty() {
        return Err(CliError::Validation {
            field: args.field.key().into(),
            reason: "empty value on stdin".into(),
        });
    }

    homeguard_config::store_secret(&profile, args.field.key(), value)?;
    if !global.quiet {
        eprintln!("Stored {} for profile '{profile}' in the system keyring", args.field.key());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        let mut cfg = Config::default();
        for name in ["home", "cabin"] {
            cfg.profiles.insert(
                name.into(),
                Profile {
                    password: Some("hunter2".into()),
                    ..Profile::default()
                },
            );
        }
        cfg.default_profile = Some("home".into());
        cfg
    }

    #[test]
    fn profiles_are_sorted_with_default_marked() {
        assert_eq!(list_profiles(&cfg()), "  cabin\n* home");
    }

    #[test]
    fn show_never_prints_secrets() {
        let mut cfg = cfg();
        redact(&mut cfg);
        let rendered = toml::to_string_pretty(&cfg).expect("serializable");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains(REDACTED));
    }

    #[test]
    fn set_profile_keeps_existing_username_when_not_given() {
        let mut profile = Profile {
            username: Some("someone@example.com".into()),
            pin: Some("1234".into()),
            ..Profile::default()
        };
        let args = SetProfileArgs {
            name: "home".into(),
            url: "https://e-api01.example.com/xbn/2".into(),
            giid: "112233".into(),
            user: None,
            default: false,
        };
        apply_profile_args(&mut profile, &args);

        assert_eq!(profile.installation, "112233");
        assert_eq!(profile.username.as_deref(), Some("someone@example.com"));
        assert_eq!(profile.pin.as_deref(), Some("1234"));
    }
}
