//! Config subcommand handlers.

use std::collections::HashMap;

use dialoguer::{Input, Select};
use secrecy::SecretString;

use qclink_core::{ProbeMode, Scheme};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking the password.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "probe_timeout = {}", cfg.defaults.probe_timeout);
    let _ = writeln!(out, "probe_mode = \"{}\"", cfg.defaults.probe_mode);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        if let Some(ref id) = p.quickconnect_id {
            let _ = writeln!(out, "quickconnect_id = \"{id}\"");
        }
        if let Some(ref url) = p.url {
            let _ = writeln!(out, "url = \"{url}\"");
        }
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if let Some(scheme) = p.scheme {
            let _ = writeln!(out, "scheme = \"{scheme}\"");
        }
        if let Some(mode) = p.probe_mode {
            let _ = writeln!(out, "probe_mode = \"{mode}\"");
        }
        if let Some(secs) = p.probe_timeout {
            let _ = writeln!(out, "probe_timeout = {secs}");
        }
        if let Some(ref hosts) = p.broker_hosts {
            let quoted: Vec<String> = hosts.iter().map(|h| format!("\"{h}\"")).collect();
            let _ = writeln!(out, "broker_hosts = [{}]", quoted.join(", "));
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
    }

    out
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_password() -> Result<SecretString, CliError> {
    let pass = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
    if pass.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "password cannot be empty".into(),
        });
    }
    Ok(SecretString::from(pass))
}

/// Store the password in the keyring, or hand it back for plaintext config.
fn prompt_password_storage(
    profile_name: &str,
    password: &SecretString,
) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
        "Don't store; ask at login",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    match selection {
        0 => {
            qclink_config::store_password(profile_name, password)?;
            eprintln!("   ✓ Password stored in system keyring");
            Ok(None)
        }
        1 => {
            use secrecy::ExposeSecret;
            Ok(Some(password.expose_secret().to_owned()))
        }
        _ => Ok(None),
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: "must be 'true' or 'false'".into(),
    })
}

fn parse_secs(field: &str, value: &str) -> Result<u64, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: "must be a number (seconds)".into(),
    })
}

/// Apply one `config set` assignment to a profile.
fn set_profile_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "quickconnect_id" | "quickconnect-id" | "id" => profile.quickconnect_id = Some(value),
        "url" => {
            qclink_core::parse_endpoint(&value).map_err(|e| CliError::Validation {
                field: "url".into(),
                reason: e.to_string(),
            })?;
            profile.url = Some(value);
        }
        "username" => profile.username = Some(value),
        "scheme" => {
            let scheme: Scheme = value.parse().map_err(|_| CliError::Validation {
                field: "scheme".into(),
                reason: "must be 'https' or 'http'".into(),
            })?;
            profile.scheme = Some(scheme);
        }
        "probe_mode" | "probe-mode" => {
            let mode: ProbeMode = value.parse().map_err(|_| CliError::Validation {
                field: "probe_mode".into(),
                reason: "must be 'concurrent' or 'sequential'".into(),
            })?;
            profile.probe_mode = Some(mode);
        }
        "probe_timeout" | "probe-timeout" => {
            profile.probe_timeout = Some(parse_secs("probe_timeout", &value)?);
        }
        "broker_hosts" | "broker-hosts" => {
            let hosts: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_owned)
                .collect();
            for host in &hosts {
                url::Url::parse(host).map_err(|e| CliError::Validation {
                    field: "broker_hosts".into(),
                    reason: format!("{host}: {e}"),
                })?;
            }
            profile.broker_hosts = Some(hosts).filter(|h| !h.is_empty());
        }
        "insecure" => profile.insecure = Some(parse_bool("insecure", &value)?),
        "timeout" => profile.timeout = Some(parse_secs("timeout", &value)?),
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: quickconnect_id, url, \
                     username, scheme, probe_mode, probe_timeout, broker_hosts, insecure, \
                     timeout, ca_cert"
                ),
            });
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("✨ qclink configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let how = Select::new()
                .with_prompt("How is the appliance reached?")
                .items(&["QuickConnect ID", "Direct address (LAN IP or hostname)"])
                .default(0)
                .interact()
                .map_err(prompt_err)?;

            let mut profile = Profile::default();
            if how == 0 {
                let id: String = Input::new()
                    .with_prompt("QuickConnect ID")
                    .interact_text()
                    .map_err(prompt_err)?;
                set_profile_key(&mut profile, "quickconnect_id", id.trim().to_owned())?;
            } else {
                let url: String = Input::new()
                    .with_prompt("Address")
                    .default("http://192.168.1.10:5000".into())
                    .interact_text()
                    .map_err(prompt_err)?;
                set_profile_key(&mut profile, "url", url)?;
            }

            let user: String = Input::new()
                .with_prompt("Username")
                .interact_text()
                .map_err(prompt_err)?;
            if user.is_empty() {
                return Err(CliError::Validation {
                    field: "username".into(),
                    reason: "username cannot be empty".into(),
                });
            }
            profile.username = Some(user);
            profile.password = prompt_password_storage(&profile_name, &prompt_password()?)?;

            // Keep other profiles when re-running the wizard.
            let existing = config::load_config_or_default();
            let mut profiles: HashMap<String, Profile> = existing.profiles;
            profiles.insert(profile_name.clone(), profile);
            let cfg = Config {
                default_profile: Some(profile_name.clone()),
                defaults: existing.defaults,
                profiles,
            };

            config::save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: qclink login");

            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(&global.output, &cfg, format_config_redacted, |_| {
                "config".into()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);

            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_profile_key(profile, &key, value)?;

            config::save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: qclink config init");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));

            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name: profile_name,
                });
            }

            qclink_config::store_password(&profile_name, &prompt_password()?)?;
            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn set_parses_typed_keys() {
        let mut profile = Profile::default();
        set_profile_key(&mut profile, "probe-mode", "sequential".into()).unwrap();
        set_profile_key(&mut profile, "scheme", "http".into()).unwrap();
        set_profile_key(&mut profile, "timeout", "12".into()).unwrap();
        set_profile_key(
            &mut profile,
            "broker_hosts",
            "https://a.example/Serv.php, https://b.example/Serv.php".into(),
        )
        .unwrap();

        assert_eq!(profile.probe_mode, Some(ProbeMode::Sequential));
        assert_eq!(profile.scheme, Some(Scheme::Http));
        assert_eq!(profile.timeout, Some(12));
        assert_eq!(profile.broker_hosts.unwrap().len(), 2);
    }

    #[test]
    fn set_rejects_bad_values() {
        let mut profile = Profile::default();
        assert!(set_profile_key(&mut profile, "probe_mode", "eventually".into()).is_err());
        assert!(set_profile_key(&mut profile, "insecure", "maybe".into()).is_err());
        assert!(set_profile_key(&mut profile, "url", "ftp://nas".into()).is_err());
        assert!(set_profile_key(&mut profile, "colour", "red".into()).is_err());
        assert_eq!(profile.probe_mode, None);
    }

    #[test]
    fn redacted_view_masks_password() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                quickconnect_id: Some("abc123".into()),
                password: Some("hunter2".into()),
                ..Profile::default()
            },
        );
        let shown = format_config_redacted(&cfg);
        assert!(shown.contains("quickconnect_id = \"abc123\""));
        assert!(shown.contains("password = \"****\""));
        assert!(!shown.contains("hunter2"));
    }
}
