//! Shared configuration for qclink.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! translation to `qclink_core::ConnectConfig`, and the file-backed
//! [`FileCredentialStore`] for session state. The CLI layers flag
//! overrides on top.

mod session_file;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use qclink_core::{ConnectConfig, ProbeMode, Scheme, TlsVerification, parse_endpoint};

pub use session_file::FileCredentialStore;

/// Keyring service name.
pub const KEYRING_SERVICE: &str = "qclink";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' has neither a quickconnect_id nor a url")]
    NoTarget { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named appliance profiles.
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

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Accept any TLS certificate. On by default: LAN candidates are bare
    /// IPs that no appliance certificate matches.
    #[serde(default = "default_insecure")]
    pub insecure: bool,

    /// Command timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Per-candidate probe timeout, seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: u64,

    #[serde(default)]
    pub probe_mode: ProbeMode,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: default_insecure(),
            timeout: default_timeout(),
            probe_timeout: default_probe_timeout(),
            probe_mode: ProbeMode::default(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_insecure() -> bool {
    true
}
fn default_timeout() -> u64 {
    30
}
fn default_probe_timeout() -> u64 {
    5
}

/// A named appliance profile. Exactly one of `quickconnect_id` or `url`
/// selects how the appliance is found; `url` wins when both are set.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// QuickConnect registration id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quickconnect_id: Option<String>,

    /// Direct appliance address, skipping discovery (e.g. "http://10.0.0.5:5000").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Scheme for derived candidates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<Scheme>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_mode: Option<ProbeMode>,

    /// Per-candidate probe timeout, seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_timeout: Option<u64>,

    /// Broker `Serv.php` URLs, tried in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_hosts: Option<Vec<String>>,

    /// Path to custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override command timeout, seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// How a profile locates its appliance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    QuickConnect(String),
    Direct(Url),
}

impl Profile {
    pub fn target(&self, profile_name: &str) -> Result<Target, ConfigError> {
        if let Some(raw) = self.url.as_deref().filter(|s| !s.trim().is_empty()) {
            let url = parse_endpoint(raw).map_err(|e| ConfigError::Validation {
                field: "url".into(),
                reason: e.to_string(),
            })?;
            return Ok(Target::Direct(url));
        }
        self.quickconnect_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| Target::QuickConnect(id.to_owned()))
            .ok_or_else(|| ConfigError::NoTarget {
                profile: profile_name.into(),
            })
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "qclink", "qclink")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    for part in parts {
        p.push(part);
    }
    p
}

/// Resolve the config file path via XDG / platform conventions.
/// `QCLINK_CONFIG` overrides it.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os("QCLINK_CONFIG") {
        return PathBuf::from(path);
    }
    project_dirs().map_or_else(
        || home_fallback(&[".config", "qclink", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where persisted session state lives. `QCLINK_SESSION_FILE` overrides it.
pub fn session_path() -> PathBuf {
    if let Some(path) = std::env::var_os("QCLINK_SESSION_FILE") {
        return PathBuf::from(path);
    }
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "qclink", "session.toml"]),
        |dirs| dirs.data_dir().join("session.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` layered as defaults -> file -> `QCLINK_*` env.
/// Nested keys use a double underscore (`QCLINK_DEFAULTS__PROBE_MODE`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("QCLINK_").split("__"));

    Ok(figment.extract()?)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/password"),
    )?)
}

/// Account name: profile, then `QCLINK_USERNAME`.
pub fn resolve_username(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    profile
        .username
        .clone()
        .or_else(|| std::env::var("QCLINK_USERNAME").ok())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// Password: `QCLINK_PASSWORD`, then the system keyring, then plaintext
/// in the profile. The caller prompts when this fails.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Env var
    if let Ok(pw) = std::env::var("QCLINK_PASSWORD") {
        return Ok(SecretString::from(pw));
    }

    // 2. Keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password.expose_secret())?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `ConnectConfig` from a profile and the global defaults.
pub fn profile_to_connect_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ConnectConfig, ConfigError> {
    let mut cfg = ConnectConfig::default();

    if let Some(hosts) = &profile.broker_hosts {
        cfg.discovery.broker_hosts = hosts
            .iter()
            .map(|raw| {
                Url::parse(raw).map_err(|e| ConfigError::Validation {
                    field: "broker_hosts".into(),
                    reason: format!("{raw}: {e}"),
                })
            })
            .collect::<Result<_, _>>()?;
    }

    cfg.scheme = profile.scheme.unwrap_or_default();
    cfg.probe.mode = profile.probe_mode.unwrap_or(defaults.probe_mode);
    cfg.probe.timeout = Duration::from_secs(profile.probe_timeout.unwrap_or(defaults.probe_timeout));
    cfg.probe.deadline = cfg.probe.deadline.max(cfg.probe.timeout);
    cfg.command_timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    cfg.tls = if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(cfg)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
default_profile = "home"

[defaults]
probe_mode = "sequential"

[profiles.home]
quickconnect_id = "abc123"
username = "admin"
scheme = "http"
probe_timeout = 3
broker_hosts = ["https://eu.quickconnect.to/Serv.php"]

[profiles.lan]
url = "10.0.0.5"
insecure = false
"#;

    fn sample() -> Config {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        load_config_from(&path).unwrap()
    }

    #[test]
    fn loads_profiles_and_defaults() {
        let cfg = sample();
        assert_eq!(cfg.default_profile.as_deref(), Some("home"));
        assert_eq!(cfg.defaults.probe_mode, ProbeMode::Sequential);
        assert_eq!(cfg.defaults.timeout, 30);
        assert_eq!(cfg.profiles.len(), 2);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.profiles.is_empty());
        assert!(cfg.defaults.insecure);
    }

    #[test]
    fn targets_resolve() {
        let cfg = sample();
        assert_eq!(
            cfg.profiles["home"].target("home").unwrap(),
            Target::QuickConnect("abc123".into())
        );
        assert_eq!(
            cfg.profiles["lan"].target("lan").unwrap(),
            Target::Direct(Url::parse("http://10.0.0.5:5000/").unwrap())
        );
        assert!(matches!(
            Profile::default().target("empty"),
            Err(ConfigError::NoTarget { .. })
        ));
    }

    #[test]
    fn profile_translates_to_connect_config() {
        let cfg = sample();
        let home = profile_to_connect_config(&cfg.profiles["home"], &cfg.defaults).unwrap();
        assert_eq!(home.scheme, Scheme::Http);
        assert_eq!(home.probe.mode, ProbeMode::Sequential);
        assert_eq!(home.probe.timeout, Duration::from_secs(3));
        assert_eq!(home.discovery.broker_hosts.len(), 1);
        assert_eq!(home.tls, TlsVerification::DangerAcceptInvalid);

        let lan = profile_to_connect_config(&cfg.profiles["lan"], &cfg.defaults).unwrap();
        assert_eq!(lan.tls, TlsVerification::SystemDefaults);
        assert_eq!(lan.scheme, Scheme::Https);
    }

    #[test]
    fn bad_broker_host_is_a_validation_error() {
        let profile = Profile {
            broker_hosts: Some(vec!["not a url".into()]),
            ..Profile::default()
        };
        let err = profile_to_connect_config(&profile, &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "broker_hosts"));
    }

    #[test]
    fn saved_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = sample();
        save_config_to(&cfg, &path).unwrap();

        let reloaded = load_config_from(&path).unwrap();
        assert_eq!(reloaded.profiles["home"].quickconnect_id.as_deref(), Some("abc123"));
        assert!(!std::fs::read_to_string(&path).unwrap().contains("password"));
    }
}
