//! CLI configuration: thin wrapper around `qclink_config` shared types.
//!
//! Re-exports the shared types and layers `GlobalOpts` flag overrides
//! (--id, --url, --username, --insecure, ...) on top of the active profile.

use qclink_core::{ConnectConfig, ProbeMode, Scheme};

use crate::cli::{GlobalOpts, ProbeModeArg, SchemeArg};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use qclink_config::{
    Config, FileCredentialStore, Profile, Target, config_path, load_config_or_default,
    save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

impl From<ProbeModeArg> for ProbeMode {
    fn from(arg: ProbeModeArg) -> Self {
        match arg {
            ProbeModeArg::Sequential => Self::Sequential,
            ProbeModeArg::Concurrent => Self::Concurrent,
        }
    }
}

impl From<SchemeArg> for Scheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Https => Self::Https,
            SchemeArg::Http => Self::Http,
        }
    }
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Name list for "profile not found" diagnostics.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<_> = config.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

/// The active profile with flag overrides applied, plus the config the
/// core layer runs with.
#[derive(Debug)]
pub struct Resolved {
    pub profile_name: String,
    pub profile: Profile,
    pub connect: ConnectConfig,
    pub timeout_secs: u64,
}

impl Resolved {
    pub fn target(&self) -> Result<Target, CliError> {
        Ok(self.profile.target(&self.profile_name)?)
    }
}

/// Load config, select the profile and apply CLI overrides.
///
/// An explicitly named profile must exist. Without one, a missing default
/// profile is fine as long as flags supply what the command needs.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(p) => p.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        None => Profile::default(),
    };
    apply_overrides(&mut profile, global);

    let connect = qclink_config::profile_to_connect_config(&profile, &cfg.defaults)?;
    let timeout_secs = profile.timeout.unwrap_or(cfg.defaults.timeout);

    Ok(Resolved {
        profile_name,
        profile,
        connect,
        timeout_secs,
    })
}

fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref id) = global.quickconnect_id {
        profile.quickconnect_id = Some(id.clone());
        profile.url = None;
    }
    if let Some(ref url) = global.url {
        profile.url = Some(url.clone());
    }
    if let Some(ref user) = global.username {
        profile.username = Some(user.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(secs) = global.timeout {
        profile.timeout = Some(secs);
    }
    if let Some(mode) = global.probe_mode {
        profile.probe_mode = Some(mode.into());
    }
    if let Some(scheme) = global.scheme {
        profile.scheme = Some(scheme.into());
    }
}
