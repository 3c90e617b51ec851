//! Shared helpers for command handlers.

use std::future::Future;
use std::time::Duration;

use indicatif::ProgressBar;
use secrecy::SecretString;

use qclink_core::{CredentialStore, Session};

use crate::config::{FileCredentialStore, Resolved};
use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// The session file store.
pub fn session_store() -> FileCredentialStore {
    FileCredentialStore::default_location()
}

/// The persisted session, or `NotLoggedIn`.
pub fn stored_session(store: &dyn CredentialStore) -> Result<Session, CliError> {
    Session::load(store)?.ok_or(CliError::NotLoggedIn)
}

/// Password from env, keyring or profile; prompts when none is configured.
pub fn password_for(resolved: &Resolved, from_stdin: bool) -> Result<SecretString, CliError> {
    if from_stdin {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            return Err(CliError::Validation {
                field: "password".into(),
                reason: "stdin was empty".into(),
            });
        }
        return Ok(SecretString::from(trimmed.to_owned()));
    }

    match qclink_config::resolve_password(&resolved.profile, &resolved.profile_name) {
        Ok(secret) => Ok(secret),
        Err(_) => {
            let pass = rpassword::prompt_password("Password: ")?;
            if pass.is_empty() {
                return Err(CliError::NoCredentials {
                    profile: resolved.profile_name.clone(),
                });
            }
            Ok(SecretString::from(pass))
        }
    }
}

/// Account name from flags, profile or `QCLINK_USERNAME`.
pub fn username_for(resolved: &Resolved) -> Result<String, CliError> {
    Ok(qclink_config::resolve_username(
        &resolved.profile,
        &resolved.profile_name,
    )?)
}

/// Stderr spinner; hidden when quiet or not attached to a terminal.
pub fn spinner(message: impl Into<String>, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Run `fut` under the operation-wide timeout.
pub async fn within<T, F>(seconds: u64, fut: F) -> Result<T, CliError>
where
    F: Future<Output = Result<T, CliError>>,
{
    tokio::time::timeout(Duration::from_secs(seconds), fut)
        .await
        .map_err(|_| CliError::Timeout { seconds })?
}

/// Upper bound for a full discovery + login: broker round-trips share the
/// command timeout, probing and login have their own budgets.
pub fn connect_budget(resolved: &Resolved) -> u64 {
    let probe = resolved.connect.probe.deadline.as_secs();
    let auth = resolved.connect.auth_timeout.as_secs();
    resolved.timeout_secs + probe + auth
}
