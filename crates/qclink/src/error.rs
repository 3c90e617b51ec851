//! CLI error types with miette diagnostics.
//!
//! Maps core, auth, command and config failures into user-facing errors
//! with actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use qclink_config::ConfigError;
use qclink_core::{AuthError, CommandError, CoreError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Discovery / connectivity ─────────────────────────────────────

    #[error("QuickConnect could not resolve the server")]
    #[diagnostic(
        code(qclink::discovery_failed),
        help(
            "Broker replies, in the order tried:\n{details}\n\
             Check the QuickConnect ID and that QuickConnect is enabled on the appliance."
        )
    )]
    Discovery { details: String },

    #[error("QuickConnect returned no usable address for '{registration_id}'")]
    #[diagnostic(
        code(qclink::no_candidates),
        help("Enable QuickConnect relay or port forwarding on the appliance, or use --url.")
    )]
    NoCandidates { registration_id: String },

    #[error("No candidate endpoint answered")]
    #[diagnostic(
        code(qclink::unreachable),
        help(
            "Per-endpoint results, best path first:\n{details}\n\
             Try --probe-mode sequential, a longer --timeout, or --url for a known address."
        )
    )]
    Unreachable { details: String },

    #[error("Could not reach the appliance")]
    #[diagnostic(
        code(qclink::connection_failed),
        help("{reason}\nCheck that the appliance is running and reachable.")
    )]
    ConnectionFailed { reason: String },

    #[error("Operation timed out after {seconds}s")]
    #[diagnostic(
        code(qclink::timeout),
        help("Increase the timeout with --timeout or check appliance responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────

    #[error("{reason}")]
    #[diagnostic(
        code(qclink::auth_failed),
        help(
            "Verify the account name and password.\n\
             Run: qclink config set-password"
        )
    )]
    AuthFailed { reason: String },

    #[error("Two-factor authentication is required for this account")]
    #[diagnostic(
        code(qclink::two_factor_required),
        help(
            "qclink cannot answer a one-time code. Use an account without 2-step \
             verification, or sign in through the DSM web interface."
        )
    )]
    TwoFactorRequired,

    #[error("Download Station is not available on this appliance")]
    #[diagnostic(
        code(qclink::service_unavailable),
        help("Install or start Download Station from the DSM Package Center.")
    )]
    ServiceUnavailable,

    #[error("Session expired")]
    #[diagnostic(code(qclink::session_expired), help("Run: qclink login"))]
    SessionExpired,

    #[error("Not logged in")]
    #[diagnostic(code(qclink::not_logged_in), help("Run: qclink login"))]
    NotLoggedIn,

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(qclink::no_credentials),
        help(
            "Set a username with: qclink config set username <name>\n\
             Or set QCLINK_USERNAME / QCLINK_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Appliance replies ────────────────────────────────────────────

    #[error("Download Station rejected the request (code {code})")]
    #[diagnostic(code(qclink::provider_error))]
    Provider { code: i64 },

    #[error("Unexpected reply from the appliance")]
    #[diagnostic(code(qclink::malformed_response), help("{reason}"))]
    MalformedResponse { reason: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(qclink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(qclink::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: qclink config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No appliance configured for profile '{profile}'")]
    #[diagnostic(
        code(qclink::no_target),
        help(
            "Pass --id <QuickConnect ID> or --url <address>,\n\
             or create a profile with: qclink config init"
        )
    )]
    NoTarget { profile: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(qclink::config))]
    Config { message: String },

    #[error("Session file error: {message}")]
    #[diagnostic(
        code(qclink::session_store),
        help("Remove the session file and run: qclink login")
    )]
    Store { message: String },

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(qclink::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Discovery { .. }
            | Self::NoCandidates { .. }
            | Self::Unreachable { .. }
            | Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. }
            | Self::TwoFactorRequired
            | Self::SessionExpired
            | Self::NotLoggedIn
            | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::ProfileNotFound { .. }
            | Self::NoTarget { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Domain errors → CliError ─────────────────────────────────────────

impl From<AuthError> for CliError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TwoFactorRequired => Self::TwoFactorRequired,
            AuthError::ServiceUnavailable => Self::ServiceUnavailable,
            AuthError::SessionExpired => Self::SessionExpired,
            AuthError::Unreachable { reason } => Self::ConnectionFailed { reason },
            AuthError::MalformedResponse { reason } => Self::MalformedResponse { reason },
            other @ (AuthError::InvalidCredentials
            | AuthError::AccountDisabled
            | AuthError::PermissionDenied
            | AuthError::Unknown(_)) => Self::AuthFailed {
                reason: other.to_string(),
            },
        }
    }
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::SessionExpired => Self::SessionExpired,
            CommandError::ProviderError(code) => Self::Provider { code },
            CommandError::Unreachable { reason } => Self::ConnectionFailed { reason },
            CommandError::MalformedResponse { reason } => Self::MalformedResponse { reason },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Discovery(e) => Self::Discovery {
                details: e.to_string(),
            },
            CoreError::NoCandidates { registration_id } => Self::NoCandidates { registration_id },
            CoreError::Probe(e) => Self::Unreachable {
                details: e.to_string(),
            },
            CoreError::Auth(e) => e.into(),
            CoreError::Command(e) => e.into(),
            CoreError::Store(e) => Self::Store {
                message: e.to_string(),
            },
            CoreError::Api(e) => Self::ConnectionFailed {
                reason: e.to_string(),
            },
            CoreError::Config { message } => Self::Config { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::NoTarget { profile } => Self::NoTarget { profile },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}
