// ── Core error types ──
//
// Semantic errors from qclink-core. Consumers see authentication and
// command failures as closed enums rather than raw provider codes; the
// `From<qclink_api::Error>` impls do the classification.

use thiserror::Error;

use qclink_api::DiscoveryError;
use qclink_api::appliance::CODE_SESSION_INVALID;

use crate::probe::ProbeError;

// ── Provider codes (SYNO.API.Auth) ───────────────────────────────────

const CODE_INVALID_CREDENTIALS: i64 = 400;
const CODE_ACCOUNT_DISABLED: i64 = 401;
const CODE_PERMISSION_DENIED: i64 = 402;
const CODE_TWO_FACTOR_REQUIRED: i64 = 403;
const CODE_SERVICE_UNAVAILABLE: i64 = 404;

/// Why `authenticate` did not produce a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid account name or password")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Permission denied for this account")]
    PermissionDenied,

    /// Terminal: interactive second factors are not supported.
    #[error("Two-factor authentication is required for this account")]
    TwoFactorRequired,

    #[error("Download Station is not installed or not running")]
    ServiceUnavailable,

    #[error("Session expired -- log in again")]
    SessionExpired,

    #[error("Appliance unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("Malformed response: {reason}")]
    MalformedResponse { reason: String },

    #[error("Authentication failed with provider code {0}")]
    Unknown(i64),
}

impl AuthError {
    /// Classify a `SYNO.API.Auth` failure code.
    pub fn from_code(code: i64) -> Self {
        match code {
            CODE_INVALID_CREDENTIALS => Self::InvalidCredentials,
            CODE_ACCOUNT_DISABLED => Self::AccountDisabled,
            CODE_PERMISSION_DENIED => Self::PermissionDenied,
            CODE_TWO_FACTOR_REQUIRED => Self::TwoFactorRequired,
            CODE_SERVICE_UNAVAILABLE => Self::ServiceUnavailable,
            CODE_SESSION_INVALID => Self::SessionExpired,
            other => Self::Unknown(other),
        }
    }
}

impl From<qclink_api::Error> for AuthError {
    fn from(err: qclink_api::Error) -> Self {
        match err {
            qclink_api::Error::Api { code } => Self::from_code(code),
            qclink_api::Error::Deserialization { message, .. } => {
                Self::MalformedResponse { reason: message }
            }
            other if other.is_unreachable() => Self::Unreachable {
                reason: other.to_string(),
            },
            other => Self::MalformedResponse {
                reason: other.to_string(),
            },
        }
    }
}

/// Why a command against an authenticated session failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The appliance rejected the session. The session has been
    /// invalidated and must not be reused.
    #[error("Session expired -- log in again")]
    SessionExpired,

    /// Any other provider failure. The session stays valid.
    #[error("Download Station rejected the request (code {0})")]
    ProviderError(i64),

    /// Transport failure or timeout. Safe to retry.
    #[error("Appliance unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("Malformed response: {reason}")]
    MalformedResponse { reason: String },
}

impl From<qclink_api::Error> for CommandError {
    fn from(err: qclink_api::Error) -> Self {
        match err {
            qclink_api::Error::Api {
                code: CODE_SESSION_INVALID,
            } => Self::SessionExpired,
            qclink_api::Error::Api { code } => Self::ProviderError(code),
            qclink_api::Error::Deserialization { message, .. } => {
                Self::MalformedResponse { reason: message }
            }
            other if other.is_unreachable() => Self::Unreachable {
                reason: other.to_string(),
            },
            other => Self::MalformedResponse {
                reason: other.to_string(),
            },
        }
    }
}

/// Failure reading or writing persisted session state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Credential store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential store is corrupt: {message}")]
    Corrupt { message: String },
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Discovery ────────────────────────────────────────────────────
    #[error("QuickConnect could not resolve the server:\n{0}")]
    Discovery(#[from] DiscoveryError),

    #[error("No reachable server for {registration_id}")]
    NoCandidates { registration_id: String },

    #[error("No candidate endpoint answered:\n{0}")]
    Probe(#[from] ProbeError),

    // ── Session / commands ───────────────────────────────────────────
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Store(#[from] StoreError),

    // ── Setup ────────────────────────────────────────────────────────
    #[error("Client setup failed: {0}")]
    Api(#[from] qclink_api::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },
}
