use thiserror::Error;

/// Top-level error type for the `qclink-api` crate.
///
/// Covers every failure mode of a single HTTP exchange with either the
/// QuickConnect broker or a DSM appliance. Aggregated discovery failures
/// have their own type, [`DiscoveryError`](crate::broker::DiscoveryError).
/// `qclink-core` maps these into the semantic auth / command taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request did not complete within its time bound. The in-flight
    /// request has already been dropped when this is returned.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// TLS handshake, certificate, or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-2xx HTTP status.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    // ── DSM Web API ─────────────────────────────────────────────────
    /// `{"success": false, "error": {"code": N}}` from the appliance.
    #[error("DSM API error code {code}")]
    Api { code: i64 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the failure happened before a well-formed
    /// response was received (bad URL, connect, DNS, TLS, timeout, bad status).
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::InvalidUrl(_)
                | Self::Timeout { .. }
                | Self::Tls(_)
                | Self::HttpStatus { .. }
        )
    }

    /// The provider error code, if the appliance answered with one.
    pub fn api_code(&self) -> Option<i64> {
        match self {
            Self::Api { code } => Some(*code),
            _ => None,
        }
    }

    /// Build a [`Deserialization`](Self::Deserialization) error with a
    /// short body preview in the message.
    pub(crate) fn deserialization(err: &serde_json::Error, body: &str) -> Self {
        let preview: String = body.chars().take(200).collect();
        Self::Deserialization {
            message: format!("{err} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    }
}
