// DSM Web API response shapes
//
// Every endpoint answers with the same envelope:
//   {"success": true,  "data": {...}}
//   {"success": false, "error": {"code": N}}

use serde::Deserialize;

/// Provider code for an invalid or expired session id.
pub const CODE_SESSION_INVALID: i64 = 105;

/// Raw envelope. `data` is kept loosely typed until success is known.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<EnvelopeError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnvelopeError {
    pub code: i64,
}

/// `data` of a successful `SYNO.API.Auth` login.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginData {
    #[serde(default)]
    pub sid: Option<String>,
}

/// Result of querying `SYNO.API.Info` on a candidate endpoint.
#[derive(Debug, Clone)]
pub struct InfoReply {
    /// URL the request ended up at after following redirects.
    pub final_url: url::Url,
    /// Whether the body was a successful API-info reply listing the
    /// authentication API.
    pub recognized: bool,
}

// ── Download Station ────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct TaskList {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub additional: Option<TaskAdditional>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskAdditional {
    #[serde(default)]
    pub transfer: Option<TaskTransfer>,
    #[serde(default)]
    pub detail: Option<TaskDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskTransfer {
    #[serde(default)]
    pub size_downloaded: u64,
    #[serde(default)]
    pub size_uploaded: u64,
    #[serde(default)]
    pub speed_download: u64,
    #[serde(default)]
    pub speed_upload: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskDetail {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    /// Seconds since the Unix epoch.
    #[serde(default)]
    pub create_time: Option<i64>,
}

/// Per-id outcome of a delete request. `error == 0` means deleted.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskActionResult {
    pub id: String,
    #[serde(default)]
    pub error: i64,
}
