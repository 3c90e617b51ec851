// ── Download task domain types ──

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Download Station task status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[non_exhaustive]
pub enum TaskStatus {
    Downloading,
    Waiting,
    Paused,
    Finishing,
    Finished,
    Seeding,
    Error,
    HashChecking,
    Extracting,
    FilehostingWaiting,
    Unknown,
}

impl TaskStatus {
    /// Position in the task listing. Active work first, unranked
    /// statuses last.
    pub fn display_rank(self) -> u8 {
        match self {
            Self::Downloading => 0,
            Self::Waiting => 1,
            Self::Paused => 2,
            Self::Finishing => 3,
            Self::Finished => 4,
            Self::Seeding => 5,
            Self::Error => 6,
            _ => 99,
        }
    }
}

/// The canonical download task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadTask {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    /// Provider status string, kept for statuses we don't model.
    pub raw_status: String,
    pub kind: Option<String>,
    pub size: u64,
    pub downloaded: u64,
    pub uploaded: u64,
    pub download_speed: u64,
    pub upload_speed: u64,
    pub destination: Option<String>,
    pub uri: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl DownloadTask {
    /// Whole-percent progress, rounded. Zero when the size is unknown.
    pub fn progress_percent(&self) -> u8 {
        if self.size == 0 {
            return 0;
        }
        let pct = (u128::from(self.downloaded) * 100 + u128::from(self.size) / 2) / u128::from(self.size);
        u8::try_from(pct.min(100)).unwrap_or(100)
    }
}

/// Stable sort by status rank; ties keep provider order.
pub fn sort_for_display(tasks: &mut [DownloadTask]) {
    tasks.sort_by_key(|task| task.status.display_rank());
}

/// Per-id result of a delete command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub id: String,
    /// Provider code when this id could not be deleted.
    pub error: Option<i64>,
}

impl DeleteOutcome {
    pub fn is_deleted(&self) -> bool {
        self.error.is_none()
    }
}
