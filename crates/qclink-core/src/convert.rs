// ── API-to-domain type conversions ──
//
// Bridges raw `qclink_api` task types into `qclink_core::model`. Missing
// optional sections become zeros or `None`; unknown statuses are kept
// as `TaskStatus::Unknown` with the raw string preserved.

use chrono::{DateTime, Utc};

use qclink_api::appliance::{Task, TaskActionResult};

use crate::model::{DeleteOutcome, DownloadTask, TaskStatus};

/// Convert an optional epoch-seconds timestamp to `DateTime<Utc>`.
/// Zero is the provider's "not set".
fn epoch_to_datetime(epoch: Option<i64>) -> Option<DateTime<Utc>> {
    epoch
        .filter(|ts| *ts > 0)
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl From<Task> for DownloadTask {
    fn from(task: Task) -> Self {
        let status = task.status.parse().unwrap_or(TaskStatus::Unknown);
        let additional = task.additional.unwrap_or_default();
        let transfer = additional.transfer.unwrap_or_default();
        let detail = additional.detail.unwrap_or_default();

        Self {
            id: task.id,
            title: task.title,
            status,
            raw_status: task.status,
            kind: non_empty(task.kind),
            size: task.size,
            downloaded: transfer.size_downloaded,
            uploaded: transfer.size_uploaded,
            download_speed: transfer.speed_download,
            upload_speed: transfer.speed_upload,
            destination: non_empty(detail.destination),
            uri: non_empty(detail.uri),
            created_at: epoch_to_datetime(detail.create_time),
        }
    }
}

impl From<TaskActionResult> for DeleteOutcome {
    fn from(result: TaskActionResult) -> Self {
        Self {
            id: result.id,
            error: (result.error != 0).then_some(result.error),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn raw(json: serde_json::Value) -> Task {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn full_task_converts() {
        let task = DownloadTask::from(raw(serde_json::json!({
            "id": "dbid_7",
            "title": "debian.iso",
            "status": "downloading",
            "size": 2000,
            "type": "http",
            "additional": {
                "transfer": { "size_downloaded": 500, "speed_download": 42 },
                "detail": { "destination": "downloads", "uri": "", "create_time": 1_700_000_000 }
            }
        })));

        assert_eq!(task.status, TaskStatus::Downloading);
        assert_eq!(task.downloaded, 500);
        assert_eq!(task.download_speed, 42);
        assert_eq!(task.kind.as_deref(), Some("http"));
        assert_eq!(task.destination.as_deref(), Some("downloads"));
        assert_eq!(task.uri, None);
        assert_eq!(task.created_at.map(|t| t.timestamp()), Some(1_700_000_000));
        assert_eq!(task.progress_percent(), 25);
    }

    #[test]
    fn bare_task_defaults_and_unknown_status() {
        let task = DownloadTask::from(raw(serde_json::json!({
            "id": "dbid_8",
            "status": "something_new"
        })));
        assert_eq!(task.status, TaskStatus::Unknown);
        assert_eq!(task.raw_status, "something_new");
        assert_eq!(task.downloaded, 0);
        assert_eq!(task.created_at, None);
    }

    #[test]
    fn delete_result_zero_means_deleted() {
        let ok = DeleteOutcome::from(TaskActionResult {
            id: "a".into(),
            error: 0,
        });
        let failed = DeleteOutcome::from(TaskActionResult {
            id: "b".into(),
            error: 405,
        });
        assert!(ok.is_deleted());
        assert_eq!(failed.error, Some(405));
    }
}
