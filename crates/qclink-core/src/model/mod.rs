// ── Domain model ──

pub mod task;

pub use task::{DeleteOutcome, DownloadTask, TaskStatus, sort_for_display};
