//! Download Station task handlers.

use bytesize::ByteSize;
use owo_colors::OwoColorize;
use tabled::Tabled;

use qclink_core::{
    Command as CoreCommand, CommandClient, CommandError, CommandOutput, Connector, DeleteOutcome,
    DownloadTask, Session, TaskStatus,
};

use crate::cli::{GlobalOpts, TasksArgs, TasksCommand};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Speed")]
    speed: String,
}

fn status_label(task: &DownloadTask, color: bool) -> String {
    let label = if task.status == TaskStatus::Unknown {
        task.raw_status.clone()
    } else {
        task.status.to_string()
    };
    if !color {
        return label;
    }
    match task.status {
        TaskStatus::Downloading | TaskStatus::Seeding => label.green().to_string(),
        TaskStatus::Waiting | TaskStatus::Paused => label.yellow().to_string(),
        TaskStatus::Finished => label.blue().to_string(),
        TaskStatus::Error => label.red().to_string(),
        _ => label,
    }
}

fn task_row(task: &DownloadTask, color: bool) -> TaskRow {
    TaskRow {
        id: task.id.clone(),
        title: task.title.clone(),
        status: status_label(task, color),
        progress: format!("{}%", task.progress_percent()),
        size: ByteSize(task.size).to_string(),
        speed: if task.download_speed > 0 {
            format!("{}/s", ByteSize(task.download_speed))
        } else {
            String::new()
        },
    }
}

#[derive(Tabled)]
struct DeleteRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Result")]
    result: String,
}

impl From<&DeleteOutcome> for DeleteRow {
    fn from(d: &DeleteOutcome) -> Self {
        Self {
            id: d.id.clone(),
            result: d
                .error
                .map_or_else(|| "deleted".into(), |code| format!("error {code}")),
        }
    }
}

// ── Session plumbing ────────────────────────────────────────────────

/// Run one command on the stored session. A session-invalid reply removes
/// the token from the session file; the user logs in again explicitly.
async fn run(
    commands: &CommandClient,
    session: &mut Session,
    command: CoreCommand,
) -> Result<CommandOutput, CliError> {
    match commands.execute(session, command).await {
        Err(CommandError::SessionExpired) => {
            session.save(&util::session_store(), None)?;
            Err(CliError::SessionExpired)
        }
        other => Ok(other?),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: TasksArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut session = util::stored_session(&util::session_store())?;
    let resolved = config::resolve(global)?;
    let connector = Connector::new(resolved.connect)?;
    let commands = connector.commands();

    match args.command {
        TasksCommand::List => {
            let CommandOutput::Tasks(tasks) = run(commands, &mut session, CoreCommand::ListTasks).await?
            else {
                return Err(unexpected("task list"));
            };
            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &tasks,
                |t| task_row(t, color),
                |t| t.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TasksCommand::Add { uri } => {
            let uri = uri.trim().to_owned();
            if uri.is_empty() {
                return Err(CliError::Validation {
                    field: "uri".into(),
                    reason: "cannot be empty".into(),
                });
            }
            run(commands, &mut session, CoreCommand::CreateTask { uri }).await?;
            if !global.quiet {
                eprintln!("✓ Task submitted");
            }
            Ok(())
        }

        TasksCommand::Delete { ids } => {
            let prompt = if ids.len() == 1 {
                format!("Delete task {}?", ids[0])
            } else {
                format!("Delete {} tasks?", ids.len())
            };
            if !util::confirm(&prompt, global.yes)? {
                return Ok(());
            }
            let CommandOutput::Deleted(outcomes) =
                run(commands, &mut session, CoreCommand::DeleteTasks { ids }).await?
            else {
                return Err(unexpected("delete results"));
            };
            let out = output::render_list(
                &global.output,
                &outcomes,
                |d| DeleteRow::from(d),
                |d| d.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

fn unexpected(wanted: &str) -> CliError {
    CliError::MalformedResponse {
        reason: format!("expected {wanted} from Download Station"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn task(status: TaskStatus, raw: &str) -> DownloadTask {
        DownloadTask {
            id: "dbid_1".into(),
            title: "debian.iso".into(),
            status,
            raw_status: raw.into(),
            kind: Some("bt".into()),
            size: 2048,
            downloaded: 1024,
            uploaded: 0,
            download_speed: 0,
            upload_speed: 0,
            destination: None,
            uri: None,
            created_at: None,
        }
    }

    #[test]
    fn row_shows_progress_and_size() {
        let row = task_row(&task(TaskStatus::Downloading, "downloading"), false);
        assert_eq!(row.status, "downloading");
        assert_eq!(row.progress, "50%");
        assert_eq!(row.size, ByteSize(2048).to_string());
        assert!(row.speed.is_empty());
    }

    #[test]
    fn unknown_status_shows_raw_value() {
        let row = task_row(&task(TaskStatus::Unknown, "quarantined"), false);
        assert_eq!(row.status, "quarantined");
    }

    #[test]
    fn delete_row_reports_per_id_errors() {
        let ok = DeleteRow::from(&DeleteOutcome {
            id: "dbid_1".into(),
            error: None,
        });
        let failed = DeleteRow::from(&DeleteOutcome {
            id: "dbid_2".into(),
            error: Some(544),
        });
        assert_eq!(ok.result, "deleted");
        assert_eq!(failed.result, "error 544");
    }
}
