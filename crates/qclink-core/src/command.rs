// ── Command execution ──
//
// Typed Download Station operations issued against an authenticated
// session. A session-invalid reply expires the session before the error
// is returned; a session that is already invalid is refused locally and
// its stale token is never sent.

use std::time::Duration;

use secrecy::SecretString;
use tracing::{debug, warn};

use qclink_api::ApplianceClient;
use qclink_api::transport::bounded;

use crate::error::CommandError;
use crate::model::{DeleteOutcome, DownloadTask, sort_for_display};
use crate::session::{Session, SessionManager};

/// An operation against the appliance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List every task, sorted for display.
    ListTasks,
    /// Submit a download by URI (magnet, http, ftp...).
    CreateTask { uri: String },
    DeleteTasks { ids: Vec<String> },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::ListTasks => "list_tasks",
            Self::CreateTask { .. } => "create_task",
            Self::DeleteTasks { .. } => "delete_tasks",
        }
    }
}

/// Successful command result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    Tasks(Vec<DownloadTask>),
    Created,
    Deleted(Vec<DeleteOutcome>),
}

/// Issues commands with a session's token attached.
#[derive(Debug, Clone)]
pub struct CommandClient {
    http: reqwest::Client,
    sessions: SessionManager,
    timeout: Duration,
}

impl CommandClient {
    pub fn new(http: reqwest::Client, sessions: SessionManager, timeout: Duration) -> Self {
        Self {
            http,
            sessions,
            timeout,
        }
    }

    /// Run `command` with `session`'s token.
    ///
    /// Returns [`CommandError::SessionExpired`] without touching the
    /// network if the session is no longer valid. When the appliance
    /// reports the session as invalid, `session` is expired first.
    pub async fn execute(
        &self,
        session: &mut Session,
        command: Command,
    ) -> Result<CommandOutput, CommandError> {
        let outcome = match session.token().filter(|_| session.is_valid()) {
            Some(token) => {
                debug!(command = command.name(), endpoint = %session.endpoint(), "executing");
                let client = ApplianceClient::with_client(self.http.clone(), session.endpoint().clone());
                self.dispatch(&client, token, command).await
            }
            None => {
                debug!(state = %session.state(), "refusing command on invalid session");
                return Err(CommandError::SessionExpired);
            }
        };

        if let Err(CommandError::SessionExpired) = &outcome {
            warn!(endpoint = %session.endpoint(), "appliance rejected session");
            self.sessions.invalidate(session);
        }
        outcome
    }

    async fn dispatch(
        &self,
        client: &ApplianceClient,
        token: &SecretString,
        command: Command,
    ) -> Result<CommandOutput, CommandError> {
        let output = match command {
            Command::ListTasks => {
                let list = bounded(self.timeout, client.list_tasks(token)).await?;
                let mut tasks: Vec<DownloadTask> =
                    list.tasks.into_iter().map(DownloadTask::from).collect();
                sort_for_display(&mut tasks);
                CommandOutput::Tasks(tasks)
            }
            Command::CreateTask { uri } => {
                bounded(self.timeout, client.create_task(token, &uri)).await?;
                CommandOutput::Created
            }
            Command::DeleteTasks { ids } => {
                if ids.is_empty() {
                    return Ok(CommandOutput::Deleted(Vec::new()));
                }
                let results = bounded(self.timeout, client.delete_tasks(token, &ids)).await?;
                CommandOutput::Deleted(results.into_iter().map(DeleteOutcome::from).collect())
            }
        };
        Ok(output)
    }
}
