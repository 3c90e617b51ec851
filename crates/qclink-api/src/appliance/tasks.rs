// Download Station task endpoints
//
// `SYNO.DownloadStation.Task` list/create/delete. All calls carry the
// session id as the `_sid` query parameter.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::appliance::client::ApplianceClient;
use crate::appliance::models::{TaskActionResult, TaskList};
use crate::error::Error;

const TASK_CGI: &str = "DownloadStation/task.cgi";
const TASK_API: &str = "SYNO.DownloadStation.Task";

impl ApplianceClient {
    /// List download tasks with transfer and detail information.
    ///
    /// `GET /webapi/DownloadStation/task.cgi?method=list&additional=transfer,detail`
    pub async fn list_tasks(&self, sid: &SecretString) -> Result<TaskList, Error> {
        let url = self.webapi_url(TASK_CGI)?;
        debug!("listing tasks");
        self.get(
            url,
            &[
                ("api", TASK_API),
                ("version", "1"),
                ("method", "list"),
                ("additional", "transfer,detail"),
                ("_sid", sid.expose_secret()),
            ],
        )
        .await
    }

    /// Submit a new task for `uri` (magnet, http, ftp...).
    ///
    /// `POST /webapi/DownloadStation/task.cgi` with `method=create`
    pub async fn create_task(&self, sid: &SecretString, uri: &str) -> Result<(), Error> {
        let url = self.webapi_url(TASK_CGI)?;
        debug!("creating task");
        let _: serde_json::Value = self
            .post_form(
                url,
                &[("_sid", sid.expose_secret())],
                &[
                    ("api", TASK_API),
                    ("version", "3"),
                    ("method", "create"),
                    ("uri", uri),
                ],
            )
            .await?;
        Ok(())
    }

    /// Delete tasks by id without completing unfinished downloads.
    ///
    /// `GET /webapi/DownloadStation/task.cgi?method=delete&id=a,b`
    pub async fn delete_tasks(
        &self,
        sid: &SecretString,
        ids: &[String],
    ) -> Result<Vec<TaskActionResult>, Error> {
        let url = self.webapi_url(TASK_CGI)?;
        let joined = ids.join(",");
        debug!(ids = %joined, "deleting tasks");
        self.get(
            url,
            &[
                ("api", TASK_API),
                ("version", "1"),
                ("method", "delete"),
                ("id", joined.as_str()),
                ("force_complete", "false"),
                ("_sid", sid.expose_secret()),
            ],
        )
        .await
    }
}
