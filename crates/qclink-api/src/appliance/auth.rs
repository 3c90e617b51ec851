// DSM authentication
//
// `SYNO.API.Auth` login/logout. The session id is returned to the caller
// as a `SecretString`; this client keeps no session state of its own.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::appliance::client::ApplianceClient;
use crate::appliance::models::LoginData;
use crate::error::Error;

/// Session scope the Download Station endpoints accept.
pub const DOWNLOAD_STATION_SESSION: &str = "DownloadStation";

const AUTH_CGI: &str = "entry.cgi";
const AUTH_API: &str = "SYNO.API.Auth";
const AUTH_VERSION: &str = "7";

impl ApplianceClient {
    /// Log in with account name and password, asking for a session id
    /// scoped to `session`.
    ///
    /// `GET /webapi/entry.cgi?api=SYNO.API.Auth&method=login&format=sid`
    ///
    /// A successful envelope without a `sid` is reported as
    /// [`Error::Deserialization`].
    pub async fn login(
        &self,
        account: &str,
        password: &SecretString,
        session: &str,
    ) -> Result<SecretString, Error> {
        let url = self.webapi_url(AUTH_CGI)?;
        debug!(account, session, "logging in");

        let data: LoginData = self
            .get(
                url,
                &[
                    ("api", AUTH_API),
                    ("version", AUTH_VERSION),
                    ("method", "login"),
                    ("account", account),
                    ("passwd", password.expose_secret()),
                    ("session", session),
                    ("format", "sid"),
                ],
            )
            .await?;

        match data.sid.filter(|sid| !sid.is_empty()) {
            Some(sid) => {
                debug!("login successful");
                Ok(SecretString::from(sid))
            }
            None => Err(Error::Deserialization {
                message: "login succeeded but no sid was returned".into(),
                body: String::new(),
            }),
        }
    }

    /// End the session identified by `sid`.
    ///
    /// `GET /webapi/entry.cgi?api=SYNO.API.Auth&method=logout&_sid=...`
    pub async fn logout(&self, sid: &SecretString, session: &str) -> Result<(), Error> {
        let url = self.webapi_url(AUTH_CGI)?;
        debug!(session, "logging out");

        let _: serde_json::Value = self
            .get(
                url,
                &[
                    ("api", AUTH_API),
                    ("version", AUTH_VERSION),
                    ("method", "logout"),
                    ("session", session),
                    ("_sid", sid.expose_secret()),
                ],
            )
            .await?;

        debug!("logout complete");
        Ok(())
    }
}
