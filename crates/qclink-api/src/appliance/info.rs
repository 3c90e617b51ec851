// DSM self-description endpoint, used as a liveness probe.

use tracing::debug;

use crate::appliance::client::ApplianceClient;
use crate::appliance::models::{Envelope, InfoReply};
use crate::error::Error;

/// API whose presence in the info reply marks a DSM Web API.
const MARKER_API: &str = "SYNO.API.Auth";

impl ApplianceClient {
    /// Ask the endpoint to describe its authentication API.
    ///
    /// `GET /webapi/query.cgi?api=SYNO.API.Info&version=1&method=query&query=SYNO.API.Auth`
    ///
    /// Unlike the other calls this never fails on an unexpected body: the
    /// caller gets the final URL (after redirects) plus whether the body
    /// was recognized, and decides for itself.
    pub async fn query_info(&self) -> Result<InfoReply, Error> {
        let url = self.webapi_url("query.cgi")?;
        debug!(url = %url, "querying API info");

        let resp = self
            .http()
            .get(url)
            .query(&[
                ("api", "SYNO.API.Info"),
                ("version", "1"),
                ("method", "query"),
                ("query", MARKER_API),
            ])
            .send()
            .await
            .map_err(Error::Transport)?;

        let final_url = resp.url().clone();
        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        let recognized = status.is_success() && is_info_marker(&body);
        Ok(InfoReply {
            final_url,
            recognized,
        })
    }
}

fn is_info_marker(body: &str) -> bool {
    let Ok(envelope) = serde_json::from_str::<Envelope>(body) else {
        return false;
    };
    envelope.success
        && envelope
            .data
            .as_ref()
            .and_then(|d| d.get(MARKER_API))
            .is_some()
}

#[cfg(test)]
mod tests {
    use super::is_info_marker;

    #[test]
    fn marker_requires_auth_api_entry() {
        assert!(is_info_marker(
            r#"{"success":true,"data":{"SYNO.API.Auth":{"path":"entry.cgi","maxVersion":7}}}"#
        ));
        assert!(!is_info_marker(r#"{"success":true,"data":{}}"#));
        assert!(!is_info_marker(r#"{"success":false,"error":{"code":102}}"#));
        assert!(!is_info_marker("<html>router login</html>"));
    }
}
