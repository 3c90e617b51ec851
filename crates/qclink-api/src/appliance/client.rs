// DSM Web API HTTP client
//
// Wraps `reqwest::Client` with `/webapi/*.cgi` URL construction and
// envelope unwrapping. Endpoint groups (auth, info, tasks) are inherent
// methods in sibling modules so this file stays about transport mechanics.
// The client is stateless: session ids are passed in per call.

use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::appliance::models::Envelope;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw HTTP client for one DSM endpoint.
#[derive(Debug, Clone)]
pub struct ApplianceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApplianceClient {
    /// Create a client from a `TransportConfig`. `base_url` is the
    /// appliance root, e.g. `https://192.168.1.20:5001`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self::with_client(transport.build_client()?, base_url))
    }

    /// Create a client around a pre-built `reqwest::Client`. Cloning a
    /// `reqwest::Client` shares its connection pool.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/webapi/{cgi}`
    pub(crate) fn webapi_url(&self, cgi: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/webapi/{cgi}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET with query parameters and unwrap the envelope.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        debug!("GET {}", redact(&url));
        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(Error::Transport)?;
        Self::parse_envelope(resp).await
    }

    /// Send a POST with query parameters and a form body, unwrapping the
    /// envelope.
    pub(crate) async fn post_form<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<T, Error> {
        debug!("POST {}", redact(&url));
        let resp = self
            .http
            .post(url)
            .query(query)
            .form(form)
            .send()
            .await
            .map_err(Error::Transport)?;
        Self::parse_envelope(resp).await
    }

    /// Parse the `{success, data, error}` envelope, returning `data` on
    /// success or [`Error::Api`] carrying the provider code.
    async fn parse_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        trace!(len = body.len(), "received envelope");

        let envelope: Envelope =
            serde_json::from_str(&body).map_err(|e| Error::deserialization(&e, &body))?;

        if !envelope.success {
            let code = envelope.error.map_or(-1, |e| e.code);
            return Err(Error::Api { code });
        }

        let data = envelope.data.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(data).map_err(|e| Error::deserialization(&e, &body))
    }
}

/// Strip the query string so credentials and session ids never hit the log.
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}
