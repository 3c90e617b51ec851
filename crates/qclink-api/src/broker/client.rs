// QuickConnect broker client
//
// Resolves a registration id into a `ServerDescriptor`. Configured broker
// hosts are tried in order; an `errno == 4` reply redirects to the regional
// brokers listed in `sites`, which are tried before moving on. Nothing is
// retried: every host sees at most one request per `resolve` call.

use tracing::{debug, info, warn};
use url::Url;

use crate::broker::models::{
    ERRNO_OK, ERRNO_REDIRECT, ServerDescriptor, ServerInfoRequest, ServerInfoResponse,
};
use crate::error::Error;
use crate::transport::TransportConfig;

/// Primary QuickConnect broker endpoint.
pub const DEFAULT_BROKER_URL: &str = "https://global.quickconnect.to/Serv.php";

/// Request tag asking for the HTTPS DSM portal service.
pub const DEFAULT_REQUEST_TAG: &str = "dsm_portal_https";

/// One broker host that did not produce a descriptor, and why.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{host}: {reason}")]
pub struct HostFailure {
    pub host: String,
    pub reason: String,
}

/// Every broker host failed. Failures are kept in attempt order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", render_failures(.failures))]
pub struct DiscoveryError {
    pub failures: Vec<HostFailure>,
}

fn render_failures(failures: &[HostFailure]) -> String {
    if failures.is_empty() {
        return "no broker hosts configured".into();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// HTTP client for the QuickConnect `Serv.php` endpoint.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    http: reqwest::Client,
    hosts: Vec<Url>,
    regional_scheme: String,
    request_tag: String,
}

impl BrokerClient {
    /// Create a broker client for the given hosts (full `Serv.php` URLs).
    pub fn new(hosts: Vec<Url>, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self::with_client(transport.build_client()?, hosts))
    }

    /// Create a broker client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, hosts: Vec<Url>) -> Self {
        Self {
            http,
            hosts,
            regional_scheme: "https".into(),
            request_tag: DEFAULT_REQUEST_TAG.into(),
        }
    }

    /// Scheme used when building regional broker URLs from `sites`.
    pub fn with_regional_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.regional_scheme = scheme.into();
        self
    }

    /// Service tag sent as the request `id`.
    pub fn with_request_tag(mut self, tag: impl Into<String>) -> Self {
        self.request_tag = tag.into();
        self
    }

    /// Resolve `registration_id` into a server descriptor.
    ///
    /// Never returns a transport error directly: every host-level problem
    /// is recorded in the returned [`DiscoveryError`].
    pub async fn resolve(&self, registration_id: &str) -> Result<ServerDescriptor, DiscoveryError> {
        let mut failures = Vec::new();

        for host in &self.hosts {
            debug!(host = %host, "querying broker");

            let resp = match self.query(host, registration_id).await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(host = %host, error = %e, "broker request failed");
                    failures.push(HostFailure {
                        host: host.to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if resp.errno == ERRNO_OK {
                info!(host = %host, "broker resolved server");
                return Ok(ServerDescriptor::from(&resp));
            }

            failures.push(HostFailure {
                host: host.to_string(),
                reason: describe_errno(&resp),
            });

            if resp.errno == ERRNO_REDIRECT && !resp.sites.is_empty() {
                debug!(sites = ?resp.sites, "following regional redirect");
                if let Some(descriptor) = self
                    .try_regional(&resp.sites, registration_id, &mut failures)
                    .await
                {
                    return Ok(descriptor);
                }
            }
        }

        Err(DiscoveryError { failures })
    }

    /// Try each regional site once; the first `errno == 0` wins.
    async fn try_regional(
        &self,
        sites: &[String],
        registration_id: &str,
        failures: &mut Vec<HostFailure>,
    ) -> Option<ServerDescriptor> {
        for site in sites {
            let url = match self.regional_url(site) {
                Ok(url) => url,
                Err(e) => {
                    failures.push(HostFailure {
                        host: site.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            debug!(host = %url, "querying regional broker");

            match self.query(&url, registration_id).await {
                Ok(resp) if resp.errno == ERRNO_OK => {
                    info!(host = %url, "regional broker resolved server");
                    return Some(ServerDescriptor::from(&resp));
                }
                Ok(resp) => failures.push(HostFailure {
                    host: url.to_string(),
                    reason: describe_errno(&resp),
                }),
                Err(e) => {
                    warn!(host = %url, error = %e, "regional broker request failed");
                    failures.push(HostFailure {
                        host: url.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        None
    }

    fn regional_url(&self, site: &str) -> Result<Url, Error> {
        Ok(Url::parse(&format!(
            "{}://{}/Serv.php",
            self.regional_scheme,
            site.trim_end_matches('/')
        ))?)
    }

    async fn query(&self, url: &Url, registration_id: &str) -> Result<ServerInfoResponse, Error> {
        let body = ServerInfoRequest::new(&self.request_tag, registration_id);

        let resp = self
            .http
            .post(url.clone())
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let text = resp.text().await.map_err(Error::Transport)?;
        serde_json::from_str(&text).map_err(|e| Error::deserialization(&e, &text))
    }
}

fn describe_errno(resp: &ServerInfoResponse) -> String {
    let mut msg = format!("errno {}", resp.errno);
    if let Some(info) = resp.errinfo.as_deref().filter(|s| !s.is_empty()) {
        msg.push_str(" - ");
        msg.push_str(info);
    }
    if resp.errno == ERRNO_REDIRECT && !resp.sites.is_empty() {
        msg.push_str(&format!(" (redirected to {})", resp.sites.join(", ")));
    }
    msg
}
