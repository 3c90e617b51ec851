// ── Connector ──
//
// Wires the stages together: registration id -> broker -> ranked
// candidates -> live endpoint -> session. Every stage shares one
// `reqwest::Client` (and so one connection pool). Nothing here retries;
// a failed stage is reported and the caller decides whether to start over.

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use qclink_api::{BrokerClient, ServerDescriptor};

use crate::candidate::{Candidate, RankPolicy, rank};
use crate::command::CommandClient;
use crate::config::{ConnectConfig, Scheme};
use crate::error::CoreError;
use crate::probe::ConnectivityProber;
use crate::session::{Session, SessionManager};

/// Result of resolving a registration id, before any probing.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub registration_id: String,
    pub descriptor: ServerDescriptor,
    pub candidates: Vec<Candidate>,
}

/// A live endpoint with an authenticated session on it.
#[derive(Debug)]
pub struct Connection {
    pub candidate: Candidate,
    pub session: Session,
}

/// End-to-end discovery, failover and login.
#[derive(Debug)]
pub struct Connector {
    config: ConnectConfig,
    broker: BrokerClient,
    prober: ConnectivityProber,
    sessions: SessionManager,
    commands: CommandClient,
}

impl Connector {
    pub fn new(config: ConnectConfig) -> Result<Self, CoreError> {
        let http = config.transport().build_client()?;
        Ok(Self::with_client(http, config))
    }

    /// Build every stage around one pre-built `reqwest::Client`. The
    /// client must follow redirects.
    pub fn with_client(http: reqwest::Client, config: ConnectConfig) -> Self {
        let broker = BrokerClient::with_client(http.clone(), config.discovery.broker_hosts.clone())
            .with_regional_scheme(config.discovery.regional_scheme.clone())
            .with_request_tag(config.discovery.request_tag.clone());
        let prober = ConnectivityProber::with_client(http.clone(), config.probe)
            .with_gateway_domains(vec![config.discovery.broker_domain.clone()]);
        let sessions = SessionManager::with_client(http.clone(), &config);
        let commands = CommandClient::new(http, sessions.clone(), config.command_timeout);

        Self {
            config,
            broker,
            prober,
            sessions,
            commands,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn commands(&self) -> &CommandClient {
        &self.commands
    }

    fn rank_policy(&self) -> RankPolicy {
        RankPolicy {
            scheme: self.config.scheme,
            broker_domain: self.config.discovery.broker_domain.clone(),
        }
    }

    // ── Stages ───────────────────────────────────────────────────────

    /// Resolve `registration_id` and rank its candidates.
    pub async fn discover(&self, registration_id: &str) -> Result<Discovery, CoreError> {
        let descriptor = self.broker.resolve(registration_id).await?;
        let candidates = rank(&descriptor, registration_id, &self.rank_policy());
        debug!(registration_id, count = candidates.len(), "discovery complete");
        Ok(Discovery {
            registration_id: registration_id.to_owned(),
            descriptor,
            candidates,
        })
    }

    /// Discover and probe: the first live endpoint for `registration_id`.
    pub async fn locate(&self, registration_id: &str) -> Result<Candidate, CoreError> {
        self.locate_until(registration_id, CancellationToken::new())
            .await
    }

    /// Like [`locate`](Self::locate), abandoning outstanding probes when
    /// `cancel` fires.
    pub async fn locate_until(
        &self,
        registration_id: &str,
        cancel: CancellationToken,
    ) -> Result<Candidate, CoreError> {
        let discovery = self.discover(registration_id).await?;
        if discovery.candidates.is_empty() {
            return Err(CoreError::NoCandidates {
                registration_id: registration_id.to_owned(),
            });
        }
        Ok(self
            .prober
            .find_live_until(discovery.candidates, cancel)
            .await?)
    }

    /// Locate the appliance and log in.
    pub async fn connect(
        &self,
        registration_id: &str,
        account: &str,
        secret: &SecretString,
    ) -> Result<Connection, CoreError> {
        let candidate = self.locate(registration_id).await?;
        let session = self
            .sessions
            .authenticate(candidate.url(), account, secret)
            .await?;
        info!(registration_id, endpoint = %candidate, "connected");
        Ok(Connection { candidate, session })
    }

    /// Log in to a known endpoint, skipping discovery and probing.
    pub async fn connect_direct(
        &self,
        endpoint: &Url,
        account: &str,
        secret: &SecretString,
    ) -> Result<Session, CoreError> {
        Ok(self
            .sessions
            .authenticate(endpoint, account, secret)
            .await?)
    }
}

/// Parse a user-supplied appliance address (`nas.local`,
/// `http://10.0.0.5`, `https://nas.example.net:8443`). A missing scheme
/// means `http`; a missing port means the scheme's DSM default.
pub fn parse_endpoint(raw: &str) -> Result<Url, CoreError> {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") {
        raw.to_owned()
    } else {
        format!("http://{raw}")
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| CoreError::Config {
        message: format!("invalid appliance URL {raw:?}: {e}"),
    })?;

    let scheme = match url.scheme() {
        "http" => Scheme::Http,
        "https" => Scheme::Https,
        other => {
            return Err(CoreError::Config {
                message: format!("unsupported URL scheme {other:?} (expected http or https)"),
            });
        }
    };

    if !has_explicit_port(&with_scheme) {
        url.set_port(Some(scheme.default_port()))
            .map_err(|()| CoreError::Config {
                message: format!("cannot set a port on {raw:?}"),
            })?;
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// `Url` drops a port equal to the scheme default, so `https://nas:443`
/// must be recognized from the raw text.
fn has_explicit_port(raw: &str) -> bool {
    let rest = raw.split_once("://").map_or(raw, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    authority.rsplit_once(':').is_some_and(|(host, port)| {
        !port.is_empty()
            && port.bytes().all(|b| b.is_ascii_digit())
            && (host.ends_with(']') || !host.contains(':'))
    })
}
