// ── Runtime connection configuration ──
//
// These types describe *how* to find and talk to an appliance. They never
// touch disk: the CLI builds a `ConnectConfig` from its profile and hands
// it in.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use qclink_api::broker::{DEFAULT_BROKER_URL, DEFAULT_REQUEST_TAG};
use qclink_api::transport::{TlsMode, TransportConfig};

/// Domain under which every registration id has a gateway hostname.
pub const DEFAULT_BROKER_DOMAIN: &str = "quickconnect.to";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. Default: LAN candidates are bare IPs that no
    /// certificate will ever match.
    #[default]
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => Self::System,
            TlsVerification::CustomCa(path) => Self::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => Self::DangerAcceptInvalid,
        }
    }
}

/// URL scheme used for derived candidates.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Scheme {
    #[default]
    Https,
    Http,
}

impl Scheme {
    /// DSM's out-of-the-box port for this scheme.
    pub fn default_port(self) -> u16 {
        match self {
            Self::Https => 5001,
            Self::Http => 5000,
        }
    }
}

/// How candidates are probed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProbeMode {
    /// One at a time, in rank order.
    Sequential,
    /// All at once under a shared deadline; the first success cancels the rest.
    #[default]
    Concurrent,
}

/// Broker-side settings.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Full `Serv.php` URLs, tried in order. Regional hosts are only ever
    /// learned from broker replies, never invented.
    pub broker_hosts: Vec<Url>,
    /// Domain used for the broker-direct candidate (`<id>.<domain>`).
    pub broker_domain: String,
    /// Scheme for regional broker URLs.
    pub regional_scheme: String,
    /// Service tag sent as the broker request `id`.
    pub request_tag: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            broker_hosts: Url::parse(DEFAULT_BROKER_URL).into_iter().collect(),
            broker_domain: DEFAULT_BROKER_DOMAIN.into(),
            regional_scheme: "https".into(),
            request_tag: DEFAULT_REQUEST_TAG.into(),
        }
    }
}

/// Probe timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Bound on each individual probe.
    pub timeout: Duration,
    /// Bound on the whole concurrent probe round.
    pub deadline: Duration,
    pub mode: ProbeMode,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            deadline: Duration::from_secs(10),
            mode: ProbeMode::default(),
        }
    }
}

/// Everything needed to go from a registration id to a session.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    pub discovery: DiscoveryConfig,
    pub probe: ProbeConfig,
    /// Scheme for derived candidates.
    pub scheme: Scheme,
    pub tls: TlsVerification,
    /// Bound on the login request.
    pub auth_timeout: Duration,
    /// Bound on each command request.
    pub command_timeout: Duration,
    /// Session scope requested at login.
    pub session_scope: String,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            probe: ProbeConfig::default(),
            scheme: Scheme::default(),
            tls: TlsVerification::default(),
            auth_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(30),
            session_scope: qclink_api::DOWNLOAD_STATION_SESSION.into(),
        }
    }
}

impl ConnectConfig {
    /// Transport settings shared by every HTTP client the core builds.
    ///
    /// The reqwest-level timeout is the loosest of our bounds; the tighter
    /// per-call bounds are enforced around each request.
    pub fn transport(&self) -> TransportConfig {
        let ceiling = self
            .command_timeout
            .max(self.auth_timeout)
            .max(self.probe.timeout);
        TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: ceiling,
            follow_redirects: true,
        }
    }
}
