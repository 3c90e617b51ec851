// ── Candidate endpoints ──
//
// Turns a resolved `ServerDescriptor` into the ordered list of endpoints
// worth probing. Tier order is fixed: local, dynamic-dns, external, relay,
// broker-direct. LAN paths come first because a co-located client reaches
// them fastest; the broker gateway comes last because it is the slowest
// path and depends on the broker forwarding traffic.

use std::fmt;
use std::net::Ipv6Addr;

use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use qclink_api::ServerDescriptor;

use crate::config::Scheme;

/// Which path a candidate represents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Origin {
    Local,
    DynamicDns,
    External,
    Relay,
    BrokerDirect,
}

impl Origin {
    /// Paths that terminate at a broker or relay rather than the appliance
    /// itself; a redirect away from one of these points at the real host.
    pub fn is_gateway(self) -> bool {
        matches!(self, Self::Relay | Self::BrokerDirect)
    }
}

/// One concrete endpoint hypothesis. Derived, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    url: Url,
    origin: Origin,
}

impl Candidate {
    pub fn new(url: Url, origin: Origin) -> Self {
        Self { url, origin }
    }

    /// Base URL of the endpoint (scheme, host, port).
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Explicit port, or the scheme's well-known port.
    pub fn port(&self) -> Option<u16> {
        self.url.port_or_known_default()
    }

    /// The candidate a redirect landed on. Keeps the origin tag so
    /// diagnostics still show which path found the appliance.
    pub(crate) fn redirected_to(&self, target: &Url) -> Option<Self> {
        let host = target.host_str()?;
        let url = endpoint_url(target.scheme(), host, target.port())?;
        Some(Self::new(url, self.origin))
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.origin, self.url)
    }
}

/// Knobs the ranker needs besides the descriptor itself.
#[derive(Debug, Clone)]
pub struct RankPolicy {
    pub scheme: Scheme,
    pub broker_domain: String,
}

/// Build `{scheme}://{host}[:{port}]/`, bracketing bare IPv6 addresses.
fn endpoint_url(scheme: &str, host: &str, port: Option<u16>) -> Option<Url> {
    let host = host.trim_matches(|c| c == '[' || c == ']');
    let host = if host.parse::<Ipv6Addr>().is_ok() {
        format!("[{host}]")
    } else {
        host.to_owned()
    };
    let raw = match port {
        Some(port) => format!("{scheme}://{host}:{port}/"),
        None => format!("{scheme}://{host}/"),
    };
    match Url::parse(&raw) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(endpoint = %raw, error = %e, "skipping unparseable candidate");
            None
        }
    }
}

/// Derive the ranked candidate list for `descriptor`.
///
/// Missing descriptor fields contribute nothing; the broker-direct
/// candidate is always appended. An empty result (only possible when
/// the registration id cannot form a hostname) means no reachable server.
pub fn rank(descriptor: &ServerDescriptor, registration_id: &str, policy: &RankPolicy) -> Vec<Candidate> {
    let scheme = policy.scheme.to_string();
    let default_port = policy.scheme.default_port();
    let service_port = descriptor.service_port.unwrap_or(default_port);
    let forwarded_port = descriptor.external_port.unwrap_or(service_port);

    let mut candidates = Vec::new();
    let mut push = |host: &str, port: Option<u16>, origin: Origin| {
        if let Some(url) = endpoint_url(&scheme, host, port) {
            candidates.push(Candidate::new(url, origin));
        }
    };

    for addr in &descriptor.local_addresses {
        push(addr, Some(service_port), Origin::Local);
    }

    if let Some(ddns) = &descriptor.ddns {
        push(ddns, Some(forwarded_port), Origin::DynamicDns);
    }

    if let Some(ext) = &descriptor.external {
        push(&ext.host, Some(ext.port.unwrap_or(forwarded_port)), Origin::External);
    }

    if let Some(relay) = &descriptor.relay {
        push(&relay.host, Some(relay.port.unwrap_or(service_port)), Origin::Relay);
    }

    let gateway = format!("{}.{}", registration_id.trim(), policy.broker_domain);
    push(&gateway, None, Origin::BrokerDirect);

    debug!(count = candidates.len(), "ranked candidates");
    candidates
}
