// QuickConnect wire types and the resolved server descriptor.
//
// The broker reports absent hostnames as "NULL" or "" and absent ports
// as 0. Conversion into `ServerDescriptor` normalizes all of those to
// `None` so downstream ranking never sees placeholder values.

use serde::{Deserialize, Serialize};

/// `errno` value for a successful lookup.
pub const ERRNO_OK: i64 = 0;

/// `errno` value telling the client to retry against a regional broker
/// listed in `sites`.
pub const ERRNO_REDIRECT: i64 = 4;

/// Body of a `get_server_info` POST.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfoRequest<'a> {
    pub version: u32,
    pub command: &'a str,
    pub id: &'a str,
    #[serde(rename = "serverID")]
    pub server_id: &'a str,
    pub stop_when_error: bool,
}

impl<'a> ServerInfoRequest<'a> {
    pub fn new(tag: &'a str, server_id: &'a str) -> Self {
        Self {
            version: 1,
            command: "get_server_info",
            id: tag,
            server_id,
            stop_when_error: false,
        }
    }
}

/// Raw broker reply. Only the fields the ranker needs are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfoResponse {
    pub errno: i64,
    #[serde(default)]
    pub errinfo: Option<String>,
    #[serde(default)]
    pub sites: Vec<String>,
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub service: Option<ServiceSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub interface: Vec<InterfaceEntry>,
    #[serde(default)]
    pub ddns: Option<String>,
    #[serde(default)]
    pub external: Option<ExternalSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterfaceEntry {
    #[serde(default)]
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalSection {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceSection {
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub ext_port: Option<u16>,
    #[serde(default)]
    pub relay_ip: Option<String>,
    #[serde(default)]
    pub relay_port: Option<u16>,
}

// ── Resolved descriptor ─────────────────────────────────────────────

/// A host with an optional port, as reported for the external mapping
/// and the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedAddress {
    pub host: String,
    pub port: Option<u16>,
}

/// Everything the broker knows about where an appliance currently lives.
///
/// Immutable once resolved; one is produced per discovery attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerDescriptor {
    /// LAN addresses, in the order the broker listed the interfaces.
    pub local_addresses: Vec<String>,
    /// Dynamic-DNS hostname.
    pub ddns: Option<String>,
    /// Public address of the router in front of the appliance.
    pub external: Option<MappedAddress>,
    /// Relay tunnel endpoint.
    pub relay: Option<MappedAddress>,
    /// Port the requested service listens on inside the LAN.
    pub service_port: Option<u16>,
    /// Port forwarded to the service on the router, if any.
    pub external_port: Option<u16>,
}

fn present(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("null") || value == "0.0.0.0" {
        None
    } else {
        Some(value.to_owned())
    }
}

fn nonzero(port: Option<u16>) -> Option<u16> {
    port.filter(|p| *p != 0)
}

impl From<&ServerInfoResponse> for ServerDescriptor {
    fn from(resp: &ServerInfoResponse) -> Self {
        let server = resp.server.clone().unwrap_or_default();
        let service = resp.service.clone().unwrap_or_default();

        let local_addresses = server
            .interface
            .iter()
            .filter_map(|iface| present(iface.ip.as_deref()))
            .collect();

        let external = server.external.as_ref().and_then(|ext| {
            present(ext.ip.as_deref()).map(|host| MappedAddress {
                host,
                port: nonzero(ext.port),
            })
        });

        let relay = present(service.relay_ip.as_deref()).map(|host| MappedAddress {
            host,
            port: nonzero(service.relay_port),
        });

        Self {
            local_addresses,
            ddns: present(server.ddns.as_deref()),
            external,
            relay,
            service_port: nonzero(service.port),
            external_port: nonzero(service.ext_port),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn placeholders_become_absent() {
        let resp: ServerInfoResponse = serde_json::from_value(json!({
            "errno": 0,
            "server": {
                "interface": [{ "ip": "192.168.1.20" }, { "ip": "" }],
                "ddns": "NULL",
                "external": { "ip": "0.0.0.0", "port": 0 }
            },
            "service": { "port": 5001, "ext_port": 0, "relay_ip": "", "relay_port": 0 }
        }))
        .unwrap();

        let desc = ServerDescriptor::from(&resp);
        assert_eq!(desc.local_addresses, vec!["192.168.1.20".to_string()]);
        assert_eq!(desc.ddns, None);
        assert_eq!(desc.external, None);
        assert_eq!(desc.relay, None);
        assert_eq!(desc.service_port, Some(5001));
        assert_eq!(desc.external_port, None);
    }

    #[test]
    fn request_uses_broker_field_names() {
        let body = serde_json::to_value(ServerInfoRequest::new("dsm_portal_https", "abc123"))
            .unwrap();
        assert_eq!(
            body,
            json!({
                "version": 1,
                "command": "get_server_info",
                "id": "dsm_portal_https",
                "serverID": "abc123",
                "stop_when_error": false
            })
        );
    }
}
