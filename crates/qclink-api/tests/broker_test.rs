#![allow(clippy::unwrap_used)]
// Integration tests for `BrokerClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use qclink_api::{BrokerClient, MappedAddress};

// ── Helpers ─────────────────────────────────────────────────────────

fn serv_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}/Serv.php", server.uri())).unwrap()
}

/// `host:port` of a mock server, as the broker would list it in `sites`.
fn site_of(server: &MockServer) -> String {
    server.address().to_string()
}

fn broker(hosts: Vec<Url>) -> BrokerClient {
    BrokerClient::with_client(reqwest::Client::new(), hosts).with_regional_scheme("http")
}

fn resolved_body() -> serde_json::Value {
    json!({
        "errno": 0,
        "server": {
            "interface": [{ "ip": "192.168.1.20" }, { "ip": "10.8.0.1" }],
            "ddns": "nas.example.net",
            "external": { "ip": "203.0.113.7", "port": 15001 }
        },
        "service": {
            "port": 5001,
            "ext_port": 15001,
            "relay_ip": "198.51.100.9",
            "relay_port": 41234
        }
    })
}

// ── Resolution ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_resolve_direct_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/Serv.php"))
        .and(body_partial_json(json!({
            "version": 1,
            "command": "get_server_info",
            "serverID": "abc123",
            "stop_when_error": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(resolved_body()))
        .expect(1)
        .mount(&server)
        .await;

    let desc = broker(vec![serv_url(&server)])
        .resolve("abc123")
        .await
        .unwrap();

    assert_eq!(desc.local_addresses, vec!["192.168.1.20", "10.8.0.1"]);
    assert_eq!(desc.ddns.as_deref(), Some("nas.example.net"));
    assert_eq!(
        desc.external,
        Some(MappedAddress {
            host: "203.0.113.7".into(),
            port: Some(15001)
        })
    );
    assert_eq!(
        desc.relay,
        Some(MappedAddress {
            host: "198.51.100.9".into(),
            port: Some(41234)
        })
    );
    assert_eq!(desc.service_port, Some(5001));
}

#[tokio::test]
async fn test_resolve_follows_regional_redirect() {
    let primary = MockServer::start().await;
    let regional = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/Serv.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errno": 4,
            "sites": [site_of(&regional)]
        })))
        .expect(1)
        .mount(&primary)
        .await;

    Mock::given(method("POST"))
        .and(path("/Serv.php"))
        .and(body_partial_json(json!({ "serverID": "abc123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errno": 0,
            "server": { "interface": [{ "ip": "10.0.0.5" }] },
            "service": { "port": 5001 }
        })))
        .expect(1)
        .mount(&regional)
        .await;

    let desc = broker(vec![serv_url(&primary)])
        .resolve("abc123")
        .await
        .unwrap();

    assert_eq!(desc.local_addresses, vec!["10.0.0.5"]);
    assert_eq!(desc.ddns, None);
}

#[tokio::test]
async fn test_resolve_tries_next_host_after_http_error() {
    let broken = MockServer::start().await;
    let healthy = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&broken)
        .await;

    Mock::given(method("POST"))
        .and(path("/Serv.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(resolved_body()))
        .expect(1)
        .mount(&healthy)
        .await;

    let desc = broker(vec![serv_url(&broken), serv_url(&healthy)])
        .resolve("abc123")
        .await
        .unwrap();

    assert_eq!(desc.local_addresses.len(), 2);
}

// ── Failure aggregation ─────────────────────────────────────────────

#[tokio::test]
async fn test_resolve_aggregates_failures_in_attempt_order() {
    let primary = MockServer::start().await;
    let regional = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errno": 4,
            "sites": [site_of(&regional)]
        })))
        .mount(&primary)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errno": 30,
            "errinfo": "get_server_info.go:69[Alias not found]"
        })))
        .mount(&regional)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&secondary)
        .await;

    let err = broker(vec![serv_url(&primary), serv_url(&secondary)])
        .resolve("missing-id")
        .await
        .unwrap_err();

    assert_eq!(err.failures.len(), 3);
    assert!(err.failures[0].host.contains(&primary.address().port().to_string()));
    assert!(err.failures[0].reason.starts_with("errno 4"));
    assert!(err.failures[1].host.contains(&regional.address().port().to_string()));
    assert!(err.failures[1].reason.contains("Alias not found"));
    assert!(err.failures[2].host.contains(&secondary.address().port().to_string()));
    assert!(err.failures[2].reason.contains("Deserialization"));

    let rendered = err.to_string();
    assert_eq!(rendered.lines().count(), 3);
}

#[tokio::test]
async fn test_resolve_without_hosts_fails() {
    let err = broker(Vec::new()).resolve("abc123").await.unwrap_err();
    assert!(err.failures.is_empty());
    insta::assert_snapshot!(err.to_string(), @"no broker hosts configured");
}

// ── Transport failures ──────────────────────────────────────────────

/// Nothing listens on port 1.
const REFUSED_SITE: &str = "127.0.0.1:1";

fn refused_host() -> Url {
    Url::parse(&format!("http://{REFUSED_SITE}/Serv.php")).unwrap()
}

#[tokio::test]
async fn test_resolve_moves_past_refused_primary() {
    let healthy = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Serv.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(resolved_body()))
        .expect(1)
        .mount(&healthy)
        .await;

    let desc = broker(vec![refused_host(), serv_url(&healthy)])
        .resolve("abc123")
        .await
        .unwrap();

    assert_eq!(desc.local_addresses.len(), 2);
}

#[tokio::test]
async fn test_resolve_moves_past_refused_regional_site() {
    let primary = MockServer::start().await;
    let regional = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errno": 4,
            "sites": [REFUSED_SITE, site_of(&regional)]
        })))
        .expect(1)
        .mount(&primary)
        .await;

    Mock::given(method("POST"))
        .and(path("/Serv.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(resolved_body()))
        .expect(1)
        .mount(&regional)
        .await;

    let desc = broker(vec![serv_url(&primary)])
        .resolve("abc123")
        .await
        .unwrap();

    assert_eq!(desc.ddns.as_deref(), Some("nas.example.net"));
}

#[tokio::test]
async fn test_refused_hosts_are_reported_in_attempt_order() {
    let primary = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errno": 4,
            "sites": [REFUSED_SITE]
        })))
        .expect(1)
        .mount(&primary)
        .await;

    let err = broker(vec![refused_host(), serv_url(&primary)])
        .resolve("abc123")
        .await
        .unwrap_err();

    let hosts: Vec<&str> = err.failures.iter().map(|f| f.host.as_str()).collect();
    assert_eq!(hosts.len(), 3);
    assert!(hosts[0].contains(REFUSED_SITE));
    assert!(hosts[1].contains(&primary.address().port().to_string()));
    assert!(hosts[2].contains(REFUSED_SITE));
    assert!(err.failures[1].reason.starts_with("errno 4"));
    assert!(err.failures.iter().all(|f| !f.reason.is_empty()));
    assert_eq!(err.to_string().lines().count(), 3);
}
