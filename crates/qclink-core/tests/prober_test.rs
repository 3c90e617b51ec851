#![allow(clippy::unwrap_used)]
// Integration tests for `ConnectivityProber` against wiremock appliances.

use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use qclink_core::{Candidate, ConnectivityProber, Origin, ProbeConfig, ProbeMode};

// ── Helpers ─────────────────────────────────────────────────────────

fn info_body() -> serde_json::Value {
    json!({
        "success": true,
        "data": { "SYNO.API.Auth": { "path": "entry.cgi", "minVersion": 1, "maxVersion": 7 } }
    })
}

/// A mock appliance answering the info probe. `hits` is the exact number
/// of probes it must receive.
async fn live(hits: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/webapi/query.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(info_body()))
        .expect(hits)
        .mount(&server)
        .await;
    server
}

/// Something listening that is not a DSM Web API.
async fn impostor(hits: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>router login</html>"))
        .expect(hits)
        .mount(&server)
        .await;
    server
}

async fn slow(delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(info_body())
                .set_delay(delay),
        )
        .mount(&server)
        .await;
    server
}

fn candidate(server: &MockServer, origin: Origin) -> Candidate {
    Candidate::new(Url::parse(&server.uri()).unwrap(), origin)
}

/// Nothing listens on port 1.
fn refused() -> Candidate {
    Candidate::new(Url::parse("http://127.0.0.1:1/").unwrap(), Origin::External)
}

fn prober(mode: ProbeMode) -> ConnectivityProber {
    ConnectivityProber::with_client(
        reqwest::Client::new(),
        ProbeConfig {
            timeout: Duration::from_secs(2),
            deadline: Duration::from_secs(5),
            mode,
        },
    )
}

// ── Sequential ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_sequential_finds_live_candidate_at_any_position() {
    for position in 0..3 {
        let mut servers = Vec::new();
        for idx in 0..3 {
            let server = if idx == position {
                live(1).await
            } else if idx < position {
                impostor(1).await
            } else {
                // Never contacted once an earlier candidate answered.
                impostor(0).await
            };
            servers.push(server);
        }
        let candidates: Vec<Candidate> = servers
            .iter()
            .map(|s| candidate(s, Origin::Local))
            .collect();
        let expected = candidates[position].clone();

        let found = prober(ProbeMode::Sequential)
            .find_live(candidates)
            .await
            .unwrap();
        assert_eq!(found, expected, "position {position}");
    }
}

#[tokio::test]
async fn test_all_unreachable_lists_every_candidate() {
    let html = impostor(1).await;
    let candidates = vec![candidate(&html, Origin::Local), refused()];

    let err = prober(ProbeMode::Sequential)
        .find_live(candidates.clone())
        .await
        .unwrap_err();

    assert_eq!(err.failures.len(), 2);
    assert_eq!(err.failures[0].candidate, candidates[0]);
    assert_eq!(err.failures[0].reason, "response is not a DSM Web API");
    assert_eq!(err.failures[1].candidate, candidates[1]);

    let rendered = err.to_string();
    assert_eq!(rendered.lines().count(), 2);
    assert_eq!(
        rendered.lines().next().unwrap(),
        format!("{}: response is not a DSM Web API", candidates[0])
    );
    for c in &candidates {
        assert!(rendered.contains(c.url().as_str()), "missing {c} in {rendered}");
    }
}

#[tokio::test]
async fn test_per_candidate_timeout_moves_on() {
    let stalled = slow(Duration::from_secs(3)).await;
    let healthy = live(1).await;
    let prober = ConnectivityProber::with_client(
        reqwest::Client::new(),
        ProbeConfig {
            timeout: Duration::from_millis(200),
            deadline: Duration::from_secs(5),
            mode: ProbeMode::Sequential,
        },
    );

    let found = prober
        .find_live(vec![
            candidate(&stalled, Origin::Local),
            candidate(&healthy, Origin::DynamicDns),
        ])
        .await
        .unwrap();
    assert_eq!(found.origin(), Origin::DynamicDns);

    let err = prober
        .find_live(vec![candidate(&stalled, Origin::Local)])
        .await
        .unwrap_err();
    assert!(err.failures[0].reason.contains("timed out"));
}

#[tokio::test]
async fn test_empty_candidate_list_fails() {
    let err = prober(ProbeMode::Concurrent)
        .find_live(Vec::new())
        .await
        .unwrap_err();
    assert!(err.failures.is_empty());
    insta::assert_snapshot!(err.to_string(), @"no candidates to probe");
}

// ── Concurrent ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_first_success_wins() {
    let stalled = slow(Duration::from_secs(3)).await;
    let html = impostor(1).await;
    let healthy = live(1).await;

    let started = std::time::Instant::now();
    let found = prober(ProbeMode::Concurrent)
        .find_live(vec![
            candidate(&stalled, Origin::Local),
            candidate(&html, Origin::DynamicDns),
            candidate(&healthy, Origin::External),
        ])
        .await
        .unwrap();

    assert_eq!(found.origin(), Origin::External);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_concurrent_deadline_reports_pending_candidates() {
    let stalled = slow(Duration::from_secs(3)).await;
    let html = impostor(1).await;
    let prober = ConnectivityProber::with_client(
        reqwest::Client::new(),
        ProbeConfig {
            timeout: Duration::from_secs(5),
            deadline: Duration::from_millis(300),
            mode: ProbeMode::Concurrent,
        },
    );

    let err = prober
        .find_live(vec![
            candidate(&stalled, Origin::Local),
            candidate(&html, Origin::Relay),
        ])
        .await
        .unwrap_err();

    assert_eq!(err.failures.len(), 2);
    assert_eq!(err.failures[0].candidate.origin(), Origin::Local);
    assert_eq!(err.failures[0].reason, "overall probe deadline exceeded");
    assert_eq!(err.failures[1].reason, "response is not a DSM Web API");
}

// ── Cancellation ────────────────────────────────────────────────────

#[tokio::test]
async fn test_cancelled_probe_contacts_nobody() {
    for mode in [ProbeMode::Sequential, ProbeMode::Concurrent] {
        let healthy = live(0).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = prober(mode)
            .find_live_until(
                vec![candidate(&healthy, Origin::Local), refused()],
                cancel,
            )
            .await
            .unwrap_err();

        assert_eq!(err.failures.len(), 2, "{mode}");
        assert!(err.failures.iter().all(|f| f.reason == "probe cancelled"));
    }
}

// ── Gateway hand-off ────────────────────────────────────────────────

#[tokio::test]
async fn test_gateway_redirect_yields_concrete_host() {
    let target = impostor(1).await;
    let gateway = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/webapi/query.cgi"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/webapi/query.cgi", target.uri())),
        )
        .mount(&gateway)
        .await;

    // Same listener, addressed by name so the redirect changes host.
    let via_name = Url::parse(&format!(
        "http://localhost:{}/",
        gateway.address().port()
    ))
    .unwrap();

    let found = prober(ProbeMode::Sequential)
        .find_live(vec![Candidate::new(via_name, Origin::BrokerDirect)])
        .await
        .unwrap();

    assert_eq!(found.origin(), Origin::BrokerDirect);
    assert_eq!(found.host(), "127.0.0.1");
    assert_eq!(found.port(), Some(target.address().port()));
}

#[tokio::test]
async fn test_redirect_from_local_candidate_is_not_a_handoff() {
    let target = impostor(1).await;
    let local = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/webapi/query.cgi", target.uri())),
        )
        .mount(&local)
        .await;

    let via_name =
        Url::parse(&format!("http://localhost:{}/", local.address().port())).unwrap();
    let err = prober(ProbeMode::Sequential)
        .find_live(vec![Candidate::new(via_name, Origin::Local)])
        .await
        .unwrap_err();
    assert_eq!(err.failures[0].reason, "response is not a DSM Web API");
}

#[tokio::test]
async fn test_appliance_redirect_to_other_port_returns_final_endpoint() {
    let secure = live(1).await;
    let plain = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/webapi/query.cgi"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("Location", format!("{}/webapi/query.cgi", secure.uri())),
        )
        .expect(1)
        .mount(&plain)
        .await;

    let found = prober(ProbeMode::Sequential)
        .find_live(vec![candidate(&plain, Origin::Local)])
        .await
        .unwrap();

    assert_eq!(found.origin(), Origin::Local);
    assert_eq!(found.port(), Some(secure.address().port()));
    assert_eq!(found.url().as_str(), format!("{}/", secure.uri()));
}
