#![allow(clippy::unwrap_used)]
// End-to-end tests: broker -> ranking -> probing -> login -> commands,
// with wiremock standing in for the broker and the appliance.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use qclink_core::{
    AuthError, Command, CommandError, CommandOutput, ConnectConfig, Connector, CoreError,
    DiscoveryConfig, Origin, ProbeConfig, ProbeMode, Scheme, Session, SessionState, TaskStatus,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config_for(broker: &MockServer) -> ConnectConfig {
    ConnectConfig {
        discovery: DiscoveryConfig {
            broker_hosts: vec![Url::parse(&format!("{}/Serv.php", broker.uri())).unwrap()],
            broker_domain: "quickconnect.invalid".into(),
            regional_scheme: "http".into(),
            ..DiscoveryConfig::default()
        },
        probe: ProbeConfig {
            mode: ProbeMode::Sequential,
            ..ProbeConfig::default()
        },
        scheme: Scheme::Http,
        auth_timeout: Duration::from_secs(2),
        ..ConnectConfig::default()
    }
}

fn direct_connector() -> Connector {
    Connector::with_client(reqwest::Client::new(), ConnectConfig::default())
}

fn password() -> SecretString {
    SecretString::from("pw".to_string())
}

async fn mount_info(appliance: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/webapi/query.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "SYNO.API.Auth": { "path": "entry.cgi", "maxVersion": 7 } }
        })))
        .mount(appliance)
        .await;
}

async fn mount_login(appliance: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/webapi/entry.cgi"))
        .and(query_param("method", "login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(appliance)
        .await;
}

async fn login_with_code(code: i64) -> AuthError {
    let appliance = MockServer::start().await;
    mount_login(&appliance, json!({ "success": false, "error": { "code": code } })).await;

    let endpoint = Url::parse(&appliance.uri()).unwrap();
    direct_connector()
        .sessions()
        .authenticate(&endpoint, "user", &password())
        .await
        .unwrap_err()
}

// ── Full flow ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_regional_redirect_to_local_login_and_list() {
    let primary = MockServer::start().await;
    let regional = MockServer::start().await;
    let appliance = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/Serv.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errno": 4,
            "sites": [regional.address().to_string()]
        })))
        .expect(2)
        .mount(&primary)
        .await;

    Mock::given(method("POST"))
        .and(path("/Serv.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errno": 0,
            "server": { "interface": [{ "ip": "127.0.0.1" }], "ddns": "NULL" },
            "service": { "port": appliance.address().port(), "relay_ip": "", "relay_port": 0 }
        })))
        .expect(2)
        .mount(&regional)
        .await;

    mount_info(&appliance).await;
    mount_login(&appliance, json!({ "success": true, "data": { "sid": "sid-e2e" } })).await;

    Mock::given(method("GET"))
        .and(path("/webapi/DownloadStation/task.cgi"))
        .and(query_param("method", "list"))
        .and(query_param("_sid", "sid-e2e"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "total": 2,
                "tasks": [
                    { "id": "dbid_1", "title": "old.iso", "status": "finished", "size": 10 },
                    { "id": "dbid_2", "title": "new.iso", "status": "downloading", "size": 10 }
                ]
            }
        })))
        .expect(1)
        .mount(&appliance)
        .await;

    let connector = Connector::new(config_for(&primary)).unwrap();

    let discovery = connector.discover("abc123").await.unwrap();
    let urls: Vec<String> = discovery
        .candidates
        .iter()
        .map(|c| format!("{}:{}", c.origin(), c.url()))
        .collect();
    assert_eq!(
        urls,
        vec![
            format!("local:http://127.0.0.1:{}/", appliance.address().port()),
            "broker-direct:http://abc123.quickconnect.invalid/".to_string(),
        ]
    );

    let mut conn = connector.connect("abc123", "user", &password()).await.unwrap();
    assert_eq!(conn.candidate.origin(), Origin::Local);
    assert_eq!(conn.session.state(), SessionState::Authenticated);
    assert!(conn.session.established_at().is_some());

    let output = connector
        .commands()
        .execute(&mut conn.session, Command::ListTasks)
        .await
        .unwrap();
    let tasks = match output {
        CommandOutput::Tasks(tasks) => tasks,
        other => panic!("expected task list, got {other:?}"),
    };
    assert_eq!(tasks[0].status, TaskStatus::Downloading);
    assert_eq!(tasks[1].status, TaskStatus::Finished);
    assert!(conn.session.is_valid());
}

#[tokio::test]
async fn test_discovery_failure_is_aggregated() {
    let primary = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errno": 30,
            "errinfo": "Alias not found"
        })))
        .mount(&primary)
        .await;

    let connector = Connector::new(config_for(&primary)).unwrap();
    let err = connector
        .connect("missing", "user", &password())
        .await
        .unwrap_err();

    let discovery = match err {
        CoreError::Discovery(discovery) => discovery,
        other => panic!("expected discovery error, got {other:?}"),
    };
    assert_eq!(discovery.failures.len(), 1);
    assert!(discovery.failures[0].reason.contains("Alias not found"));
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_auth_codes_are_classified() {
    assert_eq!(login_with_code(400).await, AuthError::InvalidCredentials);
    assert_eq!(login_with_code(403).await, AuthError::TwoFactorRequired);
    assert_eq!(login_with_code(404).await, AuthError::ServiceUnavailable);
    assert_eq!(login_with_code(999).await, AuthError::Unknown(999));
}

#[tokio::test]
async fn test_unparseable_login_reply_is_malformed() {
    let appliance = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>portal</html>"))
        .mount(&appliance)
        .await;

    let endpoint = Url::parse(&appliance.uri()).unwrap();
    let err = direct_connector()
        .sessions()
        .authenticate(&endpoint, "user", &password())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::MalformedResponse { .. }));
}

#[tokio::test]
async fn test_slow_login_is_unreachable() {
    let appliance = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": true, "data": { "sid": "late" } }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&appliance)
        .await;

    let config = ConnectConfig {
        auth_timeout: Duration::from_millis(200),
        ..ConnectConfig::default()
    };
    let connector = Connector::with_client(reqwest::Client::new(), config);
    let endpoint = Url::parse(&appliance.uri()).unwrap();
    let err = connector
        .connect_direct(&endpoint, "user", &password())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Auth(AuthError::Unreachable { .. })
    ));
}

// ── Session expiry ──────────────────────────────────────────────────

#[tokio::test]
async fn test_session_invalid_code_expires_session_and_blocks_reuse() {
    let appliance = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/webapi/DownloadStation/task.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": { "code": 105 }
        })))
        .expect(1)
        .mount(&appliance)
        .await;

    let connector = direct_connector();
    let mut session = Session::restore(
        Url::parse(&appliance.uri()).unwrap(),
        "user",
        SecretString::from("stale".to_string()),
    );

    let err = connector
        .commands()
        .execute(&mut session, Command::ListTasks)
        .await
        .unwrap_err();
    assert_eq!(err, CommandError::SessionExpired);
    assert_eq!(session.state(), SessionState::Expired);
    assert!(!connector.sessions().is_valid(&session));

    // Refused locally: the mock's `expect(1)` fails the test if this
    // reaches the appliance.
    let err = connector
        .commands()
        .execute(
            &mut session,
            Command::CreateTask {
                uri: "magnet:?xt=urn:btih:abc".into(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, CommandError::SessionExpired);
}

#[tokio::test]
async fn test_other_provider_errors_keep_session() {
    let appliance = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webapi/DownloadStation/task.cgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": { "code": 403 }
        })))
        .mount(&appliance)
        .await;

    let connector = direct_connector();
    let mut session = Session::restore(
        Url::parse(&appliance.uri()).unwrap(),
        "user",
        SecretString::from("sid".to_string()),
    );

    let err = connector
        .commands()
        .execute(
            &mut session,
            Command::CreateTask {
                uri: "https://example.com/file.iso".into(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, CommandError::ProviderError(403));
    assert!(session.is_valid());
}

#[tokio::test]
async fn test_logout_expires_even_when_appliance_is_gone() {
    let connector = direct_connector();
    let mut session = Session::restore(
        Url::parse("http://127.0.0.1:1/").unwrap(),
        "user",
        SecretString::from("sid".to_string()),
    );

    connector.sessions().logout(&mut session).await;
    assert_eq!(session.state(), SessionState::Expired);
}
