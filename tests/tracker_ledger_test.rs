//! End-to-end tests: scoped requests recording model calls, finished into
//! the ledger through fully wired services.

mod common;

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use spendlog::core::services::Services;
use spendlog::core::tracker::{self, ScopeHandle};
use spendlog::storage::{Config, ENV_LEDGER_ID, ENV_SERVICE_ACCOUNT, Secrets};

use common::fixtures::{
    TEST_SERVICE_ACCOUNT_JSON, TOKEN_PATH, TestDir, append_path, make_test_config_toml,
    mount_token_endpoint,
};
use common::logger::TestLogger;

const SHEET_ID: &str = "sheet-e2e";

fn services(server: &MockServer) -> Services {
    let dir = TestDir::new();
    let config_path = dir.create_file("config.toml", &make_test_config_toml(&server.uri()));
    let config = Config::load_from(&config_path).unwrap();

    let mut credential: Value = serde_json::from_str(TEST_SERVICE_ACCOUNT_JSON).unwrap();
    credential["token_uri"] = json!(format!("{}/token", server.uri()));
    let credential = credential.to_string();
    let secrets = Secrets::from_lookup(move |name| match name {
        ENV_SERVICE_ACCOUNT => Some(credential.clone()),
        ENV_LEDGER_ID => Some(SHEET_ID.to_string()),
        _ => None,
    });
    Services::build(config, secrets).unwrap()
}

async fn mount_append(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path(append_path(SHEET_ID)))
        .respond_with(ResponseTemplate::new(200))
        .expect(expected)
        .mount(server)
        .await;
}

fn appended_rows(requests: &[wiremock::Request]) -> Vec<Vec<Value>> {
    requests
        .iter()
        .filter(|r| r.url.path().ends_with(":append"))
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            body["values"][0].as_array().unwrap().clone()
        })
        .collect()
}

/// Stand-in for library code that has no handle to the request.
fn summarize(text: &str) -> String {
    tracker::record_call("house-model", text, "short summary");
    text.chars().take(10).collect()
}

#[tokio::test]
async fn run_scoped_persists_nested_calls() {
    let log = TestLogger::new("run_scoped_persists_nested_calls");
    log.phase("setup");
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "ya29.e2e", 3600, 1).await;
    mount_append(&server, 1).await;
    let services = services(&server);
    assert!(services.ledger().is_enabled());

    log.phase("test");
    let output = services
        .tracker()
        .run_scoped("digest", "user-7", json!({"topic": "rates"}), async {
            let a = summarize(&"a".repeat(4000));
            let b = summarize(&"b".repeat(2000));
            json!({"summaries": [a, b]})
        })
        .await;
    assert_eq!(output["summaries"][0], "aaaaaaaaaa");

    let rows = appended_rows(&server.received_requests().await.unwrap());
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row[1], "digest");
    assert_eq!(row[2], "user-7");
    // house-model: 1.0 in / 2.0 out per 1K; outputs are 4 tokens each.
    // (1000 + 500) input tokens => 1.5, 8 output tokens => 0.016
    assert_eq!(row[4], "1.5160");
    let results: Value = serde_json::from_str(row[6].as_str().unwrap()).unwrap();
    assert_eq!(results["summaries"][1], "bbbbbbbbbb");
    let breakdown: Value = serde_json::from_str(row[7].as_str().unwrap()).unwrap();
    assert_eq!(breakdown["house-model"]["calls"], 2);
    log.finish_ok();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_produce_isolated_rows() {
    let server = MockServer::start().await;
    // Both requests may race to the first exchange.
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "ya29.e2e", "expires_in": 3600})),
        )
        .mount(&server)
        .await;
    mount_append(&server, 2).await;
    let services = services(&server);
    let usage = services.tracker().clone();

    let request = |user: &'static str, calls: usize| {
        let usage = usage.clone();
        tokio::spawn(async move {
            usage
                .run_scoped("batch", user, json!({}), async move {
                    for _ in 0..calls {
                        tracker::record_call("house-model", 1000_u64, 0_u64);
                        tokio::task::yield_now().await;
                    }
                    calls
                })
                .await
        })
    };

    let (a, b) = tokio::join!(request("alice", 5), request("bob", 3));
    assert_eq!(a.unwrap(), 5);
    assert_eq!(b.unwrap(), 3);

    let rows = appended_rows(&server.received_requests().await.unwrap());
    assert_eq!(rows.len(), 2);
    for row in rows {
        let breakdown: Value = serde_json::from_str(row[7].as_str().unwrap()).unwrap();
        match row[2].as_str().unwrap() {
            "alice" => {
                assert_eq!(breakdown["house-model"]["calls"], 5);
                assert_eq!(row[4], "5.0000");
            }
            "bob" => {
                assert_eq!(breakdown["house-model"]["calls"], 3);
                assert_eq!(row[4], "3.0000");
            }
            other => panic!("unexpected user {other}"),
        }
    }
}

#[tokio::test]
async fn ledger_outage_does_not_affect_request() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "ya29.e2e", 3600, 1).await;
    Mock::given(method("POST"))
        .and(path(append_path(SHEET_ID)))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    let services = services(&server);

    let scope: ScopeHandle = services.tracker().begin_scope("svc", "u", json!({}));
    scope.record_call("house-model", 1000_u64, 1000_u64);
    let persisted = services.tracker().finish_scope(&scope, json!({"ok": true})).await;

    assert!(!persisted);
    assert!(scope.is_finished());
    assert!((scope.snapshot().total_cost_usd - 3.0).abs() < 1e-12);
}

#[tokio::test]
async fn unconfigured_ledger_still_tracks() {
    let services = Services::build(Config::default(), Secrets::default()).unwrap();
    let scope = services.tracker().begin_scope("svc", "u", json!({}));
    scope.record_call("gpt-4o", 1000_u64, 1000_u64);

    assert!(!services.tracker().finish_scope(&scope, Value::Null).await);
    assert_eq!(scope.snapshot().total_calls, 1);
}
