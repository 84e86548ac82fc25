//! Fixtures and mock upstreams shared by integration tests.
#![allow(dead_code)]

use std::path::PathBuf;

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub use spendlog::test_utils::{
    TEST_CLIENT_EMAIL, TEST_RSA_PUBLIC_PEM, TEST_SERVICE_ACCOUNT_JSON, TestDir,
    make_test_config_toml, make_test_credential, make_test_email, make_test_ledger_row,
    make_test_notify_credentials, make_test_secrets,
};

/// Path of the mock identity endpoint.
pub const TOKEN_PATH: &str = "/token";

/// Path of the mock mail-send endpoint.
pub const SEND_PATH: &str = "/v3/mail/send";

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Token URI on `server`.
pub fn token_uri(server: &MockServer) -> String {
    format!("{}{TOKEN_PATH}", server.uri())
}

/// Identity endpoint that issues `access_token` valid for `expires_in` seconds.
pub async fn mount_token_endpoint(
    server: &MockServer,
    access_token: &str,
    expires_in: i64,
    expected_calls: u64,
) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "expires_in": expires_in,
            "token_type": "Bearer",
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Ledger append path for `spreadsheet_id` on the default range.
pub fn append_path(spreadsheet_id: &str) -> String {
    format!("/v4/spreadsheets/{spreadsheet_id}/values/Sheet1!A:H:append")
}
