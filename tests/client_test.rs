//! Authenticated client against a mock backend.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bcgate::client::types::TransactionRequest;
use bcgate::{
  ApiClient, ApiError, FileTokenStore, MemoryTokenStore, NetworkTransport, RouteClassifier,
  Session, TokenStore,
};

use common::RecordingNavigator;

struct Harness {
  client: ApiClient,
  tokens: Arc<dyn TokenStore>,
  navigator: Arc<RecordingNavigator>,
}

fn harness(server: &MockServer, tokens: Arc<dyn TokenStore>) -> Harness {
  let navigator = Arc::new(RecordingNavigator::default());
  let session = Session::new(tokens.clone(), navigator.clone());
  let base = Url::parse(&format!("{}/api", server.uri())).unwrap();
  let transport = Arc::new(NetworkTransport::new(Duration::from_secs(5)).unwrap());
  let client = ApiClient::new(base, transport, session, RouteClassifier::default());

  Harness {
    client,
    tokens,
    navigator,
  }
}

async fn mount_login(server: &MockServer, token: &str) {
  Mock::given(method("POST"))
    .and(path("/api/login"))
    .and(body_json(json!({"username": "admin", "password": "admin123"})))
    .respond_with(
      ResponseTemplate::new(200).set_body_json(json!({"access_token": token, "token_type": "bearer"})),
    )
    .mount(server)
    .await;
}

// =============================================================================
// Login and credential attachment
// =============================================================================

#[tokio::test]
async fn login_then_balance_carries_bearer() {
  let server = MockServer::start().await;
  mount_login(&server, "abc123").await;
  Mock::given(method("GET"))
    .and(path("/api/balance"))
    .and(header("Authorization", "Bearer abc123"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(json!({"balances": {"Assets:Cash:Alipay": 120.5, "Assets:Bank:BOC:8735": -30.0}})),
    )
    .expect(1)
    .mount(&server)
    .await;

  let h = harness(&server, Arc::new(MemoryTokenStore::new()));
  assert!(!h.client.is_authenticated());

  let login = h.client.login("admin", "admin123").await.unwrap();
  assert_eq!(login.access_token, "abc123");
  assert!(h.client.is_authenticated());

  let balance = h.client.balance().await.unwrap();
  assert_eq!(balance.balances["Assets:Cash:Alipay"], 120.5);
  assert_eq!(balance.balances.len(), 2);
}

#[tokio::test]
async fn no_credential_means_no_authorization_header() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/accounts"))
    .respond_with(
      ResponseTemplate::new(200).set_body_json(json!({"accounts": ["Assets:Cash:CNY", "Expenses:Food:Lunch"]})),
    )
    .mount(&server)
    .await;

  let h = harness(&server, Arc::new(MemoryTokenStore::new()));
  let accounts = h.client.accounts().await.unwrap();
  assert_eq!(accounts.accounts.len(), 2);

  let received = server.received_requests().await.unwrap();
  assert_eq!(received.len(), 1);
  assert!(received[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn failed_login_stores_nothing() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/api/login"))
    .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "login backend down"})))
    .mount(&server)
    .await;

  let h = harness(&server, Arc::new(MemoryTokenStore::new()));
  let err = h.client.login("admin", "admin123").await.unwrap_err();

  assert!(matches!(err, ApiError::Status { ref message, .. } if message == "login backend down"));
  assert_eq!(h.tokens.get().unwrap(), None);
  assert!(h.navigator.visits().is_empty());
}

#[tokio::test]
async fn token_survives_restart() {
  let server = MockServer::start().await;
  mount_login(&server, "abc123").await;
  let dir = tempfile::tempdir().unwrap();

  let first = harness(&server, Arc::new(FileTokenStore::in_dir(dir.path())));
  first.client.login("admin", "admin123").await.unwrap();

  let second = harness(&server, Arc::new(FileTokenStore::in_dir(dir.path())));
  assert!(second.client.is_authenticated());
}

// =============================================================================
// Session teardown
// =============================================================================

#[tokio::test]
async fn unauthorized_from_any_endpoint_ends_session() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/fava/status"))
    .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token has expired"})))
    .mount(&server)
    .await;

  let h = harness(&server, Arc::new(MemoryTokenStore::with_token("expired")));
  assert!(h.client.is_authenticated());

  let err = h.client.fava_status().await.unwrap_err();

  match err {
    ApiError::Unauthorized { message } => assert_eq!(message, "Token has expired"),
    other => panic!("unexpected error: {other:?}"),
  }
  assert!(!h.client.is_authenticated());
  assert_eq!(h.tokens.get().unwrap(), None);
  assert_eq!(h.navigator.visits(), vec!["/login"]);
}

#[tokio::test]
async fn other_error_statuses_keep_session() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/balance"))
    .respond_with(
      ResponseTemplate::new(500).set_body_json(json!({"detail": "Failed to get balance: ledger missing"})),
    )
    .mount(&server)
    .await;

  let h = harness(&server, Arc::new(MemoryTokenStore::with_token("abc123")));
  let err = h.client.balance().await.unwrap_err();

  assert_eq!(err.status(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
  assert!(h.client.is_authenticated());
  assert!(h.navigator.visits().is_empty());
}

#[tokio::test]
async fn logout_clears_and_navigates() {
  let server = MockServer::start().await;
  let h = harness(&server, Arc::new(MemoryTokenStore::with_token("abc123")));

  h.client.logout();

  assert!(!h.client.is_authenticated());
  assert_eq!(h.navigator.visits(), vec!["/login"]);
}

// =============================================================================
// Endpoints
// =============================================================================

#[tokio::test]
async fn parse_text_then_save() {
  let server = MockServer::start().await;
  let parsed = json!({
    "date": "2026-01-15",
    "amount": 25.0,
    "merchant": "Noodle House",
    "payment_method": "微信",
    "bank_name": "",
    "card_last_four": "",
    "transaction_type": "expense",
    "category": "午餐",
    "description": "lunch"
  });
  Mock::given(method("POST"))
    .and(path("/api/parse/text"))
    .and(body_json(json!({"text": "lunch 25 at Noodle House"})))
    .respond_with(ResponseTemplate::new(200).set_body_json(parsed))
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path("/api/transaction"))
    .and(header("Authorization", "Bearer abc123"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(json!({"success": true, "message": "Transaction saved successfully"})),
    )
    .expect(1)
    .mount(&server)
    .await;

  let h = harness(&server, Arc::new(MemoryTokenStore::with_token("abc123")));
  let parsed = h.client.parse_text("lunch 25 at Noodle House").await.unwrap();
  assert_eq!(parsed.merchant, "Noodle House");

  let saved = h
    .client
    .save_transaction(&TransactionRequest::from(parsed))
    .await
    .unwrap();
  assert!(saved.success);
}

#[tokio::test]
async fn fava_controls() {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/api/fava/start"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "success": true,
      "message": "Fava started successfully",
      "url": "http://localhost:5000"
    })))
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path("/api/fava/stop"))
    .respond_with(
      ResponseTemplate::new(200).set_body_json(json!({"success": true, "message": "Fava stopped successfully"})),
    )
    .mount(&server)
    .await;

  let h = harness(&server, Arc::new(MemoryTokenStore::with_token("abc123")));

  let started = h.client.start_fava().await.unwrap();
  assert_eq!(started.url.as_deref(), Some("http://localhost:5000"));
  let stopped = h.client.stop_fava().await.unwrap();
  assert!(stopped.success);
  assert!(stopped.url.is_none());
}

#[tokio::test]
async fn account_config_is_passed_through() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/config/accounts"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "payment_methods": [{"value": "现金", "label": "现金", "account": "Assets:Cash:CNY"}]
    })))
    .mount(&server)
    .await;

  let h = harness(&server, Arc::new(MemoryTokenStore::with_token("abc123")));
  let config = h.client.account_config().await.unwrap();
  assert_eq!(config["payment_methods"][0]["account"], "Assets:Cash:CNY");
}
