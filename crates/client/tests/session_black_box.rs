mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use merchantdesk_auth::Profile;
use merchantdesk_client::storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY};
use merchantdesk_client::{
    KeyValueStore, LoginRequest, MemoryStore, Navigator, PipelineError, RegisterRequest,
    SessionError, SessionState, VerifyRequest,
};

use common::{
    EXPIRED_JWT, GOOD_OTP, GOOD_PASSWORD, ISSUED_TOKEN, PARTIAL_OTP, TAKEN_EMAIL, TestClient,
    TestServer, VERIFIED_TOKEN, profile_json,
};

const EMAIL: &str = "tunde@example.com";

fn good_login() -> LoginRequest {
    LoginRequest::new(EMAIL, GOOD_PASSWORD)
}

async fn persisted(store: &MemoryStore, key: &str) -> Option<String> {
    store.get(key).await.unwrap()
}

#[tokio::test]
async fn remembered_login_persists_and_redirects_to_intended_page() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server.base_url, "/login");
    client.navigator.set_intended("/invoices/12");
    client.app.session.bootstrap().await;

    let profile = client
        .app
        .session
        .login(good_login().remember(true))
        .await
        .unwrap();

    assert_eq!(profile.email, EMAIL);
    assert_eq!(persisted(&client.durable, ACCESS_TOKEN_KEY).await.as_deref(), Some(ISSUED_TOKEN));
    assert_eq!(persisted(&client.durable, REFRESH_TOKEN_KEY).await.as_deref(), Some("refresh-17"));
    let raw = persisted(&client.durable, USER_DATA_KEY).await.unwrap();
    assert_eq!(Profile::from_user_data(&raw).unwrap(), profile);

    assert_eq!(client.navigator.last().as_deref(), Some("/invoices/12"));
    let session = client.app.session.snapshot();
    assert_eq!(session.state(), SessionState::Authenticated);
    assert_eq!(session.credential().unwrap().access_token(), ISSUED_TOKEN);
    assert!(!session.is_loading());
}

#[tokio::test]
async fn login_without_intended_page_goes_home() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server.base_url, "/login");
    client.app.session.bootstrap().await;

    client.app.session.login(good_login()).await.unwrap();

    assert_eq!(client.navigator.last().as_deref(), Some("/"));
}

#[tokio::test]
async fn unremembered_login_stays_in_process_but_authenticates_requests() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server.base_url, "/login");
    client.app.session.bootstrap().await;

    client.app.session.login(good_login()).await.unwrap();

    assert!(client.durable.is_empty());
    let res = client.app.pipeline.get("/echo").await.unwrap();
    assert_eq!(res.body["authorization"], format!("Bearer {ISSUED_TOKEN}"));

    // A restart forgets the session.
    let restarted = TestClient::with_store(&server.base_url, "/", client.durable.clone());
    let session = restarted.app.session.bootstrap().await;
    assert_eq!(session.state(), SessionState::Anonymous);
}

#[tokio::test]
async fn rejected_login_writes_nothing_and_reports_server_payload() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server.base_url, "/login");
    client.app.session.bootstrap().await;
    let mut handle = client.app.session.subscribe();

    let err = client
        .app
        .session
        .login(LoginRequest::new(EMAIL, "wrong").remember(true))
        .await
        .unwrap_err();

    let http = err.http().expect("server error");
    assert_eq!(http.status, 401);
    assert_eq!(http.body, json!({ "message": "Invalid credentials" }));
    assert_eq!(server.login_hits(), 1);

    assert!(client.durable.is_empty());
    assert!(client.navigator.history().is_empty());
    assert_eq!(client.app.session.snapshot().state(), SessionState::Anonymous);
    assert!(!handle.is_authenticated());
    assert!(tokio::time::timeout(Duration::from_millis(50), handle.changed())
        .await
        .is_err());
}

#[tokio::test]
async fn bootstrap_without_token_clears_every_key() {
    let server = TestServer::spawn().await;
    let durable = Arc::new(MemoryStore::new());
    durable
        .set(USER_DATA_KEY, &profile_json(EMAIL).to_string())
        .await
        .unwrap();
    durable.set(REFRESH_TOKEN_KEY, "stray-refresh").await.unwrap();
    let client = TestClient::with_store(&server.base_url, "/payouts", durable);

    let session = client.app.session.bootstrap().await;

    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(persisted(&client.durable, ACCESS_TOKEN_KEY).await, None);
    assert_eq!(persisted(&client.durable, REFRESH_TOKEN_KEY).await, None);
    assert_eq!(persisted(&client.durable, USER_DATA_KEY).await, None);
    assert_eq!(client.navigator.last().as_deref(), Some("/login"));
}

#[tokio::test]
async fn bootstrap_drops_expired_jwt() {
    let server = TestServer::spawn().await;
    let durable = Arc::new(MemoryStore::new());
    durable.set(ACCESS_TOKEN_KEY, EXPIRED_JWT).await.unwrap();
    durable
        .set(USER_DATA_KEY, &profile_json(EMAIL).to_string())
        .await
        .unwrap();
    let client = TestClient::with_store(&server.base_url, "/", durable);

    let session = client.app.session.bootstrap().await;

    assert_eq!(session.state(), SessionState::Anonymous);
    assert!(client.durable.is_empty());
    assert_eq!(client.navigator.last().as_deref(), Some("/login"));

    let res = client.app.pipeline.get("/echo").await.unwrap();
    assert_eq!(res.body["authorization"], serde_json::Value::Null);
}

#[tokio::test]
async fn logout_twice_matches_logout_once() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server.base_url, "/login");
    client.app.session.bootstrap().await;
    client
        .app
        .session
        .login(good_login().remember(true))
        .await
        .unwrap();

    client.app.session.logout().await;
    let once = client.app.session.snapshot();
    client.app.session.logout().await;
    let twice = client.app.session.snapshot();

    assert_eq!(once, twice);
    assert_eq!(twice.state(), SessionState::Anonymous);
    assert!(client.durable.is_empty());
    assert_eq!(client.navigator.current_path().as_deref(), Some("/login"));

    let res = client.app.pipeline.get("/echo").await.unwrap();
    assert_eq!(res.body["authorization"], serde_json::Value::Null);
}

#[tokio::test]
async fn profile_survives_a_restart_unchanged() {
    let server = TestServer::spawn().await;
    let first = TestClient::new(&server.base_url, "/login");
    first.app.session.bootstrap().await;
    let logged_in = first
        .app
        .session
        .login(good_login().remember(true))
        .await
        .unwrap();

    let second = TestClient::with_store(&server.base_url, "/invoices", first.durable.clone());
    let session = second.app.session.bootstrap().await;

    assert_eq!(session.state(), SessionState::Authenticated);
    assert_eq!(session.profile(), Some(&logged_in));
    assert!(second.navigator.history().is_empty());
    assert!(second.app.session.profile().unwrap().is_permitted("invoices", "delete"));
}

#[tokio::test]
async fn server_401_mid_session_does_not_log_out() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server.base_url, "/login");
    client.app.session.bootstrap().await;
    client.app.session.login(good_login()).await.unwrap();
    let history_before = client.navigator.history();

    let err = client.app.pipeline.get("/status/401").await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(client.app.session.is_authenticated());
    assert_eq!(client.navigator.history(), history_before);
}

#[tokio::test]
async fn verify_establishes_session() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server.base_url, "/login");
    client.app.session.bootstrap().await;

    let profile = client
        .app
        .session
        .verify(VerifyRequest {
            token: "pending-1".to_string(),
            otp: GOOD_OTP.to_string(),
            remember_me: true,
        })
        .await
        .unwrap();

    assert_eq!(profile.email, "verified@example.com");
    assert_eq!(persisted(&client.durable, ACCESS_TOKEN_KEY).await.as_deref(), Some(VERIFIED_TOKEN));
    assert_eq!(client.navigator.last().as_deref(), Some("/"));
}

#[tokio::test]
async fn incomplete_verify_grant_changes_nothing() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server.base_url, "/login");
    client.app.session.bootstrap().await;

    let err = client
        .app
        .session
        .verify(VerifyRequest {
            token: "pending-1".to_string(),
            otp: PARTIAL_OTP.to_string(),
            remember_me: true,
        })
        .await
        .unwrap_err();

    assert_eq!(err, SessionError::IncompleteGrant("access token"));
    assert!(client.durable.is_empty());
    assert!(!client.app.session.is_authenticated());
    assert!(client.navigator.history().is_empty());
}

#[tokio::test]
async fn register_then_logs_in() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server.base_url, "/login");
    client.app.session.bootstrap().await;

    let profile = client
        .app
        .session
        .register(RegisterRequest {
            full_name: "Tunde Merchant".to_string(),
            email: EMAIL.to_string(),
            password: GOOD_PASSWORD.to_string(),
            mobile_num: Some("+2348000000000".to_string()),
            business_name: Some("Tunde Stores".to_string()),
            remember_me: true,
        })
        .await
        .unwrap();

    assert_eq!(profile.email, EMAIL);
    assert_eq!(server.login_hits(), 1);
    assert!(client.app.session.is_authenticated());
    assert_eq!(persisted(&client.durable, ACCESS_TOKEN_KEY).await.as_deref(), Some(ISSUED_TOKEN));
}

#[tokio::test]
async fn rejected_registration_returns_field_errors_untouched() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server.base_url, "/login");
    client.app.session.bootstrap().await;

    let err = client
        .app
        .session
        .register(RegisterRequest {
            full_name: "Someone Else".to_string(),
            email: TAKEN_EMAIL.to_string(),
            password: GOOD_PASSWORD.to_string(),
            mobile_num: None,
            business_name: None,
            remember_me: false,
        })
        .await
        .unwrap_err();

    let SessionError::Pipeline(PipelineError::Http(http)) = &err else {
        panic!("expected a server error, got {err:?}");
    };
    assert_eq!(http.status, 400);
    assert_eq!(http.body["errors"]["email"], json!(["has already been taken"]));
    assert_eq!(server.login_hits(), 0);
    assert!(!client.app.session.is_authenticated());
}

#[tokio::test]
async fn unreachable_service_fails_login_without_side_effects() {
    let base = common::unreachable_url().await;
    let client = TestClient::new(&base, "/login");
    client.app.session.bootstrap().await;

    let err = client.app.session.login(good_login()).await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Pipeline(PipelineError::ServiceUnreachable { .. })
    ));
    assert!(err.http().is_none());
    assert!(client.durable.is_empty());
    assert!(client.navigator.history().is_empty());
}

#[tokio::test]
async fn login_during_bootstrap_keeps_its_session() {
    let server = TestServer::spawn().await;
    let client =
        TestClient::with_slow_reads(&server.base_url, "/dashboard", Duration::from_millis(200));
    client.navigator.set_intended("/invoices");

    let (_, login) = tokio::join!(
        client.app.session.bootstrap(),
        client.app.session.login(good_login().remember(true)),
    );
    login.unwrap();

    let session = client.app.session.snapshot();
    assert_eq!(session.state(), SessionState::Authenticated);
    assert_eq!(persisted(&client.durable, ACCESS_TOKEN_KEY).await.as_deref(), Some(ISSUED_TOKEN));
    assert!(persisted(&client.durable, USER_DATA_KEY).await.is_some());
    assert_ne!(client.navigator.last().as_deref(), Some("/login"));

    let res = client.app.pipeline.get("/echo").await.unwrap();
    assert_eq!(res.body["authorization"], format!("Bearer {ISSUED_TOKEN}"));
}

#[tokio::test]
async fn logout_does_not_cancel_an_in_flight_request() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(&server.base_url, "/login");
    client.app.session.bootstrap().await;
    client
        .app
        .session
        .login(good_login().remember(true))
        .await
        .unwrap();

    let (response, ()) = tokio::join!(client.app.pipeline.get("/delayed"), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.app.session.logout().await;
    });

    let response = response.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body["authorization"], format!("Bearer {ISSUED_TOKEN}"));

    assert_eq!(client.app.session.snapshot().state(), SessionState::Anonymous);
    assert!(client.durable.is_empty());
    assert_eq!(client.navigator.last().as_deref(), Some("/login"));

    let after = client.app.pipeline.get("/echo").await.unwrap();
    assert_eq!(after.body["authorization"], serde_json::Value::Null);
}
