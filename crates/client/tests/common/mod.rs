#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use url::Url;

use merchantdesk_client::enrichment::Enricher;
use merchantdesk_client::{
    AppState, ClientConfig, HistoryNavigator, KeyValueStore, MemoryStore, StorageError,
};

pub const GOOD_PASSWORD: &str = "correct-horse";
pub const ISSUED_TOKEN: &str = "tok-merchant-17";
pub const VERIFIED_TOKEN: &str = "tok-verified-17";
pub const GOOD_OTP: &str = "123456";
/// OTP the server accepts but answers without an access token.
pub const PARTIAL_OTP: &str = "000000";
pub const TAKEN_EMAIL: &str = "taken@example.com";
pub const PUBLIC_IP: &str = "203.0.113.7";

/// JWT-shaped token whose `exp` is 1970-01-01T00:00:01Z.
pub const EXPIRED_JWT: &str = "eyJhbGciOiJub25lIn0.eyJleHAiOjF9.c2ln";

#[derive(Default)]
pub struct Hits {
    pub login: AtomicUsize,
    pub register: AtomicUsize,
}

pub struct TestServer {
    pub base_url: Url,
    pub hits: Arc<Hits>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let hits = Arc::new(Hits::default());
        let app = Router::new()
            .route("/echo", any(echo))
            .route("/ip", get(ip))
            .route("/empty", get(|| async { StatusCode::NO_CONTENT }))
            .route("/slow", get(slow))
            .route("/delayed", any(delayed))
            .route("/text-error", get(|| async { (StatusCode::BAD_GATEWAY, "Bad Gateway") }))
            .route("/status/:code", get(status))
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/auth/verify", post(verify))
            .with_state(hits.clone());

        // Same handlers every run, ephemeral port per test.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = Url::parse(&format!("http://{addr}/")).unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            hits,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> Url {
        self.base_url.join(path.trim_start_matches('/')).unwrap()
    }

    pub fn login_hits(&self) -> usize {
        self.hits.login.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Base URL of a port nothing listens on.
pub async fn unreachable_url() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}/")).unwrap()
}

pub fn profile_json(email: &str) -> Value {
    json!({
        "id": 17,
        "role": "merchant",
        "fullName": "Tunde Merchant",
        "email": email,
        "mobileNum": "+2348000000000",
        "permissions": [
            {"moduleName": "invoices", "action": "*"},
            {"moduleName": "payouts", "action": "read"}
        ]
    })
}

async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Value> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };

    Json(json!({
        "method": method.as_str(),
        "authorization": header("authorization"),
        "x-ip": header("x-ip"),
        "x-location": header("x-location"),
        "x-trace": header("x-trace"),
        "body": body,
    }))
}

async fn ip() -> Json<Value> {
    Json(json!({ "ip": PUBLIC_IP }))
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "late"
}

/// Echo after a short pause, well inside the client's request timeout.
async fn delayed(method: Method, headers: HeaderMap, body: String) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(150)).await;
    echo(method, headers, body).await
}

async fn status(Path(code): Path<u16>) -> (StatusCode, Json<Value>) {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "message": format!("status {code}") })))
}

async fn login(
    State(hits): State<Arc<Hits>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    hits.login.fetch_add(1, Ordering::SeqCst);

    if body["password"] != GOOD_PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid credentials" })),
        );
    }

    let email = body["email"].as_str().unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({
            "accessToken": ISSUED_TOKEN,
            "refreshToken": "refresh-17",
            "profile": profile_json(email),
        })),
    )
}

async fn register(
    State(hits): State<Arc<Hits>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    hits.register.fetch_add(1, Ordering::SeqCst);

    if body["email"] == TAKEN_EMAIL {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": "Validation failed",
                "errors": { "email": ["has already been taken"] }
            })),
        );
    }

    (StatusCode::CREATED, Json(json!({ "id": 17 })))
}

async fn verify(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["otp"] == GOOD_OTP {
        return (
            StatusCode::OK,
            Json(json!({
                "access": VERIFIED_TOKEN,
                "refresh": "refresh-v",
                "profile": profile_json("verified@example.com"),
            })),
        );
    }

    if body["otp"] == PARTIAL_OTP {
        return (StatusCode::OK, Json(json!({ "refresh": "refresh-v" })));
    }

    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": "Invalid or expired code" })),
    )
}

/// Durable store whose reads take `delay`, as a slow disk would.
pub struct SlowReads {
    inner: Arc<MemoryStore>,
    delay: Duration,
}

#[async_trait]
impl KeyValueStore for SlowReads {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }
}

/// A client wired like production, minus the network lookups.
pub struct TestClient {
    pub app: AppState,
    pub durable: Arc<MemoryStore>,
    pub navigator: Arc<HistoryNavigator>,
}

impl TestClient {
    pub fn new(base_url: &Url, current_path: &str) -> Self {
        Self::with_store(base_url, current_path, Arc::new(MemoryStore::new()))
    }

    /// Fresh lifecycle over an existing durable store (a process restart).
    pub fn with_store(base_url: &Url, current_path: &str, durable: Arc<MemoryStore>) -> Self {
        Self::with_enricher(base_url, current_path, durable, Enricher::disabled())
    }

    /// `durable` is read back directly; the client sees it through reads
    /// delayed by `delay`.
    pub fn with_slow_reads(base_url: &Url, current_path: &str, delay: Duration) -> Self {
        let durable = Arc::new(MemoryStore::new());
        let store = Arc::new(SlowReads {
            inner: durable.clone(),
            delay,
        });
        Self::wire(base_url, current_path, durable, store, Enricher::disabled())
    }

    pub fn with_enricher(
        base_url: &Url,
        current_path: &str,
        durable: Arc<MemoryStore>,
        enricher: Enricher,
    ) -> Self {
        Self::wire(base_url, current_path, durable.clone(), durable, enricher)
    }

    fn wire(
        base_url: &Url,
        current_path: &str,
        durable: Arc<MemoryStore>,
        store: Arc<dyn KeyValueStore>,
        enricher: Enricher,
    ) -> Self {
        let mut config = ClientConfig::new(base_url.clone());
        config.request_timeout = Duration::from_millis(500);

        let navigator = Arc::new(HistoryNavigator::at(current_path));
        let app = AppState::with_enricher(&config, store, navigator.clone(), enricher)
            .expect("client wiring");

        Self {
            app,
            durable,
            navigator,
        }
    }
}
