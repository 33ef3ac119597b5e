//! Integration test support for the mini-app storefront.
//!
//! Tests drive the full router in-process with `tower::ServiceExt::oneshot`.
//! The POS system is replaced by [`FakePos`], a small axum server on an
//! ephemeral port that records what it receives.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p miniapp-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use miniapp_storefront::config::StorefrontConfig;
use miniapp_storefront::db::Store;
use miniapp_storefront::routes;
use miniapp_storefront::services::auth;
use miniapp_storefront::state::AppState;

/// Bot token the test context signs launch payloads with.
pub const BOT_TOKEN: &str = "7000000001:integration-test-token";

/// Bearer token the fake POS system issues.
pub const FAKE_POS_TOKEN: &str = "fake-pos-token";

/// Organization id configured for tests.
pub const ORG_ID: &str = "org-test";

// ============================================================================
// Fake POS system
// ============================================================================

/// In-process stand-in for the POS cloud API.
#[derive(Clone)]
pub struct FakePos {
    inner: Arc<FakePosInner>,
}

struct FakePosInner {
    nomenclature: Mutex<Value>,
    pricelists: Mutex<Value>,
    price_items: Mutex<HashMap<String, Value>>,
    deliveries: Mutex<Vec<Value>>,
    fail_deliveries: AtomicBool,
    fail_pricelists: AtomicBool,
    token_requests: AtomicUsize,
}

impl Default for FakePos {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePos {
    /// A POS system with a small two-category menu and one price list.
    #[must_use]
    pub fn new() -> Self {
        let nomenclature = json!({
            "groups": [
                {"id": "g-pizza", "name": "Пицца"},
                {"id": "g-drinks", "name": "Напитки"}
            ],
            "productCategories": [],
            "products": [
                {"id": "margherita", "name": "Маргарита", "parentGroup": "g-pizza",
                 "sizePrices": [{"price": {"currentPrice": 499}}]},
                {"id": "pepperoni", "name": "Пепперони", "parentGroup": "g-pizza",
                 "isIncludedInMenu": false},
                {"id": "lemonade", "name": "Лимонад", "parentGroup": "g-drinks"},
                {"id": "retired", "name": "Снято с меню", "parentGroup": "g-pizza",
                 "isDeleted": true, "sizePrices": [{"price": {"currentPrice": 100}}]},
                {"id": "unpriced", "name": "Без цены", "parentGroup": "g-drinks"}
            ]
        });
        let pricelists = json!({
            "pricelists": [
                {"id": "pl-hall", "name": "Зал"},
                {"id": "pl-delivery", "name": "Доставка"}
            ]
        });
        let price_items = HashMap::from([
            (
                "pl-hall".to_string(),
                json!({"items": [
                    {"productId": "pepperoni", "price": 590},
                    {"productId": "lemonade", "price": 149.5}
                ]}),
            ),
            (
                "pl-delivery".to_string(),
                json!({"items": [
                    {"productId": "pepperoni", "price": 650},
                    {"productId": "lemonade", "price": 160}
                ]}),
            ),
        ]);

        Self {
            inner: Arc::new(FakePosInner {
                nomenclature: Mutex::new(nomenclature),
                pricelists: Mutex::new(pricelists),
                price_items: Mutex::new(price_items),
                deliveries: Mutex::new(Vec::new()),
                fail_deliveries: AtomicBool::new(false),
                fail_pricelists: AtomicBool::new(false),
                token_requests: AtomicUsize::new(0),
            }),
        }
    }

    /// Make delivery creation answer with a server error.
    pub fn fail_deliveries(&self, fail: bool) {
        self.inner.fail_deliveries.store(fail, Ordering::SeqCst);
    }

    /// Make the price list index answer with a server error.
    pub fn fail_pricelists(&self, fail: bool) {
        self.inner.fail_pricelists.store(fail, Ordering::SeqCst);
    }

    /// Replace the nomenclature response.
    pub fn set_nomenclature(&self, nomenclature: Value) {
        *lock(&self.inner.nomenclature) = nomenclature;
    }

    /// Replace the price list index response.
    pub fn set_pricelists(&self, pricelists: Value) {
        *lock(&self.inner.pricelists) = pricelists;
    }

    /// Delivery payloads received so far.
    #[must_use]
    pub fn deliveries(&self) -> Vec<Value> {
        lock(&self.inner.deliveries).clone()
    }

    /// Number of token exchanges performed.
    #[must_use]
    pub fn token_requests(&self) -> usize {
        self.inner.token_requests.load(Ordering::SeqCst)
    }

    /// Serve the fake API on an ephemeral local port.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn spawn(&self) -> SocketAddr {
        let router = Router::new()
            .route("/api/1/access_token", post(access_token))
            .route("/api/1/nomenclature", post(nomenclature))
            .route("/api/1/pricelists", get(pricelists))
            .route("/api/1/pricelists/{id}", get(price_items))
            .route("/api/1/deliveries/create", post(create_delivery))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake POS listener");
        let addr = listener.local_addr().expect("Fake POS has no local address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        addr
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {FAKE_POS_TOKEN}"))
}

async fn access_token(State(pos): State<FakePos>, Json(body): Json<Value>) -> Response {
    pos.inner.token_requests.fetch_add(1, Ordering::SeqCst);
    if body["apiLogin"] == "pos-login" {
        Json(json!({"token": FAKE_POS_TOKEN, "correlationId": "c1"})).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "bad apiLogin").into_response()
    }
}

async fn nomenclature(
    State(pos): State<FakePos>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) || body["organizationId"] != ORG_ID {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(lock(&pos.inner.nomenclature).clone()).into_response()
}

async fn pricelists(State(pos): State<FakePos>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if pos.inner.fail_pricelists.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "price service down").into_response();
    }
    Json(lock(&pos.inner.pricelists).clone()).into_response()
}

async fn price_items(
    State(pos): State<FakePos>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match lock(&pos.inner.price_items).get(&id) {
        Some(items) => Json(items.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn create_delivery(
    State(pos): State<FakePos>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if pos.inner.fail_deliveries.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "terminal offline").into_response();
    }
    let mut deliveries = lock(&pos.inner.deliveries);
    deliveries.push(body);
    Json(json!({"orderInfo": {"id": format!("pos-{}", deliveries.len())}})).into_response()
}

/// An address nothing listens on.
///
/// # Panics
///
/// Panics if no local port can be bound.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind probe listener");
    listener.local_addr().expect("Probe has no local address")
}

// ============================================================================
// Storefront under test
// ============================================================================

/// A storefront wired to a temporary store and, optionally, a POS system.
pub struct TestContext {
    pub state: AppState,
    pub store: Store,
    store_path: PathBuf,
}

impl TestContext {
    /// Storefront in offline mode.
    pub async fn offline() -> Self {
        Self::build(None, &[]).await
    }

    /// Storefront talking to the POS system at `pos`.
    pub async fn with_pos(pos: SocketAddr) -> Self {
        Self::build(Some(pos), &[]).await
    }

    /// Storefront with extra environment overrides.
    ///
    /// # Panics
    ///
    /// Panics if the configuration or the store cannot be loaded.
    pub async fn build(pos: Option<SocketAddr>, overrides: &[(&str, &str)]) -> Self {
        let store_path =
            std::env::temp_dir().join(format!("miniapp-it-{}.json", uuid::Uuid::new_v4()));

        let mut env: HashMap<String, String> = HashMap::from([
            ("BOT_TOKEN".to_string(), BOT_TOKEN.to_string()),
            ("DB_PATH".to_string(), store_path.display().to_string()),
            (
                "STATIC_DIR".to_string(),
                std::env::temp_dir().display().to_string(),
            ),
        ]);
        if let Some(addr) = pos {
            env.insert("POS_API_BASE".to_string(), format!("http://{addr}"));
            env.insert("POS_API_LOGIN".to_string(), "pos-login".to_string());
            env.insert("POS_ORG_ID".to_string(), ORG_ID.to_string());
        }
        for (key, value) in overrides {
            env.insert((*key).to_string(), (*value).to_string());
        }

        let config = StorefrontConfig::from_lookup(|key| env.get(key).cloned())
            .expect("Invalid test configuration");
        let store = Store::open(&store_path)
            .await
            .expect("Failed to open test store");
        let state = AppState::new(config, store.clone());

        Self {
            state,
            store,
            store_path,
        }
    }

    /// Send a request through the full router.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or sent.
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("Failed to build request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = routes::app(self.state.clone())
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    /// POST a JSON body.
    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", path, Some(body)).await
    }

    /// POST raw bytes without a content type.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent or the body is unreadable.
    pub async fn post_raw(&self, path: &str, body: &'static str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .body(Body::from(body))
            .expect("Failed to build request");
        self.send(request).await
    }

    /// GET a path.
    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.request("GET", path, None).await
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.store_path);
    }
}

/// A launch payload signed with [`BOT_TOKEN`] for the given user document.
#[must_use]
pub fn init_data_for(user: &Value) -> String {
    auth::sign_payload(
        &[
            ("query_id", "AAHdF6IQAAAAAN0XohDhrOrc"),
            ("user", &user.to_string()),
            ("auth_date", "1700000000"),
        ],
        &SecretString::from(BOT_TOKEN),
    )
}

/// A launch payload for a typical user.
#[must_use]
pub fn default_init_data() -> String {
    init_data_for(&json!({
        "id": 279_058_397,
        "first_name": "Vlad",
        "last_name": "Kolesnikov",
        "username": "vdkfrost",
        "phone": "+79990001122"
    }))
}
