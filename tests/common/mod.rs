#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{delete, get, post};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;

use console_core::auth::storage::CredentialStore;
use console_core::auth::LoginRedirect;
use console_core::config::{
    AppConfig, Environment, RoutingConfig, ServiceEndpoint, ServicesConfig, TenantConfig,
};
use console_core::console::Console;
use console_core::router::registry::ViewRegistry;
use console_core::types::LoginRequest;

/// Shared state of the in-process SSO mock. Tokens rotate as
/// `token-1`, `token-2`, ... and only the current one authenticates.
pub struct MockState {
    pub current_token: Mutex<Option<String>>,
    pub token_counter: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub menu_calls: AtomicUsize,
    pub fail_refresh: AtomicBool,
    pub fail_profile: AtomicBool,
    pub menu_delay_ms: AtomicU64,
    pub menu: Mutex<Value>,
    /// Authorization headers observed on the bearer-protected endpoint.
    pub seen_auth: Mutex<Vec<String>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            current_token: Mutex::new(None),
            token_counter: AtomicUsize::new(1),
            refresh_calls: AtomicUsize::new(0),
            menu_calls: AtomicUsize::new(0),
            fail_refresh: AtomicBool::new(false),
            fail_profile: AtomicBool::new(false),
            menu_delay_ms: AtomicU64::new(0),
            menu: Mutex::new(json!([
                {
                    "menuCode": "DASH",
                    "menuName": "Dashboard",
                    "routingAddress": "/dashboard",
                    "type": "leaf"
                }
            ])),
            seen_auth: Mutex::new(Vec::new()),
        }
    }
}

impl MockState {
    pub fn current(&self) -> Option<String> {
        self.current_token.lock().unwrap().clone()
    }

    /// Invalidate the client's token without telling it: the next refresh
    /// still succeeds and rotates to a fresh token.
    pub fn expire_current_token(&self) {
        let mut current = self.current_token.lock().unwrap();
        *current = Some("rotated-away".to_string());
    }

    pub fn set_menu(&self, menu: Value) {
        *self.menu.lock().unwrap() = menu;
    }

    fn issue_token(&self) -> String {
        let n = self.token_counter.fetch_add(1, Ordering::SeqCst);
        let token = format!("token-{n}");
        *self.current_token.lock().unwrap() = Some(token.clone());
        token
    }

    fn authenticated(&self, presented: Option<&str>) -> bool {
        match (presented, self.current()) {
            (Some(presented), Some(current)) => presented == current,
            _ => false,
        }
    }
}

pub struct MockBackend {
    pub state: Arc<MockState>,
    pub base_url: String,
}

pub async fn spawn_backend() -> MockBackend {
    let state = Arc::new(MockState::default());
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock backend");
    let addr = listener.local_addr().expect("mock backend address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend");
    });

    MockBackend {
        state,
        base_url: format!("http://{addr}"),
    }
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/sso/web/login", post(login))
        .route("/sso/refresh-token", post(refresh))
        .route("/sso/logout", delete(logout))
        .route("/sso/getStaffMessage", get(staff_message))
        .route("/sso/getMenuMessageList", post(menu_list))
        .route("/sso/getTenantList", get(tenant_list))
        .route("/sso/secure-ping", get(secure_ping))
        .with_state(state)
}

fn envelope(data: Value) -> Json<Value> {
    Json(json!({ "status": 200, "data": data }))
}

fn expired() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "status": 401, "data": null, "message": "token expired" })),
    )
}

fn ca_token(headers: &HeaderMap) -> Option<&str> {
    headers.get("X-Ca-Token").and_then(|v| v.to_str().ok())
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn login(State(state): State<Arc<MockState>>) -> impl IntoResponse {
    let token = state.issue_token();
    envelope(json!(token))
}

async fn refresh(State(state): State<Arc<MockState>>) -> impl IntoResponse {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    // Hold the window open so concurrent 401s pile into one cycle.
    tokio::time::sleep(Duration::from_millis(100)).await;

    if state.fail_refresh.load(Ordering::SeqCst) {
        return Json(json!({ "status": 500, "data": null, "message": "refresh rejected" }));
    }
    let token = state.issue_token();
    envelope(json!(token))
}

async fn logout() -> impl IntoResponse {
    envelope(Value::Null)
}

async fn staff_message(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
) -> axum::response::Response {
    if state.fail_profile.load(Ordering::SeqCst) {
        return Json(json!({ "status": 500, "data": null, "message": "profile unavailable" }))
            .into_response();
    }
    if !state.authenticated(ca_token(&headers)) {
        return expired().into_response();
    }
    envelope(json!({
        "staffJobNumber": "E1001",
        "staffName": "Test Operator",
        "roles": ["admin"]
    }))
    .into_response()
}

async fn menu_list(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
) -> axum::response::Response {
    let delay = state.menu_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if !state.authenticated(ca_token(&headers)) {
        return expired().into_response();
    }
    state.menu_calls.fetch_add(1, Ordering::SeqCst);
    let menu = state.menu.lock().unwrap().clone();
    envelope(menu).into_response()
}

async fn tenant_list(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
) -> axum::response::Response {
    if !state.authenticated(ca_token(&headers)) {
        return expired().into_response();
    }
    envelope(json!([
        { "tenantId": 1, "tenantName": "Default", "current": true }
    ]))
    .into_response()
}

async fn secure_ping(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
) -> axum::response::Response {
    if let Some(auth) = headers.get("Authorization").and_then(|v| v.to_str().ok()) {
        state.seen_auth.lock().unwrap().push(auth.to_string());
    }
    if !state.authenticated(bearer(&headers)) {
        return expired().into_response();
    }
    envelope(json!({ "pong": true })).into_response()
}

/// Redirect sink that records every forced login redirect.
#[derive(Default)]
pub struct RecordingRedirect {
    pub messages: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl LoginRedirect for RecordingRedirect {
    async fn redirect_to_login(&self, message: Option<&str>) {
        self.messages
            .lock()
            .unwrap()
            .push(message.unwrap_or_default().to_string());
    }
}

impl RecordingRedirect {
    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

pub fn test_config(base_url: &str) -> AppConfig {
    AppConfig {
        environment: Environment::Development,
        services: ServicesConfig {
            sso: ServiceEndpoint {
                name: "sso".to_string(),
                base_url: base_url.to_string(),
                timeout_secs: 5,
            },
            sas: ServiceEndpoint {
                name: "sas".to_string(),
                base_url: base_url.to_string(),
                timeout_secs: 5,
            },
        },
        routing: RoutingConfig {
            modularity_address: "console".to_string(),
            generation_timeout_secs: 5,
            public_paths: vec!["/login".to_string()],
            passthrough_prefixes: vec!["/api/".to_string()],
        },
        tenant: TenantConfig { enabled: true },
    }
}

/// Console wired against the mock backend with an isolated credential dir.
/// The returned `TempDir` must stay alive for the duration of the test.
pub fn test_console(
    backend: &MockBackend,
    views: &[&str],
) -> (Console, Arc<RecordingRedirect>, TempDir) {
    test_console_with(backend, views, |_| {})
}

/// Like [`test_console`] but lets the test tweak the config before wiring.
pub fn test_console_with(
    backend: &MockBackend,
    views: &[&str],
    tweak: impl FnOnce(&mut AppConfig),
) -> (Console, Arc<RecordingRedirect>, TempDir) {
    let dir = TempDir::new().expect("temp credential dir");
    let store = Arc::new(CredentialStore::with_dir(dir.path().to_path_buf()));
    let redirect = Arc::new(RecordingRedirect::default());

    let mut config = test_config(&backend.base_url);
    tweak(&mut config);

    let console = Console::with_store(
        config,
        ViewRegistry::new(views.iter().copied()),
        redirect.clone(),
        store,
    )
    .expect("console wiring");

    (console, redirect, dir)
}

pub fn login_request() -> LoginRequest {
    LoginRequest {
        staff_job_number: "E1001".to_string(),
        staff_password: "secret".to_string(),
        remember_me: false,
        ..LoginRequest::default()
    }
}
