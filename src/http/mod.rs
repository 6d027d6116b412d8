//! Per-service HTTP pipelines with bearer injection, envelope unwrapping,
//! and single-flight token refresh on authentication expiry.

pub mod envelope;
pub mod refresh;

use once_cell::sync::OnceCell;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::auth::storage::CredentialStore;
use crate::auth::{LoginRedirect, SESSION_EXPIRED_MESSAGE};
use crate::config::ServiceEndpoint;
use crate::error::ClientError;

use envelope::{ApiEnvelope, ApiResponse};
use refresh::RefreshCoordinator;

/// How credentials are attached to an outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Stored access token as a standard bearer header.
    Bearer,
    /// Explicit token, bypassing the store. Used when a refresh cycle
    /// replays a queued request with the token that cycle obtained.
    Explicit(String),
    /// Bearer-equivalent custom header used by the SSO profile and menu
    /// endpoints.
    CaToken,
    /// No credentials; any ambient token is stripped.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Json,
    Binary,
}

/// One outbound call, self-contained so the refresh coordinator can replay
/// it after a token refresh.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub method: Method,
    pub path: String,
    /// Serialized by repeating the key (`key=a&key=b`); wire contract shared
    /// with the backend services.
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub auth: AuthMode,
    pub response_kind: ResponseKind,
    /// When false the 401 path rejects instead of engaging the refresh
    /// coordinator. Replays and the refresh call itself run with this off.
    pub retry: bool,
}

impl RequestConfig {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            auth: AuthMode::Bearer,
            response_kind: ResponseKind::Json,
            retry: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query_pair(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Array parameter, one `key=value` pair per element.
    pub fn query_repeated<I: IntoIterator<Item = impl ToString>>(
        mut self,
        key: &str,
        values: I,
    ) -> Self {
        for value in values {
            self.query.push((key.to_string(), value.to_string()));
        }
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn auth(mut self, auth: AuthMode) -> Self {
        self.auth = auth;
        self
    }

    pub fn binary(mut self) -> Self {
        self.response_kind = ResponseKind::Binary;
        self
    }

    pub fn no_retry(mut self) -> Self {
        self.retry = false;
        self
    }
}

/// Request/response pipeline bound to one backend service. Cheap to clone;
/// clones share the underlying connection pool and coordinator hook.
#[derive(Clone)]
pub struct ServiceClient {
    name: String,
    base_url: String,
    http: reqwest::Client,
    store: Arc<CredentialStore>,
    redirect: Arc<dyn LoginRedirect>,
    coordinator: Arc<OnceCell<Arc<RefreshCoordinator>>>,
}

impl ServiceClient {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn execute(&self, config: RequestConfig) -> Result<ApiResponse, ClientError> {
        let allow_retry = config.retry;
        self.execute_inner(config, allow_retry).await
    }

    /// Replay path used by the refresh coordinator: never re-enters the
    /// coordinator on a second 401.
    pub(crate) async fn replay(&self, config: RequestConfig) -> Result<ApiResponse, ClientError> {
        self.execute_inner(config, false).await
    }

    async fn execute_inner(
        &self,
        config: RequestConfig,
        allow_retry: bool,
    ) -> Result<ApiResponse, ClientError> {
        let request_id = Uuid::new_v4();
        let url = format!("{}{}", self.base_url, config.path);

        let mut builder = self
            .http
            .request(config.method.clone(), &url)
            .query(&config.query);

        builder = match &config.auth {
            AuthMode::Bearer => match self.store.access_token() {
                Some(token) => builder.header("Authorization", format!("Bearer {token}")),
                None => builder,
            },
            AuthMode::Explicit(token) => builder.header("Authorization", format!("Bearer {token}")),
            AuthMode::CaToken => match self.store.access_token() {
                Some(token) => builder.header("X-Ca-Token", token),
                None => builder,
            },
            AuthMode::None => builder,
        };

        for (key, value) in &config.headers {
            builder = builder.header(key, value);
        }

        if let Some(body) = &config.body {
            builder = builder.json(body);
        }

        tracing::debug!(
            %request_id,
            service = %self.name,
            method = %config.method,
            path = %config.path,
            "dispatching request"
        );

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(%request_id, service = %self.name, "network failure: {err}");
                return Err(ClientError::Network(err));
            }
        };

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            if allow_retry {
                if let Some(coordinator) = self.coordinator.get() {
                    tracing::debug!(%request_id, "token expired, queueing for refresh");
                    return coordinator.retry_with_refresh(config, self).await;
                }
            }
            return Err(ClientError::Unauthorized(extract_message(
                response,
                "token expired",
            )
            .await));
        }

        if status == StatusCode::FORBIDDEN {
            // Refresh exhausted; the session cannot be recovered.
            let message = extract_message(response, "token invalid").await;
            self.redirect
                .redirect_to_login(Some(SESSION_EXPIRED_MESSAGE))
                .await;
            return Err(ClientError::SessionExpired(message));
        }

        if !status.is_success() {
            let message = extract_message(response, status.as_str()).await;
            tracing::error!(%request_id, status = status.as_u16(), "request failed: {message}");
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }

        if config.response_kind == ResponseKind::Binary {
            let bytes = response.bytes().await?;
            return Ok(ApiResponse::Binary(bytes.to_vec()));
        }

        let envelope: ApiEnvelope = response.json().await?;
        envelope.unwrap()
    }
}

/// Best-effort extraction of the envelope message from an error body.
async fn extract_message(response: reqwest::Response, fallback: &str) -> String {
    match response.json::<ApiEnvelope>().await {
        Ok(envelope) => envelope.message.unwrap_or_else(|| fallback.to_string()),
        Err(_) => fallback.to_string(),
    }
}

/// Builds and memoizes one [`ServiceClient`] per named backend service, so
/// repeated requests against the same service share configuration and
/// interceptor state.
pub struct HttpClientFactory {
    store: Arc<CredentialStore>,
    redirect: Arc<dyn LoginRedirect>,
    coordinator: Arc<OnceCell<Arc<RefreshCoordinator>>>,
    clients: Mutex<HashMap<String, ServiceClient>>,
}

impl HttpClientFactory {
    pub fn new(store: Arc<CredentialStore>, redirect: Arc<dyn LoginRedirect>) -> Self {
        Self {
            store,
            redirect,
            coordinator: Arc::new(OnceCell::new()),
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Wire the refresh coordinator once the session layer exists. Until
    /// then a 401 simply rejects.
    pub fn install_coordinator(&self, coordinator: Arc<RefreshCoordinator>) {
        if self.coordinator.set(coordinator).is_err() {
            tracing::warn!("refresh coordinator already installed");
        }
    }

    pub fn get(&self, endpoint: &ServiceEndpoint) -> Result<ServiceClient, ClientError> {
        let mut clients = self.clients.lock().expect("client registry lock poisoned");
        if let Some(client) = clients.get(&endpoint.name) {
            return Ok(client.clone());
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(endpoint.timeout_secs))
            .build()?;

        let client = ServiceClient {
            name: endpoint.name.clone(),
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
            http,
            store: self.store.clone(),
            redirect: self.redirect.clone(),
            coordinator: self.coordinator.clone(),
        };
        clients.insert(endpoint.name.clone(), client.clone());
        tracing::debug!(service = %endpoint.name, base_url = %endpoint.base_url, "service client created");
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_query_keys_serialize_individually() {
        // reqwest serializes a pair list positionally, so an array parameter
        // comes out as key=a&key=b rather than bracket or comma notation.
        let config = RequestConfig::get("/list").query_repeated("id", [1, 2, 3]);
        let keys: Vec<&str> = config.query.iter().map(|(k, _)| k.as_str()).collect();
        let values: Vec<&str> = config.query.iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(keys, vec!["id", "id", "id"]);
        assert_eq!(values, vec!["1", "2", "3"]);
    }

    #[test]
    fn builder_defaults() {
        let config = RequestConfig::post("/sso/web/login");
        assert_eq!(config.auth, AuthMode::Bearer);
        assert_eq!(config.response_kind, ResponseKind::Json);
        assert!(config.retry);
    }
}
