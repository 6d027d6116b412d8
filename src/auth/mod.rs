pub mod storage;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::api::auth::AuthApi;
use crate::api::sso::SsoApi;
use crate::error::ClientError;
use crate::http::refresh::TokenRefresher;
use crate::types::{LoginRequest, UserInfo};

use storage::CredentialStore;

/// Collaborator performing the hard navigation back to the login entry
/// point. The hosting shell owns what "navigate" means; the core only
/// triggers it, optionally with a user-facing message.
#[async_trait]
pub trait LoginRedirect: Send + Sync {
    async fn redirect_to_login(&self, message: Option<&str>);
}

/// Redirect sink for headless hosts: records the intent in the log stream.
pub struct TracingRedirect;

#[async_trait]
impl LoginRedirect for TracingRedirect {
    async fn redirect_to_login(&self, message: Option<&str>) {
        tracing::warn!(
            message = message.unwrap_or_default(),
            "redirecting to login"
        );
    }
}

pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired, please sign in again";

/// Login, logout, refresh, and profile state for the signed-in user.
/// Credentials themselves live in the [`CredentialStore`]; this type is the
/// only mutator besides the refresh coordinator's patched replays.
pub struct UserSession {
    store: Arc<CredentialStore>,
    auth_api: AuthApi,
    sso_api: SsoApi,
    user_info: RwLock<Option<UserInfo>>,
}

impl UserSession {
    pub fn new(store: Arc<CredentialStore>, auth_api: AuthApi, sso_api: SsoApi) -> Self {
        Self {
            store,
            auth_api,
            sso_api,
            user_info: RwLock::new(None),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.store.access_token().is_some()
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Authenticate and persist the returned token. The backend issues a
    /// single token serving as both access and refresh credential.
    pub async fn login(&self, request: &LoginRequest) -> Result<(), ClientError> {
        let token = self.auth_api.login(request).await?;
        self.store.set(&token, &token, request.remember_me)?;
        tracing::info!(staff = %request.staff_job_number, "login succeeded");
        Ok(())
    }

    /// Fetch and cache the signed-in user's profile.
    pub async fn get_user_info(&self) -> Result<UserInfo, ClientError> {
        let info = self.sso_api.get_staff_message().await?;
        if info.staff_job_number.is_empty() {
            return Err(ClientError::Unauthorized(
                "verification failed, please sign in again".to_string(),
            ));
        }
        let mut cached = self.user_info.write().await;
        *cached = Some(info.clone());
        Ok(info)
    }

    /// Load the profile if it is missing or has no role data yet.
    pub async fn ensure_user_info(&self) -> Result<(), ClientError> {
        let missing = {
            let cached = self.user_info.read().await;
            cached.as_ref().map_or(true, |info| info.roles.is_empty())
        };
        if missing {
            self.get_user_info().await?;
        }
        Ok(())
    }

    pub async fn cached_user_info(&self) -> Option<UserInfo> {
        self.user_info.read().await.clone()
    }

    /// Exchange the session for a different tenant's token.
    pub async fn switch_tenant(&self, tenant_id: i64) -> Result<(), ClientError> {
        let token = self.auth_api.switch_tenant(tenant_id).await?;
        self.store.set(&token, &token, self.store.remember_me())?;
        Ok(())
    }

    /// End the session. The server-side logout is best-effort; local
    /// credentials are cleared regardless.
    pub async fn logout(&self) -> Result<(), ClientError> {
        if let Err(err) = self.auth_api.logout().await {
            tracing::warn!("server-side logout failed: {err}");
        }
        self.reset_user_state().await
    }

    /// Clear credentials and the cached profile. Route state is owned by the
    /// navigation guard and reset there.
    pub async fn reset_user_state(&self) -> Result<(), ClientError> {
        self.store.clear()?;
        let mut cached = self.user_info.write().await;
        *cached = None;
        Ok(())
    }
}

#[async_trait]
impl TokenRefresher for UserSession {
    async fn refresh_token(&self) -> Result<(), ClientError> {
        let refresh = self
            .store
            .refresh_token()
            .ok_or_else(|| ClientError::Unauthorized("no refresh token available".to_string()))?;

        let token = self.auth_api.refresh_token(&refresh).await?;
        self.store.set(&token, &token, self.store.remember_me())?;
        tracing::debug!("token refreshed");
        Ok(())
    }
}
