use serde_json::json;

use crate::error::ClientError;
use crate::http::{AuthMode, RequestConfig, ServiceClient};
use crate::types::{CaptchaInfo, LoginRequest};

/// Login, refresh, and logout against the SSO service. The backend returns
/// one opaque token string, used as both access and refresh credential.
#[derive(Clone)]
pub struct AuthApi {
    client: ServiceClient,
}

impl AuthApi {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<String, ClientError> {
        let config = RequestConfig::post("/sso/web/login")
            .json(serde_json::to_value(request)?)
            .auth(AuthMode::None);
        self.client.execute(config).await?.json()
    }

    /// Exchange the refresh token for a new one. Carries no auth header and
    /// never re-enters the refresh coordinator: a 401 here means the refresh
    /// credential itself is dead.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<String, ClientError> {
        let config = RequestConfig::post("/sso/refresh-token")
            .query_pair("refreshToken", refresh_token)
            .auth(AuthMode::None)
            .no_retry();
        self.client.execute(config).await?.json()
    }

    /// Platform users can swap the session onto another tenant; the response
    /// is a fresh token scoped to it.
    pub async fn switch_tenant(&self, tenant_id: i64) -> Result<String, ClientError> {
        let config = RequestConfig::post("/sso/switch-tenant").query_pair("tenantId", tenant_id);
        self.client.execute(config).await?.json()
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let config = RequestConfig::delete("/sso/logout");
        self.client.execute(config).await?;
        Ok(())
    }

    pub async fn get_captcha(&self) -> Result<CaptchaInfo, ClientError> {
        let config = RequestConfig::get("/sso/getCaptcha").auth(AuthMode::None);
        self.client.execute(config).await?.json()
    }

    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ClientError> {
        let config = RequestConfig::post("/sso/changePassword")
            .json(json!({
                "oldPassword": old_password,
                "newPassword": new_password,
                "confirmPassword": new_password,
            }))
            .auth(AuthMode::CaToken);
        self.client.execute(config).await?;
        Ok(())
    }
}
