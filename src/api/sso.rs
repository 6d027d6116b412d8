use serde_json::json;

use crate::error::ClientError;
use crate::http::{AuthMode, RequestConfig, ServiceClient};
use crate::router::MenuNode;
use crate::types::{TenantInfo, UserInfo};

/// Profile, menu, and tenant lookups on the SSO service. These endpoints
/// authenticate through the bearer-equivalent `X-Ca-Token` header rather
/// than a standard bearer header.
#[derive(Clone)]
pub struct SsoApi {
    client: ServiceClient,
}

impl SsoApi {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    pub async fn get_staff_message(&self) -> Result<UserInfo, ClientError> {
        let config = RequestConfig::get("/sso/getStaffMessage").auth(AuthMode::CaToken);
        self.client.execute(config).await?.json()
    }

    /// Menu tree for the signed-in user, scoped to one modularity address.
    /// Input to route materialization.
    pub async fn get_menu_message_list(
        &self,
        modularity_address: &str,
    ) -> Result<Vec<MenuNode>, ClientError> {
        let config = RequestConfig::post("/sso/getMenuMessageList")
            .json(json!({ "modularityAddress": modularity_address }))
            .auth(AuthMode::CaToken);
        self.client.execute(config).await?.json()
    }

    pub async fn get_tenant_list(&self) -> Result<Vec<TenantInfo>, ClientError> {
        let config = RequestConfig::get("/sso/getTenantList").auth(AuthMode::CaToken);
        self.client.execute(config).await?.json()
    }
}
