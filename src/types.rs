//! Shared wire types exchanged with the SSO and system-administration
//! services. The backends speak camelCase JSON.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub staff_job_number: String,
    pub staff_password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captcha_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captcha: Option<String>,
    /// Optional multi-tenant selector; included only when provided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<i64>,
    /// Client-side only: chooses the durable credential tier.
    #[serde(skip)]
    pub remember_me: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub staff_job_number: String,
    #[serde(default)]
    pub staff_name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptchaInfo {
    pub captcha_id: String,
    /// Base64-encoded captcha image.
    pub captcha: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantInfo {
    pub tenant_id: i64,
    pub tenant_name: String,
    #[serde(default)]
    pub current: bool,
}
