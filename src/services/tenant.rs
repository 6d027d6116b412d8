use std::sync::Mutex;

use crate::api::sso::SsoApi;
use crate::types::TenantInfo;

#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    #[error("tenant lookup failed: {0}")]
    Lookup(#[from] crate::error::ClientError),
    #[error("no tenants available for this account")]
    NoTenants,
}

/// Optional multi-tenant context. Constructed only when tenancy is enabled
/// in config; load failures are reported to the caller, which decides
/// whether to swallow them (the navigation guard does).
pub struct TenantService {
    sso_api: SsoApi,
    context: Mutex<Option<TenantContext>>,
}

#[derive(Debug, Clone)]
pub struct TenantContext {
    pub current: TenantInfo,
    pub available: Vec<TenantInfo>,
}

impl TenantService {
    pub fn new(sso_api: SsoApi) -> Self {
        Self {
            sso_api,
            context: Mutex::new(None),
        }
    }

    /// Fetch the caller's tenant list and remember the current one.
    pub async fn load_tenant_context(&self) -> Result<TenantContext, TenantError> {
        let tenants = self.sso_api.get_tenant_list().await?;
        if tenants.is_empty() {
            return Err(TenantError::NoTenants);
        }

        let current = tenants
            .iter()
            .find(|tenant| tenant.current)
            .unwrap_or(&tenants[0])
            .clone();

        let context = TenantContext {
            current,
            available: tenants,
        };

        let mut cached = self.context.lock().expect("tenant context lock poisoned");
        *cached = Some(context.clone());

        tracing::debug!(
            tenant = %context.current.tenant_name,
            available = context.available.len(),
            "tenant context loaded"
        );
        Ok(context)
    }

    pub fn current_context(&self) -> Option<TenantContext> {
        self.context
            .lock()
            .expect("tenant context lock poisoned")
            .clone()
    }

    pub fn clear(&self) {
        let mut cached = self.context.lock().expect("tenant context lock poisoned");
        *cached = None;
    }
}
