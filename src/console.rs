//! Composition root: wires the credential store, HTTP client factory, user
//! session, refresh coordinator, and navigation guard together.

use std::sync::Arc;

use crate::api::auth::AuthApi;
use crate::api::sso::SsoApi;
use crate::auth::storage::CredentialStore;
use crate::auth::{LoginRedirect, UserSession};
use crate::config::AppConfig;
use crate::error::ClientError;
use crate::http::refresh::RefreshCoordinator;
use crate::http::HttpClientFactory;
use crate::router::guard::NavigationGuard;
use crate::router::registry::ViewRegistry;
use crate::services::tenant::TenantService;

pub struct Console {
    pub config: AppConfig,
    pub store: Arc<CredentialStore>,
    pub factory: Arc<HttpClientFactory>,
    pub session: Arc<UserSession>,
    pub guard: Arc<NavigationGuard>,
}

impl Console {
    /// Wire against the default credential store (config-dir backed).
    pub fn new(
        config: AppConfig,
        registry: ViewRegistry,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self, ClientError> {
        let store = Arc::new(CredentialStore::new()?);
        Self::with_store(config, registry, redirect, store)
    }

    /// Wire with an explicit store (tests, embedded hosts).
    pub fn with_store(
        config: AppConfig,
        registry: ViewRegistry,
        redirect: Arc<dyn LoginRedirect>,
        store: Arc<CredentialStore>,
    ) -> Result<Self, ClientError> {
        let factory = Arc::new(HttpClientFactory::new(store.clone(), redirect.clone()));

        let sso_client = factory.get(&config.services.sso)?;
        let auth_api = AuthApi::new(sso_client.clone());
        let sso_api = SsoApi::new(sso_client);

        let session = Arc::new(UserSession::new(
            store.clone(),
            auth_api,
            sso_api.clone(),
        ));

        // The session performs the refresh; every 401 across every service
        // pipeline funnels into this one coordinator.
        let coordinator = Arc::new(RefreshCoordinator::new(
            session.clone(),
            store.clone(),
            redirect.clone(),
        ));
        factory.install_coordinator(coordinator);

        let tenant = config
            .tenant
            .enabled
            .then(|| TenantService::new(sso_api.clone()));

        let guard = Arc::new(NavigationGuard::new(
            session.clone(),
            sso_api,
            tenant,
            Arc::new(registry),
            config.routing.clone(),
        ));

        Ok(Self {
            config,
            store,
            factory,
            session,
            guard,
        })
    }
}
