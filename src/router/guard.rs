//! Per-navigation guard: authentication gating, one-time route
//! materialization, zero-match recovery, and the fatal-error escape hatch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use crate::api::sso::SsoApi;
use crate::auth::UserSession;
use crate::config::RoutingConfig;
use crate::error::ClientError;
use crate::router::materializer::{transform_routes, validate_routes};
use crate::router::registry::{ViewHandle, ViewRegistry};
use crate::router::{MenuNode, RouteComponent, RouteMeta, RouteNode};
use crate::services::tenant::TenantService;

/// Where the guard's state machine currently sits. Derived, not stored: the
/// credential store and the generation flag are the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Anonymous,
    RoutesPending,
    RoutesReady,
}

/// Verdict for one navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Allow,
    Redirect(String),
}

pub struct NavigationGuard {
    session: Arc<UserSession>,
    sso_api: SsoApi,
    tenant: Option<TenantService>,
    registry: Arc<ViewRegistry>,
    routing: RoutingConfig,
    table: RwLock<Vec<RouteNode>>,
    issues: Mutex<Vec<String>>,
    generated: AtomicBool,
    /// Serializes generation attempts so a navigation arriving mid-install
    /// waits instead of observing a half-built table.
    generation: tokio::sync::Mutex<()>,
}

impl NavigationGuard {
    pub fn new(
        session: Arc<UserSession>,
        sso_api: SsoApi,
        tenant: Option<TenantService>,
        registry: Arc<ViewRegistry>,
        routing: RoutingConfig,
    ) -> Self {
        Self {
            session,
            sso_api,
            tenant,
            registry,
            routing,
            table: RwLock::new(constant_routes()),
            issues: Mutex::new(Vec::new()),
            generated: AtomicBool::new(false),
            generation: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> GuardState {
        if !self.session.is_logged_in() {
            GuardState::Anonymous
        } else if self.generated.load(Ordering::SeqCst) {
            GuardState::RoutesReady
        } else {
            GuardState::RoutesPending
        }
    }

    pub fn is_route_generated(&self) -> bool {
        self.generated.load(Ordering::SeqCst)
    }

    /// Issues collected by validation during the last installation.
    pub fn validation_issues(&self) -> Vec<String> {
        self.issues.lock().expect("issues lock poisoned").clone()
    }

    /// Snapshot of the installed route table.
    pub fn routes(&self) -> Vec<RouteNode> {
        self.table.read().expect("route table lock poisoned").clone()
    }

    /// Run the guard for one navigation attempt. Never panics the
    /// navigation pipeline: any unhandled failure resets all session state
    /// and lands on the login page.
    pub async fn handle_navigation(&self, to: &str) -> NavigationOutcome {
        match self.try_navigation(to).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!("navigation guard failure: {err}");
                self.reset_all_state().await;
                NavigationOutcome::Redirect("/login".to_string())
            }
        }
    }

    async fn try_navigation(&self, to: &str) -> Result<NavigationOutcome, ClientError> {
        let path = strip_query(to);

        if !self.session.is_logged_in() {
            if self.routing.public_paths.iter().any(|p| p == path) {
                return Ok(NavigationOutcome::Allow);
            }
            let encoded: String = url::form_urlencoded::byte_serialize(to.as_bytes()).collect();
            return Ok(NavigationOutcome::Redirect(format!(
                "/login?redirect={encoded}"
            )));
        }

        // Authenticated users never see the login form.
        if path == "/login" {
            return Ok(NavigationOutcome::Redirect("/".to_string()));
        }

        if !self.generated.load(Ordering::SeqCst) {
            self.session.ensure_user_info().await?;
            self.init_tenant_context().await;
            self.generate_routes().await?;
            // Fall through: the navigation re-resolves against the
            // now-complete table.
        }

        if !self.matches(path) {
            tracing::warn!(path, "navigation matched no installed route");

            // Possibly transient: the generation flag may have been reset by
            // a failed or timed-out attempt. Exactly one regeneration cycle.
            if !self.generated.load(Ordering::SeqCst) {
                match self.generate_routes().await {
                    Ok(()) => {
                        if self.matches(path) {
                            return Ok(NavigationOutcome::Allow);
                        }
                    }
                    Err(err) => {
                        tracing::error!("route regeneration failed: {err}");
                    }
                }
            }

            // Non-navigational browser requests are not user-facing 404s.
            if self
                .routing
                .passthrough_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
                || path.contains("favicon")
            {
                tracing::debug!(path, "passing through non-navigational request");
                return Ok(NavigationOutcome::Allow);
            }

            return Ok(NavigationOutcome::Redirect("/404".to_string()));
        }

        Ok(NavigationOutcome::Allow)
    }

    /// Fetch the menu and install the materialized routes. Applies the
    /// generation timeout; on any failure the table falls back to the
    /// constant routes and the flag resets so a later navigation can retry.
    pub async fn generate_routes(&self) -> Result<(), ClientError> {
        let _permit = self.generation.lock().await;
        if self.generated.load(Ordering::SeqCst) {
            // A concurrent navigation finished the work while we waited.
            return Ok(());
        }

        let started = Instant::now();
        match self.fetch_and_install().await {
            Ok(count) => {
                tracing::info!(
                    routes = count,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "dynamic routes generated"
                );
                Ok(())
            }
            Err(err) => {
                self.generated.store(false, Ordering::SeqCst);
                let mut table = self.table.write().expect("route table lock poisoned");
                *table = constant_routes();
                Err(err)
            }
        }
    }

    async fn fetch_and_install(&self) -> Result<usize, ClientError> {
        let timeout = Duration::from_secs(self.routing.generation_timeout_secs);
        let nodes = tokio::time::timeout(
            timeout,
            self.sso_api
                .get_menu_message_list(&self.routing.modularity_address),
        )
        .await
        .map_err(|_| {
            ClientError::RouteGeneration(format!(
                "menu fetch aborted after {}s",
                timeout.as_secs()
            ))
        })??;

        tracing::debug!(menus = nodes.len(), "menu data received");

        let valid: Vec<MenuNode> = nodes
            .into_iter()
            .filter(|node| {
                let has_address = node
                    .routing_address
                    .as_deref()
                    .map_or(false, |address| !address.is_empty());
                if !has_address {
                    tracing::warn!(menu = %node.menu_code, "skipping menu node without routing address");
                }
                has_address
            })
            .collect();

        let dynamic = transform_routes(&valid, true, &self.registry);

        let validation = validate_routes(&dynamic);
        if !validation.is_valid {
            tracing::warn!(issues = ?validation.issues, "route validation found issues");
        }

        let count = dynamic.len();
        {
            let mut table = self.table.write().expect("route table lock poisoned");
            let mut routes = constant_routes();
            routes.extend(dynamic);
            *table = routes;
        }
        {
            let mut issues = self.issues.lock().expect("issues lock poisoned");
            *issues = validation.issues;
        }
        self.generated.store(true, Ordering::SeqCst);
        Ok(count)
    }

    /// Best-effort multi-tenant context. Absence of tenancy must never block
    /// navigation, so failures are swallowed here, at the call site.
    async fn init_tenant_context(&self) {
        let Some(tenant) = &self.tenant else { return };
        if let Err(err) = tenant.load_tenant_context().await {
            tracing::debug!("tenant context unavailable: {err}");
        }
    }

    fn matches(&self, path: &str) -> bool {
        let table = self.table.read().expect("route table lock poisoned");
        routes_match(&table, "", path)
    }

    /// Remove dynamic routes and clear the generation flag; the table goes
    /// back to exactly the constant set.
    pub fn reset_routes(&self) {
        let mut table = self.table.write().expect("route table lock poisoned");
        *table = constant_routes();
        drop(table);
        let mut issues = self.issues.lock().expect("issues lock poisoned");
        issues.clear();
        drop(issues);
        self.generated.store(false, Ordering::SeqCst);
    }

    /// Full reset: credentials, cached profile, route table, generation
    /// flag. Used on logout and as the fatal-error escape hatch.
    pub async fn reset_all_state(&self) {
        if let Err(err) = self.session.reset_user_state().await {
            tracing::warn!("failed to clear credentials during reset: {err}");
        }
        self.reset_routes();
    }
}

/// Static routes present regardless of authentication or menu content.
fn constant_routes() -> Vec<RouteNode> {
    vec![
        RouteNode {
            path: "/".to_string(),
            name: "Root".to_string(),
            component: Some(RouteComponent::Layout),
            meta: RouteMeta::default(),
            children: Vec::new(),
        },
        RouteNode {
            path: "/login".to_string(),
            name: "Login".to_string(),
            component: Some(RouteComponent::View(ViewHandle::new("login"))),
            meta: RouteMeta {
                title: "Login".to_string(),
                hidden: true,
                ..RouteMeta::default()
            },
            children: Vec::new(),
        },
        RouteNode {
            path: "/404".to_string(),
            name: "NotFound".to_string(),
            component: Some(RouteComponent::NotFound),
            meta: RouteMeta {
                title: "Not Found".to_string(),
                hidden: true,
                ..RouteMeta::default()
            },
            children: Vec::new(),
        },
    ]
}

fn strip_query(to: &str) -> &str {
    to.split(['?', '#']).next().unwrap_or(to)
}

/// True when any installed route's full path equals `target`. Child paths
/// may be absolute or relative to their parent.
fn routes_match(routes: &[RouteNode], parent: &str, target: &str) -> bool {
    routes.iter().any(|route| {
        let full = join_paths(parent, &route.path);
        full == target || routes_match(&route.children, &full, target)
    })
}

fn join_paths(parent: &str, child: &str) -> String {
    if child.starts_with('/') || parent.is_empty() {
        child.to_string()
    } else if parent.ends_with('/') {
        format!("{parent}{child}")
    } else {
        format!("{parent}/{child}")
    }
}
