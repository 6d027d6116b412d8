use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub services: ServicesConfig,
    pub routing: RoutingConfig,
    pub tenant: TenantConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// One entry per named backend microservice the console talks to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub name: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// SSO single sign-on service (login, refresh, profile, menu).
    pub sso: ServiceEndpoint,
    /// System-administration service.
    pub sas: ServiceEndpoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Menu scope requested from the backend when materializing routes.
    pub modularity_address: String,
    /// Hard cap on one route-generation attempt; on expiry the menu fetch is
    /// aborted and no partial route table is installed.
    pub generation_timeout_secs: u64,
    /// Paths reachable without authentication.
    pub public_paths: Vec<String>,
    /// Unmatched navigations under these prefixes are browser plumbing, not
    /// user-facing 404s; they pass through untouched.
    pub passthrough_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("CONSOLE_SSO_BASE_URL") {
            self.services.sso.base_url = v;
        }
        if let Ok(v) = env::var("CONSOLE_SAS_BASE_URL") {
            self.services.sas.base_url = v;
        }
        if let Ok(v) = env::var("CONSOLE_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse() {
                self.services.sso.timeout_secs = secs;
                self.services.sas.timeout_secs = secs;
            }
        }
        if let Ok(v) = env::var("CONSOLE_MODULARITY_ADDRESS") {
            self.routing.modularity_address = v;
        }
        if let Ok(v) = env::var("CONSOLE_ROUTE_TIMEOUT_SECS") {
            self.routing.generation_timeout_secs =
                v.parse().unwrap_or(self.routing.generation_timeout_secs);
        }
        if let Ok(v) = env::var("CONSOLE_TENANT_ENABLED") {
            self.tenant.enabled = v.parse().unwrap_or(self.tenant.enabled);
        }

        self
    }

    fn base(environment: Environment, sso_url: &str, sas_url: &str, timeout_secs: u64) -> Self {
        Self {
            environment,
            services: ServicesConfig {
                sso: ServiceEndpoint {
                    name: "sso".to_string(),
                    base_url: sso_url.to_string(),
                    timeout_secs,
                },
                sas: ServiceEndpoint {
                    name: "sas".to_string(),
                    base_url: sas_url.to_string(),
                    timeout_secs,
                },
            },
            routing: RoutingConfig {
                modularity_address: "console".to_string(),
                generation_timeout_secs: 15,
                public_paths: vec!["/login".to_string()],
                passthrough_prefixes: vec!["/api/".to_string()],
            },
            tenant: TenantConfig { enabled: false },
        }
    }

    fn development() -> Self {
        Self::base(Environment::Development, "http://localhost:8080/api", "http://localhost:8081/api", 50)
    }

    fn staging() -> Self {
        let mut config = Self::base(
            Environment::Staging,
            "https://staging.example.com/api",
            "https://staging.example.com/api",
            30,
        );
        config.tenant.enabled = true;
        config
    }

    fn production() -> Self {
        let mut config = Self::base(
            Environment::Production,
            "https://app.example.com/api",
            "https://app.example.com/api",
            30,
        );
        config.tenant.enabled = true;
        config
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
