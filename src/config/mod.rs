use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::database::pool::PoolSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub tenancy: TenancyConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Inputs for tenant resolution and pool bootstrap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    /// Integrated tenant: always present, universal fallback
    pub default_tenant: String,
    /// Tenants checked for credentials at startup
    pub known_tenants: Vec<String>,
    /// Header carrying an explicit tenant override
    pub tenant_header: String,
    /// Literal path prefixes that always map to the default tenant
    pub integrated_prefixes: Vec<String>,
    /// Path prefixes followed by `{id}/`
    pub scoped_prefixes: Vec<String>,
    /// Host labels never treated as a tenant
    pub reserved_subdomains: Vec<String>,
    /// `(needle, tenant)` pairs matched against Origin/Referer. An empty tenant
    /// means the default tenant.
    pub origin_tenants: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub default_pool: PoolSettings,
    pub tenant_pool: PoolSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub enable_audit_logging: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Tenancy overrides
        if let Ok(v) = env::var("TENANCY_DEFAULT_TENANT") {
            if !v.trim().is_empty() {
                self.tenancy.default_tenant = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var("TENANCY_KNOWN_TENANTS") {
            self.tenancy.known_tenants = split_list(&v);
        }
        if let Ok(v) = env::var("TENANCY_HEADER") {
            if !v.trim().is_empty() {
                self.tenancy.tenant_header = v.trim().to_string();
            }
        }

        // Database overrides apply to tenant pools; the default pool keeps its
        // larger sizing unless explicitly raised below it.
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.tenant_pool.max_connections =
                v.parse().unwrap_or(self.database.tenant_pool.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_MIN_CONNECTIONS") {
            self.database.tenant_pool.min_connections =
                v.parse().unwrap_or(self.database.tenant_pool.min_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            if let Ok(secs) = v.parse::<u64>() {
                self.database.default_pool.acquire_timeout = Duration::from_secs(secs);
                self.database.tenant_pool.acquire_timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = env::var("DATABASE_LEAK_DETECTION_MS") {
            if let Ok(ms) = v.parse::<u64>() {
                self.database.default_pool.leak_detection_threshold = Duration::from_millis(ms);
                self.database.tenant_pool.leak_detection_threshold = Duration::from_millis(ms);
            }
        }

        // API overrides
        if let Some(port) = env::var("CMS_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_AUDIT_LOGGING") {
            self.security.enable_audit_logging =
                v.parse().unwrap_or(self.security.enable_audit_logging);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            tenancy: TenancyConfig::default(),
            database: DatabaseConfig::default(),
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                jwt_secret: "dev-secret-change-me".to_string(),
                enable_audit_logging: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            tenancy: TenancyConfig::default(),
            database: DatabaseConfig::default(),
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                enable_audit_logging: true,
            },
        }
    }

    fn production() -> Self {
        let mut database = DatabaseConfig::default();
        database.tenant_pool.leak_detection_threshold = Duration::from_secs(30);
        Self {
            environment: Environment::Production,
            tenancy: TenancyConfig::default(),
            database,
            api: ApiConfig {
                port: 8080,
                enable_request_logging: false,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                enable_audit_logging: true,
            },
        }
    }
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            default_tenant: "integrated_cms".to_string(),
            known_tenants: ["douzone", "service1", "service2", "arpina"]
                .into_iter()
                .map(String::from)
                .collect(),
            tenant_header: "X-Tenant-ID".to_string(),
            integrated_prefixes: vec![
                "/api/v2/integrated-cms/".to_string(),
                "/integrated-cms/".to_string(),
            ],
            scoped_prefixes: vec!["/api/v2/cms/".to_string(), "/scoped/".to_string()],
            reserved_subdomains: vec!["www".to_string(), "api".to_string()],
            origin_tenants: vec![
                ("arpina-cms".to_string(), "arpina".to_string()),
                ("arpina.".to_string(), "arpina".to_string()),
                ("douzone-cms".to_string(), "douzone".to_string()),
                ("douzone.".to_string(), "douzone".to_string()),
                ("localhost:3000".to_string(), String::new()),
                ("admin".to_string(), String::new()),
            ],
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            default_pool: PoolSettings {
                max_connections: 20,
                min_connections: 5,
                ..PoolSettings::default()
            },
            tenant_pool: PoolSettings::default(),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!(
            $crate::config::CONFIG.environment,
            $crate::config::Environment::Production
        )
    };
}
