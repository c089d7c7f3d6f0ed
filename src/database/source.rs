//! Where tenant database credentials come from.

use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::registry::PoolError;
use crate::tenant::TenantId;

/// Connection coordinates for one tenant database
#[derive(Clone, Deserialize)]
pub struct DataSourceConfig {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl DataSourceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub(crate) fn connect_options(&self, tenant: &TenantId) -> Result<PgConnectOptions, PoolError> {
        let mut options =
            PgConnectOptions::from_str(&self.url).map_err(|e| PoolError::InvalidUrl {
                tenant: tenant.clone(),
                reason: e.to_string(),
            })?;
        if let Some(username) = &self.username {
            options = options.username(username);
        }
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        Ok(options)
    }

    /// URL safe for logs: any embedded password is masked
    pub fn redacted_url(&self) -> String {
        match url::Url::parse(&self.url) {
            Ok(mut parsed) => {
                if parsed.password().is_some() {
                    let _ = parsed.set_password(Some("***"));
                }
                parsed.to_string()
            }
            Err(_) => "<unparseable url>".to_string(),
        }
    }
}

impl fmt::Debug for DataSourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceConfig")
            .field("url", &self.redacted_url())
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Resolves a tenant id to its data source, if one is configured.
///
/// Called synchronously from request paths the first time a tenant is seen,
/// so implementations must answer from memory or the environment and never
/// wait on the network.
pub trait DataSourceLookup: Send + Sync {
    fn lookup(&self, tenant: &TenantId) -> Option<DataSourceConfig>;
}

type EnvReader = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads `{TENANT}_DATASOURCE_URL`, `{TENANT}_DB_USERNAME` and
/// `{TENANT}_DB_PASSWORD`.
///
/// All three are required for ordinary tenants. The default tenant may omit
/// them: its URL falls back to `DATABASE_URL` and credentials may be embedded
/// in the URL.
pub struct EnvDataSources {
    default_tenant: TenantId,
    read: EnvReader,
}

impl EnvDataSources {
    pub fn new(default_tenant: TenantId) -> Self {
        Self::with_reader(default_tenant, |key| {
            std::env::var(key).ok().filter(|v| !v.trim().is_empty())
        })
    }

    /// Use a custom variable reader instead of the process environment
    pub fn with_reader<F>(default_tenant: TenantId, read: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            default_tenant,
            read: Box::new(read),
        }
    }
}

impl DataSourceLookup for EnvDataSources {
    fn lookup(&self, tenant: &TenantId) -> Option<DataSourceConfig> {
        let prefix = tenant.env_prefix();
        let url = (self.read)(&format!("{}_DATASOURCE_URL", prefix));
        let username = (self.read)(&format!("{}_DB_USERNAME", prefix));
        let password = (self.read)(&format!("{}_DB_PASSWORD", prefix));

        if *tenant == self.default_tenant {
            let url = url.or_else(|| (self.read)("DATABASE_URL"))?;
            return Some(DataSourceConfig {
                url,
                username,
                password,
            });
        }

        match (url, username, password) {
            (Some(url), Some(username), Some(password)) => {
                Some(DataSourceConfig::new(url).with_credentials(username, password))
            }
            _ => {
                tracing::debug!("Environment variables not found for tenant: {}", tenant);
                None
            }
        }
    }
}

/// Fixed in-memory table, mainly for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct StaticDataSources {
    sources: HashMap<TenantId, DataSourceConfig>,
}

impl StaticDataSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tenant: TenantId, source: DataSourceConfig) -> Self {
        self.sources.insert(tenant, source);
        self
    }
}

impl DataSourceLookup for StaticDataSources {
    fn lookup(&self, tenant: &TenantId) -> Option<DataSourceConfig> {
        self.sources.get(tenant).cloned()
    }
}
