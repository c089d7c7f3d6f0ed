//! Tenant resolution from inbound requests.
//!
//! Strategies run in fixed priority and the first one producing a valid
//! [`TenantId`] wins:
//!
//! 1. explicit header override (`X-Tenant-ID` by default)
//! 2. URL path prefix (integrated prefixes, then `{scoped}/{id}/...`)
//! 3. Host subdomain label, minus reserved labels
//! 4. `Origin` / `Referer` substring table
//!
//! Explicit signals outrank inferred ones so a forged Host header cannot
//! override a tenant named in the path or header. When nothing matches the
//! configured default tenant is returned; resolution never fails.

use axum::http::{header, HeaderMap, Request};
use serde::Serialize;
use std::net::IpAddr;
use tracing::{debug, warn};

use super::id::{TenantId, TenantIdError};
use crate::config::TenancyConfig;

/// Which strategy produced a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Header,
    Path,
    Subdomain,
    Origin,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub tenant: TenantId,
    pub source: ResolutionSource,
}

#[derive(Debug, Clone)]
pub struct TenantResolver {
    default_tenant: TenantId,
    header_name: String,
    integrated_prefixes: Vec<String>,
    scoped_prefixes: Vec<String>,
    reserved_subdomains: Vec<String>,
    origin_table: Vec<(String, TenantId)>,
}

impl TenantResolver {
    pub fn new(config: &TenancyConfig) -> Result<Self, TenantIdError> {
        let default_tenant = TenantId::parse(&config.default_tenant)?;

        let origin_table = config
            .origin_tenants
            .iter()
            .filter_map(|(needle, tenant)| {
                if tenant.trim().is_empty() {
                    return Some((needle.clone(), default_tenant.clone()));
                }
                match TenantId::parse(tenant) {
                    Ok(id) => Some((needle.clone(), id)),
                    Err(e) => {
                        warn!("Ignoring origin mapping '{}': {}", needle, e);
                        None
                    }
                }
            })
            .collect();

        Ok(Self {
            default_tenant,
            header_name: config.tenant_header.clone(),
            integrated_prefixes: config.integrated_prefixes.clone(),
            scoped_prefixes: config.scoped_prefixes.clone(),
            reserved_subdomains: config
                .reserved_subdomains
                .iter()
                .map(|label| label.to_ascii_lowercase())
                .collect(),
            origin_table,
        })
    }

    pub fn default_tenant(&self) -> &TenantId {
        &self.default_tenant
    }

    pub fn resolve_request<B>(&self, request: &Request<B>) -> Resolution {
        self.resolve(request.headers(), request.uri().path())
    }

    pub fn resolve(&self, headers: &HeaderMap, path: &str) -> Resolution {
        let found = self
            .from_header(headers)
            .map(|t| (t, ResolutionSource::Header))
            .or_else(|| self.from_path(path).map(|t| (t, ResolutionSource::Path)))
            .or_else(|| self.from_host(headers).map(|t| (t, ResolutionSource::Subdomain)))
            .or_else(|| self.from_origin(headers).map(|t| (t, ResolutionSource::Origin)));

        if let Some((tenant, source)) = found {
            debug!("Tenant '{}' resolved from {:?} for path {}", tenant, source, path);
            return Resolution { tenant, source };
        }

        debug!("No tenant signal for path {}, using default '{}'", path, self.default_tenant);
        Resolution {
            tenant: self.default_tenant.clone(),
            source: ResolutionSource::Default,
        }
    }

    fn from_header(&self, headers: &HeaderMap) -> Option<TenantId> {
        let value = headers.get(self.header_name.as_str())?;
        let raw = match value.to_str() {
            Ok(raw) => raw,
            Err(_) => {
                debug!("Non-ASCII {} header ignored", self.header_name);
                return None;
            }
        };
        TenantId::parse(raw).ok()
    }

    fn from_path(&self, path: &str) -> Option<TenantId> {
        if self
            .integrated_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return Some(self.default_tenant.clone());
        }

        self.scoped_prefixes.iter().find_map(|prefix| {
            let rest = path.strip_prefix(prefix.as_str())?;
            // `{id}` must be followed by another segment: `/scoped/{id}/...`
            let (segment, _) = rest.split_once('/')?;
            TenantId::parse(segment).ok()
        })
    }

    fn from_host(&self, headers: &HeaderMap) -> Option<TenantId> {
        let host = headers.get(header::HOST)?.to_str().ok()?;
        let host = strip_port(host.trim());
        if host.parse::<IpAddr>().is_ok() {
            return None;
        }

        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() <= 2 {
            return None;
        }
        let candidate = labels[0];
        if self
            .reserved_subdomains
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(candidate))
        {
            return None;
        }
        TenantId::parse(candidate).ok()
    }

    fn from_origin(&self, headers: &HeaderMap) -> Option<TenantId> {
        let origin = headers
            .get(header::ORIGIN)
            .or_else(|| headers.get(header::REFERER))?
            .to_str()
            .ok()?;

        self.origin_table
            .iter()
            .find(|(needle, _)| origin.contains(needle.as_str()))
            .map(|(_, tenant)| tenant.clone())
    }
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literals keep their colons.
    if host.starts_with('[') {
        return host
            .split_once(']')
            .map(|(addr, _)| addr.trim_start_matches('['))
            .unwrap_or(host);
    }
    host.rsplit_once(':').map(|(name, _)| name).unwrap_or(host)
}
