//! Per-request tenant bracket.
//!
//! Resolves the tenant, attaches a [`RequestContext`] to the request and runs
//! the rest of the stack inside [`TenantContext::scope`], so the tenant is
//! bound exactly as long as the request future lives. Completion, error
//! responses, panics and client disconnects all end the scope.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use std::net::SocketAddr;
use tracing::Instrument;

use super::principal::request_principal;
use crate::app::AppState;
use crate::auth::{Principal, Role};
use crate::tenant::{ResolutionSource, TenantContext, TenantId};

/// Who is asking, for which tenant, from where. Lives in request extensions
/// only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    pub tenant: TenantId,
    pub source: ResolutionSource,
    pub principal: Option<String>,
    pub role: Option<Role>,
    pub client_ip: Option<String>,
    pub resource: String,
}

impl RequestContext {
    pub fn new(
        tenant: TenantId,
        source: ResolutionSource,
        principal: Option<&Principal>,
        client_ip: Option<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            tenant,
            source,
            principal: principal.map(|p| p.username.clone()),
            role: principal.and_then(Principal::effective_role),
            client_ip,
            resource: resource.into(),
        }
    }

    /// Single-line summary for log records
    pub fn log_context(&self) -> String {
        format!(
            "tenant={} user={} role={} ip={} resource={}",
            self.tenant,
            self.principal.as_deref().unwrap_or("anonymous"),
            self.role.map_or("NONE", Role::as_str),
            self.client_ip.as_deref().unwrap_or("unknown"),
            self.resource
        )
    }
}

pub async fn tenant_context_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let resolution = state.resolver.resolve_request(&request);
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let context = RequestContext::new(
        resolution.tenant.clone(),
        resolution.source,
        request_principal(&request),
        client_ip(request.headers()).or(peer),
        request.uri().path(),
    );

    tracing::debug!("Request context: {}", context.log_context());
    let span = tracing::info_span!("tenant", id = %context.tenant);
    request.extensions_mut().insert(context);

    TenantContext::scope(resolution.tenant, next.run(request))
        .instrument(span)
        .await
}

/// First hop of `X-Forwarded-For`, then `X-Real-IP`
fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    forwarded
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
        })
        .map(str::to_string)
}
