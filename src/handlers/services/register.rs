// handlers/services/register.rs - POST /api/v2/integrated-cms/services/:id handler

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;

use super::{blocking, require, ServiceInfo};
use crate::app::AppState;
use crate::auth::{PermissionEvaluator, Principal};
use crate::database::DataSourceConfig;
use crate::middleware::{ApiResponse, ApiResult};
use crate::tenant::TenantId;

#[derive(Debug, Deserialize)]
pub struct RegisterService {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Create a pool from explicit credentials. Registering a tenant that
/// already has a pool returns the existing one.
pub async fn service_register(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    Path(id): Path<String>,
    body: Result<Json<RegisterService>, JsonRejection>,
) -> ApiResult<ServiceInfo> {
    require(
        principal.as_ref().map(|Extension(p)| p),
        PermissionEvaluator::can_manage_services,
    )?;
    let Json(body) = body?;

    let tenant = TenantId::parse(&id)?;
    let mut source = DataSourceConfig::new(body.url);
    if let (Some(username), Some(password)) = (body.username, body.password) {
        source = source.with_credentials(username, password);
    }

    let handle = {
        let (registry, tenant, source) = (state.registry.clone(), tenant.clone(), source.clone());
        blocking(move || registry.register(&tenant, &source)).await??
    };
    tracing::info!(
        "Registered service '{}' with data source {}",
        tenant,
        source.redacted_url()
    );

    Ok(ApiResponse::created(ServiceInfo {
        is_default: &tenant == state.registry.default_tenant(),
        tenant,
        stats: handle.stats(),
    }))
}
