// handlers/services/show.rs - GET /api/v2/integrated-cms/services/:id handler

use axum::{
    extract::{Path, State},
    Extension,
};

use super::{require, ServiceInfo};
use crate::app::AppState;
use crate::auth::{PermissionEvaluator, Principal};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::tenant::TenantId;

pub async fn service_show(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    Path(id): Path<String>,
) -> ApiResult<ServiceInfo> {
    require(
        principal.as_ref().map(|Extension(p)| p),
        PermissionEvaluator::has_integrated_access,
    )?;

    let tenant = TenantId::parse(&id)?;
    let stats = state
        .registry
        .snapshot()
        .remove(&tenant)
        .ok_or_else(|| ApiError::not_found(format!("No connection pool for service: {}", tenant)))?;

    Ok(ApiResponse::success(ServiceInfo {
        is_default: &tenant == state.registry.default_tenant(),
        tenant,
        stats,
    }))
}
