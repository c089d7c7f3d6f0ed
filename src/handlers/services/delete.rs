// handlers/services/delete.rs - DELETE /api/v2/integrated-cms/services/:id handler

use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::{json, Value};

use super::require;
use crate::app::AppState;
use crate::auth::{PermissionEvaluator, Principal};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::tenant::TenantId;

pub async fn service_delete(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    require(
        principal.as_ref().map(|Extension(p)| p),
        PermissionEvaluator::can_manage_services,
    )?;

    let tenant = TenantId::parse(&id)?;
    if &tenant == state.registry.default_tenant() {
        return Err(ApiError::bad_request(format!(
            "The default service '{}' cannot be removed",
            tenant
        )));
    }

    if state.registry.remove(&tenant).await {
        Ok(ApiResponse::success(json!({ "tenant": tenant, "removed": true })))
    } else {
        Err(ApiError::not_found(format!("No connection pool for service: {}", tenant)))
    }
}
