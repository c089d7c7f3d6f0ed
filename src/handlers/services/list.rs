// handlers/services/list.rs - GET /api/v2/integrated-cms/services handler

use axum::{extract::State, Extension};

use super::{require, ServiceInfo};
use crate::app::AppState;
use crate::auth::{PermissionEvaluator, Principal};
use crate::middleware::{ApiResponse, ApiResult};

pub async fn service_list(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
) -> ApiResult<Vec<ServiceInfo>> {
    require(
        principal.as_ref().map(|Extension(p)| p),
        PermissionEvaluator::has_integrated_access,
    )?;

    let default_tenant = state.registry.default_tenant();
    let services = state
        .registry
        .snapshot()
        .into_iter()
        .map(|(tenant, stats)| ServiceInfo {
            is_default: &tenant == default_tenant,
            tenant,
            stats,
        })
        .collect();

    Ok(ApiResponse::success(services))
}
