// handlers/services/detect.rs - POST /api/v2/integrated-cms/services/:id/auto-detect handler

use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Serialize;

use super::{blocking, require};
use crate::app::AppState;
use crate::auth::{PermissionEvaluator, Principal};
use crate::middleware::{ApiResponse, ApiResult};
use crate::tenant::TenantId;

#[derive(Debug, Serialize)]
pub struct DetectResult {
    pub tenant: TenantId,
    pub detected: bool,
}

pub async fn service_detect(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    Path(id): Path<String>,
) -> ApiResult<DetectResult> {
    require(
        principal.as_ref().map(|Extension(p)| p),
        PermissionEvaluator::can_manage_services,
    )?;

    let tenant = TenantId::parse(&id)?;
    let detected = {
        let (registry, tenant) = (state.registry.clone(), tenant.clone());
        blocking(move || registry.detect_from_env(&tenant)).await?
    };
    Ok(ApiResponse::success(DetectResult { tenant, detected }))
}
