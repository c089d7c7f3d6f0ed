// handlers/permissions.rs - POST {scoped}/:service/permissions handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::{Capabilities, PermissionDecision, Principal};
use crate::middleware::{ApiResponse, ApiResult, RequestContext};

#[derive(Debug, Deserialize)]
pub struct PermissionCheck {
    pub content_type: String,
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct PermissionCheckResult {
    pub tenant: String,
    pub content_type: String,
    pub action: String,
    #[serde(flatten)]
    pub decision: PermissionDecision,
    pub capabilities: Capabilities,
}

/// Evaluate a permission for the resolved tenant. A denial is a normal 200
/// result here; only gated endpoints turn it into 403.
pub async fn permission_check(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    principal: Option<Extension<Principal>>,
    body: Result<Json<PermissionCheck>, JsonRejection>,
) -> ApiResult<PermissionCheckResult> {
    let Json(check) = body?;
    let principal = principal.as_ref().map(|Extension(p)| p);
    let decision = state
        .evaluator
        .evaluate(principal, &context.tenant, &check.content_type, &check.action);
    let capabilities = state
        .evaluator
        .capabilities(principal, &context.tenant, &check.content_type);

    Ok(ApiResponse::success(PermissionCheckResult {
        tenant: context.tenant.to_string(),
        content_type: check.content_type,
        action: check.action,
        decision,
        capabilities,
    }))
}
