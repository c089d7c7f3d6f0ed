// handlers/content.rs - GET {scoped}/:service/content/:content_type handler

use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::{CrudOperation, Principal};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, RequestContext};

/// Permission-gated listing. Reports which pool the request was routed to;
/// the content store itself is out of scope here.
pub async fn content_list(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    principal: Option<Extension<Principal>>,
    Path((_service, content_type)): Path<(String, String)>,
) -> ApiResult<Value> {
    let principal = principal.as_ref().map(|Extension(p)| p);
    let decision = state.evaluator.evaluate_crud(
        principal,
        &context.tenant,
        &content_type,
        CrudOperation::List,
    );
    if !decision.granted {
        tracing::info!("Denied content listing: {}", context.log_context());
        return Err(ApiError::denied(decision));
    }

    let handle = state.routing.target_pool();
    Ok(ApiResponse::success(json!({
        "tenant": context.tenant,
        "content_type": content_type,
        "pool": handle.name(),
        "reasons": decision.reasons,
        "items": []
    })))
}
