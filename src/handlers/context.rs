// handlers/context.rs - GET /context and GET {scoped}/:service/context handler

use axum::Extension;

use crate::middleware::{ApiResponse, RequestContext};

pub async fn context_show(Extension(context): Extension<RequestContext>) -> ApiResponse<RequestContext> {
    ApiResponse::success(context)
}
