use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{ClaimedAssignments, PermissionEvaluator, TracingAuditSink};
use crate::config::AppConfig;
use crate::database::{ConnectionPoolRegistry, RoutingDataSource};
use crate::handlers;
use crate::middleware::{principal_middleware, tenant_context_middleware};
use crate::tenant::{TenantIdError, TenantResolver};

/// Shared, read-mostly services handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub resolver: Arc<TenantResolver>,
    pub registry: Arc<ConnectionPoolRegistry>,
    pub routing: Arc<RoutingDataSource>,
    pub evaluator: Arc<PermissionEvaluator>,
}

impl AppState {
    /// Wire the request-path services around an initialized registry
    pub fn new(config: AppConfig, registry: Arc<ConnectionPoolRegistry>) -> Result<Self, TenantIdError> {
        let resolver = TenantResolver::new(&config.tenancy)?;
        let evaluator = PermissionEvaluator::new(
            registry.default_tenant().clone(),
            Arc::new(ClaimedAssignments),
            Arc::new(TracingAuditSink::new(config.security.enable_audit_logging)),
        );
        Ok(Self {
            routing: Arc::new(RoutingDataSource::from_registry(registry.clone())),
            resolver: Arc::new(resolver),
            evaluator: Arc::new(evaluator),
            registry,
            config: Arc::new(config),
        })
    }
}

pub fn router(state: AppState) -> Router {
    let scoped = scoped_routes();
    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .route("/context", get(handlers::context_show))
        .nest("/api/v2/integrated-cms/services", service_routes());

    for prefix in &state.config.tenancy.scoped_prefixes {
        let mount = format!("/{}/:service", prefix.trim_matches('/'));
        app = app.nest(&mount, scoped.clone());
    }

    // Later layers wrap earlier ones: the principal is decoded before the tenant bracket opens
    app.layer(from_fn_with_state(state.clone(), tenant_context_middleware))
        .layer(from_fn_with_state(state.clone(), principal_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn scoped_routes() -> Router<AppState> {
    Router::new()
        .route("/context", get(handlers::context_show))
        .route("/permissions", post(handlers::permission_check))
        .route("/content/:content_type", get(handlers::content_list))
}

fn service_routes() -> Router<AppState> {
    use handlers::services;

    Router::new()
        .route("/", get(services::service_list))
        .route(
            "/:id",
            get(services::service_show)
                .post(services::service_register)
                .delete(services::service_delete),
        )
        .route("/:id/auto-detect", post(services::service_detect))
}
