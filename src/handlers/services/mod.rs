// handlers/services/mod.rs - Integrated service (tenant data source) management
//
// Listing and inspection need integrated access (SUPER_ADMIN or SERVICE_ADMIN);
// anything that creates or closes pools needs SUPER_ADMIN.

use serde::Serialize;

use crate::auth::Principal;
use crate::database::PoolStats;
use crate::error::ApiError;
use crate::tenant::TenantId;

pub mod delete;    // DELETE /api/v2/integrated-cms/services/:id
pub mod detect;    // POST /api/v2/integrated-cms/services/:id/auto-detect
pub mod list;      // GET /api/v2/integrated-cms/services
pub mod register;  // POST /api/v2/integrated-cms/services/:id
pub mod show;      // GET /api/v2/integrated-cms/services/:id

pub use delete::service_delete;
pub use detect::service_detect;
pub use list::service_list;
pub use register::service_register;
pub use show::service_show;

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub tenant: TenantId,
    pub is_default: bool,
    #[serde(flatten)]
    pub stats: PoolStats,
}

/// Run a registry call that may consult the data source lookup off the
/// async workers
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!("Registry task failed: {}", e);
        ApiError::internal_server_error("Service registry task failed")
    })
}

/// 401 without a principal, 403 when `allowed` rejects it
pub(crate) fn require(
    principal: Option<&Principal>,
    allowed: fn(Option<&Principal>) -> bool,
) -> Result<(), ApiError> {
    match principal.and_then(Principal::effective_role) {
        None => Err(ApiError::unauthorized("Authentication required")),
        Some(_) if allowed(principal) => Ok(()),
        Some(role) => Err(ApiError::forbidden(format!(
            "Role {} may not manage integrated services",
            role
        ))),
    }
}
