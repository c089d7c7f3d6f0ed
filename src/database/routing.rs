use std::sync::Arc;
use tracing::{debug, warn};

use super::pool::PoolHandle;
use super::registry::ConnectionPoolRegistry;
use crate::tenant::{TenantContext, TenantId};

/// Picks the pool a database operation should run on
pub trait TargetPoolSelector: Send + Sync {
    fn select(&self, tenant: &TenantId) -> Option<Arc<PoolHandle>>;
}

impl TargetPoolSelector for ConnectionPoolRegistry {
    fn select(&self, tenant: &TenantId) -> Option<Arc<PoolHandle>> {
        Some(self.get_or_create(tenant))
    }
}

impl<F> TargetPoolSelector for F
where
    F: Fn(&TenantId) -> Option<Arc<PoolHandle>> + Send + Sync,
{
    fn select(&self, tenant: &TenantId) -> Option<Arc<PoolHandle>> {
        self(tenant)
    }
}

/// Per-operation indirection from the active tenant to a connection pool.
///
/// Lookup order: the injected selector for the current tenant, then the
/// statically configured fallback pool. A closed or missing pool from the
/// selector is never returned, so every operation gets a usable pool.
pub struct RoutingDataSource {
    selector: Arc<dyn TargetPoolSelector>,
    default_tenant: TenantId,
    fallback: Arc<PoolHandle>,
}

impl RoutingDataSource {
    pub fn new(
        selector: Arc<dyn TargetPoolSelector>,
        default_tenant: TenantId,
        fallback: Arc<PoolHandle>,
    ) -> Self {
        Self {
            selector,
            default_tenant,
            fallback,
        }
    }

    pub fn from_registry(registry: Arc<ConnectionPoolRegistry>) -> Self {
        let default_tenant = registry.default_tenant().clone();
        let fallback = registry.default_handle();
        Self::new(registry, default_tenant, fallback)
    }

    pub fn default_tenant(&self) -> &TenantId {
        &self.default_tenant
    }

    /// Tenant bound to the current thread or task, else the default tenant
    pub fn current_tenant(&self) -> TenantId {
        TenantContext::get().unwrap_or_else(|| {
            debug!("No tenant context bound, defaulting to '{}'", self.default_tenant);
            self.default_tenant.clone()
        })
    }

    pub fn target_pool(&self) -> Arc<PoolHandle> {
        self.pool_for(&self.current_tenant())
    }

    /// Explicit-context variant of [`target_pool`](Self::target_pool)
    pub fn pool_for(&self, tenant: &TenantId) -> Arc<PoolHandle> {
        match self.selector.select(tenant) {
            Some(handle) if !handle.is_closed() => {
                debug!("Routing tenant '{}' to pool '{}'", tenant, handle.name());
                handle
            }
            Some(handle) => {
                warn!(
                    "Pool '{}' for tenant '{}' is closed; using fallback pool '{}'",
                    handle.name(),
                    tenant,
                    self.fallback.name()
                );
                self.fallback.clone()
            }
            None => {
                warn!(
                    "No pool selected for tenant '{}'; using fallback pool '{}'",
                    tenant,
                    self.fallback.name()
                );
                self.fallback.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{tenant, test_registry};

    #[tokio::test]
    async fn unset_context_routes_to_default_tenant() {
        let registry = Arc::new(test_registry());
        let routing = RoutingDataSource::from_registry(registry.clone());

        assert_eq!(routing.current_tenant(), tenant("integrated_cms"));
        assert!(Arc::ptr_eq(&routing.target_pool(), &registry.default_handle()));
    }

    #[tokio::test]
    async fn bound_tenant_selects_its_pool() {
        let registry = Arc::new(test_registry());
        let routing = RoutingDataSource::from_registry(registry.clone());

        let pool = TenantContext::run(tenant("douzone"), || routing.target_pool());
        assert_eq!(pool.tenant().as_str(), "douzone");
        assert!(Arc::ptr_eq(&pool, &registry.get_or_create(&tenant("douzone"))));
    }

    #[tokio::test]
    async fn task_scope_routes_across_await_points() {
        let registry = Arc::new(test_registry());
        let routing = RoutingDataSource::from_registry(registry);

        let pool = TenantContext::scope(tenant("douzone"), async {
            tokio::task::yield_now().await;
            routing.target_pool()
        })
        .await;
        assert_eq!(pool.tenant().as_str(), "douzone");
    }

    #[tokio::test]
    async fn selector_miss_uses_fallback() {
        let registry = Arc::new(test_registry());
        let fallback = registry.default_handle();
        let selector = |_: &TenantId| -> Option<Arc<PoolHandle>> { None };
        let routing = RoutingDataSource::new(Arc::new(selector), tenant("integrated_cms"), fallback.clone());

        assert!(Arc::ptr_eq(&routing.pool_for(&tenant("douzone")), &fallback));
    }

    #[tokio::test]
    async fn closed_pool_is_never_handed_out() {
        let registry = Arc::new(test_registry());
        let fallback = registry.default_handle();
        let douzone = registry.get_or_create(&tenant("douzone"));
        douzone.close().await;

        let stale = douzone.clone();
        let selector = move |_: &TenantId| Some(stale.clone());
        let routing = RoutingDataSource::new(Arc::new(selector), tenant("integrated_cms"), fallback.clone());

        assert!(Arc::ptr_eq(&routing.pool_for(&tenant("douzone")), &fallback));
    }
}
