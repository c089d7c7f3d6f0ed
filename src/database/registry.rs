//! Process-wide registry of tenant connection pools.
//!
//! Each tenant id owns one slot in a shared map. A slot is a
//! `OnceCell<Arc<PoolHandle>>`, so the first caller for an unseen tenant
//! builds the pool while concurrent callers for the same tenant block on the
//! cell and receive the identical `Arc`. The map lock is only held to find or
//! insert the slot, never while a pool is being built.
//!
//! Missing configuration is not an error for callers: [`ConnectionPoolRegistry::get_or_create`]
//! logs a warning and hands back the default tenant's pool. That keeps the
//! platform available under misconfiguration, at the cost of serving the
//! default tenant's store for a tenant that has none of its own.
//!
//! Building a pool is cheap and does no I/O: pools connect lazily, so the
//! only work under a slot's initializer is a [`DataSourceLookup`] call and URL
//! parsing. Request paths therefore call the registry directly from async
//! code; administrative handlers still move their calls onto the blocking
//! pool.

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::pool::{PoolHandle, PoolSettings, PoolStats};
use super::source::{DataSourceConfig, DataSourceLookup};
use crate::config::{DatabaseConfig, TenancyConfig};
use crate::tenant::{TenantId, TenantIdError};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("No data source configured for tenant: {0}")]
    MissingConfig(TenantId),

    #[error("Invalid data source URL for tenant {tenant}: {reason}")]
    InvalidUrl { tenant: TenantId, reason: String },

    #[error("Default tenant pool unavailable: no data source for {0}")]
    DefaultUnavailable(TenantId),

    #[error(transparent)]
    InvalidTenant(#[from] TenantIdError),
}

type Slot = Arc<OnceCell<Arc<PoolHandle>>>;

pub struct ConnectionPoolRegistry {
    default_tenant: TenantId,
    default_handle: Arc<PoolHandle>,
    slots: RwLock<HashMap<TenantId, Slot>>,
    sources: Arc<dyn DataSourceLookup>,
    default_settings: PoolSettings,
    tenant_settings: PoolSettings,
}

impl ConnectionPoolRegistry {
    /// Build the default tenant's pool, then every known tenant whose
    /// configuration is discoverable. Unknown tenants are built on demand.
    pub fn initialize(
        tenancy: &TenancyConfig,
        database: &DatabaseConfig,
        sources: Arc<dyn DataSourceLookup>,
    ) -> Result<Self, PoolError> {
        info!("Initializing tenant connection pools...");

        let default_tenant = TenantId::parse(&tenancy.default_tenant)?;
        let default_source = sources
            .lookup(&default_tenant)
            .ok_or_else(|| PoolError::DefaultUnavailable(default_tenant.clone()))?;
        let default_handle = Arc::new(PoolHandle::connect_lazy(
            &default_tenant,
            &default_source,
            &database.default_pool,
        )?);
        info!(
            "Created connection pool '{}' for default tenant ({})",
            default_handle.name(),
            default_source.redacted_url()
        );

        let mut slots = HashMap::new();
        slots.insert(
            default_tenant.clone(),
            Arc::new(OnceCell::with_value(default_handle.clone())),
        );

        let registry = Self {
            default_tenant,
            default_handle,
            slots: RwLock::new(slots),
            sources,
            default_settings: database.default_pool.clone(),
            tenant_settings: database.tenant_pool.clone(),
        };

        for raw in &tenancy.known_tenants {
            match TenantId::parse(raw) {
                Ok(tenant) if tenant == registry.default_tenant => {}
                Ok(tenant) => {
                    registry.detect_from_env(&tenant);
                }
                Err(e) => warn!("Skipping known tenant '{}': {}", raw, e),
            }
        }

        info!("Pool registry initialized. Active tenants: {:?}", registry.tenants());
        Ok(registry)
    }

    pub fn default_tenant(&self) -> &TenantId {
        &self.default_tenant
    }

    pub fn default_handle(&self) -> Arc<PoolHandle> {
        self.default_handle.clone()
    }

    /// Existing pool for `tenant`, or a newly built one. Falls back to the
    /// default tenant's pool when the tenant has no usable configuration.
    pub fn get_or_create(&self, tenant: &TenantId) -> Arc<PoolHandle> {
        match self.try_get_or_create(tenant) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(
                    "No pool for tenant '{}' ({}); falling back to default tenant '{}'",
                    tenant, e, self.default_tenant
                );
                self.default_handle.clone()
            }
        }
    }

    /// Like [`get_or_create`](Self::get_or_create) but surfaces the failure
    /// instead of falling back.
    pub fn try_get_or_create(&self, tenant: &TenantId) -> Result<Arc<PoolHandle>, PoolError> {
        if let Some(handle) = self.existing(tenant) {
            return Ok(handle);
        }

        let slot = self.slot_for(tenant);
        let result = slot.get_or_try_init(|| self.build(tenant)).cloned();
        if result.is_err() {
            self.discard_empty_slot(tenant, &slot);
        }
        result
    }

    /// Register a tenant with explicit credentials. An existing pool is kept
    /// and returned unchanged.
    pub fn register(
        &self,
        tenant: &TenantId,
        source: &DataSourceConfig,
    ) -> Result<Arc<PoolHandle>, PoolError> {
        let slot = self.slot_for(tenant);
        let mut created = false;
        let result = slot
            .get_or_try_init(|| {
                created = true;
                self.build_with(tenant, source)
            })
            .cloned();

        match &result {
            Ok(_) if !created => warn!("Connection pool already exists for tenant: {}", tenant),
            Ok(_) => {}
            Err(_) => self.discard_empty_slot(tenant, &slot),
        }
        result
    }

    /// Create the tenant's pool if its configuration can be found. Never
    /// falls back; returns whether a pool now exists for the tenant.
    pub fn detect_from_env(&self, tenant: &TenantId) -> bool {
        match self.try_get_or_create(tenant) {
            Ok(_) => true,
            Err(PoolError::MissingConfig(_)) => {
                debug!("No data source configuration found for tenant: {}", tenant);
                false
            }
            Err(e) => {
                warn!("Failed to create pool for tenant '{}': {}", tenant, e);
                false
            }
        }
    }

    pub fn has(&self, tenant: &TenantId) -> bool {
        self.slots
            .read()
            .get(tenant)
            .map_or(false, |slot| slot.get().is_some())
    }

    /// Drop and close a tenant's pool. The default tenant's pool is never
    /// removed; the attempt is logged and ignored. Administrative path only:
    /// callers that already hold the handle keep it, but it will be closed.
    pub async fn remove(&self, tenant: &TenantId) -> bool {
        if *tenant == self.default_tenant {
            warn!("Refusing to remove the default tenant pool: {}", tenant);
            return false;
        }

        let removed = self.slots.write().remove(tenant);
        match removed.and_then(|slot| slot.get().cloned()) {
            Some(handle) => {
                handle.close().await;
                info!("Removed connection pool for tenant: {}", tenant);
                true
            }
            None => {
                debug!("No connection pool to remove for tenant: {}", tenant);
                false
            }
        }
    }

    /// Per-tenant connection counts, ordered by tenant id
    pub fn snapshot(&self) -> BTreeMap<TenantId, PoolStats> {
        self.handles()
            .into_iter()
            .map(|handle| (handle.tenant().clone(), handle.stats()))
            .collect()
    }

    pub fn tenants(&self) -> Vec<TenantId> {
        let mut tenants: Vec<TenantId> = self
            .slots
            .read()
            .iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(tenant, _)| tenant.clone())
            .collect();
        tenants.sort();
        tenants
    }

    /// Close every pool; for process shutdown only
    pub async fn close_all(&self) {
        for handle in self.handles() {
            handle.close().await;
            info!("Closed connection pool: {}", handle.name());
        }
    }

    fn handles(&self) -> Vec<Arc<PoolHandle>> {
        self.slots
            .read()
            .values()
            .filter_map(|slot| slot.get().cloned())
            .collect()
    }

    fn existing(&self, tenant: &TenantId) -> Option<Arc<PoolHandle>> {
        self.slots.read().get(tenant).and_then(|slot| slot.get().cloned())
    }

    fn slot_for(&self, tenant: &TenantId) -> Slot {
        if let Some(slot) = self.slots.read().get(tenant) {
            return slot.clone();
        }
        self.slots
            .write()
            .entry(tenant.clone())
            .or_default()
            .clone()
    }

    // A failed build leaves an empty slot behind; drop it so the map does not
    // collect ids that never get a pool. Every slot clone is taken under the
    // map lock, so with the write lock held a count of two (map + caller)
    // means nobody else is waiting on or initializing this cell. Otherwise the
    // slot stays; `has`, `tenants` and the snapshot skip empty cells.
    fn discard_empty_slot(&self, tenant: &TenantId, slot: &Slot) {
        let mut slots = self.slots.write();
        let unused_empty_slot = slots.get(tenant).map_or(false, |current| {
            Arc::ptr_eq(current, slot) && current.get().is_none() && Arc::strong_count(slot) == 2
        });
        if unused_empty_slot {
            slots.remove(tenant);
        }
    }

    fn build(&self, tenant: &TenantId) -> Result<Arc<PoolHandle>, PoolError> {
        let source = self
            .sources
            .lookup(tenant)
            .ok_or_else(|| PoolError::MissingConfig(tenant.clone()))?;
        self.build_with(tenant, &source)
    }

    fn build_with(
        &self,
        tenant: &TenantId,
        source: &DataSourceConfig,
    ) -> Result<Arc<PoolHandle>, PoolError> {
        let settings = if *tenant == self.default_tenant {
            &self.default_settings
        } else {
            &self.tenant_settings
        };
        let handle = PoolHandle::connect_lazy(tenant, source, settings)?;
        info!(
            "Created connection pool '{}' for tenant '{}' ({})",
            handle.name(),
            tenant,
            source.redacted_url()
        );
        Ok(Arc::new(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::source::StaticDataSources;
    use crate::testing::{test_database_config, test_registry, test_sources, tenant};

    #[tokio::test]
    async fn default_and_known_tenants_are_built_eagerly() {
        let registry = test_registry();
        assert!(registry.has(&tenant("integrated_cms")));
        assert!(registry.has(&tenant("douzone")));
        // known but unconfigured
        assert!(!registry.has(&tenant("service1")));
        // configured but not in the known list: built lazily only
        assert!(!registry.has(&tenant("lazy_site")));
    }

    #[tokio::test]
    async fn get_or_create_reuses_the_same_handle() {
        let registry = test_registry();
        let first = registry.get_or_create(&tenant("lazy_site"));
        let second = registry.get_or_create(&tenant("lazy_site"));
        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.has(&tenant("lazy_site")));
        assert_eq!(first.settings(), &test_database_config().tenant_pool);
    }

    #[tokio::test]
    async fn unknown_tenant_falls_back_to_default_handle() {
        let registry = test_registry();
        let handle = registry.get_or_create(&tenant("unknown_without_config"));
        assert!(Arc::ptr_eq(&handle, &registry.default_handle()));
        assert!(!registry.has(&tenant("unknown_without_config")));
        assert!(matches!(
            registry.try_get_or_create(&tenant("unknown_without_config")),
            Err(PoolError::MissingConfig(_))
        ));
    }

    #[tokio::test]
    async fn remove_default_is_a_noop() {
        let registry = test_registry();
        assert!(!registry.remove(&tenant("integrated_cms")).await);
        assert!(registry.has(&tenant("integrated_cms")));
        assert!(!registry.default_handle().is_closed());
    }

    #[tokio::test]
    async fn remove_closes_and_forgets_the_pool() {
        let registry = test_registry();
        let handle = registry.get_or_create(&tenant("douzone"));
        assert!(registry.remove(&tenant("douzone")).await);
        assert!(handle.is_closed());
        assert!(!registry.has(&tenant("douzone")));
        assert!(!registry.remove(&tenant("douzone")).await);

        // next lookup rebuilds a fresh pool
        let rebuilt = registry.get_or_create(&tenant("douzone"));
        assert!(!Arc::ptr_eq(&handle, &rebuilt));
        assert!(!rebuilt.is_closed());
    }

    #[tokio::test]
    async fn register_keeps_existing_pool() {
        let registry = test_registry();
        let existing = registry.get_or_create(&tenant("douzone"));
        let again = registry
            .register(
                &tenant("douzone"),
                &DataSourceConfig::new("postgres://other-host/douzone"),
            )
            .unwrap();
        assert!(Arc::ptr_eq(&existing, &again));

        let fresh = registry
            .register(
                &tenant("brand_new"),
                &DataSourceConfig::new("postgres://db/brand_new").with_credentials("u", "p"),
            )
            .unwrap();
        assert_eq!(fresh.tenant().as_str(), "brand_new");
        assert!(registry.has(&tenant("brand_new")));
    }

    #[tokio::test]
    async fn invalid_registration_leaves_no_slot() {
        let registry = test_registry();
        let err = registry
            .register(&tenant("broken"), &DataSourceConfig::new("::nope::"))
            .unwrap_err();
        assert!(matches!(err, PoolError::InvalidUrl { .. }));
        assert!(!registry.has(&tenant("broken")));
        assert!(!registry.tenants().contains(&tenant("broken")));
    }

    #[tokio::test]
    async fn snapshot_lists_every_live_pool() {
        let registry = test_registry();
        registry.get_or_create(&tenant("lazy_site"));
        let snapshot = registry.snapshot();
        let names: Vec<&str> = snapshot.keys().map(|t| t.as_str()).collect();
        assert_eq!(names, vec!["douzone", "integrated_cms", "lazy_site"]);
        assert_eq!(snapshot[&tenant("douzone")].pool_name, "douzone-pool");
    }

    #[test]
    fn missing_default_configuration_is_fatal() {
        let result = ConnectionPoolRegistry::initialize(
            &TenancyConfig::default(),
            &test_database_config(),
            Arc::new(StaticDataSources::new()),
        );
        assert!(matches!(result, Err(PoolError::DefaultUnavailable(_))));
    }

    #[tokio::test]
    async fn detect_from_env_reports_presence() {
        let registry = ConnectionPoolRegistry::initialize(
            &TenancyConfig {
                known_tenants: vec![],
                ..TenancyConfig::default()
            },
            &test_database_config(),
            Arc::new(test_sources()),
        )
        .unwrap();
        assert!(!registry.has(&tenant("douzone")));
        assert!(registry.detect_from_env(&tenant("douzone")));
        assert!(!registry.detect_from_env(&tenant("service2")));
    }

    /// Misses every tenant but the default one, slowly
    struct SlowMissingSources {
        delay: std::time::Duration,
    }

    impl DataSourceLookup for SlowMissingSources {
        fn lookup(&self, tenant: &TenantId) -> Option<DataSourceConfig> {
            if tenant.as_str() == "integrated_cms" {
                return test_sources().lookup(tenant);
            }
            std::thread::sleep(self.delay);
            None
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn registration_racing_a_failed_lookup_stays_registered() {
        let registry = Arc::new(
            ConnectionPoolRegistry::initialize(
                &TenancyConfig {
                    known_tenants: vec![],
                    ..TenancyConfig::default()
                },
                &test_database_config(),
                Arc::new(SlowMissingSources {
                    delay: std::time::Duration::from_millis(100),
                }),
            )
            .unwrap(),
        );

        for i in 0..5 {
            let site = tenant(&format!("site{}", i));

            let lookup = {
                let (registry, site) = (registry.clone(), site.clone());
                tokio::task::spawn_blocking(move || registry.get_or_create(&site))
            };
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            let registration = {
                let (registry, site) = (registry.clone(), site.clone());
                tokio::task::spawn_blocking(move || {
                    registry.register(
                        &site,
                        &DataSourceConfig::new("postgres://db/site").with_credentials("u", "p"),
                    )
                })
            };

            lookup.await.unwrap();
            let registered = registration.await.unwrap().unwrap();

            assert!(registry.has(&site), "{} lost its registration", site);
            assert!(Arc::ptr_eq(&registry.get_or_create(&site), &registered));
            assert!(registry.tenants().contains(&site));
        }
    }

    #[tokio::test]
    async fn failed_lookup_leaves_no_slot_behind() {
        let registry = test_registry();
        let ghost = tenant("ghost");
        registry.get_or_create(&ghost);
        assert!(!registry.slots.read().contains_key(&ghost));
    }
}
