use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnection, PgPoolOptions};
use sqlx::{PgPool, Postgres};
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};
use tracing::warn;
use uuid::Uuid;

use super::registry::PoolError;
use super::source::DataSourceConfig;
use crate::tenant::TenantId;

/// Sizing and timeout knobs for one tenant pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    /// Connections held longer than this are reported as possible leaks
    pub leak_detection_threshold: Duration,
    pub statement_cache_capacity: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
            leak_detection_threshold: Duration::from_secs(60),
            statement_cache_capacity: 250,
        }
    }
}

/// Connection counts for the observability snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub pool_id: Uuid,
    pub pool_name: String,
    pub active: u32,
    pub idle: u32,
    pub total: u32,
    pub created_at: DateTime<Utc>,
}

/// A tenant's connection pool plus the configuration it was built with.
///
/// Handles are shared as `Arc<PoolHandle>`; identity of the `Arc` is the
/// identity of the pool.
#[derive(Debug)]
pub struct PoolHandle {
    id: Uuid,
    tenant: TenantId,
    name: String,
    settings: PoolSettings,
    created_at: DateTime<Utc>,
    pool: PgPool,
}

impl PoolHandle {
    /// Build a pool without opening connections. Must run inside a Tokio
    /// runtime: the pool spawns its idle/lifetime maintenance task.
    pub fn connect_lazy(
        tenant: &TenantId,
        source: &DataSourceConfig,
        settings: &PoolSettings,
    ) -> Result<Self, PoolError> {
        let name = format!("{}-pool", tenant);
        let options = source
            .connect_options(tenant)?
            .statement_cache_capacity(settings.statement_cache_capacity)
            .application_name(&name);

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections.min(settings.max_connections))
            .acquire_timeout(settings.acquire_timeout)
            .idle_timeout(Some(settings.idle_timeout))
            .max_lifetime(Some(settings.max_lifetime))
            .connect_lazy_with(options);

        Ok(Self {
            id: Uuid::new_v4(),
            tenant: tenant.clone(),
            name,
            settings: settings.clone(),
            created_at: Utc::now(),
            pool,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    pub fn stats(&self) -> PoolStats {
        let total = self.pool.size();
        let idle = u32::try_from(self.pool.num_idle()).unwrap_or(total);
        PoolStats {
            pool_id: self.id,
            pool_name: self.name.clone(),
            active: total.saturating_sub(idle),
            idle,
            total,
            created_at: self.created_at,
        }
    }

    /// Check out a connection that reports itself if held past the leak threshold
    pub async fn acquire(&self) -> Result<TrackedConnection, sqlx::Error> {
        let conn = self.pool.acquire().await?;
        Ok(TrackedConnection {
            conn,
            acquired_at: Instant::now(),
            threshold: self.settings.leak_detection_threshold,
            pool_name: self.name.clone(),
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Pooled connection with leak detection on release
pub struct TrackedConnection {
    conn: PoolConnection<Postgres>,
    acquired_at: Instant,
    threshold: Duration,
    pool_name: String,
}

impl TrackedConnection {
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

impl Deref for TrackedConnection {
    type Target = PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for TrackedConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl Drop for TrackedConnection {
    fn drop(&mut self) {
        let held = self.held_for();
        if exceeds_leak_threshold(held, self.threshold) {
            warn!(
                pool = %self.pool_name,
                held_ms = held.as_millis() as u64,
                threshold_ms = self.threshold.as_millis() as u64,
                "Connection held past leak detection threshold"
            );
        }
    }
}

fn exceeds_leak_threshold(held: Duration, threshold: Duration) -> bool {
    !threshold.is_zero() && held > threshold
}
