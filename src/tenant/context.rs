//! Request-scoped tenant carrier.
//!
//! Two storage slots back [`TenantContext`]:
//!
//! - a Tokio task-local slot installed by [`TenantContext::scope`] for async
//!   request handling, where a task may hop between worker threads;
//! - a thread-local slot for synchronous code running outside any scope.
//!
//! Inside a scope the task slot is the only slot: reads and writes
//! ([`set`](TenantContext::set), [`clear`](TenantContext::clear),
//! [`enter`](TenantContext::enter)) all go to it, and the thread slot is left
//! untouched. Both slots are released structurally: the task slot disappears
//! when the scoped future completes or is dropped, and [`TenantGuard`]
//! restores the previous value on drop, which also runs during unwinding.

use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;

use super::id::TenantId;

thread_local! {
    static THREAD_TENANT: RefCell<Option<TenantId>> = const { RefCell::new(None) };
}

tokio::task_local! {
    static TASK_TENANT: RefCell<Option<TenantId>>;
}

/// Accessors for the tenant bound to the current task or thread
pub struct TenantContext;

impl TenantContext {
    /// Bind `tenant` to the current task scope, or to this thread outside one
    pub fn set(tenant: TenantId) {
        Self::replace(Some(tenant));
    }

    /// Bind a raw, unvalidated value. `None`, empty and blank values clear the
    /// slot; values failing validation clear it as well.
    pub fn set_raw(raw: Option<&str>) {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Self::clear(),
            Some(value) => match TenantId::parse(value) {
                Ok(tenant) => Self::set(tenant),
                Err(e) => {
                    tracing::warn!("Refusing to bind tenant context: {}", e);
                    Self::clear();
                }
            },
        }
    }

    /// Current tenant. Unset and cleared look the same.
    pub fn get() -> Option<TenantId> {
        TASK_TENANT
            .try_with(|slot| slot.borrow().clone())
            .unwrap_or_else(|_| THREAD_TENANT.with(|slot| slot.borrow().clone()))
    }

    pub fn clear() {
        Self::replace(None);
    }

    pub fn is_set() -> bool {
        Self::get().is_some()
    }

    /// Bind `tenant` until the returned guard is dropped
    pub fn enter(tenant: TenantId) -> TenantGuard {
        TenantGuard {
            previous: Self::replace(Some(tenant)),
            _thread_bound: PhantomData,
        }
    }

    /// Run `f` with `tenant` bound
    pub fn run<F, T>(tenant: TenantId, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let _guard = Self::enter(tenant);
        f()
    }

    /// Run `fut` with its own tenant slot, initially holding `tenant`, for the
    /// whole lifetime of the future
    pub async fn scope<F>(tenant: TenantId, fut: F) -> F::Output
    where
        F: Future,
    {
        TASK_TENANT.scope(RefCell::new(Some(tenant)), fut).await
    }

    /// Write the active slot and hand back what it held
    fn replace(value: Option<TenantId>) -> Option<TenantId> {
        // `try_with` consumes its closure, so the value is parked until we know
        // which slot takes it
        let mut pending = Some(value);
        let in_task = TASK_TENANT.try_with(|slot| {
            std::mem::replace(&mut *slot.borrow_mut(), pending.take().flatten())
        });
        match in_task {
            Ok(previous) => previous,
            Err(_) => THREAD_TENANT.with(|slot| {
                std::mem::replace(&mut *slot.borrow_mut(), pending.take().flatten())
            }),
        }
    }
}

/// Restores the previous tenant when dropped.
///
/// Not `Send`: the guard must be dropped on the thread that created it.
#[must_use = "the tenant is unbound as soon as the guard is dropped"]
pub struct TenantGuard {
    previous: Option<TenantId>,
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for TenantGuard {
    fn drop(&mut self) {
        TenantContext::replace(self.previous.take());
    }
}
