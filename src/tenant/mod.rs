pub mod context;
pub mod id;
pub mod resolver;

pub use context::{TenantContext, TenantGuard};
pub use id::{TenantId, TenantIdError};
pub use resolver::{Resolution, ResolutionSource, TenantResolver};
