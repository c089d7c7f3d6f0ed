// handlers/mod.rs - HTTP handlers
//
// Scoped handlers run under `{scoped}/:service/` and read the tenant from the
// RequestContext the tenant middleware attached; the path segment only routes.

pub mod content;      // GET {scoped}/:service/content/:content_type
pub mod context;      // GET {scoped}/:service/context
pub mod health;       // GET /health
pub mod permissions;  // POST {scoped}/:service/permissions
pub mod services;     // /api/v2/integrated-cms/services

pub use content::content_list;
pub use context::context_show;
pub use health::health;
pub use permissions::permission_check;
