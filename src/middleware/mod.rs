pub mod principal;
pub mod response;
pub mod tenant;

pub use principal::principal_middleware;
pub use response::{ApiResponse, ApiResult};
pub use tenant::{tenant_context_middleware, RequestContext};
