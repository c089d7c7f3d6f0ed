pub mod pool;
pub mod registry;
pub mod routing;
pub mod source;

pub use pool::{PoolHandle, PoolSettings, PoolStats, TrackedConnection};
pub use registry::{ConnectionPoolRegistry, PoolError};
pub use routing::{RoutingDataSource, TargetPoolSelector};
pub use source::{DataSourceConfig, DataSourceLookup, EnvDataSources, StaticDataSources};
