use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;

use integrated_cms::config;
use integrated_cms::database::{ConnectionPoolRegistry, EnvDataSources};
use integrated_cms::observability::init_tracing;
use integrated_cms::tenant::TenantId;
use integrated_cms::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL and {TENANT}_DATASOURCE_URL are visible
    let _ = dotenvy::dotenv();

    let config = config::config().clone();
    init_tracing(config.api.enable_request_logging);
    tracing::info!("Starting integrated CMS in {:?} mode", config.environment);
    if integrated_cms::is_production!() && config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set in production");
    }

    let default_tenant = TenantId::parse(&config.tenancy.default_tenant)
        .context("invalid default tenant id")?;
    let registry = Arc::new(
        ConnectionPoolRegistry::initialize(
            &config.tenancy,
            &config.database,
            Arc::new(EnvDataSources::new(default_tenant)),
        )
        .context("failed to initialize the default tenant pool")?,
    );

    let port = config.api.port;
    let state = AppState::new(config, registry.clone()).context("invalid tenancy configuration")?;
    let app = router(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Integrated CMS listening on http://{}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    registry.close_all().await;
    tracing::info!("All connection pools closed");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
