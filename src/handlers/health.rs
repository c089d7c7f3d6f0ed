// handlers/health.rs - GET /health handler

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use std::time::Duration;

use crate::app::AppState;

const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Pings the pool routed for the current request's tenant
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let handle = state.routing.target_pool();
    let now = chrono::Utc::now();

    let ping = tokio::time::timeout(PING_TIMEOUT, async {
        let mut conn = handle.acquire().await?;
        sqlx::query("SELECT 1").execute(&mut *conn).await
    })
    .await;
    let database_error = match ping {
        Ok(Ok(_)) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(_) => Some(format!("no connection within {:?}", PING_TIMEOUT)),
    };

    match database_error {
        None => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "tenant": handle.tenant(),
                    "pool": handle.name(),
                    "database": "ok"
                }
            })),
        ),
        Some(e) => {
            tracing::warn!("Health check failed for pool '{}': {}", handle.name(), e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "tenant": handle.tenant(),
                        "pool": handle.name(),
                        "database_error": e
                    }
                })),
            )
        }
    }
}
