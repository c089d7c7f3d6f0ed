mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::{delete, get, post_json, post_raw, send, token};
use integrated_cms::auth::Claims;

const SERVICES: &str = "/api/v2/integrated-cms/services";

#[tokio::test]
async fn listing_requires_integrated_access() -> Result<()> {
    let (app, _) = common::test_app()?;

    let (status, _) = send(&app, get(SERVICES, None)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let site_admin = token("SITE_ADMIN", Some("douzone"));
    let (status, _) = send(&app, get(SERVICES, Some(&site_admin))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let service_admin = common::token_for(
        Claims::new("svc", "SERVICE_ADMIN", chrono::Duration::minutes(10))
            .with_assigned_tenants(["douzone"]),
    );
    let (status, body) = send(&app, get(SERVICES, Some(&service_admin))).await?;
    assert_eq!(status, StatusCode::OK);
    let services = body["data"].as_array().unwrap();
    assert_eq!(services.len(), 2);
    assert_eq!(services[0]["tenant"], "douzone");
    assert_eq!(services[0]["is_default"], false);
    assert_eq!(services[1]["tenant"], "integrated_cms");
    assert_eq!(services[1]["is_default"], true);
    assert_eq!(services[1]["pool_name"], "integrated_cms-pool");
    Ok(())
}

#[tokio::test]
async fn show_reports_404_for_missing_pools() -> Result<()> {
    let (app, _) = common::test_app()?;
    let root = token("SUPER_ADMIN", None);

    let (status, body) = send(&app, get(&format!("{}/douzone", SERVICES), Some(&root))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pool_name"], "douzone-pool");
    assert!(body["data"]["created_at"].is_string());

    let (status, _) = send(&app, get(&format!("{}/service1", SERVICES), Some(&root))).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get(&format!("{}/bad.id", SERVICES), Some(&root))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn only_super_admin_registers_services() -> Result<()> {
    let (app, state) = common::test_app()?;
    let body = json!({
        "url": "postgres://127.0.0.1:1/newsite",
        "username": "ns",
        "password": "secret"
    });

    let service_admin = token("SERVICE_ADMIN", None);
    let (status, _) = send(&app, post_json(&format!("{}/newsite", SERVICES), Some(&service_admin), body.clone())).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let root = token("SUPER_ADMIN", None);
    let (status, created) = send(&app, post_json(&format!("{}/newsite", SERVICES), Some(&root), body)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["pool_name"], "newsite-pool");
    assert!(state.registry.has(&common::tenant("newsite")));

    let (status, _) = send(
        &app,
        post_json(&format!("{}/broken", SERVICES), Some(&root), json!({ "url": "not a url" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!state.registry.has(&common::tenant("broken")));

    let (status, body) = send(&app, post_raw(&format!("{}/broken", SERVICES), Some(&root), "{\"url\":")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_JSON");
    assert!(!state.registry.has(&common::tenant("broken")));
    Ok(())
}

#[tokio::test]
async fn auto_detect_uses_configured_sources_only() -> Result<()> {
    let (app, state) = common::test_app()?;
    let root = token("SUPER_ADMIN", None);

    let (status, body) = send(&app, post_json(&format!("{}/lazy_site/auto-detect", SERVICES), Some(&root), json!({}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["detected"], true);
    assert!(state.registry.has(&common::tenant("lazy_site")));

    let (_, body) = send(&app, post_json(&format!("{}/service1/auto-detect", SERVICES), Some(&root), json!({}))).await?;
    assert_eq!(body["data"]["detected"], false);
    assert!(!state.registry.has(&common::tenant("service1")));
    Ok(())
}

#[tokio::test]
async fn delete_refuses_the_default_service() -> Result<()> {
    let (app, state) = common::test_app()?;
    let root = token("SUPER_ADMIN", None);

    let (status, _) = send(&app, delete(&format!("{}/integrated_cms", SERVICES), Some(&root))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!state.registry.default_handle().is_closed());

    let (status, body) = send(&app, delete(&format!("{}/douzone", SERVICES), Some(&root))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], true);

    let (status, _) = send(&app, delete(&format!("{}/douzone", SERVICES), Some(&root))).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
