//! Redirect and health endpoint tests
//!
//! The critical path: slug → redirect, with click recording, expiry and
//! default URL handling.

use std::sync::{Arc, Once};

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use actix_web::App;
use chrono::{Duration, Utc};

use quickslug::api::middleware::RequestIdMiddleware;
use quickslug::config::{StaticConfig, init_config};
use quickslug::runtime::AppServices;
use quickslug::services::CreateLinkRequest;
use quickslug::storage::{Link, SeaOrmStorage};
use tempfile::TempDir;

// =============================================================================
// Test Setup
// =============================================================================

static INIT: Once = Once::new();

fn init_test_config() {
    INIT.call_once(|| {
        init_config();
    });
}

async fn create_services(config: StaticConfig) -> (AppServices, TempDir) {
    init_test_config();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("redirect_test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = Arc::new(
        SeaOrmStorage::connect_url(&db_url)
            .await
            .expect("Failed to create storage"),
    );
    (AppServices::new(storage, &config), temp_dir)
}

async fn create_link(services: &AppServices, slug: &str, url: &str) -> Link {
    services
        .link_service
        .create_link(
            CreateLinkRequest {
                url: url.to_string(),
                slug: Some(slug.to_string()),
                expires_in: None,
            },
            None,
            "203.0.113.1",
        )
        .await
        .expect("Failed to create link")
}

fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> Option<String> {
    resp.headers()
        .get("Location")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

// =============================================================================
// Redirects
// =============================================================================

#[actix_rt::test]
async fn test_redirect_existing_link() {
    let (services, _dir) = create_services(StaticConfig::default()).await;
    create_link(&services, "docs", "https://example.com/docs").await;

    let app = test::init_service(
        App::new()
            .wrap(RequestIdMiddleware)
            .configure(|cfg| services.configure(cfg)),
    )
    .await;

    let req = TestRequest::get()
        .uri("/docs")
        .peer_addr("198.51.100.9:40000".parse().unwrap())
        .insert_header(("User-Agent", "TestAgent/1.0"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp).as_deref(), Some("https://example.com/docs"));
    assert!(resp.headers().contains_key("x-request-id"));

    let link = services
        .storage
        .find_link_by_slug("docs")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(link.click_count, 1);

    let clicks = services.storage.recent_clicks(&link.id, 10).await.unwrap();
    assert_eq!(clicks.len(), 1);
    assert_eq!(clicks[0].ip, "198.51.100.9");
    assert_eq!(clicks[0].user_agent, "TestAgent/1.0");
}

#[actix_rt::test]
async fn test_head_behaves_like_get() {
    let (services, _dir) = create_services(StaticConfig::default()).await;
    create_link(&services, "headme", "https://example.com/head").await;

    let app = test::init_service(App::new().configure(|cfg| services.configure(cfg))).await;

    let req = TestRequest::default()
        .method(actix_web::http::Method::HEAD)
        .uri("/headme")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp).as_deref(), Some("https://example.com/head"));
}

#[actix_rt::test]
async fn test_missing_and_invalid_slugs_are_404() {
    let (services, _dir) = create_services(StaticConfig::default()).await;
    let app = test::init_service(App::new().configure(|cfg| services.configure(cfg))).await;

    for uri in ["/nope", "/bad!slug", "/a/b"] {
        let req = TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[actix_rt::test]
async fn test_expired_link_is_gone() {
    let (services, _dir) = create_services(StaticConfig::default()).await;
    let now = Utc::now();
    let expired = Link {
        id: uuid::Uuid::new_v4().to_string(),
        slug: "stale".to_string(),
        original_url: "https://example.com/stale".to_string(),
        user_id: None,
        created_by_ip: None,
        created_at: now - Duration::days(1),
        expires_at: Some(now - Duration::minutes(1)),
        click_count: 0,
    };
    services.storage.insert_link(&expired, None).await.unwrap();

    let app = test::init_service(App::new().configure(|cfg| services.configure(cfg))).await;
    let req = TestRequest::get().uri("/stale").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::GONE);
    let stored = services
        .storage
        .find_link_by_slug("stale")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.click_count, 0);
}

#[actix_rt::test]
async fn test_root_without_default_url_is_404() {
    let (services, _dir) = create_services(StaticConfig::default()).await;
    let app = test::init_service(App::new().configure(|cfg| services.configure(cfg))).await;

    let req = TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_root_redirects_to_default_url() {
    let mut config = StaticConfig::default();
    config.links.default_url = Some("https://home.example.com".to_string());
    let (services, _dir) = create_services(config).await;
    let app = test::init_service(App::new().configure(|cfg| services.configure(cfg))).await;

    let req = TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp).as_deref(), Some("https://home.example.com"));
}

#[actix_rt::test]
async fn test_configured_redirect_status() {
    let mut config = StaticConfig::default();
    config.links.redirect_status = 301;
    let (services, _dir) = create_services(config).await;
    create_link(&services, "perm", "https://example.com/perm").await;

    let app = test::init_service(App::new().configure(|cfg| services.configure(cfg))).await;
    let req = TestRequest::get().uri("/perm").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
}

// =============================================================================
// Health
// =============================================================================

#[actix_rt::test]
async fn test_health_endpoints() {
    let (services, _dir) = create_services(StaticConfig::default()).await;
    create_link(&services, "one", "https://example.com/1").await;
    let app = test::init_service(App::new().configure(|cfg| services.configure(cfg))).await;

    let req = TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["storage"]["backend"], "sqlite");
    assert_eq!(body["data"]["storage"]["links_count"], 1);

    let req = TestRequest::get().uri("/health/live").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = TestRequest::get().uri("/health/ready").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
