//! LinkService tests
//!
//! Shortening, slug rules, quotas, expiry, ownership and redirect lookup
//! against a temporary SQLite database.

use std::sync::{Arc, Once};

use chrono::{Duration, Utc};
use quickslug::config::{StaticConfig, init_config};
use quickslug::errors::QuickslugError;
use quickslug::services::{CreateLinkRequest, LinkService, UpdateLinkRequest, UserService};
use quickslug::storage::{InsertOutcome, Link, OwnerQuota, Plan, SeaOrmStorage, User};
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

async fn create_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    init_test_config();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("links_test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = SeaOrmStorage::connect_url(&db_url)
        .await
        .expect("Failed to create storage");
    (Arc::new(storage), temp_dir)
}

fn test_config() -> StaticConfig {
    let mut config = StaticConfig::default();
    config.links.base_url = "https://qs.test".to_string();
    config
}

async fn create_service_with(config: StaticConfig) -> (LinkService, Arc<SeaOrmStorage>, TempDir) {
    let (storage, temp_dir) = create_storage().await;
    (LinkService::new(storage.clone(), &config), storage, temp_dir)
}

async fn create_service() -> (LinkService, Arc<SeaOrmStorage>, TempDir) {
    create_service_with(test_config()).await
}

fn request(url: &str, slug: Option<&str>) -> CreateLinkRequest {
    CreateLinkRequest {
        url: url.to_string(),
        slug: slug.map(str::to_string),
        expires_in: None,
    }
}

async fn signup(storage: &Arc<SeaOrmStorage>, email: &str) -> User {
    UserService::new(storage.clone(), test_config().quota)
        .signup(email, "correct-horse")
        .await
        .expect("signup failed")
}

// =============================================================================
// Shortening
// =============================================================================

#[tokio::test]
async fn test_create_anonymous_generated_slug() {
    let (service, _storage, _dir) = create_service().await;

    let link = service
        .create_link(request("https://example.com/page", None), None, "203.0.113.1")
        .await
        .unwrap();

    assert_eq!(link.slug.len(), 8);
    assert_eq!(link.original_url, "https://example.com/page");
    assert_eq!(link.user_id, None);
    assert_eq!(link.created_by_ip.as_deref(), Some("203.0.113.1"));
    assert_eq!(link.expires_at, None);
    assert_eq!(link.click_count, 0);
    assert_eq!(
        service.short_url(&link.slug),
        format!("https://qs.test/{}", link.slug)
    );
}

#[tokio::test]
async fn test_create_trims_url() {
    let (service, _storage, _dir) = create_service().await;

    let link = service
        .create_link(request("  https://example.com  ", None), None, "203.0.113.1")
        .await
        .unwrap();
    assert_eq!(link.original_url, "https://example.com");
}

#[tokio::test]
async fn test_duplicate_urls_get_distinct_slugs() {
    let (service, _storage, _dir) = create_service().await;

    let a = service
        .create_link(request("https://example.com", None), None, "203.0.113.1")
        .await
        .unwrap();
    let b = service
        .create_link(request("https://example.com", None), None, "203.0.113.1")
        .await
        .unwrap();
    assert_ne!(a.slug, b.slug);
}

#[tokio::test]
async fn test_custom_slug_and_conflict() {
    let (service, _storage, _dir) = create_service().await;

    let link = service
        .create_link(request("https://example.com", Some("my-link")), None, "203.0.113.1")
        .await
        .unwrap();
    assert_eq!(link.slug, "my-link");

    let err = service
        .create_link(request("https://other.com", Some("my-link")), None, "203.0.113.2")
        .await
        .unwrap_err();
    assert!(matches!(err, QuickslugError::SlugTaken(_)));
    assert_eq!(err.message(), "This slug is already taken");
}

#[tokio::test]
async fn test_custom_slug_validation() {
    let (service, _storage, _dir) = create_service().await;

    for bad in ["ab", "api", "health", "has space", "a/b", &"x".repeat(33)] {
        let err = service
            .create_link(request("https://example.com", Some(bad)), None, "203.0.113.1")
            .await
            .unwrap_err();
        assert!(
            matches!(err, QuickslugError::Validation(_)),
            "slug {:?} should be rejected, got {:?}",
            bad,
            err
        );
    }
}

#[tokio::test]
async fn test_configured_reserved_slug_rejected() {
    let mut config = test_config();
    config.links.reserved_slugs = vec!["admin".to_string()];
    let (service, _storage, _dir) = create_service_with(config).await;

    let err = service
        .create_link(request("https://example.com", Some("Admin")), None, "203.0.113.1")
        .await
        .unwrap_err();
    assert!(matches!(err, QuickslugError::Validation(_)));
}

#[tokio::test]
async fn test_invalid_urls_rejected() {
    let (service, _storage, _dir) = create_service().await;

    for bad in ["", "not a url", "javascript:alert(1)", "ftp://example.com/file"] {
        let err = service
            .create_link(request(bad, None), None, "203.0.113.1")
            .await
            .unwrap_err();
        assert!(matches!(err, QuickslugError::Validation(_)), "{:?}", bad);
    }
}

#[tokio::test]
async fn test_configured_slug_length() {
    let mut config = test_config();
    config.links.slug_length = 12;
    let (service, _storage, _dir) = create_service_with(config).await;

    let link = service
        .create_link(request("https://example.com", None), None, "203.0.113.1")
        .await
        .unwrap();
    assert_eq!(link.slug.len(), 12);
}

// =============================================================================
// Expiry
// =============================================================================

#[tokio::test]
async fn test_expiry_presets_and_relative() {
    let (service, _storage, _dir) = create_service().await;
    let before = Utc::now();

    let mut req = request("https://example.com", None);
    req.expires_in = Some("1_week".to_string());
    let link = service.create_link(req, None, "203.0.113.1").await.unwrap();
    let expires_at = link.expires_at.expect("expiry should be set");
    assert!(expires_at >= before + Duration::weeks(1));
    assert!(expires_at <= Utc::now() + Duration::weeks(1));

    let mut req = request("https://example.com", None);
    req.expires_in = Some("2h".to_string());
    let link = service.create_link(req, None, "203.0.113.1").await.unwrap();
    let expires_at = link.expires_at.expect("expiry should be set");
    assert!(expires_at >= before + Duration::hours(2));

    let mut req = request("https://example.com", None);
    req.expires_in = Some("never".to_string());
    let link = service.create_link(req, None, "203.0.113.1").await.unwrap();
    assert_eq!(link.expires_at, None);
}

#[tokio::test]
async fn test_expiry_in_past_rejected() {
    let (service, _storage, _dir) = create_service().await;

    let mut req = request("https://example.com", None);
    req.expires_in = Some((Utc::now() - Duration::hours(1)).to_rfc3339());
    let err = service.create_link(req, None, "203.0.113.1").await.unwrap_err();
    assert!(matches!(err, QuickslugError::Validation(_)));

    let mut req = request("https://example.com", None);
    req.expires_in = Some("soon".to_string());
    let err = service.create_link(req, None, "203.0.113.1").await.unwrap_err();
    assert!(matches!(err, QuickslugError::Validation(_)));
}

#[tokio::test]
async fn test_default_expiry_applies() {
    let mut config = test_config();
    config.links.default_expiry = "1_day".to_string();
    let (service, _storage, _dir) = create_service_with(config).await;

    let link = service
        .create_link(request("https://example.com", None), None, "203.0.113.1")
        .await
        .unwrap();
    assert!(link.expires_at.is_some());
}

// =============================================================================
// Quotas
// =============================================================================

#[tokio::test]
async fn test_anonymous_daily_quota_per_ip() {
    let mut config = test_config();
    config.quota.anonymous_daily = 2;
    let (service, _storage, _dir) = create_service_with(config).await;

    for _ in 0..2 {
        service
            .create_link(request("https://example.com", None), None, "198.51.100.7")
            .await
            .unwrap();
    }

    let err = service
        .create_link(request("https://example.com", None), None, "198.51.100.7")
        .await
        .unwrap_err();
    assert!(matches!(err, QuickslugError::QuotaExceeded(_)));

    // 其他 IP 不受影响
    service
        .create_link(request("https://example.com", None), None, "198.51.100.8")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_authenticated_counters_and_daily_quota() {
    let mut config = test_config();
    config.quota.free_daily = 2;
    let (service, storage, _dir) = create_service_with(config).await;
    let user = signup(&storage, "alice@example.com").await;

    for _ in 0..2 {
        let link = service
            .create_link(request("https://example.com", None), Some(&user.id), "192.0.2.10")
            .await
            .unwrap();
        assert_eq!(link.user_id.as_deref(), Some(user.id.as_str()));
    }

    let stored = storage.find_user_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.total_links_created, 2);
    assert_eq!(stored.daily_shorten_count, 2);
    assert!(stored.last_shorten_date.is_some());

    let err = service
        .create_link(request("https://example.com", None), Some(&user.id), "192.0.2.11")
        .await
        .unwrap_err();
    assert!(matches!(err, QuickslugError::QuotaExceeded(_)));
}

#[tokio::test]
async fn test_ip_usage_counts_for_authenticated_user() {
    let mut config = test_config();
    config.quota.free_daily = 2;
    let (service, storage, _dir) = create_service_with(config).await;
    let user = signup(&storage, "bob@example.com").await;

    for _ in 0..2 {
        service
            .create_link(request("https://example.com", None), None, "192.0.2.20")
            .await
            .unwrap();
    }

    let err = service
        .create_link(request("https://example.com", None), Some(&user.id), "192.0.2.20")
        .await
        .unwrap_err();
    assert!(matches!(err, QuickslugError::QuotaExceeded(_)));
}

#[tokio::test]
async fn test_lifetime_quota() {
    let mut config = test_config();
    config.quota.free_lifetime = 1;
    let (service, storage, _dir) = create_service_with(config).await;
    let user = signup(&storage, "carol@example.com").await;

    service
        .create_link(request("https://example.com", None), Some(&user.id), "192.0.2.30")
        .await
        .unwrap();
    let err = service
        .create_link(request("https://example.com", None), Some(&user.id), "192.0.2.31")
        .await
        .unwrap_err();
    assert!(matches!(err, QuickslugError::QuotaExceeded(_)));
}

#[tokio::test]
async fn test_pro_lifetime_unlimited() {
    let mut config = test_config();
    config.quota.free_lifetime = 1;
    config.quota.pro_lifetime = 0;
    let (service, storage, _dir) = create_service_with(config).await;

    let mut pro = User::new(uuid::Uuid::new_v4().to_string(), Utc::now());
    pro.plan = Plan::Pro;
    pro.total_links_created = 500;
    storage.insert_user(&pro).await.unwrap();

    service
        .create_link(request("https://example.com", None), Some(&pro.id), "192.0.2.40")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_stale_daily_counter_resets_on_create() {
    let mut config = test_config();
    config.quota.free_daily = 2;
    let (service, storage, _dir) = create_service_with(config).await;

    let mut user = User::new(uuid::Uuid::new_v4().to_string(), Utc::now());
    user.daily_shorten_count = 2;
    user.total_links_created = 2;
    user.last_shorten_date = Some(Utc::now() - Duration::days(2));
    storage.insert_user(&user).await.unwrap();

    service
        .create_link(request("https://example.com", None), Some(&user.id), "192.0.2.50")
        .await
        .unwrap();

    let stored = storage.find_user_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.daily_shorten_count, 1);
    assert_eq!(stored.total_links_created, 3);
}

#[tokio::test]
async fn test_unknown_user_id_rejected() {
    let (service, _storage, _dir) = create_service().await;

    let err = service
        .create_link(request("https://example.com", None), Some("missing"), "192.0.2.60")
        .await
        .unwrap_err();
    assert!(matches!(err, QuickslugError::Unauthorized(_)));
}

// =============================================================================
// Slug availability
// =============================================================================

#[tokio::test]
async fn test_check_slug() {
    let (service, _storage, _dir) = create_service().await;
    service
        .create_link(request("https://example.com", Some("taken")), None, "203.0.113.1")
        .await
        .unwrap();

    let free = service.check_slug("free-one").await.unwrap();
    assert!(free.available);
    assert_eq!(free.reason, None);

    let taken = service.check_slug("taken").await.unwrap();
    assert!(!taken.available);
    assert_eq!(taken.reason.as_deref(), Some("This slug is already taken"));

    let reserved = service.check_slug("api").await.unwrap();
    assert!(!reserved.available);
    assert!(reserved.reason.is_some());

    let invalid = service.check_slug("no").await.unwrap();
    assert!(!invalid.available);
}

// =============================================================================
// Resolve
// =============================================================================

#[tokio::test]
async fn test_resolve_found_missing_expired() {
    let (service, storage, _dir) = create_service().await;
    let now = Utc::now();

    service
        .create_link(request("https://example.com", Some("live")), None, "203.0.113.1")
        .await
        .unwrap();
    let link = service.resolve("live", now).await.unwrap();
    assert_eq!(link.original_url, "https://example.com");

    let err = service.resolve("missing", now).await.unwrap_err();
    assert!(matches!(err, QuickslugError::NotFound(_)));

    let err = service.resolve("bad slug!", now).await.unwrap_err();
    assert!(matches!(err, QuickslugError::NotFound(_)));

    let expired = Link {
        id: uuid::Uuid::new_v4().to_string(),
        slug: "old".to_string(),
        original_url: "https://example.com/old".to_string(),
        user_id: None,
        created_by_ip: None,
        created_at: now - Duration::days(2),
        expires_at: Some(now - Duration::hours(1)),
        click_count: 0,
    };
    storage.insert_link(&expired, None).await.unwrap();

    let err = service.resolve("old", now).await.unwrap_err();
    assert!(matches!(err, QuickslugError::Gone(_)));
}

#[tokio::test]
async fn test_record_click_updates_counter() {
    let (service, storage, _dir) = create_service().await;
    let link = service
        .create_link(request("https://example.com", Some("clicky")), None, "203.0.113.1")
        .await
        .unwrap();

    service
        .record_click(&link, "198.51.100.1", Some("Mozilla/5.0"), Utc::now())
        .await;
    service.record_click(&link, "198.51.100.2", None, Utc::now()).await;

    let stored = storage.find_link_by_slug("clicky").await.unwrap().unwrap();
    assert_eq!(stored.click_count, 2);

    let clicks = storage.recent_clicks(&link.id, 10).await.unwrap();
    assert_eq!(clicks.len(), 2);
    assert!(clicks.iter().any(|c| c.user_agent == "Unknown"));
}

// =============================================================================
// Dashboard
// =============================================================================

#[tokio::test]
async fn test_list_user_links_paginated() {
    let (service, storage, _dir) = create_service().await;
    let user = signup(&storage, "dave@example.com").await;
    let other = signup(&storage, "erin@example.com").await;

    for i in 0..3 {
        service
            .create_link(
                request(&format!("https://example.com/{}", i), None),
                Some(&user.id),
                "192.0.2.70",
            )
            .await
            .unwrap();
    }
    service
        .create_link(request("https://example.com/other", None), Some(&other.id), "192.0.2.71")
        .await
        .unwrap();

    let page = service
        .list_user_links(&user.id, Some(1), Some(2))
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.links.len(), 2);
    assert!(page.links[0].created_at >= page.links[1].created_at);
    assert!(page.links.iter().all(|l| l.is_owned_by(&user.id)));

    let page2 = service
        .list_user_links(&user.id, Some(2), Some(2))
        .await
        .unwrap();
    assert_eq!(page2.links.len(), 1);

    let clamped = service
        .list_user_links(&user.id, Some(0), Some(1000))
        .await
        .unwrap();
    assert_eq!(clamped.page, 1);
    assert_eq!(clamped.page_size, 100);
}

#[tokio::test]
async fn test_update_link_rules() {
    let (service, storage, _dir) = create_service().await;
    let owner = signup(&storage, "frank@example.com").await;
    let stranger = signup(&storage, "grace@example.com").await;

    let link = service
        .create_link(request("https://example.com", Some("first")), Some(&owner.id), "192.0.2.80")
        .await
        .unwrap();
    service
        .create_link(request("https://example.com", Some("second")), Some(&owner.id), "192.0.2.80")
        .await
        .unwrap();

    // 自己当前的短码
    let same = service
        .update_link(
            &owner.id,
            &link.id,
            UpdateLinkRequest {
                slug: Some("first".to_string()),
                expires_in: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(same.slug, "first");

    let err = service
        .update_link(
            &owner.id,
            &link.id,
            UpdateLinkRequest {
                slug: Some("second".to_string()),
                expires_in: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, QuickslugError::SlugTaken(_)));

    let err = service
        .update_link(
            &owner.id,
            &link.id,
            UpdateLinkRequest {
                slug: Some("api".to_string()),
                expires_in: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, QuickslugError::Validation(_)));

    let err = service
        .update_link(&stranger.id, &link.id, UpdateLinkRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, QuickslugError::Forbidden(_)));

    let err = service
        .update_link(&owner.id, "no-such-id", UpdateLinkRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, QuickslugError::NotFound(_)));

    let updated = service
        .update_link(
            &owner.id,
            &link.id,
            UpdateLinkRequest {
                slug: Some("renamed".to_string()),
                expires_in: Some("1_day".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.slug, "renamed");
    assert!(updated.expires_at.is_some());
    assert!(storage.find_link_by_slug("first").await.unwrap().is_none());

    let cleared = service
        .update_link(
            &owner.id,
            &link.id,
            UpdateLinkRequest {
                slug: None,
                expires_in: Some("never".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.expires_at, None);
}

#[tokio::test]
async fn test_delete_link_cascades_clicks() {
    let (service, storage, _dir) = create_service().await;
    let owner = signup(&storage, "heidi@example.com").await;
    let stranger = signup(&storage, "ivan@example.com").await;

    let link = service
        .create_link(request("https://example.com", None), Some(&owner.id), "192.0.2.90")
        .await
        .unwrap();
    service
        .record_click(&link, "198.51.100.1", Some("curl/8.0"), Utc::now())
        .await;

    let err = service.delete_link(&stranger.id, &link.id).await.unwrap_err();
    assert!(matches!(err, QuickslugError::Forbidden(_)));

    service.delete_link(&owner.id, &link.id).await.unwrap();
    assert!(storage.find_link_by_id(&link.id).await.unwrap().is_none());
    assert_eq!(storage.count_clicks(&link.id).await.unwrap(), 0);

    let err = service.delete_link(&owner.id, &link.id).await.unwrap_err();
    assert!(matches!(err, QuickslugError::NotFound(_)));
}

// =============================================================================
// Storage insert and owner counters
// =============================================================================

fn owned_link(owner: &User, slug: &str) -> Link {
    Link {
        id: uuid::Uuid::new_v4().to_string(),
        slug: slug.to_string(),
        original_url: "https://example.com/counted".to_string(),
        user_id: Some(owner.id.clone()),
        created_by_ip: Some("192.0.2.120".to_string()),
        created_at: Utc::now(),
        expires_at: None,
        click_count: 0,
    }
}

fn owner_quota(owner: &User, daily: Option<u64>, lifetime: Option<u64>) -> OwnerQuota {
    let now = Utc::now();
    OwnerQuota {
        user_id: owner.id.clone(),
        day_start: now.date_naive().and_hms_opt(0, 0, 0).unwrap().and_utc(),
        daily_limit: daily,
        lifetime_limit: lifetime,
    }
}

#[tokio::test]
async fn test_insert_duplicate_slug_rolls_back_counters() {
    let (_service, storage, _dir) = create_service().await;
    let owner = signup(&storage, "judy@example.com").await;
    let quota = owner_quota(&owner, None, None);

    let first = owned_link(&owner, "dup-01");
    assert_eq!(
        storage.insert_link(&first, Some(&quota)).await.unwrap(),
        InsertOutcome::Inserted
    );

    let second = owned_link(&owner, "dup-01");
    assert_eq!(
        storage.insert_link(&second, Some(&quota)).await.unwrap(),
        InsertOutcome::SlugTaken
    );

    let stored = storage.find_user_by_id(&owner.id).await.unwrap().unwrap();
    assert_eq!(stored.total_links_created, 1);
    assert_eq!(stored.daily_shorten_count, 1);
    assert!(storage.find_link_by_id(&second.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_counters_accumulate_from_stored_values() {
    let (_service, storage, _dir) = create_service().await;
    let owner = signup(&storage, "kim@example.com").await;

    // 同一份（已过时的）所有者信息连续写入两次，计数仍需各加一
    let quota = owner_quota(&owner, None, None);
    for slug in ["acc-01", "acc-02"] {
        assert_eq!(
            storage.insert_link(&owned_link(&owner, slug), Some(&quota)).await.unwrap(),
            InsertOutcome::Inserted
        );
    }

    let stored = storage.find_user_by_id(&owner.id).await.unwrap().unwrap();
    assert_eq!(stored.total_links_created, 2);
    assert_eq!(stored.daily_shorten_count, 2);
    assert!(stored.last_shorten_date.is_some());
}

#[tokio::test]
async fn test_insert_enforces_lifetime_limit() {
    let (_service, storage, _dir) = create_service().await;
    let owner = signup(&storage, "lena@example.com").await;
    let quota = owner_quota(&owner, None, Some(2));

    for slug in ["life-01", "life-02"] {
        assert_eq!(
            storage.insert_link(&owned_link(&owner, slug), Some(&quota)).await.unwrap(),
            InsertOutcome::Inserted
        );
    }

    let over = owned_link(&owner, "life-03");
    assert_eq!(
        storage.insert_link(&over, Some(&quota)).await.unwrap(),
        InsertOutcome::QuotaExhausted
    );
    assert!(storage.find_link_by_id(&over.id).await.unwrap().is_none());

    let stored = storage.find_user_by_id(&owner.id).await.unwrap().unwrap();
    assert_eq!(stored.total_links_created, 2);
}

#[tokio::test]
async fn test_insert_enforces_daily_limit_and_rollover() {
    let (_service, storage, _dir) = create_service().await;

    let mut owner = User::new(uuid::Uuid::new_v4().to_string(), Utc::now());
    owner.daily_shorten_count = 5;
    owner.total_links_created = 5;
    owner.last_shorten_date = Some(Utc::now() - Duration::days(1));
    storage.insert_user(&owner).await.unwrap();
    let quota = owner_quota(&owner, Some(1), None);

    // 昨天的计数不占用今天的额度
    assert_eq!(
        storage.insert_link(&owned_link(&owner, "day-01"), Some(&quota)).await.unwrap(),
        InsertOutcome::Inserted
    );
    let stored = storage.find_user_by_id(&owner.id).await.unwrap().unwrap();
    assert_eq!(stored.daily_shorten_count, 1);
    assert_eq!(stored.total_links_created, 6);

    assert_eq!(
        storage.insert_link(&owned_link(&owner, "day-02"), Some(&quota)).await.unwrap(),
        InsertOutcome::QuotaExhausted
    );
    let stored = storage.find_user_by_id(&owner.id).await.unwrap().unwrap();
    assert_eq!(stored.daily_shorten_count, 1);
    assert_eq!(stored.total_links_created, 6);
}
