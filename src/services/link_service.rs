//! Link management service
//!
//! Shorten, resolve, list, update and delete links. Ownership and quota
//! rules live here so the HTTP layer only translates requests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::quota::QuotaService;
use crate::config::{AnalyticsConfig, LinksConfig, StaticConfig};
use crate::errors::{QuickslugError, Result};
use crate::storage::{InsertOutcome, Link, LinkChanges, OwnerQuota, SeaOrmStorage, User};
use crate::utils::url_validator::validate_url;
use crate::utils::{
    SLUG_MAX_LEN, TimeParser, check_custom_slug, generate_slug, is_reserved_slug,
    is_valid_slug_format,
};

/// 生成短码长度的下限，避免与保留词重叠
const MIN_GENERATED_SLUG_LEN: usize = 4;

/// 记录的 User-Agent 最大长度
const MAX_USER_AGENT_LEN: usize = 512;

// ============ Request/Response DTOs ============

/// Request to shorten a URL
#[derive(Debug, Clone, Default)]
pub struct CreateLinkRequest {
    pub url: String,
    /// Custom slug, generated when absent
    pub slug: Option<String>,
    /// Preset, relative duration or RFC3339 timestamp
    pub expires_in: Option<String>,
}

/// Request to change a link; absent fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateLinkRequest {
    pub slug: Option<String>,
    /// `"never"` clears the expiry
    pub expires_in: Option<String>,
}

/// Result of a slug availability check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlugAvailability {
    pub slug: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// One page of a user's links
#[derive(Debug, Clone)]
pub struct LinkPage {
    pub links: Vec<Link>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

fn quota_race_error() -> QuickslugError {
    QuickslugError::quota_exceeded("Link quota reached. Try again tomorrow")
}

// ============ LinkService Implementation ============

pub struct LinkService {
    storage: Arc<SeaOrmStorage>,
    quota: QuotaService,
    links: LinksConfig,
    analytics: AnalyticsConfig,
}

impl LinkService {
    pub fn new(storage: Arc<SeaOrmStorage>, config: &StaticConfig) -> Self {
        Self {
            quota: QuotaService::new(storage.clone(), config.quota.clone()),
            storage,
            links: config.links.clone(),
            analytics: config.analytics.clone(),
        }
    }

    /// `{base_url}/{slug}`
    pub fn short_url(&self, slug: &str) -> String {
        format!("{}/{}", self.links.base_url.trim_end_matches('/'), slug)
    }

    fn generated_slug_length(&self) -> usize {
        self.links
            .slug_length
            .clamp(MIN_GENERATED_SLUG_LEN, SLUG_MAX_LEN)
    }

    fn resolve_expiry(&self, expires_in: Option<&str>, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        let input = expires_in
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.links.default_expiry);

        TimeParser::resolve_expiry(input, now).map_err(QuickslugError::validation)
    }

    async fn load_caller(&self, user_id: Option<&str>) -> Result<Option<User>> {
        match user_id {
            None => Ok(None),
            Some(id) => self
                .storage
                .find_user_by_id(id)
                .await?
                .map(Some)
                .ok_or_else(|| QuickslugError::unauthorized("Account no longer exists")),
        }
    }

    /// 获取调用方拥有的链接：不存在返回 NotFound，非本人返回 Forbidden
    pub async fn get_owned_link(&self, user_id: &str, link_id: &str) -> Result<Link> {
        let link = self
            .storage
            .find_link_by_id(link_id)
            .await?
            .ok_or_else(|| QuickslugError::not_found("Link not found"))?;

        if !link.is_owned_by(user_id) {
            return Err(QuickslugError::forbidden(
                "You do not have permission to access this link",
            ));
        }

        Ok(link)
    }

    // ============ Shorten ============

    /// Shorten a URL
    ///
    /// Order: URL validation, quota, expiry, slug. Authenticated callers have
    /// their counters bumped in the same transaction as the insert, and the
    /// limits are checked again there.
    pub async fn create_link(
        &self,
        req: CreateLinkRequest,
        user_id: Option<&str>,
        ip: &str,
    ) -> Result<Link> {
        let now = Utc::now();
        let original_url = validate_url(&req.url)?;

        let caller = self.load_caller(user_id).await?;
        self.quota.ensure_can_create(caller.as_ref(), ip, now).await?;

        let expires_at = self.resolve_expiry(req.expires_in.as_deref(), now)?;
        let owner = caller.as_ref().map(|user| self.quota.owner_quota(user, now));

        let mut link = Link {
            id: uuid::Uuid::new_v4().to_string(),
            slug: String::new(),
            original_url,
            user_id: caller.map(|u| u.id),
            created_by_ip: Some(ip.to_string()),
            created_at: now,
            expires_at,
            click_count: 0,
        };

        match req.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(custom) => {
                check_custom_slug(custom, &self.links.reserved_slugs)
                    .map_err(QuickslugError::validation)?;
                if self.storage.slug_exists(custom).await? {
                    return Err(QuickslugError::slug_taken("This slug is already taken"));
                }
                link.slug = custom.to_string();
                match self.storage.insert_link(&link, owner.as_ref()).await? {
                    InsertOutcome::Inserted => {}
                    InsertOutcome::SlugTaken => {
                        return Err(QuickslugError::slug_taken("This slug is already taken"));
                    }
                    InsertOutcome::QuotaExhausted => return Err(quota_race_error()),
                }
            }
            None => {
                let length = self.generated_slug_length();
                self.insert_with_generated_slug(&mut link, owner.as_ref(), || generate_slug(length))
                    .await?
            }
        }

        info!(
            "LinkService: created '{}' -> '{}' (user={:?})",
            link.slug, link.original_url, link.user_id
        );
        Ok(link)
    }

    /// 由 `next_slug` 提供候选短码，冲突时换新短码重试，超出次数返回 SlugGeneration
    async fn insert_with_generated_slug<F>(
        &self,
        link: &mut Link,
        owner: Option<&OwnerQuota>,
        mut next_slug: F,
    ) -> Result<()>
    where
        F: FnMut() -> String,
    {
        let attempts = self.links.max_generation_attempts.max(1);

        for attempt in 1..=attempts {
            let candidate = next_slug();
            if is_reserved_slug(&candidate, &self.links.reserved_slugs)
                || self.storage.slug_exists(&candidate).await?
            {
                debug!("Generated slug '{}' collided (attempt {})", candidate, attempt);
                continue;
            }

            link.slug = candidate;
            match self.storage.insert_link(link, owner).await? {
                InsertOutcome::Inserted => return Ok(()),
                InsertOutcome::SlugTaken => {
                    debug!("Generated slug '{}' lost insert race (attempt {})", link.slug, attempt);
                }
                InsertOutcome::QuotaExhausted => return Err(quota_race_error()),
            }
        }

        error!("Failed to generate a unique slug after {} attempts", attempts);
        Err(QuickslugError::slug_generation(format!(
            "Could not generate a unique slug after {} attempts",
            attempts
        )))
    }

    /// Report whether a custom slug could be used right now
    pub async fn check_slug(&self, slug: &str) -> Result<SlugAvailability> {
        let slug = slug.trim();
        let reason = match check_custom_slug(slug, &self.links.reserved_slugs) {
            Err(reason) => Some(reason),
            Ok(()) if self.storage.slug_exists(slug).await? => {
                Some("This slug is already taken".to_string())
            }
            Ok(()) => None,
        };

        Ok(SlugAvailability {
            slug: slug.to_string(),
            available: reason.is_none(),
            reason,
        })
    }

    // ============ Redirect ============

    /// 重定向查找：格式非法或不存在返回 NotFound，已过期返回 Gone
    pub async fn resolve(&self, slug: &str, now: DateTime<Utc>) -> Result<Link> {
        if !is_valid_slug_format(slug) {
            return Err(QuickslugError::not_found("Link not found"));
        }

        let link = self
            .storage
            .find_link_by_slug(slug)
            .await?
            .ok_or_else(|| QuickslugError::not_found("Link not found"))?;

        if link.is_expired_at(now) {
            return Err(QuickslugError::gone("Link has expired"));
        }

        Ok(link)
    }

    /// 记录点击；失败只记日志，不影响重定向
    pub async fn record_click(
        &self,
        link: &Link,
        ip: &str,
        user_agent: Option<&str>,
        now: DateTime<Utc>,
    ) {
        let ip = if self.analytics.enable_ip_logging {
            ip
        } else {
            crate::utils::ip::UNKNOWN_IP
        };
        let user_agent: String = user_agent
            .map(str::trim)
            .filter(|ua| !ua.is_empty())
            .unwrap_or("Unknown")
            .chars()
            .take(MAX_USER_AGENT_LEN)
            .collect();

        if let Err(e) = self
            .storage
            .record_click(&link.id, ip, &user_agent, now)
            .await
        {
            warn!("Failed to record click for '{}': {}", link.slug, e);
        }
    }

    /// 配置的跳转状态码
    pub fn redirect_status(&self) -> u16 {
        self.links.redirect_status
    }

    pub fn default_url(&self) -> Option<&str> {
        self.links.default_url.as_deref().filter(|u| !u.is_empty())
    }

    // ============ Dashboard ============

    /// Links owned by `user_id`, newest first
    pub async fn list_user_links(
        &self,
        user_id: &str,
        page: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<LinkPage> {
        let page = page.unwrap_or(1).max(1);
        let page_size = page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        let (links, total) = self
            .storage
            .list_links_by_user(user_id, page, page_size)
            .await?;

        Ok(LinkPage {
            links,
            total,
            page,
            page_size,
        })
    }

    /// Change slug and/or expiry of an owned link
    pub async fn update_link(
        &self,
        user_id: &str,
        link_id: &str,
        req: UpdateLinkRequest,
    ) -> Result<Link> {
        let existing = self.get_owned_link(user_id, link_id).await?;
        let now = Utc::now();
        let mut changes = LinkChanges::default();

        if let Some(slug) = req.slug.as_deref().map(str::trim)
            && slug != existing.slug
        {
            check_custom_slug(slug, &self.links.reserved_slugs)
                .map_err(QuickslugError::validation)?;
            if let Some(other) = self.storage.find_link_by_slug(slug).await?
                && other.id != existing.id
            {
                return Err(QuickslugError::slug_taken("This slug is already taken"));
            }
            changes.slug = Some(slug.to_string());
        }

        if let Some(expires_in) = req.expires_in.as_deref() {
            changes.expires_at = Some(
                TimeParser::resolve_expiry(expires_in, now).map_err(QuickslugError::validation)?,
            );
        }

        if changes.is_empty() {
            return Ok(existing);
        }

        let updated = self.storage.update_link(&existing.id, &changes).await?;
        info!("LinkService: updated link {} (slug '{}')", updated.id, updated.slug);
        Ok(updated)
    }

    /// Delete an owned link together with its click events
    pub async fn delete_link(&self, user_id: &str, link_id: &str) -> Result<()> {
        let link = self.get_owned_link(user_id, link_id).await?;

        if !self.storage.delete_link(&link.id).await? {
            return Err(QuickslugError::not_found("Link not found"));
        }

        info!("LinkService: deleted link '{}'", link.slug);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::services::ErrorCode;
    use actix_web::http::StatusCode;
    use tempfile::TempDir;

    async fn service_with_attempts(attempts: u32) -> (LinkService, Arc<SeaOrmStorage>, TempDir) {
        let dir = TempDir::new().unwrap();
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("slugs.db").display());
        let storage = Arc::new(SeaOrmStorage::connect_url(&db_url).await.unwrap());

        let mut config = StaticConfig::default();
        config.links.max_generation_attempts = attempts;
        (LinkService::new(storage.clone(), &config), storage, dir)
    }

    fn pending_link() -> Link {
        Link {
            id: uuid::Uuid::new_v4().to_string(),
            slug: String::new(),
            original_url: "https://example.com/".to_string(),
            user_id: None,
            created_by_ip: Some("198.51.100.7".to_string()),
            created_at: Utc::now(),
            expires_at: None,
            click_count: 0,
        }
    }

    async fn seed_slug(storage: &SeaOrmStorage, slug: &str) {
        let mut link = pending_link();
        link.slug = slug.to_string();
        assert_eq!(
            storage.insert_link(&link, None).await.unwrap(),
            InsertOutcome::Inserted
        );
    }

    #[tokio::test]
    async fn test_generated_slug_skips_taken_and_reserved() {
        let (service, storage, _dir) = service_with_attempts(5).await;
        seed_slug(&storage, "taken1").await;

        let mut candidates = ["taken1", "api", "fresh1"].into_iter();
        let mut link = pending_link();
        service
            .insert_with_generated_slug(&mut link, None, || {
                candidates.next().unwrap().to_string()
            })
            .await
            .unwrap();

        assert_eq!(link.slug, "fresh1");
        let stored = storage.find_link_by_slug("fresh1").await.unwrap().unwrap();
        assert_eq!(stored.id, link.id);
    }

    #[tokio::test]
    async fn test_generated_slug_gives_up_after_max_attempts() {
        let (service, storage, _dir) = service_with_attempts(3).await;
        seed_slug(&storage, "taken1").await;

        let mut calls = 0;
        let mut link = pending_link();
        let err = service
            .insert_with_generated_slug(&mut link, None, || {
                calls += 1;
                "taken1".to_string()
            })
            .await
            .unwrap_err();

        assert_eq!(calls, 3);
        assert!(matches!(err, QuickslugError::SlugGeneration(_)));
        assert_eq!(err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::from(&err), ErrorCode::SlugGenerationFailed);
        assert!(storage.find_link_by_id(&link.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let (service, _storage, _dir) = service_with_attempts(0).await;

        let mut link = pending_link();
        service
            .insert_with_generated_slug(&mut link, None, || "only1".to_string())
            .await
            .unwrap();
        assert_eq!(link.slug, "only1");
    }
}
