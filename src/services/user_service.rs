//! Account management
//!
//! Email/password accounts, passwordless guest accounts, profile and the
//! guest-recovery merge.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::quota::{QuotaService, QuotaStatus, start_of_utc_day};
use crate::config::QuotaConfig;
use crate::errors::{QuickslugError, Result};
use crate::storage::{Plan, SeaOrmStorage, User};
use crate::utils::password::{MIN_PASSWORD_LENGTH, hash_password, verify_password};

pub const MAX_USERNAME_LEN: usize = 32;
const MAX_EMAIL_LEN: usize = 255;

/// 用户资料及配额
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub plan: Plan,
    pub is_guest: bool,
    pub total_links_created: i64,
    /// 当日有效计数（跨日后视为 0）
    pub daily_shorten_count: i64,
    pub last_shorten_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub quota: QuotaStatus,
}

/// 基本的邮箱格式检查，返回小写形式
pub fn normalize_email(input: &str) -> Result<String> {
    let email = input.trim().to_lowercase();
    let valid = email.len() <= MAX_EMAIL_LEN
        && !email.chars().any(char::is_whitespace)
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        });

    if valid {
        Ok(email)
    } else {
        Err(QuickslugError::validation("Invalid email address"))
    }
}

pub struct UserService {
    storage: Arc<SeaOrmStorage>,
    quota: QuotaService,
}

impl UserService {
    pub fn new(storage: Arc<SeaOrmStorage>, quota: QuotaConfig) -> Self {
        Self {
            quota: QuotaService::new(storage.clone(), quota),
            storage,
        }
    }

    /// 注册邮箱账户
    pub async fn signup(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(QuickslugError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        if self.storage.find_user_by_email(&email).await?.is_some() {
            return Err(QuickslugError::account_exists(
                "An account with this email already exists",
            ));
        }

        let mut user = User::new(uuid::Uuid::new_v4().to_string(), Utc::now());
        user.email = Some(email);
        user.password_hash = Some(hash_password(password)?);

        self.storage.insert_user(&user).await?;
        info!("UserService: signed up {}", user.id);
        Ok(user)
    }

    /// 邮箱 + 密码登录，失败统一返回 Unauthorized
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let invalid = || QuickslugError::unauthorized("Invalid email or password");

        let email = normalize_email(email).map_err(|_| invalid())?;
        let user = self
            .storage
            .find_user_by_email(&email)
            .await?
            .ok_or_else(invalid)?;
        let hash = user.password_hash.as_deref().ok_or_else(invalid)?;

        if !verify_password(password, hash)? {
            return Err(invalid());
        }

        Ok(user)
    }

    /// 创建无密码访客账户，其 id 即恢复令牌
    pub async fn create_guest(&self) -> Result<User> {
        let user = User::new(uuid::Uuid::new_v4().to_string(), Utc::now());
        self.storage.insert_user(&user).await?;
        info!("UserService: created guest account {}", user.id);
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        self.storage
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| QuickslugError::not_found("User not found"))
    }

    /// 用户资料及当前配额
    pub async fn profile(&self, user_id: &str, ip: Option<&str>) -> Result<UserProfile> {
        let user = self.get_user(user_id).await?;
        self.build_profile(user, ip).await
    }

    async fn build_profile(&self, user: User, ip: Option<&str>) -> Result<UserProfile> {
        let now = Utc::now();
        let quota = self.quota.status(Some(&user), ip, now).await?;

        Ok(UserProfile {
            is_guest: user.is_guest(),
            daily_shorten_count: user.daily_count_since(start_of_utc_day(now)),
            id: user.id,
            username: user.username,
            email: user.email,
            plan: user.plan,
            total_links_created: user.total_links_created,
            last_shorten_date: user.last_shorten_date,
            created_at: user.created_at,
            quota,
        })
    }

    /// 修改用户名（1..=32 个字符，去除首尾空白）
    pub async fn update_username(&self, user_id: &str, username: &str) -> Result<User> {
        let username = username.trim();
        let len = username.chars().count();
        if len == 0 || len > MAX_USERNAME_LEN {
            return Err(QuickslugError::validation(format!(
                "Username must be between 1 and {} characters",
                MAX_USERNAME_LEN
            )));
        }

        if let Some(other) = self.storage.find_user_by_username(username).await?
            && other.id != user_id
        {
            return Err(QuickslugError::username_taken("This username is already taken"));
        }

        self.storage.update_username(user_id, username).await
    }

    /// 清零日计数，仅当记录的日期早于今天（UTC）时生效
    ///
    /// 生效时 last_shorten_date 同时记为当前时间。当天的计数不受影响，
    /// 因此该操作不会改变剩余配额，只规范化存储的计数器。
    pub async fn reset_daily_count(&self, user_id: &str, ip: Option<&str>) -> Result<UserProfile> {
        let user = self.get_user(user_id).await?;
        let now = Utc::now();
        let day_start = start_of_utc_day(now);

        let user = if user.daily_count_is_stale(day_start) {
            info!("UserService: reset stale daily counter for {}", user.id);
            self.storage.reset_daily_count(&user.id, day_start, now).await?
        } else {
            user
        };

        self.build_profile(user, ip).await
    }

    /// 用旧账户 id 找回其链接，合并到当前账户并删除旧账户
    pub async fn recover_account(&self, user_id: &str, old_token: &str) -> Result<u64> {
        let old_id = uuid::Uuid::parse_str(old_token.trim())
            .map_err(|_| QuickslugError::validation("Invalid recovery token"))?
            .to_string();

        if old_id == user_id {
            return Err(QuickslugError::validation(
                "Cannot recover the account you are signed in with",
            ));
        }

        if self.storage.find_user_by_id(&old_id).await?.is_none() {
            return Err(QuickslugError::not_found("No account found for this token"));
        }

        self.storage.merge_users(user_id, &old_id).await
    }
}
