use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

/// 短链接
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub id: String,
    pub slug: String,
    pub original_url: String,
    pub user_id: Option<String>,
    pub created_by_ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub click_count: i64,
}

impl Link {
    /// `expires_at` 已到达即视为过期
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }
}

/// 链接可修改字段
///
/// `expires_at` 为 `Some(None)` 时清除过期时间。
#[derive(Debug, Clone, Default)]
pub struct LinkChanges {
    pub slug: Option<String>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

impl LinkChanges {
    pub fn is_empty(&self) -> bool {
        self.slug.is_none() && self.expires_at.is_none()
    }
}

/// 单次点击记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickEvent {
    pub id: i64,
    pub link_id: String,
    pub clicked_at: DateTime<Utc>,
    pub ip: String,
    pub user_agent: String,
}

/// 订阅计划
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// 用户账户
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub plan: Plan,
    pub total_links_created: i64,
    pub daily_shorten_count: i64,
    pub last_shorten_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// 新建免费账户
    pub fn new(id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            username: None,
            email: None,
            password_hash: None,
            plan: Plan::Free,
            total_links_created: 0,
            daily_shorten_count: 0,
            last_shorten_date: None,
            created_at: now,
        }
    }

    /// 日计数是否属于 `day_start` 之前的某一天
    pub fn daily_count_is_stale(&self, day_start: DateTime<Utc>) -> bool {
        self.last_shorten_date.is_none_or(|d| d < day_start)
    }

    /// 以 `day_start` 为当日起点的有效日计数
    pub fn daily_count_since(&self, day_start: DateTime<Utc>) -> i64 {
        if self.daily_count_is_stale(day_start) {
            0
        } else {
            self.daily_shorten_count
        }
    }

    pub fn is_guest(&self) -> bool {
        self.email.is_none() && self.password_hash.is_none()
    }
}
