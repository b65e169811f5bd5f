//! Link-creation quotas
//!
//! Daily windows start at UTC midnight. A limit of 0 means unlimited.

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::QuotaConfig;
use crate::errors::{QuickslugError, Result};
use crate::storage::{OwnerQuota, Plan, SeaOrmStorage, User};

/// 当前 UTC 日的零点
pub fn start_of_utc_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// 单个配额窗口；`limit` 为 None 表示不限
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaWindow {
    pub used: u64,
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
}

impl QuotaWindow {
    fn new(used: u64, limit: u64) -> Self {
        let limit = (limit > 0).then_some(limit);
        Self {
            used,
            limit,
            remaining: limit.map(|l| l.saturating_sub(used)),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    pub daily: QuotaWindow,
    /// 匿名调用方没有终身配额
    pub lifetime: Option<QuotaWindow>,
}

pub struct QuotaService {
    storage: Arc<SeaOrmStorage>,
    config: QuotaConfig,
}

impl QuotaService {
    pub fn new(storage: Arc<SeaOrmStorage>, config: QuotaConfig) -> Self {
        Self { storage, config }
    }

    fn daily_limit(&self, plan: Option<Plan>) -> u64 {
        match plan {
            None => self.config.anonymous_daily,
            Some(Plan::Free) => self.config.free_daily,
            Some(Plan::Pro) => self.config.pro_daily,
        }
    }

    fn lifetime_limit(&self, plan: Plan) -> u64 {
        match plan {
            Plan::Free => self.config.free_lifetime,
            Plan::Pro => self.config.pro_lifetime,
        }
    }

    /// 写入链接时用于原子检查并累加计数器的参数
    pub fn owner_quota(&self, user: &User, now: DateTime<Utc>) -> OwnerQuota {
        let daily = self.daily_limit(Some(user.plan));
        let lifetime = self.lifetime_limit(user.plan);
        OwnerQuota {
            user_id: user.id.clone(),
            day_start: start_of_utc_day(now),
            daily_limit: (daily > 0).then_some(daily),
            lifetime_limit: (lifetime > 0).then_some(lifetime),
        }
    }

    /// 计算调用方当前的配额使用情况
    ///
    /// 已登录用户的日用量取用户计数与同 IP 当日创建数中的较大者。
    pub async fn status(
        &self,
        user: Option<&User>,
        ip: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<QuotaStatus> {
        let day_start = start_of_utc_day(now);
        let ip_count = match ip {
            Some(ip) => self.storage.count_links_by_ip_since(ip, day_start).await?,
            None => 0,
        };

        let status = match user {
            None => QuotaStatus {
                daily: QuotaWindow::new(ip_count, self.daily_limit(None)),
                lifetime: None,
            },
            Some(user) => {
                let user_count = user.daily_count_since(day_start).max(0) as u64;
                QuotaStatus {
                    daily: QuotaWindow::new(
                        user_count.max(ip_count),
                        self.daily_limit(Some(user.plan)),
                    ),
                    lifetime: Some(QuotaWindow::new(
                        user.total_links_created.max(0) as u64,
                        self.lifetime_limit(user.plan),
                    )),
                }
            }
        };

        Ok(status)
    }

    /// 配额不足时返回 QuotaExceeded
    pub async fn ensure_can_create(
        &self,
        user: Option<&User>,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let status = self.status(user, Some(ip), now).await?;

        if let Some(lifetime) = &status.lifetime
            && lifetime.is_exhausted()
        {
            debug!("Lifetime quota exhausted for {:?}", user.map(|u| &u.id));
            return Err(QuickslugError::quota_exceeded(format!(
                "Lifetime limit of {} links reached",
                lifetime.limit.unwrap_or_default()
            )));
        }

        if status.daily.is_exhausted() {
            debug!("Daily quota exhausted for ip={} user={:?}", ip, user.map(|u| &u.id));
            let who = if user.is_some() { "" } else { " for anonymous users" };
            return Err(QuickslugError::quota_exceeded(format!(
                "Daily limit of {} links reached{}. Try again tomorrow",
                status.daily.limit.unwrap_or_default(),
                who
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_of_utc_day() {
        let now = DateTime::parse_from_rfc3339("2026-10-17T23:59:59+00:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            start_of_utc_day(now).to_rfc3339(),
            "2026-10-17T00:00:00+00:00"
        );

        // 非 UTC 输入按 UTC 日界计算
        let shifted = DateTime::parse_from_rfc3339("2026-10-18T01:00:00+08:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            start_of_utc_day(shifted).to_rfc3339(),
            "2026-10-17T00:00:00+00:00"
        );
    }

    #[test]
    fn test_quota_window() {
        let w = QuotaWindow::new(3, 5);
        assert_eq!(w.remaining, Some(2));
        assert!(!w.is_exhausted());

        let w = QuotaWindow::new(7, 5);
        assert_eq!(w.remaining, Some(0));
        assert!(w.is_exhausted());

        let unlimited = QuotaWindow::new(1_000, 0);
        assert_eq!(unlimited.limit, None);
        assert!(!unlimited.is_exhausted());
    }
}
