//! Per-link click analytics
//!
//! 聚合在内存中完成：只加载最近的 `analytics.max_clicks` 条点击事件，
//! 按日期、User-Agent 和 IP 分组计数。

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::AnalyticsConfig;
use crate::errors::{QuickslugError, Result};
use crate::storage::{ClickEvent, SeaOrmStorage};

// ============ 公共类型定义 ============

/// 某日点击数（UTC 日期，YYYY-MM-DD）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateCount {
    pub date: String,
    pub count: u64,
}

/// 按键分组的计数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyCount {
    pub key: String,
    pub count: u64,
}

/// 单链接分析数据
#[derive(Debug, Clone, Serialize)]
pub struct LinkAnalytics {
    pub link_id: String,
    pub slug: String,
    /// 全部点击事件数（不受加载上限影响）
    pub total_clicks: u64,
    pub clicks_by_date: Vec<DateCount>,
    pub top_user_agents: Vec<KeyCount>,
    pub top_ips: Vec<KeyCount>,
    pub recent_clicks: Vec<ClickEvent>,
}

/// 内存聚合结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickAggregates {
    pub clicks_by_date: Vec<DateCount>,
    pub top_user_agents: Vec<KeyCount>,
    pub top_ips: Vec<KeyCount>,
}

/// 计数降序，相同计数按键升序，取前 `n` 项
fn top_n<'a>(keys: impl Iterator<Item = &'a str>, n: usize) -> Vec<KeyCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }

    let mut ranked: Vec<KeyCount> = counts
        .into_iter()
        .map(|(key, count)| KeyCount {
            key: key.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    ranked.truncate(n);
    ranked
}

/// 聚合点击事件
pub fn aggregate_clicks(events: &[ClickEvent], n: usize) -> ClickAggregates {
    let mut by_date: HashMap<String, u64> = HashMap::new();
    for event in events {
        *by_date
            .entry(event.clicked_at.format("%Y-%m-%d").to_string())
            .or_default() += 1;
    }

    let mut clicks_by_date: Vec<DateCount> = by_date
        .into_iter()
        .map(|(date, count)| DateCount { date, count })
        .collect();
    // 新日期在前
    clicks_by_date.sort_by(|a, b| b.date.cmp(&a.date));

    ClickAggregates {
        clicks_by_date,
        top_user_agents: top_n(events.iter().map(|e| e.user_agent.as_str()), n),
        top_ips: top_n(events.iter().map(|e| e.ip.as_str()), n),
    }
}

pub struct AnalyticsService {
    storage: Arc<SeaOrmStorage>,
    config: AnalyticsConfig,
}

impl AnalyticsService {
    pub fn new(storage: Arc<SeaOrmStorage>, config: AnalyticsConfig) -> Self {
        Self { storage, config }
    }

    /// 链接分析，仅链接所有者可查看
    pub async fn link_analytics(&self, user_id: &str, link_id: &str) -> Result<LinkAnalytics> {
        let link = self
            .storage
            .find_link_by_id(link_id)
            .await?
            .ok_or_else(|| QuickslugError::not_found("Link not found"))?;

        if !link.is_owned_by(user_id) {
            return Err(QuickslugError::forbidden(
                "You do not have permission to view analytics for this link",
            ));
        }

        let recent = self
            .storage
            .recent_clicks(&link.id, self.config.max_clicks)
            .await?;
        let total_clicks = self.storage.count_clicks(&link.id).await?;
        let aggregates = aggregate_clicks(&recent, self.config.top_n);

        debug!(
            "Analytics for '{}': {} total clicks, {} loaded",
            link.slug,
            total_clicks,
            recent.len()
        );

        Ok(LinkAnalytics {
            link_id: link.id,
            slug: link.slug,
            total_clicks,
            clicks_by_date: aggregates.clicks_by_date,
            top_user_agents: aggregates.top_user_agents,
            top_ips: aggregates.top_ips,
            recent_clicks: recent,
        })
    }
}
