//! 点击事件读写

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, EntityTrait, ExprTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, sea_query::Expr,
};

use super::converters::model_to_click;
use super::{SeaOrmStorage, retry};
use crate::errors::Result;
use crate::storage::ClickEvent;
use migration::entities::{click_event, link};

impl SeaOrmStorage {
    /// 记录一次点击：写入事件并累加链接的 click_count（单事务）
    pub async fn record_click(
        &self,
        link_id: &str,
        ip: &str,
        user_agent: &str,
        clicked_at: DateTime<Utc>,
    ) -> Result<()> {
        let db = &self.db;
        retry::with_retry("record_click", self.retry_config, || async {
            let txn = db.begin().await?;

            click_event::Entity::insert(click_event::ActiveModel {
                id: NotSet,
                link_id: Set(link_id.to_string()),
                clicked_at: Set(clicked_at),
                ip: Set(ip.to_string()),
                user_agent: Set(user_agent.to_string()),
            })
            .exec_without_returning(&txn)
            .await?;

            link::Entity::update_many()
                .col_expr(
                    link::Column::ClickCount,
                    Expr::col(link::Column::ClickCount).add(1),
                )
                .filter(link::Column::Id.eq(link_id))
                .exec(&txn)
                .await?;

            txn.commit().await
        })
        .await?;

        Ok(())
    }

    /// 最近的点击记录，新到旧
    pub async fn recent_clicks(&self, link_id: &str, limit: u64) -> Result<Vec<ClickEvent>> {
        let db = &self.db;
        let models = retry::with_retry("recent_clicks", self.retry_config, || async {
            click_event::Entity::find()
                .filter(click_event::Column::LinkId.eq(link_id))
                .order_by_desc(click_event::Column::ClickedAt)
                .order_by_desc(click_event::Column::Id)
                .limit(limit)
                .all(db)
                .await
        })
        .await?;

        Ok(models.into_iter().map(model_to_click).collect())
    }

    pub async fn count_clicks(&self, link_id: &str) -> Result<u64> {
        let db = &self.db;
        Ok(
            retry::with_retry("count_clicks", self.retry_config, || async {
                click_event::Entity::find()
                    .filter(click_event::Column::LinkId.eq(link_id))
                    .count(db)
                    .await
            })
            .await?,
        )
    }
}
