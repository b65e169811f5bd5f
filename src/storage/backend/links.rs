//! 链接读写

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait, DbErr,
    EntityTrait, ExprTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
    sea_query::Expr,
};
use tracing::{debug, info};

use super::converters::{link_to_active_model, model_to_link, model_to_user};
use super::{SeaOrmStorage, is_unique_violation, retry};
use crate::errors::{QuickslugError, Result};
use crate::storage::{Link, LinkChanges};
use migration::entities::{link, user};

/// 插入结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// 短码已被占用（唯一约束冲突）
    SlugTaken,
    /// 所有者的日配额或终身配额已在并发请求中用尽
    QuotaExhausted,
}

/// 链接所有者的计数器更新参数；上限为 None 表示不限
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerQuota {
    pub user_id: String,
    /// 当前 UTC 日的零点
    pub day_start: DateTime<Utc>,
    pub daily_limit: Option<u64>,
    pub lifetime_limit: Option<u64>,
}

fn limit_as_i64(limit: u64) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// 原子地累加所有者计数器，上限检查放在 WHERE 中
///
/// 返回 false 表示行未更新（配额已满或用户不存在）。
async fn bump_owner_counters<C: ConnectionTrait>(
    conn: &C,
    owner: &OwnerQuota,
    now: DateTime<Utc>,
) -> std::result::Result<bool, DbErr> {
    // MySQL 按书写顺序求值 SET，日计数必须在 last_shorten_date 之前
    let mut update = user::Entity::update_many()
        .col_expr(
            user::Column::TotalLinksCreated,
            Expr::col(user::Column::TotalLinksCreated).add(1),
        )
        .col_expr(
            user::Column::DailyShortenCount,
            Expr::case(
                user::Column::LastShortenDate.gte(owner.day_start),
                Expr::col(user::Column::DailyShortenCount).add(1),
            )
            .finally(Expr::value(1i64))
            .into(),
        )
        .col_expr(user::Column::LastShortenDate, Expr::value(now))
        .filter(user::Column::Id.eq(owner.user_id.as_str()));

    if let Some(limit) = owner.lifetime_limit {
        update = update.filter(user::Column::TotalLinksCreated.lt(limit_as_i64(limit)));
    }
    if let Some(limit) = owner.daily_limit {
        update = update.filter(
            Condition::any()
                .add(user::Column::LastShortenDate.is_null())
                .add(user::Column::LastShortenDate.lt(owner.day_start))
                .add(user::Column::DailyShortenCount.lt(limit_as_i64(limit))),
        );
    }

    Ok(update.exec(conn).await?.rows_affected > 0)
}

impl SeaOrmStorage {
    pub async fn find_link_by_slug(&self, slug: &str) -> Result<Option<Link>> {
        let db = &self.db;
        let model = retry::with_retry("find_link_by_slug", self.retry_config, || async {
            link::Entity::find()
                .filter(link::Column::Slug.eq(slug))
                .one(db)
                .await
        })
        .await?;

        Ok(model.map(model_to_link))
    }

    pub async fn find_link_by_id(&self, id: &str) -> Result<Option<Link>> {
        let db = &self.db;
        let model = retry::with_retry("find_link_by_id", self.retry_config, || async {
            link::Entity::find_by_id(id.to_string()).one(db).await
        })
        .await?;

        Ok(model.map(model_to_link))
    }

    pub async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let db = &self.db;
        let count = retry::with_retry("slug_exists", self.retry_config, || async {
            link::Entity::find()
                .filter(link::Column::Slug.eq(slug))
                .count(db)
                .await
        })
        .await?;

        Ok(count > 0)
    }

    /// 插入链接；带 `owner` 时在同一事务内累加该用户的计数器
    ///
    /// 短码唯一约束冲突返回 `InsertOutcome::SlugTaken`，配额已满返回
    /// `InsertOutcome::QuotaExhausted`，两种情况事务均回滚。
    pub async fn insert_link(
        &self,
        new_link: &Link,
        owner: Option<&OwnerQuota>,
    ) -> Result<InsertOutcome> {
        let txn = self.db.begin().await?;

        match link::Entity::insert(link_to_active_model(new_link))
            .exec_without_returning(&txn)
            .await
        {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                debug!("Slug '{}' collided on insert", new_link.slug);
                txn.rollback().await?;
                return Ok(InsertOutcome::SlugTaken);
            }
            Err(e) => {
                return Err(QuickslugError::database_operation(format!(
                    "Failed to insert link '{}': {}",
                    new_link.slug, e
                )));
            }
        }

        if let Some(owner) = owner
            && !bump_owner_counters(&txn, owner, new_link.created_at).await?
        {
            debug!("Quota for user {} exhausted at insert time", owner.user_id);
            txn.rollback().await?;
            return Ok(InsertOutcome::QuotaExhausted);
        }

        txn.commit().await?;
        info!("Link created: {} -> {}", new_link.slug, new_link.original_url);
        Ok(InsertOutcome::Inserted)
    }

    /// 某用户的链接，按创建时间倒序分页；返回 (当前页, 总数)
    pub async fn list_links_by_user(
        &self,
        user_id: &str,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<Link>, u64)> {
        let db = &self.db;
        let (models, total) = retry::with_retry("list_links_by_user", self.retry_config, || async {
            let paginator = link::Entity::find()
                .filter(link::Column::UserId.eq(user_id))
                .order_by_desc(link::Column::CreatedAt)
                .order_by_desc(link::Column::Id)
                .paginate(db, page_size);
            let total = paginator.num_items().await?;
            let models = paginator.fetch_page(page.saturating_sub(1)).await?;
            Ok::<_, sea_orm::DbErr>((models, total))
        })
        .await?;

        Ok((models.into_iter().map(model_to_link).collect(), total))
    }

    pub async fn count_links_by_user(&self, user_id: &str) -> Result<u64> {
        let db = &self.db;
        Ok(
            retry::with_retry("count_links_by_user", self.retry_config, || async {
                link::Entity::find()
                    .filter(link::Column::UserId.eq(user_id))
                    .count(db)
                    .await
            })
            .await?,
        )
    }

    /// 某 IP 在 `since` 之后创建的链接数
    pub async fn count_links_by_ip_since(&self, ip: &str, since: DateTime<Utc>) -> Result<u64> {
        let db = &self.db;
        Ok(
            retry::with_retry("count_links_by_ip_since", self.retry_config, || async {
                link::Entity::find()
                    .filter(link::Column::CreatedByIp.eq(ip))
                    .filter(link::Column::CreatedAt.gte(since))
                    .count(db)
                    .await
            })
            .await?,
        )
    }

    pub async fn count_links(&self) -> Result<u64> {
        let db = &self.db;
        Ok(
            retry::with_retry("count_links", self.retry_config, || async {
                link::Entity::find().count(db).await
            })
            .await?,
        )
    }

    /// 修改短码和/或过期时间
    ///
    /// 新短码与其他链接冲突时返回冲突错误。
    pub async fn update_link(&self, id: &str, changes: &LinkChanges) -> Result<Link> {
        let mut active = link::ActiveModel {
            id: Set(id.to_string()),
            ..Default::default()
        };
        if let Some(slug) = &changes.slug {
            active.slug = Set(slug.clone());
        }
        if let Some(expires_at) = changes.expires_at {
            active.expires_at = Set(expires_at);
        }

        match active.update(&self.db).await {
            Ok(model) => Ok(model_to_link(model)),
            Err(e) if is_unique_violation(&e) => {
                Err(QuickslugError::slug_taken("This slug is already taken"))
            }
            Err(sea_orm::DbErr::RecordNotUpdated) => {
                Err(QuickslugError::not_found(format!("Link '{}' not found", id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 删除链接，点击记录由外键级联删除
    pub async fn delete_link(&self, id: &str) -> Result<bool> {
        let result = link::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// 将 `from_user` 的全部链接转移给 `to_user`，并删除 `from_user`
    ///
    /// 同一事务内完成：转移链接、累加计数、必要时继承用户名、删除旧账户。
    /// 返回转移的链接数。
    pub async fn merge_users(&self, to_user: &str, from_user: &str) -> Result<u64> {
        let txn = self.db.begin().await?;

        let source = user::Entity::find_by_id(from_user.to_string())
            .one(&txn)
            .await?
            .map(model_to_user)
            .ok_or_else(|| QuickslugError::not_found("Account to recover was not found"))?;
        let target = user::Entity::find_by_id(to_user.to_string())
            .one(&txn)
            .await?
            .map(model_to_user)
            .ok_or_else(|| QuickslugError::not_found("Current account was not found"))?;

        let moved = link::Entity::update_many()
            .col_expr(link::Column::UserId, Expr::value(to_user.to_string()))
            .filter(link::Column::UserId.eq(from_user))
            .exec(&txn)
            .await?
            .rows_affected;

        // 先删除旧账户，释放其用户名的唯一约束
        user::Entity::delete_by_id(from_user.to_string())
            .exec(&txn)
            .await?;

        let mut update = user::Entity::update_many()
            .col_expr(
                user::Column::TotalLinksCreated,
                Expr::col(user::Column::TotalLinksCreated).add(limit_as_i64(moved)),
            )
            .filter(user::Column::Id.eq(to_user));
        if source.username.is_some() && source.username != target.username {
            update = update.col_expr(user::Column::Username, Expr::value(source.username.clone()));
        }
        update.exec(&txn).await?;

        txn.commit().await?;
        info!(
            "Merged account {} into {} ({} links transferred)",
            from_user, to_user, moved
        );
        Ok(moved)
    }
}
