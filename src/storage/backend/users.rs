//! 用户读写

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, QueryFilter,
    sea_query::Expr,
};
use tracing::{debug, info};

use super::converters::{model_to_user, user_to_active_model};
use super::{SeaOrmStorage, is_unique_violation, retry};
use crate::errors::{QuickslugError, Result};
use crate::storage::User;
use migration::entities::user;

impl SeaOrmStorage {
    /// 新建用户；邮箱或用户名冲突返回冲突错误
    pub async fn insert_user(&self, new_user: &User) -> Result<()> {
        match user::Entity::insert(user_to_active_model(new_user))
            .exec_without_returning(&self.db)
            .await
        {
            Ok(_) => {
                info!("User created: {}", new_user.id);
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => {
                Err(QuickslugError::account_exists("An account with this email already exists"))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let db = &self.db;
        let model = retry::with_retry("find_user_by_id", self.retry_config, || async {
            user::Entity::find_by_id(id.to_string()).one(db).await
        })
        .await?;

        Ok(model.map(model_to_user))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let db = &self.db;
        let model = retry::with_retry("find_user_by_email", self.retry_config, || async {
            user::Entity::find()
                .filter(user::Column::Email.eq(email))
                .one(db)
                .await
        })
        .await?;

        Ok(model.map(model_to_user))
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let db = &self.db;
        let model = retry::with_retry("find_user_by_username", self.retry_config, || async {
            user::Entity::find()
                .filter(user::Column::Username.eq(username))
                .one(db)
                .await
        })
        .await?;

        Ok(model.map(model_to_user))
    }

    /// 修改用户名；被其他用户占用时返回冲突错误
    pub async fn update_username(&self, id: &str, username: &str) -> Result<User> {
        let active = user::ActiveModel {
            id: Set(id.to_string()),
            username: Set(Some(username.to_string())),
            ..Default::default()
        };

        match active.update(&self.db).await {
            Ok(model) => Ok(model_to_user(model)),
            Err(e) if is_unique_violation(&e) => {
                Err(QuickslugError::username_taken("This username is already taken"))
            }
            Err(sea_orm::DbErr::RecordNotUpdated) => {
                Err(QuickslugError::not_found("User not found"))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 日计数已过期（早于 `day_start`）时清零，并把 last_shorten_date 记为 `now`
    ///
    /// 条件写在 WHERE 中，当天已有的计数不会被清除。
    pub async fn reset_daily_count(
        &self,
        id: &str,
        day_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<User> {
        let result = user::Entity::update_many()
            .col_expr(user::Column::DailyShortenCount, Expr::value(0i64))
            .col_expr(user::Column::LastShortenDate, Expr::value(now))
            .filter(user::Column::Id.eq(id))
            .filter(
                Condition::any()
                    .add(user::Column::LastShortenDate.is_null())
                    .add(user::Column::LastShortenDate.lt(day_start)),
            )
            .exec(&self.db)
            .await?;
        debug!("reset_daily_count({}) touched {} rows", id, result.rows_affected);

        self.find_user_by_id(id)
            .await?
            .ok_or_else(|| QuickslugError::not_found("User not found"))
    }
}
