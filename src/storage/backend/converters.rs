use sea_orm::ActiveValue::Set;
use tracing::warn;

use crate::storage::{ClickEvent, Link, Plan, User};
use migration::entities::{click_event, link, user};

pub fn model_to_link(model: link::Model) -> Link {
    Link {
        id: model.id,
        slug: model.slug,
        original_url: model.original_url,
        user_id: model.user_id,
        created_by_ip: model.created_by_ip,
        created_at: model.created_at,
        expires_at: model.expires_at,
        click_count: model.click_count.max(0),
    }
}

pub fn link_to_active_model(link: &Link) -> link::ActiveModel {
    link::ActiveModel {
        id: Set(link.id.clone()),
        slug: Set(link.slug.clone()),
        original_url: Set(link.original_url.clone()),
        user_id: Set(link.user_id.clone()),
        created_by_ip: Set(link.created_by_ip.clone()),
        created_at: Set(link.created_at),
        expires_at: Set(link.expires_at),
        click_count: Set(link.click_count),
    }
}

pub fn model_to_click(model: click_event::Model) -> ClickEvent {
    ClickEvent {
        id: model.id,
        link_id: model.link_id,
        clicked_at: model.clicked_at,
        ip: model.ip,
        user_agent: model.user_agent,
    }
}

pub fn model_to_user(model: user::Model) -> User {
    let plan = model.plan.parse::<Plan>().unwrap_or_else(|_| {
        warn!(
            "User {} has unknown plan '{}', treating as free",
            model.id, model.plan
        );
        Plan::Free
    });

    User {
        id: model.id,
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        plan,
        total_links_created: model.total_links_created,
        daily_shorten_count: model.daily_shorten_count,
        last_shorten_date: model.last_shorten_date,
        created_at: model.created_at,
    }
}

/// 插入用的完整 ActiveModel
pub fn user_to_active_model(user: &User) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(user.id.clone()),
        username: Set(user.username.clone()),
        email: Set(user.email.clone()),
        password_hash: Set(user.password_hash.clone()),
        plan: Set(user.plan.to_string()),
        total_links_created: Set(user.total_links_created),
        daily_shorten_count: Set(user.daily_shorten_count),
        last_shorten_date: Set(user.last_shorten_date),
        created_at: Set(user.created_at),
    }
}
