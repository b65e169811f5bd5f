//! API 类型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::{CreateLinkRequest, UpdateLinkRequest};
use crate::storage::{Link, Plan, User};

/// 统一响应信封
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

// ============ Links ============

#[derive(Deserialize, Clone, Debug)]
pub struct PostNewLink {
    pub url: String,
    pub slug: Option<String>,
    pub expires_in: Option<String>,
}

impl From<PostNewLink> for CreateLinkRequest {
    fn from(body: PostNewLink) -> Self {
        Self {
            url: body.url,
            slug: body.slug,
            expires_in: body.expires_in,
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct UpdateLinkBody {
    pub slug: Option<String>,
    pub expires_in: Option<String>,
}

impl From<UpdateLinkBody> for UpdateLinkRequest {
    fn from(body: UpdateLinkBody) -> Self {
        Self {
            slug: body.slug,
            expires_in: body.expires_in,
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct GetLinksQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// 对外展示的链接
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LinkResponse {
    pub id: String,
    pub slug: String,
    pub short_url: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub click_count: i64,
    pub expired: bool,
}

impl LinkResponse {
    pub fn new(link: Link, short_url: String, now: DateTime<Utc>) -> Self {
        Self {
            expired: link.is_expired_at(now),
            id: link.id,
            slug: link.slug,
            short_url,
            original_url: link.original_url,
            created_at: link.created_at,
            expires_at: link.expires_at,
            click_count: link.click_count,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PaginationInfo {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LinkListResponse {
    pub links: Vec<LinkResponse>,
    pub pagination: PaginationInfo,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SuccessResponse {
    pub success: bool,
}

// ============ Auth ============

#[derive(Deserialize, Clone, Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SignupResponse {
    pub id: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for SignupResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// 登录成功后返回的数据，token 同时写入 cookie
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AuthSuccessResponse {
    pub access_token: String,
    pub token_type: String,
    /// access token 有效期（秒）
    pub expires_in: u64,
    pub user_id: String,
    pub plan: Plan,
    /// 仅访客账户返回，用于找回链接
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_token: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MessageResponse {
    pub message: String,
}

// ============ Users ============

#[derive(Deserialize, Clone, Debug)]
pub struct UsernameBody {
    pub username: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct RecoverBody {
    pub old_token: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RecoverResponse {
    pub merged_links: u64,
}
