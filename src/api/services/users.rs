//! 当前用户相关端点

use std::sync::Arc;

use actix_web::{HttpRequest, Responder, Result as ActixResult, web};
use tracing::info;

use crate::api::middleware::AuthenticatedUser;
use crate::services::UserService;
use crate::utils::ip::extract_client_ip;

use super::helpers::api_result;
use super::types::{RecoverBody, RecoverResponse, UsernameBody};

pub async fn get_me(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    let ip = extract_client_ip(&req);
    Ok(api_result(
        service.profile(&user.user_id, ip.as_deref()).await,
    ))
}

pub async fn update_username(
    req: HttpRequest,
    user: AuthenticatedUser,
    body: web::Json<UsernameBody>,
    service: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    let result = match service.update_username(&user.user_id, &body.username).await {
        Ok(updated) => {
            info!("API: user {} changed username", updated.id);
            let ip = extract_client_ip(&req);
            service.profile(&updated.id, ip.as_deref()).await
        }
        Err(e) => Err(e),
    };
    Ok(api_result(result))
}

/// 跨日后清零日计数
///
/// 当天已有的计数保持不变，返回的配额与 `GET /users/me` 一致。
pub async fn reset_daily(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    let ip = extract_client_ip(&req);
    Ok(api_result(
        service.reset_daily_count(&user.user_id, ip.as_deref()).await,
    ))
}

/// 用旧的访客令牌找回链接
pub async fn recover(
    user: AuthenticatedUser,
    body: web::Json<RecoverBody>,
    service: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    let result = service
        .recover_account(&user.user_id, &body.old_token)
        .await
        .map(|merged_links| {
            info!(
                "API: user {} recovered {} links",
                user.user_id, merged_links
            );
            RecoverResponse { merged_links }
        });
    Ok(api_result(result))
}
