//! API 路由配置

use actix_web::body::{BoxBody, EitherBody};
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::web;

use crate::api::constants::API_PREFIX;
use crate::api::middleware::JwtAuth;

use super::auth::{guest, login, login_rate_limiter, logout, refresh_rate_limiter, refresh_token, signup};
use super::error_code::ErrorCode;
use super::helpers::error_response;
use super::links::{check_slug, delete_link, get_link_analytics, get_links, post_link, update_link};
use super::users::{get_me, recover, reset_daily, update_username};

/// 请求体解析失败时返回统一信封
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| {
            let message = format!("Invalid request body: {}", err);
            let response = error_response(StatusCode::BAD_REQUEST, ErrorCode::BadRequest, &message);
            InternalError::from_response(err, response).into()
        })
}

/// 链接路由 `/links`
///
/// 包含：
/// - POST /links - 创建链接（登录可选）
/// - GET /links - 当前用户的链接
/// - GET /links/check/{slug} - 短码可用性
/// - GET /links/{id}/analytics - 点击分析
/// - PUT /links/{id} - 更新链接
/// - DELETE /links/{id} - 删除链接
pub fn links_routes() -> actix_web::Scope {
    web::scope("/links")
        .route("", web::get().to(get_links))
        .route("", web::post().to(post_link))
        .route("/check/{slug}", web::get().to(check_slug))
        .route("/{id}/analytics", web::get().to(get_link_analytics))
        .route("/{id}", web::put().to(update_link))
        .route("/{id}", web::delete().to(delete_link))
}

/// 认证路由 `/auth`
pub fn auth_routes() -> actix_web::Scope {
    web::scope("/auth")
        .route("/signup", web::post().to(signup))
        .route("/login", web::post().to(login).wrap(login_rate_limiter()))
        .route("/guest", web::post().to(guest).wrap(refresh_rate_limiter()))
        .route(
            "/refresh",
            web::post().to(refresh_token).wrap(refresh_rate_limiter()),
        )
        .route("/logout", web::post().to(logout))
}

/// 当前用户路由 `/users/me`
pub fn users_routes() -> actix_web::Scope {
    web::scope("/users/me")
        .route("", web::get().to(get_me))
        .route("/username", web::put().to(update_username))
        .route("/reset-daily", web::post().to(reset_daily))
        .route("/recover", web::post().to(recover))
}

/// `/api/v1` 下的全部路由
pub fn api_v1_routes() -> actix_web::Scope<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<EitherBody<BoxBody>>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    web::scope(API_PREFIX)
        .wrap(JwtAuth)
        .app_data(json_config())
        .service(links_routes())
        .service(auth_routes())
        .service(users_routes())
}
