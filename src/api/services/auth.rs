//! 认证相关端点：注册、登录、访客、刷新、登出

use std::sync::Arc;

use actix_governor::{Governor, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError};
use actix_web::dev::ServiceRequest;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder, Result as ActixResult, web};
use governor::middleware::NoOpMiddleware;
use tracing::{debug, error, info, warn};

use crate::api::jwt::get_jwt_service;
use crate::config::get_config;
use crate::errors::QuickslugError;
use crate::services::UserService;
use crate::storage::User;
use crate::utils::ip::{UNKNOWN_IP, resolve_client_ip};

use super::error_code::ErrorCode;
use super::helpers::{
    CookieBuilder, created_response, error_from_quickslug, json_response, success_response,
};
use super::types::{AuthSuccessResponse, Credentials, MessageResponse, SignupResponse};

/// 基于客户端 IP 的限流 key 提取器
///
/// 只有来自可信代理的连接才采信 X-Forwarded-For。
#[derive(Clone, Copy)]
pub struct LoginKeyExtractor;

impl KeyExtractor for LoginKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> Result<Self::Key, Self::KeyExtractionError> {
        let config = get_config();
        let key = resolve_client_ip(
            req.connection_info().peer_addr(),
            req.headers(),
            &config.api.trusted_proxies,
        )
        .unwrap_or_else(|| UNKNOWN_IP.to_string());

        debug!("Auth rate limit key: {}", key);
        Ok(key)
    }
}

/// 创建登录限流器
///
/// 配置：每秒补充 1 个令牌，突发最多 5 次请求
/// 超限返回 HTTP 429 Too Many Requests
pub fn login_rate_limiter() -> Governor<LoginKeyExtractor, NoOpMiddleware> {
    let config = GovernorConfigBuilder::default()
        .seconds_per_request(1)
        .burst_size(5)
        .key_extractor(LoginKeyExtractor)
        .finish()
        .expect("Invalid rate limit config");

    debug!("Login rate limiter created: 1 req/s, burst 5");
    Governor::new(&config)
}

/// 创建刷新/访客限流器（突发 10 次）
pub fn refresh_rate_limiter() -> Governor<LoginKeyExtractor, NoOpMiddleware> {
    let config = GovernorConfigBuilder::default()
        .seconds_per_request(1)
        .burst_size(10)
        .key_extractor(LoginKeyExtractor)
        .finish()
        .expect("Invalid rate limit config");

    Governor::new(&config)
}

/// 签发 token 对，写入 cookie 并返回 access token
fn issue_session(user: &User, status: StatusCode, include_recovery: bool) -> HttpResponse {
    let jwt = get_jwt_service();
    let pair = match jwt.generate_pair(&user.id, user.plan) {
        Ok(pair) => pair,
        Err(e) => {
            error!("Auth API: failed to generate tokens: {}", e);
            return error_from_quickslug(&QuickslugError::serialization(
                "Failed to generate token",
            ));
        }
    };

    let cookie_builder = CookieBuilder::from_config();
    let access_cookie = cookie_builder.build_access_cookie(pair.access_token.clone());
    let refresh_cookie = cookie_builder.build_refresh_cookie(pair.refresh_token);

    let body = AuthSuccessResponse {
        access_token: pair.access_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt.access_token_minutes() * 60,
        user_id: user.id.clone(),
        plan: user.plan,
        recovery_token: include_recovery.then(|| user.id.clone()),
    };

    let mut response = json_response(status, ErrorCode::Success, "OK", Some(body));
    for cookie in [access_cookie, refresh_cookie] {
        if let Err(e) = response.add_cookie(&cookie) {
            warn!("Auth API: failed to set cookie {}: {}", cookie.name(), e);
        }
    }
    response
}

pub async fn signup(
    body: web::Json<Credentials>,
    service: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    let response = match service.signup(&body.email, &body.password).await {
        Ok(user) => created_response(SignupResponse::from(user)),
        Err(e) => error_from_quickslug(&e),
    };
    Ok(response)
}

pub async fn login(
    body: web::Json<Credentials>,
    service: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    let response = match service.authenticate(&body.email, &body.password).await {
        Ok(user) => {
            info!("Auth API: login successful for {}", user.id);
            issue_session(&user, StatusCode::OK, false)
        }
        Err(e) => {
            warn!("Auth API: login failed: {}", e.message());
            error_from_quickslug(&e)
        }
    };
    Ok(response)
}

/// 创建访客账户并登录
pub async fn guest(service: web::Data<Arc<UserService>>) -> ActixResult<impl Responder> {
    let response = match service.create_guest().await {
        Ok(user) => issue_session(&user, StatusCode::CREATED, true),
        Err(e) => error_from_quickslug(&e),
    };
    Ok(response)
}

/// 用 refresh cookie 换取新的 token 对
pub async fn refresh_token(
    req: HttpRequest,
    service: web::Data<Arc<UserService>>,
) -> ActixResult<impl Responder> {
    let cookie_builder = CookieBuilder::from_config();
    let Some(cookie) = req.cookie(cookie_builder.refresh_cookie_name()) else {
        debug!("Auth API: refresh without cookie");
        return Ok(error_from_quickslug(&QuickslugError::unauthorized(
            "Refresh token not found",
        )));
    };

    let claims = match get_jwt_service().validate_refresh_token(cookie.value()) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Auth API: refresh token rejected: {}", e);
            return Ok(error_from_quickslug(&QuickslugError::unauthorized(
                "Invalid or expired refresh token",
            )));
        }
    };

    // 账户可能已被合并删除，或套餐已变更
    let response = match service.get_user(&claims.sub).await {
        Ok(user) => issue_session(&user, StatusCode::OK, false),
        Err(QuickslugError::NotFound(_)) => error_from_quickslug(&QuickslugError::unauthorized(
            "Account no longer exists",
        )),
        Err(e) => error_from_quickslug(&e),
    };
    Ok(response)
}

pub async fn logout() -> ActixResult<impl Responder> {
    let cookie_builder = CookieBuilder::from_config();
    let mut response = success_response(MessageResponse {
        message: "Logged out".to_string(),
    });

    for cookie in [
        cookie_builder.build_expired_access_cookie(),
        cookie_builder.build_expired_refresh_cookie(),
    ] {
        if let Err(e) = response.add_cookie(&cookie) {
            warn!("Auth API: failed to clear cookie {}: {}", cookie.name(), e);
        }
    }

    Ok(response)
}
